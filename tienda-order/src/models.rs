use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tienda_core::payment::PaymentStatus;

/// Order status in the lifecycle, exactly as the order service reports it.
///
/// The client never advances a status speculatively; the only local write
/// is the optimistic `cancelado` applied on a confirmed cancellation.
/// When adding a status, extend the transition table and all four lookup
/// tables below in the same change, or the UI will expose illegal actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendientePago,
    Pendiente,
    Confirmado,
    Procesando,
    Enviado,
    Entregado,
    PagoFallido,
    Cancelado,
}

/// Display severity for status badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Info,
    Success,
    Danger,
    Secondary,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::PendientePago => "Pendiente de Pago",
            OrderStatus::Pendiente => "Pagado - Preparando Envío",
            OrderStatus::Confirmado => "Confirmado",
            OrderStatus::Procesando => "En Preparación",
            OrderStatus::Enviado => "Enviado",
            OrderStatus::Entregado => "Entregado",
            OrderStatus::PagoFallido => "Pago Fallido",
            OrderStatus::Cancelado => "Cancelado",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            OrderStatus::PendientePago => Severity::Warning,
            OrderStatus::Pendiente => Severity::Info,
            OrderStatus::Confirmado => Severity::Success,
            OrderStatus::Procesando => Severity::Info,
            OrderStatus::Enviado => Severity::Success,
            OrderStatus::Entregado => Severity::Success,
            OrderStatus::PagoFallido => Severity::Danger,
            OrderStatus::Cancelado => Severity::Secondary,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            OrderStatus::PendientePago => "pi pi-clock",
            OrderStatus::Pendiente => "pi pi-check-circle",
            OrderStatus::Confirmado => "pi pi-verified",
            OrderStatus::Procesando => "pi pi-cog",
            OrderStatus::Enviado => "pi pi-send",
            OrderStatus::Entregado => "pi pi-check",
            OrderStatus::PagoFallido => "pi pi-times-circle",
            OrderStatus::Cancelado => "pi pi-ban",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OrderStatus::PendientePago => {
                "Tu orden está esperando el pago para ser procesada"
            }
            OrderStatus::Pendiente => {
                "Tu pago fue exitoso. Estamos preparando tu pedido para el envío"
            }
            OrderStatus::Confirmado => "Tu orden ha sido confirmada y está siendo preparada",
            OrderStatus::Procesando => "Tu orden está siendo preparada en nuestro almacén",
            OrderStatus::Enviado => "Tu orden ha sido enviada y está en camino",
            OrderStatus::Entregado => "Tu orden ha sido entregada exitosamente",
            OrderStatus::PagoFallido => {
                "Hubo un problema con el pago. Puedes intentar nuevamente"
            }
            OrderStatus::Cancelado => "Esta orden ha sido cancelada",
        }
    }

    /// Single source of truth for which lifecycle moves are legal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendientePago, Pendiente)
                | (PendientePago, Cancelado)
                | (PendientePago, PagoFallido)
                | (Pendiente, Confirmado)
                | (Pendiente, Cancelado)
                | (Confirmado, Procesando)
                | (Confirmado, Cancelado)
                | (Procesando, Enviado)
                | (Procesando, Cancelado)
                | (Enviado, Entregado)
                | (PagoFallido, PendientePago)
                | (PagoFallido, Cancelado)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Entregado | OrderStatus::Cancelado)
    }

    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::PendientePago | OrderStatus::PagoFallido)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::PendientePago | OrderStatus::Pendiente)
    }
}

/// An immutable order as owned by the orchestrator once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    pub delivery_address_id: u64,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub total_cents: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Set when a local status change was applied ahead of server
    /// confirmation; cleared by the next authoritative fetch.
    #[serde(skip)]
    pub optimistic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: u64,
    pub quantity: u32,
}
