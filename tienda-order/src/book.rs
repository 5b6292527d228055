use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{Order, OrderStatus};

/// In-memory order list plus the "current order" the storefront is
/// looking at. Shared between the orchestrator and the payment
/// coordinator.
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: Vec<Order>,
    current: Option<Order>,
}

impl OrderBook {
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn current(&self) -> Option<&Order> {
        self.current.as_ref()
    }

    pub fn get(&self, order_id: u64) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == order_id)
    }

    pub fn has_orders(&self) -> bool {
        !self.orders.is_empty()
    }

    /// Newest order first; it also becomes the current order.
    pub fn prepend_current(&mut self, order: Order) {
        self.orders.insert(0, order.clone());
        self.current = Some(order);
    }

    /// Authoritative replacement of the list from a fetch. Optimistic
    /// flags on list entries are gone with them; the current order is
    /// untouched and reconciles through [`OrderBook::refresh`].
    pub fn replace_all(&mut self, orders: Vec<Order>) {
        self.orders = orders;
    }

    /// Authoritative single-order refresh: becomes the current order and
    /// replaces the matching list entry if present.
    pub fn refresh(&mut self, order: Order) {
        if let Some(entry) = self.orders.iter_mut().find(|o| o.id == order.id) {
            *entry = order.clone();
        }
        self.current = Some(order);
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Applies a local mutation to the list entry and, when it matches,
    /// the current order.
    pub fn update(&mut self, order_id: u64, apply: impl Fn(&mut Order)) {
        if let Some(entry) = self.orders.iter_mut().find(|o| o.id == order_id) {
            apply(entry);
        }
        if let Some(current) = self.current.as_mut() {
            if current.id == order_id {
                apply(current);
            }
        }
    }

    /// Orders still waiting on a successful payment.
    pub fn pending(&self) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|o| {
                matches!(
                    o.status,
                    OrderStatus::PendientePago | OrderStatus::PagoFallido
                )
            })
            .collect()
    }

    /// Orders in flight between confirmation and delivery.
    pub fn active(&self) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|o| {
                matches!(
                    o.status,
                    OrderStatus::Confirmado | OrderStatus::Procesando | OrderStatus::Enviado
                )
            })
            .collect()
    }

    pub fn completed(&self) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Entregado)
            .collect()
    }
}

/// Cloneable handle to the shared order book.
#[derive(Clone, Default)]
pub struct SharedOrderBook(Arc<Mutex<OrderBook>>);

impl SharedOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut OrderBook) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, status: OrderStatus) -> Order {
        Order {
            id,
            status,
            payment_status: None,
            delivery_address_id: 1,
            items: Vec::new(),
            observations: None,
            total_cents: None,
            created_at: None,
            optimistic: false,
        }
    }

    #[test]
    fn test_prepend_sets_current_and_ordering() {
        let mut book = OrderBook::default();
        book.prepend_current(order(1, OrderStatus::PendientePago));
        book.prepend_current(order(2, OrderStatus::PendientePago));

        assert_eq!(book.orders()[0].id, 2);
        assert_eq!(book.current().map(|o| o.id), Some(2));
    }

    #[test]
    fn test_update_touches_list_and_current() {
        let mut book = OrderBook::default();
        book.prepend_current(order(5, OrderStatus::PendientePago));

        book.update(5, |o| {
            o.status = OrderStatus::Cancelado;
            o.optimistic = true;
        });

        assert_eq!(book.get(5).map(|o| o.status), Some(OrderStatus::Cancelado));
        assert!(book.current().map(|o| o.optimistic).unwrap_or(false));
    }

    #[test]
    fn test_refresh_clears_optimistic_flag() {
        let mut book = OrderBook::default();
        book.prepend_current(order(5, OrderStatus::PendientePago));
        book.update(5, |o| {
            o.status = OrderStatus::Cancelado;
            o.optimistic = true;
        });

        book.refresh(order(5, OrderStatus::Cancelado));
        assert!(!book.get(5).map(|o| o.optimistic).unwrap_or(true));
        assert!(!book.current().map(|o| o.optimistic).unwrap_or(true));
    }

    #[test]
    fn test_replace_all_leaves_current_to_refresh() {
        let mut book = OrderBook::default();
        book.prepend_current(order(5, OrderStatus::PendientePago));
        book.update(5, |o| {
            o.status = OrderStatus::Cancelado;
            o.optimistic = true;
        });

        book.replace_all(vec![order(5, OrderStatus::Cancelado)]);
        assert!(!book.get(5).map(|o| o.optimistic).unwrap_or(true));
        assert!(book.current().map(|o| o.optimistic).unwrap_or(false));

        book.refresh(order(5, OrderStatus::Cancelado));
        assert!(!book.current().map(|o| o.optimistic).unwrap_or(true));
    }

    #[test]
    fn test_lifecycle_buckets() {
        let mut book = OrderBook::default();
        book.replace_all(vec![
            order(1, OrderStatus::PendientePago),
            order(2, OrderStatus::PagoFallido),
            order(3, OrderStatus::Procesando),
            order(4, OrderStatus::Entregado),
        ]);

        assert_eq!(book.pending().len(), 2);
        assert_eq!(book.active().len(), 1);
        assert_eq!(book.completed().len(), 1);
    }
}
