use serde::{Deserialize, Serialize};

/// Payment states reported by the external processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    InProcess,
    Approved,
    Rejected,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Terminal states: once reached, polling stops.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Approved | PaymentStatus::Rejected | PaymentStatus::Cancelled
        )
    }
}

/// What the payment-preference endpoint hands back: a redirect target and
/// the processor's preference handle. How the hosted UI renders is not our
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPreference {
    pub preference_id: String,
    pub init_point: String,
}

/// Lets cross-cutting components (the session guard) stop an active
/// payment poll without depending on the coordinator crate.
pub trait PollHalt: Send + Sync {
    fn halt(&self);
}
