pub mod coordinator;

pub use coordinator::{PaymentCoordinator, PaymentStatusData};
