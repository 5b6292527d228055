pub mod api;
pub mod error;
pub mod normalize;
pub mod payment;
pub mod result;

pub use api::{decode_data, CreateOrderRequest, OrderLineRequest, RemoteOutcome, StoreApi};
pub use error::ApiError;
pub use normalize::{normalize, process_remote, Processed};
pub use payment::{PaymentPreference, PaymentStatus, PollHalt};
pub use result::{FailureObserver, Normalized, OpOutcome};
