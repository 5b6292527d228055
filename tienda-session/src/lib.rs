pub mod context;
pub mod guard;

pub use context::{SessionContext, UserType};
pub use guard::{Navigator, SessionGuard, LOGIN_ROUTE};
