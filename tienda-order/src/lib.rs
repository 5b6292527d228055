pub mod book;
pub mod manager;
pub mod models;

pub use book::{OrderBook, SharedOrderBook};
pub use manager::{OrderError, OrderManager, PurchasedProduct};
pub use models::{Order, OrderLine, OrderStatus, Severity};
