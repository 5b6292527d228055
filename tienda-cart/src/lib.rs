pub mod engine;
pub mod models;

pub use engine::{CartEngine, CartError};
pub use models::{CartLine, CheckoutLine, Product, StockInfo};
