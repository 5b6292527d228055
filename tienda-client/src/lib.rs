//! Storefront client: wires the cart, order, payment and session
//! components together behind one facade and carries the cross-component
//! checkout flows.

pub mod checkout;
pub mod client;
pub mod mock;

pub use checkout::CheckoutReceipt;
pub use client::StorefrontClient;
