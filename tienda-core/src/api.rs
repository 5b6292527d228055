use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// Raw outcome of a remote call, before normalization.
///
/// Transport implementations produce this; everything above them goes
/// through [`crate::normalize::normalize`] before inspecting anything.
#[derive(Debug, Clone)]
pub enum RemoteOutcome {
    /// 2xx response carrying the standard JSON envelope
    /// `{ success, message, data, status, details }`.
    Envelope(Value),
    /// Non-2xx HTTP response, with whatever body the backend produced.
    Http {
        status: u16,
        status_text: String,
        body: Option<Value>,
    },
    /// The request timed out.
    Timeout,
    /// Connection-level failure before any response arrived.
    Disconnected,
    /// 2xx response carrying a binary payload (file download); skips
    /// normalization so callers can stream bytes.
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineRequest {
    pub product_id: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub delivery_address_id: u64,
    pub products: Vec<OrderLineRequest>,
    pub observations: Option<String>,
    /// Client-generated token, one per checkout attempt, for the backend to
    /// deduplicate double submits on.
    pub idempotency_key: Uuid,
}

/// The remote order/payment service, consumed as a black box.
///
/// One documented response schema per endpoint:
/// - `create_order` / `order_by_id`: `data` is an order object
/// - `my_orders`: `data` is an array of order objects
/// - `payment_preference`: `data` is `{ preference_id, init_point }`
/// - `payment_status`: `data` is `{ payment_status, order_status }`
/// - `purchased_products`: `data` is an array of product summaries
#[async_trait]
pub trait StoreApi: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> RemoteOutcome;
    async fn my_orders(&self) -> RemoteOutcome;
    async fn order_by_id(&self, order_id: u64) -> RemoteOutcome;
    async fn cancel_order(&self, order_id: u64) -> RemoteOutcome;
    async fn payment_preference(&self, order_id: u64) -> RemoteOutcome;
    async fn payment_status(&self, order_id: u64) -> RemoteOutcome;
    async fn purchased_products(&self) -> RemoteOutcome;
}

/// Decodes the `data` field of a normalized response against the endpoint's
/// documented schema. A missing or mismatched payload is a decode error,
/// never a silent fallthrough to an alternative shape.
pub fn decode_data<T: DeserializeOwned>(data: Option<Value>) -> Result<T, ApiError> {
    let value = data.ok_or_else(|| ApiError::Decode("payload vacío".into()))?;
    serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}
