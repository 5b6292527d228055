//! Scripted doubles for the remote service and the UI shell, shared by
//! the integration tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use tienda_core::api::{CreateOrderRequest, RemoteOutcome, StoreApi};
use tienda_session::Navigator;

/// Remote service double: responses are scripted in order, every call is
/// logged by endpoint name, and an exhausted script answers with a
/// connection failure.
#[derive(Default)]
pub struct MockStoreApi {
    responses: Mutex<VecDeque<RemoteOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl MockStoreApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: RemoteOutcome) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next(&self, endpoint: &str) -> RemoteOutcome {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(endpoint.to_string());
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(RemoteOutcome::Disconnected)
    }
}

#[async_trait]
impl StoreApi for MockStoreApi {
    async fn create_order(&self, _request: &CreateOrderRequest) -> RemoteOutcome {
        self.next("create_order")
    }

    async fn my_orders(&self) -> RemoteOutcome {
        self.next("my_orders")
    }

    async fn order_by_id(&self, _order_id: u64) -> RemoteOutcome {
        self.next("order_by_id")
    }

    async fn cancel_order(&self, _order_id: u64) -> RemoteOutcome {
        self.next("cancel_order")
    }

    async fn payment_preference(&self, _order_id: u64) -> RemoteOutcome {
        self.next("payment_preference")
    }

    async fn payment_status(&self, _order_id: u64) -> RemoteOutcome {
        self.next("payment_status")
    }

    async fn purchased_products(&self) -> RemoteOutcome {
        self.next("purchased_products")
    }
}

/// Wraps `data` in the standard success envelope.
pub fn envelope(data: Value) -> RemoteOutcome {
    RemoteOutcome::Envelope(json!({
        "success": true,
        "message": "",
        "data": data,
        "status": 200,
        "details": null
    }))
}

pub fn http_error(status: u16, status_text: &str, body: Option<Value>) -> RemoteOutcome {
    RemoteOutcome::Http {
        status,
        status_text: status_text.to_string(),
        body,
    }
}

pub fn order_json(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "delivery_address_id": 4,
        "items": [{ "product_id": 7, "quantity": 2 }]
    })
}

/// UI-shell double: remembers where the visitor is and records every
/// redirect.
pub struct RecordingNavigator {
    path: Mutex<String>,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Self {
        Self {
            path: Mutex::new(path.to_string()),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn go(&self, path: &str) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
        *self.path.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
    }
}
