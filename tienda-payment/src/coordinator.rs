use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tienda_core::api::StoreApi;
use tienda_core::decode_data;
use tienda_core::normalize::process_remote;
use tienda_core::payment::{PaymentPreference, PaymentStatus, PollHalt};
use tienda_core::result::{FailureObserver, OpOutcome};
use tienda_order::book::SharedOrderBook;
use tienda_order::models::OrderStatus;

/// Payment snapshot reported by the status endpoint. The order status
/// rides along when the payment has already moved the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusData {
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub order_status: Option<OrderStatus>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PaymentError {
    #[error("La orden no admite pago en su estado actual")]
    NotPayable(OrderStatus),
}

/// Drives the external-checkout handshake: generates the redirect
/// preference, then polls the status endpoint until the payment reaches a
/// terminal state. At most one poll loop exists per coordinator; starting
/// a new one stops the previous one first.
pub struct PaymentCoordinator {
    api: Arc<dyn StoreApi>,
    book: SharedOrderBook,
    observer: Option<Arc<dyn FailureObserver>>,
    poll: Mutex<Option<JoinHandle<()>>>,
    last_status: Mutex<Option<PaymentStatus>>,
}

impl PaymentCoordinator {
    pub fn new(
        api: Arc<dyn StoreApi>,
        book: SharedOrderBook,
        observer: Option<Arc<dyn FailureObserver>>,
    ) -> Self {
        Self {
            api,
            book,
            observer,
            poll: Mutex::new(None),
            last_status: Mutex::new(None),
        }
    }

    fn observer(&self) -> Option<&dyn FailureObserver> {
        self.observer.as_deref()
    }

    /// Last status seen by any check, polled or manual.
    pub fn last_status(&self) -> Option<PaymentStatus> {
        *self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Asks the backend for a checkout preference for the order. Legal only
    /// while the order awaits payment; on success the order is marked
    /// `pending` payment locally so the UI reflects the redirect in flight.
    pub async fn generate_payment_link(&self, order_id: u64) -> OpOutcome<PaymentPreference> {
        let known_status = self.book.with(|book| book.get(order_id).map(|o| o.status));
        if let Some(status) = known_status {
            if !status.can_pay() {
                return OpOutcome::fail(PaymentError::NotPayable(status).to_string());
            }
        }

        let outcome = self.api.payment_preference(order_id).await;
        let normalized = match process_remote(outcome, false, self.observer()) {
            Ok(normalized) => normalized,
            Err(err) => return OpOutcome::from_error(err),
        };

        let preference: PaymentPreference = match decode_data(normalized.data) {
            Ok(preference) => preference,
            Err(err) => return OpOutcome::from_error(err),
        };

        self.book.with(|book| {
            book.update(order_id, |order| {
                order.payment_status = Some(PaymentStatus::Pending);
            })
        });

        info!(order_id, preference = %preference.preference_id, "payment link generated");
        OpOutcome::ok_with(preference, normalized.message)
    }

    /// One authoritative status check. Overwrites the local payment status
    /// and, when the backend reports it, the order status too.
    pub async fn check_payment_status(&self, order_id: u64) -> OpOutcome<PaymentStatusData> {
        let outcome = self.api.payment_status(order_id).await;
        let normalized = match process_remote(outcome, false, self.observer()) {
            Ok(normalized) => normalized,
            Err(err) => return OpOutcome::from_error(err),
        };

        let data: PaymentStatusData = match decode_data(normalized.data) {
            Ok(data) => data,
            Err(err) => return OpOutcome::from_error(err),
        };

        *self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(data.payment_status);

        self.book.with(|book| {
            book.update(order_id, |order| {
                order.payment_status = Some(data.payment_status);
                if let Some(status) = data.order_status {
                    order.status = status;
                }
            })
        });

        debug!(order_id, status = ?data.payment_status, "payment status checked");
        OpOutcome::ok_with(data, normalized.message)
    }

    /// Starts the poll loop for an order. Ticks are serialized: the next
    /// sleep begins only after the previous check has resolved, so a slow
    /// backend never piles up concurrent checks. The loop ends on its own
    /// when the payment reaches a terminal state.
    pub fn start_polling(self: Arc<Self>, order_id: u64, interval: Duration) {
        self.stop_polling();

        let coordinator = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let result = coordinator.check_payment_status(order_id).await;
                match result.data {
                    Some(data) if data.payment_status.is_terminal() => {
                        info!(order_id, status = ?data.payment_status, "payment settled, polling stopped");
                        break;
                    }
                    Some(_) => {}
                    None => {
                        // Transient failures keep the loop alive; the next
                        // tick retries.
                        warn!(order_id, "payment status check failed: {}", result.message);
                    }
                }
            }
        });

        *self.poll.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Stops the poll loop if one is running. Safe to call repeatedly and
    /// from teardown paths that never started one.
    pub fn stop_polling(&self) {
        let handle = self
            .poll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl PollHalt for PaymentCoordinator {
    fn halt(&self) {
        self.stop_polling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tienda_core::api::{CreateOrderRequest, RemoteOutcome};
    use tienda_order::models::Order;

    #[derive(Default)]
    struct ScriptedApi {
        responses: Mutex<VecDeque<RemoteOutcome>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn push(&self, outcome: RemoteOutcome) {
            self.responses.lock().unwrap().push_back(outcome);
        }

        fn next(&self) -> RemoteOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(RemoteOutcome::Disconnected)
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreApi for ScriptedApi {
        async fn create_order(&self, _request: &CreateOrderRequest) -> RemoteOutcome {
            self.next()
        }
        async fn my_orders(&self) -> RemoteOutcome {
            self.next()
        }
        async fn order_by_id(&self, _order_id: u64) -> RemoteOutcome {
            self.next()
        }
        async fn cancel_order(&self, _order_id: u64) -> RemoteOutcome {
            self.next()
        }
        async fn payment_preference(&self, _order_id: u64) -> RemoteOutcome {
            self.next()
        }
        async fn payment_status(&self, _order_id: u64) -> RemoteOutcome {
            self.next()
        }
        async fn purchased_products(&self) -> RemoteOutcome {
            self.next()
        }
    }

    fn envelope(data: serde_json::Value) -> RemoteOutcome {
        RemoteOutcome::Envelope(json!({
            "success": true,
            "message": "",
            "data": data,
            "status": 200,
            "details": null
        }))
    }

    fn status_envelope(payment: &str, order: Option<&str>) -> RemoteOutcome {
        envelope(json!({
            "payment_status": payment,
            "order_status": order,
        }))
    }

    fn pending_order(id: u64) -> Order {
        serde_json::from_value(json!({
            "id": id,
            "status": "pendiente_pago",
            "delivery_address_id": 1
        }))
        .unwrap()
    }

    fn coordinator(api: Arc<ScriptedApi>) -> (Arc<PaymentCoordinator>, SharedOrderBook) {
        let book = SharedOrderBook::new();
        let coordinator = Arc::new(PaymentCoordinator::new(api, book.clone(), None));
        (coordinator, book)
    }

    #[tokio::test]
    async fn test_payment_link_rejected_for_unpayable_order() {
        let api = Arc::new(ScriptedApi::default());
        let (coordinator, book) = coordinator(api.clone());
        book.with(|b| {
            b.prepend_current(
                serde_json::from_value(json!({
                    "id": 3,
                    "status": "entregado",
                    "delivery_address_id": 1
                }))
                .unwrap(),
            )
        });

        let result = coordinator.generate_payment_link(3).await;
        assert!(!result.success);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_payment_link_marks_pending() {
        let api = Arc::new(ScriptedApi::default());
        api.push(envelope(json!({
            "preference_id": "pref-123",
            "init_point": "https://checkout.example/pref-123"
        })));
        let (coordinator, book) = coordinator(api);
        book.with(|b| b.prepend_current(pending_order(3)));

        let result = coordinator.generate_payment_link(3).await;
        assert!(result.success);
        assert_eq!(
            result.data.map(|p| p.preference_id),
            Some("pref-123".to_string())
        );
        assert_eq!(
            book.with(|b| b.get(3).and_then(|o| o.payment_status)),
            Some(PaymentStatus::Pending)
        );
    }

    #[tokio::test]
    async fn test_check_overwrites_payment_and_order_status() {
        let api = Arc::new(ScriptedApi::default());
        api.push(status_envelope("approved", Some("pendiente")));
        let (coordinator, book) = coordinator(api);
        book.with(|b| b.prepend_current(pending_order(3)));

        let result = coordinator.check_payment_status(3).await;
        assert!(result.success);
        let (payment, status) = book
            .with(|b| b.get(3).map(|o| (o.payment_status, o.status)))
            .unwrap();
        assert_eq!(payment, Some(PaymentStatus::Approved));
        assert_eq!(status, OrderStatus::Pendiente);
        assert_eq!(coordinator.last_status(), Some(PaymentStatus::Approved));
    }

    #[tokio::test]
    async fn test_polling_stops_on_terminal_status() {
        let api = Arc::new(ScriptedApi::default());
        api.push(status_envelope("pending", None));
        api.push(status_envelope("in_process", None));
        api.push(status_envelope("approved", Some("pendiente")));
        let (coordinator, book) = coordinator(api.clone());
        book.with(|b| b.prepend_current(pending_order(3)));

        coordinator.clone().start_polling(3, Duration::from_millis(5));
        assert!(coordinator.is_polling());

        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if !coordinator.is_polling() {
                break;
            }
        }

        assert!(!coordinator.is_polling());
        assert_eq!(api.call_count(), 3);
        assert_eq!(
            book.with(|b| b.get(3).map(|o| o.status)),
            Some(OrderStatus::Pendiente)
        );
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_loop() {
        let api = Arc::new(ScriptedApi::default());
        for _ in 0..50 {
            api.push(status_envelope("pending", None));
        }
        let (coordinator, book) = coordinator(api);
        book.with(|b| b.prepend_current(pending_order(3)));

        coordinator.clone().start_polling(3, Duration::from_millis(50));
        coordinator.clone().start_polling(3, Duration::from_millis(50));

        let handles = coordinator
            .poll
            .lock()
            .unwrap()
            .is_some();
        assert!(handles);
        assert!(coordinator.is_polling());

        coordinator.stop_polling();
        coordinator.stop_polling();
        assert!(!coordinator.is_polling());
    }

    #[tokio::test]
    async fn test_failed_check_keeps_polling() {
        let api = Arc::new(ScriptedApi::default());
        api.push(RemoteOutcome::Timeout);
        api.push(status_envelope("rejected", Some("pago_fallido")));
        let (coordinator, book) = coordinator(api.clone());
        book.with(|b| b.prepend_current(pending_order(3)));

        coordinator.clone().start_polling(3, Duration::from_millis(5));
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if !coordinator.is_polling() {
                break;
            }
        }

        assert!(!coordinator.is_polling());
        assert_eq!(api.call_count(), 2);
        assert_eq!(
            book.with(|b| b.get(3).map(|o| o.status)),
            Some(OrderStatus::PagoFallido)
        );
    }
}
