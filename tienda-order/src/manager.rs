use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tienda_core::api::{CreateOrderRequest, OrderLineRequest, StoreApi};
use tienda_core::normalize::process_remote;
use tienda_core::result::{FailureObserver, OpOutcome};
use tienda_core::decode_data;
use tienda_store::{keys, set_json, KeyValueStore};

use crate::book::SharedOrderBook;
use crate::models::{Order, OrderLine, OrderStatus};

/// Local validation failures; these never reach the network.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderError {
    #[error("Dirección de entrega es requerida")]
    MissingAddress,

    #[error("Debe agregar al menos un producto al carrito")]
    EmptyOrder,

    #[error("Productos inválidos en el carrito")]
    InvalidLines,

    #[error("La orden no puede ser cancelada en su estado actual")]
    CannotCancel(OrderStatus),
}

/// Product summary from the purchased-products endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasedProduct {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub last_purchased_at: Option<DateTime<Utc>>,
}

/// Converts a validated cart into a submitted order and tracks its
/// lifecycle. Status only moves on authoritative server responses, apart
/// from the optimistic `cancelado` applied on a confirmed cancellation.
pub struct OrderManager {
    api: Arc<dyn StoreApi>,
    book: SharedOrderBook,
    store: Arc<dyn KeyValueStore>,
    observer: Option<Arc<dyn FailureObserver>>,
    purchased: Mutex<Vec<PurchasedProduct>>,
}

impl OrderManager {
    pub fn new(
        api: Arc<dyn StoreApi>,
        book: SharedOrderBook,
        store: Arc<dyn KeyValueStore>,
        observer: Option<Arc<dyn FailureObserver>>,
    ) -> Self {
        Self {
            api,
            book,
            store,
            observer,
            purchased: Mutex::new(Vec::new()),
        }
    }

    pub fn book(&self) -> &SharedOrderBook {
        &self.book
    }

    fn observer(&self) -> Option<&dyn FailureObserver> {
        self.observer.as_deref()
    }

    /// Submits a new order. Preconditions are checked locally first; a
    /// violation returns a failure without any network call. On success
    /// the order is prepended, becomes current, and the durable cart and
    /// checkout-snapshot keys are cleared. Payment-link generation is the
    /// caller's next move, not ours.
    pub async fn create_order(
        &self,
        delivery_address_id: u64,
        lines: Vec<OrderLine>,
        observations: Option<String>,
    ) -> OpOutcome<Order> {
        if delivery_address_id == 0 {
            return OpOutcome::fail(OrderError::MissingAddress.to_string());
        }
        if lines.is_empty() {
            return OpOutcome::fail(OrderError::EmptyOrder.to_string());
        }
        if lines.iter().any(|l| l.product_id == 0 || l.quantity == 0) {
            return OpOutcome::fail(OrderError::InvalidLines.to_string());
        }

        let request = CreateOrderRequest {
            delivery_address_id,
            products: lines
                .iter()
                .map(|l| OrderLineRequest {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect(),
            observations,
            // One token per attempt; the backend deduplicates on it.
            idempotency_key: Uuid::new_v4(),
        };

        let outcome = self.api.create_order(&request).await;
        let normalized = match process_remote(outcome, false, self.observer()) {
            Ok(normalized) => normalized,
            Err(err) => return OpOutcome::from_error(err),
        };

        let order: Order = match decode_data(normalized.data) {
            Ok(order) => order,
            Err(err) => return OpOutcome::from_error(err),
        };

        self.book.with(|book| book.prepend_current(order.clone()));
        self.store.remove(keys::CHECKOUT_CART);
        self.store.remove(keys::CART);
        set_json(self.store.as_ref(), keys::CURRENT_ORDER_ID, &order.id);

        info!(order_id = order.id, "order created");
        OpOutcome::ok_with(order, normalized.message)
    }

    /// Cancels an order. Only legal in states where [`OrderStatus::can_cancel`]
    /// holds; on remote confirmation the local status flips to `cancelado`
    /// immediately, tagged optimistic until the next authoritative fetch.
    pub async fn cancel_order(&self, order_id: u64) -> OpOutcome<()> {
        let known_status = self.book.with(|book| book.get(order_id).map(|o| o.status));
        if let Some(status) = known_status {
            if !status.can_cancel() {
                return OpOutcome::fail(OrderError::CannotCancel(status).to_string());
            }
        }

        let outcome = self.api.cancel_order(order_id).await;
        let normalized = match process_remote(outcome, false, self.observer()) {
            Ok(normalized) => normalized,
            Err(err) => return OpOutcome::from_error(err),
        };

        self.book.with(|book| {
            book.update(order_id, |order| {
                order.status = OrderStatus::Cancelado;
                order.optimistic = true;
            })
        });

        info!(order_id, "order cancelled");
        OpOutcome::ok_with((), normalized.message)
    }

    /// Replaces the local list with the server's. Authoritative for the
    /// list; the current order reconciles through
    /// [`Self::fetch_order_by_id`].
    pub async fn fetch_orders(&self) -> OpOutcome<Vec<Order>> {
        let outcome = self.api.my_orders().await;
        let normalized = match process_remote(outcome, false, self.observer()) {
            Ok(normalized) => normalized,
            Err(err) => return OpOutcome::from_error(err),
        };

        let orders: Vec<Order> = match decode_data(normalized.data) {
            Ok(orders) => orders,
            Err(err) => return OpOutcome::from_error(err),
        };

        self.book.with(|book| book.replace_all(orders.clone()));
        OpOutcome::ok_with(orders, normalized.message)
    }

    /// Authoritative single-order read; replaces the current order and the
    /// matching list entry.
    pub async fn fetch_order_by_id(&self, order_id: u64) -> OpOutcome<Order> {
        let outcome = self.api.order_by_id(order_id).await;
        let normalized = match process_remote(outcome, false, self.observer()) {
            Ok(normalized) => normalized,
            Err(err) => return OpOutcome::from_error(err),
        };

        let order: Order = match decode_data(normalized.data) {
            Ok(order) => order,
            Err(err) => return OpOutcome::from_error(err),
        };

        self.book.with(|book| book.refresh(order.clone()));
        OpOutcome::ok_with(order, normalized.message)
    }

    /// Read-through cache of everything the client has bought. Pass
    /// `force_refresh` to bypass the cache.
    pub async fn purchased_products(
        &self,
        force_refresh: bool,
    ) -> OpOutcome<Vec<PurchasedProduct>> {
        if !force_refresh {
            let cached = self
                .purchased
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if !cached.is_empty() {
                return OpOutcome::ok(cached);
            }
        }

        let outcome = self.api.purchased_products().await;
        let normalized = match process_remote(outcome, false, self.observer()) {
            Ok(normalized) => normalized,
            Err(err) => return OpOutcome::from_error(err),
        };

        let products: Vec<PurchasedProduct> = match decode_data(normalized.data) {
            Ok(products) => products,
            Err(err) => return OpOutcome::from_error(err),
        };

        *self.purchased.lock().unwrap_or_else(PoisonError::into_inner) = products.clone();
        set_json(self.store.as_ref(), keys::PURCHASED_PRODUCTS, &products);
        OpOutcome::ok_with(products, normalized.message)
    }
}
