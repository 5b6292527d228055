//! Cross-component checkout flows: cart to order, order to payment, and
//! the return leg from the hosted checkout.

use tienda_cart::{CartError, CheckoutLine};
use tienda_core::payment::PaymentPreference;
use tienda_core::result::OpOutcome;
use tienda_order::models::{Order, OrderLine};
use tienda_store::{keys, set_json, KeyValueStore};
use tracing::info;

use crate::client::StorefrontClient;

pub const MSG_LOGIN_REQUIRED: &str = "Debe iniciar sesión para continuar con la compra";

/// What a completed checkout hands back: the created order, and the
/// payment redirect when the link was generated. An order with no
/// preference exists on the backend and can be paid later from the order
/// list.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub preference: Option<PaymentPreference>,
}

impl StorefrontClient {
    /// Moves the visitor from cart to checkout. An anonymous visitor has
    /// the cart stashed so it survives the login round trip; a stale cart
    /// is rejected with the per-line conflict report.
    pub async fn proceed_to_checkout(&self) -> OpOutcome<Vec<CheckoutLine>> {
        if self.with_cart(|cart| cart.is_empty()) {
            return OpOutcome::fail(CartError::EmptyCart.to_string());
        }
        if !self.session().is_authenticated() {
            self.with_cart(|cart| cart.stash_pending());
            return OpOutcome::fail(MSG_LOGIN_REQUIRED);
        }

        let mut cart = self.cart_lock();
        if !cart.validate().await {
            return OpOutcome::fail(cart.error().unwrap_or_default());
        }
        if !cart.snapshot_for_checkout() {
            return OpOutcome::fail(cart.error().unwrap_or_default());
        }
        match cart.checkout_snapshot() {
            Some(snapshot) => OpOutcome::ok(snapshot),
            None => OpOutcome::fail(CartError::EmptyCart.to_string()),
        }
    }

    /// Submits the cart as an order. The cart is revalidated first and an
    /// empty cart never reaches the network. On success the in-memory cart
    /// empties alongside the durable keys the order manager already
    /// cleared.
    pub async fn create_order_from_cart(
        &self,
        delivery_address_id: u64,
        observations: Option<String>,
    ) -> OpOutcome<Order> {
        let lines: Vec<OrderLine> = self.with_cart(|cart| {
            cart.items()
                .iter()
                .map(|line| OrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect()
        });
        if lines.is_empty() {
            return OpOutcome::fail(CartError::EmptyCart.to_string());
        }

        {
            let mut cart = self.cart_lock();
            if !cart.validate().await {
                return OpOutcome::fail(cart.error().unwrap_or_default());
            }
        }

        let result = self
            .orders()
            .create_order(delivery_address_id, lines, observations)
            .await;
        if result.success {
            self.with_cart(|cart| cart.clear());
        }
        result
    }

    /// The whole checkout handshake: order, payment link, poll loop. A
    /// link failure is reported as a failure but keeps the created order in
    /// the receipt; it stays payable from the order list.
    pub async fn create_order_and_pay(
        &self,
        delivery_address_id: u64,
        observations: Option<String>,
    ) -> OpOutcome<CheckoutReceipt> {
        let created = self
            .create_order_from_cart(delivery_address_id, observations)
            .await;
        let Some(order) = created.data else {
            return OpOutcome {
                success: false,
                message: created.message,
                validation_errors: created.validation_errors,
                data: None,
            };
        };

        let link = self.payments().generate_payment_link(order.id).await;
        match link.data {
            Some(preference) => {
                set_json(self.store().as_ref(), keys::PENDING_ORDER_ID, &order.id);
                self.payments()
                    .clone()
                    .start_polling(order.id, self.poll_interval());
                info!(order_id = order.id, "checkout handed off to hosted payment");
                OpOutcome::ok(CheckoutReceipt {
                    order,
                    preference: Some(preference),
                })
            }
            None => OpOutcome {
                success: false,
                message: link.message,
                validation_errors: link.validation_errors,
                data: Some(CheckoutReceipt {
                    order,
                    preference: None,
                }),
            },
        }
    }

    /// Generates a fresh payment link for an existing payable order and
    /// restarts the poll loop. The failed-payment retry path.
    pub async fn retry_payment(&self, order_id: u64) -> OpOutcome<PaymentPreference> {
        let link = self.payments().generate_payment_link(order_id).await;
        if link.success {
            set_json(self.store().as_ref(), keys::PENDING_ORDER_ID, &order_id);
            self.payments()
                .clone()
                .start_polling(order_id, self.poll_interval());
        }
        link
    }

    /// Return leg from the hosted checkout: stop polling and take the
    /// backend's word for where the order landed.
    pub async fn confirm_payment_return(&self, order_id: u64) -> OpOutcome<Order> {
        self.payments().stop_polling();
        let result = self.orders().fetch_order_by_id(order_id).await;
        if result.success {
            self.store().remove(keys::PENDING_ORDER_ID);
        }
        result
    }

    /// Reclaims a cart stashed before a login round trip.
    pub fn restore_pending_cart(&self) {
        self.with_cart(|cart| cart.restore_pending());
    }
}
