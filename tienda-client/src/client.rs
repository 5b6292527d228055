use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tienda_cart::CartEngine;
use tienda_core::api::StoreApi;
use tienda_order::book::SharedOrderBook;
use tienda_order::manager::OrderManager;
use tienda_payment::PaymentCoordinator;
use tienda_session::{Navigator, SessionGuard};
use tienda_store::app_config::Config;
use tienda_store::KeyValueStore;

/// The assembled storefront client. Construction wires the session guard
/// into every remote call's failure channel and the payment poll into the
/// guard's teardown, then restores whatever session and cart survive in
/// durable storage.
pub struct StorefrontClient {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    session: Arc<SessionGuard>,
    cart: Mutex<CartEngine>,
    orders: OrderManager,
    payments: Arc<PaymentCoordinator>,
    book: SharedOrderBook,
}

impl StorefrontClient {
    pub fn new(
        config: Config,
        api: Arc<dyn StoreApi>,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = Arc::new(SessionGuard::new(
            store.clone(),
            navigator,
            config.session.public_routes.clone(),
        ));
        session.init();

        let book = SharedOrderBook::new();
        let payments = Arc::new(PaymentCoordinator::new(
            api.clone(),
            book.clone(),
            Some(session.clone()),
        ));
        session.attach_poll(payments.clone());

        let orders = OrderManager::new(
            api,
            book.clone(),
            store.clone(),
            Some(session.clone()),
        );

        let cart = Mutex::new(CartEngine::new(store.clone()));

        Self {
            config,
            store,
            session,
            cart,
            orders,
            payments,
            book,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    pub fn orders(&self) -> &OrderManager {
        &self.orders
    }

    pub fn payments(&self) -> &Arc<PaymentCoordinator> {
        &self.payments
    }

    pub fn book(&self) -> &SharedOrderBook {
        &self.book
    }

    /// Runs `f` against the cart under its lock.
    pub fn with_cart<R>(&self, f: impl FnOnce(&mut CartEngine) -> R) -> R {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }

    pub(crate) fn cart_lock(&self) -> std::sync::MutexGuard<'_, CartEngine> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.payment.poll_interval_ms)
    }

    /// Whether the periodic refresh task should renew the token this tick.
    pub fn session_refresh_due(&self) -> bool {
        self.session
            .refresh_needed(self.config.session.refresh_threshold_seconds)
    }
}
