//! End-to-end flows through the assembled client: cart to order to
//! payment, plus the teardown paths that cut across components.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tienda_cart::{Product, StockInfo};
use tienda_client::mock::{envelope, http_error, order_json, MockStoreApi, RecordingNavigator};
use tienda_client::StorefrontClient;
use tienda_core::payment::PaymentStatus;
use tienda_order::models::OrderStatus;
use tienda_session::{UserType, LOGIN_ROUTE};
use tienda_store::app_config::Config;
use tienda_store::{keys, KeyValueStore, MemoryStore};

fn product(id: u64, stock: u32) -> Product {
    Product {
        id,
        name: format!("Producto {id}"),
        code: None,
        brand: None,
        image: None,
        stock: Some(StockInfo {
            sale_price_cents: 1_500,
            regular_price_cents: Some(2_000),
            quantity: stock,
        }),
    }
}

fn client_at(
    path: &str,
) -> (
    StorefrontClient,
    Arc<MockStoreApi>,
    Arc<RecordingNavigator>,
    Arc<MemoryStore>,
) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let api = Arc::new(MockStoreApi::new());
    let store = Arc::new(MemoryStore::new());
    let navigator = Arc::new(RecordingNavigator::at(path));
    let mut config = Config::default();
    config.payment.poll_interval_ms = 5;
    let client = StorefrontClient::new(config, api.clone(), store.clone(), navigator.clone());
    (client, api, navigator, store)
}

fn login(client: &StorefrontClient) {
    client.session().establish(
        "header.payload.sig",
        json!({ "id": 42, "email": "ana@example.com" }),
        UserType::Cliente,
        None,
        Some(chrono::Utc::now() + chrono::Duration::hours(1)),
    );
}

async fn wait_until_poll_stops(client: &StorefrontClient) {
    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if !client.payments().is_polling() {
            return;
        }
    }
    panic!("poll loop did not stop");
}

#[tokio::test]
async fn test_checkout_happy_path_reaches_paid_order() {
    let (client, api, _, store) = client_at("/checkout");
    login(&client);
    client.with_cart(|cart| {
        let p = product(7, 5);
        cart.add_item(&p);
        cart.add_item(&p);
    });

    api.push(envelope(order_json(10, "pendiente_pago")));
    api.push(envelope(json!({
        "preference_id": "pref-10",
        "init_point": "https://checkout.example/pref-10"
    })));
    api.push(envelope(json!({
        "payment_status": "pending",
        "order_status": null
    })));
    api.push(envelope(json!({
        "payment_status": "approved",
        "order_status": "pendiente"
    })));

    let receipt = client.create_order_and_pay(4, Some("sin timbre".into())).await;
    assert!(receipt.success, "checkout failed: {}", receipt.message);
    let receipt = receipt.data.expect("receipt");
    assert_eq!(receipt.order.id, 10);
    assert_eq!(
        receipt.preference.map(|p| p.preference_id),
        Some("pref-10".to_string())
    );

    assert!(client.with_cart(|cart| cart.is_empty()));
    assert!(store.get(keys::CART).is_none());
    assert!(store.get(keys::CHECKOUT_CART).is_none());
    assert!(store.get(keys::PENDING_ORDER_ID).is_some());

    wait_until_poll_stops(&client).await;
    let (status, payment) = client
        .book()
        .with(|b| b.get(10).map(|o| (o.status, o.payment_status)))
        .expect("order in book");
    assert_eq!(status, OrderStatus::Pendiente);
    assert_eq!(payment, Some(PaymentStatus::Approved));
    assert_eq!(
        api.calls(),
        vec![
            "create_order",
            "payment_preference",
            "payment_status",
            "payment_status"
        ]
    );
}

#[tokio::test]
async fn test_empty_cart_never_reaches_network() {
    let (client, api, _, _) = client_at("/checkout");
    login(&client);

    let result = client.create_order_from_cart(4, None).await;
    assert!(!result.success);
    assert_eq!(result.message, "El carrito está vacío");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_anonymous_checkout_stashes_cart_for_login() {
    let (client, api, _, store) = client_at("/carrito");
    client.with_cart(|cart| {
        let p = product(7, 5);
        cart.add_item(&p);
        cart.add_item(&p);
        cart.add_item(&p);
    });

    let result = client.proceed_to_checkout().await;
    assert!(!result.success);
    assert_eq!(
        result.message,
        "Debe iniciar sesión para continuar con la compra"
    );
    assert!(store.get(keys::PENDING_CART).is_some());
    assert!(api.calls().is_empty());

    // Back from login: the stash restores with quantity intact.
    login(&client);
    client.with_cart(|cart| cart.clear());
    client.restore_pending_cart();
    assert_eq!(client.with_cart(|cart| cart.total_items()), 3);
    assert!(store.get(keys::PENDING_CART).is_none());
}

#[tokio::test]
async fn test_proceed_to_checkout_writes_snapshot() {
    let (client, api, _, store) = client_at("/carrito");
    login(&client);
    client.with_cart(|cart| {
        let p = product(7, 5);
        cart.add_item(&p);
        cart.add_item(&p);
    });

    let result = client.proceed_to_checkout().await;
    assert!(result.success);
    let snapshot = result.data.expect("snapshot");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].category, "productos");
    assert_eq!(snapshot[0].quantity, 2);
    assert!(store.get(keys::CHECKOUT_CART).is_some());
    // Snapshot only; nothing remote happens until the order is placed.
    assert!(api.calls().is_empty());
    assert_eq!(client.with_cart(|cart| cart.total_items()), 2);
}

#[tokio::test]
async fn test_session_expiry_on_unauthorized_fetch() {
    let (client, api, navigator, store) = client_at("/ordenes");
    login(&client);
    client.with_cart(|cart| {
        cart.add_item(&product(7, 5));
    });

    api.push(http_error(401, "Unauthorized", None));
    let result = client.orders().fetch_orders().await;

    assert!(!result.success);
    assert_eq!(
        result.message,
        "Su sesión ha expirado. Por favor, inicie sesión nuevamente."
    );
    assert!(!client.session().is_authenticated());
    assert!(store.get(keys::TOKEN).is_none());
    // Expiry is not logout: the cart survives.
    assert!(store.get(keys::CART).is_some());
    assert_eq!(navigator.visits(), vec![LOGIN_ROUTE.to_string()]);
}

#[tokio::test]
async fn test_payment_link_failure_keeps_order_payable() {
    let (client, api, _, _) = client_at("/checkout");
    login(&client);
    client.with_cart(|cart| {
        cart.add_item(&product(7, 5));
    });

    api.push(envelope(order_json(10, "pendiente_pago")));
    api.push(http_error(500, "Internal Server Error", None));

    let result = client.create_order_and_pay(4, None).await;
    assert!(!result.success);
    let receipt = result.data.expect("order survives the link failure");
    assert_eq!(receipt.order.id, 10);
    assert!(receipt.preference.is_none());
    assert!(!client.payments().is_polling());
    assert!(client.book().with(|b| b.get(10).is_some()));

    // Retry from the order list succeeds and polls to completion.
    api.push(envelope(json!({
        "preference_id": "pref-retry",
        "init_point": "https://checkout.example/pref-retry"
    })));
    api.push(envelope(json!({
        "payment_status": "approved",
        "order_status": "pendiente"
    })));
    let retry = client.retry_payment(10).await;
    assert!(retry.success);
    wait_until_poll_stops(&client).await;
    assert_eq!(
        client.book().with(|b| b.get(10).map(|o| o.status)),
        Some(OrderStatus::Pendiente)
    );
}

#[tokio::test]
async fn test_logout_halts_polling_and_clears_everything() {
    let (client, api, navigator, store) = client_at("/ordenes");
    login(&client);
    client
        .book()
        .with(|b| b.prepend_current(serde_json::from_value(order_json(10, "pendiente_pago")).unwrap()));
    client.with_cart(|cart| {
        cart.add_item(&product(7, 5));
    });

    api.push(envelope(json!({
        "preference_id": "pref-10",
        "init_point": "https://checkout.example/pref-10"
    })));
    let link = client.retry_payment(10).await;
    assert!(link.success);
    assert!(client.payments().is_polling());

    client.session().logout();
    assert!(!client.payments().is_polling());
    for key in keys::TEARDOWN_KEYS {
        assert!(store.get(key).is_none(), "key {key} survived logout");
    }
    assert_eq!(navigator.visits().last().map(String::as_str), Some("/"));
}

#[tokio::test]
async fn test_payment_return_is_authoritative() {
    let (client, api, _, store) = client_at("/pago/retorno");
    login(&client);
    client
        .book()
        .with(|b| b.prepend_current(serde_json::from_value(order_json(10, "pendiente_pago")).unwrap()));
    store.set(keys::PENDING_ORDER_ID, "10");

    let mut confirmed = order_json(10, "pendiente");
    confirmed["payment_status"] = json!("approved");
    api.push(envelope(confirmed));

    let result = client.confirm_payment_return(10).await;
    assert!(result.success);
    assert_eq!(
        client.book().with(|b| b.current().map(|o| o.status)),
        Some(OrderStatus::Pendiente)
    );
    assert!(store.get(keys::PENDING_ORDER_ID).is_none());
}
