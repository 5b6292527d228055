//! Fixed registry of durable storage keys. Every session-scoped key is
//! enumerated here so teardown clears them all in one place.

pub const CART: &str = "cart";
pub const CHECKOUT_CART: &str = "checkoutCart";
pub const PENDING_CART: &str = "pendingCart";
pub const PENDING_ORDER_ID: &str = "pendingOrderId";
pub const CURRENT_ORDER_ID: &str = "currentOrderId";
pub const PURCHASED_PRODUCTS: &str = "purchasedProducts";

pub const TOKEN: &str = "token";
pub const CURRENT_USER: &str = "currentUser";
pub const USER_TYPE: &str = "userType";
pub const USER_ROLE: &str = "userRole";
pub const EXPIRES_AT: &str = "expiresAt";

/// Credential keys cleared on forced expiry. Cart state is left alone;
/// only the session dies.
pub const AUTH_KEYS: [&str; 3] = [TOKEN, CURRENT_USER, EXPIRES_AT];

/// Every session-scoped key, cleared together on logout.
pub const TEARDOWN_KEYS: [&str; 11] = [
    TOKEN,
    CURRENT_USER,
    USER_TYPE,
    USER_ROLE,
    EXPIRES_AT,
    CART,
    CHECKOUT_CART,
    PENDING_CART,
    PENDING_ORDER_ID,
    CURRENT_ORDER_ID,
    PURCHASED_PRODUCTS,
];
