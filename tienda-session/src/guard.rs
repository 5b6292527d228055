use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use tienda_core::payment::PollHalt;
use tienda_core::result::{FailureObserver, Normalized};
use tienda_store::{get_json, keys, set_json, KeyValueStore};

use crate::context::{token_expiry, SessionContext, UserType};

pub const LOGIN_ROUTE: &str = "/auth/login";

/// Route awareness for the guard: where the visitor is and how to move
/// them. The UI shell provides the real one; tests record.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn go(&self, path: &str);
}

/// Owns the session lifecycle: restore on startup, persist on login, and
/// the two teardown paths. Expiry clears credentials only; an explicit
/// logout clears every session-scoped key, cart included.
pub struct SessionGuard {
    ctx: Mutex<SessionContext>,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    public_routes: Vec<String>,
    poll: Mutex<Option<Arc<dyn PollHalt>>>,
}

impl SessionGuard {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        public_routes: Vec<String>,
    ) -> Self {
        Self {
            ctx: Mutex::new(SessionContext::default()),
            store,
            navigator,
            public_routes,
            poll: Mutex::new(None),
        }
    }

    fn ctx(&self) -> std::sync::MutexGuard<'_, SessionContext> {
        self.ctx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the poll loop to halt on teardown.
    pub fn attach_poll(&self, halt: Arc<dyn PollHalt>) {
        *self.poll.lock().unwrap_or_else(PoisonError::into_inner) = Some(halt);
    }

    fn halt_poll(&self) {
        let halt = self
            .poll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(halt) = halt {
            halt.halt();
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.ctx().is_authenticated()
    }

    pub fn snapshot(&self) -> SessionContext {
        self.ctx().clone()
    }

    pub fn is_public_route(&self, path: &str) -> bool {
        self.public_routes.iter().any(|route| route == path)
    }

    /// Restores the session from durable storage. A stored token without a
    /// stored expiry falls back to the token's own `exp` claim. An already
    /// expired session tears itself down immediately.
    pub fn init(&self) {
        let token = self.store.get(keys::TOKEN);
        let Some(token) = token else {
            return;
        };

        let expires_at = get_json::<DateTime<Utc>>(self.store.as_ref(), keys::EXPIRES_AT)
            .or_else(|| token_expiry(&token));

        {
            let mut ctx = self.ctx();
            ctx.token = Some(token);
            ctx.user = get_json(self.store.as_ref(), keys::CURRENT_USER);
            ctx.user_type = get_json(self.store.as_ref(), keys::USER_TYPE);
            ctx.user_role = get_json(self.store.as_ref(), keys::USER_ROLE);
            ctx.expires_at = expires_at;
        }

        if self.ctx().is_expired(Utc::now()) {
            warn!("stored session already expired, tearing down credentials");
            self.expire();
        } else {
            info!("session restored from storage");
        }
    }

    /// Records a fresh login. The expiry comes from the token's `exp`
    /// claim when the backend does not state one explicitly.
    pub fn establish(
        &self,
        token: &str,
        user: Value,
        user_type: UserType,
        user_role: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let expires_at = expires_at.or_else(|| token_expiry(token));

        self.store.set(keys::TOKEN, token);
        set_json(self.store.as_ref(), keys::CURRENT_USER, &user);
        set_json(self.store.as_ref(), keys::USER_TYPE, &user_type);
        // A session without a role or expiry must not inherit one from a
        // previous account's keys.
        match &user_role {
            Some(role) => set_json(self.store.as_ref(), keys::USER_ROLE, role),
            None => self.store.remove(keys::USER_ROLE),
        }
        match &expires_at {
            Some(expires_at) => set_json(self.store.as_ref(), keys::EXPIRES_AT, expires_at),
            None => self.store.remove(keys::EXPIRES_AT),
        }

        let mut ctx = self.ctx();
        ctx.token = Some(token.to_string());
        ctx.user = Some(user);
        ctx.user_type = Some(user_type);
        ctx.user_role = user_role;
        ctx.expires_at = expires_at;
        info!("session established");
    }

    /// Forced expiry: durable credentials are wiped and the whole
    /// in-memory identity resets; the cart survives. The visitor is sent
    /// to the login entry point unless they are on a public route already.
    pub fn expire(&self) {
        for key in keys::AUTH_KEYS {
            self.store.remove(key);
        }

        *self.ctx() = SessionContext::default();

        self.halt_poll();

        let path = self.navigator.current_path();
        if !self.is_public_route(&path) {
            info!(from = %path, "session expired, redirecting to login");
            self.navigator.go(LOGIN_ROUTE);
        }
    }

    /// Explicit logout: every session-scoped key goes, cart and pending
    /// order state included, and the visitor lands on the home route.
    pub fn logout(&self) {
        for key in keys::TEARDOWN_KEYS {
            self.store.remove(key);
        }

        *self.ctx() = SessionContext::default();
        self.halt_poll();
        self.navigator.go("/");
        info!("session closed");
    }

    /// True once less than `threshold_seconds` of lifetime remains. The
    /// periodic refresh task calls this each tick.
    pub fn refresh_needed(&self, threshold_seconds: u64) -> bool {
        let ctx = self.ctx();
        if !ctx.is_authenticated() {
            return false;
        }
        match ctx.remaining_seconds(Utc::now()) {
            Some(remaining) => remaining <= threshold_seconds as i64,
            None => false,
        }
    }
}

impl FailureObserver for SessionGuard {
    /// A 401 on any call except a login attempt means the backend no
    /// longer honors the token. 403 is an authorization verdict on a live
    /// session and tears nothing down.
    fn on_failure(&self, normalized: &Normalized, login_attempt: bool) {
        if normalized.status == 401 && !login_attempt {
            self.expire();
        }
    }
}
