use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Which audience the credentials belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Cliente,
    Usuario,
}

/// The in-memory view of the authenticated session. Everything here is a
/// mirror of durable storage; storage is the source of truth across
/// restarts.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub token: Option<String>,
    pub user: Option<Value>,
    pub user_type: Option<UserType>,
    pub user_role: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// Seconds of session lifetime left, if an expiry is known.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at
            .map(|expires_at| (expires_at - now).num_seconds())
    }
}

#[derive(Debug, Deserialize)]
struct ExpClaim {
    exp: i64,
}

/// Reads the `exp` claim out of a bearer token without verifying the
/// signature. Verification is the backend's job; locally the claim only
/// schedules the proactive refresh.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let decoded = jsonwebtoken::decode::<ExpClaim>(
        token,
        &DecodingKey::from_secret(&[]),
        &validation,
    );
    match decoded {
        Ok(data) => Utc.timestamp_opt(data.claims.exp, 0).single(),
        Err(err) => {
            debug!("token carries no readable expiry: {err}");
            None
        }
    }
}
