use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// The single canonical shape every remote-call outcome is coerced into.
/// No component branches on transport-level errors directly; they inspect
/// this instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Normalized {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    pub status: u16,
    pub details: Option<Value>,
    pub validation_errors: Vec<String>,
}

impl Normalized {
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            status,
            details: None,
            validation_errors: Vec::new(),
        }
    }
}

/// Boundary result returned by every cart/order/payment operation.
/// Callers branch on `success`; errors never cross the boundary as panics
/// or raw `Err` values.
#[derive(Debug, Clone)]
pub struct OpOutcome<T> {
    pub success: bool,
    pub message: String,
    pub validation_errors: Vec<String>,
    pub data: Option<T>,
}

impl<T> OpOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            validation_errors: Vec::new(),
            data: Some(data),
        }
    }

    pub fn ok_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            validation_errors: Vec::new(),
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            validation_errors: Vec::new(),
            data: None,
        }
    }

    pub fn from_error(err: ApiError) -> Self {
        let validation_errors = match &err {
            ApiError::RemoteValidation { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };
        Self {
            success: false,
            message: err.to_string(),
            validation_errors,
            data: None,
        }
    }
}

/// Observes the failure channel of every remote call, independently of the
/// component that issued it. The session guard hangs off this seam.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, normalized: &Normalized, login_attempt: bool);
}
