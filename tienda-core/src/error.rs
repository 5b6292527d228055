use crate::result::Normalized;

/// Error taxonomy shared across all remote calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Rejected locally before any network traffic.
    #[error("{0}")]
    Validation(String),

    /// HTTP 422 with per-field messages preserved.
    #[error("{message}")]
    RemoteValidation { message: String, errors: Vec<String> },

    /// HTTP 401/403. Triggers session teardown unless the originating call
    /// was itself a login attempt.
    #[error("{message}")]
    Auth {
        message: String,
        status: u16,
        login_attempt: bool,
    },

    /// Timeout or connection failure. No automatic retry; the caller
    /// decides.
    #[error("{0}")]
    Transient(String),

    /// 5xx or anything else the backend reported as a failure.
    #[error("{0}")]
    Server(String),

    /// Response arrived but did not match the documented schema.
    #[error("respuesta con formato inesperado: {0}")]
    Decode(String),
}

impl ApiError {
    /// Buckets a normalized failure into the taxonomy.
    pub fn classify(normalized: &Normalized, login_attempt: bool) -> Self {
        match normalized.status {
            0 => Self::Transient(normalized.message.clone()),
            401 | 403 => Self::Auth {
                message: normalized.message.clone(),
                status: normalized.status,
                login_attempt,
            },
            422 => Self::RemoteValidation {
                message: normalized.message.clone(),
                errors: normalized.validation_errors.clone(),
            },
            _ => Self::Server(normalized.message.clone()),
        }
    }
}
