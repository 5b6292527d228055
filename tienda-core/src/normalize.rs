//! Response normalizer: coerces any remote-call outcome, success or
//! failure, into the canonical [`Normalized`] shape before any component
//! inspects it.

use serde_json::Value;
use tracing::debug;

use crate::api::RemoteOutcome;
use crate::error::ApiError;
use crate::result::{FailureObserver, Normalized};

pub const MSG_SESSION_EXPIRED: &str =
    "Su sesión ha expirado. Por favor, inicie sesión nuevamente.";
pub const MSG_BAD_CREDENTIALS: &str =
    "Credenciales incorrectas. Por favor, inténtelo nuevamente.";
pub const MSG_ACCOUNT_DISABLED: &str = "Usuario deshabilitado o no registrado.";
pub const MSG_NOT_FOUND: &str = "Recurso no encontrado.";
pub const MSG_VALIDATION: &str = "Error de validación. Por favor, revise los campos.";
pub const MSG_SERVER_ERROR: &str = "Error interno del servidor. Intente más tarde.";
pub const MSG_TIMEOUT: &str = "La solicitud ha tardado demasiado tiempo. Intente nuevamente.";
pub const MSG_DISCONNECTED: &str = "Error de conexión. Verifique su red.";
pub const MSG_UNEXPECTED_RESPONSE: &str = "Respuesta inesperada del servidor.";

/// Output of [`normalize`]: either the canonical JSON result or a binary
/// payload passed through untouched.
#[derive(Debug, Clone)]
pub enum Processed {
    Json(Normalized),
    Bytes(Vec<u8>),
}

/// Normalizes a raw remote outcome. Never panics: a malformed or
/// non-object body yields a canonical status-500 failure.
pub fn normalize(outcome: RemoteOutcome, login_attempt: bool) -> Processed {
    match outcome {
        RemoteOutcome::Binary(bytes) => Processed::Bytes(bytes),
        RemoteOutcome::Envelope(body) => Processed::Json(from_envelope(body)),
        RemoteOutcome::Http {
            status,
            status_text,
            body,
        } => Processed::Json(from_http_error(status, &status_text, body, login_attempt)),
        RemoteOutcome::Timeout => Processed::Json(Normalized::failure(0, MSG_TIMEOUT)),
        RemoteOutcome::Disconnected => {
            Processed::Json(Normalized::failure(0, MSG_DISCONNECTED))
        }
    }
}

/// Normalizes, reports failures to the observer, and classifies them.
/// This is the one path every component's remote call goes through.
pub fn process_remote(
    outcome: RemoteOutcome,
    login_attempt: bool,
    observer: Option<&dyn FailureObserver>,
) -> Result<Normalized, ApiError> {
    match normalize(outcome, login_attempt) {
        Processed::Json(normalized) if normalized.success => Ok(normalized),
        Processed::Json(normalized) => {
            if let Some(observer) = observer {
                observer.on_failure(&normalized, login_attempt);
            }
            Err(ApiError::classify(&normalized, login_attempt))
        }
        Processed::Bytes(_) => Err(ApiError::Decode(
            "se recibió un payload binario donde se esperaba JSON".into(),
        )),
    }
}

fn from_envelope(body: Value) -> Normalized {
    let Some(envelope) = body.as_object() else {
        return Normalized::failure(500, MSG_UNEXPECTED_RESPONSE);
    };

    let success = envelope
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let status = envelope
        .get("status")
        .and_then(Value::as_u64)
        .map(|s| s as u16)
        .unwrap_or(200);
    let data = envelope.get("data").filter(|v| !v.is_null()).cloned();
    let details = envelope.get("details").filter(|v| !v.is_null()).cloned();
    let top_level = string_list(envelope.get("errors"));

    finish(Normalized {
        success,
        message,
        data,
        status,
        details,
        validation_errors: top_level,
    })
}

fn from_http_error(
    status: u16,
    status_text: &str,
    body: Option<Value>,
    login_attempt: bool,
) -> Normalized {
    let body = body.unwrap_or(Value::Null);
    let details = body.get("details").filter(|v| !v.is_null()).cloned();

    let message = match status {
        401 if login_attempt => MSG_BAD_CREDENTIALS.to_string(),
        401 => MSG_SESSION_EXPIRED.to_string(),
        403 => MSG_ACCOUNT_DISABLED.to_string(),
        404 => MSG_NOT_FOUND.to_string(),
        422 => MSG_VALIDATION.to_string(),
        500 => MSG_SERVER_ERROR.to_string(),
        _ => format!("Error {status}: {status_text}"),
    };

    let validation_errors = if status == 422 {
        extract_validation(&body, details.as_ref())
    } else {
        string_list(body.get("errors"))
    };

    finish(Normalized {
        success: false,
        message,
        data: None,
        status,
        details,
        validation_errors,
    })
}

/// 422 bodies carry `errors` either as an array of messages or as a
/// field-keyed map of message arrays; `details` as an array is the last
/// resort.
fn extract_validation(body: &Value, details: Option<&Value>) -> Vec<String> {
    if let Some(map) = body.get("errors").and_then(Value::as_object) {
        return map
            .iter()
            .flat_map(|(field, messages)| {
                string_list(Some(messages))
                    .into_iter()
                    .map(move |msg| format!("{field}: {msg}"))
            })
            .collect();
    }
    let from_array = string_list(body.get("errors"));
    if !from_array.is_empty() {
        return from_array;
    }
    string_list(details)
}

/// Last stage shared by both paths: lift validation entries out of
/// `details` when nothing better was found, then scrub every user-facing
/// string of storage-engine vocabulary.
fn finish(mut normalized: Normalized) -> Normalized {
    if normalized.validation_errors.is_empty() {
        if let Some(details) = &normalized.details {
            let mut lifted = string_list(details.get("validation_errors"));
            if lifted.is_empty() {
                lifted = string_list(details.get("errors"));
            }
            if lifted.is_empty() && details.is_array() {
                lifted = string_list(Some(details));
            }
            normalized.validation_errors = lifted;
        }
    } else {
        // Backend-supplied entries are surfaced uppercased, as the admin
        // screens expect.
        normalized.validation_errors = normalized
            .validation_errors
            .iter()
            .map(|msg| msg.to_uppercase())
            .collect();
    }

    normalized.message = scrub_storage_vocabulary(&normalized.message);
    normalized.validation_errors = normalized
        .validation_errors
        .iter()
        .map(|msg| scrub_storage_vocabulary(msg))
        .collect();
    normalized
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Rewrites messages that leak storage-engine internals (constraint,
/// null-violation, duplicate-key phrasing) into short domain phrases.
fn scrub_storage_vocabulary(message: &str) -> String {
    if message.trim().is_empty() {
        return "Ha ocurrido un error inesperado".into();
    }

    let lowered = message.to_lowercase();
    let smells_of_storage = lowered.contains("sqlstate")
        || lowered.contains("not null violation")
        || lowered.contains("connection: pgsql");

    if smells_of_storage {
        debug!("scrubbing storage-engine message: {}", message);
        if lowered.contains("reference") && lowered.contains("not null") {
            return "La referencia de dirección es requerida".into();
        }
        if lowered.contains("not null violation") {
            return "Faltan campos requeridos en el formulario".into();
        }
        if lowered.contains("duplicate key") || lowered.contains("unique constraint") {
            return "Ya existe un registro con esta información".into();
        }
        if lowered.contains("foreign key constraint") {
            return "Error de integridad de datos".into();
        }
        return "Error al procesar la información. Por favor intenta nuevamente".into();
    }

    if message.len() > 200 && (lowered.contains("error:") || lowered.contains("detail:")) {
        return "Error de validación. Por favor revisa los datos ingresados".into();
    }

    message.to_string()
}
