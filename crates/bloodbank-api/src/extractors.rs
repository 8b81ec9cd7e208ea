//! # Custom Extractors & Validation
//!
//! Helpers that turn axum's extractor rejections into [`AppError`]s so
//! every malformed body or query answers with the standard error body.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use serde::de::DeserializeOwned;

use bloodbank_core::BloodGroup;

use crate::error::AppError;

/// Request types that check shape rules serde cannot express.
pub trait Validate {
    /// Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

/// Parse a body that may be absent. An empty body yields `T::default()`.
pub fn extract_optional_json<T>(body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("Failed to parse the request body as JSON: {err}")))
}

/// Extract a query string, mapping rejections to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a blood group taken from a query string.
///
/// An unescaped `+` in a query string decodes to a space, so `A+` arrives
/// as `"A "`. A trailing space is read back as the `+` it was.
pub fn parse_group_param(raw: &str) -> Result<BloodGroup, AppError> {
    let restored;
    let candidate = if raw.ends_with(' ') && !raw.trim().is_empty() {
        restored = format!("{}+", raw.trim_end());
        restored.as_str()
    } else {
        raw
    };
    candidate
        .parse()
        .map_err(|e: bloodbank_core::ValidationError| AppError::BadRequest(e.to_string()))
}

/// Parse a UUID-backed id from a query string.
pub fn parse_id_param<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::BadRequest(format!("invalid {name} {raw:?}: {e}")))
}
