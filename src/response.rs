//! Decoded bodies of successful responses.
//!
//! The shape of a [`Payload`] follows the [`ResponseType`](crate::ResponseType)
//! the request declared.

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The body of a successful response.
///
/// # Examples
///
/// ```
/// use pagewise::Payload;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Book {
///     id: String,
/// }
///
/// let payload = Payload::Json(serde_json::json!({"id": "b-1"}));
/// let book: Book = payload.json().unwrap();
/// assert_eq!(book.id, "b-1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Blob(Vec<u8>),
    Text(String),
    /// The request asked for no body.
    None,
}

impl Payload {
    /// Deserializes the payload into `T`.
    ///
    /// A [`Payload::None`] deserializes like JSON `null`, so `()` and
    /// `Option<_>` accept it. Text payloads deserialize like a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an `UNEXPECTED_ERROR` if the payload does not match `T`.
    pub fn json<T: DeserializeOwned>(self) -> ApiResult<T> {
        let value = match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
            Payload::None => Value::Null,
            Payload::Blob(_) => {
                return Err(ApiError::unexpected("binary response cannot be decoded as JSON"))
            }
        };
        serde_json::from_value(value).map_err(ApiError::unexpected)
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Payload::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}
