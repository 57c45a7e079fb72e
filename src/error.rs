//! Error types for API calls.
//!
//! Every request failure becomes an [`ApiError`] carried inside an
//! [`ApiResult`]. Problems assembling a client or a request (a missing base URL,
//! an invalid header) are reported separately as [`ConfigError`], because they
//! are misconfiguration rather than request outcomes.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message used for every `413 Payload Too Large` response, whatever the body says.
pub const LARGE_IMAGE_MESSAGE: &str = "The image size is too large";

/// Fields of a JSON error body that may carry the human-readable message, in
/// lookup order.
const MESSAGE_FIELDS: [&str; 5] = ["error", "message", "detail", "errorMessage", "description"];

/// The outcome of one logical API call.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Classification of a failed call.
///
/// The first eight variants form the closed taxonomy. [`ErrorCode::Http`] covers
/// statuses the taxonomy does not classify and [`ErrorCode::Other`] carries any
/// code string supplied by the server.
///
/// # Examples
///
/// ```
/// use pagewise::ErrorCode;
///
/// assert_eq!(ErrorCode::from("NOT_FOUND"), ErrorCode::NotFound);
/// assert_eq!(ErrorCode::Http(302).to_string(), "HTTP_302");
/// assert_eq!(ErrorCode::from("BOOK_LOCKED"), ErrorCode::Other("BOOK_LOCKED".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    ServerError,
    /// The uploaded payload (in practice an image) exceeded the server limit.
    LargeImage,
    /// The call was cancelled through its abort signal.
    RequestAborted,
    /// A transport, decoding or internal failure.
    UnexpectedError,
    /// A non-success status outside the classified ranges.
    Http(u16),
    /// A code string taken verbatim from the server's error body.
    Other(String),
}

impl ErrorCode {
    /// Classifies a non-success HTTP status.
    ///
    /// # Examples
    ///
    /// ```
    /// use http::StatusCode;
    /// use pagewise::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::from_status(StatusCode::UNAUTHORIZED), ErrorCode::Unauthorized);
    /// assert_eq!(ErrorCode::from_status(StatusCode::CONFLICT), ErrorCode::ValidationError);
    /// assert_eq!(ErrorCode::from_status(StatusCode::BAD_GATEWAY), ErrorCode::ServerError);
    /// ```
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            413 => ErrorCode::LargeImage,
            400..=499 => ErrorCode::ValidationError,
            500..=u16::MAX => ErrorCode::ServerError,
            other => ErrorCode::Http(other),
        }
    }

    /// Returns the wire name of this code.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        use std::borrow::Cow;

        match self {
            ErrorCode::Unauthorized => Cow::Borrowed("UNAUTHORIZED"),
            ErrorCode::Forbidden => Cow::Borrowed("FORBIDDEN"),
            ErrorCode::NotFound => Cow::Borrowed("NOT_FOUND"),
            ErrorCode::ValidationError => Cow::Borrowed("VALIDATION_ERROR"),
            ErrorCode::ServerError => Cow::Borrowed("SERVER_ERROR"),
            ErrorCode::LargeImage => Cow::Borrowed("LARGE_IMAGE"),
            ErrorCode::RequestAborted => Cow::Borrowed("REQUEST_ABORTED"),
            ErrorCode::UnexpectedError => Cow::Borrowed("UNEXPECTED_ERROR"),
            ErrorCode::Http(status) => Cow::Owned(format!("HTTP_{}", status)),
            ErrorCode::Other(code) => Cow::Borrowed(code),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "UNAUTHORIZED" => ErrorCode::Unauthorized,
            "FORBIDDEN" => ErrorCode::Forbidden,
            "NOT_FOUND" => ErrorCode::NotFound,
            "VALIDATION_ERROR" => ErrorCode::ValidationError,
            "SERVER_ERROR" => ErrorCode::ServerError,
            "LARGE_IMAGE" => ErrorCode::LargeImage,
            "REQUEST_ABORTED" => ErrorCode::RequestAborted,
            "UNEXPECTED_ERROR" => ErrorCode::UnexpectedError,
            other => other
                .strip_prefix("HTTP_")
                .and_then(|rest| rest.parse::<u16>().ok().filter(|s| s.to_string() == rest))
                .map(ErrorCode::Http)
                .unwrap_or_else(|| ErrorCode::Other(other.to_string())),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::from(code.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().into_owned()
    }
}

/// The structured failure of an API call.
///
/// # Examples
///
/// ```
/// use pagewise::{ApiError, ErrorCode};
///
/// let err = ApiError::new(ErrorCode::NotFound, "Book not found").with_status(404);
/// assert_eq!(err.status_code, Some(404));
/// assert!(!err.is_cancellation());
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Classification of the failure.
    pub code: ErrorCode,
    /// Human-readable description, suitable for display.
    pub message: String,
    /// The parsed error body or the underlying cause, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// HTTP status of the response, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            status_code: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The error returned when a call needs a token and the provider has none.
    pub fn missing_token() -> Self {
        Self::new(ErrorCode::Unauthorized, "Access token is not set").with_status(401)
    }

    /// The error returned for a call cancelled through its abort signal.
    pub fn aborted() -> Self {
        Self::new(ErrorCode::RequestAborted, "Request was cancelled")
    }

    /// Wraps an unexpected failure, keeping its description as details.
    pub fn unexpected(cause: impl fmt::Display) -> Self {
        let cause = cause.to_string();
        Self::new(ErrorCode::UnexpectedError, format!("Unexpected error: {}", cause))
            .with_details(Value::String(cause))
    }

    /// Builds the error for a non-success response from its status and body.
    ///
    /// The status decides the initial code and message. When `parse_body` is
    /// set (the call expected JSON), a JSON body may override the message with
    /// the first populated of `error`, `message`, `detail`, `errorMessage` and
    /// `description`, and a string `code` field overrides the code. A body that
    /// is not JSON becomes the message as plain text, unless it is empty.
    /// A `413` response is never overridden.
    ///
    /// # Examples
    ///
    /// ```
    /// use http::StatusCode;
    /// use pagewise::{ApiError, ErrorCode};
    ///
    /// let err = ApiError::from_response(
    ///     StatusCode::UNPROCESSABLE_ENTITY,
    ///     br#"{"message": ["title is required"], "code": "INVALID_BOOK"}"#,
    ///     true,
    /// );
    /// assert_eq!(err.code, ErrorCode::Other("INVALID_BOOK".into()));
    /// assert_eq!(err.message, "title is required");
    /// assert_eq!(err.status_code, Some(422));
    /// ```
    pub fn from_response(status: StatusCode, body: &[u8], parse_body: bool) -> Self {
        let mut code = ErrorCode::from_status(status);
        let mut message = match code {
            ErrorCode::LargeImage => LARGE_IMAGE_MESSAGE.to_string(),
            _ => status.canonical_reason().unwrap_or_default().to_string(),
        };
        let mut details = None;
        // 413 keeps its fixed code and message whatever the body says.
        let overridable = code != ErrorCode::LargeImage;

        if parse_body {
            match serde_json::from_slice::<Value>(body) {
                Ok(data) => {
                    if overridable {
                        if let Some(found) = extract_message(&data) {
                            message = found;
                        }
                        if let Some(server_code) = data.get("code").and_then(Value::as_str) {
                            if !server_code.is_empty() {
                                code = ErrorCode::from(server_code);
                            }
                        }
                    }
                    details = Some(data);
                }
                Err(_) => {
                    let text = String::from_utf8_lossy(body);
                    if overridable && !text.is_empty() {
                        message = text.into_owned();
                    }
                }
            }
        }

        Self {
            code,
            message,
            details,
            status_code: Some(status.as_u16()),
        }
    }

    /// Returns `true` if this error only records that the call was cancelled.
    pub fn is_cancellation(&self) -> bool {
        self.code == ErrorCode::RequestAborted
    }
}

/// Looks up the first populated message field of a JSON error body.
fn extract_message(data: &Value) -> Option<String> {
    let object = data.as_object()?;
    MESSAGE_FIELDS.iter().find_map(|field| {
        let value = object.get(*field)?;
        let value = match value {
            Value::Array(items) => items.first()?,
            other => other,
        };
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    })
}

/// Errors raised while assembling a client or a request.
///
/// These never come out of a request in flight; they signal that the program
/// itself is misconfigured.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// No API base URL was configured.
    #[error("API base URL is not set")]
    MissingBaseUrl,

    /// The configured base URL is not an absolute URL.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// A header name or value could not be used.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A request body could not be serialized to JSON.
    #[error("Failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_precedence() {
        let cases = [
            (401, ErrorCode::Unauthorized),
            (403, ErrorCode::Forbidden),
            (404, ErrorCode::NotFound),
            (413, ErrorCode::LargeImage),
            (400, ErrorCode::ValidationError),
            (429, ErrorCode::ValidationError),
            (500, ErrorCode::ServerError),
            (503, ErrorCode::ServerError),
            (304, ErrorCode::Http(304)),
        ];

        for (status, expected) in cases {
            let status = StatusCode::from_u16(status).unwrap();
            assert_eq!(ErrorCode::from_status(status), expected, "status {}", status);
        }
    }

    #[test]
    fn test_large_image_ignores_body() {
        let bodies: [&[u8]; 3] = [
            b"<html>nginx</html>",
            br#"{"error": "file too big", "code": "TOO_BIG"}"#,
            b"",
        ];

        for body in bodies {
            let err = ApiError::from_response(StatusCode::PAYLOAD_TOO_LARGE, body, true);
            assert_eq!(err.code, ErrorCode::LargeImage);
            assert_eq!(err.message, LARGE_IMAGE_MESSAGE);
            assert_eq!(err.status_code, Some(413));
        }
    }

    #[test]
    fn test_message_field_order() {
        let body = json!({
            "description": "last",
            "detail": "third",
            "message": "",
        });
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            body.to_string().as_bytes(),
            true,
        );
        assert_eq!(err.message, "third");
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.details, Some(body));
    }

    #[test]
    fn test_text_fallback() {
        let err = ApiError::from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            b"upstream exploded",
            true,
        );
        assert_eq!(err.code, ErrorCode::ServerError);
        assert_eq!(err.message, "upstream exploded");
        assert_eq!(err.details, None);
    }

    #[test]
    fn test_empty_body_keeps_status_message() {
        let err = ApiError::from_response(StatusCode::FORBIDDEN, b"", true);
        assert_eq!(err.message, "Forbidden");
    }

    #[test]
    fn test_body_not_parsed_for_other_response_types() {
        let err = ApiError::from_response(
            StatusCode::NOT_FOUND,
            br#"{"error": "missing", "code": "GONE"}"#,
            false,
        );
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Not Found");
    }

    #[test]
    fn test_server_code_string_is_preserved() {
        for code in ["HTTP_0500", "HTTP_+404", "HTTP_", "HTTP_70000"] {
            let parsed = ErrorCode::from(code);
            assert_eq!(parsed, ErrorCode::Other(code.to_string()));
            assert_eq!(parsed.to_string(), code);
        }
        assert_eq!(ErrorCode::from("HTTP_418"), ErrorCode::Http(418));
    }

    #[test]
    fn test_code_serializes_as_wire_name() {
        let err = ApiError::new(ErrorCode::Http(302), "Found").with_status(302);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"code": "HTTP_302", "message": "Found", "statusCode": 302})
        );

        let back: ApiError = serde_json::from_value(value).unwrap();
        assert_eq!(back, err);
    }
}
