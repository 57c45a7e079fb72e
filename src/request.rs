//! Request descriptions.
//!
//! A [`RequestConfig`] describes one logical call: where it goes, what it
//! sends, how the response should be decoded and how it authenticates. The
//! executor may send it several times when a [`RetryPolicy`] is attached.

use crate::{error::ConfigError, retry::RetryPolicy, signal::AbortSignal};
use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;

/// How the body of a successful response is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Parse the body as JSON.
    #[default]
    Json,
    /// Keep the raw bytes.
    Blob,
    /// Read the body as UTF-8 text.
    Text,
    /// Ignore the body.
    None,
}

/// Which bearer token, if any, is sent with a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccessToken {
    /// Ask the client's token provider; fail with `UNAUTHORIZED` if it has none.
    #[default]
    Default,
    /// Send this token verbatim.
    Explicit(String),
    /// Send no `Authorization` header.
    Omit,
}

/// The body of a request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as JSON.
    Json(Value),
    /// Sent as-is.
    Text(String),
    /// Sent as `multipart/form-data` with a generated boundary.
    Form(FormData),
}

impl RequestBody {
    pub fn is_form(&self) -> bool {
        matches!(self, RequestBody::Form(_))
    }
}

/// A multipart form that can be rebuilt for every attempt.
///
/// # Examples
///
/// ```
/// use pagewise::FormData;
///
/// let form = FormData::new()
///     .text("title", "Matilda")
///     .file("file", b"%PDF-1.7".to_vec(), "matilda.pdf", "application/pdf");
/// assert_eq!(form.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        bytes: Vec<u8>,
        file_name: String,
        mime: String,
    },
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Appends a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            bytes,
            file_name: file_name.into(),
            mime: mime.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Builds the reqwest form for one attempt.
    pub(crate) fn to_multipart(&self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        use reqwest::multipart::{Form, Part};

        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    bytes,
                    file_name,
                    mime,
                } => {
                    let file = Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime)?;
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Everything needed to issue one logical API call.
///
/// # Examples
///
/// ```
/// use pagewise::{RequestConfig, ResponseType, RetryPolicy};
/// use http::Method;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), pagewise::ConfigError> {
/// let request = RequestConfig::new(Method::POST, "/api/tests")
///     .with_json(&serde_json::json!({"bookId": "b-1"}))?
///     .with_query_param("lang", Some("en"))
///     .with_response_type(ResponseType::Json)
///     .with_retry(RetryPolicy::new(2, Duration::from_millis(500)));
/// assert_eq!(request.method, Method::POST);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// The request path, appended to the base URL.
    pub path: String,

    /// The HTTP method.
    pub method: Method,

    /// Headers for this request.
    pub headers: HeaderMap,

    /// Query parameters in order; `None` and empty values are not sent.
    pub query: Vec<(String, Option<String>)>,

    pub body: RequestBody,

    pub response_type: ResponseType,

    pub access_token: AccessToken,

    /// Cancels the call when aborted.
    pub signal: Option<AbortSignal>,

    /// Retry policy used by [`Client::execute_with_retry`](crate::Client::execute_with_retry).
    pub retry: Option<RetryPolicy>,
}

impl RequestConfig {
    /// Creates a request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, ConfigError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter. `None` and empty values are skipped when sent.
    pub fn with_query_param(
        mut self,
        key: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Self {
        self.query.push((key.into(), value.map(Into::into)));
        self
    }

    /// Serializes `body` to JSON and uses it as the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ConfigError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    pub fn with_form(mut self, form: FormData) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_access_token(mut self, access_token: AccessToken) -> Self {
        self.access_token = access_token;
        self
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Returns `true` if the caller set a `Content-Type` header.
    pub fn has_content_type(&self) -> bool {
        self.headers.contains_key(CONTENT_TYPE)
    }

    /// Returns `true` if the client should add `Content-Type: application/json`.
    ///
    /// That happens only for JSON responses, without an explicit content type
    /// and never for multipart bodies, whose boundary reqwest assigns.
    pub fn wants_json_content_type(&self) -> bool {
        self.response_type == ResponseType::Json && !self.has_content_type() && !self.body.is_form()
    }
}
