//! HTTP client executing [`RequestConfig`]s.
//!
//! The [`Client`] turns a request description into exactly one [`ApiResult`].
//! It never panics and never returns early with anything but an [`ApiError`]:
//! missing tokens, error statuses, transport failures, undecodable bodies and
//! cancellations all come back as values.

use crate::{
    auth::{StaticToken, TokenProvider},
    config::ApiConfig,
    error::{ApiError, ApiResult, ConfigError, ErrorCode},
    request::{AccessToken, RequestBody, RequestConfig, ResponseType},
    response::Payload,
    retry::RetryPolicy,
    sanitize::sanitize,
    signal::AbortSignal,
};
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, HeaderName, HeaderValue, Method,
};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A client for the reading platform API.
///
/// The client is cheap to clone and meant to be shared; clones use the same
/// connection pool, configuration and token provider.
///
/// # Examples
///
/// ```no_run
/// use pagewise::{Client, RequestConfig, RetryPolicy, StaticToken};
/// use serde::Deserialize;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct Book {
///     id: String,
///     title: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .token_provider(StaticToken::new("session-token"))
///     .build()?;
///
/// let request = RequestConfig::get("/api/books")
///     .with_retry(RetryPolicy::new(2, Duration::from_millis(500)));
///
/// match client.call::<Vec<Book>>(request).await {
///     Ok(books) => println!("{} books", books.len()),
///     Err(err) => eprintln!("{} ({:?}): {}", err.code, err.status_code, err.message),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    config: ApiConfig,
    token_provider: Arc<dyn TokenProvider>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Makes a single attempt, ignoring any retry policy on the request.
    ///
    /// The steps are: resolve the access token (a missing token fails with
    /// `UNAUTHORIZED`/401 before anything is sent), add the default JSON content
    /// type, send, then classify the status or decode the body according to
    /// the declared [`ResponseType`].
    pub async fn execute(&self, request: RequestConfig) -> ApiResult<Payload> {
        self.run(&request, None).await
    }

    /// Makes the call, retrying transient failures per the request's [`RetryPolicy`].
    ///
    /// Without a policy this is exactly [`Client::execute`]. With one, a
    /// response whose status is retryable, or a transport failure, is retried
    /// after the policy's fixed delay while attempts remain. Any other error
    /// status is returned at once, and a success returns immediately.
    pub async fn execute_with_retry(&self, request: RequestConfig) -> ApiResult<Payload> {
        let policy = request.retry.clone();
        self.run(&request, policy.as_ref()).await
    }

    /// Makes the call with retries and deserializes the JSON payload into `T`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pagewise::{Client, RequestConfig};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Participant { id: String, name: String }
    ///
    /// # async fn example(client: Client) {
    /// let request = RequestConfig::get("/api/participants")
    ///     .with_query_param("name", Some("Ada"));
    /// if let Ok(found) = client.call::<Vec<Participant>>(request).await {
    ///     println!("{} matches", found.len());
    /// }
    /// # }
    /// ```
    pub async fn call<T>(&self, request: RequestConfig) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let method = request.method.clone();
        let path = request.path.clone();
        let payload = self.execute_with_retry(request).await?;

        payload.json().inspect_err(|e| {
            tracing::error!(
                method = %method,
                path = %path,
                error = %e,
                "Failed to deserialize response"
            );
        })
    }

    /// Makes a GET request to the specified path.
    pub async fn get<Res>(&self, path: impl Into<String>) -> ApiResult<Res>
    where
        Res: DeserializeOwned,
    {
        self.call(RequestConfig::get(path)).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> ApiResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let request = RequestConfig::new(Method::POST, path)
            .with_json(body)
            .map_err(ApiError::unexpected)?;
        self.call(request).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> ApiResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let request = RequestConfig::new(Method::PUT, path)
            .with_json(body)
            .map_err(ApiError::unexpected)?;
        self.call(request).await
    }

    /// Makes a DELETE request to the specified path, ignoring the response body.
    pub async fn delete(&self, path: impl Into<String>) -> ApiResult<()> {
        let request =
            RequestConfig::new(Method::DELETE, path).with_response_type(ResponseType::None);
        self.execute_with_retry(request).await.map(|_| ())
    }

    async fn run(&self, request: &RequestConfig, policy: Option<&RetryPolicy>) -> ApiResult<Payload> {
        let url = self.inner.config.build_url(
            &request.path,
            request.query.iter().map(|(k, v)| (k.as_str(), v.as_deref())),
        );
        let headers = self.prepare_headers(request).await?;
        let signal = request.signal.as_ref();

        // A malformed form fails the same way on every attempt.
        if let RequestBody::Form(form) = &request.body {
            form.to_multipart().map_err(|e| self.exception(request, e))?;
        }

        let Some(policy) = policy else {
            let response = match abortable(signal, self.send(request, &url, &headers, 1)).await {
                None => return Err(self.aborted(request)),
                Some(Err(e)) => return Err(self.exception(request, e)),
                Some(Ok(response)) => response,
            };
            if !response.status().is_success() {
                return Err(self.fail_response(request, response).await);
            }
            return self.decode(request, response, 1).await;
        };

        let mut last_error = None;

        for attempt in 1..=policy.max_attempts() {
            let retry_delay = policy.delay_for_attempt(attempt);

            match abortable(signal, self.send(request, &url, &headers, attempt)).await {
                None => return Err(self.aborted(request)),
                Some(Ok(response)) => {
                    let status = response.status();
                    if status.is_success() {
                        return self.decode(request, response, attempt).await;
                    }

                    match retry_delay {
                        Some(delay) if policy.is_retryable(status.as_u16()) => {
                            let error = self.error_from_response(request, response).await;
                            if error.is_cancellation() {
                                return Err(self.aborted(request));
                            }
                            tracing::info!(
                                method = %request.method,
                                path = %request.path,
                                status = status.as_u16(),
                                delay_ms = delay.as_millis() as u64,
                                attempt = attempt,
                                "Retrying request after delay"
                            );
                            last_error = Some(error);
                            if abortable(signal, tokio::time::sleep(delay)).await.is_none() {
                                return Err(self.aborted(request));
                            }
                        }
                        _ => return Err(self.fail_response(request, response).await),
                    }
                }
                Some(Err(e)) => match retry_delay {
                    Some(delay) => {
                        tracing::warn!(
                            method = %request.method,
                            path = %request.path,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt,
                            "Request failed, retrying after delay"
                        );
                        if abortable(signal, tokio::time::sleep(delay)).await.is_none() {
                            return Err(self.aborted(request));
                        }
                    }
                    None => return Err(self.exception(request, e)),
                },
            }
        }

        Err(last_error
            .unwrap_or_else(|| ApiError::new(ErrorCode::UnexpectedError, "Max retries reached")))
    }

    /// Merges headers, attaches the bearer token and the default content type.
    async fn prepare_headers(&self, request: &RequestConfig) -> ApiResult<HeaderMap> {
        let mut headers = self.inner.default_headers.clone();
        for (name, value) in &request.headers {
            headers.insert(name.clone(), value.clone());
        }

        let token = match &request.access_token {
            AccessToken::Omit => None,
            AccessToken::Explicit(token) if token.is_empty() => None,
            AccessToken::Explicit(token) => Some(token.clone()),
            AccessToken::Default => match self.inner.token_provider.access_token().await {
                Some(token) if !token.is_empty() => Some(token),
                _ => {
                    tracing::warn!(
                        method = %request.method,
                        path = %request.path,
                        "Access token is not set"
                    );
                    return Err(ApiError::missing_token());
                }
            },
        };

        if let Some(token) = token {
            let mut value = HeaderValue::try_from(format!("Bearer {}", token))
                .map_err(|e| self.exception(request, e))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        // reqwest appends its own multipart header carrying the boundary.
        if request.body.is_form() {
            headers.remove(CONTENT_TYPE);
        } else if request.wants_json_content_type() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(headers)
    }

    /// Sends one attempt.
    async fn send(
        &self,
        request: &RequestConfig,
        url: &str,
        headers: &HeaderMap,
        attempt: usize,
    ) -> Result<reqwest::Response, reqwest::Error> {
        tracing::debug!(
            method = %request.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut builder = self
            .inner
            .http_client
            .request(request.method.clone(), url)
            .headers(headers.clone());

        if let Some(timeout) = self.inner.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Text(text) => builder.body(text.clone()),
            RequestBody::Form(form) => builder.multipart(form.to_multipart()?),
        };

        builder.send().await
    }

    /// Decodes a successful response according to the declared response type.
    async fn decode(
        &self,
        request: &RequestConfig,
        response: reqwest::Response,
        attempt: usize,
    ) -> ApiResult<Payload> {
        if attempt > 1 {
            tracing::info!(
                method = %request.method,
                path = %request.path,
                retries = attempt - 1,
                "Success after retries"
            );
        } else {
            tracing::info!(
                method = %request.method,
                path = %request.path,
                status = response.status().as_u16(),
                "Success"
            );
        }

        if request.response_type == ResponseType::None {
            return Ok(Payload::None);
        }

        let bytes = match abortable(request.signal.as_ref(), response.bytes()).await {
            None => return Err(self.aborted(request)),
            Some(Err(e)) => return Err(self.exception(request, e)),
            Some(Ok(bytes)) => bytes,
        };

        match request.response_type {
            ResponseType::Json => serde_json::from_slice(&bytes)
                .map(Payload::Json)
                .map_err(|e| self.exception(request, e)),
            ResponseType::Text => String::from_utf8(bytes.to_vec())
                .map(Payload::Text)
                .map_err(|e| self.exception(request, e)),
            ResponseType::Blob => Ok(Payload::Blob(bytes.to_vec())),
            ResponseType::None => Ok(Payload::None),
        }
    }

    /// Classifies an error response without logging it.
    async fn error_from_response(
        &self,
        request: &RequestConfig,
        response: reqwest::Response,
    ) -> ApiError {
        let status = response.status();
        let body = match abortable(request.signal.as_ref(), response.bytes()).await {
            None => return ApiError::aborted(),
            Some(Ok(bytes)) => bytes.to_vec(),
            Some(Err(_)) => Vec::new(),
        };

        ApiError::from_response(status, &body, request.response_type == ResponseType::Json)
    }

    /// Classifies and logs the final error response of a call.
    async fn fail_response(&self, request: &RequestConfig, response: reqwest::Response) -> ApiError {
        let error = self.error_from_response(request, response).await;
        if error.is_cancellation() {
            return self.aborted(request);
        }

        let details = error.details.as_ref().map(sanitize).unwrap_or_default();
        match error.status_code {
            Some(status) if (400..500).contains(&status) => tracing::error!(
                method = %request.method,
                path = %request.path,
                status = status,
                code = %error.code,
                error_message = %error.message,
                details = %details,
                "Client error (4xx)"
            ),
            status => tracing::warn!(
                method = %request.method,
                path = %request.path,
                status = ?status,
                code = %error.code,
                error_message = %error.message,
                details = %details,
                "Server error"
            ),
        }

        error
    }

    fn aborted(&self, request: &RequestConfig) -> ApiError {
        let error = ApiError::aborted();
        tracing::info!(
            method = %request.method,
            path = %request.path,
            code = %error.code,
            "Request was cancelled"
        );
        error
    }

    /// Maps a failure raised while sending or decoding into an `UNEXPECTED_ERROR`.
    fn exception(&self, request: &RequestConfig, cause: impl std::fmt::Display) -> ApiError {
        let error = ApiError::unexpected(cause);
        tracing::error!(
            method = %request.method,
            path = %request.path,
            code = %error.code,
            error_message = %error.message,
            "Caught error"
        );
        error
    }
}

/// Runs `future` unless `signal` aborts first; `None` means it was aborted.
async fn abortable<F: Future>(signal: Option<&AbortSignal>, future: F) -> Option<F::Output> {
    let Some(signal) = signal else {
        return Some(future.await);
    };
    if signal.is_aborted() {
        return None;
    }

    tokio::select! {
        biased;
        _ = signal.cancelled() => None,
        output = future => Some(output),
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use pagewise::{ApiConfig, ClientBuilder, StaticToken};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), pagewise::ConfigError> {
/// let client = ClientBuilder::new()
///     .config(ApiConfig::from_env()?)
///     .token_provider(StaticToken::new("session-token"))
///     .timeout(Duration::from_secs(30))
///     .default_header("Accept-Language", "en")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: Option<ApiConfig>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            config: None,
            token_provider: None,
            default_headers: HeaderMap::new(),
            timeout: None,
        }
    }

    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or invalid.
    pub fn base_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.config = Some(ApiConfig::new(url)?);
        Ok(self)
    }

    /// Sets where access tokens come from.
    ///
    /// Without a provider, requests using [`AccessToken::Default`] fail with
    /// `UNAUTHORIZED`.
    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, ConfigError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBaseUrl`] if no base URL was provided, or
    /// an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<Client, ConfigError> {
        let config = self.config.ok_or(ConfigError::MissingBaseUrl)?;
        let http_client = reqwest::Client::builder().build()?;
        let token_provider = self
            .token_provider
            .unwrap_or_else(|| Arc::new(StaticToken::none()));

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                config,
                token_provider,
                default_headers: self.default_headers,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
