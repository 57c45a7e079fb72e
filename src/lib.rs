//! # Pagewise - API layer of the pagewise reading app
//!
//! Pagewise talks to the reading platform's REST API: books, reading sessions,
//! comprehension tests and statistics. It has two layers:
//!
//! - [`Client`] turns a [`RequestConfig`] into an [`ApiResult`]. It attaches
//!   the bearer token, classifies error statuses into [`ErrorCode`]s, decodes
//!   successful bodies, retries transient failures and honours cancellation.
//!   It never panics on a failed request: every failure is an [`ApiError`].
//! - [`ApiCall`] wraps one kind of call for a UI: observable loading/data/error
//!   state, cancellation of superseded calls, "try again" and error dialogs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagewise::{ApiConfig, Client, RequestConfig, RetryPolicy, StaticToken};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Debug, Deserialize)]
//! struct Book {
//!     id: String,
//!     title: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fails fast if API_BASE_URL is not set.
//!     let client = Client::builder()
//!         .config(ApiConfig::from_env()?)
//!         .token_provider(StaticToken::new("session-token"))
//!         .build()?;
//!
//!     let request = RequestConfig::get("/api/books")
//!         .with_retry(RetryPolicy::new(2, Duration::from_millis(500)));
//!
//!     match client.call::<Vec<Book>>(request).await {
//!         Ok(books) => println!("{} books", books.len()),
//!         Err(err) => eprintln!("{}: {}", err.code, err.message),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Failed calls resolve to an [`ApiError`] rather than a panic:
//!
//! ```no_run
//! use pagewise::{Client, ErrorCode, RequestConfig};
//!
//! # async fn example(client: Client) {
//! match client.call::<serde_json::Value>(RequestConfig::get("/api/statistics")).await {
//!     Ok(stats) => println!("{}", stats),
//!     Err(err) if err.code == ErrorCode::Unauthorized => eprintln!("please sign in again"),
//!     Err(err) if err.is_cancellation() => {}
//!     Err(err) => eprintln!("{} (status {:?}): {}", err.code, err.status_code, err.message),
//! }
//! # }
//! ```
//!
//! ## Logging
//!
//! Requests, retries and failures are reported through `tracing`. The crate
//! installs no subscriber, so nothing is emitted unless the application sets
//! one up. Error bodies are passed through [`sanitize::sanitize`] first.

mod auth;
mod call;
mod client;
mod config;
mod debounce;
pub mod dialog;
mod error;
mod request;
mod response;
pub mod retry;
pub mod sanitize;
mod signal;

pub use auth::{StaticToken, TokenProvider};
pub use call::{ApiCall, ApiCallBuilder, ApiCallState};
pub use client::{Client, ClientBuilder};
pub use config::{ApiConfig, BASE_URL_ENV};
pub use debounce::Debounced;
pub use dialog::{
    ButtonStyle, DialogButton, DialogPresenter, ErrorDialog, ErrorDialogSource, Navigation,
    Navigator,
};
pub use error::{ApiError, ApiResult, ConfigError, ErrorCode, LARGE_IMAGE_MESSAGE};
pub use request::{AccessToken, FormData, RequestBody, RequestConfig, ResponseType};
pub use response::Payload;
pub use retry::RetryPolicy;
pub use signal::{AbortController, AbortSignal};
