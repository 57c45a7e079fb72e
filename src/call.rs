//! Stateful, cancellable wrapper around one kind of API call.
//!
//! An [`ApiCall`] adapts a request function into something a UI can drive:
//! it publishes `data`/`error`/`loading` state, cancels superseded calls,
//! re-runs the last call on request and turns failures into error dialogs.
//!
//! The state moves `Idle -> Loading -> Success | Failed`, back to idle through
//! [`ApiCall::reset`], and from `Loading` straight back to idle when the call
//! is cancelled. Cancelled calls never touch `data` or `error`.

use crate::{
    debounce::Debounced,
    dialog::{Callback, DialogPresenter, ErrorDialog, ErrorDialogSource, Navigator},
    error::{ApiError, ApiResult, ErrorCode},
    signal::{AbortController, AbortSignal},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
type RequestFn<P, T> = Arc<dyn Fn(P, AbortSignal) -> BoxFuture<ApiResult<T>> + Send + Sync>;

/// Observable state of an [`ApiCall`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCallState<T> {
    /// Data of the last successful call.
    pub data: Option<T>,
    /// The last failure handed to the error policy.
    pub error: Option<ApiError>,
    pub loading: bool,
}

impl<T> Default for ApiCallState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

struct Options<P, T> {
    on_success: Option<Arc<dyn Fn(&T, &P) + Send + Sync>>,
    on_error: Option<Arc<dyn Fn(&ApiError) + Send + Sync>>,
    error_dialog: Option<ErrorDialogSource>,
    on_cancel: Option<Callback>,
    on_finally: Option<Callback>,
    loading_sink: Option<Arc<dyn Fn(bool) + Send + Sync>>,
    cancel_previous_request: bool,
    abort_on_drop: bool,
    presenter: Option<Arc<dyn DialogPresenter>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl<P, T> Default for Options<P, T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            error_dialog: None,
            on_cancel: None,
            on_finally: None,
            loading_sink: None,
            cancel_previous_request: false,
            abort_on_drop: false,
            presenter: None,
            navigator: None,
        }
    }
}

struct Inner<P, T> {
    request: RequestFn<P, T>,
    options: Options<P, T>,
    state: watch::Sender<ApiCallState<T>>,
    current: Mutex<Option<AbortController>>,
    last_params: Mutex<Option<P>>,
}

impl<P, T> Drop for Inner<P, T> {
    fn drop(&mut self) {
        if self.options.abort_on_drop {
            if let Some(controller) = lock(&self.current).take() {
                controller.abort();
            }
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A repeatable API operation with observable state.
///
/// Clones share the same state and in-flight call.
///
/// # Examples
///
/// ```no_run
/// use pagewise::{ApiCall, Client, ErrorDialog, RequestConfig};
/// use serde::Deserialize;
///
/// #[derive(Debug, Clone, Deserialize)]
/// struct Book {
///     id: String,
///     title: String,
/// }
///
/// # async fn example(client: Client) {
/// let fetch_book = ApiCall::builder(move |book_id: String, signal| {
///     let client = client.clone();
///     async move {
///         let request = RequestConfig::get(format!("/api/books/{}", book_id)).with_signal(signal);
///         client.call::<Book>(request).await
///     }
/// })
/// .error_dialog(ErrorDialog::new("Error", "Could not load the book.").with_try_again())
/// .cancel_previous_request(true)
/// .build();
///
/// fetch_book.execute("b-1".to_string()).await;
/// if let Some(book) = fetch_book.state().data {
///     println!("{}", book.title);
/// }
/// # }
/// ```
pub struct ApiCall<P, T> {
    inner: Arc<Inner<P, T>>,
}

impl<P, T> Clone for ApiCall<P, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P, T> ApiCall<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Starts configuring a call around `request`.
    ///
    /// `request` receives the parameters and the abort signal of the attempt;
    /// it should pass the signal on to [`RequestConfig::with_signal`](crate::RequestConfig::with_signal).
    pub fn builder<F, Fut>(request: F) -> ApiCallBuilder<P, T>
    where
        F: Fn(P, AbortSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        ApiCallBuilder {
            request: Arc::new(move |params: P, signal: AbortSignal| -> BoxFuture<ApiResult<T>> {
                Box::pin(request(params, signal))
            }),
            options: Options::default(),
        }
    }

    /// Wraps `request` with default options.
    pub fn new<F, Fut>(request: F) -> Self
    where
        F: Fn(P, AbortSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        Self::builder(request).build()
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> ApiCallState<T> {
        self.inner.state.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ApiCallState<T>> {
        self.inner.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Runs the call with `params` and applies the outcome.
    ///
    /// Success stores the data and calls `on_success`. A failure is recorded as
    /// the error and handed to `on_error`, or shown as a dialog. Cancelled calls
    /// change neither; `on_cancel` runs when this call's signal was aborted. A
    /// panic in the request function is reported as an `UNEXPECTED_ERROR`.
    /// `on_finally` always runs last.
    pub async fn execute(&self, params: P) {
        let inner = &self.inner;

        if inner.options.cancel_previous_request {
            self.cancel_request();
        }

        let controller = AbortController::new();
        *lock(&inner.current) = Some(controller.clone());
        *lock(&inner.last_params) = Some(params.clone());
        self.set_loading(true);

        let signal = controller.signal();
        let future = (inner.request)(params.clone(), signal.clone());
        let outcome = match tokio::spawn(future).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(ApiError::aborted()),
            Err(e) => {
                let message = panic_message(e.into_panic());
                tracing::error!(error = %message, "Unhandled error in API call");
                Err(ApiError::new(ErrorCode::UnexpectedError, message.clone())
                    .with_details(serde_json::Value::String(message)))
            }
        };

        if signal.is_aborted() {
            if let Some(on_cancel) = &inner.options.on_cancel {
                on_cancel();
            }
        } else {
            match outcome {
                Ok(data) => {
                    inner.state.send_modify(|state| state.data = Some(data.clone()));
                    if let Some(on_success) = &inner.options.on_success {
                        on_success(&data, &params);
                    }
                }
                Err(error) if error.is_cancellation() => {}
                Err(error) => self.handle_error(error),
            }
        }

        // A newer call may own the loading flag by now.
        let owns_loading = {
            let mut current = lock(&inner.current);
            match current.as_ref() {
                Some(active) if active.same_as(&controller) => {
                    *current = None;
                    true
                }
                Some(_) => false,
                None => true,
            }
        };
        if owns_loading {
            self.set_loading(false);
        }

        if let Some(on_finally) = &inner.options.on_finally {
            on_finally();
        }
    }

    /// Aborts the in-flight call, if any.
    pub fn cancel_request(&self) {
        if let Some(controller) = lock(&self.inner.current).take() {
            controller.abort();
        }
    }

    /// Clears data, error and loading, and cancels the in-flight call.
    pub fn reset(&self) {
        self.inner.state.send_modify(|state| *state = ApiCallState::default());
        if let Some(sink) = &self.inner.options.loading_sink {
            sink(false);
        }
        self.cancel_request();
    }

    /// Wraps [`ApiCall::execute`] so bursts within `window` run only the last call.
    pub fn debounced(&self, window: Duration) -> Debounced<P, T> {
        Debounced::new(self.clone(), window)
    }

    fn set_loading(&self, loading: bool) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
        if let Some(sink) = &self.inner.options.loading_sink {
            sink(loading);
        }
    }

    fn handle_error(&self, error: ApiError) {
        let options = &self.inner.options;
        self.inner
            .state
            .send_modify(|state| state.error = Some(error.clone()));

        if let Some(on_error) = &options.on_error {
            on_error(&error);
            return;
        }

        let dialog = options
            .error_dialog
            .as_ref()
            .map(|source| source.resolve(&error))
            .unwrap_or_default();

        let Some(presenter) = &options.presenter else {
            tracing::warn!(
                code = %error.code,
                error_message = %error.message,
                title = %dialog.title,
                "API call failed and no dialog presenter is configured"
            );
            return;
        };

        let buttons = dialog.buttons(Some(self.retry_action()), options.navigator.clone());
        presenter.present(&dialog.title, &dialog.message, buttons);
    }

    /// Builds the "Try Again" action re-running the call with its last parameters.
    fn retry_action(&self) -> Callback {
        let call = Arc::downgrade(&self.inner);
        let runtime = tokio::runtime::Handle::try_current().ok();

        Arc::new(move || {
            let Some(inner) = call.upgrade() else {
                return;
            };
            let call = ApiCall { inner };
            let Some(params) = lock(&call.inner.last_params).clone() else {
                return;
            };
            match &runtime {
                Some(runtime) => {
                    runtime.spawn(async move { call.execute(params).await });
                }
                None => tracing::warn!("No async runtime available to retry the call"),
            }
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unexpected error".to_string()
    }
}

/// Configures an [`ApiCall`].
pub struct ApiCallBuilder<P, T> {
    request: RequestFn<P, T>,
    options: Options<P, T>,
}

impl<P, T> ApiCallBuilder<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Called with the data and parameters of every successful call.
    pub fn on_success(mut self, f: impl Fn(&T, &P) + Send + Sync + 'static) -> Self {
        self.options.on_success = Some(Arc::new(f));
        self
    }

    /// Handles failures instead of the error dialog.
    pub fn on_error(mut self, f: impl Fn(&ApiError) + Send + Sync + 'static) -> Self {
        self.options.on_error = Some(Arc::new(f));
        self
    }

    /// Uses `source` for the dialog shown on failure.
    pub fn error_dialog(mut self, source: impl Into<ErrorDialogSource>) -> Self {
        self.options.error_dialog = Some(source.into());
        self
    }

    /// Builds the failure dialog from each error.
    pub fn error_dialog_with(
        mut self,
        f: impl Fn(&ApiError) -> ErrorDialog + Send + Sync + 'static,
    ) -> Self {
        self.options.error_dialog = Some(ErrorDialogSource::Computed(Arc::new(f)));
        self
    }

    /// Called when a call finishes after its signal was aborted.
    pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.options.on_cancel = Some(Arc::new(f));
        self
    }

    /// Called at the end of every call, whatever the outcome.
    pub fn on_finally(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.options.on_finally = Some(Arc::new(f));
        self
    }

    /// Mirrors loading changes into state owned elsewhere.
    pub fn loading_sink(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.options.loading_sink = Some(Arc::new(f));
        self
    }

    /// Cancels the in-flight call whenever a new one starts.
    pub fn cancel_previous_request(mut self, enabled: bool) -> Self {
        self.options.cancel_previous_request = enabled;
        self
    }

    /// Aborts the in-flight call when the last handle is dropped.
    pub fn abort_on_drop(mut self, enabled: bool) -> Self {
        self.options.abort_on_drop = enabled;
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn DialogPresenter>) -> Self {
        self.options.presenter = Some(presenter);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.options.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> ApiCall<P, T> {
        let (state, _) = watch::channel(ApiCallState::default());
        ApiCall {
            inner: Arc::new(Inner {
                request: self.request,
                options: self.options,
                state,
                current: Mutex::new(None),
                last_params: Mutex::new(None),
            }),
        }
    }
}
