//! Trailing-edge debouncing for [`ApiCall::execute`].

use crate::call::ApiCall;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Collapses bursts of calls into the last one.
///
/// Each [`trigger`](Debounced::trigger) restarts the window; the call runs with
/// the most recent parameters once the window passes without a new trigger.
/// The wrapped [`ApiCall`] knows nothing about debouncing.
///
/// # Examples
///
/// ```no_run
/// use pagewise::ApiCall;
/// use std::time::Duration;
///
/// # async fn example(search: ApiCall<String, Vec<String>>) {
/// let search = search.debounced(Duration::from_millis(300));
/// search.trigger("m".to_string());
/// search.trigger("ma".to_string());
/// search.trigger("mat".to_string()); // only this one is sent
/// # }
/// ```
pub struct Debounced<P, T> {
    call: ApiCall<P, T>,
    window: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<P, T> Clone for Debounced<P, T> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
            window: self.window,
            pending: self.pending.clone(),
        }
    }
}

impl<P, T> Debounced<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(call: ApiCall<P, T>, window: Duration) -> Self {
        Self {
            call,
            window,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Schedules a call with `params`, replacing any call still waiting.
    ///
    /// Outside a Tokio runtime nothing is scheduled and a warning is logged.
    pub fn trigger(&self, params: P) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available to run the debounced call");
            return;
        };
        let call = self.call.clone();
        let window = self.window;

        let timer = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            // Detached so that a later trigger cannot abort a call already running.
            tokio::spawn(async move { call.execute(params).await });
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(timer);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Drops the waiting call, if any.
    pub fn cancel(&self) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            pending.abort();
        }
    }

    /// The wrapped call.
    pub fn inner(&self) -> &ApiCall<P, T> {
        &self.call
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
