//! Cancellation of in-flight calls.
//!
//! An [`AbortController`] owns the right to cancel; the [`AbortSignal`]s it hands
//! out only observe. Aborting is permanent and idempotent.

use std::sync::Arc;
use tokio::sync::watch;

/// Cancels the calls holding its signals.
///
/// # Examples
///
/// ```
/// use pagewise::AbortController;
///
/// let controller = AbortController::new();
/// let signal = controller.signal();
/// assert!(!signal.is_aborted());
///
/// controller.abort();
/// controller.abort();
/// assert!(signal.is_aborted());
/// ```
#[derive(Debug, Clone)]
pub struct AbortController {
    sender: Arc<watch::Sender<bool>>,
}

impl AbortController {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns a signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn abort(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.sender.borrow()
    }

    /// Returns `true` if both handles control the same signal.
    pub fn same_as(&self, other: &AbortController) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observes an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the controller aborts.
    ///
    /// Never resolves if the controller is dropped without aborting.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let waiter = tokio::spawn(async move { signal.cancelled().await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.abort();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancelled() should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_signal_created_after_abort_is_aborted() {
        let controller = AbortController::new();
        controller.abort();
        let signal = controller.signal();
        assert!(signal.is_aborted());
        signal.cancelled().await;
    }

    #[tokio::test]
    async fn test_dropped_controller_never_cancels() {
        let signal = AbortController::new().signal();
        let result = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(result.is_err());
        assert!(!signal.is_aborted());
    }

    #[test]
    fn test_same_as() {
        let a = AbortController::new();
        let b = a.clone();
        assert!(a.same_as(&b));
        assert!(!a.same_as(&AbortController::new()));
    }
}
