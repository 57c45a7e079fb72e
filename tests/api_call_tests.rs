//! Tests for the call-lifecycle controller.

use pagewise::{
    AbortSignal, ApiCall, ApiError, ButtonStyle, Client, DialogButton, DialogPresenter,
    ErrorCode, ErrorDialog, Navigation, Navigator, RequestConfig, StaticToken,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Shown {
    title: String,
    message: String,
    buttons: Vec<DialogButton>,
}

#[derive(Default)]
struct RecordingPresenter {
    shown: Mutex<Vec<Shown>>,
}

impl RecordingPresenter {
    fn count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    fn button_texts(&self, index: usize) -> Vec<String> {
        self.shown.lock().unwrap()[index]
            .buttons
            .iter()
            .map(|b| b.text.clone())
            .collect()
    }

    fn press(&self, index: usize, text: &str) {
        let button = self.shown.lock().unwrap()[index]
            .buttons
            .iter()
            .find(|b| b.text == text)
            .cloned()
            .expect("button should exist");
        button.press();
    }
}

impl DialogPresenter for RecordingPresenter {
    fn present(&self, title: &str, message: &str, buttons: Vec<DialogButton>) {
        self.shown.lock().unwrap().push(Shown {
            title: title.to_string(),
            message: message.to_string(),
            buttons,
        });
    }
}

#[derive(Default)]
struct RecordingNavigator {
    calls: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn back(&self) {
        self.calls.lock().unwrap().push("back".into());
    }
    fn replace(&self, target: &str) {
        self.calls.lock().unwrap().push(format!("replace {}", target));
    }
    fn navigate(&self, target: &str) {
        self.calls.lock().unwrap().push(format!("navigate {}", target));
    }
    fn dismiss_to(&self, target: &str) {
        self.calls.lock().unwrap().push(format!("dismiss_to {}", target));
    }
}

fn server_error() -> ApiError {
    ApiError::new(ErrorCode::ServerError, "Internal Server Error").with_status(500)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition should become true");
}

#[tokio::test]
async fn test_success_updates_state_and_calls_on_success() {
    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();

    let call = ApiCall::builder(|book_id: String, _signal| async move {
        Ok(format!("Book {}", book_id))
    })
    .on_success(move |data: &String, params: &String| {
        *seen_clone.lock().unwrap() = Some((data.clone(), params.clone()));
    })
    .build();

    call.execute("b-1".to_string()).await;

    let state = call.state();
    assert_eq!(state.data.as_deref(), Some("Book b-1"));
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(
        *seen.lock().unwrap(),
        Some(("Book b-1".to_string(), "b-1".to_string()))
    );
}

#[tokio::test]
async fn test_failure_shows_default_dialog() {
    let presenter = Arc::new(RecordingPresenter::default());

    let call = ApiCall::<(), u32>::builder(|_, _signal| async { Err(server_error()) })
        .presenter(presenter.clone())
        .build();
    call.execute(()).await;

    assert_eq!(call.state().error, Some(server_error()));
    assert_eq!(presenter.count(), 1);

    let shown = presenter.shown.lock().unwrap();
    assert_eq!(shown[0].title, "Error");
    assert_eq!(
        shown[0].message,
        "An unexpected error occurred. Please try again later."
    );
    assert_eq!(shown[0].buttons.len(), 1);
    assert_eq!(shown[0].buttons[0].text, "OK");
    assert_eq!(shown[0].buttons[0].style, ButtonStyle::Cancel);
}

#[tokio::test]
async fn test_on_error_replaces_dialog() {
    let presenter = Arc::new(RecordingPresenter::default());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = errors.clone();

    let call = ApiCall::<(), u32>::builder(|_, _signal| async { Err(server_error()) })
        .presenter(presenter.clone())
        .on_error(move |e| errors_clone.lock().unwrap().push(e.code.clone()))
        .build();
    call.execute(()).await;

    assert_eq!(*errors.lock().unwrap(), vec![ErrorCode::ServerError]);
    assert_eq!(presenter.count(), 0);
    assert!(call.state().error.is_some());
}

#[tokio::test]
async fn test_try_again_reuses_last_params() {
    let presenter = Arc::new(RecordingPresenter::default());
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();

    let call = ApiCall::<u32, u32>::builder(move |page, _signal| {
        received_clone.lock().unwrap().push(page);
        async { Err(server_error()) }
    })
    .presenter(presenter.clone())
    .error_dialog(
        ErrorDialog::new("Error", "Failed to load the books.")
            .with_try_again()
            .with_cancel(),
    )
    .build();

    call.execute(7).await;
    assert_eq!(presenter.button_texts(0), vec!["Try Again", "OK"]);

    presenter.press(0, "Try Again");
    wait_until(|| presenter.count() == 2).await;

    assert_eq!(*received.lock().unwrap(), vec![7, 7]);
}

#[tokio::test]
async fn test_computed_dialog_and_dismiss_navigation() {
    let presenter = Arc::new(RecordingPresenter::default());
    let navigator = Arc::new(RecordingNavigator::default());

    let call = ApiCall::<(), u32>::builder(|_, _signal| async {
        Err(ApiError::new(ErrorCode::NotFound, "Book not found").with_status(404))
    })
    .presenter(presenter.clone())
    .navigator(navigator.clone())
    .error_dialog_with(|error| {
        ErrorDialog::new("Oops", error.message.clone())
            .with_navigation(Navigation::Replace("/books".into()))
    })
    .build();

    call.execute(()).await;
    {
        let shown = presenter.shown.lock().unwrap();
        assert_eq!(shown[0].title, "Oops");
        assert_eq!(shown[0].message, "Book not found");
    }

    presenter.press(0, "OK");
    assert_eq!(*navigator.calls.lock().unwrap(), vec!["replace /books"]);
}

#[tokio::test]
async fn test_cancel_request_leaves_state_untouched() {
    let started = Arc::new(Notify::new());
    let started_clone = started.clone();
    let cancelled = Arc::new(AtomicUsize::new(0));
    let cancelled_clone = cancelled.clone();
    let presenter = Arc::new(RecordingPresenter::default());

    let call = ApiCall::<bool, u32>::builder(move |block, signal: AbortSignal| {
        let started = started_clone.clone();
        async move {
            if block {
                started.notify_one();
                signal.cancelled().await;
                Err(ApiError::aborted())
            } else {
                Ok(1)
            }
        }
    })
    .presenter(presenter.clone())
    .on_cancel(move || {
        cancelled_clone.fetch_add(1, Ordering::SeqCst);
    })
    .build();

    call.execute(false).await;
    let before = call.state();
    assert_eq!(before.data, Some(1));

    let running = tokio::spawn({
        let call = call.clone();
        async move { call.execute(true).await }
    });
    started.notified().await;
    assert!(call.is_loading());

    call.cancel_request();
    call.cancel_request();
    running.await.unwrap();

    assert_eq!(call.state(), before);
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(presenter.count(), 0);
}

#[tokio::test]
async fn test_cancel_previous_request_keeps_latest_result() {
    let started = Arc::new(Notify::new());
    let started_clone = started.clone();

    let call = ApiCall::<u32, u32>::builder(move |value, signal: AbortSignal| {
        let started = started_clone.clone();
        async move {
            if value == 1 {
                started.notify_one();
                signal.cancelled().await;
            }
            // Resolves successfully even when cancelled; the controller must ignore it.
            Ok(value)
        }
    })
    .cancel_previous_request(true)
    .build();

    let first = tokio::spawn({
        let call = call.clone();
        async move { call.execute(1).await }
    });
    started.notified().await;

    call.execute(2).await;
    first.await.unwrap();

    let state = call.state();
    assert_eq!(state.data, Some(2));
    assert!(!state.loading);
}

#[tokio::test]
async fn test_panic_in_request_becomes_unexpected_error() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = errors.clone();
    let finished = Arc::new(AtomicUsize::new(0));
    let finished_clone = finished.clone();

    let call = ApiCall::<(), u32>::builder(|_, _signal| async {
        if true {
            panic!("book index corrupted");
        }
        Ok(0)
    })
    .on_error(move |e| errors_clone.lock().unwrap().push(e.clone()))
    .on_finally(move || {
        finished_clone.fetch_add(1, Ordering::SeqCst);
    })
    .build();

    call.execute(()).await;

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::UnexpectedError);
    assert_eq!(errors[0].message, "book index corrupted");
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!call.is_loading());
}

#[tokio::test]
async fn test_loading_sink_and_subscription() {
    let sink = Arc::new(Mutex::new(Vec::new()));
    let sink_clone = sink.clone();
    let release = Arc::new(Notify::new());
    let release_clone = release.clone();

    let call = ApiCall::<(), u32>::builder(move |_, _signal| {
        let release = release_clone.clone();
        async move {
            release.notified().await;
            Ok(5)
        }
    })
    .loading_sink(move |loading| sink_clone.lock().unwrap().push(loading))
    .build();

    let mut updates = call.subscribe();
    let running = tokio::spawn({
        let call = call.clone();
        async move { call.execute(()).await }
    });

    updates.wait_for(|state| state.loading).await.unwrap();
    release.notify_one();
    running.await.unwrap();

    assert_eq!(*sink.lock().unwrap(), vec![true, false]);
    assert_eq!(call.state().data, Some(5));
}

#[tokio::test]
async fn test_reset_clears_state() {
    let call = ApiCall::<u32, u32>::builder(|value, _signal| async move {
        if value == 0 {
            Err(server_error())
        } else {
            Ok(value)
        }
    })
    .on_error(|_| {})
    .build();

    call.execute(3).await;
    call.execute(0).await;
    let state = call.state();
    assert_eq!(state.data, Some(3));
    assert!(state.error.is_some());

    call.reset();
    let state = call.state();
    assert_eq!(state.data, None);
    assert_eq!(state.error, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_abort_on_drop() {
    let (tx, mut rx) = mpsc::unbounded_channel::<AbortSignal>();

    let call = ApiCall::<(), u32>::builder(move |_, signal: AbortSignal| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(signal.clone());
            signal.cancelled().await;
            Err(ApiError::aborted())
        }
    })
    .abort_on_drop(true)
    .build();

    let running = tokio::spawn({
        let call = call.clone();
        async move { call.execute(()).await }
    });
    let signal = rx.recv().await.unwrap();
    assert!(!signal.is_aborted());

    running.abort();
    let _ = running.await;
    drop(call);

    assert!(signal.is_aborted());
}

#[tokio::test]
async fn test_with_client_against_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .token_provider(StaticToken::new("session-token"))
        .build()
        .unwrap();

    let presenter = Arc::new(RecordingPresenter::default());
    let fetch_statistics = ApiCall::builder(move |participant_id: String, signal| {
        let client = client.clone();
        async move {
            let request = RequestConfig::get("/api/statistics")
                .with_query_param("participantId", Some(participant_id))
                .with_signal(signal);
            client.call::<serde_json::Value>(request).await
        }
    })
    .presenter(presenter.clone())
    .build();

    fetch_statistics.execute("p-1".to_string()).await;

    let error = fetch_statistics.state().error.unwrap();
    assert_eq!(error.code, ErrorCode::ServerError);
    assert_eq!(error.message, "Internal Server Error");
    assert_eq!(error.status_code, Some(500));
    assert_eq!(presenter.count(), 1);
}
