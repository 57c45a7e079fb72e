//! Fetches the book list and one book's statistics.
//!
//! This example shows how to:
//! - Configure the client from `API_BASE_URL`
//! - Make a retried GET request with query parameters
//! - Drive a call through `ApiCall` and watch its state
//!
//! Run with: `API_BASE_URL=https://api.example.com cargo run --example fetch_books`

use pagewise::{
    ApiCall, ApiConfig, Client, DialogButton, DialogPresenter, ErrorDialog, RequestConfig,
    RetryPolicy, StaticToken,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
struct Book {
    id: String,
    title: String,
}

/// Prints dialogs to the terminal instead of drawing them.
struct ConsolePresenter;

impl DialogPresenter for ConsolePresenter {
    fn present(&self, title: &str, message: &str, buttons: Vec<DialogButton>) {
        let labels: Vec<_> = buttons.iter().map(|b| b.text.as_str()).collect();
        println!("[{}] {} {:?}", title, message, labels);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("pagewise=debug,fetch_books=info")
        .init();

    let token = std::env::var("API_TOKEN").unwrap_or_default();
    let client = Client::builder()
        .config(ApiConfig::from_env()?)
        .token_provider(StaticToken::new(token))
        .timeout(Duration::from_secs(10))
        .build()?;

    println!("=== Book list ===");
    let request = RequestConfig::get("/api/books")
        .with_query_param("page", Some("1"))
        .with_query_param("search", None::<String>)
        .with_retry(RetryPolicy::new(2, Duration::from_millis(500)));

    match client.call::<Vec<Book>>(request).await {
        Ok(books) => {
            for book in &books {
                println!("{} - {}", book.id, book.title);
            }
        }
        Err(err) => println!("Could not list books: {} ({})", err.message, err.code),
    }
    println!();

    println!("=== Statistics through ApiCall ===");
    let fetch_statistics = ApiCall::builder({
        let client = client.clone();
        move |book_id: String, signal| {
            let client = client.clone();
            async move {
                let request = RequestConfig::get("/api/statistics")
                    .with_query_param("bookId", Some(book_id))
                    .with_signal(signal);
                client.call::<serde_json::Value>(request).await
            }
        }
    })
    .presenter(Arc::new(ConsolePresenter))
    .error_dialog(ErrorDialog::new("Error", "Failed to load the statistics.").with_try_again())
    .cancel_previous_request(true)
    .build();

    let mut updates = fetch_statistics.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            println!("loading: {}", updates.borrow().loading);
        }
    });

    fetch_statistics.execute("b-1".to_string()).await;
    if let Some(stats) = fetch_statistics.state().data {
        println!("Statistics: {}", stats);
    }

    drop(fetch_statistics);
    watcher.await?;

    Ok(())
}
