//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use valorix_api::http::ApiError;
use valorix_api::observability::{ErrorReporter, RequestContext};
use valorix_api::{ApiServer, AppState, Settings};

/// Reporter that keeps every captured fault for inspection.
#[derive(Default)]
pub struct RecordingReporter {
    faults: Mutex<Vec<(String, RequestContext)>>,
}

impl RecordingReporter {
    pub fn faults(&self) -> Vec<(String, RequestContext)> {
        self.faults.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn capture_fault(&self, message: &str, request: &RequestContext) {
        self.faults
            .lock()
            .unwrap()
            .push((message.to_string(), request.clone()));
    }
}

/// A running API instance on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub reporter: Arc<RecordingReporter>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn explode() -> &'static str {
    panic!("ledger index corrupted");
}

/// Routes standing in for business routers.
fn test_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/ping", get(|| async { "pong" }))
        .route(
            "/api/v1/fail",
            get(|| async { Err::<(), _>(ApiError::internal("valuation table missing")) }),
        )
        .route("/api/v1/panic", get(explode))
}

pub async fn spawn_server(settings: Settings) -> TestServer {
    let reporter = Arc::new(RecordingReporter::default());
    let server = ApiServer::with_routes(settings, reporter.clone(), test_routes()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown, stop) = oneshot::channel();
    tokio::spawn(async move {
        let stop = async move {
            let _ = stop.await;
        };
        server.run(listener, stop).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        reporter,
        shutdown: Some(shutdown),
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
