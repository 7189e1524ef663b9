//! Fake TMDB search API
//!
//! Serves `GET /3/search/movie` from a small fixed catalog on a random
//! local port, and counts every search request it receives.

use super::constants::*;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

struct FakeMovie {
    id: i64,
    title: &'static str,
    year: i32,
    vote_average: f64,
    vote_count: f64,
    popularity: f64,
}

fn fake_catalog() -> Vec<FakeMovie> {
    vec![
        FakeMovie {
            id: ARRIVAL_TMDB_ID,
            title: ARRIVAL_TITLE,
            year: ARRIVAL_YEAR,
            vote_average: 8.0,
            vote_count: 1000.0,
            popularity: 10.0,
        },
        FakeMovie {
            id: 536869,
            title: CATS_TITLE,
            year: CATS_YEAR,
            vote_average: 0.0,
            vote_count: 0.0,
            popularity: 0.0,
        },
        FakeMovie {
            id: 593,
            title: SOLARIS_TITLE,
            year: SOLARIS_YEAR,
            vote_average: 7.0,
            vote_count: 540.0,
            popularity: 0.5,
        },
        FakeMovie {
            id: 194,
            title: AMELIE_TITLE,
            year: AMELIE_YEAR,
            vote_average: 7.6,
            vote_count: 250.0,
            popularity: 3.0,
        },
    ]
}

#[derive(Clone)]
struct FakeState {
    catalog: Arc<Vec<FakeMovie>>,
    requests: Arc<AtomicUsize>,
}

#[derive(Deserialize)]
struct SearchParams {
    api_key: Option<String>,
    query: String,
    year: Option<i32>,
}

async fn search_movie(State(state): State<FakeState>, Query(params): Query<SearchParams>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    if params.api_key.as_deref() != Some(TEST_API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status_code": 7, "status_message": "Invalid API key"})),
        )
            .into_response();
    }
    if params.query == RATE_LIMITED_TITLE {
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }
    if params.query == GARBLED_TITLE {
        return (StatusCode::OK, "<html>definitely not json</html>").into_response();
    }

    let results: Vec<_> = state
        .catalog
        .iter()
        .filter(|m| m.title == params.query && params.year.map_or(true, |y| y == m.year))
        .map(|m| {
            json!({
                "id": m.id,
                "title": m.title,
                "release_date": format!("{}-01-01", m.year),
                "vote_average": m.vote_average,
                "vote_count": m.vote_count,
                "popularity": m.popularity,
                "poster_path": POSTER_PATH,
            })
        })
        .collect();

    Json(json!({
        "page": 1,
        "total_results": results.len(),
        "results": results,
    }))
    .into_response()
}

/// Fake TMDB instance, shut down when dropped.
pub struct FakeTmdbServer {
    /// Base URL to hand to the client (e.g., "http://127.0.0.1:12345/3")
    pub base_url: String,

    requests: Arc<AtomicUsize>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeTmdbServer {
    pub async fn spawn() -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let state = FakeState {
            catalog: Arc::new(fake_catalog()),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/3/search/movie", get(search_movie))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake TMDB server failed");
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}/3", port),
            requests,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready(port).await;
        server
    }

    /// Number of search requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn wait_for_ready(&self, port: u16) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Fake TMDB server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client
                .get(format!("http://127.0.0.1:{}/health", port))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}
