use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::html;
use crate::plan;
use crate::scrape;
use crate::types::{PageData, ViewRow};
use crate::upstream::{SubmitOutcome, Upstream};

/// Application state shared across requests
pub struct AppState {
    pub upstream: Upstream,
    pub page: RwLock<FetchedPage>,
}

/// The last fetch of the homework page.
///
/// `data` is None when the expected structure was missing; requests then
/// see the original document untouched.
pub struct FetchedPage {
    pub raw: String,
    pub data: Option<PageData>,
}

impl FetchedPage {
    pub fn from_raw(raw: String) -> Self {
        match scrape::extract(&raw) {
            Ok(data) => Self {
                raw,
                data: Some(data),
            },
            Err(e) => {
                warn!(error = %e, "page structure not recognized, serving it untouched");
                Self { raw, data: None }
            }
        }
    }
}

/// Start the proxy server
pub async fn serve(port: u16, settings: Settings) -> anyhow::Result<()> {
    let upstream = Upstream::new(&settings.page_url)?;

    println!("Fetching {}...", settings.page_url);
    let raw = upstream.fetch_page().await?;

    let state = Arc::new(AppState {
        upstream,
        page: RwLock::new(FetchedPage::from_raw(raw)),
    });

    if settings.refresh_secs > 0 {
        start_refresh_task(state.clone(), settings.refresh_secs);
    }

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\nServer running at http://{}", addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/submit", post(submit_handler))
        .route("/api/rows", get(rows_handler))
        .route("/api/status", get(status_handler))
        .route("/api/refresh", get(refresh_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Re-fetch the page on an interval so the merged view stays current
fn start_refresh_task(state: Arc<AppState>, secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        interval.tick().await; // the first tick completes immediately
        loop {
            interval.tick().await;
            match refresh(&state).await {
                Ok(()) => debug!("page refreshed"),
                Err(e) => warn!(error = %e, "refresh failed, keeping the last page"),
            }
        }
    });
}

async fn refresh(state: &AppState) -> anyhow::Result<()> {
    let raw = state.upstream.fetch_page().await?;
    *state.page.write().await = FetchedPage::from_raw(raw);
    Ok(())
}

/// Serve the merged view, or the untouched original when the page was not
/// recognized
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let page = state.page.read().await;
    match &page.data {
        Some(data) => {
            let plan = plan::build_plan(data, Local::now().naive_local());
            Html(html::render_page(&plan).into_string())
        }
        None => Html(page.raw.clone()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub assignment: String,
}

/// Relay one submission to the institution server.
///
/// The response is what the user ends up looking at: on success the
/// server's own response body, on failure the self-submitting fallback
/// form.
async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Form(request): Form<SubmitRequest>,
) -> Response {
    let form = {
        let page = state.page.read().await;
        match &page.data {
            Some(data) => data.form.clone(),
            None => {
                return (
                    StatusCode::CONFLICT,
                    "page structure not recognized; submit on the original page",
                )
                    .into_response();
            }
        }
    };

    info!(assignment = %request.assignment, "Relaying submission");

    match state.upstream.submit(&form, &request.assignment).await {
        SubmitOutcome::Replaced(body) => {
            // The merged view is stale now; refresh it behind the response
            let state = state.clone();
            tokio::spawn(async move {
                if let Err(e) = refresh(&state).await {
                    warn!(error = %e, "refresh after submission failed");
                }
            });
            Html(body).into_response()
        }
        SubmitOutcome::FellBackToFormPost => match state.upstream.resolve_action(&form) {
            Ok(action) => Html(
                html::render_fallback(action.as_str(), &form, &request.assignment).into_string(),
            )
            .into_response(),
            Err(e) => (
                StatusCode::BAD_GATEWAY,
                format!("submission could not be delivered: {}", e),
            )
                .into_response(),
        },
    }
}

/// Return the merged rows as JSON
async fn rows_handler(State(state): State<Arc<AppState>>) -> axum::Json<Vec<ViewRow>> {
    let page = state.page.read().await;
    let rows = match &page.data {
        Some(data) => plan::build_plan(data, Local::now().naive_local()).rows,
        None => Vec::new(),
    };
    axum::Json(rows)
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Whether the fetched page matched the expected structure
    pub recognized: bool,
    pub assignments: usize,
    pub submitted: usize,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> axum::Json<StatusReport> {
    let page = state.page.read().await;
    let report = match &page.data {
        Some(data) => StatusReport {
            recognized: true,
            assignments: data.assignments.len(),
            submitted: data
                .assignments
                .iter()
                .filter(|a| data.submissions.contains_key(&a.id))
                .count(),
        },
        None => StatusReport {
            recognized: false,
            assignments: 0,
            submitted: 0,
        },
    };
    axum::Json(report)
}

/// Refresh from the institution server (manual trigger)
async fn refresh_handler(State(state): State<Arc<AppState>>) -> &'static str {
    println!("\nManual refresh triggered...");
    match refresh(&state).await {
        Ok(()) => "OK",
        Err(e) => {
            eprintln!("Refresh failed: {}", e);
            "ERROR"
        }
    }
}
