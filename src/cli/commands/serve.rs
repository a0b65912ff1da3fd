//! HTTP API server for browser front-ends.
//!
//! Exposes submission, snippet listing and archive download keyed by the
//! video URL, and serves the clip files themselves under `/media`.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::ChapsplitError;
use crate::jobs::JobStatus;
use crate::orchestrator::Orchestrator;
use crate::source::SourceIdentity;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'chapsplit doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let job_root = settings.job_root();

    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(settings)?,
    });
    let app = router(state, ServeDir::new(&job_root));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Serving {:?} on {}", job_root, addr);

    Output::header("chapsplit API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET      /health");
    Output::kv("Process", "GET|POST /process-video?url=");
    Output::kv("Status", "GET      /status?url=");
    Output::kv("Snippets", "GET      /get-snippets?url=");
    Output::kv("Archive", "GET      /download-archive?url=");
    Output::kv("Clips", "GET      /media/<identity>/snippets/<file>");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>, media: ServeDir) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/process-video", get(process_video).post(process_video))
        .route("/status", get(status))
        .route("/get-snippets", get(get_snippets))
        .route("/download-archive", get(download_archive))
        .nest_service("/media", media)
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct UrlQuery {
    url: String,
}

#[derive(Serialize)]
struct ProcessResponse {
    identity: SourceIdentity,
    status: JobStatus,
}

#[derive(Serialize)]
struct SnippetsResponse {
    snippets: Vec<SnippetInfo>,
}

#[derive(Serialize)]
struct SnippetInfo {
    title: String,
    url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(err: ChapsplitError) -> Response {
    let status = match &err {
        ChapsplitError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ChapsplitError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => {
            error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match state.orchestrator.submit(&query.url).await {
        Ok(handle) => (
            StatusCode::ACCEPTED,
            Json(ProcessResponse {
                identity: handle.identity().clone(),
                status: handle.status(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn status(State(state): State<Arc<AppState>>, Query(query): Query<UrlQuery>) -> Response {
    match state.orchestrator.job(&query.url).await {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => error_response(ChapsplitError::NotFound(format!(
            "No job for {}",
            query.url
        ))),
        Err(e) => error_response(e),
    }
}

async fn get_snippets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match state.orchestrator.snippets(&query.url).await {
        Ok(entries) => Json(SnippetsResponse {
            snippets: entries
                .into_iter()
                .map(|e| SnippetInfo {
                    title: e.title,
                    url: e.locator,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn download_archive(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Response {
    let identity = match crate::source::resolve(&query.url) {
        Ok(source) => source.identity,
        Err(e) => return error_response(e),
    };

    match state.orchestrator.archive(&query.url).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.zip\"", identity),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
