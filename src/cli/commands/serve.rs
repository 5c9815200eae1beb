//! HTTP API server for chat front-ends.
//!
//! `POST /ask` streams the same newline-delimited JSON events as `transmeet ask`.

use crate::catalog::RepositoryConfig;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::events::{AnswerEvent, ChannelSink, EventEmitter};
use crate::orchestrator::Orchestrator;
use crate::rag::Question;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Events buffered between the pipeline task and the response body.
const EVENT_BUFFER: usize = 64;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    meetings_collection: String,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check_credentials(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'transmeet doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(&settings)?,
        meetings_collection: settings.vector_store.meetings_collection.clone(),
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Transmeet API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Catalog", "GET  /catalog");
    Output::kv("Ask", "POST /ask (application/x-ndjson)");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/catalog", get(catalog))
        .route("/ask", post(ask))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    history: Option<String>,
}

#[derive(Serialize)]
struct CatalogResponse {
    repositories: Vec<RepositoryConfig>,
    meetings_collection: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(CatalogResponse {
        repositories: state.orchestrator.catalog().entries().to_vec(),
        meetings_collection: state.meetings_collection.clone(),
    })
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    let mut question = Question::new(req.question);
    if let Some(history) = req.history {
        question = question.with_history(history);
    }
    if question.text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Question is empty".to_string(),
            }),
        )
            .into_response();
    }

    info!("Answering question over HTTP");
    let (tx, rx) = mpsc::channel::<AnswerEvent>(EVENT_BUFFER);
    tokio::spawn(async move {
        let mut emitter = EventEmitter::new(ChannelSink::new(tx));
        if let Err(e) = state.orchestrator.ask(&question, &mut emitter).await {
            warn!("Ask request ended with error: {}", e);
        }
    });

    let lines = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(format!("{}\n", event.to_json_line())), rx))
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}
