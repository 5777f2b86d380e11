use anyhow::Result;
use cspstrategy::{
    config::EngineConfig, init_logging, process::RawRow, EngineError, EventDocuments,
    NarrativeOptions, StrategyEngine,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use tracing::{info, warn};
use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

/// Body of `POST /events/{id}/strategy`.
#[derive(Debug, Deserialize)]
struct ProvidedRowsRequest {
    #[serde(default)]
    transactions: Vec<RawRow>,
    #[serde(default)]
    opportunities: Vec<RawRow>,
    #[serde(default)]
    narrative: NarrativeOptions,
}

/// Body of `POST /events/{id}/strategy/refresh`.
#[derive(Debug, Deserialize)]
struct RefreshRequest {
    #[serde(flatten)]
    documents: EventDocuments,
    #[serde(default)]
    narrative: NarrativeOptions,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

fn error_reply(status: StatusCode, error: &str, details: Option<String>) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: error.to_string(),
            details,
        }),
        status,
    )
    .into_response()
}

fn engine_error_reply(event_id: &str, e: EngineError) -> warp::reply::Response {
    warn!(event_id, status = e.status_code(), error = %e, "strategy request failed");
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let label = match &e {
        EngineError::NoInput { .. } => "No usable input rows",
        EngineError::Document { .. } => "Document retrieval failed",
        EngineError::Persistence { .. } => "Persisting summary failed",
    };
    error_reply(status, label, Some(e.to_string()))
}

fn with_engine(
    engine: Arc<StrategyEngine>,
) -> impl Filter<Extract = (Arc<StrategyEngine>,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "csp-strategy-engine"
    })))
}

async fn run_provided(
    event_id: String,
    req: ProvidedRowsRequest,
    engine: Arc<StrategyEngine>,
) -> Result<warp::reply::Response, Rejection> {
    info!(
        event_id = %event_id,
        transactions = req.transactions.len(),
        opportunities = req.opportunities.len(),
        "provided-data strategy request"
    );
    Ok(
        match engine
            .run_with_rows(&event_id, &req.transactions, &req.opportunities, &req.narrative)
            .await
        {
            Ok(summary) => warp::reply::json(&summary).into_response(),
            Err(e) => engine_error_reply(&event_id, e),
        },
    )
}

async fn run_refresh(
    event_id: String,
    req: RefreshRequest,
    engine: Arc<StrategyEngine>,
) -> Result<warp::reply::Response, Rejection> {
    info!(event_id = %event_id, documents = req.documents.documents.len(), "refresh strategy request");
    Ok(
        match engine.refresh(&event_id, &req.documents, &req.narrative).await {
            Ok(summary) => warp::reply::json(&summary).into_response(),
            Err(e) => engine_error_reply(&event_id, e),
        },
    )
}

async fn get_summary(
    event_id: String,
    engine: Arc<StrategyEngine>,
) -> Result<warp::reply::Response, Rejection> {
    Ok(match engine.load(&event_id).await {
        Ok(Some(summary)) => warp::reply::json(&summary).into_response(),
        Ok(None) => error_reply(
            StatusCode::NOT_FOUND,
            "No strategy summary",
            Some(format!("event `{}` has no summary yet", event_id)),
        ),
        Err(e) => engine_error_reply(&event_id, e),
    })
}

/// Upper bound on POST bodies; provided-data requests carry every row inline.
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

fn provided_route(
    engine: Arc<StrategyEngine>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("events" / String / "strategy")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_engine(engine))
        .and_then(run_provided)
}

fn refresh_route(
    engine: Arc<StrategyEngine>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("events" / String / "strategy" / "refresh")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_engine(engine))
        .and_then(run_refresh)
}

fn load_route(
    engine: Arc<StrategyEngine>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("events" / String / "strategy")
        .and(warp::get())
        .and(with_engine(engine))
        .and_then(get_summary)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cfg = EngineConfig::load()?;
    let port = cfg.port;
    let engine = Arc::new(StrategyEngine::from_config(&cfg)?);

    info!("Starting CSP strategy service");

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let routes = health
        .or(provided_route(engine.clone()))
        .or(refresh_route(engine.clone()))
        .or(load_route(engine));

    info!("Server starting on port {}", port);
    info!("Health check: http://localhost:{}/health", port);

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
