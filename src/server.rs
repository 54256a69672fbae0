use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::construct::Term;
use crate::error::{NetcladError, Result};
use crate::finding::{Finding, ValidationReport};
use crate::interface::{KnowledgeBase, Record};
use crate::persist::SnapshotInfo;
use crate::topology::Report;

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub status: String,
    pub elapsed_ms: f64,
    pub columns: Vec<String>,
    pub row_types: Vec<Vec<Option<String>>>,
    pub row_count: usize,
    pub limited: bool,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Deserialize)]
pub struct InsertRequest {
    pub triples: Vec<Record>,
}

#[derive(Serialize)]
pub struct InsertResponse {
    pub status: String,
    pub inserted: usize,
    pub triples: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

pub struct ApiError(NetcladError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NetcladError::QuerySyntax { .. }
            | NetcladError::InvalidTerm(_)
            | NetcladError::Transaction(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = self.0.to_string();
        warn!(%error, code = status.as_u16(), "request failed");
        let body = ErrorResponse { status: "error".into(), error };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Runs synchronous knowledge base work off the async executor.
async fn blocking<T, F>(kb: Arc<KnowledgeBase>, work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&KnowledgeBase) -> Result<T> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || work(&kb))
        .await
        .map_err(|e| {
            warn!(error = %e, "join error");
            ApiError(NetcladError::Server(e.to_string()))
        })?;
    outcome.map(Json).map_err(ApiError)
}

pub fn router(kb: Arc<KnowledgeBase>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    Router::new()
        .route("/v1/query", post(query))
        .route("/v1/triples", post(insert_triples))
        .route("/v1/validate", get(validate))
        .route("/v1/topology/:report", get(topology))
        .route("/v1/snapshot", post(snapshot))
        .layer(cors)
        .with_state(kb)
}

async fn query(
    State(kb): State<Arc<KnowledgeBase>>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<QueryResponse> {
    let started = Instant::now();
    let result = blocking(kb, move |kb| kb.execute(&request.query)).await?.0;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(ms = elapsed_ms, rows = result.len(), limited = result.limited, "query complete");
    let render = |f: fn(&Term) -> String| {
        result
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_ref().map(f)).collect())
            .collect::<Vec<_>>()
    };
    let rows = render(|term| term.value().to_string());
    let row_types = render(|term| term.kind());
    Ok(Json(QueryResponse {
        status: "ok".into(),
        elapsed_ms,
        row_count: result.len(),
        limited: result.limited,
        columns: result.columns.clone(),
        row_types,
        rows,
    }))
}

async fn insert_triples(
    State(kb): State<Arc<KnowledgeBase>>,
    Json(request): Json<InsertRequest>,
) -> ApiResult<InsertResponse> {
    blocking(kb, move |kb| {
        let mut tx = kb.begin_write()?;
        let inserted = tx.insert_records(request.triples)?;
        let triples = tx.graph().len();
        tx.commit()?;
        Ok(InsertResponse { status: "ok".into(), inserted, triples })
    })
    .await
}

async fn validate(State(kb): State<Arc<KnowledgeBase>>) -> ApiResult<ValidationReport> {
    blocking(kb, |kb| kb.validate()).await
}

async fn topology(
    State(kb): State<Arc<KnowledgeBase>>,
    Path(report): Path<String>,
) -> ApiResult<Vec<Finding>> {
    let report: Report = report.parse().map_err(ApiError)?;
    blocking(kb, move |kb| kb.analyze(report)).await
}

async fn snapshot(State(kb): State<Arc<KnowledgeBase>>) -> ApiResult<Option<SnapshotInfo>> {
    blocking(kb, |kb| kb.snapshot()).await
}
