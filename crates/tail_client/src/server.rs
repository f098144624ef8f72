//! HTTP surface for the decision service's suspect queries.
//!
//! - `POST /getWrongTrace` form `{traceIdListJson, batchPos}` returns a JSON
//!   object mapping each matched trace id to its merged span lines.
//! - `GET /ready` answers `suc` once the router is serving.

use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tailring::{QueryEngine, QueryError};
use tokio::net::TcpListener;

/// Form body of a suspect query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongTraceForm {
    pub trace_id_list_json: String,
    pub batch_pos: i64,
}

/// Builds the router over a shared query engine.
pub fn router(engine: Arc<QueryEngine>) -> Router {
    Router::new()
        .route("/getWrongTrace", post(wrong_trace_handler))
        .route("/ready", get(ready_handler))
        .with_state(engine)
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn serve<F>(
    engine: Arc<QueryEngine>,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "suspect query service started");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}

/// POST /getWrongTrace
async fn wrong_trace_handler(
    State(engine): State<Arc<QueryEngine>>,
    Form(form): Form<WrongTraceForm>,
) -> Response {
    // The scan takes the engine's lock and walks three slots; keep it off the reactor.
    let result = tokio::task::spawn_blocking(move || {
        engine.query_json(&form.trace_id_list_json, form.batch_pos)
    })
    .await;

    match result {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Ok(Err(err)) => query_error_response(&err),
        Err(e) => {
            tracing::error!(error = %e, "suspect query task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn query_error_response(err: &QueryError) -> Response {
    let status = match err {
        QueryError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    tracing::warn!(error = %err, status = status.as_u16(), "suspect query rejected");
    (status, err.to_string()).into_response()
}

/// GET /ready
async fn ready_handler() -> &'static str {
    "suc"
}
