use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

pub mod api;
pub mod routes;

pub use api::AppState;

use routes::HttpResponse;

/// Serve the API on `bind_addr` until the process is stopped.
pub fn run_server(bind_addr: &str, state: Arc<AppState>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(bind_addr, state))
}

pub async fn serve(bind_addr: &str, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("sgz-team-builder listening on http://{bind_addr}");
    axum::serve(listener, router(state)).await
}

/// Every request goes through [`routes::route_request`].
pub fn router(state: Arc<AppState>) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let body = String::from_utf8_lossy(&body).into_owned();
    tracing::debug!(%method, %path, "request");

    // Exhaustive searches can be long; keep them off the async workers.
    let handled = tokio::task::spawn_blocking(move || {
        routes::route_request(&state, method.as_str(), &path, &body)
    })
    .await;
    match handled {
        Ok(response) => response.into_response(),
        Err(err) => {
            tracing::error!(%err, "request handler panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}
