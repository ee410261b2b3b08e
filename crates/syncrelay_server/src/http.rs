//! HTTP binding for the relay endpoints.
//!
//! | Route | Handler |
//! |---|---|
//! | `POST /auth/credentials` | [`RequestHandler::disclose_credentials`] |
//! | `POST /sync/data` | [`RequestHandler::replace_sync`] |
//! | `POST /sync/log` | [`RequestHandler::record_log`] |
//!
//! Every failure body is `{"error": "..."}`.

use crate::error::ServerError;
use crate::handler::RequestHandler;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use syncrelay_protocol::{
    CredentialsRequest, CredentialsResponse, ErrorResponse, SyncDataRequest, SyncDataResponse,
    SyncLogRequest, SyncLogResponse,
};
use tower_http::trace::TraceLayer;

type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Builds the relay router.
pub fn router(handler: RequestHandler) -> Router {
    Router::new()
        .route("/auth/credentials", post(credentials))
        .route("/sync/data", post(sync_data))
        .route("/sync/log", post(sync_log))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %uuid::Uuid::new_v4(),
                )
            }),
        )
        .with_state(handler)
}

async fn credentials(
    State(handler): State<RequestHandler>,
    body: JsonBody<CredentialsRequest>,
) -> Result<Json<CredentialsResponse>, ServerError> {
    let Json(request) = body.map_err(reject)?;
    handler.disclose_credentials(request).await.map(Json)
}

async fn sync_data(
    State(handler): State<RequestHandler>,
    body: JsonBody<SyncDataRequest>,
) -> Result<Json<SyncDataResponse>, ServerError> {
    let Json(request) = body.map_err(reject)?;
    handler.replace_sync(request).await.map(Json)
}

async fn sync_log(
    State(handler): State<RequestHandler>,
    body: JsonBody<SyncLogRequest>,
) -> Result<Json<SyncLogResponse>, ServerError> {
    let Json(request) = body.map_err(reject)?;
    handler.record_log(request).await.map(Json)
}

fn reject(rejection: JsonRejection) -> ServerError {
    ServerError::invalid(rejection.body_text())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse::new(self.public_message()))).into_response()
    }
}
