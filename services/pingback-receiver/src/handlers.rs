// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the pingback receiver service.
//!
//! `/pingback` speaks XML-RPC to pingback clients; `/admin/pingbacks`
//! exposes the stored history as JSON.

use crate::config::Config;
use crate::models::PingbackHistory;
use crate::notifier::WebhookNotifier;
use crate::pipeline::{PingbackResponse, PingbackService};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

const SUCCESS_MESSAGE: &str = "Thanks! Pingback received.";
const FAULT_17: &str =
    "The source URI does not contain a link to the target URI, and so cannot be used as a source.";
const FAULT_32: &str = "The specified target URI does not exist.";
const FAULT_48: &str = "The pingback has already been registered.";
const FAULT_GENERIC: &str = "An unexpected error occurred while processing the pingback.";

/// Shared application state.
pub struct AppState {
    pub service: PingbackService,
    pub notifier: Option<WebhookNotifier>,
    pub config: Config,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/pingback", post(receive_pingback))
        .route(
            "/admin/pingbacks",
            get(list_pingbacks).delete(clear_pingbacks),
        )
        .route("/admin/pingbacks/{id}", delete(delete_pingback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pingback-receiver",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Receive an XML-RPC `pingback.ping` call.
pub async fn receive_pingback(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: String,
) -> Response {
    if !state.config.pingback.enabled {
        debug!(ip = %addr.ip(), "Pingback received while disabled");
        return StatusCode::FORBIDDEN.into_response();
    }

    let requester = addr.ip().to_string();
    let notifier = state.notifier.as_ref();
    let response = state
        .service
        .process_received_payload(&body, &requester, |record| {
            if let Some(notifier) = notifier {
                notifier.spawn_notify(record.clone());
            }
        })
        .await;

    info!(ip = %requester, outcome = %response, "Pingback processed");
    xmlrpc_response(response)
}

/// Map a pipeline outcome onto the wire.
pub fn xmlrpc_response(response: PingbackResponse) -> Response {
    match response {
        PingbackResponse::Success => xml(StatusCode::OK, method_success(SUCCESS_MESSAGE)),
        PingbackResponse::Error17SourceNotContainTargetUri => {
            xml(StatusCode::OK, method_fault(17, FAULT_17))
        }
        PingbackResponse::Error32TargetUriNotExist => {
            xml(StatusCode::OK, method_fault(32, FAULT_32))
        }
        PingbackResponse::Error48PingbackAlreadyRegistered => {
            xml(StatusCode::OK, method_fault(48, FAULT_48))
        }
        PingbackResponse::SpamDetectedFakeNotFound => StatusCode::NOT_FOUND.into_response(),
        PingbackResponse::InvalidPingRequest => StatusCode::BAD_REQUEST.into_response(),
        PingbackResponse::GenericError => {
            xml(StatusCode::INTERNAL_SERVER_ERROR, method_fault(0, FAULT_GENERIC))
        }
    }
}

fn xml(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}

fn method_success(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><params><param><value><string>{message}</string></value></param></params></methodResponse>"
    )
}

fn method_fault(code: i32, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><int>{code}</int></value></member>\
         <member><name>faultString</name><value><string>{message}</string></value></member>\
         </struct></value></fault></methodResponse>"
    )
}

/// List stored pingbacks, newest first.
pub async fn list_pingbacks(State(state): State<Arc<AppState>>) -> Response {
    match state.service.history().list().await {
        Ok(records) => Json::<Vec<PingbackHistory>>(records).into_response(),
        Err(e) => storage_error(e),
    }
}

/// Remove one stored pingback.
pub async fn delete_pingback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.service.history().delete(id).await {
        Ok(()) => {
            info!(id = %id, "Pingback history record removed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => storage_error(e),
    }
}

/// Remove all stored pingbacks.
pub async fn clear_pingbacks(State(state): State<Arc<AppState>>) -> Response {
    match state.service.history().clear().await {
        Ok(()) => {
            info!("Pingback history cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => storage_error(e),
    }
}

fn storage_error(e: crate::error::AppError) -> Response {
    error!(error = %e, "Pingback history unavailable");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
            code: "STORAGE_ERROR",
        }),
    )
        .into_response()
}
