use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::UserId,
    error::{ApiError, ErrorCode},
    protocol::{LoginRequest, SessionResponse, StatusResponse, SubmissionReceipt},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod store;

use api::{accept_document, ApiContext, ParsedSubmission};
use auth::{verify_refreshable_token, verify_session_token, SessionConfig};
use config::load_settings;
use store::KycStore;

type HttpError = (StatusCode, Json<ApiError>);

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let api = ApiContext {
        store: KycStore::default(),
        sessions: SessionConfig {
            secret: settings.token_secret,
            ttl_seconds: settings.token_ttl_seconds,
        },
    };
    let app = build_router(Arc::new(AppState { api }), settings.max_upload_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, max_upload_bytes = settings.max_upload_bytes, "verification stub listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/kyc/status", get(status))
        .route("/kyc/submit", post(submit))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

fn http_error(error: ApiError) -> HttpError {
    let status = match error.code {
        Some(ErrorCode::Validation) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::Unauthorized) => StatusCode::UNAUTHORIZED,
        Some(ErrorCode::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorCode::Conflict) => StatusCode::CONFLICT,
        Some(ErrorCode::PayloadTooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
        Some(ErrorCode::Internal) | None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn authenticate(
    headers: &HeaderMap,
    verify: impl FnOnce(&str) -> Option<UserId>,
) -> Result<UserId, HttpError> {
    bearer_token(headers).and_then(verify).ok_or_else(|| {
        http_error(ApiError::new(
            ErrorCode::Unauthorized,
            "missing or invalid session token",
        ))
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, HttpError> {
    api::login(&state.api, req)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, HttpError> {
    let user_id = authenticate(&headers, |token| {
        verify_refreshable_token(&state.api.sessions, token)
    })?;
    api::refresh(&state.api, user_id)
        .map(Json)
        .map_err(http_error)
}

async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, HttpError> {
    let user_id = authenticate(&headers, |token| {
        verify_session_token(&state.api.sessions, token)
    })?;
    Ok(Json(api::status(&state.api, user_id).await))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<SubmissionReceipt>, HttpError> {
    let user_id = authenticate(&headers, |token| {
        verify_session_token(&state.api.sessions, token)
    })?;

    let mut submission = ParsedSubmission::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                let accepted =
                    accept_document(&name, Some(&filename), mime_type.as_deref(), bytes.len());
                match accepted {
                    Ok(document) => submission.documents.push(document),
                    Err(error) => {
                        warn!(
                            user_id = user_id.0,
                            field = %name,
                            message = %error.message,
                            "document refused"
                        );
                        return Err(http_error(error));
                    }
                }
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                submission.fields.insert(name, value);
            }
        }
    }

    api::submit_kyc(&state.api, user_id, submission)
        .await
        .map(Json)
        .map_err(|error| {
            warn!(user_id = user_id.0, message = %error.message, "submission refused");
            http_error(error)
        })
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> HttpError {
    let code = if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::PayloadTooLarge
    } else {
        ErrorCode::Validation
    };
    http_error(ApiError::new(code, error.body_text()))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
