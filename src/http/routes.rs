//! Router, auth middleware and handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, instrument, warn, Span};

use super::API_BASE_PATH;
use crate::auth::Authenticator;
use crate::limiter::IntervalLimiter;
use crate::store::{AccessToken, StoreError, TokenStore};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Authenticator,
    pub store: Arc<dyn TokenStore>,
    pub creation_limiter: Arc<IntervalLimiter>,
}

/// Token that passed authentication, attached to the request by
/// [`require_token`].
#[derive(Debug, Clone)]
struct AuthenticatedToken(String);

/// Build the application router.
///
/// Everything except `/health` sits behind bearer-token authentication.
/// Authenticated requests are logged on the way in and out.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(&format!("{}auth/check", API_BASE_PATH), get(auth_check))
        .route(
            &format!("{}create-access-token", API_BASE_PATH),
            post(create_access_token).fallback(method_not_allowed),
        )
        .route_layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    info_span!(
                        "http.request",
                        http.method = %request.method(),
                        http.path = %request.uri().path()
                    )
                })
                .on_request(|request: &Request, _span: &Span| {
                    info!(
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = request.uri().query().unwrap_or(""),
                        "request_started"
                    );
                })
                .on_response(|response: &Response, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        duration_ms = latency.as_millis() as u64,
                        "request_completed"
                    );
                }),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

/// Reject the request unless it carries a valid, non-rate-limited token.
async fn require_token(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match state.authenticator.authenticate(authorization.as_deref()).await {
        Ok(token) => {
            request.extensions_mut().insert(AuthenticatedToken(token));
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn auth_check() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed(request: Request) -> (StatusCode, &'static str) {
    warn!(method = %request.method(), "invalid_method");
    (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed")
}

#[derive(Debug, Deserialize)]
struct CreateTokenParams {
    email: Option<String>,
}

/// Failures of the token creation endpoint.
#[derive(Debug)]
enum CreateTokenError {
    InvalidToken,
    InsufficientPermissions,
    RateLimitExceeded,
    EmailNotProvided,
    Internal,
}

impl IntoResponse for CreateTokenError {
    fn into_response(self) -> Response {
        match self {
            CreateTokenError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "invalid_access_token").into_response()
            }
            CreateTokenError::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, "insufficient_permissions").into_response()
            }
            CreateTokenError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response()
            }
            CreateTokenError::EmailNotProvided => {
                (StatusCode::BAD_REQUEST, "email_not_provided").into_response()
            }
            CreateTokenError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error").into_response()
            }
        }
    }
}

#[instrument(skip_all)]
async fn create_access_token(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(caller)): Extension<AuthenticatedToken>,
    Query(params): Query<CreateTokenParams>,
) -> Result<(StatusCode, Json<AccessToken>), CreateTokenError> {
    // Unprivileged callers must not use up the global creation slot.
    let caller = state.store.find(&caller).await.map_err(|err| match err {
        StoreError::NotFound => CreateTokenError::InvalidToken,
        StoreError::Unavailable(msg) => {
            warn!(error = %msg, "failed_to_query_access_token");
            CreateTokenError::Internal
        }
    })?;
    if !caller.can_generate_access_tokens {
        warn!(email = %caller.email, "insufficient_permissions");
        return Err(CreateTokenError::InsufficientPermissions);
    }

    if !state.creation_limiter.is_allowed() {
        warn!(
            interval_ms = state.creation_limiter.interval().as_millis() as u64,
            "global_rate_limit_exceeded"
        );
        return Err(CreateTokenError::RateLimitExceeded);
    }

    let email = match params.email {
        Some(email) if !email.is_empty() => email,
        _ => {
            warn!("missing_email_parameter");
            return Err(CreateTokenError::EmailNotProvided);
        }
    };

    let token = state.store.issue(&email).await.map_err(|err| {
        warn!(error = %err, "failed_to_insert_access_token");
        CreateTokenError::Internal
    })?;

    info!(email = %token.email, "access_token_created");
    Ok((StatusCode::CREATED, Json(token)))
}
