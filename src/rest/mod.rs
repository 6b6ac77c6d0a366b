//! REST API layer (Axum), mounted under `/api`.
//!
//! Every request passes through the session middleware, which attaches a
//! [`Principal`] when a valid token arrives in the `Authorization` header or
//! the `loginToken` cookie. Handlers that need a logged-in user take the
//! [`Session`] extractor, which answers 401 otherwise.

mod auth;
mod booking;
mod home;
mod review;
mod user;

use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenKeys;
use crate::context::Principal;
use crate::error::AppError;
use crate::id::ObjectId;
use crate::services::Services;

pub const TOKEN_COOKIE: &str = "loginToken";

/// Shared app state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(services: Services, tokens: TokenKeys) -> Self {
        Self { services, tokens }
    }
}

pub type SharedState = Arc<AppState>;

/// Logged-in caller. Rejects with 401 when the request carried no valid token.
pub struct Session(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Session)
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))
    }
}

/// `:id` path segment parsed as an [`ObjectId`].
pub struct PathId(pub ObjectId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PathId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;
        Ok(PathId(raw.parse()?))
    }
}

async fn session_middleware(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let principal = session_token(req.headers()).and_then(|token| state.tokens.principal(token));
    if let Some(principal) = principal {
        req.extensions_mut().insert(principal);
    }
    next.run(req).await
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| cookie_value(headers, TOKEN_COOKIE))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: no origins configured, allowing any");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create the Axum router with every `/api` endpoint.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let state = Arc::new(state);

    let api = Router::new()
        .route("/health", get(health_handler))
        .nest("/auth", auth::router())
        .nest("/user", user::router())
        .nest("/home", home::router())
        .nest("/booking", booking::router())
        .nest("/review", review::router());

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
