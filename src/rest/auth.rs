use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppResult;
use crate::models::UserView;
use crate::services::user::NewUser;

use super::{SharedState, TOKEN_COOKIE};

#[derive(Deserialize)]
pub struct UserLogin {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PhoneLogin {
    pub phone: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route("/login-phone", post(login_phone_handler))
        .route("/logout", post(logout_handler))
}

fn session_cookie(token: &str, max_age: u64) -> String {
    format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}")
}

fn logged_in(state: &SharedState, status: StatusCode, user: UserView) -> AppResult<Response> {
    let token = state.tokens.create_jwt(&user)?;
    let cookie = session_cookie(&token, state.tokens.ttl_secs());
    Ok((status, [(header::SET_COOKIE, cookie)], Json(LoginResponse { token, user })).into_response())
}

async fn signup_handler(
    State(state): State<SharedState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AppResult<Response> {
    let Json(new) = payload?;
    let user = state.services.users.add(new).await?;
    logged_in(&state, StatusCode::CREATED, user)
}

async fn login_handler(
    State(state): State<SharedState>,
    payload: Result<Json<UserLogin>, JsonRejection>,
) -> AppResult<Response> {
    let Json(creds) = payload?;
    let user = state.services.users.authenticate(&creds.username, &creds.password).await?;
    tracing::info!(user_id = %user.id, "login");
    logged_in(&state, StatusCode::OK, UserView::from(user))
}

async fn login_phone_handler(
    State(state): State<SharedState>,
    payload: Result<Json<PhoneLogin>, JsonRejection>,
) -> AppResult<Response> {
    let Json(creds) = payload?;
    let user = state.services.users.authenticate_phone(&creds.phone, &creds.password).await?;
    tracing::info!(user_id = %user.id, "login by phone");
    logged_in(&state, StatusCode::OK, UserView::from(user))
}

async fn logout_handler() -> Response {
    (
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(json!({ "msg": "Logged out successfully" })),
    )
        .into_response()
}
