use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::error::{AppError, AppResult};
use crate::models::{Page, UserView};
use crate::services::user::{UserFilter, UserUpdate};

use super::{PathId, Session, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_users_handler))
        .route(
            "/:id",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
}

async fn list_users_handler(
    State(state): State<SharedState>,
    query: Result<Query<UserFilter>, QueryRejection>,
) -> AppResult<Json<Page<UserView>>> {
    let Query(filter) = query?;
    Ok(Json(state.services.users.query(&filter).await?))
}

async fn get_user_handler(
    State(state): State<SharedState>,
    PathId(id): PathId,
) -> AppResult<Json<UserView>> {
    let user = state.services.users.get_by_id(id).await?;
    user.map(Json).ok_or_else(|| AppError::not_found("user"))
}

async fn update_user_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> AppResult<Json<UserView>> {
    let Json(patch) = payload?;
    let user = state.services.users.update(&principal, id, patch).await?;
    user.map(Json).ok_or_else(|| AppError::not_found("user"))
}

async fn delete_user_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
) -> AppResult<StatusCode> {
    state.services.users.remove(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
