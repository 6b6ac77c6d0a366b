use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::id::ObjectId;
use crate::models::{Home, HomeMsg};
use crate::services::home::{HomeFilter, HomeUpdate, NewHome};

use super::{PathId, Session, SharedState};

#[derive(Deserialize)]
pub struct NewMsg {
    pub txt: String,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_homes_handler).post(add_home_handler))
        .route(
            "/:id",
            get(get_home_handler)
                .put(update_home_handler)
                .delete(delete_home_handler),
        )
        .route("/:id/msg", post(add_msg_handler))
        .route("/:id/msg/:msg_id", delete(delete_msg_handler))
}

/// Raw pairs so repeated `amenities[]` keys survive.
async fn list_homes_handler(
    State(state): State<SharedState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Json<Vec<Home>>> {
    let Query(pairs) = query?;
    let filter = HomeFilter::from_pairs(&pairs)?;
    Ok(Json(state.services.homes.query(&filter).await?))
}

async fn get_home_handler(
    State(state): State<SharedState>,
    PathId(id): PathId,
) -> AppResult<Json<Home>> {
    let home = state.services.homes.get_by_id(id).await?;
    home.map(Json).ok_or_else(|| AppError::not_found("home"))
}

async fn add_home_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    payload: Result<Json<NewHome>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Home>)> {
    let Json(new) = payload?;
    let home = state.services.homes.add(&principal, new).await?;
    Ok((StatusCode::CREATED, Json(home)))
}

async fn update_home_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
    payload: Result<Json<HomeUpdate>, JsonRejection>,
) -> AppResult<Json<Home>> {
    let Json(patch) = payload?;
    let home = state.services.homes.update(&principal, id, patch).await?;
    home.map(Json).ok_or_else(|| AppError::not_found("home"))
}

async fn delete_home_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
) -> AppResult<Json<Value>> {
    let removed = state.services.homes.remove(&principal, id).await?;
    Ok(Json(json!({ "removedId": removed })))
}

async fn add_msg_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
    payload: Result<Json<NewMsg>, JsonRejection>,
) -> AppResult<(StatusCode, Json<HomeMsg>)> {
    let Json(msg) = payload?;
    let msg = state.services.homes.add_msg(&principal, id, &msg.txt).await?;
    Ok((StatusCode::CREATED, Json(msg)))
}

async fn delete_msg_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    path: Result<Path<(String, String)>, PathRejection>,
) -> AppResult<Json<Value>> {
    let Path((home_id, msg_id)) = path?;
    let home_id: ObjectId = home_id.parse()?;
    let msg_id: ObjectId = msg_id.parse()?;
    let removed = state.services.homes.remove_msg(&principal, home_id, msg_id).await?;
    Ok(Json(json!({ "removedId": removed })))
}
