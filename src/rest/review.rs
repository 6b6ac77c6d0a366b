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
use crate::models::{Page, Review};
use crate::services::review::{NewReview, ReviewFilter, ReviewUpdate};

use super::{PathId, Session, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_reviews_handler).post(add_review_handler))
        .route(
            "/:id",
            get(get_review_handler)
                .put(update_review_handler)
                .delete(delete_review_handler),
        )
}

async fn list_reviews_handler(
    State(state): State<SharedState>,
    query: Result<Query<ReviewFilter>, QueryRejection>,
) -> AppResult<Json<Page<Review>>> {
    let Query(filter) = query?;
    Ok(Json(state.services.reviews.query(&filter).await?))
}

async fn get_review_handler(
    State(state): State<SharedState>,
    PathId(id): PathId,
) -> AppResult<Json<Review>> {
    let review = state.services.reviews.get_by_id(id).await?;
    review.map(Json).ok_or_else(|| AppError::not_found("review"))
}

async fn add_review_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    payload: Result<Json<NewReview>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let Json(new) = payload?;
    let review = state.services.reviews.add(&principal, new).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn update_review_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
    payload: Result<Json<ReviewUpdate>, JsonRejection>,
) -> AppResult<Json<Review>> {
    let Json(patch) = payload?;
    let review = state.services.reviews.update(&principal, id, patch).await?;
    review.map(Json).ok_or_else(|| AppError::not_found("review"))
}

async fn delete_review_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
) -> AppResult<StatusCode> {
    state.services.reviews.remove(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
