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
use crate::models::{Booking, Page};
use crate::services::booking::{BookingFilter, BookingUpdate, NewBooking};

use super::{PathId, Session, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_bookings_handler).post(add_booking_handler))
        .route(
            "/:id",
            get(get_booking_handler)
                .put(update_booking_handler)
                .delete(delete_booking_handler),
        )
}

async fn list_bookings_handler(
    State(state): State<SharedState>,
    query: Result<Query<BookingFilter>, QueryRejection>,
) -> AppResult<Json<Page<Booking>>> {
    let Query(filter) = query?;
    Ok(Json(state.services.bookings.query(&filter).await?))
}

async fn get_booking_handler(
    State(state): State<SharedState>,
    PathId(id): PathId,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.get_by_id(id).await?;
    booking.map(Json).ok_or_else(|| AppError::not_found("booking"))
}

async fn add_booking_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let Json(new) = payload?;
    let booking = state.services.bookings.add(&principal, new).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn update_booking_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
    payload: Result<Json<BookingUpdate>, JsonRejection>,
) -> AppResult<Json<Booking>> {
    let Json(patch) = payload?;
    let booking = state.services.bookings.update(&principal, id, patch).await?;
    booking.map(Json).ok_or_else(|| AppError::not_found("booking"))
}

async fn delete_booking_handler(
    State(state): State<SharedState>,
    Session(principal): Session,
    PathId(id): PathId,
) -> AppResult<StatusCode> {
    state.services.bookings.remove(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
