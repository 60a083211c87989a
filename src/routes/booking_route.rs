use crate::domain::booking::{BookingResponse, CreateBookingRequest};
use crate::error::AppError;
use crate::routes::AppState;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use uuid::Uuid;

/// POST /api/bookings — `CreateBooking` (spec.md §6).
#[post("/bookings", data = "<request>")]
pub async fn create_booking(
    state: &State<AppState>,
    request: Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let response = state.booking.create_booking(request.into_inner()).await?;
    Ok(Json(response))
}

/// GET /api/bookings/<id> — `GetBooking` (spec.md §6).
#[get("/bookings/<id>")]
pub async fn get_booking(
    state: &State<AppState>,
    id: String,
) -> Result<Json<BookingResponse>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::InvalidInput(format!("invalid booking id: {id}")))?;
    state
        .booking
        .get_booking(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))
}
