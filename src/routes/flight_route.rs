use crate::domain::flight::{CreateFlightInput, Flight};
use crate::error::AppError;
use crate::routes::AppState;
use rocket::post;
use rocket::serde::json::Json;
use rocket::State;

/// POST /api/flights — `CreateFlight` (spec.md §6). Publishes the
/// `flight-created` event after the store commit (outbox-then-publish,
/// DESIGN.md); a publish failure is logged rather than rolled back, since
/// the flight row is already durable and C3's redelivery is idempotent.
#[post("/flights", data = "<input>")]
pub async fn create_flight(
    state: &State<AppState>,
    input: Json<CreateFlightInput>,
) -> Result<Json<Flight>, AppError> {
    let flight = state.flights.create_flight(input.into_inner()).await?;

    let event = crate::domain::event::FlightCreatedEvent {
        flight_id: flight.id,
        src: flight.src.clone(),
        dst: flight.dst.clone(),
        departure: flight.departure,
        emitted_at: chrono::Utc::now(),
    };
    if let Err(err) = state.bus.publish(&event).await {
        tracing::error!(flight_id = %flight.id, error = %err, "failed to publish flight-created; will need a retry sweep");
    }

    Ok(Json(flight))
}
