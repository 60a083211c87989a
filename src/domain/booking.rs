use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum BookingStatus {
    #[sqlx(rename = "CONFIRMED")]
    Confirmed,
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
}

/// spec.md §3 "Booking". `journey_id` and `user_id` are weak back-references
/// (lookups, not ownership) per the re-architecture note in spec.md §9.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub journey_id: Uuid,
    pub passenger_count: u32,
    pub status: BookingStatus,
    pub payment_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub journey_id: Uuid,
    pub passenger_count: u32,
    pub payment_ref: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatAssignment {
    pub flight_id: Uuid,
    pub seat_labels: Vec<String>,
}

/// The projection returned by `CreateBooking`/`GetBooking` (spec.md §6).
#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub journey_id: Uuid,
    pub status: BookingStatus,
    pub passenger_count: u32,
    pub payment_ref: String,
    pub seat_assignments: Vec<SeatAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
