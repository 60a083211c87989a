use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Lifecycle status of a `Flight`. Mirrors the teacher's `SeatStatus`
/// pattern of deriving `Display` via `strum` and mapping to/from the
/// relational store's varchar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum FlightStatus {
    #[sqlx(rename = "ACTIVE")]
    Active,
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum SeatStatus {
    #[sqlx(rename = "AVAILABLE")]
    Available,
    #[sqlx(rename = "BOOKED")]
    Booked,
    #[sqlx(rename = "BLOCKED")]
    Blocked,
}

/// C1's authoritative flight record (spec.md §3 "Flight").
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Flight {
    pub id: Uuid,
    pub src: String,
    pub dst: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub aircraft_ref: String,
    pub price: Decimal,
    pub status: FlightStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single seat belonging exclusively to one flight (spec.md §3 "Seat").
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Seat {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub label: String,
    pub status: SeatStatus,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input accepted by `FlightRegistry::create_flight`. Per-field rules are
/// enforced by `validator`; the cross-field business rules (arrival >
/// departure, source ≠ destination, future departure) are checked by
/// `validate_flight_input` below, called explicitly alongside `.validate()`
/// rather than relying on a database check constraint, per the design notes
/// in spec.md §9: the source's reliance on a DB check constraint masked a
/// bug, so validation here lives in application code that is independently
/// testable.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFlightInput {
    #[validate(length(equal = 3))]
    pub src: String,
    #[validate(length(equal = 3))]
    pub dst: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub aircraft_ref: String,
    #[validate(custom(function = "validate_non_negative_price"))]
    pub price: Decimal,
    #[validate(range(min = 1, max = 500))]
    pub total_seats: u32,
}

fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price must be non-negative"));
    }
    Ok(())
}

/// Cross-field rules `validator`'s per-field attributes can't express.
/// Called explicitly by `FlightRegistry::create_flight` after
/// `input.validate()`.
pub fn validate_flight_input(input: &CreateFlightInput) -> Result<(), ValidationError> {
    if input.src.eq_ignore_ascii_case(&input.dst) {
        return Err(ValidationError::new("source and destination must differ"));
    }
    if input.arrival <= input.departure {
        return Err(ValidationError::new("arrival must be strictly after departure"));
    }
    if input.departure <= Utc::now() {
        return Err(ValidationError::new("departure must be in the future"));
    }
    Ok(())
}

/// Deterministic seat label generator: rows of six, labels A..F, matching
/// spec.md §4.1 and scenario S5's literal label `"1A"`.
pub fn generate_seat_labels(total_seats: u32) -> Vec<String> {
    const ROW_LETTERS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];
    (0..total_seats)
        .map(|i| {
            let row = i / ROW_LETTERS.len() as u32 + 1;
            let letter = ROW_LETTERS[(i % ROW_LETTERS.len() as u32) as usize];
            format!("{row}{letter}")
        })
        .collect()
}
