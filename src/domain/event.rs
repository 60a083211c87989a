use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The *flight-created* event record published by C7 after the admin path
/// commits a flight (spec.md §6 "Event record").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightCreatedEvent {
    pub flight_id: Uuid,
    pub src: String,
    pub dst: String,
    pub departure: DateTime<Utc>,
    pub emitted_at: DateTime<Utc>,
}
