use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum JourneyStatus {
    #[sqlx(rename = "ACTIVE")]
    Active,
    #[sqlx(rename = "DISABLED")]
    Disabled,
}

/// One flight within a journey, positioned by its 1-based order
/// (spec.md GLOSSARY "Leg").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub flight_id: Uuid,
    pub order: u8,
}

/// An ordered 1..3 leg itinerary (spec.md §3 "Journey"). `src`, `dst`,
/// `departure`, `arrival`, and `total_price` are derived from `legs` at
/// construction time and kept alongside for cheap reads; they are never
/// recomputed from stored legs after that point in the core (journeys are
/// immutable once persisted, aside from `status`).
#[derive(Debug, Clone, Serialize)]
pub struct Journey {
    pub id: Uuid,
    pub legs: Vec<Leg>,
    pub src: String,
    pub dst: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub total_price: Decimal,
    pub status: JourneyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Journey {
    /// The canonical identity of a journey: the ordered sequence of leg
    /// flight ids, joined so that two journeys collide iff their leg
    /// sequences are identical and in the same order (spec.md §3, §4.2 —
    /// "MUST NOT deduplicate by any other projection, e.g. sorted leg ids").
    pub fn canonical_sequence(&self) -> String {
        self.legs
            .iter()
            .map(|l| l.flight_id.to_string())
            .collect::<Vec<_>>()
            .join(">")
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.arrival - self.departure
    }
}

/// A journey augmented with the live availability computed by the search
/// engine (spec.md §4.4). Never persisted; constructed per-query or read
/// back out of the cache.
#[derive(Debug, Clone, Serialize)]
pub struct JourneyWithAvailability {
    pub journey: Journey,
    pub available_seats: u32,
}
