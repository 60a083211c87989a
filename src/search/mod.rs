use crate::domain::journey::{Journey, JourneyWithAvailability};
use crate::error::{AppError, AppResult};
use crate::store::{FlightRegistry, JourneyStore};
use chrono::NaiveDate;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// C4 — cache-first route/date search over the materialised journey set
/// (spec.md §4.4). On a cache miss this reads C2 for the journey set and
/// C1 for per-leg availability; on a hit it trusts the cached view as-is
/// for up to `SEARCH_CACHE_TTL`, which is the deliberate staleness window
/// spec.md documents rather than a bug to work around.
#[derive(Clone)]
pub struct SearchEngine {
    flights: FlightRegistry,
    journeys: JourneyStore,
    cache: ConnectionManager,
    cache_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedJourney {
    journey: CachedJourneyFields,
    available_seats: u32,
}

/// A flattened, serde-friendly mirror of `Journey` for the cache payload.
/// Kept separate from `Journey` itself so that adding cache-only fields
/// later doesn't leak into the domain type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedJourneyFields {
    id: uuid::Uuid,
    legs: Vec<crate::domain::journey::Leg>,
    src: String,
    dst: String,
    departure: chrono::DateTime<chrono::Utc>,
    arrival: chrono::DateTime<chrono::Utc>,
    total_price: rust_decimal::Decimal,
    status: crate::domain::journey::JourneyStatus,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Journey> for CachedJourneyFields {
    fn from(j: &Journey) -> Self {
        CachedJourneyFields {
            id: j.id,
            legs: j.legs.clone(),
            src: j.src.clone(),
            dst: j.dst.clone(),
            departure: j.departure,
            arrival: j.arrival,
            total_price: j.total_price,
            status: j.status,
            created_at: j.created_at,
            updated_at: j.updated_at,
        }
    }
}

impl From<CachedJourneyFields> for Journey {
    fn from(f: CachedJourneyFields) -> Self {
        Journey {
            id: f.id,
            legs: f.legs,
            src: f.src,
            dst: f.dst,
            departure: f.departure,
            arrival: f.arrival,
            total_price: f.total_price,
            status: f.status,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub src: String,
    pub dst: String,
    pub date: NaiveDate,
    pub passengers: u32,
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub journeys: Vec<JourneyWithAvailability>,
    pub total_matched: usize,
}

impl SearchEngine {
    pub fn new(
        flights: FlightRegistry,
        journeys: JourneyStore,
        cache: ConnectionManager,
        cache_ttl: Duration,
    ) -> Self {
        SearchEngine {
            flights,
            journeys,
            cache,
            cache_ttl,
        }
    }

    fn cache_key(src: &str, dst: &str, date: NaiveDate) -> String {
        format!("journeys:{src}:{dst}:{date}")
    }

    /// spec.md §4.4 steps 1-6. `sortBy` outside `{price, duration}` leaves
    /// the store's insertion order untouched, matching P10's "otherwise"
    /// clause.
    pub async fn search(&self, req: SearchRequest) -> AppResult<SearchResult> {
        if req.src.eq_ignore_ascii_case(&req.dst) {
            return Err(AppError::InvalidInput(
                "source and destination must differ".into(),
            ));
        }
        if req.passengers == 0 {
            return Err(AppError::InvalidInput(
                "passenger count must be at least 1".into(),
            ));
        }

        let key = Self::cache_key(&req.src, &req.dst, req.date);

        let mut with_availability = match self.read_cache(&key).await {
            Some(cached) => cached,
            None => {
                let computed = self.compute_and_cache(&key, &req.src, &req.dst, req.date).await?;
                computed
            }
        };

        with_availability.retain(|jw| jw.available_seats >= req.passengers);

        match req.sort_by.as_deref() {
            Some("price") => {
                with_availability.sort_by(|a, b| a.journey.total_price.cmp(&b.journey.total_price))
            }
            Some("duration") => {
                with_availability.sort_by(|a, b| a.journey.duration().cmp(&b.journey.duration()))
            }
            _ => {}
        }

        let total_matched = with_availability.len();
        if let Some(limit) = req.limit {
            with_availability.truncate(limit);
        }

        Ok(SearchResult {
            journeys: with_availability,
            total_matched,
        })
    }

    /// Returns `None` on a cache miss, a malformed payload, or a cache
    /// outage — all three degrade identically to a store read (spec.md
    /// §4.4 step 2, §4.4 "Failure semantics").
    async fn read_cache(&self, key: &str) -> Option<Vec<JourneyWithAvailability>> {
        let mut conn = self.cache.clone();
        let raw: Option<String> = match conn.get(key).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "search cache unavailable, falling back to store");
                return None;
            }
        };

        let raw = raw?;
        match serde_json::from_str::<Vec<CachedJourney>>(&raw) {
            Ok(cached) => Some(
                cached
                    .into_iter()
                    .map(|c| JourneyWithAvailability {
                        journey: c.journey.into(),
                        available_seats: c.available_seats,
                    })
                    .collect(),
            ),
            Err(err) => {
                tracing::warn!(error = %err, "malformed search cache payload, falling back to store");
                None
            }
        }
    }

    /// Cache miss path (spec.md §4.4 step 3): loads journeys from C2,
    /// computes per-journey availability from C1, writes the view back to
    /// the cache with `SEARCH_CACHE_TTL`. A cache write failure is logged
    /// and ignored — correctness does not depend on the write succeeding,
    /// only on the next miss recomputing (spec.md §4.4).
    async fn compute_and_cache(
        &self,
        key: &str,
        src: &str,
        dst: &str,
        date: NaiveDate,
    ) -> AppResult<Vec<JourneyWithAvailability>> {
        let journeys = self
            .journeys
            .list_journeys_by_route_and_date(src, dst, date)
            .await?;

        let mut result = Vec::with_capacity(journeys.len());
        for journey in journeys {
            let available = self.availability(&journey).await?;
            result.push(JourneyWithAvailability {
                journey,
                available_seats: available,
            });
        }

        let payload: Vec<CachedJourney> = result
            .iter()
            .map(|jw| CachedJourney {
                journey: CachedJourneyFields::from(&jw.journey),
                available_seats: jw.available_seats,
            })
            .collect();

        if let Ok(serialized) = serde_json::to_string(&payload) {
            let mut conn = self.cache.clone();
            let set_result: Result<(), _> = conn
                .set_ex(key, serialized, self.cache_ttl.as_secs())
                .await;
            if let Err(err) = set_result {
                tracing::warn!(error = %err, "failed to populate search cache; next query recomputes");
            }
        }

        Ok(result)
    }

    /// Availability is the minimum across legs of durable `AVAILABLE`
    /// seat counts; C5 holds are intentionally not subtracted here, making
    /// this an optimistic upper bound (spec.md §4.4 "Availability
    /// definition", P8).
    async fn availability(&self, journey: &Journey) -> AppResult<u32> {
        let mut min_available = u32::MAX;
        for leg in &journey.legs {
            let count = self.flights.count_available_seats(leg.flight_id).await?;
            min_available = min_available.min(count);
        }
        if min_available == u32::MAX {
            min_available = 0;
        }
        Ok(min_available)
    }

    /// Best-effort invalidation by exact key, used by the admin path when
    /// C3 persists new journeys for a route (spec.md §4.4: "MAY
    /// additionally invalidate... the spec does not require this but
    /// permits it").
    pub async fn invalidate(&self, src: &str, dst: &str, date: NaiveDate) {
        let mut conn = self.cache.clone();
        let key = Self::cache_key(src, dst, date);
        let result: Result<(), _> = conn.del(&key).await;
        if let Err(err) = result {
            tracing::debug!(error = %err, %key, "cache invalidation failed; entry will expire via TTL");
        }
    }
}
