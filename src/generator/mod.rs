pub mod bfs;

use crate::domain::flight::Flight;
use crate::domain::journey::{Journey, JourneyStatus, Leg};
use crate::domain::FlightCreatedEvent;
use crate::error::AppResult;
use crate::generator::bfs::JourneyConstraints;
use crate::store::{FlightRegistry, JourneyStore};
use std::collections::HashMap;
use uuid::Uuid;

/// C3 — consumes `flight-created` events and BFS-expands the journey graph
/// (spec.md §4.3). Guarantees: every journey written satisfies the §3
/// invariants; processing the same event twice yields zero additional
/// journeys; the complete set of valid journeys involving the new flight
/// is produced on the first successful processing.
#[derive(Clone)]
pub struct JourneyGenerator {
    flights: FlightRegistry,
    journeys: JourneyStore,
    constraints: JourneyConstraints,
}

/// The five processing stages named in spec.md §4.3's state machine. Logged
/// at `tracing::debug!` so the generator's progress is observable without
/// a dedicated metrics pipeline (out of scope per spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    LoadingContext,
    Expanding,
    Persisting,
    Done,
}

impl JourneyGenerator {
    pub fn new(flights: FlightRegistry, journeys: JourneyStore, constraints: JourneyConstraints) -> Self {
        JourneyGenerator {
            flights,
            journeys,
            constraints,
        }
    }

    /// Processes one `flight-created` event end to end. Returns the
    /// journeys that are ACTIVE and involve the new flight after this call
    /// (whether newly persisted here or already persisted by an earlier,
    /// at-least-once redelivery).
    ///
    /// An unknown flight id is an invariant-violating payload: it is logged
    /// and treated as FAILED_PERMANENT (ack + log, spec.md §4.3), returning
    /// `Ok(vec![])` rather than an error so the caller acks instead of
    /// retrying forever.
    pub async fn process_flight_created(&self, event: FlightCreatedEvent) -> AppResult<Vec<Journey>> {
        self.log_stage(Stage::Received, &event);

        self.log_stage(Stage::LoadingContext, &event);
        let Some(f) = self.flights.get_flight(event.flight_id).await? else {
            tracing::warn!(
                flight_id = %event.flight_id,
                "flight-created event references unknown flight id; acking without retry"
            );
            return Ok(Vec::new());
        };

        let date = f.departure.date_naive();
        let mut same_day: Vec<Flight> = self
            .flights
            .list_flights_by_date(date)
            .await?
            .into_iter()
            .filter(|other| other.id != f.id)
            .collect();
        same_day.sort_by_key(|fl| fl.id);

        let journeys_ending_at_src: Vec<Vec<Leg>> = self
            .journeys
            .journeys_ending_at(&f.src)
            .await?
            .into_iter()
            .map(|j| j.legs)
            .collect();
        let journeys_starting_at_dst: Vec<Vec<Leg>> = self
            .journeys
            .journeys_starting_at(&f.dst)
            .await?
            .into_iter()
            .map(|j| j.legs)
            .collect();

        // Middle-bridging may reference flights from bridged journeys that
        // fall outside `same_day` (journey_store.rs's `journeys_ending_at`/
        // `journeys_starting_at` are deliberately not date-scoped). Resolve
        // those flight records up front, before expansion, so the BFS can
        // actually evaluate the layover/duration constraints across a day
        // boundary instead of silently dropping the bridge.
        let mut known_ids: std::collections::HashSet<Uuid> =
            same_day.iter().map(|fl| fl.id).collect();
        known_ids.insert(f.id);
        let mut bridge_flights = Vec::new();
        for legs in journeys_ending_at_src.iter().chain(journeys_starting_at_dst.iter()) {
            for leg in legs {
                if known_ids.insert(leg.flight_id) {
                    if let Some(flight) = self.flights.get_flight(leg.flight_id).await? {
                        bridge_flights.push(flight);
                    }
                }
            }
        }

        self.log_stage(Stage::Expanding, &event);
        let candidate_paths = bfs::expand(
            &f,
            &same_day,
            &bridge_flights,
            &journeys_ending_at_src,
            &journeys_starting_at_dst,
            &self.constraints,
        );

        let mut flights_by_id: HashMap<Uuid, Flight> = HashMap::new();
        flights_by_id.insert(f.id, f.clone());
        for sf in &same_day {
            flights_by_id.insert(sf.id, sf.clone());
        }
        for bf in &bridge_flights {
            flights_by_id.insert(bf.id, bf.clone());
        }

        self.log_stage(Stage::Persisting, &event);
        let mut persisted = Vec::new();
        for path in candidate_paths {
            let Some(journey) = build_journey(&path, &flights_by_id, &self.constraints) else {
                continue;
            };
            let saved = self.journeys.save_journey(&journey).await?;
            persisted.push(saved);
        }

        self.log_stage(Stage::Done, &event);
        Ok(persisted)
    }

    fn log_stage(&self, stage: Stage, event: &FlightCreatedEvent) {
        tracing::debug!(flight_id = %event.flight_id, stage = ?stage, "journey generator stage");
    }
}

/// Validates a candidate leg sequence against every §3 journey invariant
/// and, if valid, constructs the `Journey` to persist. This is the single
/// point where "a path is valid" is decided — the BFS in `bfs::expand`
/// already applies the layover/duration/cycle checks during expansion, but
/// every path is re-validated here before persistence rather than trusted,
/// per spec.md §9's note that storage-level constraints alone are not
/// sufficient.
fn build_journey(
    path: &[Uuid],
    flights: &HashMap<Uuid, Flight>,
    constraints: &JourneyConstraints,
) -> Option<Journey> {
    if path.is_empty() || path.len() > constraints.max_legs {
        return None;
    }

    let mut seen = std::collections::HashSet::new();
    for id in path {
        if !seen.insert(id) {
            return None;
        }
    }

    let resolved: Vec<&Flight> = path.iter().map(|id| flights.get(id)).collect::<Option<_>>()?;

    for window in resolved.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if next.src != prev.dst {
            return None;
        }
        let gap = next.departure - prev.arrival;
        if gap < constraints.layover_min || gap > constraints.layover_max {
            return None;
        }
    }

    let first = resolved[0];
    let last = *resolved.last().unwrap();

    if first.src == last.dst {
        return None;
    }
    if (last.arrival - first.departure) > constraints.journey_max_duration {
        return None;
    }

    let total_price = resolved.iter().map(|f| f.price).sum();
    let now = chrono::Utc::now();

    Some(Journey {
        id: Uuid::new_v4(),
        legs: path
            .iter()
            .enumerate()
            .map(|(i, id)| Leg {
                flight_id: *id,
                order: (i + 1) as u8,
            })
            .collect(),
        src: first.src.clone(),
        dst: last.dst.clone(),
        departure: first.departure,
        arrival: last.arrival,
        total_price,
        status: JourneyStatus::Active,
        created_at: now,
        updated_at: now,
    })
}
