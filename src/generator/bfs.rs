use crate::domain::flight::Flight;
use crate::domain::journey::Leg;
use chrono::Duration;
use indexmap::IndexSet;
use std::collections::HashMap;
use uuid::Uuid;

/// Tunable connection/duration bounds the BFS enforces, threaded through
/// from `config::Settings` rather than hard-coded, so tests can exercise
/// edge cases with tight windows.
#[derive(Debug, Clone, Copy)]
pub struct JourneyConstraints {
    pub layover_min: Duration,
    pub layover_max: Duration,
    pub journey_max_duration: Duration,
    pub max_legs: usize,
}

/// A path under construction: the ordered flight ids plus the set of flight
/// ids already used, so cycle-checking is O(1) (spec.md §4.3 "Frontier
/// representation").
#[derive(Debug, Clone)]
struct Frontier {
    path: Vec<Uuid>,
    used: std::collections::HashSet<Uuid>,
}

impl Frontier {
    fn singleton(flight_id: Uuid) -> Self {
        let mut used = std::collections::HashSet::new();
        used.insert(flight_id);
        Frontier {
            path: vec![flight_id],
            used,
        }
    }

    fn push_back(&self, flight_id: Uuid) -> Frontier {
        let mut path = self.path.clone();
        path.push(flight_id);
        let mut used = self.used.clone();
        used.insert(flight_id);
        Frontier { path, used }
    }

    fn push_front(&self, flight_id: Uuid) -> Frontier {
        let mut path = vec![flight_id];
        path.extend(self.path.iter().copied());
        let mut used = self.used.clone();
        used.insert(flight_id);
        Frontier { path, used }
    }
}

fn layover_ok(prev: &Flight, next: &Flight, c: &JourneyConstraints) -> bool {
    if next.src != prev.dst {
        return false;
    }
    let gap = next.departure - prev.arrival;
    gap >= c.layover_min && gap <= c.layover_max
}

fn duration_ok(path: &[Uuid], flights: &HashMap<Uuid, &Flight>, c: &JourneyConstraints) -> bool {
    let first = flights[&path[0]];
    let last = flights[path.last().unwrap()];
    (last.arrival - first.departure) <= c.journey_max_duration
}

/// Enumerates every valid journey (spec.md §3 invariants) containing `f`,
/// using the four complementary expansions named in spec.md §4.3: direct,
/// forward extension, backward extension, and middle bridging. `same_day`
/// is the pool `D` of other ACTIVE flights departing on `f`'s UTC date;
/// `journeys_ending_at_src` / `journeys_starting_at_dst` are pre-existing
/// ACTIVE journeys that can be bridged through `f` (these may include legs
/// outside `same_day`, since bridging is a real-time layover check, not a
/// calendar-date one). `bridge_flights` carries the resolved flight records
/// for exactly those out-of-`same_day` legs, so `layover_ok`/`duration_ok`
/// can be evaluated for them during middle bridging; it does not feed
/// `by_src`/`by_dst`, since it is not a candidate pool for forward/backward
/// extension, only a lookup table for legs the caller already named.
pub fn expand(
    f: &Flight,
    same_day: &[Flight],
    bridge_flights: &[Flight],
    journeys_ending_at_src: &[Vec<Leg>],
    journeys_starting_at_dst: &[Vec<Leg>],
    constraints: &JourneyConstraints,
) -> Vec<Vec<Uuid>> {
    let mut flights_by_id: HashMap<Uuid, &Flight> = HashMap::new();
    flights_by_id.insert(f.id, f);
    for sf in same_day {
        flights_by_id.insert(sf.id, sf);
    }
    for bf in bridge_flights {
        flights_by_id.insert(bf.id, bf);
    }

    let mut by_src: HashMap<&str, Vec<&Flight>> = HashMap::new();
    let mut by_dst: HashMap<&str, Vec<&Flight>> = HashMap::new();
    for sf in same_day {
        by_src.entry(sf.src.as_str()).or_default().push(sf);
        by_dst.entry(sf.dst.as_str()).or_default().push(sf);
    }

    let mut seen = IndexSet::new();
    let mut results = Vec::new();

    let mut emit = |path: Vec<Uuid>| {
        let key = path
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(">");
        if seen.insert(key) {
            results.push(path);
        }
    };

    // 1. Direct.
    emit(vec![f.id]);

    // 2. Forward extension: BFS from [F] appending from D.
    let mut frontier = vec![Frontier::singleton(f.id)];
    while let Some(node) = frontier.pop() {
        if node.path.len() >= constraints.max_legs {
            continue;
        }
        let last_flight = flights_by_id[node.path.last().unwrap()];
        let Some(candidates) = by_src.get(last_flight.dst.as_str()) else {
            continue;
        };
        for cand in candidates {
            if node.used.contains(&cand.id) {
                continue;
            }
            if !layover_ok(last_flight, cand, &constraints) {
                continue;
            }
            let next = node.push_back(cand.id);
            if !duration_ok(&next.path, &flights_by_id, &constraints) {
                continue;
            }
            emit(next.path.clone());
            frontier.push(next);
        }
    }

    // 3. Backward extension: prepend flights landing at F.source.
    let mut frontier = vec![Frontier::singleton(f.id)];
    while let Some(node) = frontier.pop() {
        if node.path.len() >= constraints.max_legs {
            continue;
        }
        let first_flight = flights_by_id[&node.path[0]];
        let Some(candidates) = by_dst.get(first_flight.src.as_str()) else {
            continue;
        };
        for cand in candidates {
            if node.used.contains(&cand.id) {
                continue;
            }
            if !layover_ok(cand, first_flight, &constraints) {
                continue;
            }
            let next = node.push_front(cand.id);
            if !duration_ok(&next.path, &flights_by_id, &constraints) {
                continue;
            }
            emit(next.path.clone());
            frontier.push(next);
        }
    }

    // 4. Middle bridging: combine pre-existing journeys through F.
    for pre in journeys_ending_at_src {
        let pre_ids: Vec<Uuid> = pre.iter().map(|l| l.flight_id).collect();
        if pre_ids.contains(&f.id) || pre_ids.len() + 1 > constraints.max_legs {
            continue;
        }
        let Some(pre_last) = pre_ids.last().and_then(|id| flights_by_id.get(id)) else {
            continue;
        };
        if !layover_ok(pre_last, f, &constraints) {
            continue;
        }
        let mut combined = pre_ids.clone();
        combined.push(f.id);
        if duration_ok(&combined, &flights_by_id, &constraints) {
            emit(combined.clone());
        }

        // Bridge a third leg out of F.destination, if room remains.
        if combined.len() < constraints.max_legs {
            if let Some(nexts) = by_src.get(f.dst.as_str()) {
                for g in nexts {
                    if combined.contains(&g.id) {
                        continue;
                    }
                    if !layover_ok(f, g, &constraints) {
                        continue;
                    }
                    let mut triple = combined.clone();
                    triple.push(g.id);
                    if duration_ok(&triple, &flights_by_id, &constraints) {
                        emit(triple);
                    }
                }
            }
        }
    }

    for post in journeys_starting_at_dst {
        let post_ids: Vec<Uuid> = post.iter().map(|l| l.flight_id).collect();
        if post_ids.contains(&f.id) || post_ids.len() + 1 > constraints.max_legs {
            continue;
        }
        let Some(post_first) = post_ids.first().and_then(|id| flights_by_id.get(id)) else {
            continue;
        };
        if !layover_ok(f, post_first, &constraints) {
            continue;
        }
        let mut combined = vec![f.id];
        combined.extend(post_ids.iter().copied());
        if duration_ok(&combined, &flights_by_id, &constraints) {
            emit(combined.clone());
        }

        if combined.len() < constraints.max_legs {
            if let Some(prevs) = by_dst.get(f.src.as_str()) {
                for e in prevs {
                    if combined.contains(&e.id) {
                        continue;
                    }
                    if !layover_ok(e, f, &constraints) {
                        continue;
                    }
                    let mut triple = vec![e.id];
                    triple.extend(combined.iter().copied());
                    if duration_ok(&triple, &flights_by_id, &constraints) {
                        emit(triple);
                    }
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn constraints() -> JourneyConstraints {
        JourneyConstraints {
            layover_min: Duration::minutes(30),
            layover_max: Duration::hours(4),
            journey_max_duration: Duration::hours(24),
            max_legs: 3,
        }
    }

    fn flight(id: Uuid, src: &str, dst: &str, dep: &str, arr: &str) -> Flight {
        Flight {
            id,
            src: src.into(),
            dst: dst.into(),
            departure: Utc.datetime_from_str(dep, "%Y-%m-%dT%H:%M:%SZ").unwrap(),
            arrival: Utc.datetime_from_str(arr, "%Y-%m-%dT%H:%M:%SZ").unwrap(),
            aircraft_ref: "A320".into(),
            price: rust_decimal::Decimal::new(5000, 0),
            status: crate::domain::flight::FlightStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn direct_always_emitted() {
        let f1 = flight(
            Uuid::new_v4(),
            "DEL",
            "BOM",
            "2025-09-25T08:00:00Z",
            "2025-09-25T10:00:00Z",
        );
        let paths = expand(&f1, &[], &[], &[], &[], &constraints());
        assert!(paths.iter().any(|p| p == &vec![f1.id]));
    }

    #[test]
    fn forward_extension_within_layover() {
        let f1 = flight(
            Uuid::new_v4(),
            "DEL",
            "BOM",
            "2025-09-25T08:00:00Z",
            "2025-09-25T10:00:00Z",
        );
        let f2 = flight(
            Uuid::new_v4(),
            "BOM",
            "MAA",
            "2025-09-25T11:00:00Z",
            "2025-09-25T13:00:00Z",
        );
        let paths = expand(&f1, &[f2.clone()], &[], &[], &[], &constraints());
        assert!(paths.iter().any(|p| p == &vec![f1.id, f2.id]));
    }

    #[test]
    fn invalid_layover_rejected() {
        let f1 = flight(
            Uuid::new_v4(),
            "DEL",
            "BOM",
            "2025-09-25T08:00:00Z",
            "2025-09-25T10:00:00Z",
        );
        let f2 = flight(
            Uuid::new_v4(),
            "BOM",
            "MAA",
            "2025-09-25T10:15:00Z",
            "2025-09-25T12:15:00Z",
        );
        let paths = expand(&f1, &[f2.clone()], &[], &[], &[], &constraints());
        assert!(!paths.iter().any(|p| p == &vec![f1.id, f2.id]));
    }

    #[test]
    fn no_flight_repeats_in_any_emitted_path() {
        let f1 = flight(
            Uuid::new_v4(),
            "DEL",
            "BOM",
            "2025-09-25T08:00:00Z",
            "2025-09-25T10:00:00Z",
        );
        let f2 = flight(
            Uuid::new_v4(),
            "BOM",
            "DEL",
            "2025-09-25T11:00:00Z",
            "2025-09-25T13:00:00Z",
        );
        let f3 = flight(
            Uuid::new_v4(),
            "DEL",
            "BOM",
            "2025-09-25T14:00:00Z",
            "2025-09-25T16:00:00Z",
        );
        let paths = expand(&f1, &[f2, f3], &[], &[], &[], &constraints());
        for p in &paths {
            let unique: std::collections::HashSet<_> = p.iter().collect();
            assert_eq!(unique.len(), p.len());
        }
    }
}
