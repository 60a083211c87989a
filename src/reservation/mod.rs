use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// C5 — time-bounded, multi-seat holds over Redis sorted sets (spec.md
/// §4.5). Not a row lock: a soft claim that serialises concurrent booking
/// attempts ahead of the store's authoritative transaction.
///
/// `AcquireHold` is the one operation whose four steps (purge, check,
/// insert, set collection TTL) must be indivisible from a concurrent
/// caller's perspective; it runs as a single Lua script via `EVAL`, which
/// is Redis's standard answer to "one indivisible operation" for an
/// external in-memory store (spec.md §4.5, §9).
#[derive(Clone)]
pub struct SeatReservationLayer {
    conn: ConnectionManager,
    reservation_ttl: Duration,
}

/// Safety margin added on top of `RESERVATION_TTL` when setting the whole
/// collection's key TTL, so an abandoned collection self-deletes slightly
/// after its last member would have expired anyway (spec.md §4.5 step 4).
const COLLECTION_TTL_BUFFER: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
pub enum HoldOutcome {
    Acquired,
    Conflict,
}

const ACQUIRE_HOLD_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local expiry_ms = tonumber(ARGV[2])
local collection_ttl_ms = tonumber(ARGV[3])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now_ms)

for i = 4, #ARGV do
    if redis.call('ZSCORE', key, ARGV[i]) then
        return 0
    end
end

for i = 4, #ARGV do
    redis.call('ZADD', key, expiry_ms, ARGV[i])
end
redis.call('PEXPIRE', key, collection_ttl_ms)

return 1
"#;

impl SeatReservationLayer {
    pub fn new(conn: ConnectionManager, reservation_ttl: Duration) -> Self {
        SeatReservationLayer {
            conn,
            reservation_ttl,
        }
    }

    fn key(flight_id: Uuid) -> String {
        format!("seat_reservations:{flight_id}")
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_millis() as i64
    }

    /// Attempts to atomically hold every seat id for `ttl` (defaults to
    /// `RESERVATION_TTL` when `ttl` is `None`). Fails closed on a Redis
    /// error: the booking engine must never treat a store outage as a
    /// successful hold (spec.md §4.5 "Failure semantics").
    pub async fn acquire_hold(
        &self,
        flight_id: Uuid,
        seat_ids: &[Uuid],
        ttl: Option<Duration>,
    ) -> HoldOutcome {
        if seat_ids.is_empty() {
            return HoldOutcome::Acquired;
        }

        let ttl = ttl.unwrap_or(self.reservation_ttl);
        let now = Self::now_ms();
        let expiry = now + ttl.as_millis() as i64;
        let collection_ttl = (ttl + COLLECTION_TTL_BUFFER).as_millis() as i64;

        let mut cmd = redis::Script::new(ACQUIRE_HOLD_SCRIPT).prepare_invoke();
        cmd.key(Self::key(flight_id))
            .arg(now)
            .arg(expiry)
            .arg(collection_ttl);
        for id in seat_ids {
            cmd.arg(id.to_string());
        }

        let mut conn = self.conn.clone();
        match cmd.invoke_async::<_, i64>(&mut conn).await {
            Ok(1) => HoldOutcome::Acquired,
            Ok(_) => HoldOutcome::Conflict,
            Err(err) => {
                tracing::warn!(%flight_id, error = %err, "reservation layer unavailable, failing closed");
                HoldOutcome::Conflict
            }
        }
    }

    /// Removes entries unconditionally; tolerates seat ids that are not
    /// currently held.
    pub async fn release_hold(&self, flight_id: Uuid, seat_ids: &[Uuid]) {
        if seat_ids.is_empty() {
            return;
        }
        let mut conn = self.conn.clone();
        let members: Vec<String> = seat_ids.iter().map(Uuid::to_string).collect();
        let result: Result<i64, _> = conn.zrem(Self::key(flight_id), members).await;
        if let Err(err) = result {
            tracing::warn!(%flight_id, error = %err, "failed to release holds; they will expire on their own");
        }
    }

    /// Purges expired entries, then returns the subset of `candidate_seats`
    /// that are NOT currently held. Fails open on a Redis error — the
    /// downstream store transaction is the authority, so returning the
    /// full candidate list here never produces a false success on its own
    /// (spec.md §4.5 "Failure semantics").
    pub async fn filter_by_active_holds(
        &self,
        flight_id: Uuid,
        candidate_seats: &[Uuid],
    ) -> Vec<Uuid> {
        if candidate_seats.is_empty() {
            return Vec::new();
        }

        let mut conn = self.conn.clone();
        let key = Self::key(flight_id);
        let now = Self::now_ms();

        let purge: Result<i64, _> = conn.zremrangebyscore(&key, "-inf", now).await;
        if let Err(err) = purge {
            tracing::warn!(%flight_id, error = %err, "reservation layer unavailable, failing open");
            return candidate_seats.to_vec();
        }

        let mut unheld = Vec::with_capacity(candidate_seats.len());
        for seat in candidate_seats {
            let score: Result<Option<f64>, _> = conn.zscore(&key, seat.to_string()).await;
            match score {
                Ok(None) => unheld.push(*seat),
                Ok(Some(_)) => {}
                Err(err) => {
                    tracing::warn!(%flight_id, error = %err, "reservation layer unavailable, failing open");
                    return candidate_seats.to_vec();
                }
            }
        }
        unheld
    }

    /// Explicit purge of expired entries for one flight (spec.md §4.5
    /// "Cleanup"). The layer also opportunistically purges inside
    /// `acquire_hold` and `filter_by_active_holds`, so this is only needed
    /// for a flight that neither operation has touched recently.
    pub async fn cleanup(&self, flight_id: Uuid) {
        let mut conn = self.conn.clone();
        let now = Self::now_ms();
        let result: Result<i64, _> = conn.zremrangebyscore(Self::key(flight_id), "-inf", now).await;
        if let Err(err) = result {
            tracing::warn!(%flight_id, error = %err, "cleanup failed; entries will still expire via key TTL");
        }
    }
}
