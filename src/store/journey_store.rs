use crate::domain::journey::{Journey, JourneyStatus, Leg};
use crate::error::AppResult;
use sqlx::MySqlPool;
use uuid::Uuid;

/// C2 — persists journeys with uniqueness on the ordered leg-id sequence
/// (spec.md §4.2). Legs are stored as an ordered JSON array rather than a
/// join table: their order is part of the journey's identity, and a join
/// table would need an explicit position column anyway, so the array is
/// the simpler faithful representation.
#[derive(Clone)]
pub struct JourneyStore {
    pool: MySqlPool,
}

struct JourneyRow {
    id: Uuid,
    legs_json: String,
    src: String,
    dst: String,
    dep_utc: chrono::DateTime<chrono::Utc>,
    arr_utc: chrono::DateTime<chrono::Utc>,
    total_price: rust_decimal::Decimal,
    status: JourneyStatus,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl JourneyRow {
    fn into_journey(self) -> Journey {
        let legs: Vec<Leg> =
            serde_json::from_str(&self.legs_json).expect("legs_json is always well-formed JSON");
        Journey {
            id: self.id,
            legs,
            src: self.src,
            dst: self.dst,
            departure: self.dep_utc,
            arrival: self.arr_utc,
            total_price: self.total_price,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl JourneyStore {
    pub fn new(pool: MySqlPool) -> Self {
        JourneyStore { pool }
    }

    /// Idempotent by the ordered leg-id sequence: a second save of the same
    /// sequence is a no-op that returns the already-persisted journey
    /// (spec.md §4.2, P3/P4). The sequence, not the journey id, is the
    /// conflict key, so replays of the same `flight-created` event never
    /// create a duplicate row even though they mint a fresh `Uuid` for the
    /// candidate journey.
    pub async fn save_journey(&self, journey: &Journey) -> AppResult<Journey> {
        let canonical = journey.canonical_sequence();

        if let Some(existing) = self.find_by_canonical_sequence(&canonical).await? {
            return Ok(existing);
        }

        let legs_json = serde_json::to_string(&journey.legs).expect("legs serialize");
        let now = chrono::Utc::now();

        let result = sqlx::query!(
            r#"
            INSERT INTO journeys
                (id, legs_json, canonical_sequence, src, dst, dep_utc, arr_utc, total_price, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
            journey.id,
            legs_json,
            canonical,
            journey.src,
            journey.dst,
            journey.departure,
            journey.arrival,
            journey.total_price,
            journey.status,
            now,
            now,
        )
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Lost the race to a concurrent insert of the same sequence.
            return self
                .find_by_canonical_sequence(&canonical)
                .await?
                .ok_or_else(|| {
                    crate::error::AppError::Internal(
                        "journey insert raced but no row found".into(),
                    )
                });
        }

        Ok(journey.clone())
    }

    async fn find_by_canonical_sequence(&self, canonical: &str) -> AppResult<Option<Journey>> {
        let row = sqlx::query_as!(
            JourneyRow,
            r#"
            SELECT
                id as "id: _", legs_json, src, dst,
                dep_utc as "dep_utc: _", arr_utc as "arr_utc: _",
                total_price as "total_price: _", status as "status: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM journeys WHERE canonical_sequence = ?
            "#,
            canonical
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(JourneyRow::into_journey))
    }

    pub async fn get_journey(&self, id: Uuid) -> AppResult<Option<Journey>> {
        let row = sqlx::query_as!(
            JourneyRow,
            r#"
            SELECT
                id as "id: _", legs_json, src, dst,
                dep_utc as "dep_utc: _", arr_utc as "arr_utc: _",
                total_price as "total_price: _", status as "status: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM journeys WHERE id = ?
            "#,
            id
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(JourneyRow::into_journey))
    }

    /// Matches src, dst, status = ACTIVE, and the date of the first leg's
    /// departure in UTC (spec.md §4.2) — not availability, which is C4's
    /// job.
    pub async fn list_journeys_by_route_and_date(
        &self,
        src: &str,
        dst: &str,
        date: chrono::NaiveDate,
    ) -> AppResult<Vec<Journey>> {
        let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = start + chrono::Duration::days(1);

        let rows = sqlx::query_as!(
            JourneyRow,
            r#"
            SELECT
                id as "id: _", legs_json, src, dst,
                dep_utc as "dep_utc: _", arr_utc as "arr_utc: _",
                total_price as "total_price: _", status as "status: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM journeys
            WHERE src = ? AND dst = ? AND status = 'ACTIVE'
                AND dep_utc >= ? AND dep_utc < ?
            ORDER BY created_at ASC
            "#,
            src,
            dst,
            start,
            end
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(JourneyRow::into_journey).collect())
    }

    /// Active journeys landing at `airport`, used by C3's middle-bridging
    /// expansion (spec.md §4.3 pattern 4). Not date-scoped: bridging is a
    /// real-time layover check against the new flight's departure, so a
    /// journey whose last leg lands late one calendar day can still bridge
    /// into a flight departing early the next.
    pub async fn journeys_ending_at(&self, airport: &str) -> AppResult<Vec<Journey>> {
        let rows = sqlx::query_as!(
            JourneyRow,
            r#"
            SELECT
                id as "id: _", legs_json, src, dst,
                dep_utc as "dep_utc: _", arr_utc as "arr_utc: _",
                total_price as "total_price: _", status as "status: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM journeys
            WHERE dst = ? AND status = 'ACTIVE'
            "#,
            airport
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(JourneyRow::into_journey).collect())
    }

    pub async fn journeys_starting_at(&self, airport: &str) -> AppResult<Vec<Journey>> {
        let rows = sqlx::query_as!(
            JourneyRow,
            r#"
            SELECT
                id as "id: _", legs_json, src, dst,
                dep_utc as "dep_utc: _", arr_utc as "arr_utc: _",
                total_price as "total_price: _", status as "status: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM journeys
            WHERE src = ? AND status = 'ACTIVE'
            "#,
            airport
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(JourneyRow::into_journey).collect())
    }
}
