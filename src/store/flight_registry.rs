use crate::domain::flight::{
    generate_seat_labels, validate_flight_input, CreateFlightInput, Flight, Seat, SeatStatus,
};
use crate::error::{AppError, AppResult};
use sqlx::MySqlPool;
use uuid::Uuid;
use validator::Validate;

/// C1 — persists flights and their per-flight seat inventory, and exposes
/// the reads the rest of the core needs (spec.md §4.1).
#[derive(Clone)]
pub struct FlightRegistry {
    pool: MySqlPool,
}

impl FlightRegistry {
    pub fn new(pool: MySqlPool) -> Self {
        FlightRegistry { pool }
    }

    pub async fn create_flight(&self, input: CreateFlightInput) -> AppResult<Flight> {
        input
            .validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        validate_flight_input(&input).map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let existing = sqlx::query!(
            r#"
            SELECT id as "id: Uuid" FROM flights
            WHERE aircraft_ref = ? AND dep_utc = ? AND status != 'CANCELLED'
            "#,
            input.aircraft_ref,
            input.departure
        )
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Err(AppError::DuplicateFlight(format!(
                "aircraft {} already has a flight departing at {}",
                input.aircraft_ref, input.departure
            )));
        }

        let flight_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query!(
            r#"
            INSERT INTO flights (id, src, dst, dep_utc, arr_utc, aircraft_ref, price, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'ACTIVE', ?, ?)
            "#,
            flight_id,
            input.src,
            input.dst,
            input.departure,
            input.arrival,
            input.aircraft_ref,
            input.price,
            now,
            now,
        )
        .execute(&mut *tx)
        .await?;

        for label in generate_seat_labels(input.total_seats) {
            sqlx::query!(
                r#"
                INSERT INTO seats (id, flight_id, label, status, booking_id, created_at, updated_at)
                VALUES (?, ?, ?, 'AVAILABLE', NULL, ?, ?)
                "#,
                Uuid::new_v4(),
                flight_id,
                label,
                now,
                now,
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_flight(flight_id)
            .await?
            .ok_or_else(|| AppError::Internal("flight vanished after insert".into()))
    }

    pub async fn get_flight(&self, id: Uuid) -> AppResult<Option<Flight>> {
        let flight = sqlx::query_as!(
            Flight,
            r#"
            SELECT
                id as "id: _", src, dst,
                dep_utc as "departure: _", arr_utc as "arrival: _",
                aircraft_ref, price as "price: _",
                status as "status: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM flights WHERE id = ?
            "#,
            id
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(flight)
    }

    /// All ACTIVE flights departing on the given UTC date, used by C3 to
    /// build the frontier `D` for BFS expansion (spec.md §4.3).
    pub async fn list_flights_by_date(&self, date: chrono::NaiveDate) -> AppResult<Vec<Flight>> {
        let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = start + chrono::Duration::days(1);

        let flights = sqlx::query_as!(
            Flight,
            r#"
            SELECT
                id as "id: _", src, dst,
                dep_utc as "departure: _", arr_utc as "arrival: _",
                aircraft_ref, price as "price: _",
                status as "status: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM flights
            WHERE dep_utc >= ? AND dep_utc < ? AND status = 'ACTIVE'
            "#,
            start,
            end
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(flights)
    }

    pub async fn count_available_seats(&self, flight_id: Uuid) -> AppResult<u32> {
        let row = sqlx::query!(
            r#"SELECT COUNT(*) as "count: i64" FROM seats WHERE flight_id = ? AND status = 'AVAILABLE'"#,
            flight_id
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.count as u32)
    }

    pub async fn available_seats(&self, flight_id: Uuid) -> AppResult<Vec<Seat>> {
        let seats = sqlx::query_as!(
            Seat,
            r#"
            SELECT
                id as "id: _", flight_id as "flight_id: _", label,
                status as "status: _", booking_id as "booking_id: _",
                created_at as "created_at: _", updated_at as "updated_at: _"
            FROM seats
            WHERE flight_id = ? AND status = 'AVAILABLE'
            ORDER BY label
            "#,
            flight_id
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(seats)
    }

    /// Transitions the given AVAILABLE seats to BOOKED under an existing
    /// transaction, called only from inside the booking engine's
    /// transaction (spec.md §4.1). Any seat not AVAILABLE aborts the whole
    /// call with `SeatConflict`, leaving the caller to roll back.
    pub async fn reserve_seats_in_store(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
        seat_ids: &[Uuid],
        booking_id: Uuid,
    ) -> AppResult<Vec<Seat>> {
        let mut reserved = Vec::with_capacity(seat_ids.len());

        for seat_id in seat_ids {
            let result = sqlx::query!(
                r#"
                UPDATE seats
                SET status = 'BOOKED', booking_id = ?, updated_at = ?
                WHERE id = ? AND status = 'AVAILABLE'
                "#,
                booking_id,
                chrono::Utc::now(),
                seat_id,
            )
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::SeatConflict(format!(
                    "seat {seat_id} is no longer available"
                )));
            }

            let seat = sqlx::query_as!(
                Seat,
                r#"
                SELECT
                    id as "id: _", flight_id as "flight_id: _", label,
                    status as "status: _", booking_id as "booking_id: _",
                    created_at as "created_at: _", updated_at as "updated_at: _"
                FROM seats WHERE id = ?
                "#,
                seat_id
            )
            .fetch_one(&mut **tx)
            .await?;

            reserved.push(seat);
        }

        Ok(reserved)
    }

    /// Reverts the given seats to AVAILABLE, unconditionally. Used when a
    /// booking fails after holds were acquired but before the store
    /// transaction committed — there is nothing in the store to undo in
    /// that case, but this is also used for any future cancellation path.
    pub async fn release_seats_in_store(&self, seat_ids: &[Uuid]) -> AppResult<()> {
        for seat_id in seat_ids {
            sqlx::query!(
                r#"
                UPDATE seats
                SET status = 'AVAILABLE', booking_id = NULL, updated_at = ?
                WHERE id = ? AND status != 'BOOKED'
                "#,
                chrono::Utc::now(),
                seat_id,
            )
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

}
