use crate::domain::booking::{
    Booking, BookingResponse, BookingStatus, CreateBookingRequest, SeatAssignment,
};
use crate::domain::journey::{Journey, JourneyStatus};
use crate::error::{AppError, AppResult};
use crate::reservation::{HoldOutcome, SeatReservationLayer};
use crate::store::{FlightRegistry, JourneyStore};
use sqlx::MySqlPool;
use uuid::Uuid;

/// C6 — orchestrates holds across every leg of a chosen journey, then
/// commits the booking and all seat transitions as one relational
/// transaction (spec.md §4.6). Strict all-or-nothing: either every leg
/// gets exactly `passenger_count` BOOKED seats linked to the new booking,
/// or nothing in the store changes at all.
#[derive(Clone)]
pub struct BookingEngine {
    flights: FlightRegistry,
    journeys: JourneyStore,
    reservations: SeatReservationLayer,
    pool: MySqlPool,
}

impl BookingEngine {
    pub fn new(
        flights: FlightRegistry,
        journeys: JourneyStore,
        reservations: SeatReservationLayer,
        pool: MySqlPool,
    ) -> Self {
        BookingEngine {
            flights,
            journeys,
            reservations,
            pool,
        }
    }

    /// spec.md §4.6 steps 1-5.
    pub async fn create_booking(&self, request: CreateBookingRequest) -> AppResult<BookingResponse> {
        if request.passenger_count == 0 {
            return Err(AppError::InvalidInput(
                "passenger count must be at least 1".into(),
            ));
        }

        let journey = self
            .journeys
            .get_journey(request.journey_id)
            .await?
            .filter(|j| j.status == JourneyStatus::Active)
            .ok_or_else(|| {
                AppError::JourneyNotFound(format!("journey {} not found or disabled", request.journey_id))
            })?;

        // Step 2: for every leg, the candidate seats not already held by
        // another in-flight attempt. No holds are acquired yet at this
        // point, so a shortfall here costs nothing to unwind.
        let mut candidates_per_leg = Vec::with_capacity(journey.legs.len());
        for leg in &journey.legs {
            let available = self.flights.available_seats(leg.flight_id).await?;
            let available_ids: Vec<Uuid> = available.iter().map(|s| s.id).collect();
            let unheld = self
                .reservations
                .filter_by_active_holds(leg.flight_id, &available_ids)
                .await;

            if (unheld.len() as u32) < request.passenger_count {
                return Err(AppError::InsufficientSeats(format!(
                    "flight {} has fewer than {} unheld available seats",
                    leg.flight_id, request.passenger_count
                )));
            }
            candidates_per_leg.push((leg.flight_id, unheld));
        }

        // Step 3: acquire holds leg by leg, in leg order; on conflict,
        // release everything acquired so far (spec.md §5 "leg holds are
        // acquired in leg order; releases may happen in any order").
        let mut acquired: Vec<(Uuid, Vec<Uuid>)> = Vec::with_capacity(candidates_per_leg.len());
        for (flight_id, unheld) in &candidates_per_leg {
            let picked: Vec<Uuid> = unheld
                .iter()
                .take(request.passenger_count as usize)
                .copied()
                .collect();

            let outcome = self
                .reservations
                .acquire_hold(*flight_id, &picked, None)
                .await;

            if outcome == HoldOutcome::Conflict {
                self.release_all(&acquired).await;
                return Err(AppError::SeatConflict(format!(
                    "could not acquire holds for flight {flight_id}"
                )));
            }
            acquired.push((*flight_id, picked));
        }

        // Step 4: single transaction — insert the booking row, then
        // transition the held seats to BOOKED on every leg.
        let booking_result = self.commit_booking(&journey, &request, &acquired).await;

        // Step 5 (or rollback path): holds are released either way — the
        // store is now the authority on success, and there is nothing left
        // to protect on failure.
        self.release_all(&acquired).await;

        booking_result
    }

    async fn commit_booking(
        &self,
        journey: &Journey,
        request: &CreateBookingRequest,
        acquired: &[(Uuid, Vec<Uuid>)],
    ) -> AppResult<BookingResponse> {
        let booking_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query!(
            r#"
            INSERT INTO bookings (id, user_id, journey_id, pax_count, status, payment_ref, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'CONFIRMED', ?, ?, ?)
            "#,
            booking_id,
            request.user_id,
            request.journey_id,
            request.passenger_count,
            request.payment_ref,
            now,
            now,
        )
        .execute(&mut *tx)
        .await?;

        let mut seat_assignments = Vec::with_capacity(acquired.len());
        for (flight_id, seat_ids) in acquired {
            let reserved = self
                .flights
                .reserve_seats_in_store(&mut tx, seat_ids, booking_id)
                .await?;
            seat_assignments.push(SeatAssignment {
                flight_id: *flight_id,
                seat_labels: reserved.into_iter().map(|s| s.label).collect(),
            });
        }

        tx.commit().await?;

        Ok(BookingResponse {
            id: booking_id,
            journey_id: journey.id,
            status: BookingStatus::Confirmed,
            passenger_count: request.passenger_count,
            payment_ref: request.payment_ref.clone(),
            seat_assignments,
            created_at: now,
            updated_at: now,
        })
    }

    async fn release_all(&self, acquired: &[(Uuid, Vec<Uuid>)]) {
        for (flight_id, seat_ids) in acquired {
            self.reservations.release_hold(*flight_id, seat_ids).await;
        }
    }

    /// Projection joining booking, journey, legs, and seat labels
    /// (spec.md §4.6 "GetBooking").
    pub async fn get_booking(&self, booking_id: Uuid) -> AppResult<Option<BookingResponse>> {
        let row = sqlx::query_as!(
            Booking,
            r#"
            SELECT
                id as "id: _", user_id as "user_id: _", journey_id as "journey_id: _",
                pax_count as "passenger_count: _", status as "status: _",
                payment_ref, created_at as "created_at: _", updated_at as "updated_at: _"
            FROM bookings WHERE id = ?
            "#,
            booking_id
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(booking) = row else {
            return Ok(None);
        };

        let Some(journey) = self.journeys.get_journey(booking.journey_id).await? else {
            return Ok(None);
        };

        let mut seat_assignments = Vec::with_capacity(journey.legs.len());
        for leg in &journey.legs {
            let seats = sqlx::query!(
                r#"SELECT label FROM seats WHERE flight_id = ? AND booking_id = ? ORDER BY label"#,
                leg.flight_id,
                booking_id,
            )
            .fetch_all(&self.pool)
            .await?;

            seat_assignments.push(SeatAssignment {
                flight_id: leg.flight_id,
                seat_labels: seats.into_iter().map(|r| r.label).collect(),
            });
        }

        Ok(Some(BookingResponse {
            id: booking.id,
            journey_id: booking.journey_id,
            status: booking.status,
            passenger_count: booking.passenger_count,
            payment_ref: booking.payment_ref,
            seat_assignments,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }))
    }
}
