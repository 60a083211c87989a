use airline_core::booking::BookingEngine;
use airline_core::domain::booking::{BookingStatus, CreateBookingRequest};
use airline_core::domain::flight::CreateFlightInput;
use airline_core::domain::journey::{Journey, JourneyStatus, Leg};
use airline_core::error::AppError;
use airline_core::reservation::SeatReservationLayer;
use airline_core::store::{FlightRegistry, JourneyStore};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use ctor::dtor;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use std::time::Duration as StdDuration;
use test_context::{test_context, AsyncTestContext};
use uuid::Uuid;

mod common {
    pub mod redis_utils;
    pub mod test_utils;
}
use common::redis_utils;
use common::test_utils::TestDb;

struct BookingContext {
    flights: FlightRegistry,
    journeys: JourneyStore,
    booking: BookingEngine,
}

#[dtor]
fn cleanup() {
    if let Err(e) = TestDb::cleanup_database_sync() {
        eprintln!("failed to cleanup test database: {e}");
    }
}

#[async_trait]
impl AsyncTestContext for BookingContext {
    async fn setup() -> Self {
        let pool: Pool = TestDb::get_instance(file!())
            .await
            .expect("failed to get test database instance");
        let cache_conn = redis_utils::connection_manager().await;

        let flights = FlightRegistry::new(pool.clone());
        let journeys = JourneyStore::new(pool.clone());
        let reservations = SeatReservationLayer::new(cache_conn, StdDuration::from_secs(30));
        let booking = BookingEngine::new(flights.clone(), journeys.clone(), reservations, pool);

        BookingContext {
            flights,
            journeys,
            booking,
        }
    }
}

fn flight_input(
    src: &str,
    dst: &str,
    day_offset: i64,
    hour_dep: u32,
    total_seats: u32,
) -> CreateFlightInput {
    let departure = Utc::now() + Duration::days(day_offset) + Duration::hours(hour_dep as i64);
    CreateFlightInput {
        src: src.into(),
        dst: dst.into(),
        departure,
        arrival: departure + Duration::hours(2),
        aircraft_ref: format!("AC-{src}-{dst}-{day_offset}-{hour_dep}"),
        price: Decimal::new(4000, 0),
        total_seats,
    }
}

fn single_leg_journey(src: &str, dst: &str, flight_id: Uuid, price: Decimal) -> Journey {
    let now = Utc::now();
    Journey {
        id: Uuid::new_v4(),
        legs: vec![Leg {
            flight_id,
            order: 1,
        }],
        src: src.into(),
        dst: dst.into(),
        departure: now,
        arrival: now + Duration::hours(2),
        total_price: price,
        status: JourneyStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

fn booking_request(journey_id: Uuid, passenger_count: u32) -> CreateBookingRequest {
    CreateBookingRequest {
        journey_id,
        passenger_count,
        payment_ref: format!("pay-{}", Uuid::new_v4()),
        user_id: Uuid::new_v4(),
    }
}

/// S5 — ten concurrent single-seat requests against a one-seat flight:
/// exactly one must be confirmed, the rest must fail on seat scarcity.
#[test_context(BookingContext)]
#[tokio::test]
async fn only_one_of_ten_concurrent_bookings_succeeds_on_single_seat(ctx: &mut BookingContext) {
    let flight = ctx
        .flights
        .create_flight(flight_input("DEL", "BOM", 20, 8, 1))
        .await
        .unwrap();
    let journey = single_leg_journey("DEL", "BOM", flight.id, Decimal::new(4000, 0));
    let journey = ctx.journeys.save_journey(&journey).await.unwrap();

    let mut handles = Vec::with_capacity(10);
    for _ in 0..10 {
        let booking = ctx.booking.clone();
        let request = booking_request(journey.id, 1);
        handles.push(tokio::spawn(async move { booking.create_booking(request).await }));
    }

    let mut succeeded = 0;
    let mut failed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(resp) => {
                assert_eq!(resp.status, BookingStatus::Confirmed);
                succeeded += 1;
            }
            Err(AppError::SeatConflict(_)) | Err(AppError::InsufficientSeats(_)) => failed += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(failed, 9);
}

/// S6 — multi-leg atomicity: a journey whose second leg has fewer seats
/// than requested must fail entirely, leaving the first leg's seat
/// untouched and no holds behind.
#[test_context(BookingContext)]
#[tokio::test]
async fn insufficient_seats_on_one_leg_fails_the_whole_booking(ctx: &mut BookingContext) {
    let leg1 = ctx
        .flights
        .create_flight(flight_input("DEL", "BOM", 21, 8, 2))
        .await
        .unwrap();
    let leg2 = ctx
        .flights
        .create_flight(flight_input("BOM", "MAA", 21, 12, 1))
        .await
        .unwrap();

    let now = Utc::now();
    let journey = Journey {
        id: Uuid::new_v4(),
        legs: vec![
            Leg {
                flight_id: leg1.id,
                order: 1,
            },
            Leg {
                flight_id: leg2.id,
                order: 2,
            },
        ],
        src: "DEL".into(),
        dst: "MAA".into(),
        departure: now,
        arrival: now + Duration::hours(6),
        total_price: Decimal::new(8000, 0),
        status: JourneyStatus::Active,
        created_at: now,
        updated_at: now,
    };
    let journey = ctx.journeys.save_journey(&journey).await.unwrap();

    let err = ctx
        .booking
        .create_booking(booking_request(journey.id, 2))
        .await
        .expect_err("leg2 only has one seat, request wants two");
    assert!(matches!(err, AppError::InsufficientSeats(_)));

    // leg2's single seat must still be AVAILABLE: the shortfall was caught
    // before any hold was acquired on either leg.
    let leg2_seats = ctx.flights.available_seats(leg2.id).await.unwrap();
    assert_eq!(leg2_seats.len(), 1);

    let leg1_seats = ctx.flights.available_seats(leg1.id).await.unwrap();
    assert_eq!(leg1_seats.len(), 2);
}

/// Booking against a disabled journey must be rejected as not found rather
/// than silently succeeding against stale availability.
#[test_context(BookingContext)]
#[tokio::test]
async fn booking_a_disabled_journey_is_rejected(ctx: &mut BookingContext) {
    let flight = ctx
        .flights
        .create_flight(flight_input("DEL", "BOM", 22, 8, 4))
        .await
        .unwrap();
    let mut journey = single_leg_journey("DEL", "BOM", flight.id, Decimal::new(4000, 0));
    journey.status = JourneyStatus::Disabled;
    let journey = ctx.journeys.save_journey(&journey).await.unwrap();

    let err = ctx
        .booking
        .create_booking(booking_request(journey.id, 1))
        .await
        .expect_err("disabled journey must not be bookable");
    assert!(matches!(err, AppError::JourneyNotFound(_)));
}

/// GetBooking returns the seat labels actually assigned by CreateBooking.
#[test_context(BookingContext)]
#[tokio::test]
async fn get_booking_reflects_assigned_seats(ctx: &mut BookingContext) {
    let flight = ctx
        .flights
        .create_flight(flight_input("DEL", "BOM", 23, 8, 6))
        .await
        .unwrap();
    let journey = single_leg_journey("DEL", "BOM", flight.id, Decimal::new(4000, 0));
    let journey = ctx.journeys.save_journey(&journey).await.unwrap();

    let created = ctx
        .booking
        .create_booking(booking_request(journey.id, 2))
        .await
        .unwrap();

    let fetched = ctx
        .booking
        .get_booking(created.id)
        .await
        .unwrap()
        .expect("booking must be retrievable");

    assert_eq!(fetched.status, BookingStatus::Confirmed);
    assert_eq!(fetched.seat_assignments.len(), 1);
    assert_eq!(fetched.seat_assignments[0].seat_labels.len(), 2);
}
