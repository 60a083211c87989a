pub mod booking_route;
pub mod flight_route;
pub mod search_route;

/// Shared application state every route handler reads from via Rocket's
/// managed state. Thin by design: the HTTP layer itself is an external
/// collaborator per spec.md §1/§2, included here only to demonstrate the
/// external interface of spec.md §6.
pub struct AppState {
    pub flights: crate::store::FlightRegistry,
    pub search: crate::search::SearchEngine,
    pub booking: crate::booking::BookingEngine,
    pub bus: crate::bus::EventBusAdapter,
}
