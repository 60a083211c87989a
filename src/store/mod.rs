pub mod flight_registry;
pub mod journey_store;

pub use flight_registry::FlightRegistry;
pub use journey_store::JourneyStore;
