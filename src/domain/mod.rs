pub mod booking;
pub mod event;
pub mod flight;
pub mod journey;

pub use booking::*;
pub use event::*;
pub use flight::*;
pub use journey::*;
