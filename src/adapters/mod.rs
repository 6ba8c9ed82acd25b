// Adapters layer: concrete implementations of the domain ports (calendar, locations, cache mirror).

pub mod calendar;
pub mod location;
pub mod mirror;

pub use calendar::{HttpCalendar, JsonFileCalendar};
pub use location::LocationTable;
pub use mirror::{HttpMirror, InMemoryMirror};
