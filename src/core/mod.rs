pub mod cache;
pub mod chart;
pub mod elements;
pub mod engine;
pub mod scoring;
pub mod solar_time;
pub mod ten_gods;

pub use crate::domain::model::{BirthInput, FourPillarsChart};
pub use crate::domain::ports::{CacheMirror, CalendarProvider, Clock, LocationResolver};
pub use crate::utils::error::Result;
