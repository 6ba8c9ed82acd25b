pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpCalendar, HttpMirror, InMemoryMirror, JsonFileCalendar, LocationTable};
pub use config::{AppConfig, CacheConfig, MirrorConfig};
pub use core::{cache::CalculationCache, engine::ChartService};
pub use utils::error::{BaziError, Result};
