//! Configuration loading for the MangaHub core.
//!
//! Settings are read from `conf/config.toml` when present. Missing tables or
//! keys fall back to defaults, and out-of-range values are clamped so the
//! coordinators always receive a usable configuration.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, save_config, serialize_config};
pub use models::{AppConfig, LogLevel};
