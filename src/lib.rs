//! Divtrack - Trading 212 dividend dashboard
//!
//! Fetches order and dividend history from a Trading 212 web session, caches
//! every upstream response on disk, enriches holdings with dividend yields
//! from Stock Bot and Finkio, and rolls everything up into JSON artifacts.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod paginate;
pub mod pipeline;
pub mod providers;
pub mod trading212;
pub mod utils;
