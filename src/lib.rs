//! District-level population change map of Peru.
//!
//! A census table is joined onto district polygons, each district gets a
//! centroid marker sized and colored by its population change, and the
//! result is laid out as a single static SVG page.

pub mod config;
pub mod data;
pub mod error;
pub mod figure;
pub mod pipeline;
pub mod processing;
pub mod projection;
pub mod render;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::LoadError;
pub use figure::Figure;
pub use pipeline::{build_map, build_map_from};
