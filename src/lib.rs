//! Mission engine for a turn-based survival simulation.
//!
//! The host owns creatures, items and the map; this crate owns mission
//! templates and instances and reacts to the events the host reports.

pub mod config;
pub mod error;
pub mod mission;
pub mod sandbox;

pub use config::MissionConfig;
pub use error::{MissionError, Result};
