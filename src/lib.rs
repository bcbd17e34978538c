//! Offline Signal Temporal Logic monitoring of vehicle telemetry logs.
//!
//! A run loads a CSV log, synthesizes a bounded-recovery formula for every signal that has a
//! safe envelope, evaluates that formula together with a catalogue of named properties, and
//! merge-appends one verdict per timestamp to a JSON result file.
//!
//! ```no_run
//! use vigil::config::MonitorConfig;
//! use vigil::pipeline;
//!
//! let config = MonitorConfig::from_file("vigil.yaml")?.resolve()?;
//! let report = pipeline::run(&config);
//!
//! for failure in &report.failures {
//!     eprintln!("{}", failure);
//! }
//! # Ok::<(), vigil::config::ConfigError>(())
//! ```
//!
//! The temporal logic itself lives in the `vigil-core` and `vigil-parser` crates.

pub mod catalogue;
pub mod config;
pub mod context;
pub mod loader;
pub mod monitor;
pub mod orchestrator;
pub mod pipeline;
pub mod results;
pub mod schema;
pub mod store;
pub mod synthesis;
pub mod thresholds;

pub use crate::config::{MonitorConfig, RunConfig};
pub use crate::monitor::{Monitor, MonitorError, TimeSemantics};
pub use crate::pipeline::{run, RunReport};
pub use crate::results::{RobustnessRecord, Status};
