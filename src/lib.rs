//! Build RDF Data Cube graphs from statistical tables.
//!
//! A run loads the source tables, resolves low-level geographic codes to
//! their parents through code maps, declares one concept resource per
//! distinct dimension value and emits a `qb:Observation` per group (counted)
//! or per row (copied). The result is written as Turtle.

pub mod config;
pub mod cube;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod table;
pub mod vocab;

pub use config::{CliArgs, CubeConfig};
pub use cube::{CubeDefinition, CubeGraph, CubeKind};
pub use error::{CubeError, CubeResult, ErrorCode, error_code_of};
pub use logging::{LoggingConfig, init_logging};
pub use pipeline::{BuildReport, run};
