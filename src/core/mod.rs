// This module collects the building blocks shared by the sample pipeline and the coverage
// workflow: validated optimization levels, the pure source-to-destination path mapping,
// stage descriptions and the output tree layout, run configuration with toolchain
// discovery, the error taxonomy, and run statistics. None of it launches processes; the
// toolchain module owns that.

//! Core irstage infrastructure.
//!
//! # Key Components
//!
//! - `level` - optimization levels `0..=3`
//! - `mapping` - re-rooting a source path and appending a suffix
//! - `stage` - pipeline stages and the generated tree layout
//! - `config` - pipeline and coverage configuration, tool lookup
//! - `error` - `PipelineError` and `PipelineResult`
//! - `stats` - per-stage, per-level counts of a run

pub mod config;
pub mod error;
pub mod level;
pub mod mapping;
pub mod stage;
pub mod stats;
pub mod test_utils;

pub use config::{locate_tool, CoverageConfig, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use level::OptLevel;
pub use mapping::map_destination;
pub use stage::{Language, OutputLayout, StageKind};
pub use stats::RunStats;
