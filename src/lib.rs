//! irstage - staged LLVM sample builds and coverage reports.
//!
//! irstage drives an external LLVM toolchain over a tree of C/C++ samples:
//! every file is compiled to textual IR, optimized, lowered to assembly,
//! assembled and linked, once per optimization level, with each stage
//! mirroring its input tree into a tree of its own. The same toolchain seam
//! drives the coverage workflow for instrumented test binaries.
//!
//! # Primary Usage
//!
//! ```no_run
//! use irstage::core::PipelineConfig;
//! use irstage::pipeline::Pipeline;
//! use irstage::toolchain::LlvmToolchain;
//!
//! let config = PipelineConfig::new("clang", "opt", "ir_samples/src", "ir_samples/generated");
//! let toolchain = LlvmToolchain::for_pipeline(&config);
//! let stats = Pipeline::new(config, toolchain).run()?;
//! println!("{stats}");
//! # Ok::<(), irstage::PipelineError>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - levels, path mapping, layout, configuration, errors
//! - [`toolchain`] - the [`ToolInvoker`] interface and its implementations
//! - [`pipeline`] - `transform_files` and the staged run
//! - [`coverage`] - build, instrumented run, profile merge, HTML report

pub mod core;
pub mod coverage;
pub mod pipeline;
pub mod toolchain;

pub use crate::core::{
    map_destination, CoverageConfig, Language, OptLevel, OutputLayout, PipelineConfig,
    PipelineError, PipelineResult, RunStats, StageKind,
};
pub use coverage::{CoverageArtifacts, CoverageRun};
pub use pipeline::{transform_files, Pipeline};
pub use toolchain::{LlvmToolchain, RecordingToolchain, ToolCall, ToolInvoker, ToolOutput};
