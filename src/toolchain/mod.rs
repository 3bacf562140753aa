// This module is the seam between irstage and the external LLVM toolchain. ToolInvoker
// has one method per logical operation the pipeline and the coverage workflow need
// (front-end compile, opt, lowering, assembling, linking, building the test binaries,
// running them instrumented, merging profiles and rendering reports). Implementations
// report a structured ToolOutput instead of failing on a non-zero exit, and callers decide
// what a failure means through ToolOutput::check. LlvmToolchain runs real processes;
// RecordingToolchain records calls and fabricates outputs for tests.

//! External toolchain interface.
//!
//! # Implementations
//!
//! - [`LlvmToolchain`] - launches clang, opt, llvm-profdata and llvm-cov
//! - [`RecordingToolchain`] - records calls and writes placeholder outputs

pub mod llvm;
pub mod recording;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::{Language, OptLevel, PipelineError, PipelineResult};

pub use llvm::LlvmToolchain;
pub use recording::{RecordingToolchain, ToolCall};

/// Captured result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Human-readable name of the invocation, used in error messages.
    pub tool: String,
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// A successful output with nothing captured.
    pub fn success(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: Some(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into [`PipelineError::ToolFailed`].
    pub fn check(self) -> PipelineResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let status = match self.status {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = String::from_utf8_lossy(&self.stderr);
        let diagnostics = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&self.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };

        Err(PipelineError::ToolFailed {
            tool: self.tool,
            status,
            diagnostics,
        })
    }
}

/// A fully specified process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Arguments as lossy strings, convenient for assertions and logging.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key.to_string_lossy(), value.to_string_lossy())?;
        }
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Parameters of a coverage report rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub binary: PathBuf,
    pub profdata: PathBuf,
    pub output_dir: PathBuf,
    pub source_dir: PathBuf,
}

/// Capability interface over the external toolchain.
///
/// `Err` means the tool could not be run at all; a tool that ran and failed
/// is reported through [`ToolOutput::status`].
pub trait ToolInvoker {
    /// Emit textual IR for a C or C++ source file.
    fn compile(
        &mut self,
        language: Language,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<ToolOutput>;

    /// Run the optimizer's default pass pipeline for `level`.
    fn optimize(&mut self, source: &Path, dest: &Path, level: OptLevel)
        -> PipelineResult<ToolOutput>;

    /// Lower IR to target assembly.
    fn lower(&mut self, source: &Path, dest: &Path, level: OptLevel) -> PipelineResult<ToolOutput>;

    /// Assemble to a position-independent relocatable object.
    fn assemble(&mut self, source: &Path, dest: &Path) -> PipelineResult<ToolOutput>;

    /// Link an object into an executable.
    fn link(&mut self, source: &Path, dest: &Path) -> PipelineResult<ToolOutput>;

    /// (Re)build the project in `build_dir`.
    fn build(&mut self, build_dir: &Path) -> PipelineResult<ToolOutput>;

    /// Run an instrumented binary, writing raw profile data to `profile`.
    fn run_instrumented(&mut self, binary: &Path, profile: &Path) -> PipelineResult<ToolOutput>;

    /// Merge raw profile data into indexed profile data.
    fn profile_merge(&mut self, raw: &Path, dest: &Path) -> PipelineResult<ToolOutput>;

    /// Render an HTML coverage report.
    fn render_report(&mut self, request: &ReportRequest) -> PipelineResult<ToolOutput>;
}
