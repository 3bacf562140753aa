//! A toolchain that records calls instead of launching processes.
//!
//! Each operation writes a small deterministic file at its destination (the
//! operation name followed by the input's bytes), so later stages find
//! inputs exactly where the real tools would have left them.

use std::fs;
use std::path::{Path, PathBuf};

use super::{ReportRequest, ToolInvoker, ToolOutput};
use crate::core::{Language, OptLevel, PipelineError, PipelineResult};

/// One recorded toolchain call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Compile {
        language: Language,
        source: PathBuf,
        dest: PathBuf,
        level: OptLevel,
    },
    Optimize {
        source: PathBuf,
        dest: PathBuf,
        level: OptLevel,
    },
    Lower {
        source: PathBuf,
        dest: PathBuf,
        level: OptLevel,
    },
    Assemble {
        source: PathBuf,
        dest: PathBuf,
    },
    Link {
        source: PathBuf,
        dest: PathBuf,
    },
    Build {
        build_dir: PathBuf,
    },
    RunInstrumented {
        binary: PathBuf,
        profile: PathBuf,
    },
    ProfileMerge {
        raw: PathBuf,
        dest: PathBuf,
    },
    RenderReport(ReportRequest),
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Compile { .. } => "compile",
            ToolCall::Optimize { .. } => "optimize",
            ToolCall::Lower { .. } => "lower",
            ToolCall::Assemble { .. } => "assemble",
            ToolCall::Link { .. } => "link",
            ToolCall::Build { .. } => "build",
            ToolCall::RunInstrumented { .. } => "run-instrumented",
            ToolCall::ProfileMerge { .. } => "profile-merge",
            ToolCall::RenderReport(_) => "render-report",
        }
    }

    /// The file the call writes, if it writes one.
    pub fn dest(&self) -> Option<&Path> {
        match self {
            ToolCall::Compile { dest, .. }
            | ToolCall::Optimize { dest, .. }
            | ToolCall::Lower { dest, .. }
            | ToolCall::Assemble { dest, .. }
            | ToolCall::Link { dest, .. }
            | ToolCall::ProfileMerge { dest, .. } => Some(dest.as_path()),
            ToolCall::RunInstrumented { profile, .. } => Some(profile.as_path()),
            ToolCall::Build { .. } | ToolCall::RenderReport(_) => None,
        }
    }

    fn source(&self) -> Option<&Path> {
        match self {
            ToolCall::Compile { source, .. }
            | ToolCall::Optimize { source, .. }
            | ToolCall::Lower { source, .. }
            | ToolCall::Assemble { source, .. }
            | ToolCall::Link { source, .. } => Some(source.as_path()),
            ToolCall::ProfileMerge { raw, .. } => Some(raw.as_path()),
            ToolCall::Build { .. } | ToolCall::RunInstrumented { .. } | ToolCall::RenderReport(_) => {
                None
            }
        }
    }
}

type FailurePredicate = Box<dyn Fn(&ToolCall) -> bool>;

/// Test double for [`ToolInvoker`].
#[derive(Default)]
pub struct RecordingToolchain {
    calls: Vec<ToolCall>,
    fail_when: Option<FailurePredicate>,
}

impl RecordingToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report exit code 1 for every call matching `predicate`.
    pub fn fail_when(mut self, predicate: impl Fn(&ToolCall) -> bool + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> &[ToolCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls)
    }

    fn record(&mut self, call: ToolCall) -> PipelineResult<ToolOutput> {
        let name = call.name();
        let failed = self.fail_when.as_ref().is_some_and(|p| p(&call));

        if failed {
            self.calls.push(call);
            return Ok(ToolOutput {
                tool: name.to_string(),
                status: Some(1),
                stdout: Vec::new(),
                stderr: format!("{name}: simulated failure").into_bytes(),
            });
        }

        if let Some(dest) = call.dest() {
            let mut contents = format!("{name}\n").into_bytes();
            if let Some(source) = call.source() {
                contents.extend(fs::read(source).map_err(|e| PipelineError::io(source, e))?);
            }
            fs::write(dest, contents).map_err(|e| PipelineError::io(dest, e))?;
        }
        if let ToolCall::RenderReport(request) = &call {
            let index = request.output_dir.join("index.html");
            fs::write(&index, "<html></html>\n").map_err(|e| PipelineError::io(&index, e))?;
        }

        self.calls.push(call);
        Ok(ToolOutput::success(name))
    }
}

impl std::fmt::Debug for RecordingToolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingToolchain")
            .field("calls", &self.calls)
            .field("fails", &self.fail_when.is_some())
            .finish()
    }
}

impl ToolInvoker for RecordingToolchain {
    fn compile(
        &mut self,
        language: Language,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::Compile {
            language,
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            level,
        })
    }

    fn optimize(
        &mut self,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::Optimize {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            level,
        })
    }

    fn lower(&mut self, source: &Path, dest: &Path, level: OptLevel) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::Lower {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            level,
        })
    }

    fn assemble(&mut self, source: &Path, dest: &Path) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::Assemble {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
        })
    }

    fn link(&mut self, source: &Path, dest: &Path) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::Link {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
        })
    }

    fn build(&mut self, build_dir: &Path) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::Build {
            build_dir: build_dir.to_path_buf(),
        })
    }

    fn run_instrumented(&mut self, binary: &Path, profile: &Path) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::RunInstrumented {
            binary: binary.to_path_buf(),
            profile: profile.to_path_buf(),
        })
    }

    fn profile_merge(&mut self, raw: &Path, dest: &Path) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::ProfileMerge {
            raw: raw.to_path_buf(),
            dest: dest.to_path_buf(),
        })
    }

    fn render_report(&mut self, request: &ReportRequest) -> PipelineResult<ToolOutput> {
        self.record(ToolCall::RenderReport(request.clone()))
    }
}
