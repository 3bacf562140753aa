//! Process-backed toolchain.
//!
//! Every operation is split into a pure command builder (`*_command`) and
//! [`LlvmToolchain::execute`], so argument lists can be checked without
//! launching anything.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{Invocation, ReportRequest, ToolInvoker, ToolOutput};
use crate::core::{CoverageConfig, Language, OptLevel, PipelineConfig, PipelineError, PipelineResult};

/// Environment variable the LLVM profiling runtime writes raw profiles to.
pub const PROFILE_FILE_ENV: &str = "LLVM_PROFILE_FILE";

/// Paths of every binary the toolchain may launch.
///
/// A toolchain built for one workflow leaves the other workflow's tools
/// unset; commands that need an unset tool fail with
/// [`PipelineError::ToolNotFound`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub opt: Option<PathBuf>,
    pub profdata: Option<PathBuf>,
    pub cov: Option<PathBuf>,
    pub build_tool: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LlvmToolchain {
    tools: ToolPaths,
    c_standard: String,
    cxx_standard: String,
}

impl LlvmToolchain {
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            c_standard: PipelineConfig::DEFAULT_C_STANDARD.to_string(),
            cxx_standard: PipelineConfig::DEFAULT_CXX_STANDARD.to_string(),
        }
    }

    /// Toolchain for the sample pipeline. Coverage tools are left unset.
    pub fn for_pipeline(config: &PipelineConfig) -> Self {
        Self {
            tools: ToolPaths {
                cc: Some(config.compiler_path.clone()),
                cxx: Some(config.cxx_compiler_path.clone()),
                opt: Some(config.optimizer_path.clone()),
                ..ToolPaths::default()
            },
            c_standard: config.c_standard.clone(),
            cxx_standard: config.cxx_standard.clone(),
        }
    }

    /// Toolchain for the coverage workflow. Compilers are left unset.
    pub fn for_coverage(config: &CoverageConfig) -> Self {
        Self::new(ToolPaths {
            profdata: Some(config.profdata_path.clone()),
            cov: Some(config.cov_path.clone()),
            build_tool: Some(config.build_tool.clone()),
            ..ToolPaths::default()
        })
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    pub fn compile_command(
        &self,
        language: Language,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<Invocation> {
        let (program, standard) = match language {
            Language::C => (configured(&self.tools.cc, "cc")?, &self.c_standard),
            Language::Cxx => (configured(&self.tools.cxx, "cxx")?, &self.cxx_standard),
        };
        Ok(Invocation::new(program)
            .arg(format!("-std={standard}"))
            .arg(level.flag())
            .arg("-DNDEBUG")
            .arg("-emit-llvm")
            .arg("-S")
            .arg(source)
            .arg("-o")
            .arg(dest))
    }

    pub fn optimize_command(
        &self,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<Invocation> {
        Ok(Invocation::new(configured(&self.tools.opt, "opt")?)
            .arg(level.flag())
            .arg("-S")
            .arg(source)
            .arg("-o")
            .arg(dest))
    }

    pub fn lower_command(
        &self,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<Invocation> {
        Ok(Invocation::new(configured(&self.tools.cc, "cc")?)
            .arg(level.flag())
            .arg("-S")
            .arg(source)
            .arg("-o")
            .arg(dest))
    }

    pub fn assemble_command(&self, source: &Path, dest: &Path) -> PipelineResult<Invocation> {
        Ok(Invocation::new(configured(&self.tools.cc, "cc")?)
            .arg("-fPIC")
            .arg("-c")
            .arg(source)
            .arg("-o")
            .arg(dest))
    }

    pub fn link_command(&self, source: &Path, dest: &Path) -> PipelineResult<Invocation> {
        Ok(Invocation::new(configured(&self.tools.cc, "cc")?)
            .arg("-fPIC")
            .arg(source)
            .arg("-o")
            .arg(dest))
    }

    pub fn build_command(&self, build_dir: &Path) -> PipelineResult<Invocation> {
        Ok(Invocation::new(configured(&self.tools.build_tool, "build tool")?)
            .arg("--build")
            .arg(build_dir))
    }

    pub fn run_instrumented_command(&self, binary: &Path, profile: &Path) -> Invocation {
        Invocation::new(binary).env(PROFILE_FILE_ENV, profile)
    }

    pub fn profile_merge_command(&self, raw: &Path, dest: &Path) -> PipelineResult<Invocation> {
        Ok(Invocation::new(configured(&self.tools.profdata, "llvm-profdata")?)
            .arg("merge")
            .arg("-sparse")
            .arg(raw)
            .arg("-o")
            .arg(dest))
    }

    pub fn render_report_command(&self, request: &ReportRequest) -> PipelineResult<Invocation> {
        let mut profile_flag = OsString::from("-instr-profile=");
        profile_flag.push(&request.profdata);

        Ok(Invocation::new(configured(&self.tools.cov, "llvm-cov")?)
            .arg("show")
            .arg(&request.binary)
            .arg(profile_flag)
            .arg("-output-dir")
            .arg(&request.output_dir)
            .arg("-format=html")
            .arg("--show-branch-summary")
            .arg("--show-instantiation-summary")
            .arg("--show-mcdc-summary")
            .arg("--show-region-summary")
            .arg(&request.source_dir))
    }

    /// Launch `invocation`, wait for it and capture its output.
    pub fn execute(&self, invocation: &Invocation) -> PipelineResult<ToolOutput> {
        log::debug!("Running: {}", invocation);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .output()
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        if !output.stderr.is_empty() {
            log::trace!(
                "{} stderr: {}",
                invocation.program.display(),
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }

        Ok(ToolOutput {
            tool: invocation.to_string(),
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

fn configured<'a>(path: &'a Option<PathBuf>, name: &str) -> PipelineResult<&'a Path> {
    path.as_deref().ok_or_else(|| PipelineError::ToolNotFound {
        name: name.to_string(),
        reason: "not configured for this workflow".to_string(),
    })
}

impl ToolInvoker for LlvmToolchain {
    fn compile(
        &mut self,
        language: Language,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<ToolOutput> {
        self.execute(&self.compile_command(language, source, dest, level)?)
    }

    fn optimize(
        &mut self,
        source: &Path,
        dest: &Path,
        level: OptLevel,
    ) -> PipelineResult<ToolOutput> {
        self.execute(&self.optimize_command(source, dest, level)?)
    }

    fn lower(&mut self, source: &Path, dest: &Path, level: OptLevel) -> PipelineResult<ToolOutput> {
        self.execute(&self.lower_command(source, dest, level)?)
    }

    fn assemble(&mut self, source: &Path, dest: &Path) -> PipelineResult<ToolOutput> {
        self.execute(&self.assemble_command(source, dest)?)
    }

    fn link(&mut self, source: &Path, dest: &Path) -> PipelineResult<ToolOutput> {
        self.execute(&self.link_command(source, dest)?)
    }

    fn build(&mut self, build_dir: &Path) -> PipelineResult<ToolOutput> {
        self.execute(&self.build_command(build_dir)?)
    }

    fn run_instrumented(&mut self, binary: &Path, profile: &Path) -> PipelineResult<ToolOutput> {
        self.execute(&self.run_instrumented_command(binary, profile))
    }

    fn profile_merge(&mut self, raw: &Path, dest: &Path) -> PipelineResult<ToolOutput> {
        self.execute(&self.profile_merge_command(raw, dest)?)
    }

    fn render_report(&mut self, request: &ReportRequest) -> PipelineResult<ToolOutput> {
        self.execute(&self.render_report_command(request)?)
    }
}
