//! Coverage reports for instrumented test binaries.
//!
//! The project is rebuilt once, then every binary is run with
//! `LLVM_PROFILE_FILE` pointing next to it, its raw profile is merged into
//! indexed form and an HTML report is rendered into a fresh
//! `<report_root>/<binary name>` directory.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::{CoverageConfig, PipelineError, PipelineResult};
use crate::toolchain::{ReportRequest, ToolInvoker};

/// Files produced for one test binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageArtifacts {
    pub binary: PathBuf,
    pub raw_profile: PathBuf,
    pub profdata: PathBuf,
    pub report_dir: PathBuf,
}

impl CoverageArtifacts {
    /// Where the workflow puts everything for `binary`.
    pub fn for_binary(binary: &Path, report_root: &Path) -> PipelineResult<Self> {
        let name = binary
            .file_name()
            .ok_or_else(|| PipelineError::NoFileName {
                path: binary.to_path_buf(),
            })?;

        Ok(Self {
            binary: binary.to_path_buf(),
            raw_profile: with_appended(binary, ".profraw"),
            profdata: with_appended(binary, ".profdata"),
            report_dir: report_root.join(name),
        })
    }
}

fn with_appended(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// The coverage workflow bound to a configuration and a toolchain.
pub struct CoverageRun<I: ToolInvoker> {
    config: CoverageConfig,
    invoker: I,
}

impl<I: ToolInvoker> CoverageRun<I> {
    pub fn new(config: CoverageConfig, invoker: I) -> Self {
        Self { config, invoker }
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Build, then collect and render coverage for every configured binary.
    pub fn run(&mut self) -> PipelineResult<Vec<CoverageArtifacts>> {
        log::info!("Building {}", self.config.build_dir.display());
        self.invoker.build(&self.config.build_dir)?.check()?;

        let binaries = self.config.binaries.clone();
        let mut reports = Vec::with_capacity(binaries.len());
        for binary in &binaries {
            reports.push(self.report(binary)?);
        }
        Ok(reports)
    }

    fn report(&mut self, binary: &Path) -> PipelineResult<CoverageArtifacts> {
        let artifacts = CoverageArtifacts::for_binary(binary, &self.config.report_root)?;

        log::info!("Collecting coverage for {}", binary.display());
        self.invoker
            .run_instrumented(binary, &artifacts.raw_profile)?
            .check()?;
        self.invoker
            .profile_merge(&artifacts.raw_profile, &artifacts.profdata)?
            .check()?;

        recreate_dir(&artifacts.report_dir)?;
        self.invoker
            .render_report(&ReportRequest {
                binary: binary.to_path_buf(),
                profdata: artifacts.profdata.clone(),
                output_dir: artifacts.report_dir.clone(),
                source_dir: self.config.source_dir.clone(),
            })?
            .check()?;

        log::info!("Report written to {}", artifacts.report_dir.display());
        Ok(artifacts)
    }
}

fn recreate_dir(dir: &Path) -> PipelineResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(PipelineError::io(dir, e)),
    }
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
}
