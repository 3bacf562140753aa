// This module drives the staged sample build. Pipeline::run deletes the output root and
// then pushes every sample through the stages in order: front-end compile for C and C++
// sources, opt, lowering to assembly, assembling to position-independent objects and
// linking executables. Each stage is one transform_files call whose transformer invokes a
// single ToolInvoker operation and checks its exit status, so the first failing tool
// aborts the whole run. The stage trees come from OutputLayout and statistics from
// RunStats.

//! Staged transformation pipeline.
//!
//! ```text
//! sources ──compile──▶ ir-unoptimized ──opt──▶ ir ──lower──▶ asm ──assemble──▶ obj ──link──▶ programs
//! ```
//!
//! Each arrow runs once per optimization level and mirrors its input tree.

pub mod transform;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::{
    Language, OptLevel, OutputLayout, PipelineConfig, PipelineError, PipelineResult, RunStats,
    StageKind,
};
use crate::toolchain::{ToolInvoker, ToolOutput};

pub use transform::transform_files;

/// The sample pipeline bound to a configuration and a toolchain.
pub struct Pipeline<I: ToolInvoker> {
    config: PipelineConfig,
    layout: OutputLayout,
    invoker: I,
    stats: RunStats,
}

impl<I: ToolInvoker> Pipeline<I> {
    pub fn new(config: PipelineConfig, invoker: I) -> Self {
        let layout = OutputLayout::new(&config.output_root);
        Self {
            config,
            layout,
            invoker,
            stats: RunStats::default(),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub fn into_invoker(self) -> I {
        self.invoker
    }

    /// Regenerate every output tree from scratch.
    pub fn run(&mut self) -> PipelineResult<RunStats> {
        self.config.validate()?;
        self.stats = RunStats::default();

        self.reset_output()?;
        self.emit_ir()?;
        self.emit_asm()?;
        self.emit_objects()?;
        self.emit_programs()?;

        log::info!(
            "Pipeline finished: {} tool invocations under {}",
            self.stats.tool_invocations,
            self.layout.root().display()
        );
        Ok(self.stats.clone())
    }

    fn reset_output(&self) -> PipelineResult<()> {
        let root = self.layout.root();
        match fs::remove_dir_all(root) {
            Ok(()) => {
                log::debug!("Removed {}", root.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::io(root, e)),
        }
    }

    /// Compile C and C++ sources to IR, then optimize it at every level.
    pub fn emit_ir(&mut self) -> PipelineResult<()> {
        let source_root = self.config.source_root.clone();

        for (stage, language) in [
            (StageKind::CompileC, Language::C),
            (StageKind::CompileCxx, Language::Cxx),
        ] {
            let layout = self.layout.clone();
            self.run_stage(
                stage,
                |_| source_root.clone(),
                |l| layout.unoptimized_ir(l),
                |invoker, src, dst, level| invoker.compile(language, src, dst, level),
            )?;
        }

        let layout = self.layout.clone();
        self.run_stage(
            StageKind::Optimize,
            |l| layout.unoptimized_ir(l),
            |l| layout.ir(l),
            |invoker, src, dst, level| invoker.optimize(src, dst, level),
        )
    }

    pub fn emit_asm(&mut self) -> PipelineResult<()> {
        let layout = self.layout.clone();
        self.run_stage(
            StageKind::Lower,
            |l| layout.ir(l),
            |l| layout.asm(l),
            |invoker, src, dst, level| invoker.lower(src, dst, level),
        )
    }

    pub fn emit_objects(&mut self) -> PipelineResult<()> {
        let layout = self.layout.clone();
        self.run_stage(
            StageKind::Assemble,
            |l| layout.asm(l),
            |l| layout.obj(l),
            |invoker, src, dst, _| invoker.assemble(src, dst),
        )
    }

    pub fn emit_programs(&mut self) -> PipelineResult<()> {
        let layout = self.layout.clone();
        self.run_stage(
            StageKind::Link,
            |l| layout.obj(l),
            |l| layout.programs(l),
            |invoker, src, dst, _| {
                let output = invoker.link(src, dst)?;
                if output.is_success() {
                    mark_executable(dst)?;
                }
                Ok(output)
            },
        )
    }

    fn run_stage<S, D, F>(
        &mut self,
        stage: StageKind,
        source_root: S,
        dest_root: D,
        mut invoke: F,
    ) -> PipelineResult<()>
    where
        S: Fn(OptLevel) -> PathBuf,
        D: Fn(OptLevel) -> PathBuf,
        F: FnMut(&mut I, &Path, &Path, OptLevel) -> PipelineResult<ToolOutput>,
    {
        log::info!("Running stage {}", stage);

        let invoker = &mut self.invoker;
        let stats = &mut self.stats;
        let count = transform_files(
            source_root,
            stage.source_filter(),
            dest_root,
            stage.dest_suffix(),
            |src, dst, level| {
                invoke(&mut *invoker, src, dst, level)?.check()?;
                stats.record_file(stage, level);
                Ok(())
            },
        )?;

        log::debug!("Stage {} transformed {} files", stage, count);
        Ok(())
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> PipelineResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .map_err(|e| PipelineError::io(path, e))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(|e| PipelineError::io(path, e))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> PipelineResult<()> {
    Ok(())
}
