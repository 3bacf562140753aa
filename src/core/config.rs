//! Run configuration.
//!
//! Both runs take every filesystem location and tool path from an explicit
//! structure, so nothing depends on the process environment once a config
//! has been built.

use std::path::{Path, PathBuf};

use super::error::{PipelineError, PipelineResult};

/// Configuration of the staged sample pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// C front end, also used for lowering, assembling and linking.
    pub compiler_path: PathBuf,
    /// C++ front end.
    pub cxx_compiler_path: PathBuf,
    /// IR optimizer (`opt`).
    pub optimizer_path: PathBuf,
    /// Tree of `.c`/`.cpp` samples.
    pub source_root: PathBuf,
    /// Root of all generated trees. Deleted at the start of every run.
    pub output_root: PathBuf,
    pub c_standard: String,
    pub cxx_standard: String,
}

impl PipelineConfig {
    pub const DEFAULT_C_STANDARD: &'static str = "c17";
    pub const DEFAULT_CXX_STANDARD: &'static str = "c++20";

    /// Config with explicit tool paths; the C++ front end defaults to the C one.
    pub fn new(
        compiler_path: impl Into<PathBuf>,
        optimizer_path: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        let compiler_path = compiler_path.into();
        Self {
            cxx_compiler_path: compiler_path.clone(),
            compiler_path,
            optimizer_path: optimizer_path.into(),
            source_root: source_root.into(),
            output_root: output_root.into(),
            c_standard: Self::DEFAULT_C_STANDARD.to_string(),
            cxx_standard: Self::DEFAULT_CXX_STANDARD.to_string(),
        }
    }

    pub fn with_cxx_compiler(mut self, path: impl Into<PathBuf>) -> Self {
        self.cxx_compiler_path = path.into();
        self
    }

    pub fn with_standards(mut self, c: impl Into<String>, cxx: impl Into<String>) -> Self {
        self.c_standard = c.into();
        self.cxx_standard = cxx.into();
        self
    }

    /// Check that deleting the output root cannot take the sources with it.
    pub fn validate(&self) -> PipelineResult<()> {
        let source = absolute(&self.source_root)?;
        let output = absolute(&self.output_root)?;
        if source.starts_with(&output) {
            return Err(PipelineError::OverlappingRoots {
                source_root: self.source_root.clone(),
                output_root: self.output_root.clone(),
            });
        }
        Ok(())
    }
}

/// Configuration of the coverage workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageConfig {
    /// Build system driver, invoked as `<build_tool> --build <build_dir>`.
    pub build_tool: PathBuf,
    pub build_dir: PathBuf,
    /// Instrumented test binaries, run in order.
    pub binaries: Vec<PathBuf>,
    /// Sources the report is scoped to.
    pub source_dir: PathBuf,
    /// Parent of the per-binary report directories.
    pub report_root: PathBuf,
    pub profdata_path: PathBuf,
    pub cov_path: PathBuf,
}

/// Resolve a tool: an explicit path wins, then `<llvm_bin>/<name>`, then `PATH`.
pub fn locate_tool(
    explicit: Option<&Path>,
    llvm_bin: Option<&Path>,
    name: &str,
) -> PipelineResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(bin) = llvm_bin {
        let candidate = bin.join(name);
        if candidate.is_file() {
            log::debug!("Found {} at {}", name, candidate.display());
            return Ok(candidate);
        }
        return Err(PipelineError::ToolNotFound {
            name: name.to_string(),
            reason: format!("not present in {}", bin.display()),
        });
    }

    let found = which::which(name).map_err(|e| PipelineError::ToolNotFound {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    log::debug!("Found {} on PATH at {}", name, found.display());
    Ok(found)
}

fn absolute(path: &Path) -> PipelineResult<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|e| PipelineError::io(".", e))?;
    Ok(normalize(&cwd.join(path)))
}

/// Lexical normalization; the roots may not exist yet so `canonicalize` is out.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cxx_defaults_to_c_compiler() {
        let config = PipelineConfig::new("/llvm/bin/clang", "/llvm/bin/opt", "src", "out");
        assert_eq!(config.cxx_compiler_path, PathBuf::from("/llvm/bin/clang"));
        assert_eq!(config.c_standard, "c17");

        let config = config.with_cxx_compiler("/llvm/bin/clang++");
        assert_eq!(config.cxx_compiler_path, PathBuf::from("/llvm/bin/clang++"));
    }

    #[test]
    fn validate_rejects_output_containing_sources() {
        let config = PipelineConfig::new("clang", "opt", "/work/out/src", "/work/out");
        assert!(matches!(
            config.validate(),
            Err(PipelineError::OverlappingRoots { .. })
        ));

        let config = PipelineConfig::new("clang", "opt", "/work/src", "/work/src/../src");
        assert!(config.validate().is_err());

        let config = PipelineConfig::new("clang", "opt", "/work/src", "/work/out");
        assert!(config.validate().is_ok());

        // Generated trees may live inside the sample tree.
        let config = PipelineConfig::new("clang", "opt", "/work/src", "/work/src/generated");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_tool_path_wins() {
        let path = locate_tool(Some(Path::new("/opt/clang")), Some(Path::new("/nope")), "clang")
            .unwrap();
        assert_eq!(path, PathBuf::from("/opt/clang"));
    }

    #[test]
    fn missing_tool_in_llvm_bin() {
        let dir = std::env::temp_dir().join("irstage-no-such-llvm-bin");
        let err = locate_tool(None, Some(&dir), "llvm-cov").unwrap_err();
        assert!(matches!(err, PipelineError::ToolNotFound { .. }));
    }
}
