//! The stages of the sample pipeline and the output trees they write.

use std::fmt;
use std::path::{Path, PathBuf};

use super::level::OptLevel;

/// Source language accepted by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cxx,
}

/// One step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    CompileC,
    CompileCxx,
    Optimize,
    Lower,
    Assemble,
    Link,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::CompileC,
        StageKind::CompileCxx,
        StageKind::Optimize,
        StageKind::Lower,
        StageKind::Assemble,
        StageKind::Link,
    ];

    /// Glob matched against file names in the stage's input tree.
    pub fn source_filter(self) -> &'static str {
        match self {
            StageKind::CompileC => "*.c",
            StageKind::CompileCxx => "*.cpp",
            StageKind::Optimize | StageKind::Lower => "*.ll",
            StageKind::Assemble => "*.s",
            StageKind::Link => "*.o",
        }
    }

    /// Suffix appended to every file name the stage writes.
    ///
    /// Optimization reads and writes `.ll` files in different trees, so it
    /// appends nothing. Linked programs keep the object's name.
    pub fn dest_suffix(self) -> &'static str {
        match self {
            StageKind::CompileC | StageKind::CompileCxx => ".ll",
            StageKind::Optimize | StageKind::Link => "",
            StageKind::Lower => ".s",
            StageKind::Assemble => ".o",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StageKind::CompileC => "compile-c",
            StageKind::CompileCxx => "compile-c++",
            StageKind::Optimize => "optimize",
            StageKind::Lower => "lower",
            StageKind::Assemble => "assemble",
            StageKind::Link => "link",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generated trees under the output root, one subtree per level.
///
/// ```text
/// <root>/ir-unoptimized/<L>/...   front-end output
/// <root>/ir/<L>/...               optimized IR
/// <root>/asm/<L>/...
/// <root>/obj/<L>/...
/// <root>/programs/<L>/...
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unoptimized_ir(&self, level: OptLevel) -> PathBuf {
        self.tree("ir-unoptimized", level)
    }

    pub fn ir(&self, level: OptLevel) -> PathBuf {
        self.tree("ir", level)
    }

    pub fn asm(&self, level: OptLevel) -> PathBuf {
        self.tree("asm", level)
    }

    pub fn obj(&self, level: OptLevel) -> PathBuf {
        self.tree("obj", level)
    }

    pub fn programs(&self, level: OptLevel) -> PathBuf {
        self.tree("programs", level)
    }

    fn tree(&self, stage: &str, level: OptLevel) -> PathBuf {
        self.root.join(stage).join(level.dir_name())
    }
}
