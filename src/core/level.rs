//! Optimization levels.
//!
//! Every stage runs once per level in `0..=3`. A level is validated when it
//! is constructed, so tool invocations never see an out-of-range value.

use std::fmt;

use super::error::{PipelineError, PipelineResult};

/// An optimization level accepted by every tool in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptLevel(u8);

impl OptLevel {
    /// Number of levels each stage is run at.
    pub const COUNT: u8 = 4;

    /// All levels in the order the pipeline visits them.
    pub const ALL: [OptLevel; Self::COUNT as usize] =
        [OptLevel(0), OptLevel(1), OptLevel(2), OptLevel(3)];

    /// Create a level, rejecting anything outside `0..=3`.
    pub fn new(level: i64) -> PipelineResult<Self> {
        match u8::try_from(level) {
            Ok(l) if l < Self::COUNT => Ok(OptLevel(l)),
            _ => Err(PipelineError::InvalidOptLevel { level }),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The `-O<n>` flag understood by clang and opt.
    pub fn flag(self) -> String {
        format!("-O{}", self.0)
    }

    /// Directory name of this level inside a stage tree.
    pub fn dir_name(self) -> String {
        self.0.to_string()
    }
}

impl TryFrom<i64> for OptLevel {
    type Error = PipelineError;

    fn try_from(level: i64) -> PipelineResult<Self> {
        OptLevel::new(level)
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}
