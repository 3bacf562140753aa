// This module tracks what a pipeline run did. RunStats counts transformed files per
// stage and per optimization level along with the total number of external tool
// invocations, and renders a summary that the binary logs once a run finishes. Counts
// are recorded by the pipeline after each successful transformer call, so a run that
// aborts part-way reports exactly the work completed before the failure.

//! Run statistics.

use std::collections::BTreeMap;
use std::fmt;

use super::level::OptLevel;
use super::stage::StageKind;

/// Statistics of one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// Files transformed, keyed by stage and level.
    pub files: BTreeMap<(StageKind, OptLevel), usize>,

    /// External tool invocations that succeeded.
    pub tool_invocations: usize,
}

impl RunStats {
    /// Record one successfully transformed file.
    pub fn record_file(&mut self, stage: StageKind, level: OptLevel) {
        *self.files.entry((stage, level)).or_insert(0) += 1;
        self.tool_invocations += 1;
    }

    /// Files transformed by `stage` across all levels.
    pub fn stage_total(&self, stage: StageKind) -> usize {
        self.files
            .iter()
            .filter(|((s, _), _)| *s == stage)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn level_count(&self, stage: StageKind, level: OptLevel) -> usize {
        self.files.get(&(stage, level)).copied().unwrap_or(0)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Run Statistics:")?;
        writeln!(f, "  Tool invocations: {}", self.tool_invocations)?;

        for stage in StageKind::ALL {
            let total = self.stage_total(stage);
            if total == 0 {
                continue;
            }
            let per_level: Vec<String> = OptLevel::ALL
                .iter()
                .map(|&l| format!("{}={}", l, self.level_count(stage, l)))
                .collect();
            writeln!(f, "  {}: {} files ({})", stage, total, per_level.join(", "))?;
        }

        Ok(())
    }
}
