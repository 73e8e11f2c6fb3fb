use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::analysis::RiskLevel;
use crate::AssessedExtension;

/// Policy verdict: the final pass/fail decision over a whole scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub pass: bool,
    pub total_extensions: usize,
    pub evaluated_extensions: usize,
    pub skipped_entries: usize,
    pub highest_score: Option<u8>,
    pub fail_threshold: RiskLevel,
}

/// Policy configuration loaded from `.manifestguard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Lowest risk level that fails the scan.
    #[serde(default = "default_fail_on")]
    pub fail_on: RiskLevel,
    /// Extension ids (or display names, for unpacked extensions) left out
    /// of the verdict. They are still reported.
    #[serde(default)]
    pub ignore_extensions: HashSet<String>,
}

fn default_fail_on() -> RiskLevel {
    RiskLevel::High
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
            ignore_extensions: HashSet::new(),
        }
    }
}

impl Policy {
    pub fn is_ignored(&self, ext: &AssessedExtension) -> bool {
        ext.manifest
            .extension_id
            .as_ref()
            .is_some_and(|id| self.ignore_extensions.contains(id))
            || self.ignore_extensions.contains(&ext.manifest.display_name)
    }

    /// Evaluate scored extensions against this policy.
    pub fn evaluate(&self, extensions: &[AssessedExtension], skipped: usize) -> PolicyVerdict {
        let effective: Vec<u8> = extensions
            .iter()
            .filter(|e| !self.is_ignored(e))
            .map(|e| e.assessment.score)
            .collect();

        let highest = effective.iter().copied().max();
        let failed = effective
            .iter()
            .any(|&score| RiskLevel::from_score(score) >= self.fail_on);

        PolicyVerdict {
            pass: !failed,
            total_extensions: extensions.len(),
            evaluated_extensions: effective.len(),
            skipped_entries: skipped,
            highest_score: highest,
            fail_threshold: self.fail_on,
        }
    }
}
