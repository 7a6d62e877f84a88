//! Installer (packaging) step outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallerStatus {
    Succeeded,
    Failed,
    /// The step was configured but deliberately not run (e.g. a build failed).
    Skipped,
}

impl fmt::Display for InstallerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallerStatus::Succeeded => write!(f, "SUCCEEDED"),
            InstallerStatus::Failed => write!(f, "FAILED"),
            InstallerStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Result of the optional installer step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallerResult {
    pub status: InstallerStatus,

    /// Free-form detail: tool output tail or the reason it was skipped.
    pub detail: String,
}

impl InstallerResult {
    pub fn new(status: InstallerStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::new(InstallerStatus::Skipped, reason)
    }

    pub fn succeeded(&self) -> bool {
        self.status == InstallerStatus::Succeeded
    }
}
