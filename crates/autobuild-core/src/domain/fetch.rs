//! Source fetch metadata.

use serde::{Deserialize, Serialize};

/// Outcome of updating the working copy from its remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullResult {
    pub success: bool,
    pub message: String,
}

impl PullResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Everything learned about the source tree while fetching it.
///
/// Produced once per run and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchMetadata {
    /// Committer date of the checked-out revision.
    pub repo_date: String,

    pub pull: PullResult,

    /// Commit descriptions, newest first.
    pub commits: Vec<String>,
}
