//! Per-configuration build results.

use serde::Serialize;

/// Interpreted outcome of one configuration's build output.
///
/// `success` is derived from `errors` when the result is constructed and has
/// no setter, so the two can never disagree.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BuildResult {
    config: String,
    raw_text: String,
    errors: u32,
    warnings: u32,
    success: bool,
}

impl BuildResult {
    /// Create a result for `config` from its raw output and diagnostic counts.
    pub fn new(
        config: impl Into<String>,
        raw_text: impl Into<String>,
        errors: u32,
        warnings: u32,
    ) -> Self {
        Self {
            config: config.into(),
            raw_text: raw_text.into(),
            errors,
            warnings,
            success: errors == 0,
        }
    }

    /// Configuration name (e.g. "Release").
    pub fn config(&self) -> &str {
        &self.config
    }

    /// Raw build tool output.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    /// True iff the build reported no errors.
    pub fn success(&self) -> bool {
        self.success
    }
}

/// What happened to one requested configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuildOutcome {
    /// The build tool ran and its output was interpreted.
    Completed(BuildResult),

    /// The build tool could not be invoked at all.
    NotRun { config: String, reason: String },
}

impl BuildOutcome {
    /// Create a "could not run" outcome.
    pub fn not_run(config: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildOutcome::NotRun {
            config: config.into(),
            reason: reason.into(),
        }
    }

    pub fn config(&self) -> &str {
        match self {
            BuildOutcome::Completed(result) => result.config(),
            BuildOutcome::NotRun { config, .. } => config,
        }
    }

    /// Whether the configuration ran and reported zero errors.
    pub fn succeeded(&self) -> bool {
        matches!(self, BuildOutcome::Completed(result) if result.success())
    }

    pub fn result(&self) -> Option<&BuildResult> {
        match self {
            BuildOutcome::Completed(result) => Some(result),
            BuildOutcome::NotRun { .. } => None,
        }
    }

    /// Short status label used in reports.
    pub fn status_label(&self) -> &'static str {
        match self {
            BuildOutcome::Completed(result) if result.success() => "SUCCEEDED",
            BuildOutcome::Completed(_) => "FAILED",
            BuildOutcome::NotRun { .. } => "COULD NOT RUN",
        }
    }
}

impl From<BuildResult> for BuildOutcome {
    fn from(result: BuildResult) -> Self {
        BuildOutcome::Completed(result)
    }
}
