//! Structured lifecycle events for an autobuild run.
//!
//! Every event is an `info!` (or `warn!`) record with an `event` field, so a
//! JSON log can be filtered by event name.

use tracing::{info, warn};

use crate::domain::{BuildOutcome, FetchMetadata, InstallerResult};

/// Span tagging every record of one run with its id and stamp.
///
/// Attach it to the run future with `tracing::Instrument` so it survives
/// `.await` points.
pub fn run_span(run_id: &str, stamp: &str) -> tracing::Span {
    tracing::info_span!("autobuild.run", run_id = %run_id, stamp = %stamp)
}

pub fn emit_run_started(repo_url: &str, configurations: &[String]) {
    info!(
        event = "run.started",
        repo = %repo_url,
        configurations = %configurations.join(","),
    );
}

pub fn emit_fetch_completed(metadata: &FetchMetadata) {
    info!(
        event = "fetch.completed",
        repo_date = %metadata.repo_date,
        pull_ok = metadata.pull.success,
        commits = metadata.commits.len(),
    );
}

pub fn emit_build_finished(outcome: &BuildOutcome, duration_ms: u64) {
    match outcome {
        BuildOutcome::Completed(result) => info!(
            event = "build.completed",
            config = %result.config(),
            errors = result.errors(),
            warnings = result.warnings(),
            success = result.success(),
            duration_ms = duration_ms,
        ),
        BuildOutcome::NotRun { config, reason } => warn!(
            event = "build.not_run",
            config = %config,
            reason = %reason,
        ),
    }
}

pub fn emit_installer_finished(result: &InstallerResult) {
    info!(event = "installer.completed", status = %result.status);
}

pub fn emit_run_finished(succeeded: usize, total: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        succeeded = succeeded,
        total = total,
        duration_ms = duration_ms,
    );
}
