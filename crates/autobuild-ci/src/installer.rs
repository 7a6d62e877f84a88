//! Optional installer (packaging) step.

use std::path::Path;

use autobuild_core::{BuildOutcome, InstallerResult, InstallerStatus};

use crate::runner::BuildRunner;

/// Lines of installer output kept in the result detail.
pub const DETAIL_TAIL_LINES: usize = 20;

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Run the installer through `runner` unless a build failed and
/// `run_on_failure` is off.
///
/// `configuration` is substituted into the installer's arguments, normally the
/// first (release) configuration.
pub async fn run_installer(
    runner: &dyn BuildRunner,
    workspace_path: &Path,
    configuration: &str,
    builds: &[BuildOutcome],
    run_on_failure: bool,
) -> InstallerResult {
    let failed = builds.iter().filter(|b| !b.succeeded()).count();
    if failed > 0 && !run_on_failure {
        return InstallerResult::skipped(format!(
            "{} configuration(s) did not succeed",
            failed
        ));
    }

    match runner.run_build(workspace_path, configuration).await {
        Ok(raw) => {
            let detail = tail(&String::from_utf8_lossy(&raw.output), DETAIL_TAIL_LINES);
            let status = if raw.exited_cleanly() {
                InstallerStatus::Succeeded
            } else {
                InstallerStatus::Failed
            };
            InstallerResult::new(status, detail)
        }
        Err(e) => InstallerResult::new(InstallerStatus::Failed, e.to_string()),
    }
}
