//! Log and email rendering for a finished run.
//!
//! Rendering is pure: the same inputs always produce the same text. Only
//! [`log_results`], [`write_email`] and [`write_run_summary_json`] touch the
//! filesystem. The aggregator never decides whether anyone should be told
//! about a run; see [`NotifyPolicy`] for that.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{BuildOutcome, InstallerResult, InstallerStatus, PullResult};
use crate::error::ReportError;

type Result<T> = std::result::Result<T, ReportError>;

/// A rendered notification message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

impl EmailContent {
    /// Message text with a `Subject:` header, as accepted by `sendmail -t`.
    pub fn to_message(&self) -> String {
        format!("Subject: {}\n\n{}", self.subject, self.body)
    }
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        let _ = writeln!(out, "    {}", line);
    }
}

fn render_sections(
    out: &mut String,
    pull_result: &PullResult,
    build_results: &[BuildOutcome],
    installer_result: Option<&InstallerResult>,
    commits: &[String],
) {
    let _ = writeln!(
        out,
        "Pull: {}",
        if pull_result.success { "OK" } else { "ERROR" }
    );
    push_indented(out, &pull_result.message);
    out.push('\n');

    out.push_str("Builds:\n");
    if build_results.is_empty() {
        out.push_str("  (no configurations requested)\n");
    }
    for outcome in build_results {
        match outcome {
            BuildOutcome::Completed(result) => {
                let _ = writeln!(
                    out,
                    "  [{}] {} ({} error(s), {} warning(s))",
                    result.config(),
                    outcome.status_label(),
                    result.errors(),
                    result.warnings()
                );
            }
            BuildOutcome::NotRun { config, reason } => {
                let _ = writeln!(out, "  [{}] {}: {}", config, outcome.status_label(), reason);
            }
        }
    }
    out.push('\n');

    if let Some(installer) = installer_result {
        let _ = writeln!(out, "Installer: {}", installer.status);
        push_indented(out, &installer.detail);
        out.push('\n');
    }

    out.push_str("Commits:\n");
    if commits.is_empty() {
        out.push_str("  (none)\n");
    }
    for commit in commits {
        let _ = writeln!(out, "  - {}", commit);
    }
}

/// Render the plain-text log for a run identified by `stamp`.
pub fn render_log(
    stamp: &str,
    pull_result: &PullResult,
    build_results: &[BuildOutcome],
    installer_result: Option<&InstallerResult>,
    commits: &[String],
) -> String {
    let mut out = format!("autobuild log {}\n\n", stamp);
    render_sections(&mut out, pull_result, build_results, installer_result, commits);
    out
}

/// Path of the log file for `stamp`.
pub fn log_path(log_prefix: &str, stamp: &str) -> PathBuf {
    PathBuf::from(format!("{}{}.log", log_prefix, stamp))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Render the log, write it to `<log_prefix><stamp>.log` and return it.
pub fn log_results(
    log_prefix: &str,
    stamp: &str,
    pull_result: &PullResult,
    build_results: &[BuildOutcome],
    installer_result: Option<&InstallerResult>,
    commits: &[String],
) -> Result<String> {
    let log = render_log(stamp, pull_result, build_results, installer_result, commits);
    write_file(&log_path(log_prefix, stamp), &log)?;
    Ok(log)
}

/// Configuration name reduced to characters safe in a file name.
fn file_component(config: &str) -> String {
    config
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write each completed configuration's raw output next to the log.
///
/// Returns the written paths in configuration order. Characters other than
/// ASCII letters, digits, `-` and `_` in the configuration name become `_`.
pub fn write_build_outputs(
    log_prefix: &str,
    stamp: &str,
    build_results: &[BuildOutcome],
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for result in build_results.iter().filter_map(BuildOutcome::result) {
        let path = PathBuf::from(format!(
            "{}{}_{}.txt",
            log_prefix,
            stamp,
            file_component(result.config())
        ));
        write_file(&path, result.raw_text())?;
        paths.push(path);
    }
    Ok(paths)
}

/// Render the notification email for a run.
pub fn get_email_content(
    repo_date: &str,
    pull_result: &PullResult,
    build_results: &[BuildOutcome],
    installer_result: Option<&InstallerResult>,
    commits: &[String],
) -> EmailContent {
    let succeeded = build_results.iter().filter(|b| b.succeeded()).count();
    let subject = format!(
        "[autobuild] {}: {}/{} configurations succeeded",
        repo_date,
        succeeded,
        build_results.len()
    );

    let mut body = format!("Repository date: {}\n\n", repo_date);
    render_sections(&mut body, pull_result, build_results, installer_result, commits);

    EmailContent { subject, body }
}

/// Persist an email for an external mailer.
pub fn write_email(path: &Path, email: &EmailContent) -> Result<()> {
    write_file(path, &email.to_message())
}

/// When a run should produce a notification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    Always,
    #[default]
    OnFailure,
    Never,
}

impl NotifyPolicy {
    pub fn should_notify(
        &self,
        build_results: &[BuildOutcome],
        installer_result: Option<&InstallerResult>,
    ) -> bool {
        match self {
            NotifyPolicy::Always => true,
            NotifyPolicy::Never => false,
            NotifyPolicy::OnFailure => {
                build_results.iter().any(|b| !b.succeeded())
                    || installer_result.is_some_and(|i| i.status == InstallerStatus::Failed)
            }
        }
    }
}

/// Machine-readable record of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub stamp: &'a str,
    pub repo_date: &'a str,
    pub pull: &'a PullResult,
    pub builds: &'a [BuildOutcome],
    pub installer: Option<&'a InstallerResult>,
    pub commits: &'a [String],
    pub succeeded: usize,
    pub total: usize,
}

impl<'a> RunSummary<'a> {
    pub fn new(
        stamp: &'a str,
        repo_date: &'a str,
        pull: &'a PullResult,
        builds: &'a [BuildOutcome],
        installer: Option<&'a InstallerResult>,
        commits: &'a [String],
    ) -> Self {
        Self {
            stamp,
            repo_date,
            pull,
            builds,
            installer,
            commits,
            succeeded: builds.iter().filter(|b| b.succeeded()).count(),
            total: builds.len(),
        }
    }
}

/// Write the run summary as pretty JSON.
pub fn write_run_summary_json(path: &Path, summary: &RunSummary<'_>) -> Result<()> {
    let content = serde_json::to_string_pretty(summary)?;
    write_file(path, &content)
}
