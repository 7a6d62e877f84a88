//! One autobuild run: workspace, fetch, builds, installer, reports.

use std::path::PathBuf;
use std::time::Instant;

use autobuild_core::obs::{
    emit_build_finished, emit_fetch_completed, emit_installer_finished, emit_run_finished,
    emit_run_started, run_span,
};
use autobuild_core::{
    get_email_content, log_path, log_results, render_log, write_build_outputs, write_email,
    AutobuildConfig, AutobuildError, BuildOutcome, EmailContent, FetchMetadata, InstallerResult,
    InstallerStatus, Interpreter, RunSummary, WorkspaceGuard,
};
use chrono::Utc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::fetch::SourceFetcher;
use crate::installer::run_installer;
use crate::runner::BuildRunner;

/// Per-run options that do not belong in the config file.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Identifies the run in log file names.
    pub stamp: String,

    /// Leave the workspace on disk after the run.
    pub keep_workspace: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            stamp: Utc::now().format("%Y%m%d_%H%M%S").to_string(),
            keep_workspace: false,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub run_id: String,
    pub stamp: String,
    pub metadata: FetchMetadata,

    /// One outcome per requested configuration, in request order.
    pub builds: Vec<BuildOutcome>,

    pub installer: Option<InstallerResult>,

    /// Rendered log text.
    pub log: String,

    /// Where the log was written, if writing succeeded.
    pub log_path: Option<PathBuf>,

    pub email: EmailContent,

    /// Whether the notify policy asks for the email to be sent.
    pub notify: bool,

    /// Workspace left on disk with `keep_workspace`.
    pub kept_workspace: Option<PathBuf>,

    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn succeeded_count(&self) -> usize {
        self.builds.iter().filter(|b| b.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.builds.len() - self.succeeded_count()
    }

    /// All configurations succeeded and the installer did not fail.
    pub fn success(&self) -> bool {
        self.failed_count() == 0
            && self
                .installer
                .as_ref()
                .map_or(true, |i| i.status != InstallerStatus::Failed)
    }

    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary::new(
            &self.stamp,
            &self.metadata.repo_date,
            &self.metadata.pull,
            &self.builds,
            self.installer.as_ref(),
            &self.metadata.commits,
        )
    }
}

/// Sequential build pipeline over pluggable fetch and build backends.
pub struct Pipeline<'a> {
    config: &'a AutobuildConfig,
    fetcher: &'a dyn SourceFetcher,
    builder: &'a dyn BuildRunner,
    installer: Option<&'a dyn BuildRunner>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a AutobuildConfig,
        fetcher: &'a dyn SourceFetcher,
        builder: &'a dyn BuildRunner,
    ) -> Self {
        Self {
            config,
            fetcher,
            builder,
            installer: None,
        }
    }

    /// Run `installer` after the builds.
    pub fn with_installer(mut self, installer: &'a dyn BuildRunner) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Execute the run.
    ///
    /// Workspace and fetch failures abort before any build; the workspace is
    /// removed on every exit path unless `keep_workspace` is set. A
    /// configuration whose build tool cannot be invoked is recorded as not run
    /// and the remaining configurations still build.
    pub async fn run(&self, options: PipelineOptions) -> Result<PipelineResult, AutobuildError> {
        let run_id = Uuid::new_v4().to_string();
        let span = run_span(&run_id, &options.stamp);
        self.run_inner(run_id, options).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: String,
        options: PipelineOptions,
    ) -> Result<PipelineResult, AutobuildError> {
        let start = Instant::now();
        let repo = &self.config.repository;
        let configurations = &self.config.build.configurations;
        emit_run_started(&repo.url, configurations);

        let interpreter = Interpreter::from_config(&self.config.build.parser_config())?;
        let guard = WorkspaceGuard::acquire(&repo.local_base)?;

        let repo_path = self
            .fetcher
            .clone_repo(&repo.url, &repo.local_base, &repo.name)
            .await?;
        let metadata = self
            .fetcher
            .fetch_metadata(&repo_path, repo.commit_limit)
            .await?;
        emit_fetch_completed(&metadata);

        let mut builds = Vec::with_capacity(configurations.len());
        for configuration in configurations {
            info!(config = %configuration, parser = interpreter.parser_name(), "Building configuration");
            let build_start = Instant::now();
            let outcome = match self.builder.run_build(&repo_path, configuration).await {
                Ok(raw) => {
                    let result = interpreter.build_result(configuration, &raw.output);
                    if !raw.exited_cleanly() && result.success() {
                        warn!(config = %configuration, exit_code = raw.exit_code, "Build tool exited non-zero but reported no errors");
                    }
                    BuildOutcome::Completed(result)
                }
                Err(e) => BuildOutcome::not_run(configuration.as_str(), e.to_string()),
            };
            emit_build_finished(&outcome, build_start.elapsed().as_millis() as u64);
            builds.push(outcome);
        }

        let installer = match self.installer {
            Some(runner) => {
                let run_on_failure = self
                    .config
                    .installer
                    .as_ref()
                    .is_some_and(|i| i.run_on_failure);
                let configuration = configurations.first().map(String::as_str).unwrap_or("");
                let result =
                    run_installer(runner, &repo_path, configuration, &builds, run_on_failure).await;
                emit_installer_finished(&result);
                Some(result)
            }
            None => None,
        };

        let report = &self.config.report;
        let (log, written_log) = match log_results(
            &report.log_prefix,
            &options.stamp,
            &metadata.pull,
            &builds,
            installer.as_ref(),
            &metadata.commits,
        ) {
            Ok(log) => (log, Some(log_path(&report.log_prefix, &options.stamp))),
            Err(e) => {
                warn!(error = %e, "Failed to write log, keeping rendered text only");
                let log = render_log(
                    &options.stamp,
                    &metadata.pull,
                    &builds,
                    installer.as_ref(),
                    &metadata.commits,
                );
                (log, None)
            }
        };

        if report.save_build_output {
            if let Err(e) = write_build_outputs(&report.log_prefix, &options.stamp, &builds) {
                warn!(error = %e, "Failed to save raw build output");
            }
        }

        let email = get_email_content(
            &metadata.repo_date,
            &metadata.pull,
            &builds,
            installer.as_ref(),
            &metadata.commits,
        );
        let notify = report.notify.should_notify(&builds, installer.as_ref());
        if notify {
            if let Some(path) = &report.email_out {
                if let Err(e) = write_email(path, &email) {
                    warn!(error = %e, "Failed to write email");
                }
            }
        }

        let kept_workspace = if options.keep_workspace {
            let path = guard.keep();
            info!(path = %path.display(), "Keeping workspace");
            Some(path)
        } else {
            if let Err(e) = guard.release() {
                warn!(error = %e, "Workspace cleanup failed");
            }
            None
        };

        let result = PipelineResult {
            run_id,
            stamp: options.stamp,
            metadata,
            builds,
            installer,
            log,
            log_path: written_log,
            email,
            notify,
            kept_workspace,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        emit_run_finished(
            result.succeeded_count(),
            result.builds.len(),
            result.duration_ms,
        );
        Ok(result)
    }
}
