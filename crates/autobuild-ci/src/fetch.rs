//! Source fetching through the `git` executable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use autobuild_core::config::DEFAULT_GIT_TIMEOUT_SECS;
use autobuild_core::{form_path, FetchError, FetchMetadata, PullResult};
use tracing::{debug, info};

use crate::exec::{self, CommandOutput, ExecError};

/// Obtains a source tree and describes what was fetched.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Clone `remote_url` into `local_base/repo_name` and return that path.
    async fn clone_repo(
        &self,
        remote_url: &str,
        local_base: &Path,
        repo_name: &str,
    ) -> Result<PathBuf, FetchError>;

    /// Pull the working copy and collect its date and recent commits.
    async fn fetch_metadata(
        &self,
        repo_path: &Path,
        commit_limit: usize,
    ) -> Result<FetchMetadata, FetchError>;
}

/// [`SourceFetcher`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git: String,
    timeout_secs: u64,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            timeout_secs: DEFAULT_GIT_TIMEOUT_SECS,
        }
    }
}

impl GitFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..Self::default()
        }
    }

    /// Use a specific git executable.
    pub fn with_git(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    async fn git(
        &self,
        command: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<CommandOutput, FetchError> {
        let mut full_args = vec![command.to_string()];
        full_args.extend(args.iter().map(|a| a.to_string()));
        debug!(git = %self.git, args = ?full_args, cwd = %cwd.display(), "Running git");

        exec::run(&self.git, &full_args, cwd, self.timeout_secs)
            .await
            .map_err(|e| match e {
                ExecError::NotFound => {
                    FetchError::GitUnavailable(format!("{} not found", self.git))
                }
                ExecError::Spawn(source) => FetchError::Io(source),
                ExecError::TimedOut => FetchError::TimedOut {
                    command: command.to_string(),
                    timeout_secs: self.timeout_secs,
                },
            })
    }

    async fn git_ok(
        &self,
        command: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<String, FetchError> {
        let output = self.git(command, args, cwd).await?;
        if !output.success {
            return Err(FetchError::CommandFailed {
                command: command.to_string(),
                message: output.stderr_text(),
            });
        }
        Ok(output.stdout_text())
    }

    fn require_repo(repo_path: &Path) -> Result<(), FetchError> {
        if repo_path.join(".git").exists() {
            Ok(())
        } else {
            Err(FetchError::RepositoryMissing {
                path: repo_path.to_path_buf(),
            })
        }
    }

    /// Update the working copy from its remote.
    ///
    /// A pull that git rejects is reported in the returned [`PullResult`].
    pub async fn pull(&self, repo_path: &Path) -> Result<PullResult, FetchError> {
        Self::require_repo(repo_path)?;
        let output = self.git("pull", &[], repo_path).await?;
        if output.success {
            Ok(PullResult::succeeded(output.stdout_text()))
        } else {
            Ok(PullResult::failed(output.stderr_text()))
        }
    }

    /// Committer date of `HEAD`.
    pub async fn repo_date(&self, repo_path: &Path) -> Result<String, FetchError> {
        Self::require_repo(repo_path)?;
        self.git_ok("log", &["-1", "--format=%cd"], repo_path).await
    }

    /// One-line descriptions of the latest `limit` commits, newest first.
    pub async fn recent_commits(
        &self,
        repo_path: &Path,
        limit: usize,
    ) -> Result<Vec<String>, FetchError> {
        Self::require_repo(repo_path)?;
        let limit = limit.to_string();
        let out = self
            .git_ok("log", &["--oneline", "--no-decorate", "-n", &limit], repo_path)
            .await?;
        Ok(out.lines().map(str::to_string).collect())
    }
}

fn is_occupied(path: &Path) -> Result<bool, FetchError> {
    if !path.exists() {
        return Ok(false);
    }
    if !path.is_dir() {
        return Ok(true);
    }
    Ok(std::fs::read_dir(path)?.next().is_some())
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn clone_repo(
        &self,
        remote_url: &str,
        local_base: &Path,
        repo_name: &str,
    ) -> Result<PathBuf, FetchError> {
        let target = form_path(local_base, repo_name);
        if is_occupied(&target)? {
            return Err(FetchError::TargetOccupied { path: target });
        }
        std::fs::create_dir_all(local_base)?;

        info!(remote = %remote_url, target = %target.display(), "Cloning repository");
        let target_arg = target.to_string_lossy().to_string();
        self.git_ok("clone", &[remote_url, &target_arg], Path::new("."))
            .await?;
        Ok(target)
    }

    async fn fetch_metadata(
        &self,
        repo_path: &Path,
        commit_limit: usize,
    ) -> Result<FetchMetadata, FetchError> {
        let pull = self.pull(repo_path).await?;
        let repo_date = self.repo_date(repo_path).await?;
        let commits = self.recent_commits(repo_path, commit_limit).await?;
        Ok(FetchMetadata {
            repo_date,
            pull,
            commits,
        })
    }
}

/// Clone `remote_url` into `form_path(local_base, repo_name)` with system git.
pub async fn clone(
    remote_url: &str,
    local_base: &Path,
    repo_name: &str,
) -> Result<PathBuf, FetchError> {
    GitFetcher::default()
        .clone_repo(remote_url, local_base, repo_name)
        .await
}
