//! Build tool invocation, one configuration at a time.

use std::path::Path;

use async_trait::async_trait;
use autobuild_core::BuildInvocationError;
use tracing::debug;

use crate::exec::{self, ExecError};
use crate::tool::BuildTool;

/// Raw output of one build invocation.
#[derive(Debug, Clone)]
pub struct RawBuildOutput {
    pub configuration: String,

    /// Combined stdout and stderr.
    pub output: Vec<u8>,

    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    pub duration_ms: u64,
}

impl RawBuildOutput {
    /// Whether the tool exited with status 0.
    pub fn exited_cleanly(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs the build tool for one named configuration inside a workspace.
///
/// A build that fails still returns its output; only an inability to run the
/// tool is an error.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn run_build(
        &self,
        workspace_path: &Path,
        configuration: &str,
    ) -> Result<RawBuildOutput, BuildInvocationError>;
}

/// [`BuildRunner`] that spawns a [`BuildTool`] as a child process.
#[derive(Debug, Clone)]
pub struct CommandBuildRunner {
    tool: BuildTool,
}

impl CommandBuildRunner {
    pub fn new(tool: BuildTool) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &BuildTool {
        &self.tool
    }
}

#[async_trait]
impl BuildRunner for CommandBuildRunner {
    async fn run_build(
        &self,
        workspace_path: &Path,
        configuration: &str,
    ) -> Result<RawBuildOutput, BuildInvocationError> {
        if !workspace_path.is_dir() {
            return Err(BuildInvocationError::WorkspaceMissing {
                path: workspace_path.to_path_buf(),
            });
        }
        if self.tool.program.trim().is_empty() {
            return Err(BuildInvocationError::EmptyCommand {
                configuration: configuration.to_string(),
            });
        }

        let args = self.tool.args_for(configuration);
        debug!(tool = %self.tool.name, program = %self.tool.program, args = ?args, configuration = %configuration, "Invoking build tool");

        let output = exec::run(&self.tool.program, &args, workspace_path, self.tool.timeout_secs)
            .await
            .map_err(|e| match e {
                ExecError::NotFound => BuildInvocationError::ToolNotFound {
                    program: self.tool.program.clone(),
                },
                ExecError::Spawn(source) => BuildInvocationError::Spawn {
                    program: self.tool.program.clone(),
                    source,
                },
                ExecError::TimedOut => BuildInvocationError::TimedOut {
                    configuration: configuration.to_string(),
                    timeout_secs: self.tool.timeout_secs,
                },
            })?;

        Ok(RawBuildOutput {
            configuration: configuration.to_string(),
            output: output.combined(),
            exit_code: output.exit_code,
            duration_ms: output.duration_ms,
        })
    }
}

/// Run the build for `configuration` in `workspace_path` with `tool`.
pub async fn run_build(
    tool: &BuildTool,
    workspace_path: &Path,
    configuration: &str,
) -> Result<RawBuildOutput, BuildInvocationError> {
    CommandBuildRunner::new(tool.clone())
        .run_build(workspace_path, configuration)
        .await
}
