//! autobuild CI - process execution for autobuild runs
//!
//! Provides the pieces of a run that talk to the outside world:
//! - Fetching source with git (clone, pull, date, commit log)
//! - Invoking the build tool once per configuration
//! - The optional installer step
//! - The pipeline tying them to the workspace and the reports

mod exec;

pub mod fetch;
pub mod installer;
pub mod pipeline;
pub mod runner;
pub mod tool;

// Re-export key types
pub use fetch::{clone, GitFetcher, SourceFetcher};
pub use installer::run_installer;
pub use pipeline::{Pipeline, PipelineOptions, PipelineResult};
pub use runner::{run_build, BuildRunner, CommandBuildRunner, RawBuildOutput};
pub use tool::{BuildTool, BuiltinTool};
