//! autobuild core library
//!
//! Domain model, workspace lifecycle, build output interpretation and report
//! rendering for the autobuild continuous-build pipeline. Process execution
//! (git, build tools) lives in `autobuild-ci`.

pub mod config;
pub mod domain;
pub mod error;
pub mod interpret;
pub mod obs;
pub mod report;
pub mod telemetry;
pub mod workspace;

pub use config::{AutobuildConfig, BuildConfig, InstallerConfig, ReportConfig, RepositoryConfig};
pub use domain::{
    BuildOutcome, BuildResult, FetchMetadata, InstallerResult, InstallerStatus, PullResult,
};
pub use error::{
    AutobuildError, BuildInvocationError, ConfigError, FetchError, ParseError, ReportError,
    Result, WorkspaceError,
};
pub use interpret::{
    decode_output, interpret_build, CargoParser, DiagnosticCounts, Interpretation, Interpreter,
    MsBuildParser, OutputParser, ParserConfig, PatternParser,
};
pub use obs::run_span;
pub use report::{
    get_email_content, log_path, log_results, render_log, write_build_outputs, write_email,
    write_run_summary_json, EmailContent, NotifyPolicy, RunSummary,
};
pub use telemetry::init_tracing;
pub use workspace::{cleanup, form_path, setup, WorkspaceGuard};

/// autobuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
