//! autobuild - fetch, build and report on a repository
//!
//! ## Commands
//!
//! - `run`: full pipeline (workspace, clone, builds, installer, log, email)
//! - `interpret`: count errors and warnings in a saved build log
//! - `setup` / `clean`: manage a workspace directory by hand

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use autobuild_ci::{BuildTool, CommandBuildRunner, GitFetcher, Pipeline, PipelineOptions};
use autobuild_core::{
    write_run_summary_json, AutobuildConfig, DiagnosticCounts, Interpreter, ParserConfig,
};

#[derive(Parser)]
#[command(name = "autobuild")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Nightly clone, build and report for a repository", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline
    Run {
        /// Config file
        #[arg(short, long, env = "AUTOBUILD_CONFIG", default_value = "autobuild.toml")]
        config: PathBuf,

        /// Workspace directory (overrides repository.local_base)
        #[arg(long, env = "AUTOBUILD_WORKSPACE")]
        workspace: Option<PathBuf>,

        /// Log file prefix (overrides report.log_prefix)
        #[arg(long, env = "AUTOBUILD_LOG_PREFIX")]
        log_prefix: Option<String>,

        /// Leave the workspace on disk after the run
        #[arg(long)]
        keep_workspace: bool,

        /// Write the notification email here (overrides report.email_out)
        #[arg(long)]
        email_out: Option<PathBuf>,

        /// Write a JSON run summary here
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// Count errors and warnings in a saved build log
    Interpret {
        /// Build output file
        file: PathBuf,

        /// Marker grammar
        #[arg(short, long, value_enum, default_value_t = ParserKind::Msbuild)]
        parser: ParserKind,
    },

    /// Prepare an empty workspace directory
    Setup {
        path: PathBuf,
    },

    /// Remove a workspace directory
    Clean {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ParserKind {
    Msbuild,
    Cargo,
}

impl From<ParserKind> for ParserConfig {
    fn from(kind: ParserKind) -> Self {
        match kind {
            ParserKind::Msbuild => ParserConfig::Msbuild,
            ParserKind::Cargo => ParserConfig::Cargo,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    autobuild_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            config,
            workspace,
            log_prefix,
            keep_workspace,
            email_out,
            summary_json,
        } => {
            let mut config = AutobuildConfig::load(&config)
                .with_context(|| format!("Failed to load config {}", config.display()))?;
            apply_overrides(&mut config, workspace, log_prefix, email_out);
            cmd_run(&config, keep_workspace, summary_json.as_deref(), cli.json).await
        }
        Commands::Interpret { file, parser } => {
            let counts = cmd_interpret(&file, parser)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("Errors: {}", counts.errors);
                println!("Warnings: {}", counts.warnings);
                println!(
                    "Status: {}",
                    if counts.success() { "✓ SUCCEEDED" } else { "✗ FAILED" }
                );
            }
            Ok(())
        }
        Commands::Setup { path } => {
            autobuild_core::setup(&path)
                .with_context(|| format!("Failed to set up workspace {}", path.display()))?;
            println!("Workspace ready: {}", path.display());
            Ok(())
        }
        Commands::Clean { path } => {
            autobuild_core::cleanup(&path)
                .with_context(|| format!("Failed to clean workspace {}", path.display()))?;
            println!("Workspace removed: {}", path.display());
            Ok(())
        }
    }
}

fn apply_overrides(
    config: &mut AutobuildConfig,
    workspace: Option<PathBuf>,
    log_prefix: Option<String>,
    email_out: Option<PathBuf>,
) {
    if let Some(workspace) = workspace {
        config.repository.local_base = workspace;
    }
    if let Some(prefix) = log_prefix {
        config.report.log_prefix = prefix;
    }
    if email_out.is_some() {
        config.report.email_out = email_out;
    }
}

async fn cmd_run(
    config: &AutobuildConfig,
    keep_workspace: bool,
    summary_json: Option<&Path>,
    json: bool,
) -> Result<()> {
    let fetcher = GitFetcher::new(config.repository.timeout_secs);
    let builder = CommandBuildRunner::new(BuildTool::from_build_config(&config.build));
    let installer = config
        .installer
        .as_ref()
        .map(|i| CommandBuildRunner::new(BuildTool::from_installer_config(i)));

    let mut pipeline = Pipeline::new(config, &fetcher, &builder);
    if let Some(installer) = &installer {
        pipeline = pipeline.with_installer(installer);
    }

    info!(repo = %config.repository.url, "Starting autobuild run");
    let result = pipeline
        .run(PipelineOptions {
            keep_workspace,
            ..PipelineOptions::default()
        })
        .await
        .context("Autobuild run failed")?;

    if let Some(path) = summary_json {
        write_run_summary_json(path, &result.summary())
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result.summary())?);
    } else {
        println!("Run ID: {}", result.run_id);
        println!(
            "Status: {}",
            if result.success() { "✓ PASSED" } else { "✗ FAILED" }
        );
        println!("Duration: {}ms", result.duration_ms);
        if let Some(path) = &result.log_path {
            println!("Log: {}", path.display());
        }
        if let Some(path) = &result.kept_workspace {
            println!("Workspace kept: {}", path.display());
        }
        println!();
        print!("{}", result.log);
    }

    if !result.success() {
        anyhow::bail!(
            "Run failed: {} of {} configuration(s) did not succeed, installer {}",
            result.failed_count(),
            result.builds.len(),
            result
                .installer
                .as_ref()
                .map_or("not configured".to_string(), |i| i.status.to_string())
        );
    }
    Ok(())
}

fn cmd_interpret(file: &Path, parser: ParserKind) -> Result<DiagnosticCounts> {
    let raw = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let interpreter = Interpreter::from_config(&ParserConfig::from(parser))?;
    let counts = interpreter
        .interpret_bytes(&raw)
        .with_context(|| format!("{} is not a text build log", file.display()))?;
    Ok(counts)
}
