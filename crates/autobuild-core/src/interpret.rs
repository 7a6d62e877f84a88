//! Build output interpretation.
//!
//! Turns the raw text a build tool prints into error and warning counts.
//! Marker grammars differ per tool, so each supported tool gets its own
//! [`OutputParser`]; [`PatternParser`] covers anything else with user
//! supplied regular expressions.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::BuildResult;
use crate::error::ParseError;

/// Error and warning counts extracted from one build's output.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct DiagnosticCounts {
    pub errors: u32,
    pub warnings: u32,
}

impl DiagnosticCounts {
    /// True iff no errors were found.
    pub fn success(&self) -> bool {
        self.errors == 0
    }
}

/// A marker grammar for one family of build tools.
pub trait OutputParser: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Count diagnostics in `text`. Unrecognised output yields zero counts.
    fn count(&self, text: &str) -> DiagnosticCounts;
}

// ---------------------------------------------------------------------------
// MSBuild
// ---------------------------------------------------------------------------

/// MSBuild / `dotnet build` output.
///
/// The trailing `N Error(s)` / `N Warning(s)` summary is authoritative. When a
/// log was cut short before the summary, individual `error XX1234:` lines are
/// counted instead, up to the `Build FAILED.` / `Build succeeded.` recap, which
/// only repeats diagnostics already printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsBuildParser;

struct MsBuildPatterns {
    error_summary: Regex,
    warning_summary: Regex,
    error_line: Regex,
    warning_line: Regex,
    recap: Regex,
}

fn msbuild_patterns() -> &'static MsBuildPatterns {
    static PATTERNS: OnceLock<MsBuildPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MsBuildPatterns {
        error_summary: Regex::new(r"^\s*(\d+)\s+Error\(s\)\s*$").expect("static regex"),
        warning_summary: Regex::new(r"^\s*(\d+)\s+Warning\(s\)\s*$").expect("static regex"),
        error_line: Regex::new(r":\s*(?:fatal\s+)?error\s+[A-Za-z]+\d+\s*:").expect("static regex"),
        warning_line: Regex::new(r":\s*warning\s+[A-Za-z]+\d+\s*:").expect("static regex"),
        recap: Regex::new(r"^\s*Build (FAILED|succeeded)\.\s*$").expect("static regex"),
    })
}

fn summary_count(re: &Regex, line: &str) -> Option<u32> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl OutputParser for MsBuildParser {
    fn name(&self) -> &'static str {
        "msbuild"
    }

    fn count(&self, text: &str) -> DiagnosticCounts {
        let patterns = msbuild_patterns();

        let mut summary_errors = None;
        let mut summary_warnings = None;
        let mut line_counts = DiagnosticCounts::default();
        let mut in_recap = false;

        for line in text.lines() {
            if let Some(n) = summary_count(&patterns.error_summary, line) {
                summary_errors = Some(n);
            } else if let Some(n) = summary_count(&patterns.warning_summary, line) {
                summary_warnings = Some(n);
            } else if patterns.recap.is_match(line) {
                in_recap = true;
            } else if in_recap {
                continue;
            } else if patterns.error_line.is_match(line) {
                line_counts.errors += 1;
            } else if patterns.warning_line.is_match(line) {
                line_counts.warnings += 1;
            }
        }

        DiagnosticCounts {
            errors: summary_errors.unwrap_or(line_counts.errors),
            warnings: summary_warnings.unwrap_or(line_counts.warnings),
        }
    }
}

// ---------------------------------------------------------------------------
// Cargo
// ---------------------------------------------------------------------------

/// `cargo build` output: one `error:` / `warning:` header per diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoParser;

struct CargoPatterns {
    error: Regex,
    warning: Regex,
    error_recap: Regex,
    warning_recap: Regex,
}

fn cargo_patterns() -> &'static CargoPatterns {
    static PATTERNS: OnceLock<CargoPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| CargoPatterns {
        error: Regex::new(r"^error(\[E\d+\])?:").expect("static regex"),
        warning: Regex::new(r"^warning(\[[^\]]+\])?:").expect("static regex"),
        error_recap: Regex::new(r"^error: (could not compile|aborting due to)").expect("static regex"),
        warning_recap: Regex::new(r"^warning: (.* generated \d+ warnings?|build failed)")
            .expect("static regex"),
    })
}

impl OutputParser for CargoParser {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn count(&self, text: &str) -> DiagnosticCounts {
        let patterns = cargo_patterns();
        let mut counts = DiagnosticCounts::default();

        for line in text.lines() {
            if patterns.error.is_match(line) && !patterns.error_recap.is_match(line) {
                counts.errors += 1;
            } else if patterns.warning.is_match(line) && !patterns.warning_recap.is_match(line) {
                counts.warnings += 1;
            }
        }

        counts
    }
}

// ---------------------------------------------------------------------------
// Custom patterns
// ---------------------------------------------------------------------------

/// Counts lines matching any of a set of user supplied regular expressions.
#[derive(Debug, Clone)]
pub struct PatternParser {
    errors: Vec<Regex>,
    warnings: Vec<Regex>,
}

impl PatternParser {
    pub fn new(errors: &[String], warnings: &[String]) -> Result<Self, ParseError> {
        Ok(Self {
            errors: compile_all(errors)?,
            warnings: compile_all(warnings)?,
        })
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ParseError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ParseError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

impl OutputParser for PatternParser {
    fn name(&self) -> &'static str {
        "patterns"
    }

    fn count(&self, text: &str) -> DiagnosticCounts {
        let mut counts = DiagnosticCounts::default();
        for line in text.lines() {
            if self.errors.iter().any(|re| re.is_match(line)) {
                counts.errors += 1;
            } else if self.warnings.iter().any(|re| re.is_match(line)) {
                counts.warnings += 1;
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which marker grammar to apply to build output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParserConfig {
    #[default]
    Msbuild,
    Cargo,
    Patterns {
        #[serde(default)]
        errors: Vec<String>,
        #[serde(default)]
        warnings: Vec<String>,
    },
}

impl ParserConfig {
    /// Guess the grammar from the build program name.
    pub fn infer(program: &str) -> Self {
        let lower = program.to_ascii_lowercase();
        if lower.contains("cargo") {
            ParserConfig::Cargo
        } else {
            ParserConfig::Msbuild
        }
    }

    pub fn build(&self) -> Result<Box<dyn OutputParser>, ParseError> {
        Ok(match self {
            ParserConfig::Msbuild => Box::new(MsBuildParser),
            ParserConfig::Cargo => Box::new(CargoParser),
            ParserConfig::Patterns { errors, warnings } => {
                Box::new(PatternParser::new(errors, warnings)?)
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Decode raw build output, rejecting anything that is not text.
pub fn decode_output(bytes: &[u8]) -> Result<&str, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::NotText(e.to_string()))?;
    if text.contains('\0') {
        return Err(ParseError::NotText("output contains NUL bytes".to_string()));
    }
    Ok(text)
}

/// Raw build output together with what was found in it.
///
/// `success` is derived from `errors` at construction.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Interpretation {
    result: String,
    errors: u32,
    warnings: u32,
    success: bool,
}

impl Interpretation {
    pub fn new(raw_text: impl Into<String>, counts: DiagnosticCounts) -> Self {
        Self {
            result: raw_text.into(),
            errors: counts.errors,
            warnings: counts.warnings,
            success: counts.success(),
        }
    }

    /// The interpreted raw text.
    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    /// Attach a configuration name.
    pub fn into_build_result(self, config: impl Into<String>) -> BuildResult {
        BuildResult::new(config, self.result, self.errors, self.warnings)
    }
}

/// Interpret `raw_text` with the default (MSBuild) grammar.
pub fn interpret_build(raw_text: &str) -> Interpretation {
    Interpretation::new(raw_text, MsBuildParser.count(raw_text))
}

/// Applies one [`OutputParser`] to build output.
pub struct Interpreter {
    parser: Box<dyn OutputParser>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Box::new(MsBuildParser))
    }
}

impl Interpreter {
    pub fn new(parser: Box<dyn OutputParser>) -> Self {
        Self { parser }
    }

    pub fn from_config(config: &ParserConfig) -> Result<Self, ParseError> {
        Ok(Self::new(config.build()?))
    }

    pub fn parser_name(&self) -> &'static str {
        self.parser.name()
    }

    pub fn interpret(&self, raw_text: &str) -> DiagnosticCounts {
        self.parser.count(raw_text)
    }

    pub fn interpret_bytes(&self, raw: &[u8]) -> Result<DiagnosticCounts, ParseError> {
        decode_output(raw).map(|text| self.interpret(text))
    }

    /// Interpret one configuration's output into a [`BuildResult`].
    ///
    /// Non-textual output is logged and recorded with zero counts so the run
    /// still produces a complete report.
    pub fn build_result(&self, config: &str, raw: &[u8]) -> BuildResult {
        match decode_output(raw) {
            Ok(text) => Interpretation::new(text, self.interpret(text)).into_build_result(config),
            Err(e) => {
                warn!(config = %config, parser = self.parser.name(), error = %e, "Build output not interpretable, assuming no diagnostics");
                BuildResult::new(config, String::from_utf8_lossy(raw), 0, 0)
            }
        }
    }
}
