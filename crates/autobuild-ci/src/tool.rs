//! Build tool command descriptions.

use autobuild_core::config::{BuildConfig, InstallerConfig, CONFIGURATION_PLACEHOLDER};
use serde::{Deserialize, Serialize};

/// Build tools with a known argument template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTool {
    /// msbuild /nologo /p:Configuration={configuration}
    Msbuild,

    /// cargo build --workspace --profile {configuration}
    ///
    /// Configurations name cargo profiles (`release`, `dev`).
    Cargo,
}

impl BuiltinTool {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTool::Msbuild => "msbuild",
            BuiltinTool::Cargo => "cargo",
        }
    }

    /// Argument template for the tool.
    pub fn args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            BuiltinTool::Msbuild => &["/nologo", "/p:Configuration={configuration}"],
            BuiltinTool::Cargo => &["build", "--workspace", "--profile", "{configuration}"],
        };
        args.iter().map(|a| a.to_string()).collect()
    }

    /// Recognise a preset from a program name or path (`msbuild.exe`, `/usr/bin/cargo`).
    pub fn from_program(program: &str) -> Option<Self> {
        let stem = std::path::Path::new(program)
            .file_stem()?
            .to_string_lossy()
            .to_ascii_lowercase();
        match stem.as_str() {
            "msbuild" => Some(BuiltinTool::Msbuild),
            "cargo" => Some(BuiltinTool::Cargo),
            _ => None,
        }
    }
}

/// A command that builds one configuration (or packages the result).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildTool {
    /// Human-readable name used in logs.
    pub name: String,

    /// Executable to run.
    pub program: String,

    /// Argument template; `{configuration}` is substituted per invocation.
    pub args: Vec<String>,

    /// Timeout in seconds (0 = none).
    pub timeout_secs: u64,
}

impl BuildTool {
    /// Create a tool from a builtin preset.
    pub fn from_builtin(tool: BuiltinTool, timeout_secs: u64) -> Self {
        Self::custom(tool.name(), tool.name(), tool.args(), timeout_secs)
    }

    /// Create a custom tool.
    pub fn custom(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            timeout_secs,
        }
    }

    /// Tool for `[build]`. A known program with no `args` gets its preset template.
    pub fn from_build_config(config: &BuildConfig) -> Self {
        let args = match BuiltinTool::from_program(&config.program) {
            Some(preset) if config.args.is_empty() => preset.args(),
            _ => config.args.clone(),
        };
        Self::custom("build", config.program.clone(), args, config.timeout_secs)
    }

    pub fn from_installer_config(config: &InstallerConfig) -> Self {
        Self::custom(
            "installer",
            config.program.clone(),
            config.args.clone(),
            config.timeout_secs,
        )
    }

    /// Arguments for `configuration`.
    pub fn args_for(&self, configuration: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(CONFIGURATION_PLACEHOLDER, configuration))
            .collect()
    }

    /// Full command line for `configuration`, program first.
    pub fn command_for(&self, configuration: &str) -> Vec<String> {
        let mut command = vec![self.program.clone()];
        command.extend(self.args_for(configuration));
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_substitution() {
        let tool = BuildTool::custom(
            "build",
            "msbuild",
            vec![
                "src/Dynamo.sln".to_string(),
                "/p:Configuration={configuration}".to_string(),
            ],
            3600,
        );
        assert_eq!(
            tool.command_for("Release"),
            vec!["msbuild", "src/Dynamo.sln", "/p:Configuration=Release"]
        );
        assert_eq!(tool.args_for("Debug")[1], "/p:Configuration=Debug");
    }

    #[test]
    fn test_args_without_placeholder_unchanged() {
        let tool = BuildTool::custom("installer", "make", vec!["package".to_string()], 60);
        assert_eq!(tool.command_for("Release"), vec!["make", "package"]);
    }

    #[test]
    fn test_builtin_presets() {
        let tool = BuildTool::from_builtin(BuiltinTool::Msbuild, 3600);
        assert_eq!(
            tool.command_for("Release"),
            vec!["msbuild", "/nologo", "/p:Configuration=Release"]
        );

        let tool = BuildTool::from_builtin(BuiltinTool::Cargo, 600);
        assert_eq!(
            tool.command_for("release"),
            vec!["cargo", "build", "--workspace", "--profile", "release"]
        );
    }

    #[test]
    fn test_preset_recognised_from_program() {
        assert_eq!(BuiltinTool::from_program("MSBuild.exe"), Some(BuiltinTool::Msbuild));
        assert_eq!(BuiltinTool::from_program("/usr/bin/cargo"), Some(BuiltinTool::Cargo));
        assert_eq!(BuiltinTool::from_program("make"), None);
    }

    #[test]
    fn test_build_config_without_args_uses_preset() {
        let config = BuildConfig {
            program: "msbuild".to_string(),
            args: vec![],
            configurations: vec!["Release".to_string()],
            timeout_secs: 60,
            parser: None,
        };
        assert_eq!(
            BuildTool::from_build_config(&config).args_for("Release"),
            vec!["/nologo", "/p:Configuration=Release"]
        );

        let explicit = BuildConfig {
            args: vec!["src/Dynamo.sln".to_string()],
            ..config
        };
        assert_eq!(
            BuildTool::from_build_config(&explicit).args,
            vec!["src/Dynamo.sln"]
        );
    }

    #[test]
    fn test_from_installer_config() {
        let config = InstallerConfig {
            program: "iscc".to_string(),
            args: vec!["DynamoInstaller.iss".to_string()],
            timeout_secs: 120,
            run_on_failure: false,
        };
        let tool = BuildTool::from_installer_config(&config);
        assert_eq!(tool.name, "installer");
        assert_eq!(tool.timeout_secs, 120);
    }
}
