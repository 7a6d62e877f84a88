//! End-to-end interpretation and reporting over literal build logs.

use autobuild_core::{
    get_email_content, interpret_build, log_path, log_results, render_log, BuildInvocationError,
    BuildOutcome, InstallerResult, InstallerStatus, Interpreter, PullResult,
};

fn release_failed_debug_ok() -> Vec<BuildOutcome> {
    vec![
        interpret_build("Build FAILED.\n5 Error(s)\n5 Warning(s)")
            .into_build_result("Release")
            .into(),
        interpret_build("Build succeeded.\n0 Error(s)\n0 Warning(s)")
            .into_build_result("Debug")
            .into(),
    ]
}

/// Release is rendered before Debug, marked failed; Debug marked succeeded.
#[test]
fn test_log_results_release_before_debug() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = format!("{}/", dir.path().display());
    let builds = release_failed_debug_ok();
    let installer = InstallerResult::new(InstallerStatus::Succeeded, "installer_result");

    let log = log_results(
        &prefix,
        "run1",
        &PullResult::succeeded("pull_result"),
        &builds,
        Some(&installer),
        &["commits".to_string()],
    )
    .expect("log_results failed");

    let release = log.find("[Release] FAILED").expect("Release section");
    let debug = log.find("[Debug] SUCCEEDED").expect("Debug section");
    assert!(release < debug, "Release must precede Debug");

    // Each configuration and its status appear exactly once.
    assert_eq!(log.matches("Release").count(), 1);
    assert_eq!(log.matches("Debug").count(), 1);
    assert_eq!(log.matches("FAILED").count(), 1);

    let on_disk = std::fs::read_to_string(log_path(&prefix, "run1")).unwrap();
    assert_eq!(on_disk, log);
}

#[test]
fn test_log_results_creates_log_directory() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = format!("{}/logs/nightly_", dir.path().display());

    log_results(
        &prefix,
        "20261017",
        &PullResult::failed("fatal: could not read from remote"),
        &release_failed_debug_ok(),
        None,
        &[],
    )
    .expect("log_results failed");

    assert!(dir.path().join("logs/nightly_20261017.log").is_file());
}

#[test]
fn test_email_content_is_pure() {
    let builds = release_failed_debug_ok();
    let pull = PullResult::succeeded("pull_result");
    let installer = InstallerResult::new(InstallerStatus::Failed, "installer_result");
    let commits = vec!["c1".to_string(), "c2".to_string()];

    let a = get_email_content("date", &pull, &builds, Some(&installer), &commits);
    let b = get_email_content("date", &pull, &builds, Some(&installer), &commits);
    assert_eq!(a, b);
    assert_eq!(a.to_message().as_bytes(), b.to_message().as_bytes());

    let release = a.body.find("[Release]").unwrap();
    let debug = a.body.find("[Debug]").unwrap();
    assert!(release < debug);
    assert!(a.body.contains("Installer: FAILED"));
}

#[test]
fn test_interpreter_counts_match_marker_count() {
    let interpreter = Interpreter::default();
    let log = "\
x.cs(1,1): error CS0001: one
y.cs(2,2): error CS0002: two
z.cs(3,3): warning CS0003: three
";
    let counts = interpreter.interpret(log);
    assert_eq!(counts.errors, 2);
    assert_eq!(counts.warnings, 1);
    assert!(!counts.success());
}

/// A configuration that could not run is still named exactly once.
#[test]
fn test_not_run_reason_does_not_repeat_configuration() {
    let reasons = [
        BuildInvocationError::TimedOut {
            configuration: "Release".to_string(),
            timeout_secs: 3600,
        },
        BuildInvocationError::EmptyCommand {
            configuration: "Release".to_string(),
        },
    ];
    for reason in reasons {
        let builds: Vec<BuildOutcome> = vec![
            BuildOutcome::not_run("Release", reason.to_string()),
            interpret_build("Build succeeded.\n0 Error(s)")
                .into_build_result("Debug")
                .into(),
        ];
        let log = render_log("s", &PullResult::succeeded(""), &builds, None, &[]);
        assert_eq!(log.matches("Release").count(), 1, "{}", log);
        assert_eq!(log.matches("COULD NOT RUN").count(), 1);
    }
}
