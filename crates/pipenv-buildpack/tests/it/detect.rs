use crate::buildpack_snapshot;
use crate::common::{TestContext, get_bin};

/// `[[requires]]` metadata by name from the written plan.
fn requirement(context: &TestContext, name: &str) -> toml::Table {
    let plan: toml::Table = toml::from_str(&fs_err::read_to_string(&context.plan).unwrap()).unwrap();
    plan["requires"]
        .as_array()
        .unwrap()
        .iter()
        .find(|require| require["name"].as_str() == Some(name))
        .and_then(|require| require["metadata"].as_table())
        .cloned()
        .unwrap()
}

#[test]
fn detect_pipfile_lock() {
    let context = TestContext::new("pipfile_lock");

    buildpack_snapshot!(context.filters(), context.detect(), @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
      Pipenv application (Python 3.11.4)
    ");

    let plan: toml::Table = toml::from_str(&fs_err::read_to_string(&context.plan).unwrap()).unwrap();
    let provides: Vec<_> = plan["provides"]
        .as_array()
        .unwrap()
        .iter()
        .map(|provide| provide["name"].as_str().unwrap())
        .collect();
    assert_eq!(provides, vec!["pipenv", "requirements"]);

    assert_eq!(requirement(&context, "pipenv")["build"].as_bool(), Some(true));
    let python = requirement(&context, "python");
    assert_eq!(python["build"].as_bool(), Some(true));
    assert_eq!(python["version"].as_str(), Some("3.11.4"));
    assert_eq!(python["version-source"].as_str(), Some("Pipfile.lock"));
}

#[test]
fn detect_without_pipfile_lock() {
    let context = TestContext::new("without_pipfile_lock");

    let output = context.detect().output().expect("Failed to execute bin/detect");
    assert!(output.status.success());

    let python = requirement(&context, "python");
    assert_eq!(python.get("build").and_then(toml::Value::as_bool), Some(true));
    assert!(!python.contains_key("version"));
}

#[test]
fn detect_without_pipfile_skips() {
    let context = TestContext::new("without_pipfile");

    buildpack_snapshot!(context.filters(), context.detect(), @r"
    success: false
    exit_code: 100
    ----- stdout -----

    ----- stderr -----
      no Pipfile found in [APP]
    ");

    assert!(!context.plan.exists());
}

#[test]
fn detect_pipfile_and_requirements_fails() {
    let context = TestContext::new("pipfile_requirements");

    let output = context.detect().output().expect("Failed to execute bin/detect");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert_ne!(output.status.code(), Some(100));
    assert!(
        stderr.contains("error: found Pipfile + requirements.txt"),
        "got: {stderr}"
    );
    assert!(!context.plan.exists());
}

#[test]
fn detect_malformed_lock_fails() {
    let context = TestContext::new("pipfile_lock");
    fs_err::write(context.app.join("Pipfile.lock"), "{\"_meta\": ").unwrap();

    let output = context.detect().output().expect("Failed to execute bin/detect");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert_ne!(output.status.code(), Some(100));
    assert!(stderr.contains("failed to parse"), "got: {stderr}");
    assert!(stderr.contains("Caused by"), "got: {stderr}");
    assert!(!context.plan.exists());
}

#[test]
fn debug_log_level_shows_version_source() {
    let context = TestContext::new("pipfile_lock");
    context.platform_env("BP_LOG_LEVEL", "DEBUG");

    let output = context.detect().output().expect("Failed to execute bin/detect");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success());
    assert!(
        stderr.contains("Python 3.11.4 requested by Pipfile.lock"),
        "got: {stderr}"
    );
}

#[test]
fn unknown_phase_name_is_rejected() {
    let context = TestContext::new("pipfile_lock");

    let output = std::process::Command::new(get_bin())
        .arg(&context.platform)
        .arg(&context.plan)
        .current_dir(&context.app)
        .env("CNB_BUILDPACK_DIR", crate::common::buildpack_dir())
        .output()
        .expect("Failed to execute pipenv-buildpack");

    assert!(!output.status.success());
    assert!(!context.plan.exists());
}
