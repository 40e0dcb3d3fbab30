// The `unreachable_pub` is to silence false positives in RustRover.
#![allow(dead_code, unreachable_pub)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Insta snapshot filters shared across buildpack tests.
pub const INSTA_FILTERS: &[(&str, &str)] = &[
    // Rewrite Windows output to Unix output
    (r"\\([\w\d]|\.)", "/$1"),
    (r"pipenv-buildpack\.exe", "pipenv-buildpack"),
    // Trim end-of-line whitespaces
    (r"([^\s])[ \t]+(\r?\n)", "$1$2"),
];

/// Returns the buildpack binary that cargo built before launching the tests.
pub fn get_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pipenv-buildpack"))
}

/// The directory holding `buildpack.toml`.
pub fn buildpack_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// `tests/fixtures/<name>`.
pub fn fixture(name: &str) -> PathBuf {
    buildpack_dir().join("tests").join("fixtures").join(name)
}

/// The buildpack plan handed to the build phase when the lifecycle accepted
/// the detect plan unchanged.
pub const BUILDPACK_PLAN: &str = r#"[[entries]]
name = "pipenv"

[entries.metadata]
build = true

[[entries]]
name = "python"

[entries.metadata]
build = true
"#;

/// A lifecycle-shaped scratch area: `app/`, `layers/`, `platform/`, the plan
/// files, and `bin/detect` + `bin/build` links to the buildpack binary, all
/// under one temporary directory.
pub struct TestContext {
    pub root: TempDir,
    pub app: PathBuf,
    pub layers: PathBuf,
    pub platform: PathBuf,
    /// Written by detect.
    pub plan: PathBuf,
    /// Read by build.
    pub buildpack_plan: PathBuf,
}

impl TestContext {
    /// Start from a copy of `tests/fixtures/<name>`.
    pub fn new(name: &str) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let app = root.path().join("app");
        let layers = root.path().join("layers");
        let platform = root.path().join("platform");
        let bin = root.path().join("bin");
        fs_err::create_dir_all(&layers).unwrap();
        fs_err::create_dir_all(&platform).unwrap();
        fs_err::create_dir_all(&bin).unwrap();
        for phase in ["detect", "build"] {
            std::os::unix::fs::symlink(get_bin(), bin.join(phase)).unwrap();
        }

        let buildpack_plan = root.path().join("buildpack-plan.toml");
        fs_err::write(&buildpack_plan, BUILDPACK_PLAN).unwrap();

        let context = Self {
            plan: root.path().join("plan.toml"),
            buildpack_plan,
            root,
            app,
            layers,
            platform,
        };
        context.reset_app(name);
        context
    }

    /// Replace the application source with a fresh copy of a fixture, as the
    /// lifecycle does on every rebuild. Layers are left alone.
    pub fn reset_app(&self, name: &str) {
        if self.app.exists() {
            fs_err::remove_dir_all(&self.app).unwrap();
        }
        fs_err::create_dir_all(&self.app).unwrap();
        for entry in fs_err::read_dir(fixture(name)).unwrap() {
            let entry = entry.unwrap();
            fs_err::copy(entry.path(), self.app.join(entry.file_name())).unwrap();
        }
    }

    /// `bin/<phase>` with the environment the lifecycle provides, run from
    /// the application root, with no configuration leaking in from the
    /// environment running the tests.
    fn phase(&self, phase: &str) -> Command {
        let mut command = Command::new(self.root.path().join("bin").join(phase));
        for name in [
            "BP_PIPENV_VERSION",
            "BP_PIPENV_PYTHON",
            "BP_PIPENV_INCLUDE_DEV",
            "BP_PIPENV_INCLUDE_HASHES",
            "BP_LOG_LEVEL",
            "RUST_LOG",
        ] {
            command.env_remove(name);
        }
        command
            .env("CNB_BUILDPACK_DIR", buildpack_dir())
            .env("CNB_PLATFORM_DIR", &self.platform)
            .env("CNB_STACK_ID", "io.buildpacks.stacks.jammy")
            .env("CNB_TARGET_OS", "linux")
            .env("CNB_TARGET_ARCH", "amd64")
            .env("CNB_TARGET_DISTRO_NAME", "ubuntu")
            .env("CNB_TARGET_DISTRO_VERSION", "22.04")
            .current_dir(&self.app);
        command
    }

    /// `bin/detect <platform> <plan>`.
    pub fn detect(&self) -> Command {
        let mut command = self.phase("detect");
        command
            .env("CNB_BUILD_PLAN_PATH", &self.plan)
            .arg(&self.platform)
            .arg(&self.plan);
        command
    }

    /// `bin/build <layers> <platform> <plan>`, installing pipenv with
    /// `python`.
    pub fn build(&self, python: &Path) -> Command {
        let mut command = self.phase("build");
        command
            .env("CNB_LAYERS_DIR", &self.layers)
            .env("CNB_BP_PLAN_PATH", &self.buildpack_plan)
            .env("BP_PIPENV_PYTHON", python)
            .arg(&self.layers)
            .arg(&self.platform)
            .arg(&self.buildpack_plan);
        command
    }

    /// Set a variable in `<platform>/env`.
    pub fn platform_env(&self, name: &str, value: &str) {
        let env = self.platform.join("env");
        fs_err::create_dir_all(&env).unwrap();
        fs_err::write(env.join(name), value).unwrap();
    }

    /// `<layers>/<name>.toml`, parsed.
    pub fn layer_toml(&self, name: &str) -> toml::Table {
        let path = self.layers.join(format!("{name}.toml"));
        toml::from_str(&fs_err::read_to_string(path).unwrap()).unwrap()
    }

    /// Snapshot filters for this context's temporary paths.
    pub fn filters(&self) -> Vec<(String, String)> {
        let mut filters = vec![
            (regex::escape(&self.app.display().to_string()), "[APP]".to_owned()),
            (
                regex::escape(&self.layers.display().to_string()),
                "[LAYERS]".to_owned(),
            ),
            (
                regex::escape(&self.root.path().display().to_string()),
                "[TEMP]".to_owned(),
            ),
        ];
        filters.extend(
            INSTA_FILTERS
                .iter()
                .map(|(pattern, replacement)| ((*pattern).to_owned(), (*replacement).to_owned())),
        );
        filters
    }
}

/// Stand-ins for `python -m pip install pipenv` and `pipenv lock`.
pub mod fake_tools {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// The lock the fake `pipenv lock` writes.
    pub const GENERATED_LOCK: &str = r#"{
    "_meta": {
        "requires": {"python_version": "3.11"},
        "sources": [{"name": "pypi", "url": "https://pypi.org/simple", "verify_ssl": true}]
    },
    "default": {
        "flask": {"hashes": ["sha256:7b2fb8e934ddd50731893bdcdb00fc8c0315916f9fcd50d22c7cc1a95ab634e2"], "index": "pypi", "version": "==2.0.0"}
    },
    "develop": {}
}
"#;

    fn write_executable(path: &Path, content: &str) {
        fs_err::write(path, content).unwrap();
        fs_err::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Create a fake interpreter in `dir`.
    ///
    /// Each `pip install` appends its arguments to `dir/installs.log` and
    /// drops a `pipenv` script into `$PYTHONUSERBASE/bin`. That script answers
    /// `pipenv lock` by writing [`GENERATED_LOCK`] to the working directory.
    pub fn python(dir: &Path) -> PathBuf {
        fs_err::create_dir_all(dir).unwrap();
        let lock = dir.join("generated.lock");
        fs_err::write(&lock, GENERATED_LOCK).unwrap();

        let pipenv = dir.join("pipenv");
        write_executable(
            &pipenv,
            &format!(
                "#!/bin/sh\nif [ \"$1\" = lock ]; then cp '{}' Pipfile.lock; fi\n",
                lock.display()
            ),
        );

        let python = dir.join("python");
        write_executable(
            &python,
            &format!(
                "#!/bin/sh\necho \"$@\" >> '{log}'\nmkdir -p \"$PYTHONUSERBASE/bin\"\ncp '{pipenv}' \"$PYTHONUSERBASE/bin/pipenv\"\n",
                log = installs_log(dir).display(),
                pipenv = pipenv.display(),
            ),
        );
        python
    }

    /// A fake interpreter whose `pip install` always fails.
    pub fn failing_python(dir: &Path) -> PathBuf {
        fs_err::create_dir_all(dir).unwrap();
        let python = dir.join("python");
        write_executable(
            &python,
            "#!/bin/sh\necho 'ERROR: No matching distribution found for pipenv' >&2\nexit 1\n",
        );
        python
    }

    pub fn installs_log(dir: &Path) -> PathBuf {
        dir.join("installs.log")
    }

    /// The recorded `pip` invocations.
    pub fn installs(dir: &Path) -> Vec<String> {
        match fs_err::read_to_string(installs_log(dir)) {
            Ok(content) => content.lines().map(ToOwned::to_owned).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Snapshot test helper macro. Runs a command and asserts against an insta snapshot.
#[macro_export]
macro_rules! buildpack_snapshot {
    ($filters:expr, $command:expr, @$expected:literal) => {{
        let output = $command.output().expect("Failed to execute pipenv-buildpack");
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let mut combined = format!(
            "success: {:?}\nexit_code: {}\n----- stdout -----\n{}\n----- stderr -----\n{}",
            output.status.success(),
            output.status.code().unwrap_or(-1),
            stdout.trim(),
            stderr.trim(),
        );

        // Apply filters
        for (pattern, replacement) in $filters.iter() {
            let re = regex::Regex::new(pattern).expect("Invalid filter regex");
            combined = re.replace_all(&combined, replacement.as_str()).to_string();
        }

        insta::assert_snapshot!(combined, @$expected);
    }};
}
