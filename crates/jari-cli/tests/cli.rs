//! End-to-end CLI tests.
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Test context with an isolated jari home and a class tree to package
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let classes = temp_dir.path().join("classes/com/example");
        std::fs::create_dir_all(&classes).expect("failed to create class tree");
        std::fs::write(classes.join("Main.class"), "main").expect("failed to write class");
        Self { temp_dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.temp_dir.path().join(rel)
    }

    fn path_str(&self, rel: &str) -> String {
        self.path(rel).to_string_lossy().into_owned()
    }

    fn write_config(&self, body: &str) -> PathBuf {
        let path = self.path("build.jari");
        std::fs::write(&path, body).expect("failed to write config");
        path
    }

    fn jari_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_jari");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("JARI_HOME", self.path(".jari"));
        cmd.env_remove("JARI_ARCHIVER");
        cmd.env_remove("JARI_REPOSITORY_URL");
        cmd.env("JARI_PROCESSORS", "0");
        cmd
    }

    #[cfg(unix)]
    fn fake_archiver(&self, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.path("bin/fake-jar");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .jari_cmd()
        .arg("--help")
        .output()
        .expect("failed to run jari");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .jari_cmd()
        .arg("--version")
        .output()
        .expect("failed to run jari");
    assert!(output.status.success());
}

#[test]
fn test_check_valid_config() {
    let ctx = TestContext::new();
    let config = ctx.write_config(&format!(
        "input \"{}\"\noutput \"{}\"\nmain com.example.Main\nversion 2",
        ctx.path_str("classes"),
        ctx.path_str("out/app.jar")
    ));

    let output = ctx
        .jari_cmd()
        .arg("check")
        .arg(&config)
        .output()
        .expect("failed to run jari");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("main class  com.example.Main"));
    assert!(stdout.contains("version     2.0"));
}

#[test]
fn test_check_reports_syntax_errors() {
    let ctx = TestContext::new();
    let config = ctx.write_config("foo bar\ninput {");

    let output = ctx
        .jari_cmd()
        .arg("check")
        .arg(&config)
        .output()
        .expect("failed to run jari");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unexpected foo"));
    assert!(stderr.contains("Unexpected EOF, expected right-brace, line 2"));
}

#[test]
fn test_check_json_output() {
    let ctx = TestContext::new();
    let config = ctx.write_config("input x output y version abc");

    let output = ctx
        .jari_cmd()
        .args(["check", "--json"])
        .arg(&config)
        .output()
        .expect("failed to run jari");
    assert!(!output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["ok"], false);
    let errors = report["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| e["type"] == "not_a_number"));
}

#[test]
fn test_missing_config_file() {
    let ctx = TestContext::new();
    let output = ctx
        .jari_cmd()
        .arg("build")
        .arg(ctx.path("nope.jari"))
        .output()
        .expect("failed to run jari");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

#[cfg(unix)]
#[test]
fn test_build_with_fake_archiver() {
    let ctx = TestContext::new();
    let archiver = ctx.fake_archiver("touch \"$2\"");
    let config = ctx.write_config(&format!(
        "input {{ \"{}\" }} output \"{}\" main com.example.Main",
        ctx.path_str("classes/com"),
        ctx.path_str("out/app.jar")
    ));

    let output = ctx
        .jari_cmd()
        .arg("--archiver")
        .arg(&archiver)
        .arg("build")
        .arg(&config)
        .output()
        .expect("failed to run jari");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(ctx.path("out/app.jar").exists());
    assert!(String::from_utf8_lossy(&output.stdout).contains("built"));
}

#[cfg(unix)]
#[test]
fn test_pack_reports_archiver_failure() {
    let ctx = TestContext::new();
    let archiver = ctx.fake_archiver("echo 'no space left' >&2\nexit 1");

    let output = ctx
        .jari_cmd()
        .env("JARI_ARCHIVER", &archiver)
        .args(["pack", "--quiet", "-i"])
        .arg(ctx.path("classes"))
        .arg("-o")
        .arg(ctx.path("out/app.jar"))
        .output()
        .expect("failed to run jari");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Archiver failed:\nno space left"));
}
