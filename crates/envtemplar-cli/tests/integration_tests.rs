//! Integration tests for the envtemplar binary

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the fixtures path
fn fixtures_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures")
}

fn fixture(name: &str) -> String {
    format!("{}/{}", fixtures_path(), name)
}

/// Helper to run envtemplar with a controlled environment
fn envtemplar(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_envtemplar"))
        .args(args)
        .env("GOENVTEMPLATOR_DEFINED_VAR", "foo")
        .env_remove("GOENVTEMPLATOR_DEFINED_FILE_VAR")
        .env_remove("GOENVTEMPLATOR_OVERRIDDEN_VAR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute envtemplar")
}

fn pair(source: &str, destination: &Path) -> String {
    format!("{}:{}", source, destination.display())
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

mod render {
    use super::*;

    #[test]
    fn test_renders_env_and_env_file_values() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&[
            "-t",
            &pair(&fixture("app.conf.tmpl"), &out),
            "--env-file",
            &fixture("fixtures.env"),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        insta::assert_snapshot!(std::fs::read_to_string(&out).unwrap(), @r"
        listen=foo
        file=bar
        overridden=from-file
        ");
    }

    #[test]
    fn test_process_environment_wins_over_env_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = Command::new(env!("CARGO_BIN_EXE_envtemplar"))
            .args([
                "-t",
                &pair(&fixture("app.conf.tmpl"), &out),
                "--env-file",
                &fixture("fixtures.env"),
            ])
            .env("GOENVTEMPLATOR_OVERRIDDEN_VAR", "from-process")
            .env_remove("GOENVTEMPLATOR_DEFINED_VAR")
            .output()
            .unwrap();

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let rendered = std::fs::read_to_string(&out).unwrap();
        assert!(rendered.contains("listen=8080\n"));
        assert!(rendered.contains("overridden=from-process\n"));
    }

    #[test]
    fn test_later_env_file_overrides_earlier() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&[
            "-t",
            &pair(&fixture("app.conf.tmpl"), &out),
            "--env-file",
            &fixture("fixtures.env"),
            "--env-file",
            &fixture("override.env"),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(std::fs::read_to_string(&out).unwrap().contains("file=baz\n"));
    }

    #[test]
    fn test_pongo_engine() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&[
            "--engine",
            "pongo",
            "-t",
            &pair(&fixture("app.conf.pongo"), &out),
            "--env-file",
            &fixture("fixtures.env"),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "listen=foo\nfile=bar\n");
    }

    #[test]
    fn test_debug_templates_prints_rendered_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&[
            "--debug-templates",
            "-t",
            &pair(&fixture("app.conf.tmpl"), &out),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let expected = "listen=foo\nfile=\noverridden=\n";
        assert_eq!(output.stdout, format!("{expected}\x00\n").into_bytes());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), expected);
    }

    #[test]
    fn test_no_templates_is_success() {
        let output = envtemplar(&[]);
        assert!(output.status.success());
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn test_version() {
        let output = envtemplar(&["--version"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_undefined_field_exits_with_template_error() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.conf");
        let second = dir.path().join("second.conf");

        let output = envtemplar(&[
            "-t",
            &pair(&fixture("app.conf.tmpl"), &first),
            "-t",
            &pair(&fixture("undefined.tmpl"), &second),
        ]);

        assert_eq!(output.status.code(), Some(3));
        assert!(stderr(&output).contains("GOENVTEMPLATOR_UNDEFINED"));
        assert!(first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn test_unknown_engine_is_config_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&[
            "--engine",
            "mustache",
            "-t",
            &pair(&fixture("app.conf.tmpl"), &out),
        ]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("mustache"));
        assert!(!out.exists());
    }

    #[test]
    fn test_relative_template_path_is_rejected() {
        let output = envtemplar(&["-t", "app.conf.tmpl:/tmp/app.conf"]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("not absolute"));
    }

    #[test]
    fn test_malformed_pair_is_rejected() {
        let output = envtemplar(&["-t", "/a.tmpl:/b.conf:/c.conf"]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&["-t", &pair(&fixture("does-not-exist.tmpl"), &out)]);
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_missing_env_file_is_io_error() {
        let output = envtemplar(&["--env-file", &fixture("does-not-exist.env")]);
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_malformed_env_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&[
            "-t",
            &pair(&fixture("app.conf.tmpl"), &out),
            "--env-file",
            &fixture("malformed.env"),
        ]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("malformed.env"));
        assert!(!out.exists());
    }
}

mod exec {
    use super::*;

    #[test]
    fn test_exec_without_command_is_config_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&["-t", &pair(&fixture("app.conf.tmpl"), &out), "--exec"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("Missing command to execute!"));
        assert!(!out.exists());
    }

    #[test]
    fn test_exec_unknown_program_after_rendering() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("app.conf");

        let output = envtemplar(&[
            "-t",
            &pair(&fixture("app.conf.tmpl"), &out),
            "--exec",
            "envtemplar-no-such-program",
        ]);

        assert_eq!(output.status.code(), Some(6));
        assert!(out.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_inherits_env_file_variables() {
        let output = envtemplar(&[
            "--env-file",
            &fixture("fixtures.env"),
            "--exec",
            "--",
            "sh",
            "-c",
            "echo \"$GOENVTEMPLATOR_DEFINED_VAR-$GOENVTEMPLATOR_DEFINED_FILE_VAR\"",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "foo-bar\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_propagates_exit_status() {
        let output = envtemplar(&["--exec", "sh", "-c", "exit 7"]);
        assert_eq!(output.status.code(), Some(7));
    }
}
