//! Integration tests for CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "K_DB_USER",
    "K_DB_PASSWORD",
    "K_DB_IP",
    "K_DB_PORT",
    "K_DB_NAME",
    "K_TEST_MODE_DB_USER",
    "K_TEST_MODE_DB_PASSWORD",
    "K_TEST_MODE_DB_IP",
    "K_TEST_MODE_DB_PORT",
    "K_TEST_MODE_DB_NAME",
    "K_REDSHIFT_USER",
    "K_REDSHIFT_PASSWORD",
    "K_REDSHIFT_IP",
    "K_REDSHIFT_PORT",
    "K_REDSHIFT_NAME",
    "MIGCTL_DEF",
    "MIGCTL_ENV",
    "MIGCTL_SECTION",
    "MIGCTL_ENGINE",
    "RUST_LOG",
];

/// A command isolated from the caller's environment, running in `dir`.
fn migctl(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("migctl"));
    cmd.current_dir(dir);
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Write `env/default.yml` with a `db` section built from `settings`.
fn write_default(dir: &Path, settings: &str) -> PathBuf {
    let env_dir = dir.join("env");
    fs::create_dir_all(&env_dir).expect("mkdir env");
    let path = env_dir.join("default.yml");
    fs::write(&path, format!("default:\n  db:\n{}", settings)).expect("write default config");
    path
}

fn postgres_settings(migration_dir: &Path) -> String {
    format!(
        "    migration_dir: '{}'\n    driver: postgres\n    user: app\n    password: secret\n    ip: localhost:5432\n    name: app\n",
        migration_dir.display()
    )
}

#[test]
fn test_cli_version() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path()).arg("--version").assert().success().stdout(predicate::str::contains("migctl"));
}

#[test]
fn test_cli_help() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Drive database schema migrations"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("goto"))
        .stdout(predicate::str::contains("--section"));
}

#[test]
fn test_help_command_needs_no_config() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path())
        .arg("help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("Def config").not());
}

#[test]
fn test_unknown_command_prints_usage() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path()).arg("frobnicate").assert().success().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_no_command_prints_usage() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path()).assert().success().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_migrate_rejects_non_numeric_steps() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path())
        .args(["migrate", "abc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to parse param <n>."))
        .stdout(predicate::str::contains("Def config").not());
}

#[test]
fn test_goto_rejects_negative_version() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path())
        .args(["goto", "-1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to parse param <v>."));
}

#[test]
fn test_extra_arguments_exit_with_failure() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path())
        .args(["create", "add", "users"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unexpected argument 'users'"));
    migctl(tmp.path()).args(["up", "extra"]).assert().code(1);
    migctl(tmp.path()).args(["--section"]).assert().code(1);
}

#[test]
fn test_create_requires_name() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path()).arg("create").assert().code(1).stderr(predicate::str::contains("Please specify name."));
}

#[test]
fn test_missing_config_reports_first_missing_key() {
    let tmp = TempDir::new().expect("tmp");
    migctl(tmp.path())
        .arg("up")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Def config - env/default.yml"))
        .stdout(predicate::str::contains("Section - db"))
        .stderr(predicate::str::contains("trying environment variables"))
        .stderr(predicate::str::contains("please set 'migration_dir' parameter in DB config"));
}

#[test]
fn test_validation_reports_only_driver_when_driver_and_ip_missing() {
    let tmp = TempDir::new().expect("tmp");
    write_default(tmp.path(), "    migration_dir: migrations\n    user: app\n    name: app\n");
    migctl(tmp.path())
        .arg("version")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("please set 'driver' parameter"))
        .stderr(predicate::str::contains("'ip'").not());
}

#[test]
fn test_unsupported_driver_fails() {
    let tmp = TempDir::new().expect("tmp");
    write_default(
        tmp.path(),
        "    migration_dir: migrations\n    driver: oracle\n    user: app\n    ip: h:1521\n    name: app\n",
    );
    migctl(tmp.path())
        .arg("version")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown driver 'oracle'"));
}

#[test]
fn test_missing_env_document_is_a_warning() {
    let tmp = TempDir::new().expect("tmp");
    let migrations = tmp.path().join("migrations");
    write_default(tmp.path(), &postgres_settings(&migrations));
    migctl(tmp.path())
        .args(["create", "init"])
        .assert()
        .success()
        .stderr(predicate::str::contains("proceeding with defaults only"));
}

#[test]
fn test_create_writes_numbered_pair() {
    let tmp = TempDir::new().expect("tmp");
    let migrations = tmp.path().join("migrations");
    write_default(tmp.path(), &postgres_settings(&migrations));

    migctl(tmp.path())
        .args(["create", "add_users"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version 1 migration files created in"))
        .stdout(predicate::str::contains("0001_add_users.up.sql"))
        .stdout(predicate::str::contains("0001_add_users.down.sql"));

    migctl(tmp.path())
        .args(["create", "add_orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version 2 migration files created in"));

    assert!(migrations.join("0001_add_users.up.sql").exists());
    assert!(migrations.join("0002_add_orders.down.sql").exists());
}

#[test]
fn test_env_document_and_overrides_take_precedence() {
    let tmp = TempDir::new().expect("tmp");
    let default_migrations = tmp.path().join("default_migrations");
    let env_migrations = tmp.path().join("env_migrations");
    write_default(tmp.path(), &postgres_settings(&default_migrations));
    fs::write(
        tmp.path().join("env/docker.yml"),
        format!(
            "config:\n  db:\n    migration_dir: '{}'\n    driver: mysql\n    ip: mysql:3306\n    name: app\n",
            env_migrations.display()
        ),
    )
    .expect("write env config");

    // `user` is missing from the env document and only supplied by the environment
    migctl(tmp.path())
        .env("K_DB_USER", "docker")
        .args(["create", "init"])
        .assert()
        .success();

    assert!(env_migrations.join("0001_init.up.sql").exists());
    assert!(!default_migrations.exists());
}

#[test]
fn test_legacy_flag_syntax_selects_files_and_section() {
    let tmp = TempDir::new().expect("tmp");
    let migrations = tmp.path().join("warehouse");
    let conf = tmp.path().join("conf.yml");
    fs::write(
        &conf,
        format!(
            "default:\n  redshift:\n    migration_dir: '{}'\n    driver: postgres\n    user: analyst\n    ip: dw:5439\n    name: dw\n",
            migrations.display()
        ),
    )
    .expect("write config");

    migctl(tmp.path())
        .arg(format!("-def={}", conf.display()))
        .args(["-env", "missing.yml", "-section=redshift", "create", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Section - redshift"));

    assert!(migrations.join("0001_init.up.sql").exists());
}

#[cfg(unix)]
mod with_fake_engine {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    // Mimics the output of a golang-migrate CLI; `-path DIR -database URL` come first.
    const FAKE_ENGINE: &str = r#"#!/bin/sh
shift 4
case "$1" in
  version)
    echo 5 >&2
    ;;
  up)
    echo "1/u init (1.2ms)" >&2
    ;;
  down)
    if [ "$2" = "-all" ]; then
      echo "error: relation \"users\" does not exist" >&2
      exit 1
    fi
    echo "reverting $2"
    ;;
esac
"#;

    fn setup() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().expect("tmp");
        let migrations = tmp.path().join("migrations");
        fs::create_dir_all(&migrations).expect("mkdir migrations");
        fs::write(migrations.join("0001_init.up.sql"), "CREATE TABLE users (id int);").expect("write up");
        fs::write(migrations.join("0001_init.down.sql"), "DROP TABLE users;").expect("write down");
        write_default(tmp.path(), &postgres_settings(&migrations));

        let engine = tmp.path().join("fake-migrate");
        fs::write(&engine, FAKE_ENGINE).expect("write engine");
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).expect("chmod engine");
        (tmp, engine)
    }

    #[test]
    fn test_up_streams_applied_steps() {
        let (tmp, engine) = setup();
        migctl(tmp.path())
            .arg("--engine")
            .arg(&engine)
            .arg("up")
            .assert()
            .success()
            .stdout(predicate::str::contains("> 0001_init.up.sql"))
            .stdout(predicate::str::contains("seconds"));
    }

    #[test]
    fn test_failed_run_exits_with_failure() {
        let (tmp, engine) = setup();
        migctl(tmp.path())
            .arg("--engine")
            .arg(&engine)
            .arg("down")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("relation \"users\" does not exist"))
            .stdout(predicate::str::contains("seconds"));
    }

    #[test]
    fn test_reset_stops_after_failed_down() {
        let (tmp, engine) = setup();
        migctl(tmp.path())
            .arg("--engine")
            .arg(&engine)
            .arg("reset")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("> 0001_init.up.sql").not());
    }

    #[test]
    fn test_version_prints_engine_version() {
        let (tmp, engine) = setup();
        migctl(tmp.path())
            .arg("--engine")
            .arg(&engine)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::ends_with("5\n"));
    }

    #[test]
    fn test_goto_migrates_by_relative_offset() {
        let (tmp, engine) = setup();
        migctl(tmp.path())
            .arg("--engine")
            .arg(&engine)
            .args(["goto", "3"])
            .assert()
            .success()
            .stdout(predicate::str::contains("reverting 2"));
    }

    #[test]
    fn test_missing_engine_is_reported() {
        let (tmp, _) = setup();
        migctl(tmp.path())
            .args(["--engine", "/nonexistent/migrate", "version"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("failed to start migration engine"));
    }
}
