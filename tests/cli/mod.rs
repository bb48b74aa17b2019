use assert_cmd::prelude::*; // Add methods on commands
use eavstore::config::schema::DEFAULT_SQLITE_DB;
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::process::{Command, Output}; // Run programs
use tempfile::{Builder, TempDir};

mod basic;
mod errors;

const TEST_CONFIG_FILE: &str = "eavstore-test.toml";

fn setup_temp_config_and_data_dir(extra: &str) -> std::io::Result<TempDir> {
    let temp_dir = Builder::new()
        .prefix("eavstore-test-dir")
        .rand_bytes(5)
        .tempdir()?;

    let file_path = temp_dir.path().join(TEST_CONFIG_FILE);
    let mut conf_file = File::create(file_path)?;

    let dsn = temp_dir.path().join(DEFAULT_SQLITE_DB).display().to_string();

    let config_str = format!(
        r#"
[catalog]
type = "sqlite"
dsn = "{}"
{extra}
"#,
        dsn.escape_default(),
    );

    write!(conf_file, "{config_str}")?;
    Ok(temp_dir)
}

fn eavstore(temp_dir: &TempDir, args: &[&str]) -> Output {
    Command::cargo_bin("eavstore")
        .expect("eavstore bin exists")
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .args(args)
        .output()
        .expect("eavstore runs")
}

// Run a command that is expected to succeed and parse its single line of output
fn eavstore_json(temp_dir: &TempDir, args: &[&str]) -> Value {
    let output = eavstore(temp_dir, args);
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.trim().lines().collect();
    assert_eq!(lines.len(), 1, "{stdout}");
    serde_json::from_str(lines[0]).expect("stdout is JSON")
}
