/*
 *  tests/startup_failure.rs
 *
 *  The binary refuses to run without its panel
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 */

use std::fs;
use std::process::{Command, Output};

fn oledstat(args: &[&str]) -> Output {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.yaml");
    fs::write(&config, "log_level: info\n").unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_oledstat"));
    cmd.arg("--config").arg(&config).args(args);
    cmd.env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("OLEDSTAT_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("HOME", home.path()).current_dir(home.path());
    cmd.output().unwrap()
}

#[test]
fn test_missing_bus_exits_non_zero_with_one_error() {
    let output = oledstat(&["--driver", "ssd1306", "--i2c-bus", "/dev/i2c-does-not-exist", "--no-splash"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "exited cleanly:\n{}", stderr);

    let errors: Vec<&str> = stderr.lines().filter(|l| l.contains("ERROR")).collect();
    assert_eq!(errors.len(), 1, "stderr:\n{}", stderr);
    assert!(errors[0].contains("/dev/i2c-does-not-exist"), "{}", errors[0]);
}

#[test]
fn test_rejected_config_exits_non_zero_with_one_error() {
    let output = oledstat(&["--driver", "mock", "--interval-secs", "0"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert_eq!(stderr.lines().filter(|l| l.contains("ERROR")).count(), 1, "stderr:\n{}", stderr);
}
