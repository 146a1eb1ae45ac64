mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_generate_field_events() {
    let output_path = std::path::PathBuf::from("test_generated_events.csv");
    common::generate_field_events(&output_path, 5).expect("Failed to generate CSV");

    let content = std::fs::read_to_string(&output_path).expect("Failed to read file");
    // Header + 5 rows = 6 lines
    assert_eq!(content.lines().count(), 6);

    std::fs::remove_file(output_path).ok();
}

#[test]
fn test_long_replay_keeps_last_value() {
    let output_path = std::path::PathBuf::from("test_replay_events.csv");
    common::generate_field_events(&output_path, 500).expect("Failed to generate CSV");

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(&output_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"counterValue\": \"500\""));

    std::fs::remove_file(output_path).ok();
}
