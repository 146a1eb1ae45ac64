use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/events.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"currentStep\": 2"))
        .stdout(predicate::str::contains("\"maxStep\": 2"))
        .stdout(predicate::str::contains("\"firstName\": \"Ann\""))
        .stdout(predicate::str::contains("\"productId\": 202"))
        .stdout(predicate::str::contains("\"sum\": \"1500\""))
        // Payment data never reaches the client view.
        .stdout(predicate::str::contains("payler").not());

    Ok(())
}
