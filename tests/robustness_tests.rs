use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_events_are_skipped() {
    let output_path = std::path::PathBuf::from("robustness_events.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(["op", "name", "value"]).unwrap();

    // Valid field update
    wtr.write_record(["field", "firstName", "Ann"]).unwrap();
    // Unknown op
    wtr.write_record(["teleport", "x", "y"]).unwrap();
    // Bulk payload that is not JSON
    wtr.write_record(["bulk", "", "not-json"]).unwrap();
    // Valid field update again
    wtr.write_record(["field", "lastName", "Doe"]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(&output_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stderr(predicate::str::contains("Error processing event"))
        .stdout(predicate::str::contains("\"firstName\": \"Ann\""))
        .stdout(predicate::str::contains("\"lastName\": \"Doe\""));

    std::fs::remove_file(output_path).ok();
}

#[test]
fn test_missing_upload_path_does_not_abort_replay() {
    let output_path = std::path::PathBuf::from("robustness_file_events.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(["op", "name", "value"]).unwrap();
    wtr.write_record(["file", "id_front", "does_not_exist.jpg"])
        .unwrap();
    wtr.write_record(["field", "firstName", "Ann"]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(&output_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error processing event"))
        .stdout(predicate::str::contains("\"firstName\": \"Ann\""));

    std::fs::remove_file(output_path).ok();
}
