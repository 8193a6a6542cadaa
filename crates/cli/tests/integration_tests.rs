/// End-to-end tests for the cdb CLI: build from a dump, look keys up, and
/// dump a database back out, all through the real binary.
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Runs the CLI with the given arguments and returns (stdout, success).
fn run_cli(args: &[&str]) -> (String, bool) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "cli", "--"])
        .args(args)
        .output()
        .expect("failed to spawn CLI");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        output.status.success(),
    )
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is valid utf-8")
}

#[test]
fn make_then_get() {
    let dir = tempdir().unwrap();
    let dump_path = dir.path().join("airports.dump");
    let cdb_path = dir.path().join("airports.cdb");
    std::fs::write(
        &dump_path,
        b"+3,15:LHR->London Heathrow\n+3,9:SFO->San Pablo\n\n",
    )
    .unwrap();

    let (out, ok) = run_cli(&["make", path_str(&cdb_path), path_str(&dump_path)]);
    assert!(ok, "make failed: {}", out);
    assert!(out.contains("2 records"));

    let (out, ok) = run_cli(&["get", path_str(&cdb_path), "LHR"]);
    assert!(ok);
    assert!(out.contains("London Heathrow"));

    let (out, ok) = run_cli(&["get", path_str(&cdb_path), "JFK"]);
    assert!(ok);
    assert!(out.contains("(not found)"));
}

#[test]
fn get_all_prints_every_value() {
    let dir = tempdir().unwrap();
    let dump_path = dir.path().join("multi.dump");
    let cdb_path = dir.path().join("multi.cdb");
    std::fs::write(&dump_path, b"+1,5:k->first\n+1,6:k->second\n\n").unwrap();

    let (out, ok) = run_cli(&["make", path_str(&cdb_path), path_str(&dump_path)]);
    assert!(ok, "make failed: {}", out);

    let (out, ok) = run_cli(&["get", path_str(&cdb_path), "k", "--all"]);
    assert!(ok);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["first", "second"]);
}

#[test]
fn dump_round_trips_the_database() {
    let dir = tempdir().unwrap();
    let dump_in = dir.path().join("in.dump");
    let cdb_path = dir.path().join("roundtrip.cdb");
    let dump_out = dir.path().join("out.dump");
    let original = b"+3,5:one->first\n+3,6:two->second\n+3,5:one->third\n\n";
    std::fs::write(&dump_in, original).unwrap();

    let (out, ok) = run_cli(&["make", path_str(&cdb_path), path_str(&dump_in)]);
    assert!(ok, "make failed: {}", out);

    let (out, ok) = run_cli(&["dump", path_str(&cdb_path), path_str(&dump_out)]);
    assert!(ok, "dump failed: {}", out);

    // insertion order is preserved end to end, so the bytes match exactly
    assert_eq!(std::fs::read(&dump_out).unwrap(), original);
}

#[test]
fn make_with_a_malformed_dump_fails_and_leaves_no_database() {
    let dir = tempdir().unwrap();
    let dump_path = dir.path().join("bad.dump");
    let cdb_path = dir.path().join("bad.cdb");
    std::fs::write(&dump_path, b"-3,5:one->first\n\n").unwrap();

    let (_, ok) = run_cli(&["make", path_str(&cdb_path), path_str(&dump_path)]);
    assert!(!ok);
    assert!(!cdb_path.exists());
}

#[test]
fn unknown_command_fails_with_usage() {
    let (_, ok) = run_cli(&["frobnicate"]);
    assert!(!ok);
}
