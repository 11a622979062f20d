//! CLI behaviour of the demo plugin process.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn manifest_goes_to_stdout() {
    Command::cargo_bin("geata-greet")
        .unwrap()
        .args(["--manifest", "greeter"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "call remote#host#RegisterPlugin('greeter', '0', [",
        ))
        .stdout(predicate::str::contains("'name': 'Greet'"))
        .stdout(predicate::str::contains("'name': 'GreetCount'"))
        .stdout(predicate::str::ends_with("\\ ])\n"));
}

#[test]
fn manifest_merges_into_the_location_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugins.vim");
    std::fs::write(
        &path,
        "\" plugins\ncall remote#host#RegisterPlugin('other', '0', [\n\\ ])\nset hidden\n",
    )
    .unwrap();

    let merge = || {
        Command::cargo_bin("geata-greet")
            .unwrap()
            .args(["--manifest", "greeter", "--location", path.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    };

    merge();
    let first = std::fs::read_to_string(&path).unwrap();
    assert!(first.contains("RegisterPlugin('greeter'"));
    assert!(first.contains("RegisterPlugin('other'"));
    assert!(first.starts_with("\" plugins\n"));

    // A second pass is a no-op.
    merge();
    let second = std::fs::read_to_string(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn a_missing_location_file_is_fatal() {
    Command::cargo_bin("geata-greet")
        .unwrap()
        .args(["--manifest", "greeter", "--location", "/nonexistent/plugins.vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest file"));
}
