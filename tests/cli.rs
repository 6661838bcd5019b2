//! Binary smoke tests for the memlens CLI.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("memlens-{}-{name}", uuid::Uuid::new_v4()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn instrument_preserves_line_count() {
    let src = "int main(void) {\n    int a = 1;\n    return 0;\n}\n";
    let path = write_temp("src.c", src);
    let assert = Command::cargo_bin("memlens")
        .unwrap()
        .args(["instrument"])
        .arg(&path)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), src.lines().count());
    assert!(stdout.contains("@@MEMLENS@@"));
    fs::remove_file(path).ok();
}

#[test]
fn demux_separates_output_from_events() {
    let capture = "hello\n@@MEMLENS@@{\"kind\":\"var\",\"line\":1,\"name\":\"a\",\"value\":\"1\",\"addr\":\"0x10\"}\n";
    let path = write_temp("capture.txt", capture);
    Command::cargo_bin("memlens")
        .unwrap()
        .args(["demux"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("[var]"));
    fs::remove_file(path).ok();
}

#[test]
fn replay_renders_state_at_step() {
    let capture = concat!(
        "@@MEMLENS@@{\"kind\":\"var\",\"line\":1,\"name\":\"a\",\"value\":\"1\",\"addr\":\"0x10\"}\n",
        "@@MEMLENS@@{\"kind\":\"assign\",\"line\":2,\"name\":\"a\",\"value\":\"5\"}\n",
    );
    let path = write_temp("capture.txt", capture);
    Command::cargo_bin("memlens")
        .unwrap()
        .args(["replay", "--step", "1", "--complete"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("a = 5"))
        .stdout(predicate::str::contains("updated a: 1 → 5"));
    fs::remove_file(path).ok();
}

#[test]
fn missing_file_fails_with_context() {
    Command::cargo_bin("memlens")
        .unwrap()
        .args(["instrument", "/nonexistent/source.c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading /nonexistent/source.c"));
}
