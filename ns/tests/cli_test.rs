//! CLI tests for the `ns` binary

use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const TUNNELS_0: &str = r#"{"noticeType":"Tunnels","showUser":false,"data":{"count":0},"timestamp":"2015-01-28T17:35:13Z"}"#;
const TUNNELS_2: &str = r#"{"noticeType":"Tunnels","showUser":false,"data":{"count":2},"timestamp":"2015-01-28T17:35:14Z"}"#;
const UNTUNNELED: &str = r#"{"noticeType":"Untunneled","showUser":true,"data":{"address":"10.0.0.1"},"timestamp":"2015-01-28T17:35:15Z"}"#;

/// Helper: build a Command for `ns` with config, data and working dirs inside a tempdir.
/// Returns (command, _guard) - keep the guard alive for the test's duration.
fn ns_cmd() -> (assert_cmd::Command, TempDir) {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("ns");
    cmd.timeout(Duration::from_secs(15));
    cmd.current_dir(tmp.path());
    cmd.env("HOME", tmp.path());
    cmd.env("XDG_CONFIG_HOME", tmp.path().join("config"));
    cmd.env("XDG_DATA_HOME", tmp.path().join("data"));
    cmd.env("NO_COLOR", "1");
    (cmd, tmp)
}

#[test]
fn test_rewrite_from_stdin() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.args(["rewrite", "--no-color"])
        .write_stdin(format!("{TUNNELS_0}\nnot json\n{TUNNELS_2}"))
        .assert()
        .success()
        .stdout(
            "2015-01-28T17:35:13Z Tunnels {\"count\":0}\n  \n2015-01-28T17:35:14Z Tunnels {\"count\":2}\n",
        );
}

#[test]
fn test_rewrite_exclude_sensitive_from_file() {
    let (mut cmd, tmp) = ns_cmd();
    let input = tmp.path().join("notices.log");
    std::fs::write(&input, format!("{TUNNELS_2}\n{UNTUNNELED}\n")).unwrap();

    cmd.args(["rewrite", "--no-color", "--exclude-sensitive", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("Tunnels").and(contains("10.0.0.1").not()));
}

#[test]
fn test_tunnels_reports_transitions() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.arg("tunnels")
        .write_stdin(format!("{TUNNELS_0}\n{TUNNELS_2}\n{TUNNELS_2}\n"))
        .assert()
        .success()
        .stdout(contains("disconnected").and(contains("connected (2 tunnels)")));
}

#[test]
fn test_emit_to_stderr() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.args(["emit", "ListeningSocksProxyPort", "port=1080"])
        .assert()
        .success()
        .stderr(
            contains(r#"{"noticeType":"ListeningSocksProxyPort","showUser":false,"data":{"port":1080},"timestamp":""#),
        );
}

#[test]
fn test_emit_to_file_appends() {
    let (_, tmp) = ns_cmd();
    let output = tmp.path().join("out.log");

    for count in ["0", "1"] {
        let (mut cmd, _guard) = ns_cmd();
        cmd.args(["emit", "Tunnels", &format!("count={count}"), "--output"])
            .arg(&output)
            .assert()
            .success()
            .stderr("");
    }

    let contents = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(r#""data":{"count":0}"#));
    assert!(lines[1].contains(r#""data":{"count":1}"#));
}

#[test]
fn test_emit_rejects_unknown_kind() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.args(["emit", "Teleported"])
        .assert()
        .failure()
        .stderr(contains("Unknown notice type"));
}

#[test]
fn test_emit_rejects_unknown_field() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.args(["emit", "Tunnels", "port=1"])
        .assert()
        .failure()
        .stderr(contains("has no field 'port'"));
}

#[test]
fn test_emit_rejects_wrongly_typed_value() {
    let (mut cmd, tmp) = ns_cmd();
    let output = tmp.path().join("out.log");
    cmd.args(["emit", "Tunnels", "count=many", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(contains("Tunnels field 'count' expects int, got 'many'"));
    assert!(std::fs::read_to_string(&output).unwrap_or_default().is_empty());
}

#[test]
fn test_emit_rejects_missing_field() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.args(["emit", "ConnectingServer", "ipAddress=192.0.2.1"])
        .assert()
        .failure()
        .stderr(contains("ConnectingServer requires field 'region'"));
}

#[test]
fn test_emit_show_user_override() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.args(["emit", "Homepage", "url=https://example.com/", "--show-user", "true"])
        .assert()
        .success()
        .stderr(contains(
            r#"{"noticeType":"Homepage","showUser":true,"data":{"url":"https://example.com/"},"timestamp":""#,
        ));
}

#[test]
fn test_kinds_lists_taxonomy() {
    let (mut cmd, _tmp) = ns_cmd();
    cmd.arg("kinds")
        .assert()
        .success()
        .stdout(contains("ConnectingServer").and(contains("frontingAddress")).and(contains("[sensitive]")));
}
