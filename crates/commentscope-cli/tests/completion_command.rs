use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_commentscope_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("commentscope")
}

#[test]
fn test_completion_bash_generates_script() {
    let mut cmd = Command::new(get_commentscope_bin());
    cmd.arg("--completion").arg("bash");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("_commentscope()"))
        .stdout(predicate::str::contains("complete -F _commentscope"));
}

#[test]
fn test_completion_zsh_generates_script() {
    let mut cmd = Command::new(get_commentscope_bin());
    cmd.arg("--completion").arg("zsh");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("#compdef commentscope"));
}

#[test]
fn test_completion_fish_lists_flags() {
    let mut cmd = Command::new(get_commentscope_bin());
    cmd.arg("--completion").arg("fish");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("complete -c commentscope"))
        .stdout(predicate::str::contains("scrape-headlines"));
}

#[test]
fn test_completion_rejects_unknown_shell() {
    let mut cmd = Command::new(get_commentscope_bin());
    cmd.arg("--completion").arg("tcsh");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
