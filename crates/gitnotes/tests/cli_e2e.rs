#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn gitnotes(home: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("gitnotes"));
    cmd.env("GITNOTES_HOME", home.as_os_str())
        .env_remove("GITNOTES_LOG");
    cmd
}

#[test]
fn test_note_lifecycle() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    gitnotes(home)
        .args(["note", "add", "Shopping", "--body", "milk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Note created (1): Shopping"));

    gitnotes(home)
        .args(["note", "add", "Ideas"])
        .write_stdin("launch plan\n")
        .assert()
        .success();

    gitnotes(home)
        .assert()
        .success()
        .stdout(predicate::str::contains("Shopping").and(predicate::str::contains("Ideas")));

    gitnotes(home)
        .args(["note", "show", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("launch plan"));

    gitnotes(home)
        .args(["note", "edit", "1", "--body", "eggs"])
        .assert()
        .success();

    gitnotes(home)
        .args(["note", "rm", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Note deleted (2)"));

    gitnotes(home)
        .args(["note", "list", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"eggs\"").and(predicate::str::contains("Ideas").not()));
}

#[test]
fn test_unknown_note_fails() {
    let temp = TempDir::new().unwrap();
    gitnotes(temp.path())
        .args(["note", "show", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Note not found: 9"));
}

#[test]
fn test_repository_management() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    gitnotes(home)
        .args(["note", "add", "Shopping", "--body", "milk"])
        .assert()
        .success();

    gitnotes(home)
        .args(["repo", "create", "notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repository created: notes"));
    let tree = home.join("repos").join("notes");
    assert!(tree.join(".git").is_dir());
    assert_eq!(fs::read_to_string(tree.join("Shopping.txt")).unwrap(), "milk");

    gitnotes(home)
        .args(["repo", "create", "notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    gitnotes(home)
        .args(["repo", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes").and(predicate::str::contains("No remote link")));

    gitnotes(home)
        .args(["repo", "create", "bad name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid repository name"));

    gitnotes(home)
        .args(["repo", "rm", "notes"])
        .assert()
        .success();
    assert!(!tree.exists());
}

#[test]
fn test_push_then_clone_elsewhere() {
    let temp = TempDir::new().unwrap();
    let remote = temp.path().join("shared.git");
    git2::Repository::init_bare(&remote).unwrap();
    let url = format!("file://{}", remote.display());
    let alice = temp.path().join("alice");
    let bob = temp.path().join("bob");

    gitnotes(&alice)
        .args(["note", "add", "Shopping", "--body", "milk"])
        .assert()
        .success();
    gitnotes(&alice)
        .args(["repo", "create", "notes", "--remote", &url])
        .assert()
        .success();
    gitnotes(&alice)
        .args(["push", "notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pushed 1 notes to notes"));

    gitnotes(&bob)
        .args(["clone", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cloned shared: 1 added, 0 updated"));

    gitnotes(&bob)
        .args(["note", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("milk"));
}

#[test]
fn test_push_without_link_explains() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    gitnotes(home)
        .args(["repo", "create", "notes"])
        .assert()
        .success();
    gitnotes(home)
        .args(["push", "notes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no remote link"));
}

#[test]
fn test_login_validates_token() {
    let temp = TempDir::new().unwrap();
    let home = temp.path();

    gitnotes(home)
        .args(["login", "--token", "hunter2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a valid personal access token"));

    let token = format!("ghp_{}", "a".repeat(36));
    gitnotes(home)
        .args(["login", "--token", &token, "--username", "octocat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Credentials saved for octocat"));
}
