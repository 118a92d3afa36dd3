//! Black-box end-to-end tests driving the `niwa` binary as a subprocess,
//! one invocation per line, the way an LLM agent actually uses it.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use std::process::Command;

fn niwa(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("niwa").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

fn init(dir: &TempDir) {
    niwa(dir).args(["init", "."]).assert().success();
}

#[test]
fn init_creates_niwa_dir() {
    let dir = TempDir::new().unwrap();
    niwa(&dir).args(["init", "."]).assert().success().stdout(predicate::str::contains("INITIALIZED"));
    dir.child(".niwa").assert(predicate::path::is_dir());
}

#[test]
fn tree_after_init_shows_root() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir)
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("root").and(predicate::str::contains("Document")));
}

#[test]
fn init_twice_is_safe() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["init", "."]).assert().success();
}

#[test]
fn add_reports_node_id() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir)
        .args(["add", "My Section", "--agent", "test_agent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NODE_ID:").and(predicate::str::contains("h1_0")));
}

#[test]
fn add_duplicate_sibling_title_fails() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Dupe", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["add", "Dupe", "--agent", "a2"]).assert().failure();
}

#[test]
fn add_duplicate_title_under_different_parents_is_allowed() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Parent A", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["add", "Parent B", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["add", "Notes", "--agent", "a1", "--parent", "h1_0"]).assert().success();
    niwa(&dir).args(["add", "Notes", "--agent", "a1", "--parent", "h1_1"]).assert().success();
}

#[test]
fn add_with_content_via_file() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let content_file = dir.child("content.md");
    content_file.write_str("This is the detailed content\nwith multiple lines.").unwrap();
    niwa(&dir)
        .args(["add", "From File", "--agent", "a1", "--file"])
        .arg(content_file.path())
        .assert()
        .success();

    niwa(&dir)
        .args(["peek", "h1_0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("detailed content"));
}

#[test]
fn read_then_edit_happy_path() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Section", "--agent", "a1"]).assert().success();

    niwa(&dir)
        .args(["read", "h1_0", "--agent", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("READ SUCCESSFULLY"));

    niwa(&dir)
        .args(["edit", "h1_0", "new content", "--agent", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EDIT SUCCESSFUL"));
}

#[test]
fn edit_without_read_is_rejected() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Section", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["edit", "h1_0", "content", "--agent", "a1"]).assert().failure();
}

#[test]
fn concurrent_edit_is_quarantined_as_conflict() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Shared", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["read", "h1_0", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["read", "h1_0", "--agent", "a2"]).assert().success();

    niwa(&dir).args(["edit", "h1_0", "a1 version", "--agent", "a1"]).assert().success();

    niwa(&dir)
        .args(["edit", "h1_0", "a2 version", "--agent", "a2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflict"));

    niwa(&dir)
        .args(["conflicts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("h1_0"));
}

#[test]
fn resolve_accept_yours_recovers_quarantined_write() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Shared", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["read", "h1_0", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["read", "h1_0", "--agent", "a2"]).assert().success();
    niwa(&dir).args(["edit", "h1_0", "a1 version", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["edit", "h1_0", "a2 version", "--agent", "a2"]).assert().failure();

    niwa(&dir)
        .args(["resolve", "h1_0", "ACCEPT_YOURS", "--agent", "a2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RESOLVED"));

    niwa(&dir).args(["conflicts"]).assert().success().stdout(predicate::str::contains("no pending"));
}

#[test]
fn no_conflict_after_sequential_reads() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Section", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["read", "h1_0", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["edit", "h1_0", "first edit", "--agent", "a1"]).assert().success();

    niwa(&dir).args(["read", "h1_0", "--agent", "a2"]).assert().success();
    niwa(&dir)
        .args(["edit", "h1_0", "second edit", "--agent", "a2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EDIT SUCCESSFUL"));
}

#[test]
fn export_preserves_hierarchy() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Top", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["add", "Mid", "--agent", "a1", "--parent", "h1_0"]).assert().success();
    niwa(&dir).args(["add", "Bottom", "--agent", "a1", "--parent", "h2_0"]).assert().success();

    niwa(&dir).args(["read", "h2_0", "--agent", "a1"]).assert().success();
    niwa(&dir).args(["edit", "h2_0", "mid content", "--agent", "a1"]).assert().success();

    niwa(&dir)
        .arg("export")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("# Top")
                .and(predicate::str::contains("## Mid"))
                .and(predicate::str::contains("### Bottom"))
                .and(predicate::str::contains("mid content")),
        );
}

#[test]
fn search_matches_title_and_content_case_insensitively() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "UPPERCASE TITLE", "--agent", "a1"]).assert().success();
    niwa(&dir)
        .args(["search", "uppercase"])
        .assert()
        .success()
        .stdout(predicate::str::contains("h1_0"));
}

#[test]
fn check_reports_ok_on_a_clean_store() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    niwa(&dir).args(["add", "Section", "--agent", "a1"]).assert().success();
    niwa(&dir).arg("check").assert().success().stdout(predicate::str::contains("OK"));
}

#[test]
fn load_markdown_document_builds_tree() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let doc = dir.child("doc.md");
    doc.write_str("# Intro\n\nhello\n\n## Details\n\nmore\n").unwrap();

    niwa(&dir)
        .args(["load", "--agent", "a1"])
        .arg(doc.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("LOADED 2 node(s)"));

    niwa(&dir)
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("Intro").and(predicate::str::contains("Details")));
}
