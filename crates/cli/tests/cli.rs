use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn shelf(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.current_dir(dir.path())
        .env("SHELF_CONFIG_DIR", dir.path().join("config"))
        .env("SHELF_DATABASE__PATH", dir.path().join("shelf.db"))
        .env("SHELF_ENV", "local")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();

    shelf(&dir)
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("applied 1 migration(s)"));

    shelf(&dir)
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("applied 0 migration(s)"));
}

#[test]
fn add_list_and_clear() {
    let dir = TempDir::new().unwrap();

    shelf(&dir)
        .args(["add", "--title", "Dune", "--author", "Frank Herbert", "--year", "1965"])
        .assert()
        .success();

    shelf(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dune by Frank Herbert (1965)"));

    shelf(&dir)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"coverUrl\": \"default-cover.jpg\""));

    shelf(&dir)
        .args(["clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted 1 book(s)"));

    shelf(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("no books"));
}

#[test]
fn clear_requires_confirmation() {
    let dir = TempDir::new().unwrap();

    shelf(&dir)
        .args(["add", "--title", "Emma", "--author", "Jane Austen", "--year", "1815"])
        .assert()
        .success();

    shelf(&dir)
        .arg("clear")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    shelf(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Emma"));
}

#[test]
fn invalid_year_is_rejected() {
    let dir = TempDir::new().unwrap();

    shelf(&dir)
        .args(["add", "--title", "Old", "--author", "Someone", "--year", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Year must be at least 1000"));
}

#[test]
fn remove_unknown_id_fails() {
    let dir = TempDir::new().unwrap();

    shelf(&dir)
        .args(["remove", "not-a-real-id"])
        .assert()
        .failure();
}
