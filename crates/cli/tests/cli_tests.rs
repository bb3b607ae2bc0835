//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

const ARTICLE: &str = "https://www.economist.com/business/2024/05/01/example-slug";

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("broadsheet")
}

#[test]
fn test_cli_empty_stdin() {
    cmd().write_stdin("").assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn test_cli_empty_stdin_verbose() {
    cmd()
        .arg("-v")
        .write_stdin("\n  \n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<stdin> is empty."));
}

#[test]
fn test_cli_non_article_lines_are_skipped() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-d", tmp.path().to_str().unwrap()])
        .write_stdin("https://example.com/hello\nhttp://www.economist.com/business/2024/05/01/x\nnot a url\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_cli_verbose_non_article() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-v", "-d", tmp.path().to_str().unwrap()])
        .write_stdin("https://example.com/hello\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ctrl + Click to open file."))
        .stderr(predicate::str::contains("Broadsheet"))
        .stderr(predicate::str::contains("Not an article"));
}

#[test]
fn test_cli_quiet_non_article() {
    cmd()
        .arg("-q")
        .write_stdin("https://example.com/hello\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_cli_verbose_conflicts_with_quiet() {
    cmd().args(["-v", "-q"]).write_stdin("").assert().failure();
}

#[test]
fn test_cli_unknown_option() {
    cmd()
        .arg("--bogus")
        .write_stdin(ARTICLE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--text-only"))
        .stdout(predicate::str::contains("--http-proxy"))
        .stdout(predicate::str::contains("--url-prefix"));
}

#[test]
fn test_cli_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_invalid_proxy() {
    cmd()
        .args(["-p", "not a proxy"])
        .write_stdin(ARTICLE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to set up the converter"));
}

#[test]
fn test_cli_fetch_failure_is_reported() {
    let tmp = TempDir::new().unwrap();

    // nothing listens on the discard port, so the proxy connection is refused
    cmd()
        .args(["-d", tmp.path().to_str().unwrap(), "-p", "http://127.0.0.1:9", "--timeout", "5"])
        .write_stdin(format!("https://example.com/hello\n{ARTICLE}\n"))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(ARTICLE))
        .stderr(predicate::str::contains("[fetch]"));

    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_cli_verbose_failure_is_reported_once() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .env_remove("RUST_LOG")
        .args(["-v", "-d", tmp.path().to_str().unwrap(), "-p", "http://127.0.0.1:9", "--timeout", "5"])
        .write_stdin(format!("{ARTICLE}\n"))
        .assert()
        .failure()
        .stderr(predicate::function(|stderr: &str| stderr.matches("[fetch]").count() == 1));
}

#[test]
fn test_cli_missing_font_dir() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["--fonts", tmp.path().to_str().unwrap()])
        .write_stdin(ARTICLE)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MiloTE.ttf"));
}
