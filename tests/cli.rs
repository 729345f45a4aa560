//! Command-line surface tests for the `gvend` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn gvend(project: &Path, goroot: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gvend"))
        .args(args)
        .current_dir(project)
        .env("GOROOT", goroot)
        .env("GOPATH", project.join("gopath"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run gvend")
}

fn fake_goroot(root: &Path) -> std::path::PathBuf {
    let goroot = root.join("goroot");
    fs::create_dir_all(goroot.join("src/fmt")).unwrap();
    fs::write(goroot.join("src/fmt/fmt.go"), "package fmt\n").unwrap();
    goroot
}

#[test]
fn test_list_on_fresh_project() {
    let tmp = tempfile::tempdir().unwrap();
    let goroot = fake_goroot(tmp.path());
    let project = tmp.path().join("app");
    fs::create_dir_all(&project).unwrap();

    let out = gvend(&project, &goroot, &["list"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("No vendored dependencies"));
}

#[test]
fn test_list_shows_manifest_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let goroot = fake_goroot(tmp.path());
    let project = tmp.path().join("app");
    fs::create_dir_all(project.join("vendor")).unwrap();
    fs::write(
        project.join("vendor/manifest"),
        r#"{
	"version": 0,
	"dependencies": [
		{
			"importpath": "github.com/pkg/errors",
			"repository": "https://github.com/pkg/errors",
			"revision": "645ef00459ed84a119197bfb8d8205042c6df63d",
			"branch": "master"
		}
	]
}
"#,
    )
    .unwrap();

    let out = gvend(&project, &goroot, &["list"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("github.com/pkg/errors"));
}

#[test]
fn test_fetch_rejects_branch_with_tag() {
    let tmp = tempfile::tempdir().unwrap();
    let goroot = fake_goroot(tmp.path());

    let out = gvend(
        tmp.path(),
        &goroot,
        &["fetch", "--branch", "main", "--tag", "v1", "github.com/a/b"],
    );
    assert_eq!(out.status.code(), Some(2));
    assert!(!tmp.path().join("vendor").exists());
}

#[test]
fn test_fetch_insecure_url_needs_precaire() {
    let tmp = tempfile::tempdir().unwrap();
    let goroot = fake_goroot(tmp.path());

    let out = gvend(tmp.path(), &goroot, &["fetch", "http://example.com/a/b"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--precaire"));
    assert!(!tmp.path().join("vendor/manifest").exists());
}

#[test]
fn test_delete_unknown_dependency_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let goroot = fake_goroot(tmp.path());
    fs::create_dir_all(tmp.path().join("vendor")).unwrap();
    fs::write(
        tmp.path().join("vendor/manifest"),
        "{\"version\":0,\"dependencies\":[]}",
    )
    .unwrap();

    let out = gvend(tmp.path(), &goroot, &["delete", "github.com/a/b"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not vendored"));
}

#[test]
fn test_completion_script() {
    let tmp = tempfile::tempdir().unwrap();
    let goroot = fake_goroot(tmp.path());

    let out = gvend(tmp.path(), &goroot, &["completion", "bash"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("gvend"));
}
