//! The `pomr` binary end to end.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::{TestWorkspace, parent, pom};

fn pomr(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("pomr").unwrap();
    cmd.env("POMR_CONFIG_PATH", workspace.path("no-config.toml"))
        .env("POMR_REPOSITORY", workspace.repository())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .current_dir(workspace.root());
    cmd
}

#[test]
fn test_effective_prints_inherited_json() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .install(
            "org.acme:base:1.0",
            &pom("org.acme", "base", "1.0", "packaging = \"pom\"\n\n[properties]\nrelease = \"17\"\n"),
        )
        .unwrap();
    workspace
        .document("app", &format!("artifact-id = \"app\"\n{}", parent("org.acme", "base", "1.0")))
        .unwrap();

    pomr(&workspace)
        .args(["--quiet", "effective", "app", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"artifact-id\": \"app\""))
        .stdout(predicate::str::contains("\"group-id\": \"org.acme\""))
        .stdout(predicate::str::contains("\"release\": \"17\""));
}

#[test]
fn test_effective_applies_defined_properties() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .document(
            "",
            &pom(
                "org.acme",
                "app",
                "1.0",
                "description = \"built for ${target}\"\n\n[[profiles]]\nid = \"prod\"\nactivation = { property = { name = \"target\", value = \"prod\" } }\nproperties = { level = \"high\" }\n",
            ),
        )
        .unwrap();

    pomr(&workspace)
        .args(["-q", "effective", "pom.toml", "-D", "target=prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("description = \"built for prod\""))
        .stdout(predicate::str::contains("level = \"high\""));
}

#[test]
fn test_raw_prints_document_as_read() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .document("app", &format!("artifact-id = \"app\"\n{}", parent("org.acme", "base", "1.0")))
        .unwrap();

    pomr(&workspace)
        .args(["-q", "raw", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("artifact-id = \"app\""))
        .stdout(predicate::str::contains("[parent]"));
}

#[test]
fn test_project_lists_every_document() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .document("", &pom("org.acme", "root", "1.0", "packaging = \"pom\"\nmodules = [\"core\"]\n"))
        .unwrap();
    workspace
        .document("core", &format!("artifact-id = \"core\"\n{}", parent("org.acme", "root", "1.0")))
        .unwrap();

    pomr(&workspace)
        .args(["-q", "project", "--max-parallel", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("org.acme:root:1.0\n  org.acme:core:1.0\n"))
        .stdout(predicate::str::contains("2 documents"));
}

#[test]
fn test_failing_project_exits_with_error() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .document("", &pom("org.acme", "root", "1.0", "packaging = \"pom\"\nmodules = [\"missing\"]\n"))
        .unwrap();

    pomr(&workspace)
        .args(["-q", "project"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Child module 'missing'"))
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_document_is_reported() {
    let workspace = TestWorkspace::new().unwrap();

    pomr(&workspace)
        .args(["-q", "effective", "nowhere"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No pom.toml found"));
}
