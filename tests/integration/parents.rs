//! Parent lookup: relative paths, external resolution and version ranges.

use std::sync::Arc;

use crate::common::{TestWorkspace, parent, pom, request};
use anyhow::Result;
use pomr::core::{PomrError, Severity};
use pomr::session::{ModelBuilder, RequestKind};
use pomr::spi::Strictness;
use pomr::test_utils::{CountingDocumentIo, MemoryResolver};

fn model_building(error: PomrError) -> pomr::core::ModelBuildingError {
    match error {
        PomrError::ModelBuilding(error) => *error,
        other => panic!("expected a model building error, got {other}"),
    }
}

#[tokio::test]
async fn test_explicit_relative_path_mismatch_falls_back_to_external() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    workspace.document("other", &pom("org.acme", "other", "1.0", "packaging = \"pom\"\n"))?;
    let app = workspace.document(
        "app",
        &format!(
            "artifact-id = \"app\"\n{}relative-path = \"../other\"\n",
            parent("org.acme", "base", "1.0")
        ),
    )?;

    let io = Arc::new(CountingDocumentIo::default());
    let resolver = Arc::new(MemoryResolver::new());
    let base = io.insert("mem:base", &pom("org.acme", "base", "1.0", "packaging = \"pom\"\n\n[properties]\norigin = \"external\"\n"));
    resolver.insert("org.acme:base:1.0", base);
    let session = ModelBuilder::new()
        .with_document_io(io.clone())
        .with_model_resolver(resolver.clone())
        .new_session();

    let error = model_building(session.build_effective(&request(app, RequestKind::Effective)).await.unwrap_err());
    let mismatch = error.problems().find(|p| p.message.starts_with("relativePath '../other'")).unwrap();
    assert_eq!(mismatch.severity, Severity::Fatal);
    assert!(mismatch.message.contains("org.acme:other:1.0"));
    assert!(mismatch.message.contains("org.acme:base:1.0"));
    assert_eq!(mismatch.field.as_deref(), Some("parent.relative-path"));

    assert_eq!(resolver.calls("org.acme:base:1.0"), 1);
    let result = error.result.unwrap();
    let effective = result.effective_document.as_ref().unwrap();
    assert_eq!(effective.properties.get("origin").map(String::as_str), Some("external"));
    assert_eq!(effective.id(), "org.acme:app:1.0");
    Ok(())
}

#[tokio::test]
async fn test_default_relative_path_mismatch_is_a_warning() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    workspace.document("", &pom("org.acme", "unrelated", "1.0", "packaging = \"pom\"\n"))?;
    workspace.install("org.acme:base:1.0", &pom("org.acme", "base", "1.0", "packaging = \"pom\"\n"))?;
    let app = workspace.document("app", &format!("artifact-id = \"app\"\n{}", parent("org.acme", "base", "1.0")))?;

    let result = workspace.session().build_effective(&request(app, RequestKind::Effective)).await?;
    let warning = result
        .problems
        .problems()
        .iter()
        .find(|p| p.message.starts_with("relativePath '..'"))
        .unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert!(warning.message.contains("org.acme:unrelated:1.0"));
    assert_eq!(result.parent_document.as_ref().unwrap().id(), "org.acme:base:1.0");
    Ok(())
}

#[tokio::test]
async fn test_parent_found_at_relative_path_is_not_resolved_externally() -> Result<()> {
    let io = Arc::new(CountingDocumentIo::default());
    let resolver = Arc::new(MemoryResolver::new());
    let workspace = TestWorkspace::new()?;
    workspace.document("", &pom("org.acme", "base", "1.0", "packaging = \"pom\"\n"))?;
    let app = workspace.document("app", &format!("artifact-id = \"app\"\n{}", parent("org.acme", "base", "1.0")))?;
    let session = ModelBuilder::new()
        .with_document_io(io)
        .with_model_resolver(resolver.clone())
        .new_session();

    let result = session.build_effective(&request(app, RequestKind::Effective)).await?;
    assert_eq!(result.parent_document.as_ref().unwrap().id(), "org.acme:base:1.0");
    assert!(result.problems.is_empty());
    assert_eq!(resolver.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_version_range_picks_highest_installed_parent() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    for version in ["1.0", "1.5", "2.0"] {
        let extra = format!("packaging = \"pom\"\n\n[properties]\nbase-release = \"{version}\"\n");
        workspace.install(&format!("org.acme:base:{version}"), &pom("org.acme", "base", version, &extra))?;
    }
    let app = workspace.document(
        "app",
        &format!("artifact-id = \"app\"\nversion = \"3.0\"\n{}", parent("org.acme", "base", "[1.0,2.0)")),
    )?;

    let result = workspace.session().build_effective(&request(app, RequestKind::Effective)).await?;
    assert_eq!(result.parent_document.as_ref().unwrap().id(), "org.acme:base:1.5");
    let effective = result.effective_document.as_ref().unwrap();
    assert_eq!(effective.id(), "org.acme:app:3.0");
    assert_eq!(effective.properties.get("base-release").map(String::as_str), Some("1.5"));
    Ok(())
}

#[tokio::test]
async fn test_range_parent_requires_constant_version() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    workspace.install("org.acme:base:1.5", &pom("org.acme", "base", "1.5", "packaging = \"pom\"\n"))?;
    let inherited = workspace.document("inherited", &format!("artifact-id = \"inherited\"\n{}", parent("org.acme", "base", "[1.0,2.0)")))?;
    let expression = workspace.document(
        "expression",
        &format!("artifact-id = \"expression\"\nversion = \"${{revision}}\"\n{}", parent("org.acme", "base", "[1.0,2.0)")),
    )?;

    let session = workspace.session();
    for (source, reason) in [(inherited, "inherited"), (expression, "expression")] {
        let error = model_building(session.build_effective(&request(source, RequestKind::Effective)).await.unwrap_err());
        let problem = error.problems().find(|p| p.message.starts_with("Version must be a constant")).unwrap();
        assert_eq!(problem.severity, Severity::Fatal);
        assert!(problem.message.contains(reason), "{}", problem.message);
        assert!(error.result.unwrap().effective_document.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_parent_is_fatal() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let app = workspace.document("app", &format!("artifact-id = \"app\"\n{}", parent("org.acme", "ghost", "1.0")))?;

    let error = model_building(workspace.session().build_effective(&request(app, RequestKind::Effective)).await.unwrap_err());
    let problem = error.problems().find(|p| p.message.starts_with("Non-resolvable parent")).unwrap();
    assert_eq!(problem.severity, Severity::Fatal);
    assert!(problem.message.contains("org.acme:ghost:1.0"));
    assert!(problem.cause.is_some());
    Ok(())
}

#[tokio::test]
async fn test_parent_lineage_is_not_shared_across_strictness() -> Result<()> {
    let io = Arc::new(CountingDocumentIo::default());
    let resolver = Arc::new(MemoryResolver::new());
    let duplicate = "\n[[dependencies]]\ngroup-id = \"org.lib\"\nartifact-id = \"core\"\nversion = \"1.0\"\n";
    let base = io.insert(
        "mem:base",
        &pom("org.acme", "base", "1.0", &format!("packaging = \"pom\"\n{duplicate}{duplicate}")),
    );
    resolver.insert("org.acme:base:1.0", base);
    let strict = io.insert("mem:strict", &format!("artifact-id = \"strict\"\n{}", parent("org.acme", "base", "1.0")));
    let lenient = io.insert("mem:lenient", &format!("artifact-id = \"lenient\"\n{}", parent("org.acme", "base", "1.0")));
    let session = ModelBuilder::new()
        .with_document_io(io.clone())
        .with_model_resolver(resolver)
        .new_session();

    let error = model_building(
        session
            .build_effective(&request(strict, RequestKind::Effective).with_strictness(Strictness::Strict))
            .await
            .unwrap_err(),
    );
    assert!(error.problems().any(|p| p.severity == Severity::Error && p.message.contains("must be unique")));

    let result = session
        .build_effective(&request(lenient, RequestKind::Effective).with_strictness(Strictness::Lenient))
        .await?;
    assert!(!result.has_errors());
    assert!(result.problems.problems().iter().any(|p| p.severity == Severity::Warning && p.message.contains("must be unique")));
    assert_eq!(io.reads("mem:base"), 1);
    Ok(())
}
