//! Project builds: aggregation, module discovery and the reactor.

use crate::common::{TestWorkspace, parent, pom, request};
use anyhow::Result;
use pomr::core::PomrError;
use pomr::graph::{effective_node, parent_node};
use pomr::session::RequestKind;

const ROOT_PROPERTIES: &str = "packaging = \"pom\"\nmodules = [\"a\", \"b\"]\n\n[properties]\nshared = \"yes\"\n";

/// R aggregates A and B. A declares no parent and inherits nothing; B names R as
/// its parent through the default relative path. Aggregation is not inheritance,
/// so no cycle is reported.
#[tokio::test]
async fn test_root_with_independent_and_inheriting_children() -> Result<()> {
    pomr::test_utils::init_test_logging(None);
    let workspace = TestWorkspace::new()?;
    let root = workspace.document("", &pom("org.acme", "root", "1.0", ROOT_PROPERTIES))?;
    let a = workspace.document("a", &pom("org.acme", "a", "1.0", ""))?;
    let b = workspace.document("b", &format!("artifact-id = \"b\"\n{}", parent("org.acme", "root", "1.0")))?;

    let session = workspace.session();
    let result = session.build(&request(root.clone(), RequestKind::Project)).await?;

    assert_eq!(result.children.len(), 2);
    let (first, second) = (&result.children[0], &result.children[1]);
    assert_eq!(first.id(), "org.acme:a:1.0");
    assert_eq!(second.id(), "org.acme:b:1.0");

    let a_effective = first.effective_document.as_ref().unwrap();
    assert!(a_effective.parent.is_none());
    assert!(!a_effective.properties.contains_key("shared"));
    assert!(first.parent_document.is_none());

    let b_effective = second.effective_document.as_ref().unwrap();
    assert_eq!(b_effective.properties.get("shared").map(String::as_str), Some("yes"));
    assert!(b_effective.modules.is_empty());

    assert!(session.graph().has_edge(&effective_node(b.location()), &parent_node(root.location())));
    assert!(!session.graph().has_edge(&effective_node(root.location()), &effective_node(a.location())));
    assert!(!session.graph().has_edge(&effective_node(root.location()), &parent_node(a.location())));
    assert!(result.all_problems().iter().all(|p| !p.message.contains("cycle")));
    assert_eq!(session.reactor().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_modules_are_discovered_when_none_are_declared() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let root = workspace.document("", &pom("org.acme", "root", "1.0", "packaging = \"pom\"\n"))?;
    workspace.document("zeta", &pom("org.acme", "zeta", "1.0", ""))?;
    workspace.document("alpha", &pom("org.acme", "alpha", "1.0", ""))?;
    std::fs::create_dir_all(workspace.path("notes"))?;

    let result = workspace.session().build(&request(root, RequestKind::Project)).await?;

    let ids: Vec<String> = result.children.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["org.acme:alpha:1.0", "org.acme:zeta:1.0"]);
    Ok(())
}

#[tokio::test]
async fn test_missing_module_is_an_error() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let root = workspace.document(
        "",
        &pom("org.acme", "root", "1.0", "packaging = \"pom\"\nmodules = [\"a\", \"gone\"]\n"),
    )?;
    workspace.document("a", &pom("org.acme", "a", "1.0", ""))?;

    let error = workspace.session().build(&request(root, RequestKind::Project)).await.unwrap_err();
    let PomrError::ModelBuilding(error) = error else {
        panic!("expected a model building error, got {error}");
    };
    assert!(error.problems().any(|p| p.message.contains("Child module 'gone'")));
    let result = error.result.as_ref().unwrap();
    assert_eq!(result.children.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_module_back_reference_is_a_cycle() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let root = workspace.document(
        "",
        &pom("org.acme", "root", "1.0", "packaging = \"pom\"\nmodules = [\"a\"]\n"),
    )?;
    workspace.document("a", &pom("org.acme", "a", "1.0", "packaging = \"pom\"\nmodules = [\"..\"]\n"))?;

    let error = workspace.session().build(&request(root, RequestKind::Project)).await.unwrap_err();
    let PomrError::ModelBuilding(error) = error else {
        panic!("expected a model building error, got {error}");
    };
    let cycle = error.problems().find(|p| p.message.contains("The modules form a cycle")).unwrap();
    assert_eq!(cycle.severity, pomr::core::Severity::Fatal);
    assert_eq!(cycle.document, "org.acme:a:1.0");
    Ok(())
}

#[tokio::test]
async fn test_module_aggregated_twice_is_a_duplicate() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let root = workspace.document(
        "",
        &pom("org.acme", "root", "1.0", "packaging = \"pom\"\nmodules = [\"a\", \"b\", \"./a\"]\n"),
    )?;
    workspace.document("a", &pom("org.acme", "a", "1.0", ""))?;
    workspace.document("b", &pom("org.acme", "b", "1.0", "packaging = \"pom\"\nmodules = [\"../a\"]\n"))?;

    let error = workspace.session().build(&request(root, RequestKind::Project)).await.unwrap_err();
    let PomrError::ModelBuilding(error) = error else {
        panic!("expected a model building error, got {error}");
    };
    let duplicates: Vec<_> = error.problems().filter(|p| p.message.starts_with("Duplicate module")).collect();
    assert_eq!(duplicates.len(), 2);
    let result = error.result.as_ref().unwrap();
    assert_eq!(result.flatten().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_build_starts_at_located_root() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    std::fs::create_dir_all(workspace.path(".pomr"))?;
    workspace.document("", &pom("org.acme", "root", "1.0", "packaging = \"pom\"\nmodules = [\"a\"]\n"))?;
    let a = workspace.document("a", &pom("org.acme", "a", "1.0", ""))?;

    let session = workspace.session();
    let located = session
        .build(&request(a.clone(), RequestKind::Project).with_root_lookup(true))
        .await?;
    assert_eq!(located.id(), "org.acme:root:1.0");
    assert_eq!(located.children.len(), 1);

    let direct = session.build(&request(a, RequestKind::Project)).await?;
    assert_eq!(direct.id(), "org.acme:a:1.0");
    assert!(direct.children.is_empty());
    Ok(())
}

/// The root imports a bundle that is one of its own modules and names the root as
/// its parent. The bundle needs the root's lineage, not its effective model, so
/// this is not a cycle.
#[tokio::test]
async fn test_root_imports_its_own_bundle_module() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let root = workspace.document(
        "",
        &pom(
            "org.acme",
            "root",
            "1.0",
            "packaging = \"pom\"\nmodules = [\"bom\"]\n\n[[dependency-management]]\ngroup-id = \"org.acme\"\nartifact-id = \"bom\"\nversion = \"1.0\"\ntype = \"pom\"\nscope = \"import\"\n",
        ),
    )?;
    let bom = workspace.document(
        "bom",
        &format!(
            "artifact-id = \"bom\"\npackaging = \"pom\"\n{}\n[[dependency-management]]\ngroup-id = \"org.lib\"\nartifact-id = \"core\"\nversion = \"2.0\"\n",
            parent("org.acme", "root", "1.0")
        ),
    )?;

    let session = workspace.session();
    let result = session.build(&request(root.clone(), RequestKind::Project)).await?;

    assert!(result.all_problems().iter().all(|p| !p.message.contains("cycle")));
    let effective = result.effective_document.as_ref().unwrap();
    let core = effective
        .dependency_management
        .iter()
        .find(|d| d.artifact_id.as_deref() == Some("core"))
        .unwrap();
    assert_eq!(core.version.as_deref(), Some("2.0"));
    assert_eq!(result.children[0].id(), "org.acme:bom:1.0");

    let graph = session.graph();
    assert!(graph.has_edge(&effective_node(root.location()), &effective_node(bom.location())));
    assert!(graph.has_edge(&effective_node(bom.location()), &parent_node(root.location())));
    Ok(())
}
