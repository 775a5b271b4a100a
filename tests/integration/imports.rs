//! Dependency-management imports: idempotence, precedence, exclusions and cycles.

use std::sync::Arc;

use crate::common::{pom, request};
use anyhow::Result;
use pomr::core::{PomrError, Severity};
use pomr::model::Document;
use pomr::session::{ModelBuilder, ModelBuilderSession, RequestKind};
use pomr::test_utils::{CountingDocumentIo, MemoryResolver};

struct Bundles {
    io: Arc<CountingDocumentIo>,
    resolver: Arc<MemoryResolver>,
    session: ModelBuilderSession,
}

impl Bundles {
    fn new() -> Self {
        let io = Arc::new(CountingDocumentIo::default());
        let resolver = Arc::new(MemoryResolver::new());
        let session = ModelBuilder::new()
            .with_document_io(io.clone())
            .with_model_resolver(resolver.clone())
            .new_session();
        Self { io, resolver, session }
    }

    /// Publish `text` under `org.acme:<artifact>:1.0`.
    fn publish(&self, artifact: &str, text: &str) {
        let source = self.io.insert(&format!("mem:{artifact}"), text);
        self.resolver.insert(&format!("org.acme:{artifact}:1.0"), source);
    }
}

fn managed(group: &str, artifact: &str, version: &str) -> String {
    format!("\n[[dependency-management]]\ngroup-id = \"{group}\"\nartifact-id = \"{artifact}\"\nversion = \"{version}\"\n")
}

fn import(artifact: &str) -> String {
    format!(
        "\n[[dependency-management]]\ngroup-id = \"org.acme\"\nartifact-id = \"{artifact}\"\nversion = \"1.0\"\ntype = \"pom\"\nscope = \"import\"\n"
    )
}

fn managed_version<'a>(document: &'a Document, artifact: &str) -> Vec<&'a str> {
    document
        .dependency_management
        .iter()
        .filter(|d| d.artifact_id.as_deref() == Some(artifact))
        .filter_map(|d| d.version.as_deref())
        .collect()
}

#[tokio::test]
async fn test_bundle_imported_twice_contributes_once() -> Result<()> {
    let bundles = Bundles::new();
    bundles.publish("b", &pom("org.acme", "b", "1.0", &format!("packaging = \"pom\"\n{}", managed("org.lib", "core", "2.0"))));
    bundles.publish(
        "c",
        &pom("org.acme", "c", "1.0", &format!("packaging = \"pom\"\n{}{}", import("b"), managed("org.lib", "extra", "1.1"))),
    );
    let app = bundles.io.insert(
        "mem:app",
        &pom(
            "org.acme",
            "app",
            "1.0",
            &format!(
                "{}{}\n[[dependencies]]\ngroup-id = \"org.lib\"\nartifact-id = \"core\"\n\n[[dependencies]]\ngroup-id = \"org.lib\"\nartifact-id = \"extra\"\n",
                import("b"),
                import("c")
            ),
        ),
    );

    let result = bundles.session.build_effective(&request(app, RequestKind::Effective)).await?;
    let effective = result.effective_document.as_ref().unwrap();

    assert_eq!(managed_version(effective, "core"), vec!["2.0"]);
    assert_eq!(managed_version(effective, "extra"), vec!["1.1"]);
    assert!(effective.dependency_management.iter().all(|d| !d.is_import()));
    let versions: Vec<_> = effective.dependencies.iter().map(|d| d.version.as_deref()).collect();
    assert_eq!(versions, vec![Some("2.0"), Some("1.1")]);

    assert_eq!(bundles.io.reads("mem:b"), 1);
    assert_eq!(bundles.resolver.calls("org.acme:b:1.0"), 1);
    Ok(())
}

#[tokio::test]
async fn test_declared_entries_win_over_imports() -> Result<()> {
    let bundles = Bundles::new();
    bundles.publish("first", &pom("org.acme", "first", "1.0", &managed("org.lib", "core", "1.0")));
    bundles.publish("second", &pom("org.acme", "second", "1.0", &format!("{}{}", managed("org.lib", "core", "9.0"), managed("org.lib", "util", "3.0"))));
    let app = bundles.io.insert(
        "mem:app",
        &pom(
            "org.acme",
            "app",
            "1.0",
            &format!("{}{}{}", import("first"), import("second"), managed("org.lib", "util", "5.0")),
        ),
    );

    let result = bundles.session.build_effective(&request(app, RequestKind::Effective)).await?;
    let effective = result.effective_document.as_ref().unwrap();
    assert_eq!(managed_version(effective, "core"), vec!["1.0"]);
    assert_eq!(managed_version(effective, "util"), vec!["5.0"]);
    Ok(())
}

#[tokio::test]
async fn test_import_exclusions_drop_entries() -> Result<()> {
    let bundles = Bundles::new();
    bundles.publish(
        "platform",
        &pom("org.acme", "platform", "1.0", &format!("{}{}", managed("org.lib", "core", "2.0"), managed("org.lib", "legacy", "0.9"))),
    );
    let app = bundles.io.insert(
        "mem:app",
        &pom(
            "org.acme",
            "app",
            "1.0",
            &format!("{}exclusions = [{{ group-id = \"org.lib\", artifact-id = \"legacy\" }}]\n", import("platform")),
        ),
    );

    let result = bundles.session.build_effective(&request(app, RequestKind::Effective)).await?;
    let effective = result.effective_document.as_ref().unwrap();
    assert_eq!(managed_version(effective, "core"), vec!["2.0"]);
    assert!(managed_version(effective, "legacy").is_empty());
    let core = effective.dependency_management.iter().find(|d| d.artifact_id.as_deref() == Some("core")).unwrap();
    assert_eq!(core.exclusions.len(), 1);
    assert_eq!(core.exclusions[0].artifact_id, "legacy");
    Ok(())
}

#[tokio::test]
async fn test_unresolvable_import_is_an_error() -> Result<()> {
    let bundles = Bundles::new();
    let app = bundles.io.insert("mem:app", &pom("org.acme", "app", "1.0", &import("missing")));

    let error = bundles.session.build_effective(&request(app, RequestKind::Effective)).await.unwrap_err();
    let PomrError::ModelBuilding(error) = error else {
        panic!("expected a model building error");
    };
    let problem = error.problems().find(|p| p.message.starts_with("Non-resolvable import")).unwrap();
    assert_eq!(problem.severity, Severity::Error);
    assert!(problem.message.contains("org.acme:missing:1.0"));
    assert!(error.result.as_ref().unwrap().effective_document.is_some());
    Ok(())
}

#[tokio::test]
async fn test_mutual_imports_are_a_cycle() -> Result<()> {
    let bundles = Bundles::new();
    bundles.publish("x", &pom("org.acme", "x", "1.0", &format!("packaging = \"pom\"\n{}", import("y"))));
    bundles.publish("y", &pom("org.acme", "y", "1.0", &format!("packaging = \"pom\"\n{}", import("x"))));

    let start = pomr::model::DocumentSource::from_location("mem:x");
    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        bundles.session.build_effective(&request(start, RequestKind::Effective)),
    )
    .await?;
    let Err(PomrError::ModelBuilding(error)) = outcome else {
        panic!("mutual imports were accepted");
    };
    let cycle = error.problems().find(|p| p.message.starts_with("The imports form a cycle")).unwrap();
    assert_eq!(cycle.severity, Severity::Fatal);
    assert!(cycle.message.contains("org.acme:x:1.0") && cycle.message.contains("org.acme:y:1.0"));
    Ok(())
}

#[tokio::test]
async fn test_explicit_self_import_is_a_cycle() -> Result<()> {
    let bundles = Bundles::new();
    bundles.publish("selfish", &pom("org.acme", "selfish", "1.0", &format!("packaging = \"pom\"\n{}", import("selfish"))));

    let start = pomr::model::DocumentSource::from_location("mem:selfish");
    let error = bundles.session.build_effective(&request(start, RequestKind::Effective)).await.unwrap_err();
    let PomrError::ModelBuilding(error) = error else {
        panic!("expected a model building error");
    };
    let cycle = error.problems().find(|p| p.message.starts_with("The imports form a cycle")).unwrap();
    assert_eq!(cycle.severity, Severity::Fatal);
    assert_eq!(bundles.resolver.total_calls(), 0);
    Ok(())
}
