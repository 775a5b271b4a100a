//! Parent rings of any length are rejected without looping.

use std::sync::Arc;
use std::time::Duration;

use crate::common::{parent, request};
use anyhow::Result;
use pomr::core::{PomrError, Severity};
use pomr::session::{ModelBuilder, RequestKind};
use pomr::test_utils::{CountingDocumentIo, MemoryResolver};

/// Documents `ring-0 -> ring-1 -> ... -> ring-(n-1) -> ring-0`, each naming the
/// next one as its parent.
fn ring(n: usize) -> (Arc<CountingDocumentIo>, pomr::session::ModelBuilderSession) {
    let io = Arc::new(CountingDocumentIo::default());
    let resolver = Arc::new(MemoryResolver::new());
    for i in 0..n {
        let next = (i + 1) % n;
        let text = format!(
            "group-id = \"org.ring\"\nartifact-id = \"ring-{i}\"\nversion = \"1\"\npackaging = \"pom\"\n{}",
            parent("org.ring", &format!("ring-{next}"), "1")
        );
        let source = io.insert(&format!("mem:ring-{i}"), &text);
        resolver.insert(&format!("org.ring:ring-{i}:1"), source);
    }
    let session = ModelBuilder::new()
        .with_document_io(io.clone())
        .with_model_resolver(resolver)
        .new_session();
    (io, session)
}

#[tokio::test]
async fn test_parent_rings_are_rejected() -> Result<()> {
    for n in 2..=5 {
        let (io, session) = ring(n);
        let start = pomr::model::DocumentSource::from_location("mem:ring-0");
        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            session.build_effective(&request(start, RequestKind::Effective)),
        )
        .await?;

        let Err(PomrError::ModelBuilding(error)) = outcome else {
            panic!("ring of {n} was accepted");
        };
        let cycle = error
            .problems()
            .find(|p| p.message.starts_with("The parents form a cycle"))
            .unwrap_or_else(|| panic!("ring of {n}: no cycle problem in {error}"));
        assert_eq!(cycle.severity, Severity::Fatal);
        for i in 0..n {
            assert!(cycle.message.contains(&format!("ring-{i}")), "ring of {n}: {}", cycle.message);
            assert_eq!(io.reads(&format!("mem:ring-{i}")), 1);
        }
        assert!(error.result.as_ref().unwrap().effective_document.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_every_member_of_a_ring_fails() -> Result<()> {
    let (_, session) = ring(3);
    let builds = (0..3).map(|i| {
        let session = session.clone();
        async move {
            let start = pomr::model::DocumentSource::from_location(format!("mem:ring-{i}"));
            session.build_effective(&request(start, RequestKind::Effective)).await
        }
    });
    let outcomes = tokio::time::timeout(Duration::from_secs(10), futures::future::join_all(builds)).await?;
    assert!(outcomes.iter().all(Result::is_err));
    Ok(())
}

#[tokio::test]
async fn test_self_parent_is_fatal() -> Result<()> {
    let io = Arc::new(CountingDocumentIo::default());
    let source = io.insert(
        "mem:narcissus",
        &format!(
            "group-id = \"org.acme\"\nartifact-id = \"narcissus\"\nversion = \"1\"\n{}",
            parent("org.acme", "narcissus", "1")
        ),
    );
    let session = ModelBuilder::new().with_document_io(io).new_session();

    let error = session.build_effective(&request(source, RequestKind::Effective)).await.unwrap_err();
    let PomrError::ModelBuilding(error) = error else {
        panic!("expected a model building error");
    };
    assert!(error.problems().any(|p| p.severity == Severity::Fatal && p.message.contains("itself")));
    Ok(())
}
