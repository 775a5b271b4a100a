//! Run-once stages: reads, external lookups and shared results.

use std::sync::Arc;

use crate::common::{parent, pom, request};
use anyhow::Result;
use pomr::model::DocumentSource;
use pomr::session::{ModelBuilder, RequestKind};
use pomr::test_utils::{CountingDocumentIo, MemoryResolver};

fn in_memory() -> (Arc<CountingDocumentIo>, Arc<MemoryResolver>, pomr::session::ModelBuilderSession) {
    let io = Arc::new(CountingDocumentIo::default());
    let resolver = Arc::new(MemoryResolver::new());
    let session = ModelBuilder::new()
        .with_document_io(io.clone())
        .with_model_resolver(resolver.clone())
        .new_session();
    (io, resolver, session)
}

#[tokio::test]
async fn test_same_source_returns_identical_document() -> Result<()> {
    let (io, _, session) = in_memory();
    let source = io.insert("mem:app", &pom("org.acme", "app", "1.0", ""));

    let first = session.resolver().read_file(&source).await?;
    let second = session.resolver().read_file(&source).await?;
    assert!(Arc::ptr_eq(&first, &second));

    let raw_first = session.resolver().raw(&source).await?;
    let raw_second = session.resolver().raw(&source).await?;
    assert!(Arc::ptr_eq(&raw_first, &raw_second));
    assert_eq!(io.reads("mem:app"), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requesters_share_one_read() -> Result<()> {
    let (io, _, session) = in_memory();
    let source = io.insert("mem:shared", &pom("org.acme", "shared", "1.0", ""));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let session = session.clone();
        let source = source.clone();
        handles.push(tokio::spawn(async move { session.resolver().read_file(&source).await }));
    }
    let documents: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(documents.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(io.reads("mem:shared"), 1);
    Ok(())
}

#[tokio::test]
async fn test_parent_is_read_and_resolved_once_per_session() -> Result<()> {
    let (io, resolver, session) = in_memory();
    let base = io.insert("mem:base", &pom("org.acme", "base", "1.0", "packaging = \"pom\"\n"));
    resolver.insert("org.acme:base:1.0", base);
    let first = io.insert("mem:first", &format!("artifact-id = \"first\"\n{}", parent("org.acme", "base", "1.0")));
    let second = io.insert("mem:second", &format!("artifact-id = \"second\"\n{}", parent("org.acme", "base", "1.0")));

    for source in [first.clone(), second, first] {
        let result = session.build_effective(&request(source, RequestKind::Effective)).await?;
        assert!(result.parent_document.is_some());
    }

    assert_eq!(io.reads("mem:base"), 1);
    assert_eq!(resolver.calls("org.acme:base:1.0"), 1);
    assert_eq!(io.reads("mem:first"), 1);
    Ok(())
}

#[tokio::test]
async fn test_failures_are_cached_too() -> Result<()> {
    let (io, resolver, session) = in_memory();
    let child = io.insert("mem:child", &format!("artifact-id = \"child\"\n{}", parent("org.acme", "nowhere", "1.0")));

    for _ in 0..2 {
        let error = session.build_effective(&request(child.clone(), RequestKind::Effective)).await.unwrap_err();
        assert!(error.to_string().contains("Non-resolvable parent org.acme:nowhere:1.0"));
    }
    assert_eq!(resolver.calls("org.acme:nowhere:1.0"), 1);

    let missing = DocumentSource::from_location("mem:missing");
    assert!(session.resolver().read_file(&missing).await.is_err());
    assert!(session.resolver().read_file(&missing).await.is_err());
    assert_eq!(io.reads("mem:missing"), 1);
    Ok(())
}

#[tokio::test]
async fn test_effective_results_are_dropped_with_their_request() -> Result<()> {
    let (io, _, session) = in_memory();
    let source = io.insert("mem:solo", &pom("org.acme", "solo", "1.0", ""));

    let before = session.cache().len();
    session.build_effective(&request(source, RequestKind::Effective)).await?;
    let stats = session.cache().stats();
    // file and raw remain; the effective entry is purged
    assert_eq!(session.cache().len(), before + 2);
    assert!(stats.misses >= 3);
    Ok(())
}
