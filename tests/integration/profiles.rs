//! Profile activation and reuse of as-parent variants.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::{parent, pom, request};
use anyhow::Result;
use pomr::activation::ActivationContext;
use pomr::core::PomrError;
use pomr::session::{ModelBuilder, RequestKind};
use pomr::spi::{BasicConditionEvaluator, ConditionEvaluator};
use pomr::test_utils::{CountingDocumentIo, MemoryResolver};

#[derive(Default)]
struct CountingEvaluator {
    calls: AtomicUsize,
}

impl ConditionEvaluator for CountingEvaluator {
    fn evaluate(&self, condition: &str, ctx: &mut ActivationContext) -> Result<bool, PomrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BasicConditionEvaluator.evaluate(condition, ctx)
    }
}

const BASE: &str = r#"group-id = "org.acme"
artifact-id = "base"
version = "1.0"
packaging = "pom"

[properties]
mode = "local"

[[profiles]]
id = "ci"
activation = { condition = '${ci} == "true"' }
properties = { mode = "ci" }
"#;

#[tokio::test]
async fn test_parent_variant_is_reused_until_an_answer_changes() -> Result<()> {
    let io = Arc::new(CountingDocumentIo::default());
    let resolver = Arc::new(MemoryResolver::new());
    let evaluator = Arc::new(CountingEvaluator::default());
    resolver.insert("org.acme:base:1.0", io.insert("mem:base", BASE));
    let session = ModelBuilder::new()
        .with_document_io(io.clone())
        .with_model_resolver(resolver)
        .with_condition_evaluator(evaluator.clone())
        .new_session();

    let children: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| io.insert(&format!("mem:{name}"), &format!("artifact-id = \"{name}\"\n{}", parent("org.acme", "base", "1.0"))))
        .collect();

    let first = session
        .build_effective(&request(children[0].clone(), RequestKind::Effective).with_user_property("unrelated", "1"))
        .await?;
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.effective_document.as_ref().unwrap().properties["mode"], "local");

    let second = session
        .build_effective(&request(children[1].clone(), RequestKind::Effective).with_user_property("unrelated", "2"))
        .await?;
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.effective_document.as_ref().unwrap().properties["mode"], "local");
    assert!(Arc::ptr_eq(first.parent_document.as_ref().unwrap(), second.parent_document.as_ref().unwrap()));

    let third = session
        .build_effective(&request(children[2].clone(), RequestKind::Effective).with_user_property("ci", "true"))
        .await?;
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
    let effective = third.effective_document.as_ref().unwrap();
    assert_eq!(effective.properties["mode"], "ci");
    assert_eq!(third.active_profiles, vec!["ci"]);
    assert!(third.declared_profiles.contains("ci"));

    assert_eq!(io.reads("mem:base"), 1);
    Ok(())
}

#[tokio::test]
async fn test_explicit_selection_overrides_predicates() -> Result<()> {
    let io = Arc::new(CountingDocumentIo::default());
    let source = io.insert(
        "mem:app",
        &pom(
            "org.acme",
            "app",
            "1.0",
            r#"
[[profiles]]
id = "slow"
activation = { property = { name = "tests" } }
properties = { suite = "full" }

[[profiles]]
id = "extra"
properties = { bonus = "yes" }
"#,
        ),
    );
    let session = ModelBuilder::new().with_document_io(io).new_session();

    let by_property = session
        .build_effective(&request(source.clone(), RequestKind::Effective).with_user_property("tests", "all"))
        .await?;
    assert_eq!(by_property.active_profiles, vec!["slow"]);

    let overridden = session
        .build_effective(
            &request(source, RequestKind::Effective)
                .with_user_property("tests", "all")
                .with_inactive_profiles(["slow"])
                .with_active_profiles(["extra"]),
        )
        .await?;
    assert_eq!(overridden.active_profiles, vec!["extra"]);
    let effective = overridden.effective_document.as_ref().unwrap();
    assert_eq!(effective.properties.get("bonus").map(String::as_str), Some("yes"));
    assert!(!effective.properties.contains_key("suite"));
    Ok(())
}

#[tokio::test]
async fn test_active_by_default_yields_to_activated_profiles() -> Result<()> {
    let io = Arc::new(CountingDocumentIo::default());
    let source = io.insert(
        "mem:app",
        &pom(
            "org.acme",
            "app",
            "1.0",
            r#"
[[profiles]]
id = "default"
activation = { active-by-default = true }
properties = { target = "dev" }

[[profiles]]
id = "release"
activation = { property = { name = "release", value = "true" } }
properties = { target = "prod" }
"#,
        ),
    );
    let session = ModelBuilder::new().with_document_io(io).new_session();

    let plain = session.build_effective(&request(source.clone(), RequestKind::Effective)).await?;
    assert_eq!(plain.active_profiles, vec!["default"]);
    assert_eq!(plain.effective_document.as_ref().unwrap().properties["target"], "dev");

    let release = session
        .build_effective(&request(source, RequestKind::Effective).with_user_property("release", "true"))
        .await?;
    assert_eq!(release.active_profiles, vec!["release"]);
    assert_eq!(release.effective_document.as_ref().unwrap().properties["target"], "prod");
    Ok(())
}

#[tokio::test]
async fn test_invalid_condition_is_an_error() -> Result<()> {
    let io = Arc::new(CountingDocumentIo::default());
    let source = io.insert(
        "mem:app",
        &pom("org.acme", "app", "1.0", "\n[[profiles]]\nid = \"broken\"\nactivation = { condition = \"${a} ==\" }\n"),
    );
    let session = ModelBuilder::new().with_document_io(io).new_session();

    let error = session.build_effective(&request(source, RequestKind::Effective)).await.unwrap_err();
    let PomrError::ModelBuilding(error) = error else {
        panic!("expected a model building error");
    };
    assert!(error.problems().any(|p| p.message.contains("profile broken")));
    let result = error.result.as_ref().unwrap();
    assert!(result.active_profiles.is_empty());
    Ok(())
}
