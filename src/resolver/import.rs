//! Dependency-management imports.
//!
//! A management entry with `scope = "import"` is replaced by the management of
//! the document it names (its *bundle*), resolved to its effective form first.
//! Entries declared by the importer win over imported ones; between bundles the
//! first import wins. Exclusions on the import entry drop matching bundle entries
//! and are added to every bundle entry that is kept.
//!
//! A bundle that inherits an import of itself from its parent skips that entry;
//! importing itself explicitly is a cycle.

use std::collections::HashSet;

use tracing::debug;

use super::{DocumentResolver, step_node};
use crate::core::{Problem, ProblemCollector, Severity};
use crate::graph::effective_node;
use crate::model::{Coordinates, Dependency, Document, DocumentSource, Exclusion};
use crate::session::{BuildRequest, RequestKind};
use crate::spi::interpolation::model_lookup;

fn import_location(document: &Document, index: usize) -> Option<crate::core::InputLocation> {
    document
        .location(&format!("dependency-management.{index}"))
        .or_else(|| document.location("dependency-management"))
}

/// `managed` with the import's exclusions appended, skipping ones it already has.
fn with_exclusions(managed: &Dependency, exclusions: &[Exclusion]) -> Dependency {
    let mut managed = managed.clone();
    for exclusion in exclusions {
        if !managed.exclusions.contains(exclusion) {
            managed.exclusions.push(exclusion.clone());
        }
    }
    managed
}

fn declares_import(own: &Document, entry: &Dependency) -> bool {
    let key = entry.management_key();
    own.dependency_management.iter().any(|d| d.is_import() && d.management_key() == key)
}

impl DocumentResolver {
    /// The management of `document` with every import replaced by the bundle's
    /// entries.
    ///
    /// `own` is the document before its parent was assembled in. `chain` holds the
    /// ids of the bundles being imported above this document.
    pub(crate) async fn import_management(
        &self,
        document: &Document,
        own: &Document,
        request: &BuildRequest,
        problems: &mut ProblemCollector,
        chain: &[String],
    ) -> Vec<Dependency> {
        let (imports, declared): (Vec<_>, Vec<_>) = document
            .dependency_management
            .iter()
            .cloned()
            .enumerate()
            .partition(|(_, entry)| entry.is_import());
        let mut management: Vec<Dependency> = declared.into_iter().map(|(_, entry)| entry).collect();
        if imports.is_empty() {
            return management;
        }
        let mut keys: HashSet<String> = management.iter().map(Dependency::management_key).collect();

        let lookup = model_lookup(document, &request.user_properties, &request.system_properties);
        let interpolator = self.collaborators.interpolator.as_ref();
        let importer = document.id();

        for (index, entry) in imports {
            let expand = |value: &Option<String>| value.as_deref().map(|v| interpolator.interpolate(v, &lookup));
            let (Some(group_id), Some(artifact_id), Some(version)) =
                (expand(&entry.group_id), expand(&entry.artifact_id), expand(&entry.version))
            else {
                problems.push(
                    Problem::new(
                        Severity::Error,
                        format!("Import '{}' needs group-id, artifact-id and version", entry.management_key()),
                    )
                    .with_field("dependency-management")
                    .with_location(import_location(document, index)),
                );
                continue;
            };
            let coordinates = Coordinates::new(group_id, artifact_id, version);
            let id = coordinates.to_string();

            if id == importer && !declares_import(own, &entry) {
                // a bundle inheriting its own import from the parent adds nothing
                debug!("skipping import of {id} inherited by itself");
                continue;
            }
            if id == importer || chain.contains(&id) {
                let mut cycle: Vec<&str> = chain.iter().map(String::as_str).collect();
                cycle.push(&importer);
                cycle.push(&id);
                problems.push(
                    Problem::new(Severity::Fatal, format!("The imports form a cycle: {}", cycle.join(" -> ")))
                        .with_field("dependency-management")
                        .with_location(import_location(document, index)),
                );
                continue;
            }

            let bundle = match self.locate_bundle(&coordinates, document, request).await {
                Ok(bundle) => bundle,
                Err(cause) => {
                    problems.push(
                        Problem::new(Severity::Error, format!("Non-resolvable import {id}"))
                            .with_field("dependency-management")
                            .with_location(import_location(document, index))
                            .with_cause(cause),
                    );
                    continue;
                }
            };

            if let Err(error) = self.graph.add_edge(&step_node(request), &effective_node(bundle.location())) {
                problems.push(
                    Problem::new(Severity::Fatal, format!("The imports form a cycle: {error}"))
                        .with_field("dependency-management")
                        .with_location(import_location(document, index)),
                );
                continue;
            }

            let mut nested = chain.to_vec();
            nested.push(importer.clone());
            let derived = request.derive(bundle, RequestKind::Import);
            let imported = self.effective_with_imports(&derived, nested).await;
            problems.merge(&imported.problems);

            let Some(effective) = &imported.effective_document else {
                continue;
            };
            let mut added = 0;
            for managed in &effective.dependency_management {
                if entry.exclusions.iter().any(|exclusion| exclusion.matches(managed)) {
                    continue;
                }
                if keys.insert(managed.management_key()) {
                    management.push(with_exclusions(managed, &entry.exclusions));
                    added += 1;
                }
            }
            debug!("imported {added} management entries from {id} into {importer}");
        }
        management
    }

    async fn locate_bundle(
        &self,
        coordinates: &Coordinates,
        importer: &Document,
        request: &BuildRequest,
    ) -> Result<DocumentSource, String> {
        if request.allow_reactor
            && let Some(source) =
                self.reactor.find(&coordinates.group_id, &coordinates.artifact_id, &coordinates.version)
        {
            return Ok(source);
        }
        let mut repositories = request.repositories.clone();
        repositories.extend(importer.repositories.iter().cloned());
        self.resolve_external(coordinates, &repositories)
            .await
            .map_err(|error| error.to_string())
    }
}
