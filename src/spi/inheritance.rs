//! Default inheritance assembly and profile injection.
//!
//! Both are keyed merges: dependencies and management entries by
//! `group:artifact:type[:classifier]`, plugins by `group:artifact`. In inheritance
//! the child wins and parent-only entries are appended; in injection the profile
//! wins and replaces entries in place.

use std::collections::BTreeMap;

use super::{InheritanceAssembler, ProfileInjector};
use crate::model::{Build, Dependency, Document, Plugin, Profile};

/// Merge `extra` into `base` by key. `replace` decides whether an `extra` entry
/// replaces the `base` entry with the same key.
fn merge_keyed<T: Clone>(
    base: &[T],
    extra: &[T],
    key: impl Fn(&T) -> String,
    replace: bool,
    combine: impl Fn(&T, &T) -> T,
) -> Vec<T> {
    let mut merged: Vec<T> = base.to_vec();
    for item in extra {
        let item_key = key(item);
        match merged.iter().position(|existing| key(existing) == item_key) {
            Some(index) if replace => merged[index] = combine(item, &merged[index]),
            Some(index) => merged[index] = combine(&merged[index], item),
            None => merged.push(item.clone()),
        }
    }
    merged
}

/// Plugins merge field by field: the dominant side's version and configuration
/// keys win, the other side fills gaps.
fn combine_plugin(dominant: &Plugin, recessive: &Plugin) -> Plugin {
    let mut configuration: BTreeMap<String, String> = recessive.configuration.clone();
    configuration.extend(dominant.configuration.iter().map(|(k, v)| (k.clone(), v.clone())));
    Plugin {
        group_id: dominant.group_id.clone().or_else(|| recessive.group_id.clone()),
        artifact_id: dominant.artifact_id.clone().or_else(|| recessive.artifact_id.clone()),
        version: dominant.version.clone().or_else(|| recessive.version.clone()),
        configuration,
    }
}

fn keep_dominant<T: Clone>(dominant: &T, _recessive: &T) -> T {
    dominant.clone()
}

fn merge_build(dominant: Option<&Build>, recessive: Option<&Build>, replace: bool) -> Option<Build> {
    match (dominant, recessive) {
        (None, None) => None,
        (Some(build), None) | (None, Some(build)) => Some(build.clone()),
        (Some(dominant), Some(recessive)) => {
            let (base, extra) = if replace { (recessive, dominant) } else { (dominant, recessive) };
            Some(Build {
                directory: dominant.directory.clone().or_else(|| recessive.directory.clone()),
                final_name: dominant.final_name.clone().or_else(|| recessive.final_name.clone()),
                plugins: merge_keyed(&base.plugins, &extra.plugins, Plugin::key, replace, combine_plugin),
                plugin_management: merge_keyed(
                    &base.plugin_management,
                    &extra.plugin_management,
                    Plugin::key,
                    replace,
                    combine_plugin,
                ),
            })
        }
    }
}

/// Child wins for scalars; collections merge by key with the child first and
/// parent-only entries appended. `modules`, `profiles`, `root` and `packaging`
/// are not inherited.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInheritanceAssembler;

impl InheritanceAssembler for DefaultInheritanceAssembler {
    fn assemble(&self, child: &Document, parent: &Document) -> Document {
        let mut result = child.clone();

        result.group_id = child.group_id.clone().or_else(|| parent.effective_group_id().map(str::to_string));
        result.version = child.version.clone().or_else(|| parent.effective_version().map(str::to_string));
        result.description = child.description.clone().or_else(|| parent.description.clone());

        let mut properties = parent.properties.clone();
        properties.extend(child.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        result.properties = properties;

        result.dependencies = merge_keyed(
            &child.dependencies,
            &parent.dependencies,
            Dependency::management_key,
            false,
            keep_dominant,
        );
        result.dependency_management = merge_keyed(
            &child.dependency_management,
            &parent.dependency_management,
            Dependency::management_key,
            false,
            keep_dominant,
        );
        result.repositories = merge_keyed(
            &child.repositories,
            &parent.repositories,
            String::clone,
            false,
            keep_dominant,
        );
        result.build = merge_build(child.build.as_ref(), parent.build.as_ref(), false);

        for (field, location) in &parent.locations {
            result.locations.entry(field.clone()).or_insert_with(|| location.clone());
        }
        result
    }
}

/// Profile wins; its entries replace same-keyed entries in place and new ones
/// are appended. Profile modules are appended when not already declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProfileInjector;

impl ProfileInjector for DefaultProfileInjector {
    fn inject(&self, document: &Document, profiles: &[Profile]) -> Document {
        let mut result = document.clone();
        for profile in profiles {
            result.properties.extend(profile.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            result.dependencies = merge_keyed(
                &result.dependencies,
                &profile.dependencies,
                Dependency::management_key,
                true,
                keep_dominant,
            );
            result.dependency_management = merge_keyed(
                &result.dependency_management,
                &profile.dependency_management,
                Dependency::management_key,
                true,
                keep_dominant,
            );
            result.build = merge_build(profile.build.as_ref(), result.build.as_ref(), true);
            for module in &profile.modules {
                if !result.modules.contains(module) {
                    result.modules.push(module.clone());
                }
            }
        }
        result
    }
}
