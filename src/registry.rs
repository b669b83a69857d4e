//! Schema registry - the closed set of named type descriptors.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::descriptor::{Extra, TypeDescriptor};
use crate::error::{RegistryError, RegistryIssue, TransformError};

/// Named type descriptors for one schema version.
///
/// Populate it once, run [`check`](Self::check), then share it read-only.
/// Resolution is a hash lookup and takes `&self`, so a registry can be used
/// from many threads at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, descriptor: TypeDescriptor) {
        let name = name.into();
        if self.types.insert(name.clone(), descriptor).is_some() {
            tracing::debug!(type_name = %name, "replaced registered type");
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        self.register(name, descriptor);
        self
    }

    /// Look up a descriptor by name.
    ///
    /// # Errors
    ///
    /// Returns `TransformError::UnknownType` if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<&TypeDescriptor, TransformError> {
        self.types
            .get(name)
            .ok_or_else(|| TransformError::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of every registered type reachable from `root`, including `root`.
    ///
    /// Dangling references are skipped; use [`check`](Self::check) to find them.
    pub fn reachable_from(&self, root: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![root.to_string()];
        while let Some(name) = pending.pop() {
            let Some(descriptor) = self.types.get(&name) else {
                continue;
            };
            if !seen.insert(name) {
                continue;
            }
            collect_refs(descriptor, "", &mut |target: &str, _: &str| {
                if !seen.contains(target) {
                    pending.push(target.to_string());
                }
            });
        }
        seen
    }

    /// Verify the registry is self-consistent.
    ///
    /// Every reference must resolve, field names must be unique on both the
    /// external and the internal side, and no type may reach itself through
    /// references, optionals and union alternatives alone. Such a loop never
    /// reads any input, so a transform would recurse without end.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Invalid` with every issue found.
    pub fn check(&self) -> Result<(), RegistryError> {
        let mut issues = Vec::new();

        for name in self.names() {
            let descriptor = &self.types[name];

            collect_refs(descriptor, "", &mut |target: &str, path: &str| {
                if !self.types.contains_key(target) {
                    issues.push(RegistryIssue::DanglingRef {
                        type_name: name.to_string(),
                        path: path.to_string(),
                        target: target.to_string(),
                    });
                }
            });

            check_fields(name, descriptor, &mut issues);

            if let Some(chain) = self.alias_cycle(name) {
                issues.push(RegistryIssue::AliasCycle {
                    type_name: name.to_string(),
                    chain,
                });
            }
        }

        tracing::debug!(
            types = self.types.len(),
            issues = issues.len(),
            "checked schema registry"
        );

        if issues.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Invalid { issues })
        }
    }

    /// Follow `name` through every position that does not consume input.
    /// Returns the chain of names if it comes back to one already on it.
    fn alias_cycle(&self, name: &str) -> Option<Vec<String>> {
        let descriptor = self.types.get(name)?;
        let mut chain = vec![name.to_string()];
        let mut cleared = HashSet::new();
        self.find_alias_cycle(descriptor, &mut chain, &mut cleared)
    }

    /// `cleared` holds names already walked without finding a loop.
    fn find_alias_cycle<'a>(
        &'a self,
        descriptor: &'a TypeDescriptor,
        chain: &mut Vec<String>,
        cleared: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        match descriptor {
            TypeDescriptor::Ref { name } => {
                if chain.iter().any(|seen| seen == name) {
                    let mut found = chain.clone();
                    found.push(name.clone());
                    return Some(found);
                }
                if cleared.contains(name.as_str()) {
                    return None;
                }
                let target = self.types.get(name)?;
                chain.push(name.clone());
                let found = self.find_alias_cycle(target, chain, cleared);
                chain.pop();
                if found.is_none() {
                    cleared.insert(name.as_str());
                }
                found
            }
            TypeDescriptor::Optional { inner } => self.find_alias_cycle(inner, chain, cleared),
            TypeDescriptor::Union { alternatives } => alternatives
                .iter()
                .find_map(|alternative| self.find_alias_cycle(alternative, chain, cleared)),
            // Arrays, maps and objects read one level of input before recursing.
            _ => None,
        }
    }
}

/// Call `visit(target, path)` for every reference inside `descriptor`,
/// without following them.
fn collect_refs(descriptor: &TypeDescriptor, path: &str, visit: &mut dyn FnMut(&str, &str)) {
    match descriptor {
        TypeDescriptor::Primitive { .. } | TypeDescriptor::Enum { .. } => {}
        TypeDescriptor::Ref { name } => visit(name, path),
        TypeDescriptor::Array { items } => {
            collect_refs(items, &format!("{}/items", path), visit);
        }
        TypeDescriptor::Map { values } => {
            collect_refs(values, &format!("{}/values", path), visit);
        }
        TypeDescriptor::Optional { inner } => {
            collect_refs(inner, &format!("{}/inner", path), visit);
        }
        TypeDescriptor::Union { alternatives } => {
            for (i, alt) in alternatives.iter().enumerate() {
                collect_refs(alt, &format!("{}/alternatives/{}", path, i), visit);
            }
        }
        TypeDescriptor::Object(schema) => {
            for field in schema.fields() {
                collect_refs(&field.ty, &format!("{}/fields/{}", path, field.external), visit);
            }
            if let Extra::Open { values } = schema.extra() {
                collect_refs(values, &format!("{}/extra", path), visit);
            }
        }
    }
}

/// Report duplicate field names in every object nested in `descriptor`.
fn check_fields(type_name: &str, descriptor: &TypeDescriptor, issues: &mut Vec<RegistryIssue>) {
    match descriptor {
        TypeDescriptor::Primitive { .. }
        | TypeDescriptor::Enum { .. }
        | TypeDescriptor::Ref { .. } => {}
        TypeDescriptor::Array { items } => check_fields(type_name, items, issues),
        TypeDescriptor::Map { values } => check_fields(type_name, values, issues),
        TypeDescriptor::Optional { inner } => check_fields(type_name, inner, issues),
        TypeDescriptor::Union { alternatives } => {
            for alt in alternatives {
                check_fields(type_name, alt, issues);
            }
        }
        TypeDescriptor::Object(schema) => {
            let mut external = HashSet::new();
            let mut internal = HashSet::new();
            for field in schema.fields() {
                if !external.insert(field.external.as_str()) {
                    issues.push(RegistryIssue::DuplicateField {
                        type_name: type_name.to_string(),
                        side: "external",
                        field: field.external.clone(),
                    });
                }
                if !internal.insert(field.internal_name()) {
                    issues.push(RegistryIssue::DuplicateField {
                        type_name: type_name.to_string(),
                        side: "internal",
                        field: field.internal_name().to_string(),
                    });
                }
                check_fields(type_name, &field.ty, issues);
            }
            if let Extra::Open { values } = schema.extra() {
                check_fields(type_name, values, issues);
            }
        }
    }
}
