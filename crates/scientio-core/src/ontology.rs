//! Schema types and the schema registry (the "ontology").
//!
//! A [`SchemaType`] names an entity together with the property keys and
//! relationship names its nodes may carry, plus the abstract "meta" types it
//! belongs to. The [`SchemaRegistry`] is built once at startup and shared
//! read-only by every session; nothing in it is mutated after construction.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::OntologyError;

// ── Schema Records ───────────────────────────────────────────────

/// One type definition as it appears in a schema source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaRecord {
    #[serde(alias = "entity")]
    pub name: String,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<String>,
    #[serde(default)]
    pub meta: Vec<String>,
}

// ── Schema Type ──────────────────────────────────────────────────

/// An immutable entity type: allowed property keys, allowed relationship
/// names, and the abstract types it is also labelled with.
///
/// Identity is the type name: two `SchemaType`s with the same name are equal
/// and hash identically.
#[derive(Debug, Clone)]
pub struct SchemaType {
    name: String,
    properties: BTreeSet<String>,
    relationships: BTreeSet<String>,
    meta: BTreeSet<String>,
}

impl SchemaType {
    /// Build a type, rejecting one that lists itself among its meta types.
    pub fn new(
        name: &str,
        properties: &[&str],
        relationships: &[&str],
        meta: &[&str],
    ) -> Result<Self, OntologyError> {
        Self::from_parts(
            name.to_string(),
            properties.iter().map(|s| s.to_string()).collect(),
            relationships.iter().map(|s| s.to_string()).collect(),
            meta.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn from_parts(
        name: String,
        properties: BTreeSet<String>,
        relationships: BTreeSet<String>,
        meta: BTreeSet<String>,
    ) -> Result<Self, OntologyError> {
        if meta.contains(&name) {
            return Err(OntologyError::SelfMeta { name });
        }
        Ok(Self {
            name,
            properties,
            relationships,
            meta,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &BTreeSet<String> {
        &self.properties
    }

    pub fn relationships(&self) -> &BTreeSet<String> {
        &self.relationships
    }

    pub fn meta(&self) -> &BTreeSet<String> {
        &self.meta
    }

    pub fn allows_property(&self, key: &str) -> bool {
        self.properties.contains(key)
    }

    pub fn allows_relationship(&self, name: &str) -> bool {
        self.relationships.contains(name)
    }

    /// Store labels for a node of this type: its own name first, then its
    /// meta types in name order.
    pub fn labels(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.meta.iter().map(String::as_str))
            .collect()
    }
}

impl TryFrom<SchemaRecord> for SchemaType {
    type Error = OntologyError;

    fn try_from(record: SchemaRecord) -> Result<Self, Self::Error> {
        Self::from_parts(
            record.name,
            record.properties.into_iter().collect(),
            record.relationships.into_iter().collect(),
            record.meta.into_iter().collect(),
        )
    }
}

impl From<&SchemaType> for SchemaRecord {
    fn from(otype: &SchemaType) -> Self {
        Self {
            name: otype.name.clone(),
            properties: otype.properties.iter().cloned().collect(),
            relationships: otype.relationships.iter().cloned().collect(),
            meta: otype.meta.iter().cloned().collect(),
        }
    }
}

impl PartialEq for SchemaType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SchemaType {}

impl Hash for SchemaType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ── Schema Registry ──────────────────────────────────────────────

/// The closed set of entity types a session may create, retrieve, and update.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: BTreeMap<String, Arc<SchemaType>>,
    properties: BTreeSet<String>,
    relationships: BTreeSet<String>,
    /// Transitive meta closure per type name.
    ancestors: BTreeMap<String, BTreeSet<String>>,
    /// Every name that appears as some type's meta.
    abstract_names: BTreeSet<String>,
}

impl SchemaRegistry {
    /// Build a registry from type definitions.
    ///
    /// Fails on an empty set, on duplicate names, and on meta chains that
    /// lead back to the type they start from.
    pub fn new(types: impl IntoIterator<Item = SchemaType>) -> Result<Self, OntologyError> {
        let mut by_name: BTreeMap<String, Arc<SchemaType>> = BTreeMap::new();
        for otype in types {
            if by_name.contains_key(otype.name()) {
                return Err(OntologyError::DuplicateType {
                    name: otype.name().to_string(),
                });
            }
            by_name.insert(otype.name().to_string(), Arc::new(otype));
        }
        if by_name.is_empty() {
            return Err(OntologyError::Empty);
        }

        let properties = by_name
            .values()
            .flat_map(|t| t.properties.iter().cloned())
            .collect();
        let relationships = by_name
            .values()
            .flat_map(|t| t.relationships.iter().cloned())
            .collect();
        let abstract_names = by_name
            .values()
            .flat_map(|t| t.meta.iter().cloned())
            .collect();

        let mut ancestors = BTreeMap::new();
        for name in by_name.keys() {
            ancestors.insert(name.clone(), collect_ancestors(&by_name, name)?);
        }

        tracing::debug!(types = by_name.len(), "Schema registry built");

        Ok(Self {
            types: by_name,
            properties,
            relationships,
            ancestors,
            abstract_names,
        })
    }

    /// Build a registry from schema source records.
    pub fn from_records(records: Vec<SchemaRecord>) -> Result<Self, OntologyError> {
        let types = records
            .into_iter()
            .map(SchemaType::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(types)
    }

    /// Parse a JSON array of schema records.
    pub fn from_json_str(source: &str) -> Result<Self, OntologyError> {
        let records: Vec<SchemaRecord> =
            serde_json::from_str(source).map_err(|e| OntologyError::Parse(e.to_string()))?;
        Self::from_records(records)
    }

    /// Parse YAML schema records.
    ///
    /// Accepts a multi-document stream with one record per document, a
    /// top-level sequence of records, or any mix of the two. Custom tags on
    /// records (e.g. `!OType`) are ignored.
    pub fn from_yaml_str(source: &str) -> Result<Self, OntologyError> {
        let mut records = Vec::new();
        for document in serde_yaml::Deserializer::from_str(source) {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|e| OntologyError::Parse(e.to_string()))?;
            collect_yaml_records(value, &mut records)?;
        }
        Self::from_records(records)
    }

    /// Load a schema source file. `.json` files are parsed as JSON,
    /// everything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OntologyError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| OntologyError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let registry = if is_json {
            Self::from_json_str(&source)?
        } else {
            Self::from_yaml_str(&source)?
        };
        tracing::info!(path = %path.display(), types = registry.len(), "Ontology loaded");
        Ok(registry)
    }

    // ── Lookups ──────────────────────────────────────────────────

    pub fn get(&self, name: &str) -> Option<&Arc<SchemaType>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn contains_type(&self, otype: &SchemaType) -> bool {
        self.contains(otype.name())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All types, ordered by name.
    pub fn types(&self) -> impl Iterator<Item = &Arc<SchemaType>> {
        self.types.values()
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Union of property keys across all types.
    pub fn property_names(&self) -> &BTreeSet<String> {
        &self.properties
    }

    /// Union of relationship names across all types.
    pub fn relationship_names(&self) -> &BTreeSet<String> {
        &self.relationships
    }

    /// Transitive meta types of `name`, or `None` for an unknown type.
    pub fn ancestors(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.ancestors.get(name)
    }

    /// Whether `name` is used as another type's meta type.
    pub fn is_abstract(&self, name: &str) -> bool {
        self.abstract_names.contains(name)
    }

    // ── Label Resolution ─────────────────────────────────────────

    /// Resolve the label set of a stored record to its most specific type.
    ///
    /// Labels that name no registered type are skipped. Among the rest, the
    /// result is the single type that is not an ancestor of any other
    /// resolved type. Zero or several such types is an ambiguous schema.
    pub fn resolve_labels<S: AsRef<str>>(
        &self,
        labels: &[S],
    ) -> Result<Arc<SchemaType>, OntologyError> {
        let resolved: Vec<&Arc<SchemaType>> =
            labels.iter().filter_map(|l| self.get(l.as_ref())).collect();

        if resolved.is_empty() {
            return Err(OntologyError::UnknownLabels {
                labels: owned_labels(labels),
            });
        }

        let meta_union: BTreeSet<&str> = resolved
            .iter()
            .filter_map(|t| self.ancestors(t.name()))
            .flatten()
            .map(String::as_str)
            .collect();

        let candidates: BTreeMap<&str, &Arc<SchemaType>> = resolved
            .into_iter()
            .filter(|t| !meta_union.contains(t.name()))
            .map(|t| (t.name(), t))
            .collect();

        let mut iter = candidates.values();
        match (iter.next(), iter.next()) {
            (Some(only), None) => Ok(Arc::clone(only)),
            _ => Err(OntologyError::AmbiguousType {
                labels: owned_labels(labels),
                candidates: candidates.keys().map(|name| name.to_string()).collect(),
            }),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn collect_ancestors(
    types: &BTreeMap<String, Arc<SchemaType>>,
    name: &str,
) -> Result<BTreeSet<String>, OntologyError> {
    let mut visited = BTreeSet::new();
    let mut pending: Vec<String> = types
        .get(name)
        .map(|t| t.meta.iter().cloned().collect())
        .unwrap_or_default();

    while let Some(meta) = pending.pop() {
        if meta == name {
            return Err(OntologyError::MetaCycle {
                name: name.to_string(),
            });
        }
        if visited.insert(meta.clone()) {
            if let Some(parent) = types.get(&meta) {
                pending.extend(parent.meta.iter().cloned());
            }
        }
    }
    Ok(visited)
}

fn collect_yaml_records(
    value: serde_yaml::Value,
    out: &mut Vec<SchemaRecord>,
) -> Result<(), OntologyError> {
    match value {
        serde_yaml::Value::Null => Ok(()),
        serde_yaml::Value::Tagged(tagged) => {
            let serde_yaml::value::TaggedValue { value, .. } = *tagged;
            collect_yaml_records(value, out)
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                collect_yaml_records(item, out)?;
            }
            Ok(())
        }
        other => {
            let record = serde_yaml::from_value(other)
                .map_err(|e| OntologyError::Parse(e.to_string()))?;
            out.push(record);
            Ok(())
        }
    }
}

fn owned_labels<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels.iter().map(|l| l.as_ref().to_string()).collect()
}
