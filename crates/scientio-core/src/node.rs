//! Ontology-typed nodes.
//!
//! A [`Node`] carries an identity, an optional [`SchemaType`], and property
//! and relationship maps whose keys are bounded by that type. Writes to keys
//! the type does not declare are dropped, never stored and never an error.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ontology::SchemaType;

/// Property used as the node's display name and identity anchor.
pub const NAME_PROPERTY: &str = "name";

/// How many of a list of relationships a node actually has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipAvailability {
    AllAvailable,
    SomeAvailable,
    NoneAvailable,
}

/// Relationship names split by whether the node has at least one edge for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipPurity {
    pub present: Vec<String>,
    pub absent: Vec<String>,
}

/// A typed record in the knowledge graph.
///
/// Transient nodes have id [`Node::TRANSIENT_ID`]; a node returned by a
/// driver after `create` or `retrieve` carries the store-assigned id.
#[derive(Debug, Clone)]
pub struct Node {
    id: i64,
    otype: Option<Arc<SchemaType>>,
    properties: BTreeMap<String, String>,
    relationships: BTreeMap<String, BTreeSet<i64>>,
}

impl Node {
    pub const TRANSIENT_ID: i64 = -1;

    /// An untyped transient node. It accepts no properties or relationships
    /// until a type is set.
    pub fn new() -> Self {
        Self {
            id: Self::TRANSIENT_ID,
            otype: None,
            properties: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// A transient node of `otype` with every allowed key default-initialized.
    pub fn with_type(otype: Arc<SchemaType>) -> Self {
        let mut node = Self::new();
        node.set_type(otype);
        node
    }

    // ── Identity ─────────────────────────────────────────────────

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn is_persisted(&self) -> bool {
        self.id >= 0
    }

    pub fn wipe_id(&mut self) {
        self.id = Self::TRANSIENT_ID;
    }

    // ── Type ─────────────────────────────────────────────────────

    pub fn otype(&self) -> Option<&Arc<SchemaType>> {
        self.otype.as_ref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.otype.as_deref().map(SchemaType::name)
    }

    pub fn meta(&self) -> Option<&BTreeSet<String>> {
        self.otype.as_deref().map(SchemaType::meta)
    }

    /// Store labels: the type name followed by its meta types.
    pub fn labels(&self) -> Vec<&str> {
        self.otype
            .as_deref()
            .map(SchemaType::labels)
            .unwrap_or_default()
    }

    /// Replace the type. Properties and relationships are re-derived from
    /// the new type: every allowed key starts empty, previous values are lost.
    pub fn set_type(&mut self, otype: Arc<SchemaType>) {
        self.properties = otype
            .properties()
            .iter()
            .map(|key| (key.clone(), String::new()))
            .collect();
        self.relationships = otype
            .relationships()
            .iter()
            .map(|key| (key.clone(), BTreeSet::new()))
            .collect();
        self.otype = Some(otype);
    }

    pub fn wipe_type(&mut self) {
        self.otype = None;
    }

    // ── Properties ───────────────────────────────────────────────

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Properties with a non-empty value, in key order.
    pub fn non_empty_properties(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.properties
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Merge `values` into the properties. Keys the type does not allow are
    /// dropped.
    pub fn set_properties<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in values {
            let key = key.into();
            if self.allows_property(&key) {
                self.properties.insert(key, value.into());
            } else {
                tracing::debug!(key = %key, entity = ?self.entity(), "Dropping unknown property");
            }
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key: String = key.into();
        let value: String = value.into();
        self.set_properties([(key, value)]);
    }

    /// Reset every allowed property to the empty default.
    pub fn wipe_properties(&mut self) {
        self.properties.values_mut().for_each(String::clear);
    }

    pub fn name(&self) -> Option<&str> {
        self.property(NAME_PROPERTY)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set_property(NAME_PROPERTY, name);
    }

    // ── Relationships ────────────────────────────────────────────

    pub fn relationship(&self, name: &str) -> Option<&BTreeSet<i64>> {
        self.relationships.get(name)
    }

    pub fn relationships(&self) -> &BTreeMap<String, BTreeSet<i64>> {
        &self.relationships
    }

    /// Relationships with at least one related node id, in name order.
    pub fn non_empty_relationships(&self) -> impl Iterator<Item = (&str, &BTreeSet<i64>)> + '_ {
        self.relationships
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(name, ids)| (name.as_str(), ids))
    }

    /// Union `values` into the existing id sets. Names the type does not
    /// allow are dropped.
    pub fn add_relationships<K, I>(&mut self, values: impl IntoIterator<Item = (K, I)>)
    where
        K: Into<String>,
        I: IntoIterator<Item = i64>,
    {
        for (name, ids) in values {
            let name = name.into();
            if self.allows_relationship(&name) {
                self.relationships.entry(name).or_default().extend(ids);
            } else {
                tracing::debug!(relationship = %name, entity = ?self.entity(), "Dropping unknown relationship");
            }
        }
    }

    /// Replace the id sets for the given names. Names the type does not
    /// allow are dropped.
    pub fn set_relationships<K, I>(&mut self, values: impl IntoIterator<Item = (K, I)>)
    where
        K: Into<String>,
        I: IntoIterator<Item = i64>,
    {
        for (name, ids) in values {
            let name = name.into();
            if self.allows_relationship(&name) {
                self.relationships.insert(name, ids.into_iter().collect());
            } else {
                tracing::debug!(relationship = %name, entity = ?self.entity(), "Dropping unknown relationship");
            }
        }
    }

    /// Reset every allowed relationship to the empty set.
    pub fn wipe_relationships(&mut self) {
        self.relationships.values_mut().for_each(BTreeSet::clear);
    }

    /// True iff the relationship exists on this node and has at least one edge.
    pub fn has_relationship(&self, name: &str) -> bool {
        self.relationships
            .get(name)
            .is_some_and(|ids| !ids.is_empty())
    }

    pub fn check_relationship_availability<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> RelationshipAvailability {
        let mut all_available = true;
        let mut any_available = false;
        for name in names {
            if self.has_relationship(name.as_ref()) {
                any_available = true;
            } else {
                all_available = false;
            }
        }

        if all_available {
            RelationshipAvailability::AllAvailable
        } else if any_available {
            RelationshipAvailability::SomeAvailable
        } else {
            RelationshipAvailability::NoneAvailable
        }
    }

    pub fn relationships_purity<S: AsRef<str>>(&self, names: &[S]) -> RelationshipPurity {
        let mut purity = RelationshipPurity::default();
        for name in names {
            let name = name.as_ref();
            if self.has_relationship(name) {
                purity.present.push(name.to_string());
            } else {
                purity.absent.push(name.to_string());
            }
        }
        purity
    }

    // ── Whole-node operations ────────────────────────────────────

    /// Copy id, properties, and relationships from `other`. The type is
    /// adopted only when `other` has one; otherwise this node keeps its own.
    pub fn copy_from(&mut self, other: &Node) {
        self.id = other.id;
        self.properties = other.properties.clone();
        self.relationships = other.relationships.clone();
        if let Some(otype) = &other.otype {
            self.otype = Some(Arc::clone(otype));
        }
    }

    /// Reset id, type, properties, and relationships.
    pub fn wipe(&mut self) {
        self.wipe_id();
        self.wipe_type();
        self.properties.clear();
        self.relationships.clear();
    }

    fn allows_property(&self, key: &str) -> bool {
        self.otype
            .as_deref()
            .is_some_and(|otype| otype.allows_property(key))
    }

    fn allows_relationship(&self, name: &str) -> bool {
        self.otype
            .as_deref()
            .is_some_and(|otype| otype.allows_relationship(name))
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.meta() == other.meta()
            && self.properties == other.properties
            && self.relationships == other.relationships
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.meta().hash(state);
        self.properties.hash(state);
        self.relationships.hash(state);
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node(id = {}, type = {}, labels = {:?}, properties = {:?}, relationships = {:?})",
            self.id,
            self.entity().unwrap_or("-"),
            self.labels(),
            self.properties,
            self.relationships
        )
    }
}
