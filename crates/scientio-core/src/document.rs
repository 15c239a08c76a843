//! JSON exchange form of a [`Node`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::ontology::SchemaRegistry;

/// A node as clients write and read it: the type by name, and only the
/// properties and relationships that carry values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, BTreeSet<i64>>,
}

impl NodeDocument {
    /// Build a typed node against `ontology`.
    ///
    /// Returns `None` when the entity is missing or not registered. Keys the
    /// type does not allow are dropped.
    pub fn into_node(self, ontology: &SchemaRegistry) -> Option<Node> {
        let Some(entity) = self.entity.as_deref() else {
            tracing::warn!("Node document has no entity");
            return None;
        };
        let Some(otype) = ontology.get(entity) else {
            tracing::warn!(entity, "No such type in ontology");
            return None;
        };

        let mut node = Node::with_type(otype.clone());
        if let Some(id) = self.id {
            node.set_id(id);
        }
        node.set_properties(self.properties);
        node.set_relationships(self.relationships);
        Some(node)
    }
}

impl Node {
    pub fn to_document(&self) -> NodeDocument {
        NodeDocument::from(self)
    }
}

impl From<&Node> for NodeDocument {
    fn from(node: &Node) -> Self {
        Self {
            id: node.is_persisted().then_some(node.id()),
            entity: node.entity().map(str::to_string),
            properties: node
                .non_empty_properties()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            relationships: node
                .non_empty_relationships()
                .map(|(name, ids)| (name.to_string(), ids.clone()))
                .collect(),
        }
    }
}
