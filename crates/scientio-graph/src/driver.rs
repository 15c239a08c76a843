//! Neo4j implementation of [`Operations`].
//!
//! Requests are checked against the ontology, rendered into Cypher, and run
//! through a [`GraphStore`]. Stored records come back as raw id/label/property
//! rows and are decoded into typed nodes, resolving the label set to its most
//! specific schema type.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use scientio_core::node::NAME_PROPERTY;
use scientio_core::{Node, OntologyError, SchemaRegistry, SchemaType};

use crate::client::{GraphClient, GraphConfig, GraphError};
use crate::operations::{Lookup, Operations};
use crate::query::{id_list, QueryBuilder};
use crate::store::GraphStore;

/// Driver translating typed node operations into Cypher.
pub struct Neo4jDriver<S = GraphClient> {
    store: S,
    ontology: Arc<SchemaRegistry>,
}

impl Neo4jDriver<GraphClient> {
    /// Connect to Neo4j and bind the driver to `ontology`.
    pub async fn connect(
        config: &GraphConfig,
        ontology: Arc<SchemaRegistry>,
    ) -> Result<Self, GraphError> {
        let client = GraphClient::connect(config).await?;
        Ok(Self::new(client, ontology))
    }
}

impl<S: GraphStore> Neo4jDriver<S> {
    pub fn new(store: S, ontology: Arc<SchemaRegistry>) -> Self {
        Self { store, ontology }
    }

    pub fn ontology(&self) -> &SchemaRegistry {
        &self.ontology
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Create ───────────────────────────────────────────────────

    /// Create a node labelled with its type and meta types, carrying its
    /// non-empty properties.
    pub async fn create_node(&self, request: &Node) -> Result<Option<Node>, GraphError> {
        let Some(otype) = self.registered_type(request) else {
            return Ok(None);
        };

        let statement = create_statement(request, otype);
        match self.store.fetch_node(&statement, "a").await? {
            Some(record) => {
                let mut created = request.clone();
                created.set_id(record.id);
                tracing::debug!(id = record.id, entity = otype.name(), "Node created");
                Ok(Some(created))
            }
            None => {
                tracing::warn!(entity = otype.name(), "Create returned no record");
                Ok(None)
            }
        }
    }

    // ── Retrieve ─────────────────────────────────────────────────

    /// Fetch and decode the node with `id`, including its relationships.
    pub async fn get_node_by_id(&self, id: i64) -> Result<Option<Node>, GraphError> {
        let statement = QueryBuilder::new().match_by_id(id, "n").add("RETURN n").get();
        let Some(record) = self.store.fetch_node(&statement, "n").await? else {
            tracing::debug!(id, "Node not found");
            return Ok(None);
        };

        let otype = match self.ontology.resolve_labels(&record.labels) {
            Ok(otype) => otype,
            Err(e @ OntologyError::AmbiguousType { .. }) => {
                tracing::warn!(id, error = %e, "Ambiguous node type, skipping record");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "Node type not in ontology, skipping record");
                return Ok(None);
            }
        };

        let mut node = Node::with_type(otype);
        node.set_id(record.id);
        node.set_properties(record.properties);

        let groups = self
            .store
            .fetch_id_groups(&relationships_statement(id), "name", "ids")
            .await?;
        node.set_relationships(groups);

        Ok(Some(node))
    }

    /// Find the nodes matching `example` and decode each by id.
    ///
    /// Empty properties and empty relationships are left out of the match,
    /// so an example carrying only a type matches every node of that type.
    pub async fn get_nodes(&self, example: &Node) -> Result<Vec<Node>, GraphError> {
        let Some(otype) = self.registered_type(example) else {
            return Ok(Vec::new());
        };

        let ids = self
            .store
            .fetch_ids(&match_statement(example, otype), "ids")
            .await?;

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get_node_by_id(id).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    // ── Update ───────────────────────────────────────────────────

    /// Set non-empty properties and merge non-empty relationships, then
    /// read the node back from the store.
    pub async fn update_node(&self, request: &Node) -> Result<Option<Node>, GraphError> {
        if self.registered_type(request).is_none() {
            return Ok(None);
        }
        if !request.is_persisted() {
            tracing::warn!(id = request.id(), "Cannot update a node that was never stored");
            return Ok(None);
        }
        let id = request.id();

        if let Some(statement) = set_properties_statement(request) {
            if !self.store.execute(&statement).await? {
                tracing::warn!(id, "Property update matched no node");
            }
        }

        if let Some(statement) = merge_relationships_statement(request) {
            if !self.store.execute(&statement).await? {
                tracing::warn!(id, "Relationship update matched no nodes");
            }
        }

        self.get_node_by_id(id).await
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Remove the properties and relationship edges listed on `request`.
    ///
    /// Returns true if any removal statement matched.
    pub async fn delete_properties_relationships(&self, request: &Node) -> Result<bool, GraphError> {
        if !request.is_persisted() {
            tracing::warn!(id = request.id(), "Cannot delete from a node that was never stored");
            return Ok(false);
        }

        let mut removed = false;

        if let Some(statement) = remove_properties_statement(request) {
            removed |= self.store.execute(&statement).await?;
        }

        for (name, ids) in request.non_empty_relationships() {
            let statement = delete_relationship_statement(request.id(), name, ids);
            removed |= self.store.execute(&statement).await?;
        }

        if !removed {
            tracing::debug!(id = request.id(), "Delete removed nothing");
        }
        Ok(removed)
    }

    fn registered_type<'a>(&self, node: &'a Node) -> Option<&'a Arc<SchemaType>> {
        match node.otype() {
            Some(otype) if self.ontology.contains_type(otype) => Some(otype),
            Some(otype) => {
                tracing::warn!(entity = otype.name(), "No such type in ontology");
                None
            }
            None => {
                tracing::warn!("Node has no type");
                None
            }
        }
    }
}

#[async_trait]
impl<S: GraphStore> Operations for Neo4jDriver<S> {
    async fn create(&self, request: &Node) -> Result<Option<Node>, GraphError> {
        self.create_node(request).await
    }

    async fn retrieve(&self, lookup: Lookup<'_>) -> Result<Vec<Node>, GraphError> {
        match lookup {
            Lookup::Id(id) if id >= 0 => Ok(self.get_node_by_id(id).await?.into_iter().collect()),
            Lookup::Id(id) => {
                tracing::warn!(id, "Invalid node id");
                Ok(Vec::new())
            }
            Lookup::Example(example) => self.get_nodes(example).await,
        }
    }

    async fn update(&self, request: &Node) -> Result<Option<Node>, GraphError> {
        self.update_node(request).await
    }

    async fn delete(&self, request: &Node) -> Result<bool, GraphError> {
        self.delete_properties_relationships(request).await
    }
}

// ── Statements ───────────────────────────────────────────────────

fn labelled_pattern(builder: &mut QueryBuilder, clause: &str, node: &Node, otype: &SchemaType) {
    builder.add(clause).add_meta(&otype.labels());
    let properties: Vec<_> = node.non_empty_properties().collect();
    if !properties.is_empty() {
        builder.add_parameters(properties);
    }
    builder.add(")");
}

fn create_statement(node: &Node, otype: &SchemaType) -> String {
    let mut builder = QueryBuilder::new();
    labelled_pattern(&mut builder, "CREATE (a:", node, otype);
    builder.add("RETURN a").get()
}

fn match_statement(node: &Node, otype: &SchemaType) -> String {
    let mut builder = QueryBuilder::new();
    labelled_pattern(&mut builder, "MATCH (n:", node, otype);
    for (i, (name, ids)) in node.non_empty_relationships().enumerate() {
        builder.add(&format!(
            "MATCH (n)-[r{i}:{name}]-(m{i}) WHERE ID(m{i}) IN {}",
            id_list(ids)
        ));
    }
    builder.add("RETURN COLLECT(DISTINCT ID(n)) AS ids").get()
}

fn relationships_statement(id: i64) -> String {
    QueryBuilder::new()
        .add(&format!("MATCH (n)-[r]-(m) WHERE ID(n)={id}"))
        .add("RETURN TYPE(r) AS name, COLLECT(ID(m)) AS ids")
        .get()
}

fn set_properties_statement(node: &Node) -> Option<String> {
    let properties: Vec<_> = node.non_empty_properties().collect();
    if properties.is_empty() {
        return None;
    }
    let mut builder = QueryBuilder::new();
    builder
        .match_by_id(node.id(), "n")
        .set_values(properties, "n")
        .add("RETURN n");
    Some(builder.get())
}

fn merge_relationships_statement(node: &Node) -> Option<String> {
    let relationships: Vec<_> = node.non_empty_relationships().collect();
    if relationships.is_empty() {
        return None;
    }
    let mut builder = QueryBuilder::new();
    builder.match_by_id(node.id(), "n");
    for (i, (_, ids)) in relationships.iter().enumerate() {
        builder.add(&format!("MATCH (m{i}) WHERE ID(m{i}) IN {}", id_list(*ids)));
    }
    for (i, (name, _)) in relationships.iter().enumerate() {
        builder.add(&format!("MERGE (n)-[r{i}:{name}]-(m{i})"));
    }
    Some(builder.add("RETURN n").get())
}

fn remove_properties_statement(node: &Node) -> Option<String> {
    let keys: Vec<&str> = node
        .non_empty_properties()
        .map(|(key, _)| key)
        .filter(|key| *key != NAME_PROPERTY)
        .collect();
    if keys.is_empty() {
        return None;
    }
    let mut builder = QueryBuilder::new();
    builder.match_by_id(node.id(), "n");
    for key in keys {
        builder.add(&format!("REMOVE n.{key}"));
    }
    Some(builder.add("RETURN n").get())
}

fn delete_relationship_statement(id: i64, name: &str, ids: &BTreeSet<i64>) -> String {
    QueryBuilder::new()
        .add(&format!(
            "MATCH (n)-[r:{name}]-(m) WHERE ID(n)={id} AND ID(m) IN {}",
            id_list(ids)
        ))
        .add("DELETE r RETURN DISTINCT ID(n) AS id")
        .get()
}
