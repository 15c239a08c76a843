//! Neo4j connection management and the store implementation behind the
//! Neo4j driver.

use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};

use scientio_core::config::Neo4jSettings;

use crate::store::{GraphStore, RawNode};

/// Errors from graph operations.
///
/// These are transport and contract failures of the backing store. Schema
/// mismatches and missing records are not errors; drivers report them as
/// empty results.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Neo4jSettings::default().into()
    }
}

impl From<Neo4jSettings> for GraphConfig {
    fn from(settings: Neo4jSettings) -> Self {
        Self {
            uri: settings.uri,
            user: settings.user,
            password: settings.password,
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn fetch_node(&self, statement: &str, column: &str) -> Result<Option<RawNode>, GraphError> {
        tracing::debug!(statement, "Fetching node");
        match self.query_one(query(statement)).await? {
            Some(row) => {
                let node: neo4rs::Node = row.get(column).map_err(|e| {
                    GraphError::Serialization(format!("Failed to deserialize node: {e}"))
                })?;
                Ok(Some(neo4j_node_to_raw(&node)))
            }
            None => Ok(None),
        }
    }

    async fn fetch_ids(&self, statement: &str, column: &str) -> Result<Vec<i64>, GraphError> {
        tracing::debug!(statement, "Fetching ids");
        match self.query_one(query(statement)).await? {
            Some(row) => row.get::<Vec<i64>>(column).map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize id list: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_id_groups(
        &self,
        statement: &str,
        name_column: &str,
        ids_column: &str,
    ) -> Result<Vec<(String, Vec<i64>)>, GraphError> {
        tracing::debug!(statement, "Fetching id groups");
        let rows = self.query_rows(query(statement)).await?;
        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get(name_column).map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize group name: {e}"))
            })?;
            let ids: Vec<i64> = row.get(ids_column).map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize group ids: {e}"))
            })?;
            groups.push((name, ids));
        }
        Ok(groups)
    }

    async fn execute(&self, statement: &str) -> Result<bool, GraphError> {
        tracing::debug!(statement, "Executing");
        Ok(self.query_one(query(statement)).await?.is_some())
    }
}

/// Convert a neo4rs::Node into a store-neutral RawNode.
///
/// Scalar properties are rendered as strings; list and map values have no
/// string form in the node model and are skipped.
fn neo4j_node_to_raw(node: &neo4rs::Node) -> RawNode {
    let mut properties = BTreeMap::new();
    for key in node.keys() {
        let key = key.to_string();
        match property_as_string(node, &key) {
            Some(value) => {
                properties.insert(key, value);
            }
            None => tracing::debug!(key = %key, node_id = node.id(), "Skipping non-scalar property"),
        }
    }

    RawNode {
        id: node.id(),
        labels: node.labels().iter().map(|l| l.to_string()).collect(),
        properties,
    }
}

fn property_as_string(node: &neo4rs::Node, key: &str) -> Option<String> {
    if let Ok(v) = node.get::<String>(key) {
        return Some(v);
    }
    if let Ok(v) = node.get::<i64>(key) {
        return Some(v.to_string());
    }
    if let Ok(v) = node.get::<f64>(key) {
        return Some(v.to_string());
    }
    node.get::<bool>(key).ok().map(|v| v.to_string())
}
