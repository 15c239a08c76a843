//! The seam between drivers and a backing graph store.
//!
//! Drivers submit statement text and read back one of a few row shapes: a
//! single node record, a single id list, `(name, ids)` groups, or just
//! "did anything come back".

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::client::GraphError;

/// A stored node as the store returns it: identity, every label attached to
/// it, and its properties rendered as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNode {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

/// Statement execution against a graph store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run `statement` and decode `column` of the first row as a node.
    async fn fetch_node(&self, statement: &str, column: &str) -> Result<Option<RawNode>, GraphError>;

    /// Run `statement` and decode `column` of the first row as an id list.
    /// No row yields an empty list.
    async fn fetch_ids(&self, statement: &str, column: &str) -> Result<Vec<i64>, GraphError>;

    /// Run `statement` and decode every row as a `(name, ids)` pair.
    async fn fetch_id_groups(
        &self,
        statement: &str,
        name_column: &str,
        ids_column: &str,
    ) -> Result<Vec<(String, Vec<i64>)>, GraphError>;

    /// Run `statement`; true if it returned at least one row.
    async fn execute(&self, statement: &str) -> Result<bool, GraphError>;
}
