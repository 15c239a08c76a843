//! The CRUD surface shared by every driver and by [`Session`](crate::Session).

use async_trait::async_trait;

use scientio_core::Node;

use crate::client::GraphError;

/// How `retrieve` selects nodes.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    /// The stored node with this id.
    Id(i64),
    /// Every stored node matching the example's type, non-empty properties,
    /// and non-empty relationships.
    Example(&'a Node),
}

/// CRUD operations within a graph memory.
///
/// Schema violations and missing records are reported as `None`, an empty
/// list, or `false`. Only store failures surface as `Err`.
#[async_trait]
pub trait Operations: Send + Sync {
    /// Persist a new node. Returns the request with its store-assigned id,
    /// or `None` if its type is not in the ontology.
    async fn create(&self, request: &Node) -> Result<Option<Node>, GraphError>;

    /// Retrieve nodes by id or by example.
    async fn retrieve(&self, lookup: Lookup<'_>) -> Result<Vec<Node>, GraphError>;

    /// Persist the non-empty properties and relationships of a stored node,
    /// then return it as freshly read back from the store.
    async fn update(&self, request: &Node) -> Result<Option<Node>, GraphError>;

    /// Remove the non-`name` properties and the relationship edges listed on
    /// the request. The node itself stays in the store.
    async fn delete(&self, request: &Node) -> Result<bool, GraphError>;
}
