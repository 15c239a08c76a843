//! scientio-graph: ontology-typed CRUD over a graph store.
//!
//! Nodes are validated against the session's ontology, rendered into Cypher
//! by the [`QueryBuilder`], executed through a [`GraphStore`], and the raw
//! id/label/property rows are decoded back into typed nodes.

pub mod client;
pub mod driver;
pub mod operations;
pub mod query;
pub mod session;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use driver::Neo4jDriver;
pub use operations::{Lookup, Operations};
pub use query::QueryBuilder;
pub use session::{DriverKind, Session, SessionError};
pub use store::{GraphStore, RawNode};
