//! scientio-core: Ontology-typed node model for the Scientio knowledge graph.
//!
//! This crate provides the foundational types shared by every Scientio driver:
//! - Schema types and the schema registry (the "ontology")
//! - Typed nodes whose properties and relationships are bounded by their type
//! - JSON documents for exchanging nodes with clients
//! - Configuration management
//! - Common error types

pub mod config;
pub mod document;
pub mod error;
pub mod node;
pub mod ontology;

pub use config::ScientioConfig;
pub use document::NodeDocument;
pub use error::{OntologyError, ScientioError};
pub use node::{Node, RelationshipAvailability, RelationshipPurity};
pub use ontology::{SchemaRecord, SchemaRegistry, SchemaType};
