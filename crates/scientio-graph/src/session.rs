//! Sessions: one configured driver behind the [`Operations`] surface.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use scientio_core::{Node, SchemaRegistry};

use crate::client::{GraphConfig, GraphError};
use crate::driver::Neo4jDriver;
use crate::operations::{Lookup, Operations};

/// Errors from opening a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown driver: {0}. Choose: neo4j")]
    UnknownDriver(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// The drivers a session can be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Neo4j,
}

impl DriverKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Neo4j => "neo4j",
        }
    }
}

impl FromStr for DriverKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "neo4j" => Ok(Self::Neo4j),
            _ => Err(SessionError::UnknownDriver(s.to_string())),
        }
    }
}

/// Lightweight wrapper around an ontology-bound operations driver.
///
/// Every verb is forwarded unchanged to the driver.
pub struct Session {
    driver: Box<dyn Operations>,
}

impl Session {
    /// Open a session with the named driver.
    ///
    /// The driver name is checked before any connection is attempted.
    pub async fn connect(
        driver_name: &str,
        ontology: Arc<SchemaRegistry>,
        config: &GraphConfig,
    ) -> Result<Self, SessionError> {
        let kind: DriverKind = driver_name.parse()?;
        let driver: Box<dyn Operations> = match kind {
            DriverKind::Neo4j => Box::new(Neo4jDriver::connect(config, ontology).await?),
        };
        tracing::info!(driver = kind.name(), "Session opened");
        Ok(Self { driver })
    }

    /// Wrap an already constructed driver.
    pub fn from_operations(driver: Box<dyn Operations>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Operations for Session {
    async fn create(&self, request: &Node) -> Result<Option<Node>, GraphError> {
        self.driver.create(request).await
    }

    async fn retrieve(&self, lookup: Lookup<'_>) -> Result<Vec<Node>, GraphError> {
        self.driver.retrieve(lookup).await
    }

    async fn update(&self, request: &Node) -> Result<Option<Node>, GraphError> {
        self.driver.update(request).await
    }

    async fn delete(&self, request: &Node) -> Result<bool, GraphError> {
        self.driver.delete(request).await
    }
}
