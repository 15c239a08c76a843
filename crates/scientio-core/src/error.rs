use thiserror::Error;

/// Errors raised while building or querying the schema registry.
#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("Empty ontology is invalid")]
    Empty,

    #[error("Failed to read ontology source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse ontology source: {0}")]
    Parse(String),

    #[error("Type {name} lists itself as a meta type")]
    SelfMeta { name: String },

    #[error("Type {name} is defined more than once")]
    DuplicateType { name: String },

    #[error("Meta types of {name} form a cycle")]
    MetaCycle { name: String },

    #[error("None of the labels {labels:?} name a known type")]
    UnknownLabels { labels: Vec<String> },

    #[error("Labels {labels:?} do not resolve to a single concrete type (candidates: {candidates:?})")]
    AmbiguousType {
        labels: Vec<String>,
        candidates: Vec<String>,
    },
}

/// Top-level error type for the Scientio platform.
#[derive(Error, Debug)]
pub enum ScientioError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Ontology error: {0}")]
    Ontology(#[from] OntologyError),

    #[error("No ontology configured: set ontology.path")]
    MissingOntology,
}
