//! Command-line node arguments.

use std::collections::BTreeSet;

use clap::Args;

use scientio_core::NodeDocument;

/// A node given on the command line.
#[derive(Debug, Clone, Args)]
pub struct NodeArgs {
    /// Entity type name from the ontology.
    #[arg(short, long)]
    pub entity: String,

    /// Store id of an existing node.
    #[arg(long)]
    pub id: Option<i64>,

    /// Property as key=value (repeatable).
    #[arg(short, long = "prop", value_parser = parse_property)]
    pub props: Vec<(String, String)>,

    /// Relationship as NAME=id[,id...] (repeatable).
    #[arg(short, long = "rel", value_parser = parse_relationship)]
    pub rels: Vec<(String, Vec<i64>)>,
}

impl NodeArgs {
    /// Collect the arguments into a document. Repeated relationship names
    /// accumulate their ids.
    pub fn into_document(self) -> NodeDocument {
        let mut doc = NodeDocument {
            id: self.id,
            entity: Some(self.entity),
            properties: self.props.into_iter().collect(),
            ..Default::default()
        };
        for (name, ids) in self.rels {
            doc.relationships
                .entry(name)
                .or_insert_with(BTreeSet::new)
                .extend(ids);
        }
        doc
    }
}

/// Parse `key=value`. The value may be empty or contain `=`.
pub fn parse_property(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid property `{s}`: expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid property `{s}`: empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse `NAME=id[,id...]`.
pub fn parse_relationship(s: &str) -> Result<(String, Vec<i64>), String> {
    let (name, ids) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid relationship `{s}`: expected NAME=id[,id...]"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid relationship `{s}`: empty name"));
    }
    let ids = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>()
                .map_err(|e| format!("invalid node id `{id}` in `{s}`: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name.to_string(), ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_pairs() {
        assert_eq!(
            parse_property("name=Lucy").unwrap(),
            ("name".to_string(), "Lucy".to_string())
        );
        assert_eq!(
            parse_property("motto=a=b").unwrap(),
            ("motto".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_property("sex=").unwrap().1, "");
        assert!(parse_property("name").is_err());
        assert!(parse_property("=Lucy").is_err());
    }

    #[test]
    fn relationship_lists() {
        assert_eq!(
            parse_relationship("HAS_HOBBY=16, 25").unwrap(),
            ("HAS_HOBBY".to_string(), vec![16, 25])
        );
        assert_eq!(parse_relationship("FROM=").unwrap().1, Vec::<i64>::new());
        assert!(parse_relationship("FROM=ten").is_err());
        assert!(parse_relationship("FROM").is_err());
    }

    #[test]
    fn repeated_relationships_accumulate() {
        let args = NodeArgs {
            entity: "Person".to_string(),
            id: Some(7),
            props: vec![("name".to_string(), "Lucy".to_string())],
            rels: vec![
                ("FRIEND_OF".to_string(), vec![3]),
                ("FRIEND_OF".to_string(), vec![4, 3]),
            ],
        };
        let doc = args.into_document();
        assert_eq!(doc.id, Some(7));
        assert_eq!(doc.entity.as_deref(), Some("Person"));
        assert_eq!(doc.properties["name"], "Lucy");
        assert_eq!(doc.relationships["FRIEND_OF"], BTreeSet::from([3, 4]));
    }
}
