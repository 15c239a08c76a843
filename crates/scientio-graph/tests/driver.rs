//! Driver tests against a scripted in-process store.
//!
//! The store replays canned rows keyed by exact statement text and records
//! every statement it receives, so these tests pin both the emitted Cypher
//! and the decoding of raw rows into typed nodes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scientio_core::{Node, SchemaRegistry, SchemaType};
use scientio_graph::{
    GraphError, GraphStore, Lookup, Neo4jDriver, Operations, RawNode, Session,
};

#[derive(Default)]
struct ScriptedStore {
    nodes: HashMap<String, RawNode>,
    id_lists: HashMap<String, Vec<i64>>,
    groups: HashMap<String, Vec<(String, Vec<i64>)>>,
    writes: HashMap<String, bool>,
    log: Mutex<Vec<String>>,
}

impl ScriptedStore {
    fn with_node(mut self, statement: &str, node: RawNode) -> Self {
        self.nodes.insert(statement.to_string(), node);
        self
    }

    fn with_ids(mut self, statement: &str, ids: Vec<i64>) -> Self {
        self.id_lists.insert(statement.to_string(), ids);
        self
    }

    fn with_groups(mut self, statement: &str, groups: Vec<(&str, Vec<i64>)>) -> Self {
        let groups = groups
            .into_iter()
            .map(|(name, ids)| (name.to_string(), ids))
            .collect();
        self.groups.insert(statement.to_string(), groups);
        self
    }

    fn with_write(mut self, statement: &str, matched: bool) -> Self {
        self.writes.insert(statement.to_string(), matched);
        self
    }

    fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, statement: &str) {
        self.log.lock().unwrap().push(statement.to_string());
    }
}

#[async_trait]
impl GraphStore for ScriptedStore {
    async fn fetch_node(&self, statement: &str, _column: &str) -> Result<Option<RawNode>, GraphError> {
        self.record(statement);
        Ok(self.nodes.get(statement).cloned())
    }

    async fn fetch_ids(&self, statement: &str, _column: &str) -> Result<Vec<i64>, GraphError> {
        self.record(statement);
        Ok(self.id_lists.get(statement).cloned().unwrap_or_default())
    }

    async fn fetch_id_groups(
        &self,
        statement: &str,
        _name_column: &str,
        _ids_column: &str,
    ) -> Result<Vec<(String, Vec<i64>)>, GraphError> {
        self.record(statement);
        Ok(self.groups.get(statement).cloned().unwrap_or_default())
    }

    async fn execute(&self, statement: &str) -> Result<bool, GraphError> {
        self.record(statement);
        Ok(self.writes.get(statement).copied().unwrap_or(false))
    }
}

/// A store that is always down.
struct UnreachableStore;

#[async_trait]
impl GraphStore for UnreachableStore {
    async fn fetch_node(&self, _: &str, _: &str) -> Result<Option<RawNode>, GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }

    async fn fetch_ids(&self, _: &str, _: &str) -> Result<Vec<i64>, GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }

    async fn fetch_id_groups(
        &self,
        _: &str,
        _: &str,
        _: &str,
    ) -> Result<Vec<(String, Vec<i64>)>, GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }

    async fn execute(&self, _: &str) -> Result<bool, GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }
}

// ── Fixtures ─────────────────────────────────────────────────────

fn ontology() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new([
            SchemaType::new("Agent", &["name"], &[], &[]).unwrap(),
            SchemaType::new(
                "Person",
                &["name", "sex", "birthdate"],
                &["FROM", "STUDY_AT", "HAS_HOBBY", "FRIEND_OF"],
                &["Agent"],
            )
            .unwrap(),
            SchemaType::new("Country", &["name"], &[], &[]).unwrap(),
            SchemaType::new("Hobby", &["name"], &[], &[]).unwrap(),
        ])
        .unwrap(),
    )
}

fn person(ontology: &SchemaRegistry) -> Node {
    Node::with_type(ontology.get("Person").unwrap().clone())
}

fn raw(id: i64, labels: &[&str], properties: &[(&str, &str)]) -> RawNode {
    RawNode {
        id,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        properties: properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

const BY_ID_7: &str = "MATCH (n) WHERE ID(n)=7 RETURN n";
const RELS_7: &str =
    "MATCH (n)-[r]-(m) WHERE ID(n)=7 RETURN TYPE(r) AS name, COLLECT(ID(m)) AS ids";

// ── Create ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_store_id() {
    let ontology = ontology();
    let store = ScriptedStore::default().with_node(
        "CREATE (a: Person:Agent {name: 'Lucy', sex: 'female'} ) RETURN a",
        raw(42, &["Person", "Agent"], &[("name", "Lucy"), ("sex", "female")]),
    );
    let driver = Neo4jDriver::new(store, ontology.clone());

    let mut request = person(&ontology);
    request.set_properties([("name", "Lucy"), ("sex", "female")]);

    let created = driver.create(&request).await.unwrap().unwrap();
    assert_eq!(created.id(), 42);
    assert_eq!(created.properties(), request.properties());
    assert_eq!(driver.store().statements().len(), 1);
}

#[tokio::test]
async fn create_rejects_unregistered_type() {
    let ontology = ontology();
    let driver = Neo4jDriver::new(ScriptedStore::default(), ontology);

    let planet = Arc::new(SchemaType::new("Planet", &["name"], &[], &[]).unwrap());
    let mut request = Node::with_type(planet);
    request.set_name("Mars");

    assert!(driver.create(&request).await.unwrap().is_none());
    assert!(driver.create(&Node::new()).await.unwrap().is_none());
    assert!(driver.store().statements().is_empty());
}

// ── Retrieve by id ───────────────────────────────────────────────

#[tokio::test]
async fn retrieve_by_id_decodes_most_specific_type() {
    let store = ScriptedStore::default()
        .with_node(
            BY_ID_7,
            raw(
                7,
                &["Agent", "Person"],
                &[("name", "Lucy"), ("sex", "female"), ("height", "170")],
            ),
        )
        .with_groups(
            RELS_7,
            vec![("FROM", vec![10]), ("HAS_HOBBY", vec![16, 25]), ("OWNS", vec![99])],
        );
    let driver = Neo4jDriver::new(store, ontology());

    let nodes = driver.retrieve(Lookup::Id(7)).await.unwrap();
    assert_eq!(nodes.len(), 1);
    let node = &nodes[0];

    assert_eq!(node.id(), 7);
    assert_eq!(node.entity(), Some("Person"));
    assert_eq!(node.name(), Some("Lucy"));
    assert_eq!(node.property("sex"), Some("female"));
    assert_eq!(node.property("birthdate"), Some(""));
    assert_eq!(node.property("height"), None);
    assert_eq!(node.relationship("FROM"), Some(&BTreeSet::from([10])));
    assert_eq!(node.relationship("HAS_HOBBY"), Some(&BTreeSet::from([16, 25])));
    assert_eq!(node.relationship("STUDY_AT"), Some(&BTreeSet::new()));
    assert!(node.relationship("OWNS").is_none());

    assert_eq!(driver.store().statements(), vec![BY_ID_7, RELS_7]);
}

#[tokio::test]
async fn ambiguous_labels_yield_no_node() {
    let store =
        ScriptedStore::default().with_node(BY_ID_7, raw(7, &["Country", "Hobby"], &[("name", "x")]));
    let driver = Neo4jDriver::new(store, ontology());

    assert!(driver.retrieve(Lookup::Id(7)).await.unwrap().is_empty());
    assert_eq!(driver.store().statements(), vec![BY_ID_7]);
}

#[tokio::test]
async fn missing_or_invalid_id_yields_empty_list() {
    let driver = Neo4jDriver::new(ScriptedStore::default(), ontology());

    assert!(driver.retrieve(Lookup::Id(7)).await.unwrap().is_empty());
    assert!(driver.retrieve(Lookup::Id(-1)).await.unwrap().is_empty());
    assert_eq!(driver.store().statements(), vec![BY_ID_7]);
}

// ── Retrieve by example ──────────────────────────────────────────

#[tokio::test]
async fn retrieve_by_example_decodes_each_match() {
    let ontology = ontology();
    let store = ScriptedStore::default()
        .with_ids(
            "MATCH (n: Person:Agent {sex: 'female'} ) \
             MATCH (n)-[r0:FROM]-(m0) WHERE ID(m0) IN [10] \
             RETURN COLLECT(DISTINCT ID(n)) AS ids",
            vec![7, 8],
        )
        .with_node(BY_ID_7, raw(7, &["Person", "Agent"], &[("name", "Lucy"), ("sex", "female")]))
        .with_groups(RELS_7, vec![("FROM", vec![10])])
        .with_node(
            "MATCH (n) WHERE ID(n)=8 RETURN n",
            raw(8, &["Country", "Hobby"], &[]),
        );
    let driver = Neo4jDriver::new(store, ontology.clone());

    let mut example = person(&ontology);
    example.set_property("sex", "female");
    example.add_relationships([("FROM", vec![10])]);

    let nodes = driver.retrieve(Lookup::Example(&example)).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id(), 7);
    assert_eq!(nodes[0].name(), Some("Lucy"));
}

#[tokio::test]
async fn example_with_only_a_type_matches_all_of_it() {
    let ontology = ontology();
    let driver = Neo4jDriver::new(ScriptedStore::default(), ontology.clone());

    let nodes = driver
        .retrieve(Lookup::Example(&person(&ontology)))
        .await
        .unwrap();
    assert!(nodes.is_empty());
    assert_eq!(
        driver.store().statements(),
        vec!["MATCH (n: Person:Agent ) RETURN COLLECT(DISTINCT ID(n)) AS ids"]
    );
}

// ── Update ───────────────────────────────────────────────────────

#[tokio::test]
async fn update_persists_then_rereads_from_store() {
    let ontology = ontology();
    let set_props = "MATCH (n) WHERE ID(n)=7 SET n.birthdate='1999-01-01' SET n.name='Lucy' RETURN n";
    let merge_rels = "MATCH (n) WHERE ID(n)=7 MATCH (m0) WHERE ID(m0) IN [30] \
                      MERGE (n)-[r0:FRIEND_OF]-(m0) RETURN n";
    let store = ScriptedStore::default()
        .with_write(set_props, true)
        .with_write(merge_rels, true)
        .with_node(
            BY_ID_7,
            raw(
                7,
                &["Person", "Agent"],
                &[("name", "Lucy"), ("sex", "female"), ("birthdate", "1999-01-01")],
            ),
        )
        .with_groups(RELS_7, vec![("FRIEND_OF", vec![30]), ("FROM", vec![10])]);
    let driver = Neo4jDriver::new(store, ontology.clone());

    let mut request = person(&ontology);
    request.set_id(7);
    request.set_properties([("name", "Lucy"), ("birthdate", "1999-01-01")]);
    request.add_relationships([("FRIEND_OF", vec![30])]);

    let updated = driver.update(&request).await.unwrap().unwrap();
    assert_eq!(updated.property("sex"), Some("female"));
    assert!(updated.has_relationship("FROM"));
    assert_ne!(updated, request);

    assert_eq!(
        driver.store().statements(),
        vec![set_props, merge_rels, BY_ID_7, RELS_7]
    );
}

#[tokio::test]
async fn update_requires_stored_registered_node() {
    let ontology = ontology();
    let driver = Neo4jDriver::new(ScriptedStore::default(), ontology.clone());

    let mut transient = person(&ontology);
    transient.set_name("Lucy");
    assert!(driver.update(&transient).await.unwrap().is_none());

    let mut untyped = Node::new();
    untyped.set_id(7);
    assert!(driver.update(&untyped).await.unwrap().is_none());

    assert!(driver.store().statements().is_empty());
}

// ── Delete ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_only_listed_attributes() {
    let ontology = ontology();
    let remove_sex = "MATCH (n) WHERE ID(n)=7 REMOVE n.sex RETURN n";
    let driver = Neo4jDriver::new(
        ScriptedStore::default().with_write(remove_sex, true),
        ontology.clone(),
    );

    let mut request = person(&ontology);
    request.set_id(7);
    request.set_properties([("name", "Lucy"), ("sex", "female")]);

    assert!(driver.delete(&request).await.unwrap());
    assert_eq!(driver.store().statements(), vec![remove_sex]);
}

#[tokio::test]
async fn delete_removes_listed_edges() {
    let ontology = ontology();
    let delete_from = "MATCH (n)-[r:FROM]-(m) WHERE ID(n)=7 AND ID(m) IN [10] \
                       DELETE r RETURN DISTINCT ID(n) AS id";
    let delete_hobby = "MATCH (n)-[r:HAS_HOBBY]-(m) WHERE ID(n)=7 AND ID(m) IN [16, 25] \
                        DELETE r RETURN DISTINCT ID(n) AS id";
    let driver = Neo4jDriver::new(
        ScriptedStore::default().with_write(delete_hobby, true),
        ontology.clone(),
    );

    let mut request = person(&ontology);
    request.set_id(7);
    request.set_relationships([("FROM", vec![10]), ("HAS_HOBBY", vec![16, 25])]);

    assert!(driver.delete(&request).await.unwrap());
    assert_eq!(driver.store().statements(), vec![delete_from, delete_hobby]);
}

#[tokio::test]
async fn delete_with_nothing_to_remove() {
    let ontology = ontology();
    let driver = Neo4jDriver::new(ScriptedStore::default(), ontology.clone());

    let mut named = person(&ontology);
    named.set_id(7);
    named.set_name("Lucy");
    assert!(!driver.delete(&named).await.unwrap());

    let mut transient = person(&ontology);
    transient.set_property("sex", "female");
    assert!(!driver.delete(&transient).await.unwrap());

    assert!(driver.store().statements().is_empty());
}

// ── Round trip ───────────────────────────────────────────────────

#[tokio::test]
async fn decoded_node_matches_encoded_request() {
    let ontology = ontology();
    let mut request = person(&ontology);
    request.set_properties([("name", "Negin"), ("sex", "female")]);
    request.set_relationships([
        ("FROM", vec![10]),
        ("STUDY_AT", vec![14]),
        ("HAS_HOBBY", vec![16, 25]),
    ]);

    let stored_properties: Vec<(&str, &str)> = request.non_empty_properties().collect();
    let store = ScriptedStore::default()
        .with_node(
            "CREATE (a: Person:Agent {name: 'Negin', sex: 'female'} ) RETURN a",
            raw(7, &["Person", "Agent"], &stored_properties),
        )
        .with_node(BY_ID_7, raw(7, &["Person", "Agent"], &stored_properties))
        .with_groups(
            RELS_7,
            request
                .non_empty_relationships()
                .map(|(name, ids)| (name, ids.iter().copied().collect()))
                .collect(),
        );
    let driver = Neo4jDriver::new(store, ontology.clone());

    let created = driver.create(&request).await.unwrap().unwrap();
    let decoded = driver.retrieve(Lookup::Id(created.id())).await.unwrap();

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].properties(), request.properties());
    assert_eq!(decoded[0].relationships(), request.relationships());
    assert_eq!(decoded[0], created);
}

// ── Store failures ───────────────────────────────────────────────

#[tokio::test]
async fn store_failures_propagate() {
    let ontology = ontology();
    let driver = Neo4jDriver::new(UnreachableStore, ontology.clone());

    let mut request = person(&ontology);
    request.set_name("Lucy");
    assert!(matches!(
        driver.create(&request).await,
        Err(GraphError::Connection(_))
    ));
    assert!(driver.retrieve(Lookup::Id(1)).await.is_err());
}

// ── Session ──────────────────────────────────────────────────────

#[tokio::test]
async fn session_forwards_to_its_driver() {
    let ontology = ontology();
    let store = ScriptedStore::default().with_node(
        "CREATE (a: Person:Agent {name: 'Lucy'} ) RETURN a",
        raw(3, &["Person", "Agent"], &[("name", "Lucy")]),
    );
    let session = Session::from_operations(Box::new(Neo4jDriver::new(store, ontology.clone())));

    let mut request = person(&ontology);
    request.set_name("Lucy");
    let created = session.create(&request).await.unwrap().unwrap();
    assert_eq!(created.id(), 3);

    assert!(session.retrieve(Lookup::Id(99)).await.unwrap().is_empty());
    assert!(session.update(&Node::new()).await.unwrap().is_none());
    assert!(!session.delete(&Node::new()).await.unwrap());
}
