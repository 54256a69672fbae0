//! Netclad – an in-memory semantic knowledge base for network topology facts.
//!
//! Facts are RDF-style triples `(subject, predicate, object)` where subjects
//! and predicates are resources and objects are resources or typed literals:
//! * A [`construct::Triple`] is kept once per store; every distinct triple and
//!   every distinct term gets an opaque [`construct::Thing`] identity.
//! * A [`construct::TripleStore`] indexes triples by subject, predicate and
//!   object using roaring bitmaps, so pattern matching is bitmap intersection.
//! * A [`schema::SchemaIndex`] holds the declared classes and properties with
//!   their `rdfs:subClassOf` / `rdfs:subPropertyOf` closures.
//!
//! ## Modules
//! * [`construct`] – Terms, triples, keepers and the indexed triple store.
//! * [`datatype`] – The supported XSD literal datatypes.
//! * [`schema`] – Class and property hierarchy with precomputed closures.
//! * [`reasoner`] – RDFS type materialization and schema validation.
//! * [`graph`] – Base triples together with the lazily derived inferred view.
//! * [`query`] – Parser for a SPARQL `SELECT` subset (grammar in `query.pest`).
//! * [`engine`] – Evaluation of parsed queries against a graph view.
//! * [`topology`] – Network topology analyses producing [`finding::Finding`]s.
//! * [`interface`] – The transactional [`interface::KnowledgeBase`] façade.
//! * [`persist`] – Optional SQLite snapshots with a blake3 digest ledger.
//! * [`server`] – HTTP endpoints on top of the façade.
//!
//! ## Reasoning
//! Inference is recomputed on first read after a committed change. Every
//! instance of a class is also typed with each of its superclasses, so a
//! query for `?d a net:NetworkDevice` finds routers and switches alike.
//!
//! ## Quick Start
//! ```
//! use netclad::construct::{Resource, Triple};
//! use netclad::interface::KnowledgeBase;
//! use netclad::persist::PersistenceMode;
//! use netclad::vocabulary::{rdf_type, subclass_of, NETWORK_NS};
//!
//! let kb = KnowledgeBase::new(PersistenceMode::InMemory).unwrap();
//! let net = |name: &str| Resource::named(format!("{}{}", NETWORK_NS, name));
//! let mut tx = kb.begin_write().unwrap();
//! tx.insert(Triple::new(net("Router"), subclass_of(), net("NetworkDevice"))).unwrap();
//! tx.insert(Triple::new(net("r1"), rdf_type(), net("Router"))).unwrap();
//! tx.commit().unwrap();
//! let result = kb
//!     .execute("PREFIX net: <http://example.org/network-topology#> SELECT ?d WHERE { ?d a net:NetworkDevice }")
//!     .unwrap();
//! assert_eq!(result.len(), 1);
//! ```

pub mod construct;
pub mod datatype;
pub mod engine;
pub mod error;
pub mod finding;
pub mod graph;
pub mod interface;
pub mod persist;
pub mod query;
pub mod reasoner;
pub mod schema;
pub mod server;
pub mod settings;
pub mod topology;
pub mod vocabulary;
