//! The base triples plus the derived view computed from them.
//!
//! Derived data (the schema index and the materialized inference) is a pure
//! function of the base triples. It is dropped by every mutation and rebuilt
//! the first time a reader asks for it, so a query never sees stale
//! inference.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use tracing::debug;

use crate::construct::{Resource, Term, Triple, TripleSource, TripleStore};
use crate::reasoner::materialize_inference;
use crate::schema::SchemaIndex;
use crate::vocabulary::rdf_type;

#[derive(Debug)]
pub struct Derived {
    pub schema: SchemaIndex,
    pub inferred: TripleStore,
}

#[derive(Debug, Default)]
pub struct Graph {
    base: TripleStore,
    derived: OnceLock<Derived>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, triple: Triple) -> bool {
        let changed = self.base.insert(triple);
        if changed {
            self.derived.take();
        }
        changed
    }
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let changed = self.base.remove(triple);
        if changed {
            self.derived.take();
        }
        changed
    }
    pub fn clear(&mut self) {
        self.base.clear();
        self.derived.take();
    }
    pub fn base(&self) -> &TripleStore {
        &self.base
    }
    pub fn len(&self) -> usize {
        self.base.len()
    }
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
    pub fn derived(&self) -> &Derived {
        self.derived.get_or_init(|| {
            let schema = SchemaIndex::build(&self.base);
            let inferred = materialize_inference(&self.base, &schema);
            debug!(
                base = self.base.len(),
                inferred = inferred.len(),
                classes = schema.classes().count(),
                "derived view rebuilt"
            );
            Derived { schema, inferred }
        })
    }
    pub fn schema(&self) -> &SchemaIndex {
        &self.derived().schema
    }
    /// Base and inferred triples together, as queries see them.
    pub fn view(&self) -> GraphView<'_> {
        let derived = self.derived();
        GraphView {
            base: &self.base,
            inferred: &derived.inferred,
            schema: &derived.schema,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GraphView<'g> {
    base: &'g TripleStore,
    inferred: &'g TripleStore,
    schema: &'g SchemaIndex,
}

impl<'g> GraphView<'g> {
    pub fn schema(&self) -> &'g SchemaIndex {
        self.schema
    }
    pub fn inferred(&self) -> &'g TripleStore {
        self.inferred
    }
    pub fn len(&self) -> usize {
        self.base.len() + self.inferred.len()
    }
    /// Resources typed with the class, directly or through inference.
    pub fn instances_of(&self, class: &Resource) -> BTreeSet<Resource> {
        self.subjects(&rdf_type(), &Term::Resource(class.clone()))
            .into_iter()
            .collect()
    }
    pub fn types_of(&self, resource: &Resource) -> BTreeSet<Resource> {
        self.objects(resource, &rdf_type())
            .into_iter()
            .filter_map(|t| match t {
                Term::Resource(r) => Some(r),
                Term::Literal(_) => None,
            })
            .collect()
    }
}

impl TripleSource for GraphView<'_> {
    fn matching<'s>(
        &'s self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Term>,
    ) -> Box<dyn Iterator<Item = Triple> + 's> {
        // inferred triples never duplicate base triples, so chaining keeps set semantics
        Box::new(
            self.base
                .matching(subject, predicate, object)
                .chain(self.inferred.matching(subject, predicate, object)),
        )
    }
    fn contains(&self, triple: &Triple) -> bool {
        self.base.contains(triple) || self.inferred.contains(triple)
    }
}
