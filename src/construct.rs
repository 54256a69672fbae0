// used to keep the one-to-one mapping between terms and their assigned identities
use bimap::BiMap;

// used for the position indexes, since every triple is a thing we can "join" them as bitsets
use roaring::RoaringTreemap;

// we will use a fast hashing algo for the lookups
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::borrow::Cow;
use std::collections::HashMap;

// used to print out readable forms of a construct
use std::fmt;

use serde::{Serialize, Serializer};

// our own stuff that we need
use crate::datatype::{Datatype, leading_number, parse_boolean, parse_double};
use crate::error::{NetcladError, Result};

// ------------- Thing -------------
pub type Thing = u64;

pub type ThingHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: Thing = 0;

#[derive(Debug, Default)]
pub struct ThingGenerator {
    lower_bound: Thing,
    released: Vec<Thing>,
}

impl ThingGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: GENESIS,
            released: Vec::new(),
        }
    }
    // Identities of removed triples are handed out again, so the id space
    // stays dense under churn.
    pub fn release(&mut self, t: Thing) {
        self.released.push(t);
    }
    pub fn generate(&mut self) -> Thing {
        self.released.pop().unwrap_or_else(|| {
            self.lower_bound += 1;
            self.lower_bound
        })
    }
}

// ------------- Resource -------------
/// A node identifier, either a URI or an anonymous (blank) node id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Named(String),
    Blank(String),
}

impl Resource {
    pub fn named(uri: impl Into<String>) -> Self {
        Resource::Named(uri.into())
    }
    pub fn blank(id: impl Into<String>) -> Self {
        Resource::Blank(id.into())
    }
    /// The URI or blank node id.
    pub fn as_str(&self) -> &str {
        match self {
            Resource::Named(uri) => uri,
            Resource::Blank(id) => id,
        }
    }
    pub fn is_blank(&self) -> bool {
        matches!(self, Resource::Blank(_))
    }
    /// The part of a URI after its last `#` or `/`.
    pub fn local_name(&self) -> &str {
        let s = self.as_str();
        match s.rfind(['#', '/']) {
            Some(i) if i + 1 < s.len() => &s[i + 1..],
            _ => s,
        }
    }
    fn check(&self) -> Result<()> {
        if self.as_str().trim().is_empty() {
            return Err(NetcladError::InvalidTerm(
                "resource identifiers cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resource::Named(uri) => write!(f, "<{}>", uri),
            Resource::Blank(id) => write!(f, "_:{}", id),
        }
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Resource::Named(uri) => serializer.serialize_str(uri),
            Resource::Blank(id) => serializer.serialize_str(&format!("_:{id}")),
        }
    }
}

// ------------- Literal -------------
/// A typed scalar. Two literals are equal iff lexical form and datatype match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    lexical: String,
    datatype: Datatype,
}

impl Literal {
    pub fn new(lexical: impl Into<String>, datatype: Datatype) -> Result<Self> {
        let lexical = lexical.into();
        if !datatype.validate(&lexical) {
            return Err(NetcladError::InvalidTerm(format!(
                "'{}' is not a valid {}",
                lexical, datatype
            )));
        }
        Ok(Self { lexical, datatype })
    }
    pub fn string(value: impl Into<String>) -> Self {
        Self { lexical: value.into(), datatype: Datatype::String }
    }
    pub fn integer(value: i64) -> Self {
        Self { lexical: value.to_string(), datatype: Datatype::Integer }
    }
    pub fn double(value: f64) -> Self {
        // Debug keeps the fractional part, so 2.0 stays "2.0"
        Self { lexical: format!("{:?}", value), datatype: Datatype::Double }
    }
    pub fn boolean(value: bool) -> Self {
        Self { lexical: value.to_string(), datatype: Datatype::Boolean }
    }
    pub fn lexical(&self) -> &str {
        &self.lexical
    }
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }
    pub fn is_numeric(&self) -> bool {
        self.datatype.is_numeric()
    }
    /// The value of a numeric literal.
    pub fn numeric_value(&self) -> Option<f64> {
        match self.datatype {
            Datatype::Integer | Datatype::Double => parse_double(&self.lexical),
            _ => None,
        }
    }
    pub fn boolean_value(&self) -> Option<bool> {
        match self.datatype {
            Datatype::Boolean => parse_boolean(&self.lexical),
            _ => None,
        }
    }
    /// Reads the literal as a double the way a cast does: numbers as they
    /// are, strings by their leading numeric prefix, booleans as 0 or 1.
    pub fn as_double(&self) -> Option<f64> {
        match self.datatype {
            Datatype::Integer | Datatype::Double => self.numeric_value(),
            Datatype::String => leading_number(&self.lexical),
            Datatype::Boolean => self.boolean_value().map(|b| if b { 1.0 } else { 0.0 }),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.datatype {
            Datatype::String => write!(f, "\"{}\"", self.lexical),
            other => write!(f, "\"{}\"^^{}", self.lexical, other),
        }
    }
}

// ------------- Term -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Resource(Resource),
    Literal(Literal),
}

impl Term {
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Term::Resource(r) => Some(r),
            Term::Literal(_) => None,
        }
    }
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            Term::Resource(_) => None,
        }
    }
    /// URI, blank node id or lexical form, without any decoration.
    pub fn value(&self) -> &str {
        match self {
            Term::Resource(r) => r.as_str(),
            Term::Literal(l) => l.lexical(),
        }
    }
    /// A short name for the kind of term, as reported to clients.
    pub fn kind(&self) -> String {
        match self {
            Term::Resource(Resource::Named(_)) => "iri".to_string(),
            Term::Resource(Resource::Blank(_)) => "blank".to_string(),
            Term::Literal(l) => l.datatype().to_string(),
        }
    }
}

impl From<Resource> for Term {
    fn from(resource: Resource) -> Self {
        Term::Resource(resource)
    }
}
impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Resource(r) => write!(f, "{}", r),
            Term::Literal(l) => write!(f, "{}", l),
        }
    }
}

// ------------- Triple -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: Resource,
    pub predicate: Resource,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Resource, predicate: Resource, object: impl Into<Term>) -> Self {
        Self { subject, predicate, object: object.into() }
    }
    /// Rejects empty identifiers and blank predicates.
    pub fn validate(&self) -> Result<()> {
        self.subject.check()?;
        self.predicate.check()?;
        if self.predicate.is_blank() {
            return Err(NetcladError::InvalidTerm(format!(
                "the predicate {} must be a URI",
                self.predicate
            )));
        }
        if let Term::Resource(object) = &self.object {
            object.check()?;
        }
        Ok(())
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

// ------------- TermKeeper -------------
#[derive(Debug)]
pub struct TermKeeper {
    kept: BiMap<Term, Thing>,
    generator: ThingGenerator,
}

impl TermKeeper {
    pub fn new() -> Self {
        Self {
            kept: BiMap::new(),
            generator: ThingGenerator::new(),
        }
    }
    pub fn keep(&mut self, term: Term) -> Thing {
        if let Some(thing) = self.kept.get_by_left(&term) {
            return *thing;
        }
        let thing = self.generator.generate();
        self.kept.insert(term, thing);
        thing
    }
    pub fn thing(&self, term: &Term) -> Option<Thing> {
        self.kept.get_by_left(term).copied()
    }
    pub fn term(&self, thing: Thing) -> Option<&Term> {
        self.kept.get_by_right(&thing)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
}
impl Default for TermKeeper {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Lookups -------------
/// Maps a term identity to the set of triples it appears in at one position.
#[derive(Debug, Default)]
pub struct Lookup {
    index: HashMap<Thing, RoaringTreemap, ThingHasher>,
}

impl Lookup {
    pub fn new() -> Self {
        Self {
            index: HashMap::default(),
        }
    }
    pub fn insert(&mut self, key: Thing, triple: Thing) {
        self.index.entry(key).or_default().insert(triple);
    }
    pub fn remove(&mut self, key: Thing, triple: Thing) {
        if let Some(bitmap) = self.index.get_mut(&key) {
            bitmap.remove(triple);
            if bitmap.is_empty() {
                self.index.remove(&key);
            }
        }
    }
    pub fn lookup(&self, key: Thing) -> Option<&RoaringTreemap> {
        self.index.get(&key)
    }
}

// ------------- TripleSource -------------
/// Anything triples can be matched against: the base store, or a view that
/// overlays inferred triples on it.
pub trait TripleSource {
    fn matching<'s>(
        &'s self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Term>,
    ) -> Box<dyn Iterator<Item = Triple> + 's>;

    fn contains(&self, triple: &Triple) -> bool {
        self.matching(
            Some(&triple.subject),
            Some(&triple.predicate),
            Some(&triple.object),
        )
        .next()
        .is_some()
    }
    fn objects(&self, subject: &Resource, predicate: &Resource) -> Vec<Term> {
        self.matching(Some(subject), Some(predicate), None)
            .map(|t| t.object)
            .collect()
    }
    fn subjects(&self, predicate: &Resource, object: &Term) -> Vec<Resource> {
        self.matching(None, Some(predicate), Some(object))
            .map(|t| t.subject)
            .collect()
    }
}

// ------------- TripleStore -------------
/// The fact graph. Triples are kept as identity triples over interned terms,
/// with one bitmap index per position so that any pattern is answered by
/// intersecting the bitmaps of its bound positions.
#[derive(Debug)]
pub struct TripleStore {
    terms: TermKeeper,
    triple_generator: ThingGenerator,
    kept: BiMap<[Thing; 3], Thing>,
    all: RoaringTreemap,
    subject_lookup: Lookup,
    predicate_lookup: Lookup,
    object_lookup: Lookup,
}

impl TripleStore {
    pub fn new() -> Self {
        Self {
            terms: TermKeeper::new(),
            triple_generator: ThingGenerator::new(),
            kept: BiMap::new(),
            all: RoaringTreemap::new(),
            subject_lookup: Lookup::new(),
            predicate_lookup: Lookup::new(),
            object_lookup: Lookup::new(),
        }
    }
    /// Adds the triple if absent. Returns whether the store changed.
    pub fn insert(&mut self, triple: Triple) -> bool {
        let Triple { subject, predicate, object } = triple;
        let key = [
            self.terms.keep(Term::Resource(subject)),
            self.terms.keep(Term::Resource(predicate)),
            self.terms.keep(object),
        ];
        if self.kept.contains_left(&key) {
            return false;
        }
        let id = self.triple_generator.generate();
        self.kept.insert(key, id);
        self.all.insert(id);
        self.subject_lookup.insert(key[0], id);
        self.predicate_lookup.insert(key[1], id);
        self.object_lookup.insert(key[2], id);
        true
    }
    /// Removes the triple if present. Returns whether the store changed.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let Some(key) = self.key(triple) else {
            return false;
        };
        let Some((_, id)) = self.kept.remove_by_left(&key) else {
            return false;
        };
        self.all.remove(id);
        self.subject_lookup.remove(key[0], id);
        self.predicate_lookup.remove(key[1], id);
        self.object_lookup.remove(key[2], id);
        self.triple_generator.release(id);
        true
    }
    pub fn contains(&self, triple: &Triple) -> bool {
        self.key(triple)
            .map(|key| self.kept.contains_left(&key))
            .unwrap_or(false)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    pub fn clear(&mut self) {
        *self = Self::new();
    }
    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.all.iter().filter_map(move |id| self.triple(id))
    }
    /// Lazily yields the triples matching a pattern, any slot of which may be
    /// a wildcard. Triples come out in identity order, which is stable for as
    /// long as the store is not modified.
    pub fn matching<'s>(
        &'s self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Term>,
    ) -> Box<dyn Iterator<Item = Triple> + 's> {
        match self.candidates(subject, predicate, object) {
            None => Box::new(std::iter::empty()),
            Some(Cow::Borrowed(bitmap)) => {
                Box::new(bitmap.iter().filter_map(move |id| self.triple(id)))
            }
            Some(Cow::Owned(bitmap)) => {
                Box::new(bitmap.into_iter().filter_map(move |id| self.triple(id)))
            }
        }
    }
    fn candidates(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Term>,
    ) -> Option<Cow<'_, RoaringTreemap>> {
        let mut bound: Vec<&RoaringTreemap> = Vec::with_capacity(3);
        if let Some(s) = subject {
            let thing = self.terms.thing(&Term::Resource(s.clone()))?;
            bound.push(self.subject_lookup.lookup(thing)?);
        }
        if let Some(p) = predicate {
            let thing = self.terms.thing(&Term::Resource(p.clone()))?;
            bound.push(self.predicate_lookup.lookup(thing)?);
        }
        if let Some(o) = object {
            let thing = self.terms.thing(o)?;
            bound.push(self.object_lookup.lookup(thing)?);
        }
        // intersect starting from the smallest bitmap
        bound.sort_by_key(|bitmap| bitmap.len());
        let mut bound = bound.into_iter();
        match bound.next() {
            None => Some(Cow::Borrowed(&self.all)),
            Some(first) => {
                let rest: Vec<&RoaringTreemap> = bound.collect();
                if rest.is_empty() {
                    return Some(Cow::Borrowed(first));
                }
                let mut joined = first.clone();
                for bitmap in rest {
                    joined &= bitmap;
                }
                Some(Cow::Owned(joined))
            }
        }
    }
    fn key(&self, triple: &Triple) -> Option<[Thing; 3]> {
        Some([
            self.terms.thing(&Term::Resource(triple.subject.clone()))?,
            self.terms.thing(&Term::Resource(triple.predicate.clone()))?,
            self.terms.thing(&triple.object)?,
        ])
    }
    fn triple(&self, id: Thing) -> Option<Triple> {
        let [s, p, o] = *self.kept.get_by_right(&id)?;
        let subject = self.terms.term(s)?.as_resource()?.clone();
        let predicate = self.terms.term(p)?.as_resource()?.clone();
        let object = self.terms.term(o)?.clone();
        Some(Triple { subject, predicate, object })
    }
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TripleSource for TripleStore {
    fn matching<'s>(
        &'s self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Term>,
    ) -> Box<dyn Iterator<Item = Triple> + 's> {
        TripleStore::matching(self, subject, predicate, object)
    }
    fn contains(&self, triple: &Triple) -> bool {
        TripleStore::contains(self, triple)
    }
}

impl FromIterator<Triple> for TripleStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut store = TripleStore::new();
        for triple in iter {
            store.insert(triple);
        }
        store
    }
}
