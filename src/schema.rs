//! Class and property declarations and their transitive closures.
//!
//! The index is built from the `rdf:type`, `rdfs:subClassOf` and
//! `rdfs:subPropertyOf` triples of a graph. Closures are computed by a
//! worklist fixed-point over the direct edges, guarded by a visited set, so
//! cyclic hierarchies collapse into one equivalence set instead of looping.

use std::collections::{BTreeMap, BTreeSet};

use crate::construct::{Resource, Term, TripleSource};
use crate::vocabulary::{
    OWL_CLASS, OWL_DATATYPE_PROPERTY, OWL_OBJECT_PROPERTY, OWL_SYMMETRIC_PROPERTY, RDF_PROPERTY,
    RDFS_CLASS, rdf_type, subclass_of, subproperty_of,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    pub resource: Resource,
    pub superclasses: BTreeSet<Resource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Object,
    Datatype,
    Untyped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNode {
    pub resource: Resource,
    pub kind: PropertyKind,
    pub superproperties: BTreeSet<Resource>,
    pub symmetric: bool,
}

#[derive(Debug, Default)]
pub struct SchemaIndex {
    classes: BTreeMap<Resource, ClassNode>,
    properties: BTreeMap<Resource, PropertyNode>,
    class_closures: BTreeMap<Resource, BTreeSet<Resource>>,
    property_closures: BTreeMap<Resource, BTreeSet<Resource>>,
}

impl SchemaIndex {
    pub fn build<S: TripleSource + ?Sized>(source: &S) -> Self {
        let mut index = SchemaIndex::default();
        for triple in source.matching(None, Some(&rdf_type()), None) {
            let Some(kind) = triple.object.as_resource() else {
                continue;
            };
            match kind.as_str() {
                OWL_CLASS | RDFS_CLASS => {
                    index.declare_class(&triple.subject);
                }
                OWL_OBJECT_PROPERTY => {
                    index.declare_property(&triple.subject).kind = PropertyKind::Object;
                }
                OWL_DATATYPE_PROPERTY => {
                    index.declare_property(&triple.subject).kind = PropertyKind::Datatype;
                }
                OWL_SYMMETRIC_PROPERTY => {
                    let node = index.declare_property(&triple.subject);
                    node.symmetric = true;
                    node.kind = PropertyKind::Object;
                }
                RDF_PROPERTY => {
                    index.declare_property(&triple.subject);
                }
                _ => (),
            }
        }
        for triple in source.matching(None, Some(&subclass_of()), None) {
            if let Term::Resource(superclass) = triple.object {
                index.declare_class(&superclass);
                index
                    .declare_class(&triple.subject)
                    .superclasses
                    .insert(superclass);
            }
        }
        for triple in source.matching(None, Some(&subproperty_of()), None) {
            if let Term::Resource(superproperty) = triple.object {
                index.declare_property(&superproperty);
                index
                    .declare_property(&triple.subject)
                    .superproperties
                    .insert(superproperty);
            }
        }
        let class_closures = index
            .classes
            .keys()
            .map(|c| (c.clone(), closure(c, |r| index.classes.get(r).map(|n| &n.superclasses))))
            .collect();
        let property_closures = index
            .properties
            .keys()
            .map(|p| {
                (p.clone(), closure(p, |r| index.properties.get(r).map(|n| &n.superproperties)))
            })
            .collect();
        index.class_closures = class_closures;
        index.property_closures = property_closures;
        index
    }
    fn declare_class(&mut self, resource: &Resource) -> &mut ClassNode {
        self.classes
            .entry(resource.clone())
            .or_insert_with(|| ClassNode {
                resource: resource.clone(),
                superclasses: BTreeSet::new(),
            })
    }
    fn declare_property(&mut self, resource: &Resource) -> &mut PropertyNode {
        self.properties
            .entry(resource.clone())
            .or_insert_with(|| PropertyNode {
                resource: resource.clone(),
                kind: PropertyKind::Untyped,
                superproperties: BTreeSet::new(),
                symmetric: false,
            })
    }
    pub fn class(&self, resource: &Resource) -> Option<&ClassNode> {
        self.classes.get(resource)
    }
    pub fn classes(&self) -> impl Iterator<Item = &ClassNode> {
        self.classes.values()
    }
    pub fn property(&self, resource: &Resource) -> Option<&PropertyNode> {
        self.properties.get(resource)
    }
    pub fn properties(&self) -> impl Iterator<Item = &PropertyNode> {
        self.properties.values()
    }
    /// All ancestors of a class, the class itself included.
    pub fn class_closure(&self, class: &Resource) -> BTreeSet<Resource> {
        self.class_closures
            .get(class)
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([class.clone()]))
    }
    /// All super-properties of a property, the property itself included.
    pub fn property_closure(&self, property: &Resource) -> BTreeSet<Resource> {
        self.property_closures
            .get(property)
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([property.clone()]))
    }
    pub fn is_subclass_of(&self, class: &Resource, ancestor: &Resource) -> bool {
        class == ancestor
            || self
                .class_closures
                .get(class)
                .is_some_and(|closure| closure.contains(ancestor))
    }
    pub fn is_symmetric(&self, property: &Resource) -> bool {
        self.properties.get(property).is_some_and(|p| p.symmetric)
    }
    /// Sets of two or more classes that are each other's ancestors.
    pub fn cyclic_classes(&self) -> Vec<BTreeSet<Resource>> {
        let mut cycles = BTreeSet::new();
        for (class, ancestors) in &self.class_closures {
            let members: BTreeSet<Resource> = ancestors
                .iter()
                .filter(|a| {
                    self.class_closures
                        .get(*a)
                        .is_some_and(|closure| closure.contains(class))
                })
                .cloned()
                .collect();
            if members.len() > 1 {
                cycles.insert(members);
            }
        }
        cycles.into_iter().collect()
    }
}

fn closure<'a, F>(start: &Resource, edges: F) -> BTreeSet<Resource>
where
    F: Fn(&Resource) -> Option<&'a BTreeSet<Resource>>,
{
    let mut visited = BTreeSet::from([start.clone()]);
    let mut worklist = vec![start.clone()];
    while let Some(current) = worklist.pop() {
        if let Some(parents) = edges(&current) {
            for parent in parents {
                if visited.insert(parent.clone()) {
                    worklist.push(parent.clone());
                }
            }
        }
    }
    visited
}
