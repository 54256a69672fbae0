use std::collections::BTreeSet;

use netclad::construct::{Resource, Triple};
use netclad::interface::KnowledgeBase;
use netclad::persist::PersistenceMode;
use netclad::vocabulary::{rdf_type, subclass_of, OWL_CLASS};

const PREFIXES: &str = "PREFIX ex: <http://example.org/network-topology#> ";

fn ex(name: &str) -> Resource {
    Resource::named(format!("http://example.org/network-topology#{}", name))
}

fn load(triples: Vec<Triple>) -> KnowledgeBase {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    let mut tx = kb.begin_write().expect("write");
    tx.insert_all(triples).expect("insert");
    tx.commit().expect("commit");
    kb
}

#[test]
fn closure_covers_every_ancestor() {
    let kb = load(vec![
        Triple::new(ex("A"), subclass_of(), ex("B")),
        Triple::new(ex("B"), subclass_of(), ex("C")),
        Triple::new(ex("x"), rdf_type(), ex("A")),
    ]);
    let closure = kb.class_closure(&ex("A")).expect("closure");
    assert_eq!(closure, BTreeSet::from([ex("A"), ex("B"), ex("C")]));
    assert_eq!(kb.class_closure(&ex("C")).expect("closure"), BTreeSet::from([ex("C")]));

    let result = kb
        .execute(&format!("{PREFIXES} SELECT ?type WHERE {{ ex:x a ?type }} ORDER BY ?type"))
        .expect("query");
    let types: Vec<_> = result.values("type").into_iter().flatten().cloned().collect();
    assert_eq!(types, vec![ex("A").into(), ex("B").into(), ex("C").into()]);
}

#[test]
fn transitive_subclass_triples_are_materialized() {
    let kb = load(vec![
        Triple::new(ex("A"), subclass_of(), ex("B")),
        Triple::new(ex("B"), subclass_of(), ex("C")),
    ]);
    let result = kb
        .execute(&format!("{PREFIXES} SELECT ?c WHERE {{ ?c rdfs:subClassOf ex:C }}"))
        .expect("query");
    assert_eq!(result.len(), 2);
}

#[test]
fn undeclared_class_is_its_own_closure() {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    assert_eq!(kb.class_closure(&ex("Ghost")).expect("closure"), BTreeSet::from([ex("Ghost")]));
}

#[test]
fn cyclic_hierarchy_terminates_and_is_reported() {
    let kb = load(vec![
        Triple::new(ex("A"), rdf_type(), Resource::named(OWL_CLASS)),
        Triple::new(ex("A"), subclass_of(), ex("B")),
        Triple::new(ex("B"), subclass_of(), ex("A")),
        Triple::new(ex("x"), rdf_type(), ex("A")),
    ]);
    assert_eq!(kb.class_closure(&ex("A")).expect("closure"), BTreeSet::from([ex("A"), ex("B")]));
    assert_eq!(kb.class_closure(&ex("B")).expect("closure"), BTreeSet::from([ex("A"), ex("B")]));

    let report = kb.validate().expect("validate");
    assert!(!report.is_valid());
    let cycles: Vec<_> = report.of_category("cyclic-hierarchy").collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].resources(), vec![&ex("A"), &ex("B")]);

    // the instance still gets both types and queries keep working
    let result = kb
        .execute(&format!("{PREFIXES} SELECT ?t WHERE {{ ex:x a ?t }}"))
        .expect("query");
    assert_eq!(result.len(), 2);
}

#[test]
fn inference_follows_committed_changes() {
    let kb = load(vec![
        Triple::new(ex("Router"), subclass_of(), ex("NetworkDevice")),
        Triple::new(ex("r1"), rdf_type(), ex("Router")),
    ]);
    let devices = format!("{PREFIXES} SELECT ?d WHERE {{ ?d a ex:NetworkDevice }}");
    assert_eq!(kb.execute(&devices).expect("query").len(), 1);

    let mut tx = kb.begin_write().expect("write");
    tx.insert(Triple::new(ex("r2"), rdf_type(), ex("Router"))).expect("insert");
    // uncommitted changes are visible inside the transaction
    assert_eq!(tx.execute(&devices).expect("query").len(), 2);
    tx.commit().expect("commit");
    assert_eq!(kb.execute(&devices).expect("query").len(), 2);

    let mut tx = kb.begin_write().expect("write");
    tx.remove(&Triple::new(ex("Router"), subclass_of(), ex("NetworkDevice")))
        .expect("remove");
    tx.commit().expect("commit");
    assert!(kb.execute(&devices).expect("query").is_empty());
}
