use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use netclad::construct::{Literal, Resource, Term, Triple};
use netclad::error::NetcladError;
use netclad::interface::{KnowledgeBase, Record};
use netclad::persist::PersistenceMode;
use netclad::vocabulary::rdf_type;

fn ex(name: &str) -> Resource {
    Resource::named(format!("http://example.org/network-topology#{}", name))
}

fn seeded() -> KnowledgeBase {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    let mut tx = kb.begin_write().expect("write");
    tx.insert(Triple::new(ex("r1"), rdf_type(), ex("Router"))).expect("insert");
    tx.insert(Triple::new(ex("r1"), ex("connectedTo"), ex("s1"))).expect("insert");
    tx.commit().expect("commit");
    kb
}

#[test]
fn failure_mid_batch_rolls_everything_back() {
    let kb = seeded();
    let before = kb.len().expect("len");
    let mut tx = kb.begin_write().expect("write");
    tx.insert(Triple::new(ex("r2"), rdf_type(), ex("Router"))).expect("insert");
    let batch: Vec<Result<Triple, String>> = vec![
        Ok(Triple::new(ex("r3"), rdf_type(), ex("Router"))),
        Ok(Triple::new(ex("r4"), rdf_type(), ex("Router"))),
        Err("loader lost its connection".to_string()),
        Ok(Triple::new(ex("r5"), rdf_type(), ex("Router"))),
    ];
    let error = tx.try_insert_all(batch).expect_err("batch fails");
    assert!(matches!(error, NetcladError::Transaction(_)));
    assert_eq!(tx.graph().len(), before);
    // a failed transaction can neither continue nor commit
    assert!(tx.insert(Triple::new(ex("r6"), rdf_type(), ex("Router"))).is_err());
    assert!(matches!(tx.commit(), Err(NetcladError::Transaction(_))));
    assert_eq!(kb.len().expect("len"), before);
}

#[test]
fn invalid_triples_fail_the_batch() {
    let kb = seeded();
    let before = kb.len().expect("len");
    let mut tx = kb.begin_write().expect("write");
    let result = tx.insert_all(vec![
        Triple::new(ex("r2"), rdf_type(), ex("Router")),
        Triple::new(ex("r2"), Resource::blank("p"), ex("s1")),
    ]);
    assert!(result.is_err());
    drop(tx);
    assert_eq!(kb.len().expect("len"), before);
}

#[test]
fn abort_discards_inserts_and_removals() {
    let kb = seeded();
    let link = Triple::new(ex("r1"), ex("connectedTo"), ex("s1"));
    let mut tx = kb.begin_write().expect("write");
    assert!(tx.remove(&link).expect("remove"));
    assert!(tx.insert(Triple::new(ex("r2"), rdf_type(), ex("Router"))).expect("insert"));
    assert!(!tx.insert(Triple::new(ex("r2"), rdf_type(), ex("Router"))).expect("insert"));
    assert_eq!(tx.abort(), 2);
    assert_eq!(kb.len().expect("len"), 2);
    assert!(kb.begin_read().expect("read").graph().base().contains(&link));
}

#[test]
fn dropping_without_commit_rolls_back() {
    let kb = seeded();
    {
        let mut tx = kb.begin_write().expect("write");
        tx.insert(Triple::new(ex("r2"), rdf_type(), ex("Router"))).expect("insert");
        assert_eq!(tx.graph().len(), 3);
    }
    assert_eq!(kb.len().expect("len"), 2);
}

#[test]
fn commit_keeps_changes() {
    let kb = seeded();
    let mut tx = kb.begin_write().expect("write");
    let added = tx
        .insert_all(vec![
            Triple::new(ex("r2"), rdf_type(), ex("Router")),
            Triple::new(ex("r1"), rdf_type(), ex("Router")),
        ])
        .expect("insert");
    assert_eq!(added, 1);
    assert_eq!(tx.commit().expect("commit"), 1);
    assert_eq!(kb.len().expect("len"), 3);
}

#[test]
fn records_load_from_json() {
    let kb = seeded();
    let records: Vec<Record> = serde_json::from_str(
        r#"[
            {"subject": "http://example.org/network-topology#r2",
             "predicate": "http://example.org/network-topology#firmwareVersion",
             "object": {"kind": "literal", "value": "2.5.0"}},
            {"subject": "http://example.org/network-topology#r2",
             "predicate": "http://example.org/network-topology#ports",
             "object": {"kind": "literal", "value": "48", "datatype": "http://www.w3.org/2001/XMLSchema#int"}},
            {"subject": "_:b0",
             "predicate": "http://example.org/network-topology#connectsTo",
             "object": {"kind": "iri", "value": "http://example.org/network-topology#r2"}}
        ]"#,
    )
    .expect("records");
    let mut tx = kb.begin_write().expect("write");
    assert_eq!(tx.insert_records(records).expect("insert"), 3);
    tx.commit().expect("commit");

    let read = kb.begin_read().expect("read");
    let base = read.graph().base();
    assert!(base.contains(&Triple::new(ex("r2"), ex("ports"), Literal::integer(48))));
    assert!(base.contains(&Triple::new(
        Resource::blank("b0"),
        ex("connectsTo"),
        Term::Resource(ex("r2"))
    )));
}

#[test]
fn bad_records_are_rejected() {
    let kb = seeded();
    let records: Vec<Record> = serde_json::from_str(
        r#"[
            {"subject": "http://example.org/network-topology#r2",
             "predicate": "http://example.org/network-topology#ports",
             "object": {"kind": "literal", "value": "many", "datatype": "http://www.w3.org/2001/XMLSchema#integer"}}
        ]"#,
    )
    .expect("records");
    let mut tx = kb.begin_write().expect("write");
    assert!(tx.insert_records(records).is_err());
    drop(tx);
    assert_eq!(kb.len().expect("len"), 2);
}

#[test]
fn a_panicking_writer_leaves_the_knowledge_base_usable() {
    let kb = seeded();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut tx = kb.begin_write().expect("write");
        let batch = (0..4).map(|n| {
            if n == 2 {
                panic!("loader crashed");
            }
            Triple::new(ex(&format!("r{}", n + 10)), rdf_type(), ex("Router"))
        });
        tx.insert_all(batch)
    }));
    assert!(outcome.is_err());

    assert_eq!(kb.len().expect("len"), 2);
    let routers = kb
        .execute("SELECT ?r WHERE { ?r a <http://example.org/network-topology#Router> }")
        .expect("query");
    assert_eq!(routers.len(), 1);

    let mut tx = kb.begin_write().expect("write after panic");
    tx.insert(Triple::new(ex("r2"), rdf_type(), ex("Router"))).expect("insert");
    assert_eq!(tx.commit().expect("commit"), 1);
    assert_eq!(kb.len().expect("len"), 3);
}

#[test]
fn readers_share_the_committed_state() {
    let kb = Arc::new(seeded());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let kb = Arc::clone(&kb);
            thread::spawn(move || {
                let read = kb.begin_read().expect("read");
                read.execute("SELECT ?s ?o WHERE { ?s <http://example.org/network-topology#connectedTo> ?o }")
                    .expect("query")
                    .len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("reader"), 1);
    }
}
