use netclad::construct::{Literal, Resource, Triple};
use netclad::error::NetcladError;
use netclad::interface::KnowledgeBase;
use netclad::persist::PersistenceMode;
use netclad::vocabulary::rdf_type;

fn ex(name: &str) -> Resource {
    Resource::named(format!("http://example.org/network-topology#{}", name))
}

fn temp_path(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("netclad_{}_{}.db", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path.to_string_lossy().into_owned()
}

fn fill(kb: &KnowledgeBase) {
    let mut tx = kb.begin_write().expect("write");
    tx.insert_all(vec![
        Triple::new(ex("r1"), rdf_type(), ex("Router")),
        Triple::new(ex("r1"), ex("firmwareVersion"), Literal::string("1.5.0")),
        Triple::new(ex("r1"), ex("ports"), Literal::integer(48)),
        Triple::new(ex("r1"), ex("managed"), Literal::boolean(true)),
        Triple::new(Resource::blank("link0"), ex("connectsFrom"), ex("r1")),
    ])
    .expect("insert");
    tx.commit().expect("commit");
}

#[test]
fn in_memory_mode_has_no_snapshots() {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    fill(&kb);
    assert!(kb.snapshot().expect("snapshot").is_none());
    assert_eq!(kb.restore().expect("restore"), 0);
    assert_eq!(kb.len().expect("len"), 5);
}

#[test]
fn file_mode_restores_the_latest_snapshot() {
    let path = temp_path("restore");
    {
        let kb = KnowledgeBase::new(PersistenceMode::File(path.clone())).expect("kb");
        assert_eq!(kb.len().expect("len"), 0);
        fill(&kb);
        let info = kb.snapshot().expect("snapshot").expect("file mode");
        assert_eq!(info.triples, 5);
        assert_eq!(info.digest.len(), 64);

        // changes after the snapshot are not persisted
        let mut tx = kb.begin_write().expect("write");
        tx.insert(Triple::new(ex("r2"), rdf_type(), ex("Router"))).expect("insert");
        tx.commit().expect("commit");
        assert_eq!(kb.len().expect("len"), 6);
        assert_eq!(kb.restore().expect("restore"), 5);
    }
    let reopened = KnowledgeBase::new(PersistenceMode::File(path.clone())).expect("reopen");
    assert_eq!(reopened.len().expect("len"), 5);
    let read = reopened.begin_read().expect("read");
    let base = read.graph().base();
    assert!(base.contains(&Triple::new(ex("r1"), ex("ports"), Literal::integer(48))));
    assert!(base.contains(&Triple::new(Resource::blank("link0"), ex("connectsFrom"), ex("r1"))));
    drop(read);
    drop(reopened);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn tampered_snapshots_are_refused() {
    let path = temp_path("tamper");
    {
        let kb = KnowledgeBase::new(PersistenceMode::File(path.clone())).expect("kb");
        fill(&kb);
        kb.snapshot().expect("snapshot");
    }
    {
        let connection = rusqlite::Connection::open(&path).expect("open");
        let changed = connection
            .execute("update Statement set Object = '9.9.9' where Object = '1.5.0'", [])
            .expect("tamper");
        assert_eq!(changed, 1);
    }
    match KnowledgeBase::new(PersistenceMode::File(path.clone())) {
        Err(NetcladError::DataCorruption { .. }) => (),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("tampered snapshot was restored"),
    }
    let _ = std::fs::remove_file(&path);
}
