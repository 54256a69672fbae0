use std::collections::BTreeSet;

use netclad::construct::{Literal, Resource, Triple};
use netclad::finding::{FindingKind, Severity, Tier};
use netclad::interface::KnowledgeBase;
use netclad::persist::PersistenceMode;
use netclad::topology::Report;
use netclad::vocabulary::{OWL_SYMMETRIC_PROPERTY, rdf_type, subclass_of};

fn ex(name: &str) -> Resource {
    Resource::named(format!("http://example.org/network-topology#{}", name))
}

fn load(triples: Vec<Triple>) -> KnowledgeBase {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    let mut tx = kb.begin_write().expect("write");
    let mut all = vec![
        Triple::new(ex("Router"), subclass_of(), ex("NetworkDevice")),
        Triple::new(ex("Switch"), subclass_of(), ex("NetworkDevice")),
    ];
    all.extend(triples);
    tx.insert_all(all).expect("insert");
    tx.commit().expect("commit");
    kb
}

fn typed(device: &str, class: &str) -> Triple {
    Triple::new(ex(device), rdf_type(), ex(class))
}

fn link(from: &str, to: &str) -> Triple {
    Triple::new(ex(from), ex("connectedTo"), ex(to))
}

fn symmetric() -> Triple {
    Triple::new(ex("connectedTo"), rdf_type(), Resource::named(OWL_SYMMETRIC_PROPERTY))
}

#[test]
fn two_links_between_the_same_devices_are_redundant() {
    let kb = load(vec![
        typed("a", "Router"),
        typed("b", "Router"),
        Triple::new(ex("link1"), ex("connectsFrom"), ex("a")),
        Triple::new(ex("link1"), ex("connectsTo"), ex("b")),
        Triple::new(ex("link2"), ex("connectsFrom"), ex("b")),
        Triple::new(ex("link2"), ex("connectsTo"), ex("a")),
    ]);
    let findings = kb.analyze(Report::RedundantPaths).expect("analyze");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Info);
    match &findings[0].kind {
        FindingKind::RedundantPath { devices, links } => {
            assert_eq!(devices, &(ex("a"), ex("b")));
            assert_eq!(links.len(), 2);
        }
        other => panic!("unexpected finding {other:?}"),
    }
}

#[test]
fn a_single_link_is_not_redundant() {
    let kb = load(vec![
        Triple::new(ex("link1"), ex("connectsFrom"), ex("a")),
        Triple::new(ex("link1"), ex("connectsTo"), ex("b")),
        Triple::new(ex("link2"), ex("connectsFrom"), ex("a")),
        Triple::new(ex("link2"), ex("connectsTo"), ex("c")),
    ]);
    assert!(kb.analyze(Report::RedundantPaths).expect("analyze").is_empty());
}

#[test]
fn links_through_interfaces_count_for_their_owners() {
    let kb = load(vec![
        Triple::new(ex("a"), ex("hasInterface"), ex("a-eth0")),
        Triple::new(ex("a"), ex("hasInterface"), ex("a-eth1")),
        Triple::new(ex("b"), ex("hasInterface"), ex("b-eth0")),
        Triple::new(ex("b"), ex("hasInterface"), ex("b-eth1")),
        Triple::new(ex("cable1"), ex("connectsInterface"), ex("a-eth0")),
        Triple::new(ex("cable1"), ex("connectsInterface"), ex("b-eth0")),
        Triple::new(ex("cable2"), ex("connectsInterface"), ex("a-eth1")),
        Triple::new(ex("cable2"), ex("connectsInterface"), ex("b-eth1")),
    ]);
    let findings = kb.analyze(Report::RedundantPaths).expect("analyze");
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].resources(),
        vec![&ex("a"), &ex("b"), &ex("cable1"), &ex("cable2")]
    );
}

#[test]
fn devices_without_connections_are_isolated() {
    let kb = load(vec![
        typed("r1", "Router"),
        typed("r2", "Router"),
        typed("r3", "Switch"),
        link("r1", "r2"),
    ]);
    let isolated: Vec<_> = kb
        .analyze(Report::IsolatedDevices)
        .expect("analyze")
        .into_iter()
        .map(|f| f.kind)
        .collect();
    // r2 only has an inbound connection and is not isolated
    assert_eq!(isolated, vec![FindingKind::IsolatedDevice { device: ex("r3") }]);
}

#[test]
fn devices_without_interfaces_are_reported() {
    let kb = load(vec![
        typed("r1", "Router"),
        typed("r2", "Router"),
        Triple::new(ex("r1"), ex("hasInterface"), ex("r1-eth0")),
    ]);
    let missing = kb.analyze(Report::MissingInterfaces).expect("analyze");
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].resources(), vec![&ex("r2")]);
}

#[test]
fn zones_without_links_are_disconnected() {
    let kb = load(vec![
        typed("r1", "Router"),
        typed("r2", "Router"),
        typed("r3", "Switch"),
        Triple::new(ex("r1"), ex("belongsToZone"), ex("core")),
        Triple::new(ex("r2"), ex("belongsToZone"), ex("dmz")),
        Triple::new(ex("r3"), ex("belongsToZone"), ex("lab")),
        link("r2", "r1"),
    ]);
    let pairs: BTreeSet<_> = kb
        .analyze(Report::DisconnectedZones)
        .expect("analyze")
        .into_iter()
        .filter_map(|f| match f.kind {
            FindingKind::DisconnectedZones { zones } => Some(zones),
            _ => None,
        })
        .collect();
    assert_eq!(
        pairs,
        BTreeSet::from([(ex("core"), ex("lab")), (ex("dmz"), ex("lab"))])
    );
}

#[test]
fn zones_without_devices_are_not_paired() {
    let kb = load(vec![
        typed("r1", "Router"),
        Triple::new(ex("r1"), ex("belongsToZone"), ex("core")),
        Triple::new(ex("cable9"), ex("belongsToZone"), ex("lab")),
        Triple::new(ex("r1-eth0"), ex("belongsToZone"), ex("lab")),
    ]);
    assert!(kb.analyze(Report::DisconnectedZones).expect("analyze").is_empty());
}

#[test]
fn routers_that_are_the_only_neighbour_are_single_points_of_failure() {
    let kb = load(vec![
        typed("r1", "Router"),
        typed("s1", "Switch"),
        typed("s2", "Switch"),
        typed("s3", "Switch"),
        link("r1", "s1"),
        link("r1", "s2"),
        link("s2", "r1"),
        link("s2", "s3"),
    ]);
    let findings = kb.analyze(Report::SinglePointsOfFailure).expect("analyze");
    let kinds: Vec<_> = findings.into_iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![FindingKind::SinglePointOfFailure { router: ex("r1"), dependent: ex("s1") }]
    );
}

#[test]
fn symmetric_links_count_in_both_directions() {
    let kb = load(vec![
        symmetric(),
        typed("r1", "Router"),
        typed("s1", "Switch"),
        typed("s2", "Switch"),
        link("s1", "r1"),
        link("r1", "s2"),
        link("s2", "s1"),
    ]);
    // s1 reaches s2 directly, s2 reaches s1, so no switch hangs on r1 alone
    assert!(kb.analyze(Report::SinglePointsOfFailure).expect("analyze").is_empty());
    assert!(kb.analyze(Report::IsolatedDevices).expect("analyze").is_empty());
}

#[test]
fn shared_addresses_on_one_device_conflict() {
    let address = Literal::string("10.0.0.1");
    let kb = load(vec![
        Triple::new(ex("r1"), ex("hasInterface"), ex("r1-eth0")),
        Triple::new(ex("r1"), ex("hasInterface"), ex("r1-eth1")),
        Triple::new(ex("r2"), ex("hasInterface"), ex("r2-eth0")),
        Triple::new(ex("r1-eth0"), ex("ipAddress"), address.clone()),
        Triple::new(ex("r1-eth1"), ex("ipAddress"), address.clone()),
        Triple::new(ex("r2-eth0"), ex("ipAddress"), address),
    ]);
    let conflicts = kb.analyze(Report::IpConflicts).expect("analyze");
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].kind,
        FindingKind::IpConflict {
            device: ex("r1"),
            interfaces: BTreeSet::from([ex("r1-eth0"), ex("r1-eth1")]),
            address: "10.0.0.1".to_string(),
        }
    );
}

#[test]
fn devices_are_ranked_into_tiers() {
    let kb = load(vec![
        symmetric(),
        typed("r1", "Router"),
        typed("s1", "Switch"),
        typed("s2", "Switch"),
        typed("s3", "Switch"),
        typed("s4", "Switch"),
        link("r1", "s1"),
        link("r1", "s2"),
        link("r1", "s3"),
        link("s1", "s2"),
    ]);
    let read = kb.begin_read().expect("read");
    let ranks = read.analyzer().rank_devices();
    let summary: Vec<_> = ranks.iter().map(|r| (r.device.clone(), r.degree, r.tier)).collect();
    assert_eq!(
        summary,
        vec![
            (ex("r1"), 3, Tier::Core),
            (ex("s1"), 2, Tier::Distribution),
            (ex("s2"), 2, Tier::Distribution),
            (ex("s3"), 1, Tier::Access),
        ]
    );
    assert_eq!(ranks[0].types, BTreeSet::from([ex("Router")]));

    let findings = read.analyze(Report::Hierarchy);
    assert_eq!(findings.len(), 4);
    assert!(findings.iter().all(|f| f.category() == "device-tier"));
}

#[test]
fn report_names_parse() {
    for report in Report::ALL {
        assert_eq!(report.name().parse::<Report>().expect("known report"), report);
    }
    assert!("bogus".parse::<Report>().is_err());
}

#[test]
fn validation_collects_structural_findings() {
    let kb = load(vec![
        typed("r1", "Router"),
        typed("r2", "Router"),
        link("r1", "r2"),
        Triple::new(ex("r1"), ex("hasInterface"), ex("r1-eth0")),
        Triple::new(ex("r2"), ex("hasInterface"), ex("r2-eth0")),
    ]);
    assert!(kb.validate().expect("validate").is_valid());

    let mut tx = kb.begin_write().expect("write");
    tx.insert(typed("r3", "Router")).expect("insert");
    tx.commit().expect("commit");
    let report = kb.validate().expect("validate");
    assert_eq!(report.of_category("isolated-device").count(), 1);
    assert_eq!(report.of_category("missing-interface").count(), 1);
    // findings never block further work
    assert_eq!(kb.len().expect("len"), 8);
}
