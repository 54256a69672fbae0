use netclad::construct::{Literal, Resource, Term, Triple};
use netclad::error::NetcladError;
use netclad::interface::KnowledgeBase;
use netclad::persist::PersistenceMode;
use netclad::vocabulary::{rdf_type, subclass_of};

const PREFIXES: &str = "PREFIX ex: <http://example.org/network-topology#>\n";

fn ex(name: &str) -> Resource {
    Resource::named(format!("http://example.org/network-topology#{}", name))
}

fn setup() -> KnowledgeBase {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    let mut tx = kb.begin_write().expect("write");
    tx.insert_all(vec![
        Triple::new(ex("Router"), subclass_of(), ex("NetworkDevice")),
        Triple::new(ex("Switch"), subclass_of(), ex("NetworkDevice")),
        Triple::new(ex("r1"), rdf_type(), ex("Router")),
        Triple::new(ex("r1"), ex("hostname"), Literal::string("r1")),
        Triple::new(ex("r1"), ex("firmwareVersion"), Literal::string("1.5.0")),
        Triple::new(ex("r1"), ex("hasName"), Literal::string("core-1")),
        Triple::new(ex("r2"), rdf_type(), ex("Router")),
        Triple::new(ex("r2"), ex("firmwareVersion"), Literal::string("2.5.0")),
        Triple::new(ex("s1"), rdf_type(), ex("Switch")),
        Triple::new(ex("s1"), ex("firmwareVersion"), Literal::string("1.9.0")),
        Triple::new(ex("s2"), rdf_type(), ex("Switch")),
        Triple::new(ex("s2"), ex("firmwareVersion"), Literal::string("unknown")),
        Triple::new(ex("r1"), ex("connectedTo"), ex("s1")),
        Triple::new(ex("s1"), ex("connectedTo"), ex("s2")),
    ])
    .expect("insert");
    tx.commit().expect("commit");
    kb
}

fn run(kb: &KnowledgeBase, body: &str) -> netclad::engine::ResultSet {
    kb.execute(&format!("{PREFIXES}{body}")).expect("query ok")
}

fn resources(result: &netclad::engine::ResultSet, column: &str) -> Vec<Resource> {
    result
        .values(column)
        .into_iter()
        .map(|v| v.and_then(Term::as_resource).cloned().expect("bound resource"))
        .collect()
}

#[test]
fn join_returns_the_single_matching_router() {
    let kb = setup();
    let result = run(
        &kb,
        r#"SELECT ?router ?firmware WHERE {
            ?router a ex:Router ;
                    ex:hostname "r1" ;
                    ex:firmwareVersion ?firmware .
        }"#,
    );
    assert_eq!(result.columns, vec!["router", "firmware"]);
    assert_eq!(result.len(), 1);
    assert_eq!(result.value(0, "router"), Some(&Term::Resource(ex("r1"))));
    assert_eq!(result.value(0, "firmware"), Some(&Term::Literal(Literal::string("1.5.0"))));
}

#[test]
fn optional_keeps_rows_without_a_match() {
    let kb = setup();
    let result = run(
        &kb,
        "SELECT ?device ?name WHERE { ?device a ex:Router OPTIONAL { ?device ex:hasName ?name } } ORDER BY ?device",
    );
    assert_eq!(result.len(), 2);
    let rows: Vec<_> = result.solutions().collect();
    assert_eq!(rows[0].get("device"), Some(&Term::Resource(ex("r1"))));
    assert_eq!(rows[0].get("name"), Some(&Term::Literal(Literal::string("core-1"))));
    assert_eq!(rows[1].get("device"), Some(&Term::Resource(ex("r2"))));
    assert!(!rows[1].is_bound("name"));
}

#[test]
fn version_strings_compare_by_leading_number() {
    let kb = setup();
    let result = run(
        &kb,
        "SELECT ?d WHERE { ?d ex:firmwareVersion ?f FILTER(?f < 2.0) } ORDER BY ?d",
    );
    // "2.5.0" is too new and "unknown" has no number at all
    assert_eq!(resources(&result, "d"), vec![ex("r1"), ex("s1")]);
}

#[test]
fn failed_casts_exclude_rows_instead_of_failing() {
    let kb = setup();
    let result = run(
        &kb,
        "SELECT ?d WHERE { ?d ex:firmwareVersion ?f FILTER(xsd:double(?f) >= 2) }",
    );
    assert_eq!(resources(&result, "d"), vec![ex("r2")]);
    let none = run(&kb, "SELECT ?d WHERE { ?d ex:firmwareVersion ?f FILTER(?f + 1 > 100) }");
    assert!(none.is_empty());
}

#[test]
fn string_functions_and_regex() {
    let kb = setup();
    let switches = run(
        &kb,
        r#"SELECT ?d WHERE { ?d ex:firmwareVersion ?f FILTER(STRSTARTS(STR(?d), "http://example.org/network-topology#s")) } ORDER BY ?d"#,
    );
    assert_eq!(resources(&switches, "d"), vec![ex("s1"), ex("s2")]);

    let ones = run(
        &kb,
        r#"SELECT ?d WHERE { ?d ex:firmwareVersion ?f FILTER(REGEX(?f, "^1[.]")) } ORDER BY DESC(?d)"#,
    );
    assert_eq!(resources(&ones, "d"), vec![ex("s1"), ex("r1")]);

    let shouting = run(
        &kb,
        r#"SELECT ?d WHERE { ?d ex:firmwareVersion ?f FILTER(REGEX(?f, "UNKNOWN", "i") && !CONTAINS(?f, ".")) }"#,
    );
    assert_eq!(resources(&shouting, "d"), vec![ex("s2")]);
}

#[test]
fn bind_adds_a_computed_column() {
    let kb = setup();
    let result = run(
        &kb,
        "SELECT ?d ?length WHERE { ?d ex:firmwareVersion ?f BIND(STRLEN(?f) AS ?length) FILTER(?d = ex:r1) }",
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result.value(0, "length"), Some(&Term::Literal(Literal::integer(5))));
}

#[test]
fn not_exists_finds_unnamed_routers() {
    let kb = setup();
    let result = run(
        &kb,
        "SELECT ?d WHERE { ?d a ex:Router FILTER NOT EXISTS { ?d ex:hasName ?n } }",
    );
    assert_eq!(resources(&result, "d"), vec![ex("r2")]);
    let named = run(&kb, "SELECT ?d WHERE { ?d a ex:Router FILTER EXISTS { ?d ex:hasName ?n } }");
    assert_eq!(resources(&named, "d"), vec![ex("r1")]);
}

#[test]
fn property_paths_follow_links() {
    let kb = setup();
    let reachable = run(&kb, "SELECT ?c WHERE { ex:r1 ex:connectedTo+ ?c } ORDER BY ?c");
    assert_eq!(resources(&reachable, "c"), vec![ex("s1"), ex("s2")]);
    let with_self = run(&kb, "SELECT ?c WHERE { ex:r1 ex:connectedTo* ?c } ORDER BY ?c");
    assert_eq!(resources(&with_self, "c"), vec![ex("r1"), ex("s1"), ex("s2")]);
    let one_step = run(&kb, "SELECT ?c WHERE { ex:r1 ex:connectedTo? ?c } ORDER BY ?c");
    assert_eq!(resources(&one_step, "c"), vec![ex("r1"), ex("s1")]);

    let classes = run(
        &kb,
        "SELECT ?class WHERE { ?class rdfs:subClassOf* ex:NetworkDevice } ORDER BY ?class",
    );
    assert_eq!(
        resources(&classes, "class"),
        vec![ex("NetworkDevice"), ex("Router"), ex("Switch")]
    );

    let devices = run(
        &kb,
        "SELECT DISTINCT ?device WHERE { ?device a ?type . ?type rdfs:subClassOf* ex:NetworkDevice }",
    );
    assert_eq!(devices.len(), 4);
}

#[test]
fn paths_terminate_on_cycles() {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    let mut tx = kb.begin_write().expect("write");
    tx.insert(Triple::new(ex("a"), ex("next"), ex("b"))).expect("insert");
    tx.insert(Triple::new(ex("b"), ex("next"), ex("a"))).expect("insert");
    tx.commit().expect("commit");
    let result = run(&kb, "SELECT ?x WHERE { ex:a ex:next+ ?x } ORDER BY ?x");
    assert_eq!(resources(&result, "x"), vec![ex("a"), ex("b")]);
    let backwards = run(&kb, "SELECT ?x WHERE { ?x ex:next* ex:a }");
    assert_eq!(backwards.len(), 2);
}

#[test]
fn blank_nodes_in_patterns_are_not_projected() {
    let kb = setup();
    let result = run(&kb, "SELECT * WHERE { ?d ex:connectedTo _:target }");
    assert_eq!(result.columns, vec!["d"]);
    assert_eq!(result.len(), 2);
}

#[test]
fn empty_graph_gives_empty_results() {
    let kb = KnowledgeBase::new(PersistenceMode::InMemory).expect("kb");
    let result = run(&kb, "SELECT ?d ?f WHERE { ?d ex:firmwareVersion ?f }");
    assert!(result.is_empty());
    assert_eq!(result.columns, vec!["d", "f"]);
}

#[test]
fn syntax_errors_carry_a_position() {
    let kb = setup();
    let error = kb
        .execute("SELECT ?d\nWHERE { ?d ex:connectedTo }")
        .expect_err("incomplete pattern");
    match error {
        NetcladError::QuerySyntax { line, col, .. } => {
            assert_eq!(line, Some(2));
            assert!(col.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn semantic_mistakes_are_syntax_errors() {
    let kb = setup();
    for query in [
        "SELECT ?d WHERE { ?d a nope:Router }",
        "SELECT ?d WHERE { ?d ex:p ?o FILTER(FROBNICATE(?o)) }",
        "SELECT ?d WHERE { ?d ex:p ?o FILTER(STRLEN(?o, ?o)) }",
        "SELECT ?d (COUNT(?o) AS ?n) WHERE { ?d ex:p ?o }",
        "SELECT ?d WHERE { ?d ex:p ?o FILTER(COUNT(?o) > 1) }",
    ] {
        let error = kb.execute(&format!("{PREFIXES}{query}")).expect_err(query);
        assert!(
            matches!(error, NetcladError::QuerySyntax { .. }),
            "{query} gave {error}"
        );
    }
}
