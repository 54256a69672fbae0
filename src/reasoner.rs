//! Subsumption inference and structural validation.

use tracing::info;

use crate::construct::{Term, Triple, TripleSource, TripleStore};
use crate::finding::{Finding, FindingKind, ValidationReport};
use crate::graph::Graph;
use crate::schema::SchemaIndex;
use crate::topology::Analyzer;
use crate::vocabulary::{NetworkVocabulary, rdf_type, subclass_of};

/// Materializes the triples implied by the class hierarchy:
///
/// * `(x rdf:type A)` for every `(x rdf:type C)` and every ancestor `A` of `C`,
/// * `(C rdfs:subClassOf A)` for every declared class `C` and every strict
///   ancestor `A` of it.
///
/// Triples already present in the base are never repeated.
pub fn materialize_inference<S: TripleSource + ?Sized>(
    base: &S,
    schema: &SchemaIndex,
) -> TripleStore {
    let mut inferred = TripleStore::new();
    let is_a = rdf_type();
    for typing in base.matching(None, Some(&is_a), None) {
        let Term::Resource(class) = &typing.object else {
            continue;
        };
        for ancestor in schema.class_closure(class) {
            let candidate = Triple::new(typing.subject.clone(), is_a.clone(), ancestor);
            if !base.contains(&candidate) {
                inferred.insert(candidate);
            }
        }
    }
    let sub = subclass_of();
    for class in schema.classes() {
        for ancestor in schema.class_closure(&class.resource) {
            if ancestor == class.resource {
                continue;
            }
            let candidate = Triple::new(class.resource.clone(), sub.clone(), ancestor);
            if !base.contains(&candidate) {
                inferred.insert(candidate);
            }
        }
    }
    inferred
}

/// Runs the fixed rule set over the graph. Problems are reported, never raised.
pub fn validate(graph: &Graph, vocabulary: &NetworkVocabulary) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.extend(graph.schema().cyclic_classes().into_iter().map(|classes| {
        Finding::new(FindingKind::CyclicHierarchy { classes })
    }));
    let analyzer = Analyzer::new(graph.view(), vocabulary);
    report.extend(analyzer.missing_interfaces());
    report.extend(analyzer.isolated_devices());
    report.extend(analyzer.disconnected_zones());
    report.extend(analyzer.ip_conflicts());
    info!(findings = report.len(), triples = graph.len(), "validation complete");
    report
}

