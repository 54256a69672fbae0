//! Well-known URIs.
//!
//! The RDF, RDFS, OWL and XML Schema terms the schema index understands, plus
//! the handful of network-topology terms the analyzer is written against.

use crate::construct::Resource;

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_SUBPROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
pub const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
pub const OWL_SYMMETRIC_PROPERTY: &str = "http://www.w3.org/2002/07/owl#SymmetricProperty";

/// Namespace of the network-topology ontology.
pub const NETWORK_NS: &str = "http://example.org/network-topology#";

/// The ontology terms the topology analyzer depends on, resolved against a
/// namespace so that deployments with a different ontology URI still work.
#[derive(Debug, Clone)]
pub struct NetworkVocabulary {
    pub network_device: Resource,
    pub router: Resource,
    pub connected_to: Resource,
    pub has_interface: Resource,
    pub belongs_to_zone: Resource,
    pub connects_from: Resource,
    pub connects_to: Resource,
    pub connects_interface: Resource,
    pub ip_address: Resource,
}

impl NetworkVocabulary {
    pub fn new(namespace: &str) -> Self {
        let term = |local: &str| Resource::named(format!("{namespace}{local}"));
        Self {
            network_device: term("NetworkDevice"),
            router: term("Router"),
            connected_to: term("connectedTo"),
            has_interface: term("hasInterface"),
            belongs_to_zone: term("belongsToZone"),
            connects_from: term("connectsFrom"),
            connects_to: term("connectsTo"),
            connects_interface: term("connectsInterface"),
            ip_address: term("ipAddress"),
        }
    }
}

impl Default for NetworkVocabulary {
    fn default() -> Self {
        Self::new(NETWORK_NS)
    }
}

pub fn rdf_type() -> Resource {
    Resource::named(RDF_TYPE)
}
pub fn subclass_of() -> Resource {
    Resource::named(RDFS_SUBCLASS_OF)
}
pub fn subproperty_of() -> Resource {
    Resource::named(RDFS_SUBPROPERTY_OF)
}
