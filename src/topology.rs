//! Fixed graph algorithms over the device-connectivity subgraph.
//!
//! Devices are the instances of `NetworkDevice` after inference, so a device
//! typed only as a `Router` whose class is declared a subclass of
//! `NetworkDevice` is included. Connectivity edges are the `connectedTo`
//! triples with a resource object. When `connectedTo` is declared an
//! `owl:SymmetricProperty` every edge is read in both directions.
//!
//! Every analysis is read-only and returns a list of [`Finding`]s.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::construct::{Resource, Term, TripleSource};
use crate::error::NetcladError;
use crate::finding::{Finding, FindingKind, Tier};
use crate::graph::GraphView;
use crate::vocabulary::NetworkVocabulary;

/// The analyses available by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    RedundantPaths,
    IsolatedDevices,
    MissingInterfaces,
    DisconnectedZones,
    Hierarchy,
    SinglePointsOfFailure,
    IpConflicts,
}

impl Report {
    pub const ALL: [Report; 7] = [
        Report::RedundantPaths,
        Report::IsolatedDevices,
        Report::MissingInterfaces,
        Report::DisconnectedZones,
        Report::Hierarchy,
        Report::SinglePointsOfFailure,
        Report::IpConflicts,
    ];
    pub fn name(&self) -> &'static str {
        match self {
            Report::RedundantPaths => "redundant-paths",
            Report::IsolatedDevices => "isolated-devices",
            Report::MissingInterfaces => "missing-interfaces",
            Report::DisconnectedZones => "disconnected-zones",
            Report::Hierarchy => "hierarchy",
            Report::SinglePointsOfFailure => "single-points-of-failure",
            Report::IpConflicts => "ip-conflicts",
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Report {
    type Err = NetcladError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Report::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NetcladError::InvalidTerm(format!("unknown report '{}'", s)))
    }
}

/// A device's place in the connectivity hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRank {
    pub device: Resource,
    pub degree: usize,
    pub tier: Tier,
    /// The device's classes that specialize `NetworkDevice`.
    pub types: BTreeSet<Resource>,
}

pub struct Analyzer<'a> {
    view: GraphView<'a>,
    vocabulary: &'a NetworkVocabulary,
}

impl<'a> Analyzer<'a> {
    pub fn new(view: GraphView<'a>, vocabulary: &'a NetworkVocabulary) -> Self {
        Self { view, vocabulary }
    }

    pub fn devices(&self) -> BTreeSet<Resource> {
        self.view.instances_of(&self.vocabulary.network_device)
    }

    /// Directed `connectedTo` edges between resources.
    pub fn edges(&self) -> Vec<(Resource, Resource)> {
        self.view
            .matching(None, Some(&self.vocabulary.connected_to), None)
            .filter_map(|t| match t.object {
                Term::Resource(target) => Some((t.subject, target)),
                Term::Literal(_) => None,
            })
            .collect()
    }

    /// Outgoing targets per resource, plus incoming sources when the
    /// connectivity property is symmetric.
    pub fn neighbours(&self) -> BTreeMap<Resource, BTreeSet<Resource>> {
        let symmetric = self
            .view
            .schema()
            .is_symmetric(&self.vocabulary.connected_to);
        let mut neighbours: BTreeMap<Resource, BTreeSet<Resource>> = BTreeMap::new();
        for (source, target) in self.edges() {
            if symmetric {
                neighbours
                    .entry(target.clone())
                    .or_default()
                    .insert(source.clone());
            }
            neighbours.entry(source).or_default().insert(target);
        }
        neighbours
    }

    /// Device pairs joined by more than one distinct link resource.
    pub fn redundant_paths(&self) -> Vec<Finding> {
        let v = self.vocabulary;
        let mut endpoints: BTreeMap<Resource, BTreeSet<Resource>> = BTreeMap::new();
        for predicate in [&v.connects_from, &v.connects_to] {
            for triple in self.view.matching(None, Some(predicate), None) {
                if let Term::Resource(device) = triple.object {
                    endpoints.entry(triple.subject).or_default().insert(device);
                }
            }
        }
        for triple in self.view.matching(None, Some(&v.connects_interface), None) {
            let owners = self.view.subjects(&v.has_interface, &triple.object);
            endpoints.entry(triple.subject).or_default().extend(owners);
        }
        let mut links_by_pair: BTreeMap<(Resource, Resource), BTreeSet<Resource>> =
            BTreeMap::new();
        for (link, devices) in endpoints {
            let devices: Vec<&Resource> = devices.iter().collect();
            for (i, first) in devices.iter().enumerate() {
                for second in &devices[i + 1..] {
                    // devices iterate sorted, so (first, second) is already normalized
                    links_by_pair
                        .entry(((*first).clone(), (*second).clone()))
                        .or_default()
                        .insert(link.clone());
                }
            }
        }
        links_by_pair
            .into_iter()
            .filter(|(_, links)| links.len() > 1)
            .map(|(devices, links)| Finding::new(FindingKind::RedundantPath { devices, links }))
            .collect()
    }

    /// Declared devices that are neither source nor target of any connection.
    pub fn isolated_devices(&self) -> Vec<Finding> {
        let mut connected = BTreeSet::new();
        for (source, target) in self.edges() {
            connected.insert(source);
            connected.insert(target);
        }
        self.devices()
            .into_iter()
            .filter(|device| !connected.contains(device))
            .map(|device| Finding::new(FindingKind::IsolatedDevice { device }))
            .collect()
    }

    /// Declared devices without a single interface.
    pub fn missing_interfaces(&self) -> Vec<Finding> {
        self.devices()
            .into_iter()
            .filter(|device| {
                self.view
                    .matching(Some(device), Some(&self.vocabulary.has_interface), None)
                    .next()
                    .is_none()
            })
            .map(|device| Finding::new(FindingKind::MissingInterface { device }))
            .collect()
    }

    /// Pairs of zones holding at least one device each, with no connection
    /// between their devices in either direction.
    pub fn disconnected_zones(&self) -> Vec<Finding> {
        let devices = self.devices();
        let mut zones_of: BTreeMap<Resource, BTreeSet<Resource>> = BTreeMap::new();
        for triple in self
            .view
            .matching(None, Some(&self.vocabulary.belongs_to_zone), None)
        {
            if !devices.contains(&triple.subject) {
                continue;
            }
            if let Term::Resource(zone) = triple.object {
                zones_of.entry(triple.subject).or_default().insert(zone);
            }
        }
        let zones: BTreeSet<&Resource> = zones_of.values().flatten().collect();
        let mut linked: BTreeSet<(&Resource, &Resource)> = BTreeSet::new();
        let edges = self.edges();
        for (source, target) in &edges {
            let (Some(from), Some(to)) = (zones_of.get(source), zones_of.get(target)) else {
                continue;
            };
            for a in from {
                for b in to {
                    linked.insert(if a <= b { (a, b) } else { (b, a) });
                }
            }
        }
        let zones: Vec<&Resource> = zones.into_iter().collect();
        let mut findings = Vec::new();
        for (i, a) in zones.iter().enumerate() {
            for b in &zones[i + 1..] {
                if !linked.contains(&(*a, *b)) {
                    findings.push(Finding::new(FindingKind::DisconnectedZones {
                        zones: ((*a).clone(), (*b).clone()),
                    }));
                }
            }
        }
        findings
    }

    /// Devices with at least one connection, most connected first.
    pub fn rank_devices(&self) -> Vec<DeviceRank> {
        let devices = self.devices();
        let schema = self.view.schema();
        let mut ranks: Vec<DeviceRank> = self
            .neighbours()
            .into_iter()
            .filter(|(device, linked)| devices.contains(device) && !linked.is_empty())
            .map(|(device, linked)| {
                let degree = linked.len();
                let types = self
                    .view
                    .types_of(&device)
                    .into_iter()
                    .filter(|t| {
                        *t != self.vocabulary.network_device
                            && schema.is_subclass_of(t, &self.vocabulary.network_device)
                    })
                    .collect();
                DeviceRank { device, degree, tier: Tier::from_degree(degree), types }
            })
            .collect();
        // stable sort keeps identifier order among equal degrees
        ranks.sort_by(|a, b| b.degree.cmp(&a.degree));
        ranks
    }

    pub fn hierarchy(&self) -> Vec<Finding> {
        self.rank_devices()
            .into_iter()
            .map(|rank| {
                Finding::new(FindingKind::DeviceTier {
                    device: rank.device,
                    degree: rank.degree,
                    tier: rank.tier,
                })
            })
            .collect()
    }

    /// Routers that are the only neighbour of some device. This is the local
    /// one-hop rule, not articulation-point analysis.
    pub fn single_points_of_failure(&self) -> Vec<Finding> {
        let devices = self.devices();
        let routers = self.view.instances_of(&self.vocabulary.router);
        let neighbours = self.neighbours();
        let mut findings = Vec::new();
        for router in &routers {
            let Some(linked) = neighbours.get(router) else {
                continue;
            };
            for dependent in linked.iter().filter(|d| devices.contains(*d)) {
                let alternatives = neighbours
                    .get(dependent)
                    .map(|n| n.iter().any(|alt| alt != router))
                    .unwrap_or(false);
                if !alternatives {
                    findings.push(Finding::new(FindingKind::SinglePointOfFailure {
                        router: router.clone(),
                        dependent: dependent.clone(),
                    }));
                }
            }
        }
        findings
    }

    /// Distinct interfaces of one device sharing an address.
    pub fn ip_conflicts(&self) -> Vec<Finding> {
        let v = self.vocabulary;
        let mut by_address: BTreeMap<(Resource, String), BTreeSet<Resource>> = BTreeMap::new();
        for owned in self.view.matching(None, Some(&v.has_interface), None) {
            let Term::Resource(interface) = owned.object else {
                continue;
            };
            for address in self.view.objects(&interface, &v.ip_address) {
                by_address
                    .entry((owned.subject.clone(), address.value().to_string()))
                    .or_default()
                    .insert(interface.clone());
            }
        }
        by_address
            .into_iter()
            .filter(|(_, interfaces)| interfaces.len() > 1)
            .map(|((device, address), interfaces)| {
                Finding::new(FindingKind::IpConflict { device, interfaces, address })
            })
            .collect()
    }

    pub fn report(&self, report: Report) -> Vec<Finding> {
        match report {
            Report::RedundantPaths => self.redundant_paths(),
            Report::IsolatedDevices => self.isolated_devices(),
            Report::MissingInterfaces => self.missing_interfaces(),
            Report::DisconnectedZones => self.disconnected_zones(),
            Report::Hierarchy => self.hierarchy(),
            Report::SinglePointsOfFailure => self.single_points_of_failure(),
            Report::IpConflicts => self.ip_conflicts(),
        }
    }
}
