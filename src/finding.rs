//! Structured findings produced by validation and topology analysis.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::construct::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Core,
    Distribution,
    Access,
}

impl Tier {
    /// Fixed thresholds: three or more neighbours is core, two is
    /// distribution, anything less is access.
    pub fn from_degree(degree: usize) -> Self {
        match degree {
            d if d >= 3 => Tier::Core,
            2 => Tier::Distribution,
            _ => Tier::Access,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Tier::Core => "core",
            Tier::Distribution => "distribution",
            Tier::Access => "access",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum FindingKind {
    CyclicHierarchy { classes: BTreeSet<Resource> },
    RedundantPath { devices: (Resource, Resource), links: BTreeSet<Resource> },
    IsolatedDevice { device: Resource },
    MissingInterface { device: Resource },
    DisconnectedZones { zones: (Resource, Resource) },
    IpConflict { device: Resource, interfaces: BTreeSet<Resource>, address: String },
    SinglePointOfFailure { router: Resource, dependent: Resource },
    DeviceTier { device: Resource, degree: usize, tier: Tier },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: FindingKind,
    pub description: String,
}

impl Finding {
    pub fn new(kind: FindingKind) -> Self {
        let severity = match kind {
            FindingKind::RedundantPath { .. } | FindingKind::DeviceTier { .. } => Severity::Info,
            _ => Severity::Warning,
        };
        let description = describe(&kind);
        Self { severity, kind, description }
    }
    pub fn category(&self) -> &'static str {
        match self.kind {
            FindingKind::CyclicHierarchy { .. } => "cyclic-hierarchy",
            FindingKind::RedundantPath { .. } => "redundant-path",
            FindingKind::IsolatedDevice { .. } => "isolated-device",
            FindingKind::MissingInterface { .. } => "missing-interface",
            FindingKind::DisconnectedZones { .. } => "disconnected-zones",
            FindingKind::IpConflict { .. } => "ip-conflict",
            FindingKind::SinglePointOfFailure { .. } => "single-point-of-failure",
            FindingKind::DeviceTier { .. } => "device-tier",
        }
    }
    /// The resources the finding is about.
    pub fn resources(&self) -> Vec<&Resource> {
        match &self.kind {
            FindingKind::CyclicHierarchy { classes } => classes.iter().collect(),
            FindingKind::RedundantPath { devices, links } => {
                let mut resources = vec![&devices.0, &devices.1];
                resources.extend(links.iter());
                resources
            }
            FindingKind::IsolatedDevice { device }
            | FindingKind::MissingInterface { device }
            | FindingKind::DeviceTier { device, .. } => vec![device],
            FindingKind::DisconnectedZones { zones } => vec![&zones.0, &zones.1],
            FindingKind::IpConflict { device, interfaces, .. } => {
                let mut resources = vec![device];
                resources.extend(interfaces.iter());
                resources
            }
            FindingKind::SinglePointOfFailure { router, dependent } => vec![router, dependent],
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.description)
    }
}

fn names<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> String {
    resources
        .into_iter()
        .map(|r| r.local_name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(kind: &FindingKind) -> String {
    match kind {
        FindingKind::CyclicHierarchy { classes } => {
            format!("Classes {} form a cyclic subclass hierarchy", names(classes))
        }
        FindingKind::RedundantPath { devices, links } => format!(
            "Devices {} and {} are joined by {} links ({})",
            devices.0.local_name(),
            devices.1.local_name(),
            links.len(),
            names(links)
        ),
        FindingKind::IsolatedDevice { device } => {
            format!("Device {} has no connections", device.local_name())
        }
        FindingKind::MissingInterface { device } => {
            format!("Device {} has no interfaces", device.local_name())
        }
        FindingKind::DisconnectedZones { zones } => format!(
            "No device in zone {} connects to a device in zone {}",
            zones.0.local_name(),
            zones.1.local_name()
        ),
        FindingKind::IpConflict { device, interfaces, address } => format!(
            "Device {} uses address {} on interfaces {}",
            device.local_name(),
            address,
            names(interfaces)
        ),
        FindingKind::SinglePointOfFailure { router, dependent } => format!(
            "Device {} depends solely on router {}",
            dependent.local_name(),
            router.local_name()
        ),
        FindingKind::DeviceTier { device, degree, tier } => format!(
            "Device {} has {} connections and classifies as {}",
            device.local_name(),
            degree,
            tier
        ),
    }
}

/// The outcome of `validate`. An empty report means the graph is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.findings.is_empty()
    }
    pub fn len(&self) -> usize {
        self.findings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }
    pub fn of_category<'r>(&'r self, category: &'r str) -> impl Iterator<Item = &'r Finding> {
        self.findings.iter().filter(move |f| f.category() == category)
    }
}

impl Extend<Finding> for ValidationReport {
    fn extend<I: IntoIterator<Item = Finding>>(&mut self, iter: I) {
        self.findings.extend(iter);
    }
}
