//! Case files: node list, lines, per-node offers and demand.
//!
//! ```toml
//! name = "three-node"
//! nodes = ["A", "B", "C"]
//! slack = "A"
//!
//! [[lines]]
//! from = "A"
//! to = "B"
//! reactance = 0.1
//! capacity = 100
//!
//! [[lines]]
//! from = "A"
//! to = "C"
//! length = 200      # km; reactance = 0.001/km when not given
//! capacity = 50
//!
//! [generation.A]
//! capacity = 100
//! cost = 20
//!
//! [consumption]
//! C = 120
//! ```
//!
//! The same structure is accepted as JSON.

use std::collections::{BTreeMap, HashMap};

use lmp_core::{Diagnostics, LineId, Network, NodeId, Offer, REACTANCE_PER_KM};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural problems that make a case unusable.
#[derive(Debug, Error, PartialEq)]
pub enum CaseError {
    #[error("case has no nodes")]
    NoNodes,

    #[error("node '{0}' is listed more than once")]
    DuplicateNode(String),

    #[error("{context} references unknown node '{node}'")]
    UnknownNode { context: String, node: String },

    #[error("line {line} needs a reactance or a length")]
    MissingImpedance { line: String },

    #[error("line {line} connects node '{node}' to itself")]
    SelfLoop { line: String, node: String },
}

/// One line as written in a case file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactance: Option<f64>,
    /// Transfer limit (MW)
    pub capacity: f64,
    /// Route length (km)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSpec {
    pub capacity: f64,
    pub cost: f64,
}

/// On-disk case layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<String>,
    /// Reference node; defaults to the first node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<String>,
    /// Enables load shedding at this price (currency/MWh)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_of_lost_load: Option<f64>,
    #[serde(default)]
    pub lines: Vec<LineSpec>,
    #[serde(default)]
    pub generation: BTreeMap<String, GenerationSpec>,
    #[serde(default)]
    pub consumption: BTreeMap<String, f64>,
}

/// A loaded case: the network plus case-level settings.
#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub network: Network,
    pub value_of_lost_load: Option<f64>,
}

/// Import output with everything noticed along the way.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub case: Case,
    pub diagnostics: Diagnostics,
}

impl CaseFile {
    /// Build the network, recording non-fatal oddities in `diag`.
    pub fn build(&self, default_name: &str, diag: &mut Diagnostics) -> Result<Case, CaseError> {
        if self.nodes.is_empty() {
            return Err(CaseError::NoNodes);
        }

        let mut network = Network::new();
        let mut ids: HashMap<&str, NodeId> = HashMap::with_capacity(self.nodes.len());
        for name in &self.nodes {
            let offer = self
                .generation
                .get(name)
                .map(|g| Offer::new(g.capacity, g.cost))
                .unwrap_or_else(Offer::none);
            let demand = self.consumption.get(name).copied().unwrap_or(0.0);
            let id = network.add_node(name.clone(), offer, demand);
            if ids.insert(name.as_str(), id).is_some() {
                return Err(CaseError::DuplicateNode(name.clone()));
            }
        }

        for (table, keys) in [
            ("generation", self.generation.keys().collect::<Vec<_>>()),
            ("consumption", self.consumption.keys().collect()),
        ] {
            for key in keys {
                if !ids.contains_key(key.as_str()) {
                    diag.add_warning_with_entity(
                        "reference",
                        &format!("{table} entry for unknown node ignored"),
                        key,
                    );
                }
            }
        }

        for (idx, spec) in self.lines.iter().enumerate() {
            let label = format!("#{idx} ({}→{})", spec.from, spec.to);
            let lookup = |node: &str| {
                ids.get(node).copied().ok_or_else(|| CaseError::UnknownNode {
                    context: format!("line {label}"),
                    node: node.to_string(),
                })
            };
            let from = lookup(&spec.from)?;
            let to = lookup(&spec.to)?;
            if from == to {
                return Err(CaseError::SelfLoop {
                    line: label,
                    node: spec.from.clone(),
                });
            }

            let reactance = match (spec.reactance, spec.length) {
                (Some(x), _) => x,
                (None, Some(km)) => km * REACTANCE_PER_KM,
                (None, None) => return Err(CaseError::MissingImpedance { line: label }),
            };
            let line = network
                .add_line(from, to, reactance, spec.capacity)
                .map_err(|_| CaseError::UnknownNode {
                    context: format!("line {label}"),
                    node: spec.from.clone(),
                })?;
            if spec.reactance.is_none() {
                if let Some(km) = spec.length {
                    set_length(&mut network, line, km);
                }
            }
        }

        if let Some(slack) = &self.slack {
            let id = ids.get(slack.as_str()).copied().ok_or_else(|| CaseError::UnknownNode {
                context: "slack".to_string(),
                node: slack.clone(),
            })?;
            // id comes from this network, so this cannot fail
            let _ = network.set_slack(id);
        }

        Ok(Case {
            name: self.name.clone().unwrap_or_else(|| default_name.to_string()),
            network,
            value_of_lost_load: self.value_of_lost_load,
        })
    }

    /// Snapshot a network back into case layout.
    pub fn from_case(case: &Case) -> Self {
        let network = &case.network;
        let name_of = |id: NodeId| {
            network
                .node(id)
                .map(|n| n.name.clone())
                .unwrap_or_default()
        };
        Self {
            name: Some(case.name.clone()),
            nodes: network.nodes().map(|n| n.name.clone()).collect(),
            lines: network
                .lines()
                .map(|l| LineSpec {
                    from: name_of(l.from),
                    to: name_of(l.to),
                    reactance: Some(l.reactance),
                    capacity: l.capacity_mw,
                    length: l.length_km,
                })
                .collect(),
            generation: network
                .nodes()
                .filter(|n| n.has_generation())
                .map(|n| {
                    (
                        n.name.clone(),
                        GenerationSpec {
                            capacity: n.offer.capacity_mw,
                            cost: n.offer.cost_per_mwh,
                        },
                    )
                })
                .collect(),
            consumption: network
                .nodes()
                .filter(|n| n.demand_mw > 0.0)
                .map(|n| (n.name.clone(), n.demand_mw))
                .collect(),
            slack: Some(name_of(network.slack())),
            value_of_lost_load: case.value_of_lost_load,
        }
    }
}

fn set_length(network: &mut Network, line: LineId, km: f64) {
    // line was just added, so the ID is valid
    let _ = network.set_line_length(line, km);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CaseFile {
        toml::from_str(
            r#"
            nodes = ["A", "B", "C"]
            slack = "B"

            [[lines]]
            from = "A"
            to = "B"
            reactance = 0.1
            capacity = 100

            [[lines]]
            from = "A"
            to = "C"
            length = 200
            capacity = 50

            [generation.A]
            capacity = 100
            cost = 20

            [consumption]
            C = 120
            D = 10
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_network() {
        let mut diag = Diagnostics::new();
        let case = sample().build("sample", &mut diag).unwrap();
        let network = &case.network;

        assert_eq!(case.name, "sample");
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.slack(), NodeId::new(1));
        assert_eq!(network.node_by_name("C").unwrap().demand_mw, 120.0);
        assert_eq!(network.node_by_name("B").unwrap().offer, Offer::none());

        let line = network.line(LineId::new(1)).unwrap();
        assert_eq!(line.name, "A→C");
        assert!((line.reactance - 0.2).abs() < 1e-12);
        assert_eq!(line.length_km, Some(200.0));

        // Consumption for D is ignored with a warning
        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.issues[0].entity.as_deref(), Some("D"));
    }

    #[test]
    fn test_unknown_line_endpoint() {
        let mut case = sample();
        case.lines[0].to = "Z".into();
        let err = case.build("x", &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, CaseError::UnknownNode { ref node, .. } if node == "Z"));
    }

    #[test]
    fn test_missing_impedance() {
        let mut case = sample();
        case.lines[1].length = None;
        let err = case.build("x", &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, CaseError::MissingImpedance { .. }));
    }

    #[test]
    fn test_duplicate_node() {
        let mut case = sample();
        case.nodes.push("A".into());
        let err = case.build("x", &mut Diagnostics::new()).unwrap_err();
        assert_eq!(err, CaseError::DuplicateNode("A".into()));
    }

    #[test]
    fn test_snapshot_keeps_slack_and_offers() {
        let case = sample().build("x", &mut Diagnostics::new()).unwrap();
        let file = CaseFile::from_case(&case);
        assert_eq!(file.slack.as_deref(), Some("B"));
        assert_eq!(file.generation["A"], GenerationSpec { capacity: 100.0, cost: 20.0 });
        assert_eq!(file.lines[1].length, Some(200.0));
    }
}
