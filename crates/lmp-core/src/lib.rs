//! # lmp-core: Transmission Network Model
//!
//! Provides the data structures for nodal market clearing on a small transmission
//! network under the DC (lossless, linear) power-flow approximation.
//!
//! ## Design Philosophy
//!
//! Networks are modeled as **undirected multigraphs** where:
//! - **Nodes**: electrical buses, each carrying one generation offer and one demand
//! - **Edges**: transmission lines with a reactance and a symmetric transfer limit
//!
//! Node and line IDs are stable dense indices (`0..N-1`, `0..L-1`) assigned in
//! insertion order. Every matrix built downstream (susceptance, PTDF) uses the
//! same ordering, so an ID doubles as a row/column index.
//!
//! A network is an immutable input value per solve: parameter edits happen between
//! solves through the `set_*` methods, never while a solve holds a reference.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lmp_core::*;
//!
//! let mut network = Network::new();
//! let a = network.add_node("A", Offer::new(100.0, 20.0), 0.0);
//! let b = network.add_node("B", Offer::new(50.0, 40.0), 0.0);
//! let c = network.add_node("C", Offer::none(), 120.0);
//!
//! network.add_line(a, b, 0.1, 100.0).unwrap();
//! network.add_line(b, c, 0.1, 100.0).unwrap();
//! network.add_line(a, c, 0.2, 50.0).unwrap();
//!
//! assert_eq!(network.total_demand(), 120.0);
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - Validation and diagnostic reporting
//! - [`error`] - Unified error type
//! - [`graph_utils`] - Topological analysis (connectivity, islands)

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod diagnostics;
pub mod error;
pub mod graph_utils;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{LmpError, LmpResult};
pub use graph_utils::*;

/// Reactance per kilometre of line (p.u./km) used when a line is sized by length.
pub const REACTANCE_PER_KM: f64 = 0.001;

/// Shortest line length accepted by [`Network::set_line_length`].
pub const MIN_LINE_LENGTH_KM: f64 = 0.1;

/// Flows within this many MW of zero count as zero (dispatch accuracy).
pub const FLOW_TOLERANCE_MW: f64 = 1e-6;

/// Graph storage behind a [`Network`].
pub type NetworkGraph = Graph<Node, Line, Undirected>;

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(usize);

impl NodeId {
    #[inline]
    pub fn new(value: usize) -> Self {
        NodeId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LineId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LineId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node#{}", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line#{}", self.0)
    }
}

/// Generation offer at a node: capacity and constant marginal cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Maximum output (MW, ≥ 0)
    pub capacity_mw: f64,
    /// Marginal cost (currency/MWh, ≥ 0)
    pub cost_per_mwh: f64,
}

impl Offer {
    pub fn new(capacity_mw: f64, cost_per_mwh: f64) -> Self {
        Self {
            capacity_mw,
            cost_per_mwh,
        }
    }

    /// A node without generation.
    pub fn none() -> Self {
        Self::default()
    }

    /// Cost of producing `p_mw` (currency/h).
    pub fn evaluate(&self, p_mw: f64) -> f64 {
        self.cost_per_mwh * p_mw
    }
}

/// An electrical bus with its local offer and demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub offer: Offer,
    /// Local demand (MW, ≥ 0)
    pub demand_mw: f64,
}

impl Node {
    /// True when the node can produce energy.
    pub fn has_generation(&self) -> bool {
        self.offer.capacity_mw > 0.0
    }
}

/// A transmission line between two nodes.
///
/// The reference direction is `from → to`; a positive flow runs that way.
/// The transfer limit applies to `|flow|`.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: LineId,
    /// Display label, `"{from}→{to}"`
    pub name: String,
    pub from: NodeId,
    pub to: NodeId,
    /// Series reactance (per-unit, > 0)
    pub reactance: f64,
    /// Symmetric transfer limit (MW, ≥ 0)
    pub capacity_mw: f64,
    /// Route length, when the line was sized by length
    pub length_km: Option<f64>,
}

impl Line {
    /// Series susceptance `b = 1/x`.
    pub fn susceptance(&self) -> f64 {
        1.0 / self.reactance
    }

    /// Ratio `|flow| / limit`. A zero-limit line reads 0 while unloaded and 1
    /// once it carries flow, so the ratio stays finite.
    pub fn utilization(&self, flow_mw: f64) -> f64 {
        if self.capacity_mw > 0.0 {
            flow_mw.abs() / self.capacity_mw
        } else if flow_mw.abs() <= FLOW_TOLERANCE_MW {
            0.0
        } else {
            1.0
        }
    }
}

/// Transmission network: nodes, lines and the designated slack bus.
#[derive(Debug, Clone)]
pub struct Network {
    graph: NetworkGraph,
    slack: NodeId,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create an empty network. The first node added becomes the slack bus.
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            slack: NodeId(0),
        }
    }

    /// Underlying graph (node index == [`NodeId`], edge index == [`LineId`]).
    pub fn graph(&self) -> &NetworkGraph {
        &self.graph
    }

    /// Add a node and return its ID.
    pub fn add_node(&mut self, name: impl Into<String>, offer: Offer, demand_mw: f64) -> NodeId {
        let id = NodeId(self.graph.node_count());
        self.graph.add_node(Node {
            id,
            name: name.into(),
            offer,
            demand_mw,
        });
        id
    }

    /// Connect two existing nodes with a line.
    pub fn add_line(
        &mut self,
        from: NodeId,
        to: NodeId,
        reactance: f64,
        capacity_mw: f64,
    ) -> LmpResult<LineId> {
        let from_name = self.require_node(from)?.name.clone();
        let to_name = self.require_node(to)?.name.clone();
        let id = LineId(self.graph.edge_count());
        self.graph.add_edge(
            NodeIndex::new(from.0),
            NodeIndex::new(to.0),
            Line {
                id,
                name: format!("{from_name}→{to_name}"),
                from,
                to,
                reactance,
                capacity_mw,
                length_km: None,
            },
        );
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(NodeIndex::new(id.0))
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.graph.edge_weight(EdgeIndex::new(id.0))
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.graph.node_weights().find(|n| n.name == name)
    }

    /// Nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Lines in ID order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.graph.edge_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn line_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Reference bus (angle fixed at zero).
    pub fn slack(&self) -> NodeId {
        self.slack
    }

    pub fn set_slack(&mut self, id: NodeId) -> LmpResult<()> {
        self.require_node(id)?;
        self.slack = id;
        Ok(())
    }

    /// Update a line's transfer limit (clamped at zero).
    pub fn set_line_capacity(&mut self, id: LineId, capacity_mw: f64) -> LmpResult<()> {
        let line = self.require_line_mut(id)?;
        line.capacity_mw = capacity_mw.max(0.0);
        Ok(())
    }

    /// Resize a line by length; reactance follows at [`REACTANCE_PER_KM`].
    pub fn set_line_length(&mut self, id: LineId, length_km: f64) -> LmpResult<()> {
        let line = self.require_line_mut(id)?;
        let length = length_km.max(MIN_LINE_LENGTH_KM);
        line.length_km = Some(length);
        line.reactance = length * REACTANCE_PER_KM;
        Ok(())
    }

    /// Update a line's reactance directly.
    pub fn set_line_reactance(&mut self, id: LineId, reactance: f64) -> LmpResult<()> {
        let line = self.require_line_mut(id)?;
        line.reactance = reactance;
        Ok(())
    }

    /// Update a node's offer (capacity and cost clamped at zero).
    pub fn set_generation(&mut self, id: NodeId, capacity_mw: f64, cost_per_mwh: f64) -> LmpResult<()> {
        let node = self.require_node_mut(id)?;
        node.offer = Offer::new(capacity_mw.max(0.0), cost_per_mwh.max(0.0));
        Ok(())
    }

    /// Update a node's demand (clamped at zero).
    pub fn set_demand(&mut self, id: NodeId, demand_mw: f64) -> LmpResult<()> {
        let node = self.require_node_mut(id)?;
        node.demand_mw = demand_mw.max(0.0);
        Ok(())
    }

    pub fn total_generation_capacity(&self) -> f64 {
        self.nodes().map(|n| n.offer.capacity_mw).sum()
    }

    pub fn total_demand(&self) -> f64 {
        self.nodes().map(|n| n.demand_mw).sum()
    }

    /// Demand per node in ID order.
    pub fn demand_vector(&self) -> Vec<f64> {
        self.nodes().map(|n| n.demand_mw).collect()
    }

    fn require_node(&self, id: NodeId) -> LmpResult<&Node> {
        self.node(id)
            .ok_or_else(|| LmpError::Network(format!("unknown node {id}")))
    }

    fn require_node_mut(&mut self, id: NodeId) -> LmpResult<&mut Node> {
        self.graph
            .node_weight_mut(NodeIndex::new(id.0))
            .ok_or_else(|| LmpError::Network(format!("unknown node {id}")))
    }

    fn require_line_mut(&mut self, id: LineId) -> LmpResult<&mut Line> {
        self.graph
            .edge_weight_mut(EdgeIndex::new(id.0))
            .ok_or_else(|| LmpError::Network(format!("unknown line {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_node() -> Network {
        let mut network = Network::new();
        let a = network.add_node("A", Offer::new(100.0, 20.0), 0.0);
        let b = network.add_node("B", Offer::new(50.0, 40.0), 0.0);
        let c = network.add_node("C", Offer::none(), 120.0);
        network.add_line(a, b, 0.1, 100.0).unwrap();
        network.add_line(b, c, 0.1, 100.0).unwrap();
        network.add_line(a, c, 0.2, 50.0).unwrap();
        network
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let network = three_node();
        let ids: Vec<usize> = network.nodes().map(|n| n.id.value()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        let ids: Vec<usize> = network.lines().map(|l| l.id.value()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_line_label_uses_node_names() {
        let network = three_node();
        let line = network.line(LineId::new(2)).unwrap();
        assert_eq!(line.name, "A→C");
        assert!((line.susceptance() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_add_line_rejects_unknown_node() {
        let mut network = three_node();
        let err = network
            .add_line(NodeId::new(0), NodeId::new(7), 0.1, 10.0)
            .unwrap_err();
        assert!(matches!(err, LmpError::Network(_)));
    }

    #[test]
    fn test_parameter_edits_clamp() {
        let mut network = three_node();
        network.set_demand(NodeId::new(2), -5.0).unwrap();
        assert_eq!(network.node(NodeId::new(2)).unwrap().demand_mw, 0.0);

        network.set_generation(NodeId::new(0), -1.0, -3.0).unwrap();
        assert_eq!(network.node(NodeId::new(0)).unwrap().offer, Offer::new(0.0, 0.0));

        network.set_line_capacity(LineId::new(0), -10.0).unwrap();
        assert_eq!(network.line(LineId::new(0)).unwrap().capacity_mw, 0.0);
    }

    #[test]
    fn test_line_length_sets_reactance() {
        let mut network = three_node();
        network.set_line_length(LineId::new(1), 250.0).unwrap();
        let line = network.line(LineId::new(1)).unwrap();
        assert_eq!(line.length_km, Some(250.0));
        assert!((line.reactance - 0.25).abs() < 1e-12);

        network.set_line_length(LineId::new(1), 0.0).unwrap();
        let line = network.line(LineId::new(1)).unwrap();
        assert_eq!(line.length_km, Some(MIN_LINE_LENGTH_KM));
    }

    #[test]
    fn test_totals() {
        let network = three_node();
        assert_eq!(network.total_generation_capacity(), 150.0);
        assert_eq!(network.total_demand(), 120.0);
        assert_eq!(network.demand_vector(), vec![0.0, 0.0, 120.0]);
    }

    #[test]
    fn test_slack_selection() {
        let mut network = three_node();
        assert_eq!(network.slack(), NodeId::new(0));
        network.set_slack(NodeId::new(2)).unwrap();
        assert_eq!(network.slack(), NodeId::new(2));
        assert!(network.set_slack(NodeId::new(3)).is_err());
    }

    #[test]
    fn test_utilization() {
        let network = three_node();
        let line = network.line(LineId::new(2)).unwrap();
        assert!((line.utilization(-25.0) - 0.5).abs() < 1e-12);

        let mut closed = line.clone();
        closed.capacity_mw = 0.0;
        assert_eq!(closed.utilization(0.0), 0.0);
        // Solver noise on a closed line
        assert_eq!(closed.utilization(1.7e-7), 0.0);
        assert_eq!(closed.utilization(-5.0), 1.0);
    }
}
