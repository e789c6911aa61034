//! Parameter sweeps: re-solve the market while one input moves over a range.
//!
//! Points are independent, so they run in parallel with rayon. Every point
//! works on its own clone of the network. When the swept parameter leaves the
//! topology alone, one [`NetworkModel`] is built up front and shared read-only.

use std::fmt;

use lmp_core::{LineId, LmpResult, Network, NodeId};
use rayon::prelude::*;
use serde::Serialize;

use super::types::{InfeasibilityReason, OpfError};
use super::DispatchSolver;
use crate::sparse::NetworkModel;

/// The input being varied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum SweepParameter {
    Demand(NodeId),
    LineCapacity(LineId),
    LineLength(LineId),
    GenerationCapacity(NodeId),
    GenerationCost(NodeId),
}

impl SweepParameter {
    /// Whether the parameter alters B (and hence PTDF).
    pub fn changes_topology(&self) -> bool {
        matches!(self, SweepParameter::LineLength(_))
    }

    /// Write `value` into `network`.
    pub fn apply(&self, network: &mut Network, value: f64) -> LmpResult<()> {
        match *self {
            SweepParameter::Demand(node) => network.set_demand(node, value),
            SweepParameter::LineCapacity(line) => network.set_line_capacity(line, value),
            SweepParameter::LineLength(line) => network.set_line_length(line, value),
            SweepParameter::GenerationCapacity(node) => {
                let cost = network
                    .node(node)
                    .map(|n| n.offer.cost_per_mwh)
                    .unwrap_or(0.0);
                network.set_generation(node, value, cost)
            }
            SweepParameter::GenerationCost(node) => {
                let capacity = network
                    .node(node)
                    .map(|n| n.offer.capacity_mw)
                    .unwrap_or(0.0);
                network.set_generation(node, capacity, value)
            }
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepParameter::Demand(n) => write!(f, "demand of {n}"),
            SweepParameter::LineCapacity(l) => write!(f, "capacity of {l}"),
            SweepParameter::LineLength(l) => write!(f, "length of {l}"),
            SweepParameter::GenerationCapacity(n) => write!(f, "generation capacity of {n}"),
            SweepParameter::GenerationCost(n) => write!(f, "generation cost of {n}"),
        }
    }
}

/// Outcome at one parameter value.
#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub value: f64,
    pub total_cost: Option<f64>,
    pub energy_price: Option<f64>,
    /// Empty when the point failed
    pub lmps: Vec<f64>,
    pub flows: Vec<f64>,
    pub shedding_mw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infeasibility: Option<InfeasibilityReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepPoint {
    pub fn is_feasible(&self) -> bool {
        self.error.is_none()
    }

    fn failed(value: f64, error: String, infeasibility: Option<InfeasibilityReason>) -> Self {
        Self {
            value,
            total_cost: None,
            energy_price: None,
            lmps: Vec::new(),
            flows: Vec::new(),
            shedding_mw: 0.0,
            infeasibility,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterSweep {
    pub parameter: SweepParameter,
    pub node_names: Vec<String>,
    pub line_labels: Vec<String>,
    pub points: Vec<SweepPoint>,
}

impl ParameterSweep {
    pub fn feasible_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_feasible()).count()
    }
}

/// `steps` evenly spaced values from `from` to `to` inclusive.
pub fn linspace(from: f64, to: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![from],
        _ => (0..steps)
            .map(|i| from + (to - from) * i as f64 / (steps - 1) as f64)
            .collect(),
    }
}

/// Solve at every value. Infeasible points are recorded, not fatal; a model
/// error on the base topology is.
pub fn run_sweep(
    network: &Network,
    solver: &DispatchSolver,
    parameter: SweepParameter,
    values: &[f64],
) -> Result<ParameterSweep, OpfError> {
    let shared_model = if parameter.changes_topology() {
        None
    } else {
        Some(solver.build_model(network)?)
    };

    tracing::debug!(%parameter, points = values.len(), cached_model = shared_model.is_some(), "running sweep");

    let points: Vec<SweepPoint> = values
        .par_iter()
        .map(|&value| solve_point(network, solver, parameter, value, shared_model.as_ref()))
        .collect();

    Ok(ParameterSweep {
        parameter,
        node_names: network.nodes().map(|n| n.name.clone()).collect(),
        line_labels: network.lines().map(|l| l.name.clone()).collect(),
        points,
    })
}

fn solve_point(
    network: &Network,
    solver: &DispatchSolver,
    parameter: SweepParameter,
    value: f64,
    shared_model: Option<&NetworkModel>,
) -> SweepPoint {
    let mut snapshot = network.clone();
    if let Err(err) = parameter.apply(&mut snapshot, value) {
        return SweepPoint::failed(value, err.to_string(), None);
    }

    let result = match shared_model {
        Some(model) => solver.solve_with_model(&snapshot, model),
        None => solver.solve(&snapshot),
    };

    match result {
        Ok(market) => SweepPoint {
            value,
            total_cost: Some(market.total_cost),
            energy_price: Some(market.energy_price),
            lmps: market.lmps(),
            flows: market.flows(),
            shedding_mw: market.total_shedding_mw,
            infeasibility: None,
            error: None,
        },
        Err(err) => SweepPoint::failed(value, err.to_string(), err.infeasibility()),
    }
}
