use std::fmt;

use lmp_core::{LineId, NodeId};
use serde::Serialize;
use thiserror::Error;

use crate::sparse::{ModelError, PtdfMatrix};

/// Dispatch method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpfMethod {
    /// LP with PTDF line limits; LMPs from duals
    #[default]
    DcOpf,
    /// Copper-plate merit order (no line limits)
    MeritOrder,
}

impl fmt::Display for OpfMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpfMethod::DcOpf => write!(f, "dc"),
            OpfMethod::MeritOrder => write!(f, "merit"),
        }
    }
}

impl std::str::FromStr for OpfMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dc" | "dc-opf" | "dcopf" => Ok(OpfMethod::DcOpf),
            "merit" | "merit-order" | "economic" => Ok(OpfMethod::MeritOrder),
            _ => Err(format!("Unknown dispatch method: {}", s)),
        }
    }
}

/// Why no feasible dispatch exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibilityReason {
    /// Total generation capacity below total demand
    InsufficientCapacity,
    /// Enough capacity in aggregate, but line limits block every dispatch
    NetworkConstrained,
}

impl InfeasibilityReason {
    /// What the user can change to make the case solvable.
    pub fn suggestion(&self) -> &'static str {
        match self {
            InfeasibilityReason::InsufficientCapacity => {
                "Increase generation capacity or reduce demand so that supply covers load."
            }
            InfeasibilityReason::NetworkConstrained => {
                "Raise the limits of the saturated lines or move generation closer to the load."
            }
        }
    }
}

impl fmt::Display for InfeasibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfeasibilityReason::InsufficientCapacity => write!(f, "insufficient capacity"),
            InfeasibilityReason::NetworkConstrained => write!(f, "network constrained"),
        }
    }
}

/// Dispatch Optimizer failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("dispatch infeasible: {0}")]
    Infeasible(InfeasibilityReason),

    /// LP solver stopped without a usable answer
    #[error("dispatch solver numerical issue: {0}")]
    Numerical(String),

    /// Network and PTDF disagree in size
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

impl DispatchError {
    pub fn infeasibility(&self) -> Option<InfeasibilityReason> {
        match self {
            DispatchError::Infeasible(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Any failure of a full solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpfError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("invalid solver configuration: {0}")]
    Config(String),
}

impl OpfError {
    /// Infeasibility reason, when the solve failed as a market outcome.
    pub fn infeasibility(&self) -> Option<InfeasibilityReason> {
        match self {
            OpfError::Dispatch(err) => err.infeasibility(),
            _ => None,
        }
    }
}

/// Raw output of the Dispatch Optimizer, indexed by node and line ID.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSolution {
    pub method: OpfMethod,
    /// Generation per node (MW), zero where the node has no offer
    pub dispatch: Vec<f64>,
    /// Unserved demand per node (MW), all zero unless VOLL is set
    pub shedding: Vec<f64>,
    /// Flow per line (MW), positive in the line's from → to direction
    pub flows: Vec<f64>,
    /// Σ cost·g + VOLL·Σ shedding (currency/h)
    pub total_cost: f64,
    /// System marginal price: dual of the energy balance (currency/MWh)
    pub lambda: f64,
    /// Congestion price per line, zero unless a limit is active
    pub mu: Vec<f64>,
    pub feasible: bool,
    pub iterations: usize,
    pub solve_time_ms: u128,
}

impl DispatchSolution {
    /// g + s − d per node.
    pub fn net_injections(&self, demand: &[f64]) -> Vec<f64> {
        self.dispatch
            .iter()
            .zip(&self.shedding)
            .zip(demand)
            .map(|((g, s), d)| g + s - d)
            .collect()
    }

    pub fn total_generation(&self) -> f64 {
        self.dispatch.iter().sum()
    }

    pub fn total_shedding(&self) -> f64 {
        self.shedding.iter().sum()
    }

    /// Lines carrying a nonzero congestion price.
    pub fn binding_lines(&self) -> Vec<LineId> {
        self.mu
            .iter()
            .enumerate()
            .filter(|(_, mu)| **mu != 0.0)
            .map(|(l, _)| LineId::new(l))
            .collect()
    }
}

/// Overall state of the market after a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Healthy,
    /// Load was shed at VOLL
    Scarcity,
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemStatus::Healthy => write!(f, "HEALTHY"),
            SystemStatus::Scarcity => write!(f, "SCARCITY"),
        }
    }
}

/// One line's share of a node's congestion component.
#[derive(Debug, Clone, Serialize)]
pub struct CongestionContribution {
    pub line: LineId,
    pub label: String,
    pub value: f64,
}

/// Flow a single generator causes on a line.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorFlow {
    pub generator: String,
    pub flow_mw: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeResult {
    pub id: NodeId,
    pub name: String,
    pub lmp: f64,
    pub energy_component: f64,
    pub congestion_component: f64,
    pub congestion_contributions: Vec<CongestionContribution>,
    pub dispatch_mw: f64,
    pub capacity_mw: f64,
    pub cost_per_mwh: f64,
    pub demand_mw: f64,
    pub shedding_mw: f64,
    pub net_injection_mw: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineResult {
    pub id: LineId,
    pub label: String,
    pub from: String,
    pub to: String,
    pub flow_mw: f64,
    pub limit_mw: f64,
    /// |flow| / limit
    pub utilization: f64,
    pub shadow_price: f64,
    pub binding: bool,
    pub generator_flows: Vec<GeneratorFlow>,
}

impl LineResult {
    /// Node the power actually leaves from.
    pub fn sending_end(&self) -> &str {
        if self.flow_mw >= 0.0 {
            &self.from
        } else {
            &self.to
        }
    }
}

/// Everything the presentation layer needs, fully populated on success.
#[derive(Debug, Clone, Serialize)]
pub struct MarketResult {
    pub method: OpfMethod,
    pub status: SystemStatus,
    pub total_cost: f64,
    /// λ, the energy component common to every node
    pub energy_price: f64,
    /// DC-OPF cost minus merit-order cost, when both were computed
    pub congestion_cost: Option<f64>,
    /// Merchandising surplus, −Σ μ·flow
    pub congestion_rent: f64,
    /// Σ LMP·(g + s − d) + congestion rent, ≈ 0
    pub revenue_residual: f64,
    /// Lines at or above the active-constraint utilization threshold
    pub active_constraints: usize,
    pub total_generation_mw: f64,
    pub total_demand_mw: f64,
    pub total_shedding_mw: f64,
    pub nodes: Vec<NodeResult>,
    pub lines: Vec<LineResult>,
    pub ptdf: PtdfMatrix,
    pub iterations: usize,
    pub solve_time_ms: u128,
}

impl MarketResult {
    pub fn node(&self, name: &str) -> Option<&NodeResult> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn line(&self, label: &str) -> Option<&LineResult> {
        self.lines.iter().find(|l| l.label == label)
    }

    /// LMP per node in ID order.
    pub fn lmps(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.lmp).collect()
    }

    pub fn flows(&self) -> Vec<f64> {
        self.lines.iter().map(|l| l.flow_mw).collect()
    }

    /// Highest minus lowest LMP.
    pub fn price_spread(&self) -> f64 {
        let max = self.nodes.iter().map(|n| n.lmp).fold(f64::NEG_INFINITY, f64::max);
        let min = self.nodes.iter().map(|n| n.lmp).fold(f64::INFINITY, f64::min);
        if self.nodes.is_empty() {
            0.0
        } else {
            max - min
        }
    }
}
