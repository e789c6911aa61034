//! Dispatch and pricing
//!
//! This module provides the market-clearing pipeline on top of the network model:
//! - DC-OPF (PTDF line limits, LMPs from LP duals)
//! - Merit-order economic dispatch (copper plate reference)
//! - LMP decomposition, generator flow attribution, parameter sweeps

mod dc_opf;
mod economic;
pub mod flow_tracing;
pub mod lmp;
mod market;
pub mod sweep;
mod types;

pub use dc_opf::{dispatch, DispatchOptions};
pub use lmp::{compute_lmps, congestion_rent, decompose, revenue_residual, LmpComponents};
pub use market::{market_result, DEFAULT_ACTIVE_THRESHOLD, SCARCITY_THRESHOLD_MW};
pub use types::{
    CongestionContribution, DispatchError, DispatchSolution, GeneratorFlow, InfeasibilityReason,
    LineResult, MarketResult, NodeResult, OpfError, OpfMethod, SystemStatus,
};

use crate::sparse::NetworkModel;
use lmp_core::{Network, NodeId};

/// Market-clearing solver. Configuration travels with the solver value;
/// nothing is kept between solves.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSolver {
    method: OpfMethod,
    slack: Option<NodeId>,
    value_of_lost_load: Option<f64>,
    max_iterations: u32,
    binding_tolerance: f64,
    active_threshold: f64,
}

impl Default for DispatchSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchSolver {
    /// DC-OPF, network's own slack, no load shedding.
    pub fn new() -> Self {
        let options = DispatchOptions::default();
        Self {
            method: OpfMethod::default(),
            slack: None,
            value_of_lost_load: options.value_of_lost_load,
            max_iterations: options.max_iterations,
            binding_tolerance: options.binding_tolerance,
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
        }
    }

    pub fn with_method(mut self, method: OpfMethod) -> Self {
        self.method = method;
        self
    }

    /// Reference bus, overriding the network's own choice
    pub fn with_slack(mut self, slack: NodeId) -> Self {
        self.slack = Some(slack);
        self
    }

    /// Enable load shedding priced at `voll` (currency/MWh)
    pub fn with_value_of_lost_load(mut self, voll: f64) -> Self {
        self.value_of_lost_load = Some(voll);
        self
    }

    pub fn with_max_iterations(mut self, max_iter: u32) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_binding_tolerance(mut self, tol: f64) -> Self {
        self.binding_tolerance = tol;
        self
    }

    /// Utilization at which a line counts towards `active_constraints`
    pub fn with_active_threshold(mut self, threshold: f64) -> Self {
        self.active_threshold = threshold;
        self
    }

    pub fn method(&self) -> OpfMethod {
        self.method
    }

    /// Slack used for `network`.
    pub fn slack_for(&self, network: &Network) -> NodeId {
        self.slack.unwrap_or_else(|| network.slack())
    }

    pub fn options(&self) -> DispatchOptions {
        DispatchOptions {
            value_of_lost_load: self.value_of_lost_load,
            max_iterations: self.max_iterations,
            binding_tolerance: self.binding_tolerance,
        }
    }

    fn validate(&self) -> Result<(), OpfError> {
        if let Some(voll) = self.value_of_lost_load {
            if !(voll.is_finite() && voll > 0.0) {
                return Err(OpfError::Config(format!(
                    "value of lost load must be positive, got {voll}"
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(OpfError::Config("max_iterations must be at least 1".into()));
        }
        if !(self.binding_tolerance >= 0.0 && self.binding_tolerance.is_finite()) {
            return Err(OpfError::Config(format!(
                "binding tolerance must be non-negative, got {}",
                self.binding_tolerance
            )));
        }
        Ok(())
    }

    /// Build the electrical model this solver would use for `network`.
    pub fn build_model(&self, network: &Network) -> Result<NetworkModel, OpfError> {
        Ok(NetworkModel::build(network, self.slack_for(network))?)
    }

    /// Build the model, dispatch and price.
    pub fn solve(&self, network: &Network) -> Result<MarketResult, OpfError> {
        let model = self.build_model(network)?;
        self.solve_with_model(network, &model)
    }

    /// Dispatch and price against a prebuilt model of the same topology and slack.
    pub fn solve_with_model(
        &self,
        network: &Network,
        model: &NetworkModel,
    ) -> Result<MarketResult, OpfError> {
        let solution = self.dispatch(network, model)?;

        let congestion_cost = match self.method {
            OpfMethod::DcOpf => economic::dispatch(network, model.ptdf(), self.value_of_lost_load)
                .ok()
                .map(|merit| solution.total_cost - merit.total_cost),
            OpfMethod::MeritOrder => None,
        };

        let result = market_result(
            network,
            model.ptdf(),
            &solution,
            congestion_cost,
            self.active_threshold,
        );
        if result.revenue_residual.abs() > 1e-3 * (1.0 + result.total_cost.abs()) {
            tracing::warn!(
                residual = result.revenue_residual,
                "revenue identity not satisfied to tolerance"
            );
        }
        Ok(result)
    }

    /// Raw dispatch solution without the market report.
    pub fn dispatch(
        &self,
        network: &Network,
        model: &NetworkModel,
    ) -> Result<DispatchSolution, OpfError> {
        self.validate()?;
        if !model.matches_topology(network) {
            return Err(OpfError::Config(
                "network model was built for a different topology".into(),
            ));
        }
        let slack = self.slack_for(network);
        if model.slack() != slack {
            return Err(OpfError::Config(format!(
                "network model is referenced to {}, solver expects {}",
                model.slack(),
                slack
            )));
        }
        let solution = match self.method {
            OpfMethod::DcOpf => dc_opf::dispatch(network, model.ptdf(), &self.options())?,
            OpfMethod::MeritOrder => {
                economic::dispatch(network, model.ptdf(), self.value_of_lost_load)?
            }
        };
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{three_node_mesh, two_node_congested};

    #[test]
    fn test_builder_options() {
        let solver = DispatchSolver::new()
            .with_value_of_lost_load(5000.0)
            .with_max_iterations(50)
            .with_binding_tolerance(1e-4);
        let options = solver.options();
        assert_eq!(options.value_of_lost_load, Some(5000.0));
        assert_eq!(options.max_iterations, 50);
        assert_eq!(solver.method(), OpfMethod::DcOpf);
    }

    #[test]
    fn test_rejects_bad_voll() {
        let err = DispatchSolver::new()
            .with_value_of_lost_load(-1.0)
            .solve(&two_node_congested())
            .unwrap_err();
        assert!(matches!(err, OpfError::Config(_)));
    }

    #[test]
    fn test_stale_model_rejected() {
        let network = three_node_mesh();
        let solver = DispatchSolver::new();
        let model = solver.build_model(&network).unwrap();

        let mut edited = network.clone();
        edited.set_line_length(lmp_core::LineId::new(0), 500.0).unwrap();
        assert!(matches!(
            solver.solve_with_model(&edited, &model),
            Err(OpfError::Config(_))
        ));
    }

    #[test]
    fn test_model_with_other_slack_rejected() {
        let network = three_node_mesh();
        let model = DispatchSolver::new()
            .with_slack(NodeId::new(1))
            .build_model(&network)
            .unwrap();

        let err = DispatchSolver::new()
            .solve_with_model(&network, &model)
            .unwrap_err();
        assert!(matches!(err, OpfError::Config(ref msg) if msg.contains("referenced to")));

        let result = DispatchSolver::new()
            .with_slack(NodeId::new(1))
            .solve_with_model(&network, &model);
        assert!(result.is_ok());
    }

    #[test]
    fn test_congestion_cost_against_merit_order() {
        let result = DispatchSolver::new().solve(&two_node_congested()).unwrap();
        // DC: 100·10 + 50·50 = 3500, merit: 150·10 = 1500
        let congestion_cost = result.congestion_cost.unwrap();
        assert!((congestion_cost - 2000.0).abs() < 1e-2);
        assert_eq!(result.active_constraints, 1);
    }
}
