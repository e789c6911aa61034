//! Assemble a [`MarketResult`] from a dispatch solution.

use lmp_core::{LineId, Network};

use super::flow_tracing::trace_generator_flows;
use super::lmp::{congestion_rent, decompose, revenue_residual};
use super::types::{
    CongestionContribution, DispatchSolution, GeneratorFlow, LineResult, MarketResult,
    NodeResult, SystemStatus,
};
use crate::sparse::PtdfMatrix;

/// Utilization at which a line counts as an active constraint.
pub const DEFAULT_ACTIVE_THRESHOLD: f64 = 0.95;

/// Shedding above this (MW) flags the system as in scarcity.
pub const SCARCITY_THRESHOLD_MW: f64 = 0.1;

/// Combine dispatch, prices and flow attribution into one report.
pub fn market_result(
    network: &Network,
    ptdf: &PtdfMatrix,
    solution: &DispatchSolution,
    congestion_cost: Option<f64>,
    active_threshold: f64,
) -> MarketResult {
    let demand = network.demand_vector();
    let injections = solution.net_injections(&demand);
    let components = decompose(solution.lambda, &solution.mu, ptdf);
    let lmps: Vec<f64> = components.iter().map(|c| c.lmp).collect();
    let line_labels: Vec<String> = network.lines().map(|l| l.name.clone()).collect();
    let node_names: Vec<String> = network.nodes().map(|n| n.name.clone()).collect();

    let nodes = network
        .nodes()
        .zip(components)
        .map(|(node, parts)| {
            let n = node.id.value();
            NodeResult {
                id: node.id,
                name: node.name.clone(),
                lmp: parts.lmp,
                energy_component: parts.energy,
                congestion_component: parts.congestion,
                congestion_contributions: parts
                    .line_contributions
                    .into_iter()
                    .map(|(l, value)| CongestionContribution {
                        line: LineId::new(l),
                        label: line_labels[l].clone(),
                        value,
                    })
                    .collect(),
                dispatch_mw: solution.dispatch[n],
                capacity_mw: node.offer.capacity_mw,
                cost_per_mwh: node.offer.cost_per_mwh,
                demand_mw: node.demand_mw,
                shedding_mw: solution.shedding[n],
                net_injection_mw: injections[n],
            }
        })
        .collect();

    let traced = trace_generator_flows(&solution.dispatch, &demand, ptdf);
    let lines: Vec<LineResult> = network
        .lines()
        .map(|line| {
            let l = line.id.value();
            let flow = solution.flows[l];
            let binding = solution.mu[l] != 0.0;
            // A priced zero-limit line is fully used even at zero flow
            let utilization = if binding && line.capacity_mw == 0.0 {
                1.0
            } else {
                line.utilization(flow)
            };
            LineResult {
                id: line.id,
                label: line.name.clone(),
                from: node_names[line.from.value()].clone(),
                to: node_names[line.to.value()].clone(),
                flow_mw: flow,
                limit_mw: line.capacity_mw,
                utilization,
                shadow_price: solution.mu[l],
                binding,
                generator_flows: traced
                    .iter()
                    .filter(|t| t.line == l)
                    .map(|t| GeneratorFlow {
                        generator: node_names[t.generator].clone(),
                        flow_mw: t.flow_mw,
                    })
                    .collect(),
            }
        })
        .collect();

    let active_constraints = lines
        .iter()
        .filter(|l| l.utilization >= active_threshold)
        .count();
    let total_shedding = solution.total_shedding();
    let status = if total_shedding > SCARCITY_THRESHOLD_MW {
        SystemStatus::Scarcity
    } else {
        SystemStatus::Healthy
    };

    MarketResult {
        method: solution.method,
        status,
        total_cost: solution.total_cost,
        energy_price: solution.lambda,
        congestion_cost,
        congestion_rent: congestion_rent(&solution.mu, &solution.flows),
        revenue_residual: revenue_residual(&lmps, &injections, &solution.mu, &solution.flows),
        active_constraints,
        total_generation_mw: solution.total_generation(),
        total_demand_mw: demand.iter().sum(),
        total_shedding_mw: total_shedding,
        nodes,
        lines,
        ptdf: ptdf.clone(),
        iterations: solution.iterations,
        solve_time_ms: solution.solve_time_ms,
    }
}
