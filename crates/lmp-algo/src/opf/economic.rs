//! Merit-order economic dispatch
//!
//! Copper-plate reference: generators are loaded in order of marginal cost
//! until demand is met, ignoring line limits. Flows are still reported (through
//! the PTDF) and may exceed limits.

use lmp_core::Network;
use web_time::Instant;

use super::types::{DispatchError, DispatchSolution, InfeasibilityReason, OpfMethod};
use crate::sparse::PtdfMatrix;

/// Output below this counts as "not dispatched" when picking the marginal unit.
const DISPATCH_EPS: f64 = 0.01;

/// Solve using merit-order economic dispatch.
///
/// With `value_of_lost_load` set, demand beyond total capacity is shed pro rata
/// to each node's demand and priced at VOLL.
pub fn dispatch(
    network: &Network,
    ptdf: &PtdfMatrix,
    value_of_lost_load: Option<f64>,
) -> Result<DispatchSolution, DispatchError> {
    let start = Instant::now();
    let demand = network.demand_vector();
    let total_demand: f64 = demand.iter().sum();
    let total_capacity = network.total_generation_capacity();

    if ptdf.num_nodes() != demand.len() {
        return Err(DispatchError::DimensionMismatch(format!(
            "PTDF has {} nodes, network has {}",
            ptdf.num_nodes(),
            demand.len()
        )));
    }

    let shortfall = (total_demand - total_capacity).max(0.0);
    if shortfall > 1e-6 && value_of_lost_load.is_none() {
        return Err(DispatchError::Infeasible(
            InfeasibilityReason::InsufficientCapacity,
        ));
    }

    let capacities: Vec<f64> = network.nodes().map(|n| n.offer.capacity_mw).collect();
    let costs: Vec<f64> = network.nodes().map(|n| n.offer.cost_per_mwh).collect();
    let generation = merit_order(&capacities, &costs, total_demand - shortfall);

    let shedding: Vec<f64> = if shortfall > 0.0 && total_demand > 0.0 {
        demand.iter().map(|d| shortfall * d / total_demand).collect()
    } else {
        vec![0.0; demand.len()]
    };

    let lambda = match value_of_lost_load {
        Some(voll) if shortfall > 1e-6 => voll,
        _ => marginal_cost(&generation, &capacities, &costs),
    };

    let total_cost = generation
        .iter()
        .zip(network.nodes())
        .map(|(&p, node)| node.offer.evaluate(p))
        .sum::<f64>()
        + value_of_lost_load.unwrap_or(0.0) * shortfall;

    let injections: Vec<f64> = generation
        .iter()
        .zip(&shedding)
        .zip(&demand)
        .map(|((g, s), d)| g + s - d)
        .collect();
    let flows = ptdf.flows(&injections);

    Ok(DispatchSolution {
        method: OpfMethod::MeritOrder,
        mu: vec![0.0; flows.len()],
        dispatch: generation,
        shedding,
        flows,
        total_cost,
        lambda,
        feasible: true,
        iterations: 1,
        solve_time_ms: start.elapsed().as_millis(),
    })
}

/// Load units cheapest-first until `required` MW are covered.
fn merit_order(capacities: &[f64], costs: &[f64], required: f64) -> Vec<f64> {
    let n = capacities.len();
    let mut dispatch = vec![0.0; n];

    // Ties keep node order
    let mut order: Vec<usize> = (0..n).filter(|&i| capacities[i] > 0.0).collect();
    order.sort_by(|&a, &b| costs[a].partial_cmp(&costs[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut remaining = required;
    for idx in order {
        if remaining <= 1e-9 {
            break;
        }
        let increment = remaining.min(capacities[idx]);
        dispatch[idx] = increment;
        remaining -= increment;
    }
    dispatch
}

/// Price of the next MW: the partially loaded unit, otherwise the most
/// expensive loaded unit, otherwise the cheapest available one.
pub(super) fn marginal_cost(generation: &[f64], capacities: &[f64], costs: &[f64]) -> f64 {
    let mut highest_loaded: Option<f64> = None;
    for i in 0..generation.len() {
        let g = generation[i];
        if g > DISPATCH_EPS && g < capacities[i] - DISPATCH_EPS {
            return costs[i];
        }
        if g > DISPATCH_EPS {
            highest_loaded = Some(highest_loaded.map_or(costs[i], |c| c.max(costs[i])));
        }
    }
    highest_loaded.unwrap_or_else(|| {
        (0..costs.len())
            .filter(|&i| capacities[i] > 0.0)
            .map(|i| costs[i])
            .reduce(f64::min)
            .unwrap_or(0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::NetworkModel;
    use crate::test_utils::{three_node_mesh, three_node_uncongested, two_node_congested};
    use lmp_core::NodeId;

    #[test]
    fn test_merit_order_stacks_cheapest_first() {
        let dispatch = merit_order(&[60.0, 200.0, 200.0], &[10.0, 20.0, 30.0], 100.0);
        assert_eq!(dispatch, vec![60.0, 40.0, 0.0]);
    }

    #[test]
    fn test_marginal_cost_prefers_partial_unit() {
        assert_eq!(marginal_cost(&[60.0, 40.0, 0.0], &[60.0, 200.0, 200.0], &[10.0, 20.0, 30.0]), 20.0);
        // Everything at full output: most expensive loaded unit sets the price
        assert_eq!(marginal_cost(&[60.0, 200.0], &[60.0, 200.0], &[10.0, 20.0]), 20.0);
        // Nothing loaded: cheapest available unit
        assert_eq!(marginal_cost(&[0.0, 0.0], &[60.0, 200.0], &[15.0, 12.0]), 12.0);
    }

    #[test]
    fn test_uncongested_case() {
        let network = three_node_uncongested();
        let model = NetworkModel::build(&network, NodeId::new(0)).unwrap();
        let solution = dispatch(&network, model.ptdf(), None).unwrap();
        assert_eq!(solution.method, OpfMethod::MeritOrder);
        assert!((solution.total_cost - 1400.0).abs() < 1e-9);
        assert_eq!(solution.lambda, 20.0);
    }

    #[test]
    fn test_ignores_line_limits() {
        let network = two_node_congested();
        let model = NetworkModel::build(&network, NodeId::new(0)).unwrap();
        let solution = dispatch(&network, model.ptdf(), None).unwrap();
        assert_eq!(solution.dispatch, vec![150.0, 0.0]);
        assert!((solution.flows[0] - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_shortfall_with_voll() {
        let mut network = three_node_mesh();
        network.set_demand(NodeId::new(2), 200.0).unwrap();
        let model = NetworkModel::build(&network, NodeId::new(0)).unwrap();

        assert!(dispatch(&network, model.ptdf(), None).is_err());

        let solution = dispatch(&network, model.ptdf(), Some(5000.0)).unwrap();
        assert!((solution.total_shedding() - 50.0).abs() < 1e-9);
        assert_eq!(solution.lambda, 5000.0);
    }
}
