//! Attribute line flows to individual generators.
//!
//! Each dispatched generator k serves a share `g_k / Σg` of every node's demand:
//! ```text
//! injection_k = g_k·e_k − (g_k / Σg)·d
//! flow_k      = PTDF · injection_k
//! ```
//! Superposition makes the per-generator flows sum to the actual line flows
//! (without load shedding).

use crate::sparse::PtdfMatrix;

/// Generators producing less than this are not traced.
pub const MIN_TRACED_OUTPUT_MW: f64 = 0.1;

/// Attributed flows smaller than this are dropped from reports.
pub const MIN_REPORTED_FLOW_MW: f64 = 0.05;

/// Flow caused by one generator on one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracedFlow {
    pub generator: usize,
    pub line: usize,
    pub flow_mw: f64,
}

/// Per-generator contributions to every line (unfiltered by size).
///
/// Returns `contributions[line][k]` paired with the traced generator indices.
pub fn generator_contributions(
    dispatch: &[f64],
    demand: &[f64],
    ptdf: &PtdfMatrix,
) -> (Vec<usize>, Vec<Vec<f64>>) {
    let total: f64 = dispatch.iter().sum();
    let generators: Vec<usize> = if total < MIN_TRACED_OUTPUT_MW {
        Vec::new()
    } else {
        (0..dispatch.len())
            .filter(|&n| dispatch[n] >= MIN_TRACED_OUTPUT_MW)
            .collect()
    };

    let mut contributions = vec![vec![0.0; generators.len()]; ptdf.num_lines()];
    for (k, &gen) in generators.iter().enumerate() {
        let share = dispatch[gen] / total;
        let mut injection: Vec<f64> = demand.iter().map(|d| -share * d).collect();
        injection[gen] += dispatch[gen];
        for (l, flow) in ptdf.flows(&injection).into_iter().enumerate() {
            contributions[l][k] = flow;
        }
    }
    (generators, contributions)
}

/// Significant per-generator flows, grouped by line in line order.
pub fn trace_generator_flows(dispatch: &[f64], demand: &[f64], ptdf: &PtdfMatrix) -> Vec<TracedFlow> {
    let (generators, contributions) = generator_contributions(dispatch, demand, ptdf);
    contributions
        .iter()
        .enumerate()
        .flat_map(|(line, row)| {
            generators
                .iter()
                .zip(row)
                .filter(|(_, flow)| flow.abs() > MIN_REPORTED_FLOW_MW)
                .map(move |(&generator, &flow_mw)| TracedFlow {
                    generator,
                    line,
                    flow_mw,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::build_model;
    use crate::test_utils::three_node_mesh;
    use lmp_core::NodeId;

    #[test]
    fn test_contributions_sum_to_flows() {
        let network = three_node_mesh();
        let (_, ptdf) = build_model(&network, NodeId::new(0)).unwrap();
        let dispatch = [100.0, 20.0, 0.0];
        let demand = network.demand_vector();

        let (generators, contributions) = generator_contributions(&dispatch, &demand, &ptdf);
        assert_eq!(generators, vec![0, 1]);

        let injections: Vec<f64> = dispatch.iter().zip(&demand).map(|(g, d)| g - d).collect();
        let flows = ptdf.flows(&injections);
        for (l, row) in contributions.iter().enumerate() {
            let total: f64 = row.iter().sum();
            assert!((total - flows[l]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_small_units_not_traced() {
        let network = three_node_mesh();
        let (_, ptdf) = build_model(&network, NodeId::new(0)).unwrap();
        let traced = trace_generator_flows(&[120.0, 0.05, 0.0], &network.demand_vector(), &ptdf);
        assert!(traced.iter().all(|t| t.generator == 0));
        assert!(!traced.is_empty());
    }

    #[test]
    fn test_no_generation_no_trace() {
        let network = three_node_mesh();
        let (_, ptdf) = build_model(&network, NodeId::new(0)).unwrap();
        assert!(trace_generator_flows(&[0.0, 0.0, 0.0], &[0.0; 3], &ptdf).is_empty());
    }
}
