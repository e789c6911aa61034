//! LMP Engine: nodal prices from the energy price and line shadow prices.
//!
//! ```text
//! LMP_n = λ + Σ_l μ_l · PTDF[l,n]
//! ```
//!
//! The slack node's PTDF column is zero, so its LMP always equals λ.

use serde::Serialize;

use crate::sparse::PtdfMatrix;

/// Per-line congestion contributions smaller than this are not itemized.
pub const CONTRIBUTION_THRESHOLD: f64 = 0.001;

/// LMP of one node split into its components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LmpComponents {
    pub lmp: f64,
    pub energy: f64,
    pub congestion: f64,
    /// (line index, μ_l·PTDF[l,n]) for contributions above the threshold
    pub line_contributions: Vec<(usize, f64)>,
}

/// One price per node.
///
/// # Panics
///
/// If `mu` does not have one entry per PTDF row.
pub fn compute_lmps(lambda: f64, mu: &[f64], ptdf: &PtdfMatrix) -> Vec<f64> {
    assert_eq!(mu.len(), ptdf.num_lines(), "one shadow price per line");
    (0..ptdf.num_nodes())
        .map(|n| {
            lambda
                + mu
                    .iter()
                    .enumerate()
                    .map(|(l, m)| m * ptdf.get_by_idx(l, n))
                    .sum::<f64>()
        })
        .collect()
}

/// Energy / congestion decomposition per node.
pub fn decompose(lambda: f64, mu: &[f64], ptdf: &PtdfMatrix) -> Vec<LmpComponents> {
    assert_eq!(mu.len(), ptdf.num_lines(), "one shadow price per line");
    (0..ptdf.num_nodes())
        .map(|n| {
            let mut congestion = 0.0;
            let mut line_contributions = Vec::new();
            for (l, m) in mu.iter().enumerate() {
                let contribution = m * ptdf.get_by_idx(l, n);
                congestion += contribution;
                if contribution.abs() > CONTRIBUTION_THRESHOLD {
                    line_contributions.push((l, contribution));
                }
            }
            LmpComponents {
                lmp: lambda + congestion,
                energy: lambda,
                congestion,
                line_contributions,
            }
        })
        .collect()
}

/// Merchandising surplus collected by the grid: Σ LMP·d − Σ LMP·g = −Σ μ_l·flow_l.
pub fn congestion_rent(mu: &[f64], flows: &[f64]) -> f64 {
    -mu.iter().zip(flows).map(|(m, f)| m * f).sum::<f64>()
}

/// Σ LMP_n·(g_n − d_n) − Σ μ_l·flow_l; zero up to solver accuracy.
pub fn revenue_residual(lmps: &[f64], injections: &[f64], mu: &[f64], flows: &[f64]) -> f64 {
    let nodal: f64 = lmps.iter().zip(injections).map(|(p, q)| p * q).sum();
    nodal + congestion_rent(mu, flows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::build_model;
    use crate::test_utils::{three_node_mesh, two_node_congested};
    use lmp_core::NodeId;

    #[test]
    fn test_uniform_without_congestion() {
        let (_, ptdf) = build_model(&three_node_mesh(), NodeId::new(0)).unwrap();
        let lmps = compute_lmps(25.0, &[0.0, 0.0, 0.0], &ptdf);
        assert_eq!(lmps, vec![25.0, 25.0, 25.0]);
    }

    #[test]
    fn test_two_node_gap() {
        let (_, ptdf) = build_model(&two_node_congested(), NodeId::new(0)).unwrap();
        let lmps = compute_lmps(10.0, &[-40.0], &ptdf);
        assert!((lmps[0] - 10.0).abs() < 1e-12);
        assert!((lmps[1] - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_decomposition_itemizes_lines() {
        let (_, ptdf) = build_model(&three_node_mesh(), NodeId::new(0)).unwrap();
        let parts = decompose(20.0, &[0.0, 0.0, -30.0], &ptdf);

        assert!(parts[0].line_contributions.is_empty(), "slack has no congestion");
        let c = &parts[2];
        assert_eq!(c.energy, 20.0);
        assert_eq!(c.line_contributions.len(), 1);
        assert_eq!(c.line_contributions[0].0, 2);
        assert!((c.lmp - (c.energy + c.congestion)).abs() < 1e-12);
        assert_eq!(compute_lmps(20.0, &[0.0, 0.0, -30.0], &ptdf)[2], c.lmp);
    }

    #[test]
    fn test_revenue_residual_zero_for_consistent_prices() {
        let (_, ptdf) = build_model(&two_node_congested(), NodeId::new(0)).unwrap();
        let mu = [-40.0];
        let lmps = compute_lmps(10.0, &mu, &ptdf);
        let injections = [100.0, -100.0];
        let flows = ptdf.flows(&injections);
        assert!((congestion_rent(&mu, &flows) - 4000.0).abs() < 1e-9);
        assert!(revenue_residual(&lmps, &injections, &mu, &flows).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "one shadow price per line")]
    fn test_dimension_mismatch_panics() {
        let (_, ptdf) = build_model(&three_node_mesh(), NodeId::new(0)).unwrap();
        compute_lmps(0.0, &[0.0], &ptdf);
    }
}
