//! Power Transfer Distribution Factors (PTDF).
//!
//! PTDF[ℓ,n] = flow on line ℓ caused by a 1 MW injection at node n withdrawn at
//! the slack:
//! ```text
//! ΔP_ℓ = PTDF[ℓ,n] × ΔP_injection_n
//! ```
//!
//! Computed from the generalized inverse X̂ of B (inverse of the slack-reduced
//! matrix, padded with a zero slack row and column):
//! ```text
//! PTDF[ℓ,n] = b_ℓ · (X̂[i,n] − X̂[j,n])      for line ℓ = (i → j)
//! ```
//! The slack column is identically zero.

use super::susceptance::SusceptanceMatrix;
use super::ModelError;
use faer::{prelude::*, Mat};
use lmp_core::{LineId, Network, NodeId};
use serde::Serialize;

/// Largest acceptable max-norm of `B̂·X̂ − I`.
pub const INVERSE_RESIDUAL_LIMIT: f64 = 1e-6;

/// PTDF matrix: sensitivity of line flows to node injections.
///
/// Dense storage: on a connected network nearly every line sees every injection.
#[derive(Debug, Clone, Serialize)]
pub struct PtdfMatrix {
    /// Row index → line ID
    pub line_ids: Vec<LineId>,
    /// Column index → node ID
    pub node_ids: Vec<NodeId>,
    /// Reference bus the factors are computed against
    pub slack: NodeId,
    /// values[line_idx][node_idx]
    pub values: Vec<Vec<f64>>,
}

impl PtdfMatrix {
    pub fn get(&self, line: LineId, node: NodeId) -> Option<f64> {
        self.values
            .get(line.value())
            .and_then(|row| row.get(node.value()))
            .copied()
    }

    /// Get PTDF by indices (zero when out of range)
    pub fn get_by_idx(&self, line_idx: usize, node_idx: usize) -> f64 {
        self.values
            .get(line_idx)
            .and_then(|row| row.get(node_idx))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, line_idx: usize) -> &[f64] {
        &self.values[line_idx]
    }

    pub fn num_lines(&self) -> usize {
        self.line_ids.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.node_ids.len()
    }

    /// Line flows for a vector of net injections (generation − demand).
    pub fn flows(&self, injections: &[f64]) -> Vec<f64> {
        assert_eq!(injections.len(), self.num_nodes(), "injection vector length");
        self.values
            .iter()
            .map(|row| row.iter().zip(injections).map(|(f, p)| f * p).sum())
            .collect()
    }

    /// Flow on `line_idx` for a 1 MW transfer from `source` to `sink`.
    pub fn transfer_factor(&self, line_idx: usize, source: usize, sink: usize) -> f64 {
        self.get_by_idx(line_idx, source) - self.get_by_idx(line_idx, sink)
    }
}

/// Generalized inverse X̂ of B: inverse of the slack-reduced matrix, with a
/// zero row and column re-inserted at the slack position.
pub fn generalized_inverse(b: &SusceptanceMatrix) -> Result<Vec<Vec<f64>>, ModelError> {
    let n = b.n_nodes();
    let slack = b.slack_idx();
    let reduced = b.reduced_dense();
    let m = reduced.len();

    let b_hat = Mat::from_fn(m, m, |i, j| reduced[i][j]);
    let identity = Mat::from_fn(m, m, |i, j| if i == j { 1.0 } else { 0.0 });

    // LU decomposition with partial pivoting
    let lu = b_hat.partial_piv_lu();
    let inv = lu.solve(&identity);

    let mut inverse = vec![vec![0.0; m]; m];
    for (i, row) in inverse.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = inv.read(i, j);
        }
    }
    if inverse.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ModelError::SingularMatrix(
            "LU factorization produced non-finite entries".into(),
        ));
    }

    let residual = inverse_residual(&reduced, &inverse);
    if residual > INVERSE_RESIDUAL_LIMIT {
        return Err(ModelError::IllConditioned { residual });
    }
    if residual > INVERSE_RESIDUAL_LIMIT * 1e-3 {
        tracing::warn!(residual, "susceptance inverse is poorly conditioned");
    }

    // Map reduced indices back to full indices; slack row/col stays zero
    let reduced_to_full: Vec<usize> = (0..n).filter(|&i| i != slack).collect();
    let mut x_hat = vec![vec![0.0; n]; n];
    for (ri, &fi) in reduced_to_full.iter().enumerate() {
        for (rj, &fj) in reduced_to_full.iter().enumerate() {
            x_hat[fi][fj] = inverse[ri][rj];
        }
    }
    Ok(x_hat)
}

/// Assemble PTDF from B's line terminals and the generalized inverse.
pub fn compute_ptdf(network: &Network, b: &SusceptanceMatrix, x_hat: &[Vec<f64>]) -> PtdfMatrix {
    let n = b.n_nodes();
    let values = b
        .lines()
        .iter()
        .map(|line| {
            (0..n)
                .map(|node| line.susceptance * (x_hat[line.from][node] - x_hat[line.to][node]))
                .collect()
        })
        .collect();

    PtdfMatrix {
        line_ids: network.lines().map(|l| l.id).collect(),
        node_ids: network.nodes().map(|n| n.id).collect(),
        slack: NodeId::new(b.slack_idx()),
        values,
    }
}

/// max |(A·X − I)[i,j]|
fn inverse_residual(a: &[Vec<f64>], x: &[Vec<f64>]) -> f64 {
    let m = a.len();
    let mut worst: f64 = 0.0;
    for i in 0..m {
        for j in 0..m {
            let product: f64 = (0..m).map(|k| a[i][k] * x[k][j]).sum();
            let target = if i == j { 1.0 } else { 0.0 };
            worst = worst.max((product - target).abs());
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{three_node_mesh, two_node_congested};

    fn ptdf_for(network: &Network, slack: usize) -> PtdfMatrix {
        let b = SusceptanceMatrix::from_network(network, NodeId::new(slack)).unwrap();
        let x_hat = generalized_inverse(&b).unwrap();
        compute_ptdf(network, &b, &x_hat)
    }

    #[test]
    fn test_ptdf_dimensions() {
        let ptdf = ptdf_for(&three_node_mesh(), 0);
        assert_eq!(ptdf.num_lines(), 3);
        assert_eq!(ptdf.num_nodes(), 3);
    }

    #[test]
    fn test_generalized_inverse_zero_slack() {
        let network = three_node_mesh();
        let b = SusceptanceMatrix::from_network(&network, NodeId::new(1)).unwrap();
        let x_hat = generalized_inverse(&b).unwrap();
        for k in 0..3 {
            assert_eq!(x_hat[1][k], 0.0);
            assert_eq!(x_hat[k][1], 0.0);
        }
    }

    #[test]
    fn test_ptdf_slack_column_zero() {
        for slack in 0..3 {
            let ptdf = ptdf_for(&three_node_mesh(), slack);
            for l in 0..ptdf.num_lines() {
                assert!(ptdf.get_by_idx(l, slack).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_two_node_single_line() {
        // Line A→B, slack A: injecting at B flows B→A, against the reference direction.
        let ptdf = ptdf_for(&two_node_congested(), 0);
        assert!((ptdf.get_by_idx(0, 1) + 1.0).abs() < 1e-12);

        // Slack B: injecting at A flows A→B.
        let ptdf = ptdf_for(&two_node_congested(), 1);
        assert!((ptdf.get_by_idx(0, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_three_node_split_by_reactance() {
        // Inject 1 MW at C, withdraw at A. Paths: A-C (x=0.2) and A-B-C (x=0.2).
        // Equal impedance: half the transfer on each path.
        let ptdf = ptdf_for(&three_node_mesh(), 0);
        let c = 2;
        // Line 2 is A→C; flow runs C→A, so negative.
        assert!((ptdf.get_by_idx(2, c) + 0.5).abs() < 1e-12);
        // Line 0 is A→B, line 1 is B→C; flow runs C→B→A.
        assert!((ptdf.get_by_idx(0, c) + 0.5).abs() < 1e-12);
        assert!((ptdf.get_by_idx(1, c) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_flows_conserve_at_each_node() {
        let network = three_node_mesh();
        let ptdf = ptdf_for(&network, 0);
        let injections = [-90.0, 30.0, 60.0];
        let flows = ptdf.flows(&injections);

        for node in network.nodes() {
            let mut net_out = 0.0;
            for line in network.lines() {
                let f = flows[line.id.value()];
                if line.from == node.id {
                    net_out += f;
                }
                if line.to == node.id {
                    net_out -= f;
                }
            }
            assert!((net_out - injections[node.id.value()]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_transfer_factor_is_slack_independent() {
        let network = three_node_mesh();
        let a = ptdf_for(&network, 0);
        let b = ptdf_for(&network, 2);
        for l in 0..3 {
            let ta = a.transfer_factor(l, 1, 2);
            let tb = b.transfer_factor(l, 1, 2);
            assert!((ta - tb).abs() < 1e-12);
        }
    }
}
