//! Sparse susceptance matrix (B) for DC power flow.
//!
//! The B matrix relates bus angles to power injections under DC assumptions:
//! ```text
//! P = B × θ
//!
//! where:
//!   B[i,j] = -b_ij        for i ≠ j (off-diagonal = -susceptance)
//!   B[i,i] = Σ_k b_ik     for all k (diagonal = sum of connected susceptances)
//! ```
//!
//! B is a weighted graph Laplacian: symmetric, rows summing to zero, and singular
//! until the slack row and column are removed.

use super::ModelError;
use lmp_core::{Network, NodeId};
use sprs::{CsMat, TriMat};

/// Matrix indices and susceptance of one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTerminals {
    pub from: usize,
    pub to: usize,
    /// b = 1/x
    pub susceptance: f64,
}

/// Sparse B matrix in CSR format, ordered by node ID.
#[derive(Debug, Clone)]
pub struct SusceptanceMatrix {
    matrix: CsMat<f64>,
    /// Terminals per line, in line ID order
    lines: Vec<LineTerminals>,
    slack_idx: usize,
}

impl SusceptanceMatrix {
    /// Build B for `network`, referenced to `slack`.
    pub fn from_network(network: &Network, slack: NodeId) -> Result<Self, ModelError> {
        let n = network.node_count();
        if n < 2 {
            return Err(ModelError::TooFewNodes(n));
        }
        if slack.value() >= n {
            return Err(ModelError::InvalidSlack(slack.value()));
        }

        let mut triplets = TriMat::new((n, n));
        let mut lines = Vec::with_capacity(network.line_count());

        for line in network.lines() {
            if !(line.reactance.is_finite() && line.reactance > 0.0) {
                return Err(ModelError::InvalidReactance {
                    line: line.name.clone(),
                    reactance: line.reactance,
                });
            }
            let (i, j) = (line.from.value(), line.to.value());
            for node in [i, j] {
                if node >= n {
                    return Err(ModelError::UnknownNode {
                        line: line.name.clone(),
                        node,
                    });
                }
            }

            let b = line.susceptance();

            // Off-diagonal: B[i,j] = B[j,i] = -b
            triplets.add_triplet(i, j, -b);
            triplets.add_triplet(j, i, -b);

            // Diagonal: B[i,i] += b, B[j,j] += b
            triplets.add_triplet(i, i, b);
            triplets.add_triplet(j, j, b);

            lines.push(LineTerminals {
                from: i,
                to: j,
                susceptance: b,
            });
        }

        Ok(Self {
            matrix: triplets.to_csr(),
            lines,
            slack_idx: slack.value(),
        })
    }

    pub fn n_nodes(&self) -> usize {
        self.matrix.rows()
    }

    pub fn slack_idx(&self) -> usize {
        self.slack_idx
    }

    /// Terminal indices and susceptance per line.
    pub fn lines(&self) -> &[LineTerminals] {
        &self.lines
    }

    /// Sparse matrix view.
    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// Entry B[i,j] (zero where no line connects i and j).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix.get(i, j).copied().unwrap_or(0.0)
    }

    /// Full dense copy, `n × n`.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.n_nodes();
        let mut dense = vec![vec![0.0; n]; n];
        for (val, (i, j)) in self.matrix.iter() {
            dense[i][j] = *val;
        }
        dense
    }

    /// Dense B̂ with the slack row and column removed, `(n-1) × (n-1)`.
    pub fn reduced_dense(&self) -> Vec<Vec<f64>> {
        let n = self.n_nodes();
        let mut reduced = vec![vec![0.0; n - 1]; n - 1];
        for (val, (i, j)) in self.matrix.iter() {
            if i == self.slack_idx || j == self.slack_idx {
                continue;
            }
            reduced[self.reduced_index(i)][self.reduced_index(j)] = *val;
        }
        reduced
    }

    /// Injections from angles: P = B·θ.
    pub fn multiply(&self, theta: &[f64]) -> Vec<f64> {
        assert_eq!(theta.len(), self.n_nodes(), "angle vector length");
        self.matrix
            .outer_iterator()
            .map(|row| row.iter().map(|(j, &b)| b * theta[j]).sum())
            .collect()
    }

    /// Position of full index `i` once the slack is removed.
    fn reduced_index(&self, i: usize) -> usize {
        if i > self.slack_idx {
            i - 1
        } else {
            i
        }
    }
}
