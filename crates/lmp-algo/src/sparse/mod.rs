//! Network Model Builder: susceptance matrix, generalized inverse and PTDF.
//!
//! ```text
//! topology ──► B (Laplacian) ──► B̂ = B without slack ──► X̂ = B̂⁻¹ padded ──► PTDF
//! ```
//!
//! The model depends on topology and slack choice only. Offers, demand and line
//! limits can change freely without rebuilding it.

pub mod sensitivity;
pub mod susceptance;

pub use sensitivity::{compute_ptdf, generalized_inverse, PtdfMatrix, INVERSE_RESIDUAL_LIMIT};
pub use susceptance::{LineTerminals, SusceptanceMatrix};

use lmp_core::{find_islands, Network, NodeId};
use thiserror::Error;

/// Failures while building the electrical model of a network.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("network is disconnected into {islands} islands: {detail}")]
    DisconnectedNetwork { islands: usize, detail: String },

    #[error("network needs at least 2 nodes, found {0}")]
    TooFewNodes(usize),

    #[error("line {line} has invalid reactance {reactance} (must be finite and > 0)")]
    InvalidReactance { line: String, reactance: f64 },

    #[error("line {line} references unknown node index {node}")]
    UnknownNode { line: String, node: usize },

    #[error("slack index {0} is out of range")]
    InvalidSlack(usize),

    #[error("reduced susceptance matrix is singular: {0}")]
    SingularMatrix(String),

    #[error("reduced susceptance matrix is ill-conditioned (inverse residual {residual:.3e})")]
    IllConditioned { residual: f64 },
}

impl ModelError {
    /// Numerical failure of the inversion, as opposed to bad topology or data.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            ModelError::SingularMatrix(_) | ModelError::IllConditioned { .. }
        )
    }
}

/// Electrical model of one topology: B, X̂ and PTDF for a fixed slack.
///
/// Immutable once built; share it read-only across solves on the same topology.
#[derive(Debug, Clone)]
pub struct NetworkModel {
    susceptance: SusceptanceMatrix,
    x_hat: Vec<Vec<f64>>,
    ptdf: PtdfMatrix,
}

impl NetworkModel {
    pub fn build(network: &Network, slack: NodeId) -> Result<Self, ModelError> {
        let susceptance = SusceptanceMatrix::from_network(network, slack)?;

        let islands = find_islands(network);
        if islands.len() > 1 {
            let detail = islands
                .iter()
                .map(|island| {
                    let names: Vec<&str> = island
                        .nodes
                        .iter()
                        .filter_map(|id| network.node(*id).map(|n| n.name.as_str()))
                        .collect();
                    format!("{{{}}}", names.join(", "))
                })
                .collect::<Vec<_>>()
                .join(" ");
            return Err(ModelError::DisconnectedNetwork {
                islands: islands.len(),
                detail,
            });
        }

        let x_hat = generalized_inverse(&susceptance)?;
        let ptdf = compute_ptdf(network, &susceptance, &x_hat);

        tracing::debug!(
            nodes = susceptance.n_nodes(),
            lines = ptdf.num_lines(),
            slack = slack.value(),
            "built network model"
        );

        Ok(Self {
            susceptance,
            x_hat,
            ptdf,
        })
    }

    pub fn susceptance(&self) -> &SusceptanceMatrix {
        &self.susceptance
    }

    /// Generalized inverse of B (zero slack row and column).
    pub fn x_hat(&self) -> &[Vec<f64>] {
        &self.x_hat
    }

    pub fn ptdf(&self) -> &PtdfMatrix {
        &self.ptdf
    }

    pub fn slack(&self) -> NodeId {
        self.ptdf.slack
    }

    pub fn node_count(&self) -> usize {
        self.susceptance.n_nodes()
    }

    pub fn line_count(&self) -> usize {
        self.ptdf.num_lines()
    }

    /// Voltage angles (radians) for net injections: θ = X̂·P, θ_slack = 0.
    pub fn angles(&self, injections: &[f64]) -> Vec<f64> {
        assert_eq!(injections.len(), self.node_count(), "injection vector length");
        self.x_hat
            .iter()
            .map(|row| row.iter().zip(injections).map(|(x, p)| x * p).sum())
            .collect()
    }

    /// True when `network` still has the topology this model was built from.
    pub fn matches_topology(&self, network: &Network) -> bool {
        network.node_count() == self.node_count()
            && network.line_count() == self.line_count()
            && network
                .lines()
                .zip(self.susceptance.lines())
                .all(|(line, t)| {
                    line.from.value() == t.from
                        && line.to.value() == t.to
                        && line.susceptance() == t.susceptance
                })
    }
}

/// Build B and PTDF for `network` referenced to `slack`.
///
/// Checks run in order: node count, slack index, reactances and endpoints,
/// connectivity, then the inversion itself.
pub fn build_model(
    network: &Network,
    slack: NodeId,
) -> Result<(SusceptanceMatrix, PtdfMatrix), ModelError> {
    let model = NetworkModel::build(network, slack)?;
    Ok((model.susceptance, model.ptdf))
}
