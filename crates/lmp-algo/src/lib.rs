//! # lmp-algo: Nodal Market Clearing on a DC Network
//!
//! Economic dispatch with transmission limits and Locational Marginal Prices,
//! in three stages that run strictly forward:
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Network Model Builder | [`sparse`] | B matrix, generalized inverse, PTDF |
//! | Dispatch Optimizer | [`opf::dispatch`] | generation, flows, λ, μ |
//! | LMP Engine | [`opf::compute_lmps`] | one price per node |
//!
//! The [`DispatchSolver`] chains them and returns a fully populated
//! [`MarketResult`]. The network model depends only on topology and slack, so it
//! can be built once and shared read-only across solves (see [`opf::sweep`]).
//!
//! ## Dispatch methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`OpfMethod::DcOpf`] | LP with PTDF line limits, solved with Clarabel; prices from duals |
//! | [`OpfMethod::MeritOrder`] | Copper-plate merit order, used as a reference |
//!
//! ## Example
//!
//! ```no_run
//! use lmp_algo::{DispatchSolver, OpfError};
//! use lmp_core::{Network, Offer};
//!
//! let mut network = Network::new();
//! let a = network.add_node("A", Offer::new(500.0, 10.0), 0.0);
//! let b = network.add_node("B", Offer::new(500.0, 50.0), 150.0);
//! network.add_line(a, b, 0.1, 100.0).unwrap();
//!
//! let result = DispatchSolver::new().solve(&network)?;
//! for node in &result.nodes {
//!     println!("{}: {:.2} /MWh", node.name, node.lmp);
//! }
//! # Ok::<(), OpfError>(())
//! ```

pub mod opf;
pub mod sparse;
pub mod test_utils;

pub use opf::{
    compute_lmps, dispatch, DispatchError, DispatchOptions, DispatchSolution, DispatchSolver,
    InfeasibilityReason, LineResult, MarketResult, NodeResult, OpfError, OpfMethod, SystemStatus,
};
pub use sparse::{build_model, ModelError, NetworkModel, PtdfMatrix, SusceptanceMatrix};
