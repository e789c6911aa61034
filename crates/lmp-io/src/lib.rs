//! # lmp-io: Case Files and Result Export
//!
//! Reads transmission cases from TOML or JSON, checks them before they reach
//! the solver, and writes market results out as JSON or CSV.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lmp_algo::DispatchSolver;
//! use lmp_io::exporters::write_market_csv;
//! use lmp_io::helpers::{validate_network, ValidationConfig};
//! use lmp_io::importers::load_case;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut result = load_case("three_node.toml")?;
//!     validate_network(&result.case.network, &mut result.diagnostics, &ValidationConfig::default());
//!     if result.diagnostics.has_errors() {
//!         anyhow::bail!("{}", result.diagnostics);
//!     }
//!
//!     let market = DispatchSolver::new().solve(&result.case.network)?;
//!     write_market_csv(&market, std::path::Path::new("out"))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`importers`] - Case file layout, format detection, `load_case` / `save_case`
//! - [`helpers`] - Post-import validation into [`lmp_core::Diagnostics`]
//! - [`exporters`] - JSON and CSV writers for results, PTDF and sweeps
//!
//! ## Error Handling
//!
//! File-facing functions return [`anyhow::Result`] with the path in the error
//! context. Structural case problems surface as [`importers::CaseError`].

pub mod exporters;
pub mod helpers;
pub mod importers;

pub use helpers::{validate_network, ValidationConfig};
pub use importers::{load_case, save_case, Case, CaseFormat, ImportResult};
