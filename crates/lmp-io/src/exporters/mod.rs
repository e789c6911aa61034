//! Result exporters: pretty JSON for whole results, CSV tables for
//! spreadsheets and plotting.

pub mod csv;
pub mod json;

pub use self::csv::{write_lines_csv, write_market_csv, write_nodes_csv, write_ptdf_csv, write_sweep_csv};
pub use json::{to_json_value, write_json};
