use std::path::Path;

use anyhow::{bail, Result};
use lmp_core::{graph_stats, Diagnostics};
use lmp_io::importers::load_case;
use lmp_io::{validate_network, ValidationConfig};
use serde::Serialize;

use super::{output_format, print_json};
use lmp_cli::{LmpConfig, OutputFormat};

#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    case: &'a str,
    nodes: usize,
    lines: usize,
    total_capacity_mw: f64,
    total_demand_mw: f64,
    valid: bool,
    diagnostics: &'a Diagnostics,
}

pub fn handle(
    config: &LmpConfig,
    case_path: &Path,
    strict: bool,
    format: Option<OutputFormat>,
) -> Result<()> {
    let format = output_format(format, config)?;
    let mut result = load_case(case_path)?;
    let validation = ValidationConfig {
        strict,
        ..Default::default()
    };
    validate_network(&result.case.network, &mut result.diagnostics, &validation);

    let network = &result.case.network;
    let diagnostics = &result.diagnostics;
    match format {
        OutputFormat::Json => print_json(&ValidationReport {
            case: &result.case.name,
            nodes: network.node_count(),
            lines: network.line_count(),
            total_capacity_mw: network.total_generation_capacity(),
            total_demand_mw: network.total_demand(),
            valid: !diagnostics.has_errors(),
            diagnostics,
        })?,
        OutputFormat::Table => {
            let stats = graph_stats(network);
            println!("Case {}", result.case.name);
            println!("  Nodes         : {}", stats.node_count);
            println!("  Lines         : {}", stats.line_count);
            println!("  Components    : {}", stats.connected_components);
            println!(
                "  Degree [min/avg/max]: {}/{:.2}/{}",
                stats.min_degree, stats.avg_degree, stats.max_degree
            );
            println!(
                "  Capacity/Demand: {:.1} / {:.1} MW",
                network.total_generation_capacity(),
                network.total_demand()
            );
            for issue in &diagnostics.issues {
                println!("{issue}");
            }
            println!("{}", diagnostics.summary());
        }
    }

    if diagnostics.has_errors() {
        bail!("validation failed: {}", diagnostics.summary());
    }
    Ok(())
}
