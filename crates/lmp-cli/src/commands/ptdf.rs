use std::path::Path;

use anyhow::Result;
use lmp_algo::DispatchSolver;
use lmp_core::Network;
use lmp_io::exporters::write_ptdf_csv;
use serde::Serialize;
use tracing::info;

use super::{load_validated, output_format, print_json, render_table};
use lmp_algo::PtdfMatrix;
use lmp_cli::{LmpConfig, OutputFormat};

/// Named view of the matrix for JSON output.
#[derive(Debug, Serialize)]
struct PtdfView<'a> {
    slack: String,
    nodes: Vec<String>,
    lines: Vec<String>,
    values: &'a [Vec<f64>],
}

pub fn handle(
    config: &LmpConfig,
    case_path: &Path,
    slack: Option<&str>,
    format: Option<OutputFormat>,
    out: Option<&Path>,
) -> Result<()> {
    let case = load_validated(case_path, slack)?;
    let format = output_format(format, config)?;
    let model = DispatchSolver::new().build_model(&case.network)?;
    let ptdf = model.ptdf();

    if let Some(path) = out {
        write_ptdf_csv(ptdf, &case.network, path)?;
        info!("wrote {}", path.display());
    }

    match format {
        OutputFormat::Table => print!("{}", render_ptdf(ptdf, &case.network)?),
        OutputFormat::Json => print_json(&PtdfView {
            slack: node_name(&case.network, ptdf.slack.value()),
            nodes: case.network.nodes().map(|n| n.name.clone()).collect(),
            lines: case.network.lines().map(|l| l.name.clone()).collect(),
            values: &ptdf.values,
        })?,
    }
    Ok(())
}

fn render_ptdf(ptdf: &PtdfMatrix, network: &Network) -> Result<String> {
    let names: Vec<String> = network.nodes().map(|n| n.name.clone()).collect();
    let mut rows = vec![format!("Line\t{}", names.join("\t"))];
    for (idx, line) in network.lines().enumerate() {
        let cells: Vec<String> = ptdf.row(idx).iter().map(|v| format!("{v:.4}")).collect();
        rows.push(format!("{}\t{}", line.name, cells.join("\t")));
    }
    let mut text = format!(
        "PTDF (MW per MW injected, withdrawn at {})\n",
        node_name(network, ptdf.slack.value())
    );
    text.push_str(&render_table(&rows)?);
    Ok(text)
}

fn node_name(network: &Network, idx: usize) -> String {
    network
        .node(lmp_core::NodeId::new(idx))
        .map(|n| n.name.clone())
        .unwrap_or_default()
}
