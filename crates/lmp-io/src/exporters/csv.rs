//! CSV tables for market results, PTDF matrices and sweeps.
//!
//! | File | One row per |
//! |------|-------------|
//! | `nodes.csv` | node: LMP and its components, dispatch, demand, shedding |
//! | `lines.csv` | line: flow, limit, utilization, shadow price |
//! | PTDF | line, one column per node |
//! | sweep | parameter value, then one column per node LMP and per line flow |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;
use lmp_algo::opf::sweep::ParameterSweep;
use lmp_algo::{MarketResult, PtdfMatrix};
use lmp_core::Network;
use serde::Serialize;

#[derive(Serialize)]
struct NodeRow<'a> {
    node: &'a str,
    lmp: f64,
    energy: f64,
    congestion: f64,
    dispatch_mw: f64,
    capacity_mw: f64,
    cost_per_mwh: f64,
    demand_mw: f64,
    shedding_mw: f64,
    net_injection_mw: f64,
}

#[derive(Serialize)]
struct LineRow<'a> {
    line: &'a str,
    from: &'a str,
    to: &'a str,
    flow_mw: f64,
    limit_mw: f64,
    utilization: f64,
    shadow_price: f64,
    binding: bool,
}

fn writer(path: &Path) -> Result<Writer<std::fs::File>> {
    Writer::from_path(path).with_context(|| format!("creating CSV writer for {}", path.display()))
}

pub fn write_nodes_csv(result: &MarketResult, path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;
    for node in &result.nodes {
        wtr.serialize(NodeRow {
            node: &node.name,
            lmp: node.lmp,
            energy: node.energy_component,
            congestion: node.congestion_component,
            dispatch_mw: node.dispatch_mw,
            capacity_mw: node.capacity_mw,
            cost_per_mwh: node.cost_per_mwh,
            demand_mw: node.demand_mw,
            shedding_mw: node.shedding_mw,
            net_injection_mw: node.net_injection_mw,
        })
        .context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

pub fn write_lines_csv(result: &MarketResult, path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;
    for line in &result.lines {
        wtr.serialize(LineRow {
            line: &line.label,
            from: &line.from,
            to: &line.to,
            flow_mw: line.flow_mw,
            limit_mw: line.limit_mw,
            utilization: line.utilization,
            shadow_price: line.shadow_price,
            binding: line.binding,
        })
        .context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

/// Write `nodes.csv` and `lines.csv` into `dir`, creating it if needed.
pub fn write_market_csv(result: &MarketResult, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let nodes = dir.join("nodes.csv");
    let lines = dir.join("lines.csv");
    write_nodes_csv(result, &nodes)?;
    write_lines_csv(result, &lines)?;
    Ok(vec![nodes, lines])
}

/// PTDF as a table: `line, <node>...`.
pub fn write_ptdf_csv(ptdf: &PtdfMatrix, network: &Network, path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;

    let mut header = vec!["line".to_string()];
    header.extend(ptdf.node_ids.iter().map(|id| node_name(network, *id)));
    wtr.write_record(&header).context("writing CSV header")?;

    for (idx, line_id) in ptdf.line_ids.iter().enumerate() {
        let label = network
            .line(*line_id)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| line_id.to_string());
        let mut record = vec![label];
        record.extend(ptdf.row(idx).iter().map(|v| v.to_string()));
        wtr.write_record(&record).context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

/// One row per sweep point. Failed points keep their value and status with
/// empty price and flow cells.
pub fn write_sweep_csv(sweep: &ParameterSweep, path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;

    let mut header: Vec<String> = ["value", "status", "total_cost", "energy_price", "shedding_mw"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(sweep.node_names.iter().map(|n| format!("lmp_{n}")));
    header.extend(sweep.line_labels.iter().map(|l| format!("flow_{l}")));
    wtr.write_record(&header).context("writing CSV header")?;

    let width = sweep.node_names.len() + sweep.line_labels.len();
    for point in &sweep.points {
        let status = match (&point.infeasibility, &point.error) {
            (_, None) => "ok".to_string(),
            (Some(reason), _) => reason.to_string(),
            (None, Some(_)) => "error".to_string(),
        };
        let mut record = vec![
            point.value.to_string(),
            status,
            optional(point.total_cost),
            optional(point.energy_price),
            point.shedding_mw.to_string(),
        ];
        if point.is_feasible() {
            record.extend(point.lmps.iter().chain(&point.flows).map(|v| v.to_string()));
        } else {
            record.extend(std::iter::repeat(String::new()).take(width));
        }
        wtr.write_record(&record).context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn node_name(network: &Network, id: lmp_core::NodeId) -> String {
    network
        .node(id)
        .map(|n| n.name.clone())
        .unwrap_or_else(|| id.to_string())
}
