pub mod ptdf;
pub mod solve;
pub mod sweep;
pub mod validate;

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use lmp_algo::{DispatchSolver, OpfMethod};
use lmp_io::importers::{load_case, Case};
use lmp_io::{validate_network, ValidationConfig};
use rayon::ThreadPoolBuilder;
use tabwriter::TabWriter;
use tracing::warn;

use lmp_cli::{LmpConfig, OutputFormat};

/// Load a case, apply a slack override and refuse it if validation finds errors.
pub fn load_validated(path: &Path, slack: Option<&str>) -> Result<Case> {
    let mut result = load_case(path)?;
    if let Some(name) = slack {
        let id = result
            .case
            .network
            .node_by_name(name)
            .map(|n| n.id)
            .ok_or_else(|| anyhow!("slack node '{name}' is not in the case"))?;
        result.case.network.set_slack(id)?;
    }

    validate_network(
        &result.case.network,
        &mut result.diagnostics,
        &ValidationConfig::default(),
    );
    for issue in result.diagnostics.warnings() {
        warn!("{issue}");
    }
    if result.diagnostics.has_errors() {
        for issue in result.diagnostics.errors() {
            eprintln!("{issue}");
        }
        bail!(
            "case '{}' is not solvable: {}",
            path.display(),
            result.diagnostics.summary()
        );
    }
    Ok(result.case)
}

/// Solver from config, then case, then flags (later wins).
pub fn build_solver(
    config: &LmpConfig,
    method: Option<&str>,
    voll: Option<f64>,
    case: &Case,
) -> Result<DispatchSolver> {
    let method: OpfMethod = method
        .unwrap_or(&config.solver.method)
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    let mut solver = DispatchSolver::new()
        .with_method(method)
        .with_max_iterations(config.solver.max_iterations)
        .with_binding_tolerance(config.solver.binding_tolerance)
        .with_active_threshold(config.solver.active_threshold);
    if let Some(voll) = voll
        .or(case.value_of_lost_load)
        .or(config.solver.value_of_lost_load)
    {
        solver = solver.with_value_of_lost_load(voll);
    }
    Ok(solver)
}

pub fn output_format(flag: Option<OutputFormat>, config: &LmpConfig) -> Result<OutputFormat> {
    match flag {
        Some(format) => Ok(format),
        None => config
            .output
            .format
            .parse()
            .map_err(|e: String| anyhow!(e))
            .context("reading [output] format from config"),
    }
}

pub fn configure_threads(spec: &str) {
    if spec.eq_ignore_ascii_case("auto") {
        return;
    }
    match spec.parse::<usize>() {
        Ok(count) if count > 0 => {
            let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
        }
        _ => warn!("ignoring thread count '{spec}'"),
    }
}

/// Render tab-separated rows as an aligned table.
pub fn render_table(rows: &[String]) -> Result<String> {
    let mut writer = TabWriter::new(Vec::new()).padding(2);
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    Ok(String::from_utf8(writer.into_inner()?)?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
