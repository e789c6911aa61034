use anyhow::{anyhow, bail, Result};
use lmp_algo::opf::sweep::{linspace, run_sweep, ParameterSweep, SweepParameter};
use lmp_core::{LineId, Network, NodeId};
use lmp_io::exporters::write_sweep_csv;
use tracing::info;

use super::{build_solver, configure_threads, load_validated, output_format, print_json, render_table};
use lmp_cli::{LmpConfig, OutputFormat, SweepArgs};

pub fn handle(config: &LmpConfig, args: &SweepArgs) -> Result<()> {
    configure_threads(&args.threads);
    let case = load_validated(&args.case, args.slack.as_deref())?;
    let solver = build_solver(config, args.method.as_deref(), args.voll, &case)?;
    let format = output_format(args.format, config)?;

    let parameter = parse_parameter(&case.network, &args.param)?;
    let steps = args.steps.unwrap_or(config.sweep.steps);
    if steps == 0 {
        bail!("--steps must be at least 1");
    }
    let values = linspace(args.from, args.to, steps);

    info!(%parameter, from = args.from, to = args.to, steps, "running sweep");
    let sweep = run_sweep(&case.network, &solver, parameter, &values)?;
    info!(
        feasible = sweep.feasible_count(),
        total = sweep.points.len(),
        "sweep finished"
    );

    if let Some(path) = &args.out {
        write_sweep_csv(&sweep, path)?;
        info!("wrote {}", path.display());
    }

    match format {
        OutputFormat::Table => print!("{}", render_sweep(&sweep, config.output.decimal_places)?),
        OutputFormat::Json => print_json(&sweep)?,
    }
    Ok(())
}

/// Parse `kind:TARGET`, e.g. `demand:C`, `capacity:A→C` or `length:2`.
pub fn parse_parameter(network: &Network, spec: &str) -> Result<SweepParameter> {
    let (kind, target) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("parameter '{spec}' must look like kind:TARGET"))?;
    let target = target.trim();
    Ok(match kind.trim().to_lowercase().as_str() {
        "demand" => SweepParameter::Demand(resolve_node(network, target)?),
        "capacity" | "line-capacity" => SweepParameter::LineCapacity(resolve_line(network, target)?),
        "length" | "line-length" => SweepParameter::LineLength(resolve_line(network, target)?),
        "gen-capacity" => SweepParameter::GenerationCapacity(resolve_node(network, target)?),
        "gen-cost" => SweepParameter::GenerationCost(resolve_node(network, target)?),
        other => bail!(
            "unknown sweep parameter '{other}' (expected demand, capacity, length, gen-capacity or gen-cost)"
        ),
    })
}

fn resolve_node(network: &Network, name: &str) -> Result<NodeId> {
    network
        .node_by_name(name)
        .map(|n| n.id)
        .ok_or_else(|| anyhow!("no node named '{name}'"))
}

/// A line by label (`A→B`, `A->B`, `A-B`, either orientation) or by index.
fn resolve_line(network: &Network, target: &str) -> Result<LineId> {
    if let Ok(idx) = target.parse::<usize>() {
        return network
            .line(LineId::new(idx))
            .map(|l| l.id)
            .ok_or_else(|| anyhow!("line index {idx} out of range"));
    }

    let ends = ["→", "->", "-"]
        .iter()
        .find_map(|sep| target.split_once(sep))
        .map(|(a, b)| (a.trim(), b.trim()))
        .ok_or_else(|| anyhow!("line '{target}' must be FROM→TO or an index"))?;
    let from = resolve_node(network, ends.0)?;
    let to = resolve_node(network, ends.1)?;
    network
        .lines()
        .find(|l| (l.from, l.to) == (from, to) || (l.from, l.to) == (to, from))
        .map(|l| l.id)
        .ok_or_else(|| anyhow!("no line between '{}' and '{}'", ends.0, ends.1))
}

fn render_sweep(sweep: &ParameterSweep, d: usize) -> Result<String> {
    let mut header = vec!["Value".to_string(), "Status".into(), "Cost".into(), "λ".into()];
    header.extend(sweep.node_names.iter().map(|n| format!("LMP {n}")));
    header.push("Shed".into());

    let mut rows = vec![header.join("\t")];
    for point in &sweep.points {
        let mut cells = vec![format!("{:.d$}", point.value)];
        match (&point.error, point.infeasibility) {
            (None, _) => {
                cells.push("ok".into());
                cells.push(format!("{:.d$}", point.total_cost.unwrap_or(0.0)));
                cells.push(format!("{:.d$}", point.energy_price.unwrap_or(0.0)));
                cells.extend(point.lmps.iter().map(|p| format!("{p:.d$}")));
                cells.push(format!("{:.d$}", point.shedding_mw));
            }
            (Some(_), Some(reason)) => cells.push(format!("INFEASIBLE ({reason})")),
            (Some(err), None) => cells.push(format!("error: {err}")),
        }
        rows.push(cells.join("\t"));
    }

    let mut text = format!(
        "Sweep of {} ({} of {} points feasible)\n",
        sweep.parameter,
        sweep.feasible_count(),
        sweep.points.len()
    );
    text.push_str(&render_table(&rows)?);
    Ok(text)
}
