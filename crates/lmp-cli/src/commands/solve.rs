use std::path::Path;

use anyhow::{Context, Result};
use lmp_algo::{LineResult, MarketResult};
use lmp_io::exporters::{write_json, write_market_csv};
use lmp_io::importers::Case;
use tracing::info;

use super::{build_solver, load_validated, output_format, print_json, render_table};
use lmp_cli::config::OutputConfig;
use lmp_cli::{LmpConfig, OutputFormat};

pub struct SolveOptions<'a> {
    pub case: &'a Path,
    pub slack: Option<&'a str>,
    pub method: Option<&'a str>,
    pub voll: Option<f64>,
    pub format: Option<OutputFormat>,
    pub out: Option<&'a Path>,
    pub csv: Option<&'a Path>,
}

pub fn handle(config: &LmpConfig, opts: SolveOptions<'_>) -> Result<()> {
    let case = load_validated(opts.case, opts.slack)?;
    let solver = build_solver(config, opts.method, opts.voll, &case)?;
    let format = output_format(opts.format, config)?;

    info!(case = %case.name, method = %solver.method(), "clearing market");
    let result = match solver.solve(&case.network) {
        Ok(result) => result,
        Err(err) => {
            if let Some(reason) = err.infeasibility() {
                eprintln!("INFEASIBLE: {reason}");
                eprintln!("  {}", reason.suggestion());
            }
            return Err(err).with_context(|| format!("solving case '{}'", case.name));
        }
    };
    info!(
        total_cost = result.total_cost,
        iterations = result.iterations,
        solve_time_ms = result.solve_time_ms as u64,
        "market cleared"
    );

    if let Some(path) = opts.out {
        write_json(&result, path)?;
        info!("wrote {}", path.display());
    }
    if let Some(dir) = opts.csv {
        for path in write_market_csv(&result, dir)? {
            info!("wrote {}", path.display());
        }
    }

    match format {
        OutputFormat::Table => print!("{}", render_report(&case, &result, &config.output)?),
        OutputFormat::Json => print_json(&result)?,
    }
    Ok(())
}

/// Human-readable market report.
pub fn render_report(case: &Case, result: &MarketResult, output: &OutputConfig) -> Result<String> {
    let d = output.decimal_places;
    let mut report = String::new();

    report.push_str(&format!(
        "Case: {} ({} nodes, {} lines, method {})\n",
        case.name,
        result.nodes.len(),
        result.lines.len(),
        result.method
    ));
    report.push_str(&format!("Status: {}\n\n", result.status));

    let mut rows = vec!["Node\tLMP\tEnergy\tCongestion\tBreakdown".to_string()];
    for node in &result.nodes {
        let breakdown: Vec<String> = node
            .congestion_contributions
            .iter()
            .filter(|c| c.value.abs() >= output.congestion_threshold)
            .map(|c| format!("{}: {:+.d$}", c.label, c.value))
            .collect();
        rows.push(format!(
            "{}\t{:.d$}\t{:.d$}\t{:+.d$}\t{}",
            node.name,
            node.lmp,
            node.energy_component,
            node.congestion_component,
            breakdown.join(", ")
        ));
    }
    report.push_str("Prices (/MWh)\n");
    report.push_str(&render_table(&rows)?);

    let mut rows = vec!["Line\tFlow\tLimit\tUtil\tDirection\tShadow price\t".to_string()];
    for line in &result.lines {
        rows.push(format!(
            "{}\t{:.d$}\t{:.d$}\t{:.1}%\t{}\t{:.d$}\t{}",
            line.label,
            line.flow_mw.abs(),
            line.limit_mw,
            line.utilization * 100.0,
            direction(line),
            line.shadow_price,
            if line.binding { "BINDING" } else { "" }
        ));
    }
    report.push_str("\nFlows (MW)\n");
    report.push_str(&render_table(&rows)?);

    let attributed: Vec<String> = result
        .lines
        .iter()
        .filter(|l| !l.generator_flows.is_empty())
        .map(|l| {
            let parts: Vec<String> = l
                .generator_flows
                .iter()
                .map(|g| format!("{} {:+.d$}", g.generator, g.flow_mw))
                .collect();
            format!("  {}: {}\n", l.label, parts.join(", "))
        })
        .collect();
    if !attributed.is_empty() {
        report.push_str("\nFlow by generator (MW)\n");
        report.push_str(&attributed.concat());
    }

    let mut rows = vec!["Node\tOutput\tCapacity\tCost\tDemand\tShed".to_string()];
    for node in &result.nodes {
        rows.push(format!(
            "{}\t{:.d$}\t{:.d$}\t{:.d$}\t{:.d$}\t{:.d$}",
            node.name,
            node.dispatch_mw,
            node.capacity_mw,
            node.cost_per_mwh,
            node.demand_mw,
            node.shedding_mw
        ));
    }
    report.push_str("\nDispatch (MW)\n");
    report.push_str(&render_table(&rows)?);

    report.push_str("\nSummary\n");
    let mut rows = vec![
        format!("Total cost\t{:.d$} /h", result.total_cost),
        format!("Energy price\t{:.d$} /MWh", result.energy_price),
    ];
    if let Some(cost) = result.congestion_cost {
        rows.push(format!("Congestion cost\t{cost:.d$} /h"));
    }
    rows.extend([
        format!("Congestion rent\t{:.d$} /h", result.congestion_rent),
        format!("Price spread\t{:.d$} /MWh", result.price_spread()),
        format!("Active constraints\t{}", result.active_constraints),
        format!("Generation\t{:.d$} MW", result.total_generation_mw),
        format!("Demand\t{:.d$} MW", result.total_demand_mw),
    ]);
    if result.total_shedding_mw > 0.0 {
        rows.push(format!("Load shed\t{:.d$} MW", result.total_shedding_mw));
    }
    report.push_str(&render_table(&rows)?);
    Ok(report)
}

fn direction(line: &LineResult) -> String {
    if line.flow_mw.abs() < 1e-9 {
        return "-".to_string();
    }
    let sending = line.sending_end();
    let receiving = if sending == line.from { &line.to } else { &line.from };
    format!("{sending} → {receiving}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmp_algo::test_utils::three_node_mesh;
    use lmp_algo::DispatchSolver;

    #[test]
    fn test_report_sections() {
        let case = Case {
            name: "mesh".into(),
            network: three_node_mesh(),
            value_of_lost_load: None,
        };
        let result = DispatchSolver::new().solve(&case.network).unwrap();
        let report = render_report(&case, &result, &OutputConfig::default()).unwrap();

        assert!(report.starts_with("Case: mesh (3 nodes, 3 lines, method dc)"));
        assert!(report.contains("Status: HEALTHY"));
        assert!(report.contains("BINDING"));
        assert!(report.contains("A→C: +40.00"));
        assert!(report.contains("A → C"));
        for section in ["Prices", "Flows", "Flow by generator", "Dispatch", "Summary"] {
            assert!(report.contains(section), "missing {section}");
        }
        assert!(!report.contains("Load shed"));
    }
}
