//! Post-import network validation.
//!
//! Checks that a network can be handed to the solver: positive finite
//! reactances, non-negative offers and demand, one connected island.
//! Findings go into [`Diagnostics`]; nothing here aborts.

use std::collections::HashMap;

use lmp_core::{find_islands, Diagnostics, Network, Severity};

/// Configuration for network validation behavior
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    /// Treat warnings as errors
    pub strict: bool,
    /// Skip the connectivity check (for partial networks)
    pub skip_topology: bool,
}

impl ValidationConfig {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }
}

/// Validate a network and populate diagnostics with any issues found.
pub fn validate_network(network: &Network, diag: &mut Diagnostics, config: &ValidationConfig) {
    let start = diag.issues.len();

    if !validate_structure(network, diag) {
        return;
    }
    validate_lines(network, diag);
    validate_nodes(network, diag);
    if !config.skip_topology {
        validate_topology(network, diag);
    }
    validate_balance(network, diag);

    if config.strict {
        for issue in &mut diag.issues[start..] {
            issue.severity = Severity::Error;
        }
    }
}

/// Returns false when there is nothing left to check.
fn validate_structure(network: &Network, diag: &mut Diagnostics) -> bool {
    match network.node_count() {
        0 => {
            diag.add_error("structure", "Network has no nodes");
            return false;
        }
        1 => diag.add_error("structure", "At least two nodes are required"),
        n if network.line_count() == 0 => diag.add_error(
            "structure",
            &format!("{n} nodes but no lines connecting them"),
        ),
        _ => {}
    }
    true
}

fn validate_lines(network: &Network, diag: &mut Diagnostics) {
    let mut corridors: HashMap<(usize, usize), Vec<&str>> = HashMap::new();

    for line in network.lines() {
        if line.from == line.to {
            diag.add_error_with_entity("structure", "Line connects a node to itself", &line.name);
            continue;
        }
        if !line.reactance.is_finite() || line.reactance <= 0.0 {
            diag.add_error_with_entity(
                "physical",
                &format!("Reactance must be positive and finite (got {})", line.reactance),
                &line.name,
            );
        }
        if !line.capacity_mw.is_finite() || line.capacity_mw < 0.0 {
            diag.add_error_with_entity(
                "physical",
                &format!("Transfer limit must be non-negative (got {} MW)", line.capacity_mw),
                &line.name,
            );
        } else if line.capacity_mw == 0.0 {
            diag.add_warning_with_entity("physical", "Line has a zero transfer limit", &line.name);
        }

        let (a, b) = (line.from.value(), line.to.value());
        corridors
            .entry((a.min(b), a.max(b)))
            .or_default()
            .push(&line.name);
    }

    let mut parallel: Vec<_> = corridors.into_values().filter(|names| names.len() > 1).collect();
    parallel.sort();
    for names in parallel {
        diag.add_warning_with_entity(
            "structure",
            &format!("{} parallel lines between the same nodes", names.len()),
            &names.join(", "),
        );
    }
}

fn validate_nodes(network: &Network, diag: &mut Diagnostics) {
    for node in network.nodes() {
        let entity = format!("Node {}", node.name);
        if !node.offer.capacity_mw.is_finite() || node.offer.capacity_mw < 0.0 {
            diag.add_error_with_entity("physical", "Generation capacity must be non-negative", &entity);
        }
        if !node.offer.cost_per_mwh.is_finite() || node.offer.cost_per_mwh < 0.0 {
            diag.add_error_with_entity("physical", "Generation cost must be non-negative", &entity);
        }
        if !node.demand_mw.is_finite() || node.demand_mw < 0.0 {
            diag.add_error_with_entity("physical", "Demand must be non-negative", &entity);
        }
    }
}

fn validate_topology(network: &Network, diag: &mut Diagnostics) {
    let islands = find_islands(network);
    if islands.len() <= 1 {
        return;
    }
    let groups: Vec<String> = islands
        .iter()
        .map(|island| {
            let names: Vec<&str> = island
                .nodes
                .iter()
                .filter_map(|id| network.node(*id).map(|n| n.name.as_str()))
                .collect();
            format!("{{{}}}", names.join(", "))
        })
        .collect();
    diag.add_error(
        "topology",
        &format!("Network splits into {} islands: {}", islands.len(), groups.join(" ")),
    );
}

fn validate_balance(network: &Network, diag: &mut Diagnostics) {
    let capacity = network.total_generation_capacity();
    let demand = network.total_demand();

    if !network.nodes().any(|n| n.has_generation()) {
        diag.add_warning("capacity", "No node offers generation");
    } else if capacity < demand {
        diag.add_warning(
            "capacity",
            &format!(
                "Total capacity {capacity:.1} MW is below total demand {demand:.1} MW; \
                 solves fail unless load shedding is enabled"
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmp_core::{LineId, Offer};

    fn three_node() -> Network {
        let mut network = Network::new();
        let a = network.add_node("A", Offer::new(100.0, 20.0), 0.0);
        let b = network.add_node("B", Offer::new(50.0, 40.0), 0.0);
        let c = network.add_node("C", Offer::none(), 120.0);
        network.add_line(a, b, 0.1, 100.0).unwrap();
        network.add_line(b, c, 0.1, 100.0).unwrap();
        network.add_line(a, c, 0.2, 50.0).unwrap();
        network
    }

    fn run(network: &Network, config: &ValidationConfig) -> Diagnostics {
        let mut diag = Diagnostics::new();
        validate_network(network, &mut diag, config);
        diag
    }

    #[test]
    fn test_clean_network() {
        let diag = run(&three_node(), &ValidationConfig::default());
        assert!(!diag.has_issues(), "{diag}");
    }

    #[test]
    fn test_bad_reactance_and_zero_limit() {
        let mut network = three_node();
        network.set_line_reactance(LineId::new(0), 0.0).unwrap();
        network.set_line_capacity(LineId::new(1), 0.0).unwrap();

        let diag = run(&network, &ValidationConfig::default());
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.errors().next().unwrap().entity.as_deref(), Some("A→B"));
        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.warnings().next().unwrap().entity.as_deref(), Some("B→C"));
    }

    #[test]
    fn test_islands_reported() {
        let mut network = three_node();
        network.add_node("D", Offer::none(), 0.0);
        let diag = run(&network, &ValidationConfig::default());
        let issue = diag.issues_by_category("topology").next().unwrap();
        assert!(issue.message.contains("{A, B, C} {D}"), "{}", issue.message);

        let diag = run(
            &network,
            &ValidationConfig {
                skip_topology: true,
                ..Default::default()
            },
        );
        assert!(!diag.has_errors());
    }

    #[test]
    fn test_shortfall_and_parallel_lines() {
        let mut network = three_node();
        network.set_demand(lmp_core::NodeId::new(2), 400.0).unwrap();
        network
            .add_line(lmp_core::NodeId::new(0), lmp_core::NodeId::new(1), 0.1, 10.0)
            .unwrap();

        let diag = run(&network, &ValidationConfig::default());
        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.issues_by_category("capacity").count(), 1);
        assert!(!diag.has_errors());

        let diag = run(&network, &ValidationConfig::strict());
        assert_eq!(diag.error_count(), 2);
    }
}
