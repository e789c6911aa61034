//! Test networks shared by unit tests and integration tests.

use lmp_core::{Network, NodeId, Offer};

/// Two nodes, one line A→B limited to 100 MW.
///
/// Cheap generation at A (cost 10, 500 MW), expensive at B (cost 50, 500 MW),
/// 150 MW of demand at B. The line binds: A serves 100 MW, B serves 50 MW.
pub fn two_node_congested() -> Network {
    let mut network = Network::new();
    let a = network.add_node("A", Offer::new(500.0, 10.0), 0.0);
    let b = network.add_node("B", Offer::new(500.0, 50.0), 150.0);
    network
        .add_line(a, b, 0.1, 100.0)
        .expect("fixture nodes exist");
    network
}

/// Triangle A-B-C with the classic teaching parameters.
///
/// A: 100 MW at 20, B: 50 MW at 40, C: load only (120 MW).
/// Lines A→B (x=0.1, 100 MW), B→C (x=0.1, 100 MW), A→C (x=0.2, 50 MW).
pub fn three_node_mesh() -> Network {
    let mut network = Network::new();
    let a = network.add_node("A", Offer::new(100.0, 20.0), 0.0);
    let b = network.add_node("B", Offer::new(50.0, 40.0), 0.0);
    let c = network.add_node("C", Offer::none(), 120.0);
    network.add_line(a, b, 0.1, 100.0).expect("fixture nodes exist");
    network.add_line(b, c, 0.1, 100.0).expect("fixture nodes exist");
    network.add_line(a, c, 0.2, 50.0).expect("fixture nodes exist");
    network
}

/// Fully meshed three-node network with generous limits and costs 10/20/30.
///
/// The cost-10 unit is capped at 60 MW, so the cost-20 unit is marginal for
/// 100 MW of demand spread over the three nodes.
pub fn three_node_uncongested() -> Network {
    let mut network = Network::new();
    let a = network.add_node("A", Offer::new(60.0, 10.0), 30.0);
    let b = network.add_node("B", Offer::new(200.0, 20.0), 30.0);
    let c = network.add_node("C", Offer::new(200.0, 30.0), 40.0);
    network.add_line(a, b, 0.1, 500.0).expect("fixture nodes exist");
    network.add_line(b, c, 0.1, 500.0).expect("fixture nodes exist");
    network.add_line(a, c, 0.1, 500.0).expect("fixture nodes exist");
    network
}

/// Radial chain N0 - N1 - ... with uniform lines (x=0.1, 1000 MW).
///
/// Generation at N0 (cost 10, 10 000 MW); 10 MW of demand on every other node.
pub fn radial_chain(n: usize) -> Network {
    let mut network = Network::new();
    let ids: Vec<NodeId> = (0..n)
        .map(|i| {
            if i == 0 {
                network.add_node("N0", Offer::new(10_000.0, 10.0), 0.0)
            } else {
                network.add_node(format!("N{i}"), Offer::none(), 10.0)
            }
        })
        .collect();
    for pair in ids.windows(2) {
        network
            .add_line(pair[0], pair[1], 0.1, 1000.0)
            .expect("fixture nodes exist");
    }
    network
}
