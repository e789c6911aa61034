//! PTDF invariants on random connected topologies

use lmp_algo::{build_model, NetworkModel};
use lmp_core::{Network, NodeId, Offer};
use proptest::prelude::*;

/// Random spanning tree plus a few extra lines.
fn connected_network() -> impl Strategy<Value = Network> {
    (2usize..8)
        .prop_flat_map(|n| {
            let parents: Vec<_> = (1..n).map(|i| 0..i).collect();
            let tree_x = prop::collection::vec(0.01f64..1.0, n - 1);
            let extra = prop::collection::vec((0..n, 0..n, 0.01f64..1.0), 0..4);
            (Just(n), parents, tree_x, extra)
        })
        .prop_map(|(n, parents, tree_x, extra)| {
            let mut network = Network::new();
            let ids: Vec<NodeId> = (0..n)
                .map(|i| network.add_node(format!("N{i}"), Offer::none(), 0.0))
                .collect();
            for (child, (parent, x)) in parents.into_iter().zip(tree_x).enumerate() {
                network.add_line(ids[parent], ids[child + 1], x, 100.0).unwrap();
            }
            for (i, j, x) in extra {
                if i != j {
                    network.add_line(ids[i], ids[j], x, 100.0).unwrap();
                }
            }
            network
        })
}

/// Balanced injections: arbitrary everywhere except the last node, which absorbs the sum.
fn balanced(raw: &[f64], n: usize) -> Vec<f64> {
    let mut injections: Vec<f64> = raw.iter().copied().cycle().take(n).collect();
    let sum: f64 = injections[..n - 1].iter().sum();
    injections[n - 1] = -sum;
    injections
}

proptest! {
    #[test]
    fn slack_column_is_zero(network in connected_network(), slack_seed in 0usize..8) {
        let slack = NodeId::new(slack_seed % network.node_count());
        let (_, ptdf) = build_model(&network, slack).unwrap();
        for l in 0..ptdf.num_lines() {
            prop_assert!(ptdf.get_by_idx(l, slack.value()).abs() < 1e-12);
        }
    }

    #[test]
    fn flows_satisfy_kirchhoff_current_law(
        network in connected_network(),
        raw in prop::collection::vec(-50.0f64..50.0, 1..8),
    ) {
        let n = network.node_count();
        let injections = balanced(&raw, n);
        let (_, ptdf) = build_model(&network, NodeId::new(0)).unwrap();
        let flows = ptdf.flows(&injections);

        for node in network.nodes() {
            let net_out: f64 = network
                .lines()
                .map(|line| {
                    let f = flows[line.id.value()];
                    if line.from == node.id && line.to != node.id {
                        f
                    } else if line.to == node.id && line.from != node.id {
                        -f
                    } else {
                        0.0
                    }
                })
                .sum();
            prop_assert!((net_out - injections[node.id.value()]).abs() < 1e-6);
        }
    }

    #[test]
    fn flows_do_not_depend_on_slack(
        network in connected_network(),
        raw in prop::collection::vec(-50.0f64..50.0, 1..8),
        slack_seed in 0usize..8,
    ) {
        let n = network.node_count();
        let injections = balanced(&raw, n);
        let a = NetworkModel::build(&network, NodeId::new(0)).unwrap();
        let b = NetworkModel::build(&network, NodeId::new(slack_seed % n)).unwrap();

        let fa = a.ptdf().flows(&injections);
        let fb = b.ptdf().flows(&injections);
        for (x, y) in fa.iter().zip(&fb) {
            prop_assert!((x - y).abs() < 1e-6);
        }
    }
}
