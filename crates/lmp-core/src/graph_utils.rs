use crate::{Network, NodeId};
use petgraph::algo::connected_components;
use serde::Serialize;
use std::collections::VecDeque;

/// Size and degree summary of a network topology.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub line_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    /// Lines present / lines in a fully meshed network
    pub density: f64,
}

/// A connected group of nodes.
#[derive(Debug, Clone, Serialize)]
pub struct Island {
    pub island_id: usize,
    pub nodes: Vec<NodeId>,
}

/// Degree distribution, density and component count.
pub fn graph_stats(network: &Network) -> GraphStats {
    let graph = network.graph();
    let node_count = graph.node_count();
    let line_count = graph.edge_count();
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.edges(node).count())
        .collect();
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * line_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    GraphStats {
        node_count,
        line_count,
        connected_components: connected_components(graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
    }
}

/// Label connected components by breadth-first search, in node order.
pub fn find_islands(network: &Network) -> Vec<Island> {
    let graph = network.graph();
    let mut visited = vec![false; graph.node_count()];
    let mut islands = Vec::new();

    for start in graph.node_indices() {
        if visited[start.index()] {
            continue;
        }
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited[start.index()] = true;
        while let Some(node) = queue.pop_front() {
            members.push(NodeId::new(node.index()));
            for neighbor in graph.neighbors(node) {
                if !visited[neighbor.index()] {
                    visited[neighbor.index()] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort();
        islands.push(Island {
            island_id: islands.len(),
            nodes: members,
        });
    }
    islands
}

/// True when every node is reachable from every other node.
pub fn is_connected(network: &Network) -> bool {
    network.node_count() > 0 && connected_components(network.graph()) == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Offer;

    fn chain(n: usize) -> Network {
        let mut network = Network::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| network.add_node(format!("N{i}"), Offer::none(), 0.0))
            .collect();
        for pair in ids.windows(2) {
            network.add_line(pair[0], pair[1], 0.1, 10.0).unwrap();
        }
        network
    }

    #[test]
    fn test_chain_is_connected() {
        let network = chain(4);
        assert!(is_connected(&network));
        let islands = find_islands(&network);
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].nodes.len(), 4);
    }

    #[test]
    fn test_isolated_node_forms_island() {
        let mut network = chain(3);
        network.add_node("lonely", Offer::none(), 5.0);
        assert!(!is_connected(&network));

        let islands = find_islands(&network);
        assert_eq!(islands.len(), 2);
        assert_eq!(islands[1].nodes, vec![NodeId::new(3)]);
    }

    #[test]
    fn test_stats_for_triangle() {
        let mut network = chain(3);
        network
            .add_line(NodeId::new(0), NodeId::new(2), 0.2, 10.0)
            .unwrap();
        let stats = graph_stats(&network);
        assert_eq!(stats.line_count, 3);
        assert_eq!(stats.connected_components, 1);
        assert_eq!(stats.min_degree, 2);
        assert!((stats.density - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_network_is_not_connected() {
        assert!(!is_connected(&Network::new()));
    }
}
