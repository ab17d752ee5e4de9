use std::collections::HashMap;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::partition::EdgeRecord;

// Directed weighted graph for one window. Parallel transactions between the
// same ordered pair collapse into a single edge carrying their summed weight.
#[derive(Debug, Clone, Default)]
pub struct SnapshotGraph {
    graph: DiGraph<String, f64>,
    index: HashMap<String, NodeIndex>,
}

impl SnapshotGraph {
    pub fn from_edges(edges: &[EdgeRecord]) -> Self {
        let mut snapshot = SnapshotGraph::default();
        snapshot.accumulate(edges);
        snapshot
    }

    // Only valid on a graph without edges: the pair lookup starts empty.
    fn accumulate(&mut self, edges: &[EdgeRecord]) {
        let mut pairs: HashMap<(NodeIndex, NodeIndex), EdgeIndex> = HashMap::new();
        for edge in edges {
            let source = self.intern(&edge.source);
            let target = self.intern(&edge.target);
            match pairs.get(&(source, target)) {
                Some(&existing) => self.graph[existing] += edge.weight,
                None => {
                    let id = self.graph.add_edge(source, target, edge.weight);
                    pairs.insert((source, target), id);
                }
            }
        }
    }

    fn intern(&mut self, user: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(user) {
            return idx;
        }
        let idx = self.graph.add_node(user.to_string());
        self.index.insert(user.to_string(), idx);
        idx
    }

    pub fn graph(&self) -> &DiGraph<String, f64> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_index(&self, user: &str) -> Option<NodeIndex> {
        self.index.get(user).copied()
    }

    pub fn user(&self, node: NodeIndex) -> &str {
        &self.graph[node]
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(move |n| self.graph[n].as_str())
    }

    #[cfg(test)]
    pub fn edge_weight(&self, source: &str, target: &str) -> Option<f64> {
        let a = self.node_index(source)?;
        let b = self.node_index(target)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    pub fn total_weight(&self) -> f64 {
        self.graph.edge_weights().sum()
    }

    pub fn edges(&self) -> Vec<EdgeRecord> {
        self.graph
            .edge_references()
            .map(|e| {
                EdgeRecord::new(
                    self.graph[e.source()].clone(),
                    self.graph[e.target()].clone(),
                    *e.weight(),
                )
            })
            .collect()
    }

    // An undirected edge {u,v} exists when either direction exists; its
    // weight is the sum of both directions. Self-loops are kept apart.
    pub fn undirected_projection(&self) -> UndirectedProjection {
        let n = self.graph.node_count();
        let mut merged: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
        let mut self_loops = vec![0.0; n];

        for e in self.graph.edge_references() {
            let (u, v) = (e.source().index(), e.target().index());
            let w = *e.weight();
            if u == v {
                self_loops[u] += w;
                continue;
            }
            *merged[u].entry(v).or_insert(0.0) += w;
            *merged[v].entry(u).or_insert(0.0) += w;
        }

        let neighbors = merged
            .into_iter()
            .map(|m| {
                let mut adj: Vec<(usize, f64)> = m.into_iter().collect();
                adj.sort_by_key(|&(v, _)| v);
                adj
            })
            .collect();

        UndirectedProjection {
            neighbors,
            self_loops,
        }
    }

    pub fn to_record(&self) -> SnapshotRecord {
        SnapshotRecord {
            nodes: self.users().map(str::to_string).collect(),
            edges: self.edges(),
        }
    }

    pub fn from_record(record: &SnapshotRecord) -> Self {
        let mut snapshot = SnapshotGraph::default();
        for user in &record.nodes {
            snapshot.intern(user);
        }
        snapshot.accumulate(&record.edges);
        snapshot
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub nodes: Vec<String>,
    pub edges: Vec<EdgeRecord>,
}

// Simple undirected view over node indices of the snapshot graph.
#[derive(Debug, Clone)]
pub struct UndirectedProjection {
    pub neighbors: Vec<Vec<(usize, f64)>>,
    pub self_loops: Vec<f64>,
}

impl UndirectedProjection {
    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn degree(&self, node: usize) -> usize {
        self.neighbors[node].len()
    }

    pub fn total_weight(&self) -> f64 {
        let pairs: f64 = self
            .neighbors
            .iter()
            .flat_map(|adj| adj.iter().map(|&(_, w)| w))
            .sum();
        pairs / 2.0 + self.self_loops.iter().sum::<f64>()
    }
}
