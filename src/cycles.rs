use petgraph::algo::tarjan_scc;

use crate::graph::SnapshotGraph;

#[derive(Debug, Clone, Default)]
pub struct CycleClassification {
    // component id per node index
    pub component_of: Vec<usize>,
    pub component_sizes: Vec<usize>,
    pub cyclic: Vec<bool>,
}

impl CycleClassification {
    pub fn cyclic_count(&self) -> usize {
        self.cyclic.iter().filter(|&&c| c).count()
    }

    pub fn component_count(&self) -> usize {
        self.component_sizes.len()
    }
}

// Tarjan SCCs over the directed snapshot. A user is cyclic when its
// component holds at least two users. A lone self-loop only counts when
// `self_loops_are_cyclic` is set.
pub fn classify_cycles(snapshot: &SnapshotGraph, self_loops_are_cyclic: bool) -> CycleClassification {
    let graph = snapshot.graph();
    let n = graph.node_count();
    let mut result = CycleClassification {
        component_of: vec![0; n],
        component_sizes: Vec::new(),
        cyclic: vec![false; n],
    };

    for (id, component) in tarjan_scc(graph).into_iter().enumerate() {
        let size = component.len();
        result.component_sizes.push(size);
        for node in component {
            result.component_of[node.index()] = id;
            let looped = self_loops_are_cyclic && graph.find_edge(node, node).is_some();
            result.cyclic[node.index()] = size >= 2 || looped;
        }
    }

    result
}
