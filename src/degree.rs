use petgraph::visit::EdgeRef;

use crate::config::CentralityBasis;
use crate::graph::SnapshotGraph;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DegreeStats {
    pub in_degree: usize,
    pub out_degree: usize,
    pub weighted_in: f64,
    pub weighted_out: f64,
}

impl DegreeStats {
    // A self-loop contributes once to each direction.
    pub fn degree(&self) -> usize {
        self.in_degree + self.out_degree
    }

    pub fn weighted_degree(&self) -> f64 {
        self.weighted_in + self.weighted_out
    }

    pub fn count(&self, basis: CentralityBasis) -> usize {
        match basis {
            CentralityBasis::Total => self.degree(),
            CentralityBasis::In => self.in_degree,
            CentralityBasis::Out => self.out_degree,
        }
    }
}

// One pass over the edge list; result is indexed by node index.
pub fn degree_stats(snapshot: &SnapshotGraph) -> Vec<DegreeStats> {
    let graph = snapshot.graph();
    let mut stats = vec![DegreeStats::default(); graph.node_count()];
    for e in graph.edge_references() {
        let w = *e.weight();
        let out = &mut stats[e.source().index()];
        out.out_degree += 1;
        out.weighted_out += w;
        let inc = &mut stats[e.target().index()];
        inc.in_degree += 1;
        inc.weighted_in += w;
    }
    stats
}

// degree / (|V| - 1); a single-node snapshot has no peers and scores 0.
pub fn degree_centrality(stats: &[DegreeStats], basis: CentralityBasis) -> Vec<f64> {
    if stats.len() <= 1 {
        return vec![0.0; stats.len()];
    }
    let scale = 1.0 / (stats.len() - 1) as f64;
    stats.iter().map(|s| s.count(basis) as f64 * scale).collect()
}
