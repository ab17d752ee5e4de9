use crate::graph::UndirectedProjection;

// Minimum modularity gain for another local-moving pass or another level.
const MIN_GAIN: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
pub struct CommunityPartition {
    // community id per node index, numbered 0.. in order of first appearance
    pub assignment: Vec<usize>,
    pub community_count: usize,
    pub modularity: f64,
}

// Weighted undirected graph for one aggregation level.
#[derive(Debug, Clone)]
struct LevelGraph {
    adj: Vec<Vec<(usize, f64)>>,
    loops: Vec<f64>,
}

impl LevelGraph {
    fn from_projection(projection: &UndirectedProjection) -> Self {
        LevelGraph {
            adj: projection.neighbors.clone(),
            loops: projection.self_loops.clone(),
        }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    // Self-loops count twice towards a node's weighted degree.
    fn node_degree(&self, node: usize) -> f64 {
        self.adj[node].iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * self.loops[node]
    }

    fn total_weight(&self) -> f64 {
        let pairs: f64 = self.adj.iter().flatten().map(|&(_, w)| w).sum();
        pairs / 2.0 + self.loops.iter().sum::<f64>()
    }

    // Collapses every community into a single node. Edges inside a
    // community become that node's self-loop.
    fn induced(&self, partition: &[usize], community_count: usize) -> LevelGraph {
        let mut weights: Vec<std::collections::BTreeMap<usize, f64>> =
            vec![Default::default(); community_count];
        let mut loops = vec![0.0; community_count];

        for u in 0..self.len() {
            let cu = partition[u];
            loops[cu] += self.loops[u];
            for &(v, w) in &self.adj[u] {
                if v < u {
                    continue;
                }
                let cv = partition[v];
                if cu == cv {
                    loops[cu] += w;
                } else {
                    *weights[cu].entry(cv).or_insert(0.0) += w;
                    *weights[cv].entry(cu).or_insert(0.0) += w;
                }
            }
        }

        LevelGraph {
            adj: weights.into_iter().map(|m| m.into_iter().collect()).collect(),
            loops,
        }
    }
}

struct Status {
    node2com: Vec<usize>,
    // sum of member degrees per community
    totals: Vec<f64>,
    // weight of edges inside each community, self-loops included once
    internals: Vec<f64>,
    degrees: Vec<f64>,
    total_weight: f64,
}

impl Status {
    fn new(graph: &LevelGraph) -> Self {
        let n = graph.len();
        let degrees: Vec<f64> = (0..n).map(|v| graph.node_degree(v)).collect();
        Status {
            node2com: (0..n).collect(),
            totals: degrees.clone(),
            internals: graph.loops.clone(),
            degrees,
            total_weight: graph.total_weight(),
        }
    }

    fn modularity(&self, resolution: f64) -> f64 {
        let m = self.total_weight;
        self.internals
            .iter()
            .zip(&self.totals)
            .filter(|(_, tot)| **tot > 0.0)
            .map(|(&inside, &tot)| inside / m - resolution * (tot / (2.0 * m)).powi(2))
            .sum()
    }

    fn remove(&mut self, node: usize, com: usize, weight_to_com: f64, self_loop: f64) {
        self.totals[com] -= self.degrees[node];
        self.internals[com] -= weight_to_com + self_loop;
    }

    fn insert(&mut self, node: usize, com: usize, weight_to_com: f64, self_loop: f64) {
        self.node2com[node] = com;
        self.totals[com] += self.degrees[node];
        self.internals[com] += weight_to_com + self_loop;
    }
}

// Local moving phase: move single nodes to the neighboring community with
// the best modularity gain until a full pass gains less than MIN_GAIN.
fn one_level(graph: &LevelGraph, status: &mut Status, resolution: f64) {
    let n = graph.len();
    let two_m = 2.0 * status.total_weight;
    let mut neigh_weight = vec![0.0; n];
    let mut seen = vec![false; n];
    let mut touched: Vec<usize> = Vec::new();
    let mut current = status.modularity(resolution);

    loop {
        let mut moved = false;

        for node in 0..n {
            let home = status.node2com[node];
            let degc_totw = status.degrees[node] / two_m;

            for &com in &touched {
                neigh_weight[com] = 0.0;
                seen[com] = false;
            }
            touched.clear();
            for &(neighbor, w) in &graph.adj[node] {
                let com = status.node2com[neighbor];
                if !seen[com] {
                    seen[com] = true;
                    touched.push(com);
                }
                neigh_weight[com] += w;
            }

            let to_home = neigh_weight[home];
            let remove_cost =
                -to_home + resolution * (status.totals[home] - status.degrees[node]) * degc_totw;
            status.remove(node, home, to_home, graph.loops[node]);

            let mut best = home;
            let mut best_gain = 0.0;
            for &com in &touched {
                let gain =
                    remove_cost + neigh_weight[com] - resolution * status.totals[com] * degc_totw;
                if gain > best_gain {
                    best_gain = gain;
                    best = com;
                }
            }

            status.insert(node, best, neigh_weight[best], graph.loops[node]);
            if best != home {
                moved = true;
            }
        }

        let next = status.modularity(resolution);
        if !moved || next - current < MIN_GAIN {
            break;
        }
        current = next;
    }
}

// Relabels community ids to 0.. by first appearance in node order.
fn renumber(node2com: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping = vec![usize::MAX; node2com.len()];
    let mut next = 0;
    let labels = node2com
        .iter()
        .map(|&com| {
            if mapping[com] == usize::MAX {
                mapping[com] = next;
                next += 1;
            }
            mapping[com]
        })
        .collect();
    (labels, next)
}

// Louvain community detection on the undirected projection. Returns None
// for a snapshot with no nodes or no positive edge weight, where modularity
// is undefined. Nodes are visited in index order, so identical inputs give
// identical partitions.
pub fn louvain(projection: &UndirectedProjection, resolution: f64) -> Option<CommunityPartition> {
    let n = projection.node_count();
    if n == 0 || projection.total_weight() <= 0.0 {
        return None;
    }

    let mut graph = LevelGraph::from_projection(projection);
    // assignment of input nodes to nodes of the current level
    let mut assignment: Vec<usize> = (0..n).collect();

    let mut status = Status::new(&graph);
    one_level(&graph, &mut status, resolution);
    let mut best = status.modularity(resolution);
    let (level, count) = renumber(&status.node2com);
    for slot in assignment.iter_mut() {
        *slot = level[*slot];
    }
    graph = graph.induced(&level, count);

    loop {
        let mut status = Status::new(&graph);
        one_level(&graph, &mut status, resolution);
        let next = status.modularity(resolution);
        if next - best < MIN_GAIN {
            break;
        }
        best = next;
        let (level, count) = renumber(&status.node2com);
        for slot in assignment.iter_mut() {
            *slot = level[*slot];
        }
        graph = graph.induced(&level, count);
    }

    let (assignment, community_count) = renumber(&assignment);
    let modularity = modularity(projection, &assignment, resolution);
    Some(CommunityPartition {
        assignment,
        community_count,
        modularity,
    })
}

// Newman modularity of a partition of the undirected projection.
pub fn modularity(projection: &UndirectedProjection, assignment: &[usize], resolution: f64) -> f64 {
    let m = projection.total_weight();
    if m <= 0.0 {
        return 0.0;
    }
    let communities = assignment.iter().copied().max().map_or(0, |c| c + 1);
    let mut inside = vec![0.0; communities];
    let mut totals = vec![0.0; communities];

    for (u, adj) in projection.neighbors.iter().enumerate() {
        let cu = assignment[u];
        let looped = projection.self_loops[u];
        inside[cu] += looped;
        totals[cu] += 2.0 * looped;
        for &(v, w) in adj {
            totals[cu] += w;
            if v > u && assignment[v] == cu {
                inside[cu] += w;
            }
        }
    }

    inside
        .iter()
        .zip(&totals)
        .map(|(&l, &d)| l / m - resolution * (d / (2.0 * m)).powi(2))
        .sum()
}
