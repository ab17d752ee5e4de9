use crate::graph::UndirectedProjection;

// Core number of every node of the undirected projection (self-loops are
// not part of the projection's neighbor lists). Batagelj-Zaversnik peeling:
// vertices are kept bucket-sorted by current degree, the lowest one is
// removed and its higher-degree neighbors move down one bucket. A node's
// degree at removal time is its core number.
pub fn core_numbers(projection: &UndirectedProjection) -> Vec<usize> {
    let n = projection.node_count();
    let mut degree: Vec<usize> = (0..n).map(|v| projection.degree(v)).collect();
    let max_degree = degree.iter().copied().max().unwrap_or(0);

    // bin[d] = start offset of bucket d inside `vert`
    let mut bin = vec![0usize; max_degree + 1];
    for &d in &degree {
        bin[d] += 1;
    }
    let mut start = 0;
    for slot in bin.iter_mut() {
        let count = *slot;
        *slot = start;
        start += count;
    }

    let mut pos = vec![0usize; n];
    let mut vert = vec![0usize; n];
    for v in 0..n {
        pos[v] = bin[degree[v]];
        vert[pos[v]] = v;
        bin[degree[v]] += 1;
    }
    for d in (1..=max_degree).rev() {
        bin[d] = bin[d - 1];
    }
    bin[0] = 0;

    for i in 0..n {
        let v = vert[i];
        for &(u, _) in &projection.neighbors[v] {
            if degree[u] > degree[v] {
                let du = degree[u];
                let pu = pos[u];
                let pw = bin[du];
                let w = vert[pw];
                if u != w {
                    pos[u] = pw;
                    vert[pu] = w;
                    pos[w] = pu;
                    vert[pw] = u;
                }
                bin[du] += 1;
                degree[u] -= 1;
            }
        }
    }

    degree
}
