use rayon::prelude::*;
use std::collections::VecDeque;

use crate::graph::SimilarityGraph;

#[derive(Debug, Clone, Copy)]
pub struct PageRankParams {
    pub damping: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for PageRankParams {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iter: 100,
            tolerance: 1e-6,
        }
    }
}

/// PageRank scores in graph vertex order, plus how the run terminated.
/// `converged == false` means the iteration cap was hit and the scores are
/// an approximation; callers decide whether that matters.
#[derive(Debug, Clone)]
pub struct PageRank {
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Weighted PageRank over the similarity graph.
///
/// A neighbor j's vote for i is PR[j] · w(j,i) / outweight(j), where
/// outweight(j) is the total similarity incident to j. Books with no
/// neighbors are dangling: their mass is spread uniformly over the whole
/// corpus each iteration. Iterations are double-buffered (the new vector
/// is computed entirely from the previous one) and stop when
/// max_i |Δ PR[i]| drops below the tolerance or the cap is reached.
pub fn pagerank(graph: &SimilarityGraph, params: PageRankParams) -> PageRank {
    let n = graph.len();
    if n == 0 {
        return PageRank {
            scores: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let d = params.damping;
    let uniform = 1.0 / n as f64;
    let out_weight: Vec<f64> = (0..n)
        .map(|v| graph.neighbors(v).iter().map(|&(_, w)| w).sum())
        .collect();

    let mut ranks = vec![uniform; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iter {
        iterations += 1;

        let dangling: f64 = (0..n)
            .filter(|&v| graph.degree(v) == 0)
            .map(|v| ranks[v])
            .sum();
        let base = (1.0 - d) * uniform + d * dangling * uniform;
        for slot in next.iter_mut() {
            *slot = base;
        }
        for v in 0..n {
            if out_weight[v] <= 0.0 {
                continue;
            }
            let share = d * ranks[v] / out_weight[v];
            for &(u, w) in graph.neighbors(v) {
                next[u] += share * w;
            }
        }

        let delta = ranks
            .iter()
            .zip(&next)
            .map(|(old, new)| (old - new).abs())
            .fold(0.0f64, f64::max);
        std::mem::swap(&mut ranks, &mut next);

        if delta < params.tolerance {
            converged = true;
            break;
        }
    }

    // Absorb float drift so the distribution sums to exactly 1.
    let total: f64 = ranks.iter().sum();
    if total > 0.0 {
        for r in ranks.iter_mut() {
            *r /= total;
        }
    }

    if !converged {
        tracing::warn!(
            iterations,
            tolerance = params.tolerance,
            "pagerank hit the iteration cap before converging"
        );
    }

    PageRank {
        scores: ranks,
        iterations,
        converged,
    }
}

/// Closeness centrality in vertex order, via unweighted BFS per source.
/// Similarity weights decide edge existence only, not distance. Distances
/// are averaged over the reachable component alone; a book that reaches
/// nothing scores 0. Sources are independent and run in parallel.
pub fn closeness(graph: &SimilarityGraph) -> Vec<f64> {
    let n = graph.len();
    (0..n)
        .into_par_iter()
        .map(|source| {
            let dist = bfs_distances(graph, source);
            let mut reachable = 0u64;
            let mut total = 0u64;
            for &d in &dist {
                if d >= 0 {
                    reachable += 1;
                    total += d as u64;
                }
            }
            if reachable > 1 && total > 0 {
                (reachable - 1) as f64 / total as f64
            } else {
                0.0
            }
        })
        .collect()
}

fn bfs_distances(graph: &SimilarityGraph, source: usize) -> Vec<i32> {
    let mut dist = vec![-1i32; graph.len()];
    dist[source] = 0;
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        for &(u, _) in graph.neighbors(v) {
            if dist[u] < 0 {
                dist[u] = dist[v] + 1;
                queue.push_back(u);
            }
        }
    }
    dist
}

/// Betweenness centrality in vertex order, Brandes' algorithm on the
/// unweighted undirected graph: per-source BFS collects shortest-path
/// counts σ, then dependencies δ accumulate in reverse BFS order onto every
/// intermediate vertex. Sources run in parallel, each worker folding into
/// its own partial vector; partials are summed at the end, halved for the
/// undirected double counting, and scaled by 2/((N-1)(N-2)) when N > 2
/// (betweenness is defined as 0 for smaller graphs).
pub fn betweenness(graph: &SimilarityGraph) -> Vec<f64> {
    let n = graph.len();
    if n <= 2 {
        return vec![0.0; n];
    }

    let mut scores = (0..n)
        .into_par_iter()
        .fold(
            || vec![0.0f64; n],
            |mut acc, source| {
                accumulate_dependencies(graph, source, &mut acc);
                acc
            },
        )
        .reduce(
            || vec![0.0f64; n],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        );

    let norm = 2.0 / ((n as f64 - 1.0) * (n as f64 - 2.0));
    for s in scores.iter_mut() {
        *s = *s / 2.0 * norm;
    }
    scores
}

fn accumulate_dependencies(graph: &SimilarityGraph, source: usize, acc: &mut [f64]) {
    let n = graph.len();
    let mut stack = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut dist = vec![-1i32; n];

    sigma[source] = 1.0;
    dist[source] = 0;
    let mut queue = VecDeque::from([source]);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        for &(u, _) in graph.neighbors(v) {
            if dist[u] < 0 {
                dist[u] = dist[v] + 1;
                queue.push_back(u);
            }
            if dist[u] == dist[v] + 1 {
                sigma[u] += sigma[v];
                predecessors[u].push(v);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    while let Some(w) = stack.pop() {
        for &v in &predecessors[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            acc[w] += delta[w];
        }
    }
}
