//! SimRank structural similarity
//!
//! Two fields are similar when their in-neighbors are similar:
//!
//! ```text
//! s'(a, b) = c * Σ_{i ∈ in(a), j ∈ in(b)} s(i, j) / (|in(a)| * |in(b)|)
//! ```
//!
//! with `s(a, a) = 1`. Every round reads only the previous round's matrix (double buffer),
//! so rounds are safe to compute row-parallel.

use ahash::AHashMap;
use fieldgraph_core::{FieldId, SimRankConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Neighborhood;

/// Dense field × field similarity, symmetric, diagonal fixed at 1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "MatrixData", into = "MatrixData")]
pub struct SimRankMatrix {
    ids: Vec<FieldId>,
    positions: AHashMap<FieldId, usize>,
    scores: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct MatrixData {
    ids: Vec<FieldId>,
    scores: Vec<f32>,
}

impl From<MatrixData> for SimRankMatrix {
    fn from(data: MatrixData) -> Self {
        SimRankMatrix::from_parts(data.ids, data.scores)
    }
}

impl From<SimRankMatrix> for MatrixData {
    fn from(matrix: SimRankMatrix) -> Self {
        MatrixData {
            ids: matrix.ids,
            scores: matrix.scores,
        }
    }
}

impl PartialEq for SimRankMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids && self.scores == other.scores
    }
}

impl Default for SimRankMatrix {
    fn default() -> Self {
        SimRankMatrix::identity(Vec::new())
    }
}

impl SimRankMatrix {
    pub fn identity(ids: Vec<FieldId>) -> Self {
        let n = ids.len();
        let mut scores = vec![0.0; n * n];
        for i in 0..n {
            scores[i * n + i] = 1.0;
        }
        Self::from_parts(ids, scores)
    }

    fn from_parts(ids: Vec<FieldId>, scores: Vec<f32>) -> Self {
        let positions = ids.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();
        Self { ids, positions, scores }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[FieldId] {
        &self.ids
    }

    /// Score between two fields. Identical fields score 1, unknown pairs 0.
    pub fn score(&self, a: FieldId, b: FieldId) -> f32 {
        if a == b {
            return 1.0;
        }
        match (self.positions.get(&a), self.positions.get(&b)) {
            (Some(&i), Some(&j)) => self.scores[i * self.ids.len() + j],
            _ => 0.0,
        }
    }

    /// Other fields scoring at least `threshold` against `id`, best first
    pub fn similar_to(&self, id: FieldId, threshold: f32) -> Vec<(FieldId, f32)> {
        let Some(&row) = self.positions.get(&id) else {
            return Vec::new();
        };
        let n = self.ids.len();
        let mut similar: Vec<(FieldId, f32)> = self.scores[row * n..(row + 1) * n]
            .iter()
            .enumerate()
            .filter(|(col, score)| *col != row && **score > 0.0 && **score >= threshold)
            .map(|(col, score)| (self.ids[col], *score))
            .collect();
        similar.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        similar
    }

    /// Iterate every stored entry
    pub fn entries(&self) -> impl Iterator<Item = (FieldId, FieldId, f32)> + '_ {
        let n = self.ids.len();
        self.scores
            .iter()
            .enumerate()
            .map(move |(k, s)| (self.ids[k / n], self.ids[k % n], *s))
    }
}

/// Outcome of one SimRank run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRankReport {
    pub iterations: usize,
    pub converged: bool,
    /// Total absolute change of each round, over unordered pairs
    pub deltas: Vec<f32>,
}

pub struct SimRank {
    config: SimRankConfig,
}

impl SimRank {
    pub fn new(config: SimRankConfig) -> Self {
        Self { config }
    }

    /// Run SimRank over `nodes` using the graph's adjacency.
    ///
    /// Edges are read as `node -> neighbor`, so the in-neighbors of `x` are the nodes that
    /// list `x`. Hitting `max_iterations` before `epsilon` is not an error; the matrix at
    /// cutoff is returned.
    pub fn compute<G: Neighborhood + ?Sized>(&self, graph: &G, nodes: &[FieldId]) -> (SimRankMatrix, SimRankReport) {
        let n = nodes.len();
        if n < 2 {
            let report = SimRankReport {
                iterations: 0,
                converged: true,
                deltas: Vec::new(),
            };
            return (SimRankMatrix::identity(nodes.to_vec()), report);
        }
        let position: AHashMap<FieldId, usize> =
            nodes.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();

        let mut in_neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (src, id) in nodes.iter().enumerate() {
            for target in graph.neighbors(*id) {
                if let Some(&dst) = position.get(&target) {
                    if dst != src {
                        in_neighbors[dst].push(src);
                    }
                }
            }
        }
        for (pos, list) in in_neighbors.iter_mut().enumerate() {
            if self.config.reflexive {
                list.push(pos);
            }
            list.sort_unstable();
            list.dedup();
        }

        let mut prev = SimRankMatrix::identity(nodes.to_vec()).scores;
        let mut next = prev.clone();
        let c = self.config.damping;
        let mut deltas = Vec::new();
        let mut converged = false;

        for round in 0..self.config.max_iterations {
            // Upper triangle only, mirrored afterwards so the matrix stays exactly symmetric
            next.par_chunks_mut(n).enumerate().for_each(|(a, row)| {
                for b in (a + 1)..n {
                    row[b] = Self::pair_score(&prev, n, &in_neighbors[a], &in_neighbors[b], c);
                }
            });
            let mut delta = 0.0f32;
            for a in 0..n {
                for b in (a + 1)..n {
                    let value = next[a * n + b];
                    next[b * n + a] = value;
                    delta += (value - prev[a * n + b]).abs();
                }
            }
            std::mem::swap(&mut prev, &mut next);
            deltas.push(delta);
            debug!(round = round + 1, delta, "simrank round");

            if delta < self.config.epsilon {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                iterations = deltas.len(),
                last_delta = deltas.last().copied().unwrap_or(0.0),
                "simrank stopped at max_iterations before reaching epsilon"
            );
        }

        let report = SimRankReport {
            iterations: deltas.len(),
            converged,
            deltas,
        };
        (SimRankMatrix::from_parts(nodes.to_vec(), prev), report)
    }

    #[inline]
    fn pair_score(prev: &[f32], n: usize, in_a: &[usize], in_b: &[usize], c: f32) -> f32 {
        if in_a.is_empty() || in_b.is_empty() {
            return 0.0;
        }
        let mut sum = 0.0f32;
        for &i in in_a {
            let row = &prev[i * n..(i + 1) * n];
            for &j in in_b {
                sum += row[j];
            }
        }
        (c * sum / (in_a.len() * in_b.len()) as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Undirected test graph
    struct Adjacency(BTreeMap<FieldId, Vec<FieldId>>);

    impl Adjacency {
        fn new(edges: &[(u64, u64)]) -> Self {
            let mut map: BTreeMap<FieldId, Vec<FieldId>> = BTreeMap::new();
            for &(a, b) in edges {
                map.entry(FieldId(a)).or_default().push(FieldId(b));
                map.entry(FieldId(b)).or_default().push(FieldId(a));
            }
            Adjacency(map)
        }
    }

    impl Neighborhood for Adjacency {
        fn neighbors(&self, id: FieldId) -> Vec<FieldId> {
            self.0.get(&id).cloned().unwrap_or_default()
        }
    }

    fn config(max_iterations: usize) -> SimRankConfig {
        SimRankConfig {
            damping: 0.8,
            max_iterations,
            epsilon: 0.0,
            ..SimRankConfig::default()
        }
    }

    fn ids(n: u64) -> Vec<FieldId> {
        (0..n).map(FieldId).collect()
    }

    #[test]
    fn test_two_node_mutual_edge_converges_inside_unit_interval() {
        let graph = Adjacency::new(&[(0, 1)]);
        let (matrix, report) = SimRank::new(config(10)).compute(&graph, &ids(2));
        let s = matrix.score(FieldId(0), FieldId(1));
        assert!(s > 0.0 && s < 1.0);
        // fixed point of s = c (1 + s) / 2
        assert!((s - 0.8 / 1.2).abs() < 0.01);
        assert_eq!(report.iterations, 10);
        assert!(!report.converged);
    }

    #[test]
    fn test_isolated_fields_score_zero() {
        let graph = Adjacency::new(&[(0, 1)]);
        let (matrix, _) = SimRank::new(config(5)).compute(&graph, &ids(3));
        assert_eq!(matrix.score(FieldId(2), FieldId(0)), 0.0);
        assert_eq!(matrix.score(FieldId(2), FieldId(1)), 0.0);
        assert_eq!(matrix.score(FieldId(2), FieldId(2)), 1.0);
    }

    #[test]
    fn test_non_reflexive_bipartite_pair_stays_zero() {
        let graph = Adjacency::new(&[(0, 1)]);
        let cfg = SimRankConfig { reflexive: false, ..config(5) };
        let (matrix, _) = SimRank::new(cfg).compute(&graph, &ids(2));
        assert_eq!(matrix.score(FieldId(0), FieldId(1)), 0.0);
    }

    #[test]
    fn test_shared_neighbor_makes_fields_similar() {
        // 0 and 2 both hang off 1
        let graph = Adjacency::new(&[(0, 1), (1, 2)]);
        let cfg = SimRankConfig { reflexive: false, ..config(5) };
        let (matrix, _) = SimRank::new(cfg).compute(&graph, &ids(3));
        assert!((matrix.score(FieldId(0), FieldId(2)) - 0.8).abs() < 1e-6);
        assert_eq!(matrix.similar_to(FieldId(0), 0.5), vec![(FieldId(2), matrix.score(FieldId(0), FieldId(2)))]);
    }

    #[test]
    fn test_epsilon_stops_early() {
        let graph = Adjacency::new(&[(0, 1)]);
        let cfg = SimRankConfig { epsilon: 0.05, ..config(100) };
        let (_, report) = SimRank::new(cfg).compute(&graph, &ids(2));
        assert!(report.converged);
        assert!(report.iterations < 100);
        assert!(*report.deltas.last().unwrap() < 0.05);
    }

    #[test]
    fn test_empty_graph() {
        let graph = Adjacency::new(&[]);
        let (matrix, report) = SimRank::new(config(3)).compute(&graph, &[]);
        assert!(matrix.is_empty());
        assert!(report.converged);
    }

    #[test]
    fn test_matrix_serde_roundtrip_restores_lookup() {
        let graph = Adjacency::new(&[(0, 1)]);
        let (matrix, _) = SimRank::new(config(3)).compute(&graph, &ids(2));
        let json = serde_json::to_string(&matrix).unwrap();
        let parsed: SimRankMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.score(FieldId(0), FieldId(1)), matrix.score(FieldId(0), FieldId(1)));
    }

    fn edges_strategy() -> impl Strategy<Value = Vec<(u64, u64)>> {
        proptest::collection::vec((0u64..8, 0u64..8), 0..20)
    }

    proptest! {
        #[test]
        fn prop_scores_stay_in_unit_interval(edges in edges_strategy(), rounds in 1usize..8, reflexive in any::<bool>()) {
            let graph = Adjacency::new(&edges);
            let cfg = SimRankConfig { reflexive, ..config(rounds) };
            let (matrix, _) = SimRank::new(cfg).compute(&graph, &ids(8));
            for (a, b, s) in matrix.entries() {
                prop_assert!((0.0..=1.0).contains(&s));
                if a == b {
                    prop_assert_eq!(s, 1.0);
                }
                prop_assert_eq!(s, matrix.score(b, a));
            }
        }

        #[test]
        fn prop_deltas_shrink_after_warm_up(edges in edges_strategy()) {
            let graph = Adjacency::new(&edges);
            let (_, report) = SimRank::new(config(8)).compute(&graph, &ids(8));
            for pair in report.deltas.windows(2).skip(1) {
                prop_assert!(pair[1] <= pair[0] + 1e-4);
            }
        }
    }
}
