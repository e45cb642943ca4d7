//! Join graph
//!
//! Two fields are joinable when enough distinct values of the smaller one appear in the
//! other. The scan stops as soon as either threshold settles the outcome.

use fieldgraph_core::FieldId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::Neighborhood;

/// Value frequencies of one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueProfile {
    /// Number of raw values, duplicates included
    total: usize,
    frequencies: BTreeMap<String, usize>,
}

impl ValueProfile {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut profile = Self::default();
        for value in values {
            *profile.frequencies.entry(value.into()).or_insert(0) += 1;
            profile.total += 1;
        }
        profile
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn distinct(&self) -> usize {
        self.frequencies.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.frequencies.contains_key(value)
    }
}

/// Early-exit overlap test, scanning `shorter` in ascending value order.
///
/// `th_overlap = fraction * (total(shorter) + total(longer))`, `th_cutoff = total - th_overlap`.
/// Running out of values without crossing either threshold is "not joinable".
pub fn has_overlap(shorter: &ValueProfile, longer: &ValueProfile, fraction: f64) -> bool {
    let total = (shorter.total + longer.total) as f64;
    let th_overlap = fraction * total;
    let th_cutoff = total - th_overlap;

    let mut overlap = 0usize;
    let mut non_overlap = 0usize;
    for value in shorter.frequencies.keys() {
        if longer.contains(value) {
            overlap += 1;
        } else {
            non_overlap += 1;
        }
        if overlap as f64 >= th_overlap {
            return true;
        }
        if non_overlap as f64 > th_cutoff {
            return false;
        }
    }
    false
}

/// Symmetric joinability of two fields.
///
/// The side with fewer distinct values is scanned; on a tie the smaller id is. Empty
/// profiles never join.
pub fn joinable(a: (FieldId, &ValueProfile), b: (FieldId, &ValueProfile), fraction: f64) -> bool {
    let (shorter, longer) = if (a.1.distinct(), a.0) <= (b.1.distinct(), b.0) {
        (a.1, b.1)
    } else {
        (b.1, a.1)
    };
    if shorter.frequencies.is_empty() {
        return false;
    }
    has_overlap(shorter, longer, fraction)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinGraph {
    adjacency: BTreeMap<FieldId, Vec<FieldId>>,
}

impl JoinGraph {
    pub fn contains(&self, id: FieldId) -> bool {
        self.adjacency.contains_key(&id)
    }

    pub fn has_edge(&self, from: FieldId, to: FieldId) -> bool {
        self.adjacency
            .get(&from)
            .is_some_and(|targets| targets.binary_search(&to).is_ok())
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Directed edge count; every joinable pair contributes two
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }
}

impl Neighborhood for JoinGraph {
    fn neighbors(&self, id: FieldId) -> Vec<FieldId> {
        self.adjacency.get(&id).cloned().unwrap_or_default()
    }
}

pub struct JoinGraphBuilder {
    overlap_fraction: f64,
}

impl JoinGraphBuilder {
    pub fn new(overlap_fraction: f64) -> Self {
        Self { overlap_fraction }
    }

    /// Test every pair of profiled fields.
    ///
    /// One worker owns each field's target list; since [`joinable`] is symmetric both
    /// directions agree without coordination.
    pub fn build(&self, profiles: &BTreeMap<FieldId, ValueProfile>) -> JoinGraph {
        let entries: Vec<(FieldId, &ValueProfile)> = profiles.iter().map(|(id, p)| (*id, p)).collect();

        let adjacency: BTreeMap<FieldId, Vec<FieldId>> = entries
            .par_iter()
            .map(|&(id, profile)| {
                let targets: Vec<FieldId> = entries
                    .iter()
                    .filter(|(other, _)| *other != id)
                    .filter(|&&(other, other_profile)| {
                        joinable((id, profile), (other, other_profile), self.overlap_fraction)
                    })
                    .map(|(other, _)| *other)
                    .collect();
                (id, targets)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        let graph = JoinGraph { adjacency };
        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "join graph built");
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn profile(values: &[&str]) -> ValueProfile {
        ValueProfile::new(values.iter().copied())
    }

    #[test]
    fn test_identical_value_sets_join_both_ways() {
        let mut profiles = BTreeMap::new();
        profiles.insert(FieldId(1), profile(&["a", "b", "c"]));
        profiles.insert(FieldId(2), profile(&["a", "b", "c"]));
        let graph = JoinGraphBuilder::new(0.5).build(&profiles);
        assert!(graph.has_edge(FieldId(1), FieldId(2)));
        assert!(graph.has_edge(FieldId(2), FieldId(1)));
        assert!(!graph.has_edge(FieldId(1), FieldId(1)));
    }

    #[test]
    fn test_disjoint_values_do_not_join() {
        let mut profiles = BTreeMap::new();
        profiles.insert(FieldId(1), profile(&["a", "b", "c"]));
        profiles.insert(FieldId(2), profile(&["x", "y", "z"]));
        let graph = JoinGraphBuilder::new(0.5).build(&profiles);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.contains(FieldId(1)));
    }

    #[test]
    fn test_cutoff_exits_before_scanning_everything() {
        // total 8, th_overlap 6, th_cutoff 2: the third miss settles it
        let shorter = profile(&["a", "b", "c", "d"]);
        let longer = profile(&["w", "x", "y", "z"]);
        assert!(!has_overlap(&shorter, &longer, 0.75));

        // one miss first, then enough hits
        let shorter = profile(&["a", "m", "n", "o"]);
        let longer = profile(&["m", "n", "o", "p"]);
        assert!(!has_overlap(&shorter, &longer, 0.5));
        assert!(has_overlap(&shorter, &longer, 0.3));
    }

    #[test]
    fn test_duplicates_raise_the_bar() {
        // three distinct values shared, but six raw values each push th_overlap to 6
        let p = profile(&["a", "a", "b", "b", "c", "c"]);
        let q = profile(&["a", "a", "b", "b", "c", "c"]);
        assert!(!joinable((FieldId(1), &p), (FieldId(2), &q), 0.5));
        assert!(joinable((FieldId(1), &p), (FieldId(2), &q), 0.25));
    }

    #[test]
    fn test_empty_profile_never_joins() {
        let empty = ValueProfile::default();
        let other = profile(&["a"]);
        assert!(!joinable((FieldId(1), &empty), (FieldId(2), &other), 0.0));
        assert!(!joinable((FieldId(1), &empty), (FieldId(2), &empty), 0.0));
    }

    #[test]
    fn test_unknown_field_has_no_neighbors() {
        assert!(JoinGraph::default().neighbors(FieldId(9)).is_empty());
    }

    proptest! {
        #[test]
        fn prop_join_graph_is_symmetric(
            columns in proptest::collection::vec(proptest::collection::vec(0u8..12, 0..10), 1..6),
            fraction in 0.0f64..1.0,
        ) {
            let profiles: BTreeMap<FieldId, ValueProfile> = columns
                .iter()
                .enumerate()
                .map(|(i, values)| (FieldId(i as u64), ValueProfile::new(values.iter().map(|v| v.to_string()))))
                .collect();
            let graph = JoinGraphBuilder::new(fraction).build(&profiles);
            for id in profiles.keys() {
                for target in graph.neighbors(*id) {
                    prop_assert!(graph.has_edge(target, *id));
                }
            }
        }
    }
}
