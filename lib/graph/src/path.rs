//! Join-path search between two tables

use fieldgraph_core::{Field, FieldId, PathDedup, TableRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::index::FieldIndex;
use crate::Neighborhood;

/// Fields from a source-table field to a target-table field, one hop per step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPath {
    pub fields: Vec<Field>,
}

impl JoinPath {
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn hops(&self) -> usize {
        self.fields.len().saturating_sub(1)
    }

    pub fn first(&self) -> Option<&Field> {
        self.fields.first()
    }

    pub fn last(&self) -> Option<&Field> {
        self.fields.last()
    }

    pub fn ids(&self) -> Vec<FieldId> {
        self.fields.iter().map(Field::id).collect()
    }
}

impl fmt::Display for JoinPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// One expansion step: the field reached and the step it was reached from
#[derive(Debug, Clone, Copy)]
struct Visit {
    field: FieldId,
    parent: Option<usize>,
}

/// Bounded breadth expansion over any relation graph
pub struct JoinPathSearch<'a, G: ?Sized> {
    graph: &'a G,
    index: &'a FieldIndex,
    dedup: PathDedup,
}

impl<'a, G: Neighborhood + ?Sized> JoinPathSearch<'a, G> {
    pub fn new(graph: &'a G, index: &'a FieldIndex, dedup: PathDedup) -> Self {
        Self { graph, index, dedup }
    }

    /// Paths from any field of `from` to any field of `to` with at most `max_hops` hops.
    ///
    /// Runs exactly `max_hops` expansion rounds. A field reached earlier is expanded again
    /// when reached through another parent, but never straight back along the edge it
    /// came in on. Paths come back in discovery order.
    ///
    /// The number of visits still grows with the branching factor to the power of
    /// `max_hops`, so dense graphs need a small bound.
    pub fn search(&self, from: &TableRef, to: &TableRef, max_hops: usize) -> Vec<JoinPath> {
        let mut visits: Vec<Visit> = self
            .index
            .table_fields(from)
            .iter()
            .map(|&field| Visit { field, parent: None })
            .collect();
        let mut frontier: Vec<usize> = (0..visits.len()).collect();

        for round in 0..max_hops {
            let mut next = Vec::new();
            for &pos in &frontier {
                let current = visits[pos].field;
                let came_from = visits[pos].parent.map(|p| visits[p].field);
                for neighbor in self.graph.neighbors(current) {
                    if neighbor == current || Some(neighbor) == came_from {
                        continue;
                    }
                    next.push(visits.len());
                    visits.push(Visit {
                        field: neighbor,
                        parent: Some(pos),
                    });
                }
            }
            debug!(round = round + 1, frontier = next.len(), "join path expansion");
            frontier = next;
        }

        let mut seen: HashSet<Vec<FieldId>> = HashSet::new();
        let mut paths = Vec::new();
        for visit in &visits {
            if visit.parent.is_none() || !self.index.in_table(visit.field, to) {
                continue;
            }
            let ids = self.walk_back(&visits, visit, from);
            let key = match self.dedup {
                PathDedup::Endpoints => vec![ids[0], ids[ids.len() - 1]],
                PathDedup::FullPath => ids.clone(),
            };
            if !seen.insert(key) {
                continue;
            }
            let fields: Option<Vec<Field>> = ids.iter().map(|id| self.index.get(*id).cloned()).collect();
            match fields {
                Some(fields) => paths.push(JoinPath { fields }),
                None => debug!("path through unindexed field dropped"),
            }
        }
        paths
    }

    /// Follow parents up to the nearest ancestor in `from`, returned source first
    fn walk_back(&self, visits: &[Visit], end: &Visit, from: &TableRef) -> Vec<FieldId> {
        let mut ids = vec![end.field];
        let mut parent = end.parent;
        while let Some(pos) = parent {
            let visit = visits[pos];
            ids.push(visit.field);
            if self.index.in_table(visit.field, from) {
                break;
            }
            parent = visit.parent;
        }
        ids.reverse();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Edges(BTreeMap<FieldId, Vec<FieldId>>);

    impl Edges {
        fn undirected(pairs: &[(&Field, &Field)]) -> Self {
            let mut map: BTreeMap<FieldId, Vec<FieldId>> = BTreeMap::new();
            for (a, b) in pairs {
                map.entry(a.id()).or_default().push(b.id());
                map.entry(b.id()).or_default().push(a.id());
            }
            Edges(map)
        }
    }

    impl Neighborhood for Edges {
        fn neighbors(&self, id: FieldId) -> Vec<FieldId> {
            self.0.get(&id).cloned().unwrap_or_default()
        }
    }

    fn field(table: &str, column: &str) -> Field {
        Field::new("db", table, column)
    }

    #[test]
    fn test_single_hop_path() {
        let (a, b, c) = (field("t1", "a"), field("t1", "b"), field("t2", "c"));
        let index = FieldIndex::new(vec![a.clone(), b.clone(), c.clone()]);
        let graph = Edges::undirected(&[(&a, &c)]);

        let paths = JoinPathSearch::new(&graph, &index, PathDedup::Endpoints).search(
            &TableRef::new("db", "t1"),
            &TableRef::new("db", "t2"),
            1,
        );
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].fields, vec![a, c]);
        assert_eq!(paths[0].to_string(), "db.t1.a -> db.t2.c");
    }

    #[test]
    fn test_zero_hops_finds_nothing() {
        let (a, c) = (field("t1", "a"), field("t2", "c"));
        let index = FieldIndex::new(vec![a.clone(), c.clone()]);
        let graph = Edges::undirected(&[(&a, &c)]);
        let search = JoinPathSearch::new(&graph, &index, PathDedup::Endpoints);
        assert!(search.search(&a.table_ref(), &c.table_ref(), 0).is_empty());
    }

    fn diamond() -> (FieldIndex, Edges, [Field; 4]) {
        // a -> x -> c and a -> y -> c
        let a = field("t1", "a");
        let x = field("mid1", "x");
        let y = field("mid2", "y");
        let c = field("t2", "c");
        let index = FieldIndex::new(vec![a.clone(), x.clone(), y.clone(), c.clone()]);
        let graph = Edges::undirected(&[(&a, &x), (&x, &c), (&a, &y), (&y, &c)]);
        (index, graph, [a, x, y, c])
    }

    #[test]
    fn test_endpoint_dedup_keeps_first_route_only() {
        let (index, graph, [a, _, _, c]) = diamond();
        let paths = JoinPathSearch::new(&graph, &index, PathDedup::Endpoints).search(&a.table_ref(), &c.table_ref(), 2);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 3);
        assert_eq!(paths[0].first(), Some(&a));
        assert_eq!(paths[0].last(), Some(&c));
    }

    #[test]
    fn test_full_path_dedup_keeps_every_route() {
        let (index, graph, [a, x, y, c]) = diamond();
        let paths = JoinPathSearch::new(&graph, &index, PathDedup::FullPath).search(&a.table_ref(), &c.table_ref(), 2);
        let routes: Vec<Vec<Field>> = paths.into_iter().map(|p| p.fields).collect();
        assert_eq!(routes.len(), 2);
        assert!(routes.contains(&vec![a.clone(), x, c.clone()]));
        assert!(routes.contains(&vec![a, y, c]));
    }

    #[test]
    fn test_paths_respect_hop_bound() {
        let (index, graph, [a, _, _, c]) = diamond();
        for max_hops in 0..5 {
            let paths = JoinPathSearch::new(&graph, &index, PathDedup::FullPath).search(&a.table_ref(), &c.table_ref(), max_hops);
            assert!(paths.iter().all(|p| p.len() <= max_hops + 1));
        }
    }

    #[test]
    fn test_walk_stops_at_first_source_ancestor() {
        // a -> b stays inside t1 before reaching c
        let (a, b, c) = (field("t1", "a"), field("t1", "b"), field("t2", "c"));
        let index = FieldIndex::new(vec![a.clone(), b.clone(), c.clone()]);
        let graph = Edges::undirected(&[(&a, &b), (&b, &c)]);
        let paths = JoinPathSearch::new(&graph, &index, PathDedup::FullPath).search(&a.table_ref(), &c.table_ref(), 3);
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.fields == vec![b.clone(), c.clone()]));
    }

    #[test]
    fn test_expansion_never_bounces_back_to_parent() {
        // triangle a - x - c with a direct a - c edge
        let (a, x, c) = (field("t1", "a"), field("mid", "x"), field("t2", "c"));
        let index = FieldIndex::new(vec![a.clone(), x.clone(), c.clone()]);
        let graph = Edges::undirected(&[(&a, &x), (&x, &c), (&a, &c)]);

        let paths = JoinPathSearch::new(&graph, &index, PathDedup::FullPath).search(&a.table_ref(), &c.table_ref(), 3);
        let routes: Vec<Vec<Field>> = paths.into_iter().map(|p| p.fields).collect();
        assert_eq!(routes, vec![vec![a.clone(), c.clone()], vec![a, x, c]]);
    }

    #[test]
    fn test_unknown_tables_yield_no_paths() {
        let (index, graph, [a, ..]) = diamond();
        let search = JoinPathSearch::new(&graph, &index, PathDedup::Endpoints);
        assert!(search.search(&TableRef::new("db", "nope"), &a.table_ref(), 3).is_empty());
        assert!(search.search(&a.table_ref(), &TableRef::new("db", "nope"), 3).is_empty());
    }
}
