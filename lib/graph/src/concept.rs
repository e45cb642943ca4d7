//! Concept graph
//!
//! Fields connected by content similarity (signature comparison) and, optionally, schema
//! similarity (column-name edit distance). Same-table adjacency is not stored: it is
//! layered on demand through [`LayeredConceptGraph`].

use fieldgraph_core::text::name_tokens;
use fieldgraph_core::text::edit_distance;
use fieldgraph_core::{FieldId, Signature, SignatureComparator, SimilarityConfig, ValueKind};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::index::FieldIndex;
use crate::Neighborhood;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    ContentSim,
    SchemaSim,
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEdge {
    pub target: FieldId,
    pub relation: Relation,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptGraph {
    adjacency: BTreeMap<FieldId, Vec<ConceptEdge>>,
}

impl ConceptGraph {
    /// Outgoing edges of a field. Unknown fields have none.
    pub fn edges(&self, id: FieldId) -> &[ConceptEdge] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_of(&self, id: FieldId, relation: Relation) -> impl Iterator<Item = &ConceptEdge> {
        self.edges(id).iter().filter(move |e| e.relation == relation)
    }

    pub fn nodes(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.adjacency.keys().copied()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// View of this graph with same-table edges added on demand
    pub fn with_table_overlay<'a>(&'a self, index: &'a FieldIndex) -> LayeredConceptGraph<'a> {
        LayeredConceptGraph { base: self, index }
    }
}

/// Content neighbors only
impl Neighborhood for ConceptGraph {
    fn neighbors(&self, id: FieldId) -> Vec<FieldId> {
        self.edges_of(id, Relation::ContentSim).map(|e| e.target).collect()
    }
}

/// Base concept graph plus same-table adjacency, without copying the base
#[derive(Debug, Clone, Copy)]
pub struct LayeredConceptGraph<'a> {
    base: &'a ConceptGraph,
    index: &'a FieldIndex,
}

impl<'a> LayeredConceptGraph<'a> {
    /// Base edges followed by TABLE edges to every other field of the same table
    pub fn edges(&self, id: FieldId) -> Vec<ConceptEdge> {
        let mut edges = self.base.edges(id).to_vec();
        edges.extend(self.index.table_siblings(id).into_iter().map(|target| ConceptEdge {
            target,
            relation: Relation::Table,
            score: 1.0,
        }));
        edges
    }

    #[inline]
    pub fn base(&self) -> &'a ConceptGraph {
        self.base
    }
}

impl Neighborhood for LayeredConceptGraph<'_> {
    fn neighbors(&self, id: FieldId) -> Vec<FieldId> {
        let targets: BTreeSet<FieldId> = self
            .base
            .edges(id)
            .iter()
            .map(|e| e.target)
            .chain(self.index.table_siblings(id))
            .collect();
        targets.into_iter().collect()
    }
}

pub struct ConceptGraphBuilder {
    comparator: SignatureComparator,
    schema_edges: bool,
    schema_sim_threshold: usize,
}

impl ConceptGraphBuilder {
    pub fn new(config: &SimilarityConfig) -> Self {
        Self {
            comparator: SignatureComparator::new(config),
            schema_edges: config.schema_edges,
            schema_sim_threshold: config.schema_sim_threshold,
        }
    }

    /// Compare every field against the other fields of its signature kind.
    ///
    /// Each field's edge list is computed by one worker, so pairs are evaluated from both
    /// sides. Fields without a signature become isolated nodes.
    pub fn build(&self, index: &FieldIndex, signatures: &BTreeMap<FieldId, Signature>) -> ConceptGraph {
        let mut buckets: BTreeMap<ValueKind, Vec<FieldId>> = BTreeMap::new();
        for id in index.ids() {
            match signatures.get(&id) {
                Some(sig) => buckets.entry(sig.kind()).or_default().push(id),
                None => debug!(field = %id, "no signature, skipped"),
            }
        }

        let mut adjacency: BTreeMap<FieldId, Vec<ConceptEdge>> =
            index.ids().into_iter().map(|id| (id, Vec::new())).collect();

        for (kind, members) in &buckets {
            debug!(?kind, size = members.len(), "comparing bucket");
            let rows: Vec<(FieldId, Vec<ConceptEdge>)> = members
                .par_iter()
                .map(|&id| (id, self.content_edges(id, members, signatures)))
                .collect();
            for (id, edges) in rows {
                adjacency.entry(id).or_default().extend(edges);
            }
        }

        if self.schema_edges {
            let names: Vec<(FieldId, Vec<String>)> = index
                .fields()
                .map(|(id, f)| (id, name_tokens(&f.column)))
                .collect();
            let rows: Vec<(FieldId, Vec<ConceptEdge>)> = names
                .par_iter()
                .map(|(id, tokens)| (*id, self.schema_edges_for(*id, tokens, &names)))
                .collect();
            for (id, edges) in rows {
                adjacency.entry(id).or_default().extend(edges);
            }
        }

        for edges in adjacency.values_mut() {
            edges.sort_by(|a, b| (a.target, a.relation).cmp(&(b.target, b.relation)));
        }

        ConceptGraph { adjacency }
    }

    fn content_edges(
        &self,
        id: FieldId,
        members: &[FieldId],
        signatures: &BTreeMap<FieldId, Signature>,
    ) -> Vec<ConceptEdge> {
        let Some(sig) = signatures.get(&id) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|other| **other != id)
            .filter_map(|other| {
                let other_sig = signatures.get(other)?;
                self.comparator.compare(sig, other_sig).map(|score| ConceptEdge {
                    target: *other,
                    relation: Relation::ContentSim,
                    score,
                })
            })
            .collect()
    }

    fn schema_edges_for(
        &self,
        id: FieldId,
        tokens: &[String],
        names: &[(FieldId, Vec<String>)],
    ) -> Vec<ConceptEdge> {
        names
            .iter()
            .filter(|(other, _)| *other != id)
            .filter_map(|(other, other_tokens)| {
                let distance = tokens
                    .iter()
                    .flat_map(|a| other_tokens.iter().map(move |b| edit_distance(a, b)))
                    .min()?;
                (distance < self.schema_sim_threshold).then(|| ConceptEdge {
                    target: *other,
                    relation: Relation::SchemaSim,
                    score: 1.0 / (1.0 + distance as f32),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldgraph_core::Field;

    fn sig(values: &[&str]) -> Signature {
        Signature::compute(&values.iter().map(|s| s.to_string()).collect::<Vec<_>>(), 32)
    }

    fn fixture() -> (FieldIndex, BTreeMap<FieldId, Signature>, [FieldId; 4]) {
        let a = Field::new("db", "t1", "city");
        let b = Field::new("db", "t2", "town");
        let c = Field::new("db", "t2", "amount");
        let d = Field::new("db", "t3", "nothing");
        let ids = [a.id(), b.id(), c.id(), d.id()];
        let index = FieldIndex::new(vec![a, b, c, d]);
        let mut signatures = BTreeMap::new();
        signatures.insert(ids[0], sig(&["boston", "chicago", "denver"]));
        signatures.insert(ids[1], sig(&["denver", "boston", "chicago"]));
        signatures.insert(ids[2], sig(&["1", "2", "3"]));
        (index, signatures, ids)
    }

    #[test]
    fn test_content_edges_are_symmetric() {
        let (index, signatures, [a, b, c, d]) = fixture();
        let graph = ConceptGraphBuilder::new(&SimilarityConfig::default()).build(&index, &signatures);

        assert_eq!(graph.neighbors(a), vec![b]);
        assert_eq!(graph.neighbors(b), vec![a]);
        // numeric field is alone in its bucket
        assert!(graph.neighbors(c).is_empty());
        // field without signature is kept as an isolated node
        assert!(graph.edges(d).is_empty());
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_table_overlay_does_not_touch_base() {
        let (index, signatures, [a, b, c, _]) = fixture();
        let graph = ConceptGraphBuilder::new(&SimilarityConfig::default()).build(&index, &signatures);
        let before = graph.edge_count();

        let layered = graph.with_table_overlay(&index);
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(layered.neighbors(b), expected);
        assert!(layered.edges(c).iter().any(|e| e.relation == Relation::Table && e.target == b));
        assert_eq!(graph.edge_count(), before);
    }

    #[test]
    fn test_unknown_field_has_no_neighbors() {
        let (index, signatures, _) = fixture();
        let graph = ConceptGraphBuilder::new(&SimilarityConfig::default()).build(&index, &signatures);
        assert!(graph.neighbors(FieldId(42)).is_empty());
        assert!(graph.with_table_overlay(&index).neighbors(FieldId(42)).is_empty());
    }

    #[test]
    fn test_schema_edges() {
        let price = Field::new("db", "orders", "unit_price");
        let prices = Field::new("db", "catalog", "prices");
        let zip = Field::new("db", "stores", "zip");
        let index = FieldIndex::new(vec![price.clone(), prices.clone(), zip.clone()]);
        let config = SimilarityConfig {
            schema_edges: true,
            schema_sim_threshold: 2,
            ..SimilarityConfig::default()
        };
        let graph = ConceptGraphBuilder::new(&config).build(&index, &BTreeMap::new());

        // "price" and "prices" are one edit apart
        let edge = graph.edges_of(price.id(), Relation::SchemaSim).next().unwrap();
        assert_eq!(edge.target, prices.id());
        assert_eq!(edge.score, 0.5);
        assert!(graph.edges_of(prices.id(), Relation::SchemaSim).any(|e| e.target == price.id()));
        assert!(graph.edges(zip.id()).is_empty());
        // schema edges are not content neighbors
        assert!(graph.neighbors(price.id()).is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let (index, signatures, _) = fixture();
        let builder = ConceptGraphBuilder::new(&SimilarityConfig::default());
        assert_eq!(builder.build(&index, &signatures), builder.build(&index, &signatures));
    }
}
