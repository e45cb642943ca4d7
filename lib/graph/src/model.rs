//! Immutable model aggregate and its builder

use fieldgraph_core::{ColumnStore, DiscoveryConfig, Field, FieldId, Result, Signature, TableRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::concept::{ConceptGraph, ConceptGraphBuilder, LayeredConceptGraph};
use crate::index::FieldIndex;
use crate::join::{JoinGraph, JoinGraphBuilder, ValueProfile};
use crate::path::{JoinPath, JoinPathSearch};
use crate::simrank::{SimRank, SimRankMatrix, SimRankReport};

/// Every relation graph over one field set, built once and then read-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    config: DiscoveryConfig,
    fields: FieldIndex,
    concept: ConceptGraph,
    join: JoinGraph,
    simrank: SimRankMatrix,
    simrank_report: SimRankReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub fields: usize,
    pub tables: usize,
    pub concept_edges: usize,
    pub join_edges: usize,
    pub simrank_iterations: usize,
    pub simrank_converged: bool,
}

impl Model {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    #[inline]
    pub fn fields(&self) -> &FieldIndex {
        &self.fields
    }

    #[inline]
    pub fn concept(&self) -> &ConceptGraph {
        &self.concept
    }

    #[inline]
    pub fn join(&self) -> &JoinGraph {
        &self.join
    }

    #[inline]
    pub fn simrank(&self) -> &SimRankMatrix {
        &self.simrank
    }

    pub fn simrank_report(&self) -> &SimRankReport {
        &self.simrank_report
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id)
    }

    /// Concept graph with same-table edges
    pub fn layered(&self) -> LayeredConceptGraph<'_> {
        self.concept.with_table_overlay(&self.fields)
    }

    /// Join paths through the join graph
    pub fn join_paths(&self, from: &TableRef, to: &TableRef, max_hops: usize) -> Vec<JoinPath> {
        JoinPathSearch::new(&self.join, &self.fields, self.config.join.path_dedup).search(from, to, max_hops)
    }

    /// Join paths through content-similarity neighbors
    pub fn schema_join_paths(&self, from: &TableRef, to: &TableRef, max_hops: usize) -> Vec<JoinPath> {
        JoinPathSearch::new(&self.concept, &self.fields, self.config.join.path_dedup).search(from, to, max_hops)
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            fields: self.fields.len(),
            tables: self.fields.tables().count(),
            concept_edges: self.concept.edge_count(),
            join_edges: self.join.edge_count(),
            simrank_iterations: self.simrank_report.iterations,
            simrank_converged: self.simrank_report.converged,
        }
    }
}

pub struct ModelBuilder {
    config: DiscoveryConfig,
}

impl ModelBuilder {
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Read every field of the store once and build all graphs.
    ///
    /// Fields whose signature or values are missing are left out of the graph they would
    /// feed; any other store error aborts the build.
    pub fn build(&self, name: impl Into<String>, store: &dyn ColumnStore) -> Result<Model> {
        let name = name.into();
        let total = Instant::now();

        let start = Instant::now();
        let fields = FieldIndex::new(store.get_all_fields());
        let mut signatures: BTreeMap<FieldId, Signature> = BTreeMap::new();
        let mut profiles: BTreeMap<FieldId, ValueProfile> = BTreeMap::new();
        for (id, field) in fields.fields() {
            match store.get_signature(field) {
                Ok(signature) => {
                    signatures.insert(id, signature);
                }
                Err(e) if e.is_not_found() => debug!(field = %field, "signature missing, skipped"),
                Err(e) => return Err(e),
            }
            match store.get_values(field) {
                Ok(mut values) => {
                    values.truncate(self.config.signature.max_values_per_column);
                    profiles.insert(id, ValueProfile::new(values));
                }
                Err(e) if e.is_not_found() => debug!(field = %field, "values missing, skipped"),
                Err(e) => return Err(e),
            }
        }
        info!(
            model = %name,
            fields = fields.len(),
            signatures = signatures.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded signatures"
        );

        let start = Instant::now();
        let concept = ConceptGraphBuilder::new(&self.config.similarity).build(&fields, &signatures);
        info!(
            model = %name,
            edges = concept.edge_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built concept graph"
        );

        let start = Instant::now();
        let join = JoinGraphBuilder::new(self.config.join.overlap_fraction).build(&profiles);
        info!(
            model = %name,
            edges = join.edge_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built join graph"
        );

        let start = Instant::now();
        let layered = concept.with_table_overlay(&fields);
        let (simrank, simrank_report) = SimRank::new(self.config.simrank.clone()).compute(&layered, &fields.ids());
        info!(
            model = %name,
            iterations = simrank_report.iterations,
            converged = simrank_report.converged,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "computed simrank"
        );

        info!(model = %name, elapsed_ms = total.elapsed().as_millis() as u64, "model built");
        Ok(Model {
            name,
            config: self.config.clone(),
            fields,
            concept,
            join,
            simrank,
            simrank_report,
        })
    }
}
