//! Query algebra over a built model
//!
//! Operators only read the model, so one [`Algebra`] can serve concurrent queries. Lookups
//! of fields the model does not know produce empty results; configuration misuse and
//! malformed input fail.

use ahash::AHashMap;
use fieldgraph_core::text::best_token_distance;
use fieldgraph_core::{ColumnStore, Error, Field, FieldId, Hit, KeywordKind, Result, SearchIndex, TableRef};
use fieldgraph_graph::{JoinPath, Model, Neighborhood, Relation};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::debug;

use crate::drs::{Drs, DrsMode};
use crate::input::IntoDrs;
use crate::operation::Operation;

/// Candidate fields considered per keyword by [`Algebra::tables_with_schema`]
const SCHEMA_CANDIDATES: usize = 30;

/// Where a keyword is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Whole database. Not supported.
    Database,
    /// Table titles
    Table,
    /// Column names
    Column,
    /// Column values
    Content,
}

impl Scope {
    pub fn keyword_kind(self) -> Result<KeywordKind> {
        match self {
            Scope::Database => Err(Error::Configuration(
                "keyword search over the whole database is not supported".into(),
            )),
            Scope::Table => Ok(KeywordKind::TableTitle),
            Scope::Column => Ok(KeywordKind::ColumnName),
            Scope::Content => Ok(KeywordKind::ContentText),
        }
    }
}

pub struct Algebra {
    model: Arc<Model>,
    index: Arc<dyn SearchIndex>,
    store: Arc<dyn ColumnStore>,
}

impl Algebra {
    pub fn new(model: Arc<Model>, index: Arc<dyn SearchIndex>, store: Arc<dyn ColumnStore>) -> Self {
        Self { model, index, store }
    }

    #[inline]
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn keyword_search(&self, keyword: &str, scope: Scope, max_results: usize) -> Result<Drs> {
        let kind = scope.keyword_kind()?;
        let hits = self.index.search(keyword, kind, max_results);
        debug!(keyword, ?kind, hits = hits.len(), "keyword lookup");
        Ok(Drs::new(
            hits,
            Operation::KeywordLookup {
                keyword: keyword.to_string(),
                kind,
            },
        ))
    }

    /// Content-similar fields of every input hit
    pub fn columns_like(&self, input: impl IntoDrs) -> Result<Drs> {
        self.expand(input, |op| Operation::ContentSimilar { input: op }, |hit| {
            self.model
                .concept()
                .edges_of(hit.id, Relation::ContentSim)
                .map(|e| (e.target, e.score))
                .collect()
        })
    }

    /// Join-graph neighbors of every input hit
    pub fn columns_joinable_with(&self, input: impl IntoDrs) -> Result<Drs> {
        self.expand(input, |op| Operation::Joinable { input: op }, |hit| {
            self.model.join().neighbors(hit.id).into_iter().map(|id| (id, 1.0)).collect()
        })
    }

    /// Fields whose structural similarity to an input hit reaches the configured threshold
    pub fn columns_in_context_with(&self, input: impl IntoDrs) -> Result<Drs> {
        let threshold = self.model.config().simrank.structural_threshold;
        self.expand(
            input,
            |op| Operation::StructuralSimilar { input: op, threshold },
            |hit| self.model.simrank().similar_to(hit.id, threshold),
        )
    }

    /// Fields with a column-name token close to `keyword`, closest first
    pub fn schema_search(&self, keyword: &str, topk: usize) -> Drs {
        Drs::new(
            self.schema_matches(keyword, topk),
            Operation::SchemaMatch {
                keywords: vec![keyword.to_string()],
            },
        )
    }

    /// Tables holding fields that match the keywords, ranked by how many distinct keywords
    /// they match.
    ///
    /// The result is in [`DrsMode::Tables`]; its hits are the matching fields of the top
    /// `topk` tables, each scored by the fraction of keywords its table matched.
    pub fn tables_with_schema(&self, keywords: &[&str], topk: usize) -> Result<Drs> {
        if keywords.is_empty() {
            return Err(Error::InvalidInput("tables_with_schema needs at least one keyword".into()));
        }
        let mut distinct: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.to_lowercase();
            if !distinct.contains(&keyword) {
                distinct.push(keyword);
            }
        }

        // table -> (matched keywords, matched fields), in first-match order
        let mut order: Vec<TableRef> = Vec::new();
        let mut groups: AHashMap<TableRef, (Vec<usize>, Vec<Field>)> = AHashMap::new();
        for (k, keyword) in distinct.iter().enumerate() {
            for hit in self.schema_matches(keyword, SCHEMA_CANDIDATES) {
                let table = hit.field.table_ref();
                let group = groups.entry(table.clone()).or_insert_with(|| {
                    order.push(table);
                    (Vec::new(), Vec::new())
                });
                if !group.0.contains(&k) {
                    group.0.push(k);
                }
                if !group.1.contains(&hit.field) {
                    group.1.push(hit.field);
                }
            }
        }

        let mut ranked: Vec<(TableRef, (Vec<usize>, Vec<Field>))> = order
            .into_iter()
            .filter_map(|table| groups.remove(&table).map(|group| (table, group)))
            .collect();
        ranked.sort_by_key(|(_, (matched, _))| Reverse(matched.len()));

        let total = distinct.len() as f32;
        let hits = ranked
            .into_iter()
            .take(topk)
            .flat_map(|(_, (matched, fields))| {
                let score = matched.len() as f32 / total;
                fields.into_iter().map(move |field| Hit::new(field, score))
            })
            .collect();
        Ok(Drs::new(hits, Operation::SchemaMatch { keywords: distinct }).set_mode(DrsMode::Tables))
    }

    /// Every field of a table
    pub fn columns_of_table(&self, table: &TableRef) -> Drs {
        let fields = self.model.fields();
        let hits = fields
            .table_fields(table)
            .iter()
            .filter_map(|id| fields.get(*id))
            .map(|field| Hit::new(field.clone(), 1.0))
            .collect();
        Drs::new(hits, Operation::TableColumns { table: table.clone() })
    }

    pub fn join_path(&self, from: &TableRef, to: &TableRef, max_hops: usize) -> Vec<JoinPath> {
        self.model.join_paths(from, to, max_hops)
    }

    pub fn schema_join_path(&self, from: &TableRef, to: &TableRef, max_hops: usize) -> Vec<JoinPath> {
        self.model.schema_join_paths(from, to, max_hops)
    }

    /// First `n` values of a field. Unknown fields are an error here.
    pub fn peek(&self, field: &Field, n: usize) -> Result<Vec<String>> {
        self.store.peek(field, n)
    }

    fn schema_matches(&self, keyword: &str, limit: usize) -> Vec<Hit> {
        let threshold = self.model.config().similarity.schema_sim_threshold;
        let mut matches: Vec<(usize, &Field)> = self
            .model
            .fields()
            .fields()
            .filter_map(|(_, field)| {
                best_token_distance(keyword, &field.column)
                    .filter(|d| *d < threshold)
                    .map(|d| (d, field))
            })
            .collect();
        matches.sort_by_key(|(distance, _)| *distance);
        matches
            .into_iter()
            .take(limit)
            .map(|(distance, field)| Hit::new(field.clone(), 1.0 / (1.0 + distance as f32)))
            .collect()
    }

    /// Apply a neighbor lookup to every hit of the input.
    ///
    /// Results are ranked by score, ties keeping discovery order. A field reached from
    /// several inputs keeps its best score.
    fn expand(
        &self,
        input: impl IntoDrs,
        provenance: impl FnOnce(Box<Operation>) -> Operation,
        lookup: impl Fn(&Hit) -> Vec<(FieldId, f32)>,
    ) -> Result<Drs> {
        let source = match input.into_drs(&self.model) {
            Ok(drs) => drs,
            Err(e) if e.is_not_found() => {
                debug!(error = %e, "input not in model, empty result");
                return Ok(Drs::empty(provenance(Box::new(Operation::Origin))));
            }
            Err(e) => return Err(e),
        };

        let mut order = Vec::new();
        let mut best: AHashMap<FieldId, f32> = AHashMap::new();
        for hit in &source {
            for (id, score) in lookup(hit) {
                match best.get_mut(&id) {
                    Some(current) => *current = current.max(score),
                    None => {
                        best.insert(id, score);
                        order.push(id);
                    }
                }
            }
        }

        let mut hits: Vec<Hit> = order
            .into_iter()
            .filter_map(|id| {
                let field = self.model.field(id)?.clone();
                Some(Hit::new(field, best.get(&id).copied().unwrap_or(0.0)))
            })
            .collect();
        hits.sort_by_key(|h| Reverse(OrderedFloat(h.score)));
        Ok(Drs::new(hits, provenance(Box::new(source.provenance().clone()))))
    }
}
