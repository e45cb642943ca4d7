//! In-memory column store and keyword index
//!
//! Reference implementation of both collaborator interfaces. Signatures are computed once,
//! when a column is inserted.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

use crate::bm25::BM25Index;
use crate::config::SignatureConfig;
use crate::store::{ColumnStore, KeywordKind, SearchIndex};
use crate::{Error, Field, FieldId, Hit, Result, Signature};

#[derive(Debug, Clone)]
struct StoredColumn {
    field: Field,
    values: Vec<String>,
    signature: Signature,
}

#[derive(Debug, Default)]
struct Inner {
    columns: BTreeMap<FieldId, StoredColumn>,
    tables: BM25Index,
    names: BM25Index,
    content: BM25Index,
}

pub struct MemoryStore {
    config: SignatureConfig,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(config: SignatureConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Insert or replace a column. Values past `max_values_per_column` are dropped.
    pub fn insert_column(&self, field: Field, mut values: Vec<String>) -> FieldId {
        values.truncate(self.config.max_values_per_column);
        let signature = Signature::compute(&values, self.config.size);
        let id = field.id();
        debug!(field = %field, kind = ?signature.kind(), values = values.len(), "column stored");

        // Joined once so the content index sees every distinct token of the column
        let mut distinct: Vec<&str> = values.iter().map(String::as_str).collect();
        distinct.sort_unstable();
        distinct.dedup();
        let content = distinct.join(" ");

        let mut inner = self.inner.write();
        inner.tables.insert_doc(id, &field.table);
        inner.names.insert_doc(id, &field.column);
        inner.content.insert_doc(id, &content);
        inner.columns.insert(id, StoredColumn { field, values, signature });
        id
    }

    pub fn remove_column(&self, field: &Field) -> bool {
        let id = field.id();
        let mut inner = self.inner.write();
        inner.tables.delete_doc(id);
        inner.names.delete_doc(id);
        inner.content.delete_doc(id);
        inner.columns.remove(&id).is_some()
    }

    pub fn field(&self, id: FieldId) -> Option<Field> {
        self.inner.read().columns.get(&id).map(|c| c.field.clone())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn column<T>(&self, field: &Field, f: impl FnOnce(&StoredColumn) -> T) -> Result<T> {
        self.inner
            .read()
            .columns
            .get(&field.id())
            .map(f)
            .ok_or_else(|| Error::NotFound(format!("field {}", field)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(SignatureConfig::default())
    }
}

impl ColumnStore for MemoryStore {
    fn get_values(&self, field: &Field) -> Result<Vec<String>> {
        self.column(field, |c| c.values.clone())
    }

    fn get_signature(&self, field: &Field) -> Result<Signature> {
        self.column(field, |c| c.signature.clone())
    }

    fn get_all_fields(&self) -> Vec<Field> {
        self.inner.read().columns.values().map(|c| c.field.clone()).collect()
    }

    fn peek(&self, field: &Field, n: usize) -> Result<Vec<String>> {
        self.column(field, |c| c.values.iter().take(n).cloned().collect())
    }
}

impl SearchIndex for MemoryStore {
    fn search(&self, keyword: &str, kind: KeywordKind, limit: usize) -> Vec<Hit> {
        let inner = self.inner.read();
        let index = match kind {
            KeywordKind::TableTitle => &inner.tables,
            KeywordKind::ColumnName => &inner.names,
            KeywordKind::ContentText => &inner.content,
        };
        index
            .search(keyword, limit)
            .into_iter()
            .filter_map(|(id, score)| {
                inner
                    .columns
                    .get(&id)
                    .map(|c| Hit::new(c.field.clone(), score))
            })
            .collect()
    }
}
