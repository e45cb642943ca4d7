//! Collaborator interfaces
//!
//! The discovery core never owns raw data. It reads column values and signatures from a
//! [`ColumnStore`] and resolves keywords through a [`SearchIndex`].

use serde::{Deserialize, Serialize};

use crate::{Field, Hit, Result, Signature};

/// Which part of the corpus a keyword is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordKind {
    TableTitle,
    ColumnName,
    ContentText,
}

/// Column value and metadata store
pub trait ColumnStore: Send + Sync {
    /// All values of a field, in storage order
    fn get_values(&self, field: &Field) -> Result<Vec<String>>;

    /// Signature computed for the field at ingestion
    fn get_signature(&self, field: &Field) -> Result<Signature>;

    /// Every field known to the store, in ascending id order
    fn get_all_fields(&self) -> Vec<Field>;

    /// The first `n` values of a field
    fn peek(&self, field: &Field, n: usize) -> Result<Vec<String>> {
        let mut values = self.get_values(field)?;
        values.truncate(n);
        Ok(values)
    }
}

/// Document/search index over table titles, column names and content
pub trait SearchIndex: Send + Sync {
    fn search(&self, keyword: &str, kind: KeywordKind, limit: usize) -> Vec<Hit>;
}
