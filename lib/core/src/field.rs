use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{Error, Result};

/// Stable numeric identity of a field, derived from its `(database, table, column)` triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

impl FieldId {
    /// Derive the id from a field triple.
    ///
    /// The first eight bytes of a SHA-256 digest over the unit-separated triple.
    pub fn derive(database: &str, table: &str, column: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(database.as_bytes());
        hasher.update([0x1f]);
        hasher.update(table.as_bytes());
        hasher.update([0x1f]);
        hasher.update(column.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        FieldId(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FieldId {
    fn from(id: u64) -> Self {
        FieldId(id)
    }
}

/// A column of a dataset table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    pub database: String,
    pub table: String,
    pub column: String,
}

impl Field {
    #[inline]
    #[must_use]
    pub fn new(database: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// Build a field, rejecting empty components
    pub fn parse(database: &str, table: &str, column: &str) -> Result<Self> {
        if database.trim().is_empty() || table.trim().is_empty() || column.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "malformed field identity ({:?}, {:?}, {:?})",
                database, table, column
            )));
        }
        Ok(Self::new(database, table, column))
    }

    #[inline]
    pub fn id(&self) -> FieldId {
        FieldId::derive(&self.database, &self.table, &self.column)
    }

    #[inline]
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.database.clone(), self.table.clone())
    }

    #[inline]
    pub fn in_table(&self, table: &TableRef) -> bool {
        self.database == table.database && self.table == table.table
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.table, self.column)
    }
}

impl From<(&str, &str, &str)> for Field {
    fn from((database, table, column): (&str, &str, &str)) -> Self {
        Field::new(database, table, column)
    }
}

/// A table, identified by database and table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    #[inline]
    #[must_use]
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

impl From<(&str, &str)> for TableRef {
    fn from((database, table): (&str, &str)) -> Self {
        TableRef::new(database, table)
    }
}

/// A single field result with a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: FieldId,
    pub field: Field,
    pub score: f32,
}

impl Hit {
    #[inline]
    #[must_use]
    pub fn new(field: Field, score: f32) -> Self {
        Self {
            id: field.id(),
            field,
            score,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3})", self.field, self.score)
    }
}
