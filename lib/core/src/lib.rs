//! # fieldgraph Core
//!
//! Core library for fieldgraph dataset discovery.
//!
//! This crate provides the data model and the leaf algorithms everything else builds on:
//!
//! - [`Field`] / [`FieldId`] - column identity and its derived numeric id
//! - [`Hit`] - a scored field, the atom of every query result
//! - [`Signature`] - fixed-size value sketches and their comparison
//! - [`ColumnStore`] / [`SearchIndex`] - the collaborator interfaces
//! - [`MemoryStore`] - in-memory implementation of both, backed by [`BM25Index`]
//!
//! ## Example
//!
//! ```rust
//! use fieldgraph_core::{Field, MemoryStore, ColumnStore, ValueKind};
//!
//! let store = MemoryStore::default();
//! let field = Field::new("shop", "orders", "amount");
//! store.insert_column(field.clone(), vec!["1.5".into(), "2".into(), "7.25".into()]);
//!
//! let signature = store.get_signature(&field).unwrap();
//! assert_eq!(signature.kind(), ValueKind::Numeric);
//! ```

pub mod error;
pub mod field;
pub mod config;
pub mod signature;
pub mod store;
pub mod bm25;
pub mod memory;
pub mod text;

pub use error::{Error, Result};
pub use field::{Field, FieldId, Hit, TableRef};
pub use config::{DiscoveryConfig, JoinConfig, PathDedup, SignatureConfig, SimRankConfig, SimilarityConfig};
pub use signature::{
    classify, compare_numeric, compare_textual, numeric_signature, textual_signature,
    NumericSketch, Signature, SignatureComparator, TextSketch, ValueKind,
};
pub use store::{ColumnStore, KeywordKind, SearchIndex};
pub use bm25::BM25Index;
pub use memory::MemoryStore;
