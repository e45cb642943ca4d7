//! # fieldgraph
//!
//! Dataset discovery over the columns of many tables.
//!
//! fieldgraph sketches every column once, connects columns that look alike (content and
//! name), that join (value overlap) and that sit in similar places of the graph (SimRank),
//! and answers discovery questions through a small composable query algebra.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! fieldgraph build --columns columns.json --name shop
//! fieldgraph search --model shop --keyword city --scope column
//! fieldgraph join-path --model shop --from shop.customers --to shop.orders --max-hops 2
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use fieldgraph::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::default());
//! store.insert_column(Field::new("shop", "customers", "id"), vec!["1".into(), "2".into()]);
//! store.insert_column(Field::new("shop", "orders", "customer_id"), vec!["2".into(), "1".into()]);
//!
//! let model = ModelBuilder::new(DiscoveryConfig::default())?.build("shop", store.as_ref())?;
//! let algebra = Algebra::new(Arc::new(model), store.clone(), store);
//!
//! let joinable = algebra.columns_joinable_with(("shop", "customers", "id"))?;
//! println!("{}", joinable.explain());
//! # Ok::<(), fieldgraph::Error>(())
//! ```
//!
//! ## Crate Structure
//!
//! - `fieldgraph-core` - fields, signatures, config, errors, the in-memory column store
//! - `fieldgraph-graph` - concept graph, join graph, SimRank, join paths, the `Model`
//! - `fieldgraph-query` - DRS results, provenance and the query `Algebra`
//! - `fieldgraph-storage` - snapshots, binary dumps and the model catalog

// Re-export core types
pub use fieldgraph_core::{
    ColumnStore, DiscoveryConfig, Error, Field, FieldId, Hit, KeywordKind, MemoryStore,
    PathDedup, Result, SearchIndex, Signature, TableRef, ValueKind,
};

// Re-export graph types
pub use fieldgraph_graph::{
    ConceptGraph, JoinGraph, JoinPath, Model, ModelBuilder, ModelStats, Relation, SimRankMatrix,
};

// Re-export query types
pub use fieldgraph_query::{Algebra, Drs, DrsMode, IntoDrs, Operation, Scope};

// Re-export storage
pub use fieldgraph_storage::{ModelCatalog, SnapshotDescription};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Algebra, ColumnStore, DiscoveryConfig, Drs, DrsMode, Error, Field, FieldId, Hit,
        IntoDrs, MemoryStore, Model, ModelBuilder, ModelCatalog, Result, Scope, SearchIndex,
        TableRef,
    };
}
