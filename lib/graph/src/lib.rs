//! # fieldgraph Graph
//!
//! Relation graphs over fields and the immutable [`Model`] that bundles them.
//!
//! - [`ConceptGraph`] - content (and optionally schema) similarity edges, with a same-table
//!   overlay view ([`LayeredConceptGraph`])
//! - [`JoinGraph`] - value-overlap joinability edges
//! - [`SimRankMatrix`] - structural similarity computed over the layered concept graph
//! - [`JoinPathSearch`] - bounded multi-hop paths between two tables
//!
//! A [`ModelBuilder`] reads a [`ColumnStore`](fieldgraph_core::ColumnStore) once and returns a
//! [`Model`]; nothing is mutated after that, so models can be shared freely across threads.

pub mod index;
pub mod concept;
pub mod simrank;
pub mod join;
pub mod path;
pub mod model;

use fieldgraph_core::FieldId;

pub use index::FieldIndex;
pub use concept::{ConceptEdge, ConceptGraph, ConceptGraphBuilder, LayeredConceptGraph, Relation};
pub use simrank::{SimRank, SimRankMatrix, SimRankReport};
pub use join::{JoinGraph, JoinGraphBuilder, ValueProfile};
pub use path::{JoinPath, JoinPathSearch};
pub use model::{Model, ModelBuilder, ModelStats};

/// Adjacency lookup shared by every relation graph.
///
/// Unknown ids have no neighbors; lookups never fail.
pub trait Neighborhood {
    fn neighbors(&self, id: FieldId) -> Vec<FieldId>;
}

impl<T: Neighborhood + ?Sized> Neighborhood for &T {
    fn neighbors(&self, id: FieldId) -> Vec<FieldId> {
        (**self).neighbors(id)
    }
}
