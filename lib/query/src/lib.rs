//! # fieldgraph Query
//!
//! Composable discovery queries over a built [`Model`](fieldgraph_graph::Model).
//!
//! Every operator returns a [`Drs`], and every operator accepts a [`Drs`] (or anything that
//! converts into one through [`IntoDrs`]), so results chain freely:
//!
//! ```rust,ignore
//! let cities = algebra.keyword_search("city", Scope::Column, 10)?;
//! let similar = algebra.columns_like(&cities)?;
//! let joinable = algebra.columns_joinable_with(&cities)?;
//!
//! let both = similar.intersection(&joinable);
//! println!("{}", both.explain());
//! ```

pub mod operation;
pub mod drs;
pub mod input;
pub mod algebra;

pub use operation::Operation;
pub use drs::{Drs, DrsMode};
pub use input::IntoDrs;
pub use algebra::{Algebra, Scope};
