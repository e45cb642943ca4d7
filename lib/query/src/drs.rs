//! Dataset relation sets
//!
//! A [`Drs`] is an ordered set of hits, unique by field id, together with the
//! [`Operation`] tree that produced it. Set operations compare hits by field identity only;
//! scores and provenance never affect membership.

use ahash::AHashSet;
use fieldgraph_core::{FieldId, Hit, TableRef};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::operation::Operation;

/// Whether a result is read as fields or as the tables they belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrsMode {
    #[default]
    Fields,
    Tables,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drs {
    hits: Vec<Hit>,
    provenance: Operation,
    #[serde(default)]
    mode: DrsMode,
}

impl Drs {
    /// Build a result set. A repeated field keeps its first hit.
    pub fn new(hits: Vec<Hit>, provenance: Operation) -> Self {
        let mut seen = AHashSet::with_capacity(hits.len());
        let hits = hits.into_iter().filter(|h| seen.insert(h.id)).collect();
        Self {
            hits,
            provenance,
            mode: DrsMode::Fields,
        }
    }

    pub fn empty(provenance: Operation) -> Self {
        Self {
            hits: Vec::new(),
            provenance,
            mode: DrsMode::Fields,
        }
    }

    /// Single-hit result with ORIGIN provenance
    pub fn origin(hit: Hit) -> Self {
        Self::new(vec![hit], Operation::Origin)
    }

    #[inline]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    #[inline]
    pub fn provenance(&self) -> &Operation {
        &self.provenance
    }

    #[inline]
    pub fn mode(&self) -> DrsMode {
        self.mode
    }

    /// Same hits and provenance, read in another mode
    #[must_use]
    pub fn set_mode(&self, mode: DrsMode) -> Drs {
        Drs {
            mode,
            ..self.clone()
        }
    }

    pub fn ids(&self) -> Vec<FieldId> {
        self.hits.iter().map(|h| h.id).collect()
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.hits.iter().any(|h| h.id == id)
    }

    /// Distinct tables of the hits, in hit order
    pub fn tables(&self) -> Vec<TableRef> {
        let mut seen = AHashSet::new();
        self.hits
            .iter()
            .map(|h| h.field.table_ref())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Hits of `self`, then hits of `other` not already present
    #[must_use]
    pub fn union(&self, other: &Drs) -> Drs {
        let hits = self.hits.iter().chain(other.hits.iter()).cloned().collect();
        let mut drs = Drs::new(
            hits,
            Operation::Union {
                left: Box::new(self.provenance.clone()),
                right: Box::new(other.provenance.clone()),
            },
        );
        drs.mode = self.mode;
        drs
    }

    /// Hits of `self` whose field is also in `other`
    #[must_use]
    pub fn intersection(&self, other: &Drs) -> Drs {
        let keep: AHashSet<FieldId> = other.hits.iter().map(|h| h.id).collect();
        self.filtered(
            |id| keep.contains(&id),
            Operation::Intersection {
                left: Box::new(self.provenance.clone()),
                right: Box::new(other.provenance.clone()),
            },
        )
    }

    /// Hits of `self` whose field is not in `other`
    #[must_use]
    pub fn difference(&self, other: &Drs) -> Drs {
        let drop: AHashSet<FieldId> = other.hits.iter().map(|h| h.id).collect();
        self.filtered(
            |id| !drop.contains(&id),
            Operation::Difference {
                left: Box::new(self.provenance.clone()),
                right: Box::new(other.provenance.clone()),
            },
        )
    }

    fn filtered(&self, keep: impl Fn(FieldId) -> bool, provenance: Operation) -> Drs {
        Drs {
            hits: self.hits.iter().filter(|h| keep(h.id)).cloned().collect(),
            provenance,
            mode: self.mode,
        }
    }

    /// Provenance tree followed by the hits
    pub fn explain(&self) -> String {
        let mut out = self.provenance.explain();
        for hit in &self.hits {
            out.push_str(&format!("- {}\n", hit));
        }
        out
    }
}

impl<'a> IntoIterator for &'a Drs {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

impl IntoIterator for Drs {
    type Item = Hit;
    type IntoIter = std::vec::IntoIter<Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl fmt::Display for Drs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            DrsMode::Fields => {
                for hit in &self.hits {
                    writeln!(f, "{}", hit)?;
                }
            }
            DrsMode::Tables => {
                for table in self.tables() {
                    writeln!(f, "{}", table)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldgraph_core::Field;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn hit(table: &str, column: &str, score: f32) -> Hit {
        Hit::new(Field::new("db", table, column), score)
    }

    fn drs(hits: Vec<Hit>) -> Drs {
        Drs::new(hits, Operation::Origin)
    }

    #[test]
    fn test_duplicates_keep_first_hit() {
        let d = drs(vec![hit("t", "a", 0.9), hit("t", "b", 0.5), hit("t", "a", 0.1)]);
        assert_eq!(d.len(), 2);
        assert_eq!(d.hits()[0].score, 0.9);
    }

    #[test]
    fn test_set_operations() {
        let a = drs(vec![hit("t", "a", 1.0), hit("t", "b", 1.0)]);
        let b = drs(vec![hit("t", "b", 0.2), hit("u", "c", 0.2)]);

        assert_eq!(a.union(&b).len(), 3);
        assert_eq!(a.intersection(&b).ids(), vec![Field::new("db", "t", "b").id()]);
        assert_eq!(a.difference(&b).ids(), vec![Field::new("db", "t", "a").id()]);
        assert_eq!(a.union(&b).provenance().kind(), "UNION");
        assert_eq!(a.difference(&b).provenance().inputs().len(), 2);
    }

    #[test]
    fn test_tables_mode() {
        let d = drs(vec![hit("t", "a", 1.0), hit("u", "b", 1.0), hit("t", "c", 1.0)]);
        assert_eq!(d.tables(), vec![TableRef::new("db", "t"), TableRef::new("db", "u")]);

        let tables = d.set_mode(DrsMode::Tables);
        assert_eq!(tables.mode(), DrsMode::Tables);
        assert_eq!(d.mode(), DrsMode::Fields);
        assert_eq!(tables.to_string(), "db.t\ndb.u\n");
    }

    #[test]
    fn test_explain_lists_hits_under_provenance() {
        let d = drs(vec![hit("t", "a", 1.0)]);
        assert_eq!(d.explain(), "ORIGIN\n- db.t.a (1.000)\n");
    }

    fn arb_drs() -> impl Strategy<Value = Drs> {
        proptest::collection::vec((0u8..6, 0.0f32..1.0), 0..8).prop_map(|items| {
            drs(items
                .into_iter()
                .map(|(c, score)| hit("t", &format!("c{}", c), score))
                .collect())
        })
    }

    fn id_set(d: &Drs) -> BTreeSet<FieldId> {
        d.ids().into_iter().collect()
    }

    proptest! {
        #[test]
        fn prop_union_is_commutative(a in arb_drs(), b in arb_drs()) {
            prop_assert_eq!(id_set(&a.union(&b)), id_set(&b.union(&a)));
        }

        #[test]
        fn prop_union_is_associative(a in arb_drs(), b in arb_drs(), c in arb_drs()) {
            prop_assert_eq!(id_set(&a.union(&b).union(&c)), id_set(&a.union(&b.union(&c))));
        }

        #[test]
        fn prop_intersection_and_difference_partition(a in arb_drs(), b in arb_drs()) {
            let inter = id_set(&a.intersection(&b));
            let diff = id_set(&a.difference(&b));
            prop_assert!(inter.is_disjoint(&diff));
            let joined: BTreeSet<FieldId> = inter.union(&diff).copied().collect();
            prop_assert_eq!(joined, id_set(&a));
            prop_assert_eq!(inter, id_set(&b.intersection(&a)));
        }

        #[test]
        fn prop_self_difference_is_empty(a in arb_drs()) {
            prop_assert!(a.difference(&a).is_empty());
            prop_assert_eq!(id_set(&a.intersection(&a)), id_set(&a));
        }
    }
}
