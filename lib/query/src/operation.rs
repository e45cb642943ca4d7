//! Provenance of a result set
//!
//! Every operator wraps the provenance of its input, so a result carries the full tree of
//! lookups and set operations that produced it.

use fieldgraph_core::{KeywordKind, TableRef};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Result built directly from a field, id or hit
    Origin,
    KeywordLookup {
        keyword: String,
        kind: KeywordKind,
    },
    SchemaMatch {
        keywords: Vec<String>,
    },
    TableColumns {
        table: TableRef,
    },
    ContentSimilar {
        input: Box<Operation>,
    },
    Joinable {
        input: Box<Operation>,
    },
    StructuralSimilar {
        input: Box<Operation>,
        threshold: f32,
    },
    Union {
        left: Box<Operation>,
        right: Box<Operation>,
    },
    Intersection {
        left: Box<Operation>,
        right: Box<Operation>,
    },
    Difference {
        left: Box<Operation>,
        right: Box<Operation>,
    },
}

impl Operation {
    /// Short tag of the operation
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Origin => "ORIGIN",
            Operation::KeywordLookup { .. } => "KW_LOOKUP",
            Operation::SchemaMatch { .. } => "SCHEMA_SIM",
            Operation::TableColumns { .. } => "TABLE",
            Operation::ContentSimilar { .. } => "CONTENT_SIM",
            Operation::Joinable { .. } => "PKFK",
            Operation::StructuralSimilar { .. } => "STRUCTURE_SIM",
            Operation::Union { .. } => "UNION",
            Operation::Intersection { .. } => "INTERSECTION",
            Operation::Difference { .. } => "DIFFERENCE",
        }
    }

    /// Direct inputs, left to right
    pub fn inputs(&self) -> Vec<&Operation> {
        match self {
            Operation::Origin
            | Operation::KeywordLookup { .. }
            | Operation::SchemaMatch { .. }
            | Operation::TableColumns { .. } => Vec::new(),
            Operation::ContentSimilar { input }
            | Operation::Joinable { input }
            | Operation::StructuralSimilar { input, .. } => vec![input.as_ref()],
            Operation::Union { left, right }
            | Operation::Intersection { left, right }
            | Operation::Difference { left, right } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Number of operations in the tree, this one included
    pub fn size(&self) -> usize {
        1 + self.inputs().into_iter().map(Operation::size).sum::<usize>()
    }

    fn params(&self) -> Option<String> {
        match self {
            Operation::KeywordLookup { keyword, kind } => Some(format!("{:?} in {:?}", keyword, kind)),
            Operation::SchemaMatch { keywords } => Some(format!("{:?}", keywords)),
            Operation::TableColumns { table } => Some(table.to_string()),
            Operation::StructuralSimilar { threshold, .. } => Some(format!("threshold={}", threshold)),
            _ => None,
        }
    }

    /// Indented rendering of the tree, root first
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.to_string());
        out.push('\n');
        for input in self.inputs() {
            input.write_tree(out, depth + 1);
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params() {
            Some(params) => write!(f, "{}({})", self.kind(), params),
            None => write!(f, "{}", self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_renders_tree() {
        let op = Operation::Union {
            left: Box::new(Operation::KeywordLookup {
                keyword: "city".into(),
                kind: KeywordKind::ColumnName,
            }),
            right: Box::new(Operation::ContentSimilar {
                input: Box::new(Operation::Origin),
            }),
        };
        assert_eq!(op.size(), 4);
        assert_eq!(
            op.explain(),
            "UNION\n  KW_LOOKUP(\"city\" in ColumnName)\n  CONTENT_SIM\n    ORIGIN\n"
        );
    }

    #[test]
    fn test_serde_tagging() {
        let op = Operation::TableColumns {
            table: TableRef::new("db", "t"),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "table_columns");
        let parsed: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, op);
    }
}
