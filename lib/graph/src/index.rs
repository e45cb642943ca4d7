use fieldgraph_core::{Field, FieldId, TableRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field lookup by id and by table.
///
/// Serializes as the plain list of fields; the table grouping is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Field>", into = "Vec<Field>")]
pub struct FieldIndex {
    fields: BTreeMap<FieldId, Field>,
    tables: BTreeMap<TableRef, Vec<FieldId>>,
}

impl FieldIndex {
    pub fn new<I: IntoIterator<Item = Field>>(fields: I) -> Self {
        let mut index = Self::default();
        for field in fields {
            index.insert(field);
        }
        index
    }

    fn insert(&mut self, field: Field) {
        let id = field.id();
        if self.fields.contains_key(&id) {
            return;
        }
        let ids = self.tables.entry(field.table_ref()).or_default();
        // keep table members in ascending id order
        let pos = ids.partition_point(|other| *other < id);
        ids.insert(pos, id);
        self.fields.insert(id, field);
    }

    #[inline]
    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All ids in ascending order
    pub fn ids(&self) -> Vec<FieldId> {
        self.fields.keys().copied().collect()
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.fields.iter().map(|(id, f)| (*id, f))
    }

    /// Fields of a table, ascending by id. Unknown tables have none.
    pub fn table_fields(&self, table: &TableRef) -> &[FieldId] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fields sharing a table with `id`, excluding `id` itself
    pub fn table_siblings(&self, id: FieldId) -> Vec<FieldId> {
        match self.fields.get(&id) {
            Some(field) => self
                .table_fields(&field.table_ref())
                .iter()
                .copied()
                .filter(|other| *other != id)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableRef> {
        self.tables.keys()
    }

    pub fn in_table(&self, id: FieldId, table: &TableRef) -> bool {
        self.fields.get(&id).is_some_and(|f| f.in_table(table))
    }
}

impl From<Vec<Field>> for FieldIndex {
    fn from(fields: Vec<Field>) -> Self {
        FieldIndex::new(fields)
    }
}

impl From<FieldIndex> for Vec<Field> {
    fn from(index: FieldIndex) -> Self {
        index.fields.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_by_table() {
        let index = FieldIndex::new(vec![
            Field::new("db", "a", "x"),
            Field::new("db", "a", "y"),
            Field::new("db", "b", "z"),
        ]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.table_fields(&TableRef::new("db", "a")).len(), 2);
        assert_eq!(index.table_fields(&TableRef::new("db", "missing")).len(), 0);

        let x = Field::new("db", "a", "x").id();
        assert_eq!(index.table_siblings(x), vec![Field::new("db", "a", "y").id()]);
    }

    #[test]
    fn test_same_table_name_in_other_database_is_distinct() {
        let index = FieldIndex::new(vec![Field::new("one", "t", "c"), Field::new("two", "t", "c")]);
        assert_eq!(index.table_fields(&TableRef::new("one", "t")).len(), 1);
        assert_eq!(index.tables().count(), 2);
    }

    #[test]
    fn test_serde_rebuilds_tables() {
        let index = FieldIndex::new(vec![Field::new("db", "a", "x"), Field::new("db", "a", "y")]);
        let json = serde_json::to_string(&index).unwrap();
        let parsed: FieldIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, index);
        assert_eq!(parsed.table_fields(&TableRef::new("db", "a")).len(), 2);
    }
}
