//! Conversion of operator inputs into result sets

use fieldgraph_core::{Error, Field, FieldId, Hit, Result};
use fieldgraph_graph::Model;

use crate::drs::Drs;

/// Anything an operator accepts as input: a field id, a field, a
/// `(database, table, column)` triple, a hit, or a previous result.
pub trait IntoDrs {
    fn into_drs(self, model: &Model) -> Result<Drs>;
}

impl IntoDrs for Drs {
    fn into_drs(self, _model: &Model) -> Result<Drs> {
        Ok(self)
    }
}

impl IntoDrs for &Drs {
    fn into_drs(self, _model: &Model) -> Result<Drs> {
        Ok(self.clone())
    }
}

impl IntoDrs for Hit {
    fn into_drs(self, _model: &Model) -> Result<Drs> {
        Ok(Drs::origin(self))
    }
}

impl IntoDrs for &Hit {
    fn into_drs(self, _model: &Model) -> Result<Drs> {
        Ok(Drs::origin(self.clone()))
    }
}

/// Ids carry no names, so they must be known to the model
impl IntoDrs for FieldId {
    fn into_drs(self, model: &Model) -> Result<Drs> {
        let field = model
            .field(self)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("field id {}", self)))?;
        Ok(Drs::origin(Hit::new(field, 0.0)))
    }
}

impl IntoDrs for Field {
    fn into_drs(self, _model: &Model) -> Result<Drs> {
        Ok(Drs::origin(Hit::new(self, 0.0)))
    }
}

impl IntoDrs for &Field {
    fn into_drs(self, model: &Model) -> Result<Drs> {
        self.clone().into_drs(model)
    }
}

impl IntoDrs for (&str, &str, &str) {
    fn into_drs(self, model: &Model) -> Result<Drs> {
        let (database, table, column) = self;
        Field::parse(database, table, column)?.into_drs(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldgraph_core::{DiscoveryConfig, MemoryStore};
    use fieldgraph_graph::ModelBuilder;

    fn model() -> Model {
        let store = MemoryStore::default();
        store.insert_column(Field::new("db", "t", "c"), vec!["x".into()]);
        ModelBuilder::new(DiscoveryConfig::default())
            .unwrap()
            .build("test", &store)
            .unwrap()
    }

    #[test]
    fn test_every_input_form_converges_on_one_hit() {
        let model = model();
        let field = Field::new("db", "t", "c");
        let expected = vec![field.id()];

        assert_eq!(field.id().into_drs(&model).unwrap().ids(), expected);
        assert_eq!((&field).into_drs(&model).unwrap().ids(), expected);
        assert_eq!(("db", "t", "c").into_drs(&model).unwrap().ids(), expected);
        assert_eq!(Hit::new(field.clone(), 0.7).into_drs(&model).unwrap().hits()[0].score, 0.7);

        let drs = field.into_drs(&model).unwrap();
        assert_eq!(drs.provenance().kind(), "ORIGIN");
        assert_eq!((&drs).into_drs(&model).unwrap(), drs);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let err = FieldId(7).into_drs(&model()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_malformed_triple_is_invalid_input() {
        let err = ("db", "", "c").into_drs(&model()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
