//! Collaborators the container consumes but does not implement: graph query execution, shape
//! validation and format conversion into graphs. Embedders plug implementations in through
//! these traits.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    container::{InformationContainer, PayloadTriples},
    entity::EntityId,
    error::IcddError,
    graph::{Term, TripleStore},
    vocab::{self, RDF_TYPE},
};

/// One solution of a query: variable name to bound term.
pub type Bindings = IndexMap<String, Term>;

pub trait QueryEngine: Send + Sync {
    fn select(&self, store: &TripleStore, query: &str) -> Result<Vec<Bindings>, IcddError>;

    fn ask(&self, store: &TripleStore, query: &str) -> Result<bool, IcddError> {
        Ok(!self.select(store, query)?.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeViolation {
    pub severity: String,
    pub source_shape: String,
    pub focus_node: String,
    pub path: Option<String>,
    pub message: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeReport {
    pub conforms: bool,
    pub violations: Vec<ShapeViolation>,
}

pub trait ShapeValidator: Send + Sync {
    fn validate(&self, data: &TripleStore, shapes: &TripleStore) -> Result<ShapeReport, IcddError>;
}

/// Turns a source document into statements. A converter whose toolchain is missing returns
/// [`IcddError::ExternalToolUnavailable`].
pub trait FormatConverter: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, source: &Path) -> bool;

    fn convert(&self, source: &Path) -> Result<TripleStore, IcddError>;
}

/// Converts `source` and stores the result as payload triples named after it. An unavailable
/// toolchain is logged and yields `None`.
pub fn convert_into_payload(
    container: &mut InformationContainer,
    converter: &dyn FormatConverter,
    source: &Path,
) -> Result<Option<PayloadTriples>, IcddError> {
    if !converter.accepts(source) {
        let err = IcddError::InvalidArgument(format!(
            "{} cannot convert {source:?}",
            converter.name()
        ));
        tracing::warn!("{err}");
        return Err(err);
    }
    let store = match converter.convert(source) {
        Ok(store) => store,
        Err(IcddError::ExternalToolUnavailable(msg)) => {
            tracing::error!("{} unavailable, {:?} not converted: {msg}", converter.name(), source);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("converted");
    container.create_payload_triples(stem, &store).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field: String,
    pub predicate: String,
    /// Datatype of the literal; `None` writes a plain string.
    pub datatype: Option<String>,
}

/// Ordered table from record fields to predicates. Only listed fields are asserted, in table
/// order, so the graph does not depend on how a record happens to be laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMapping {
    pub class_iri: String,
    pub namespace: String,
    pub fields: Vec<FieldMapping>,
}

impl RecordMapping {
    pub fn new(class_iri: &str, namespace: &str) -> RecordMapping {
        RecordMapping {
            class_iri: class_iri.to_string(),
            namespace: namespace.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: &str, predicate: &str) -> RecordMapping {
        self.fields.push(FieldMapping {
            field: field.to_string(),
            predicate: predicate.to_string(),
            datatype: None,
        });
        self
    }

    pub fn typed_field(mut self, field: &str, predicate: &str, datatype: &str) -> RecordMapping {
        self.fields.push(FieldMapping {
            field: field.to_string(),
            predicate: predicate.to_string(),
            datatype: Some(datatype.to_string()),
        });
        self
    }

    /// Asserts one node per record. Records that are not JSON objects are logged and skipped;
    /// missing or null fields are left out.
    pub fn apply(&self, store: &mut TripleStore, records: &[Value]) -> Vec<EntityId> {
        let type_name = vocab::local_name(&self.class_iri);
        let mut subjects = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let Some(object) = record.as_object() else {
                tracing::warn!("record {i} is not an object, skipped");
                continue;
            };
            let id = EntityId::mint(&self.namespace, type_name);
            store.assert(id.term(), RDF_TYPE, Term::iri(self.class_iri.as_str()));
            for mapping in &self.fields {
                let lexical = match object.get(&mapping.field) {
                    None | Some(Value::Null) => continue,
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                };
                let literal = match &mapping.datatype {
                    Some(datatype) => Term::typed(lexical, datatype),
                    None => Term::literal(lexical),
                };
                store.assert(id.term(), &mapping.predicate, literal);
            }
            subjects.push(id);
        }
        subjects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TurtleCodec;
    use serde_json::json;
    use std::sync::Arc;
    use test_log::test;

    struct Stub {
        available: bool,
    }

    impl FormatConverter for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn accepts(&self, source: &Path) -> bool {
            source.extension().is_some_and(|e| e == "csv")
        }

        fn convert(&self, source: &Path) -> Result<TripleStore, IcddError> {
            if !self.available {
                return Err(IcddError::ExternalToolUnavailable("stub-cli".to_string()));
            }
            let text = std::fs::read_to_string(source)?;
            let records: Vec<Value> = text
                .lines()
                .map(|line| json!({ "name": line }))
                .collect();
            let mut store = TripleStore::with_base("https://example.org/rows");
            RecordMapping::new("https://example.org/vocab#Row", "https://example.org/rows")
                .field("name", "https://example.org/vocab#name")
                .apply(&mut store, &records);
            Ok(store)
        }
    }

    #[test]
    fn test_mapping_follows_table_order() {
        let mapping = RecordMapping::new("https://example.org/v#Wall", "https://example.org/walls")
            .field("name", "https://example.org/v#name")
            .typed_field("height", "https://example.org/v#height", vocab::XSD_INTEGER);
        let mut store = TripleStore::new();
        let records = vec![
            json!({ "height": 3, "name": "W1", "ignored": true }),
            json!("not a record"),
            json!({ "name": "W2", "height": null }),
        ];
        let ids = mapping.apply(&mut store, &records);
        assert_eq!(ids.len(), 2);
        assert!(ids[0].guid().starts_with("Wall-"));
        // type + name + height, then type + name
        assert_eq!(store.len(), 5);
        let subject = ids[0].term();
        let predicates: Vec<&str> = store
            .matching(Some(&subject), None, None)
            .map(|t| t.predicate.as_str())
            .collect();
        assert_eq!(
            predicates,
            vec![RDF_TYPE, "https://example.org/v#name", "https://example.org/v#height"]
        );
    }

    #[test]
    fn test_unavailable_tool_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut container = InformationContainer::create_in(
            &dir.path().join("c1"),
            "site",
            vocab::BASE_URI,
            Arc::new(TurtleCodec),
        )
        .unwrap();
        let source = dir.path().join("rows.csv");
        std::fs::write(&source, "a\nb\n").unwrap();

        let missing = Stub { available: false };
        assert_eq!(convert_into_payload(&mut container, &missing, &source).unwrap(), None);
        assert!(container.payload_triples().is_empty());

        let working = Stub { available: true };
        let triples = convert_into_payload(&mut container, &working, &source)
            .unwrap()
            .unwrap();
        assert_eq!(triples.filename, "rows.ttl");
        assert_eq!(triples.load(&TurtleCodec).unwrap().len(), 4);

        let wrong = dir.path().join("rows.txt");
        assert!(matches!(
            convert_into_payload(&mut container, &working, &wrong),
            Err(IcddError::InvalidArgument(_))
        ));
    }
}
