use crate::{
    entity::{Entity, EntityId, GraphEntity},
    graph::SharedGraph,
    vocab::{class, predicate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// `identifierField` + `identifier`.
    StringBased,
    /// `uri`.
    UriBased,
    /// `queryExpression` + `queryLanguage`.
    QueryBased,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 3] = [
        IdentifierKind::StringBased,
        IdentifierKind::UriBased,
        IdentifierKind::QueryBased,
    ];

    pub fn class_iri(&self) -> &'static str {
        match self {
            IdentifierKind::StringBased => class::STRING_BASED_IDENTIFIER,
            IdentifierKind::UriBased => class::URI_BASED_IDENTIFIER,
            IdentifierKind::QueryBased => class::QUERY_BASED_IDENTIFIER,
        }
    }

    pub fn from_class_iri(iri: &str) -> Option<IdentifierKind> {
        IdentifierKind::ALL
            .into_iter()
            .find(|kind| kind.class_iri() == iri)
    }
}

/// The populated payload of an identifier, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierValue {
    StringBased { field: String, value: String },
    UriBased { uri: String },
    QueryBased { expression: String, language: String },
}

/// Pinpoints a fragment inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    entity: GraphEntity,
    kind: IdentifierKind,
}

impl Entity for Identifier {
    fn entity(&self) -> &GraphEntity {
        &self.entity
    }
}

impl Identifier {
    fn create(graph: &SharedGraph, kind: IdentifierKind) -> Identifier {
        Identifier {
            entity: GraphEntity::create(graph, kind.class_iri()),
            kind,
        }
    }

    pub fn string_based(graph: &SharedGraph, field: &str, value: &str) -> Identifier {
        let identifier = Identifier::create(graph, IdentifierKind::StringBased);
        identifier
            .entity
            .set_string(predicate::IDENTIFIER_FIELD, Some(field));
        identifier
            .entity
            .set_string(predicate::IDENTIFIER, Some(value));
        identifier
    }

    pub fn uri_based(graph: &SharedGraph, uri: &str) -> Identifier {
        let identifier = Identifier::create(graph, IdentifierKind::UriBased);
        identifier.entity.set_string(predicate::URI, Some(uri));
        identifier
    }

    pub fn query_based(graph: &SharedGraph, expression: &str, language: &str) -> Identifier {
        let identifier = Identifier::create(graph, IdentifierKind::QueryBased);
        identifier
            .entity
            .set_string(predicate::QUERY_EXPRESSION, Some(expression));
        identifier
            .entity
            .set_string(predicate::QUERY_LANGUAGE, Some(language));
        identifier
    }

    /// Reconstructs an identifier from its node. Unknown type markers yield `None` with a warning.
    pub fn read(graph: &SharedGraph, id: EntityId) -> Option<Identifier> {
        let entity = GraphEntity::bind(graph, id);
        let class = entity.class()?;
        match IdentifierKind::from_class_iri(&class) {
            Some(kind) => Some(Identifier { entity, kind }),
            None => {
                tracing::warn!(id = %entity.id(), "unknown identifier type {class}");
                None
            }
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// `None` when the fields required by the kind are missing.
    pub fn value(&self) -> Option<IdentifierValue> {
        let get = |p: &str| self.entity.get_string(p);
        match self.kind {
            IdentifierKind::StringBased => Some(IdentifierValue::StringBased {
                field: get(predicate::IDENTIFIER_FIELD)?,
                value: get(predicate::IDENTIFIER)?,
            }),
            IdentifierKind::UriBased => Some(IdentifierValue::UriBased {
                uri: get(predicate::URI)?,
            }),
            IdentifierKind::QueryBased => Some(IdentifierValue::QueryBased {
                expression: get(predicate::QUERY_EXPRESSION)?,
                language: get(predicate::QUERY_LANGUAGE)?,
            }),
        }
    }

    /// Exactly one identifier kind is populated.
    pub fn is_valid(&self) -> bool {
        let populated = |p: &str| self.entity.get(p).is_some();
        let string = populated(predicate::IDENTIFIER) || populated(predicate::IDENTIFIER_FIELD);
        let uri = populated(predicate::URI);
        let query = populated(predicate::QUERY_EXPRESSION);
        let expected = match self.kind {
            IdentifierKind::StringBased => (true, false, false),
            IdentifierKind::UriBased => (false, true, false),
            IdentifierKind::QueryBased => (false, false, true),
        };
        self.value().is_some() && (string, uri, query) == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{shared, Term, TripleStore},
        vocab::RDF_TYPE,
    };
    use test_log::test;

    fn store() -> SharedGraph {
        shared(TripleStore::with_base("https://icdd.vm.rub.de/data/test/ls/links.ttl"))
    }

    #[test]
    fn test_variants_populate_their_fields() {
        let graph = store();
        let by_string = Identifier::string_based(&graph, "GlobalId", "2O2Fr$t4X7Zf8NOew3FLOH");
        assert_eq!(
            by_string.value(),
            Some(IdentifierValue::StringBased {
                field: "GlobalId".to_string(),
                value: "2O2Fr$t4X7Zf8NOew3FLOH".to_string()
            })
        );
        assert!(by_string.is_valid());

        let by_query = Identifier::query_based(&graph, "SELECT ?x WHERE {}", "SPARQL");
        assert_eq!(by_query.kind(), IdentifierKind::QueryBased);
        assert!(by_query.is_valid());

        let by_uri = Identifier::uri_based(&graph, "https://example.org/wall#1");
        let reread = Identifier::read(&graph, by_uri.id().clone()).unwrap();
        assert_eq!(reread, by_uri);
        assert_eq!(reread.kind(), IdentifierKind::UriBased);
    }

    #[test]
    fn test_two_kinds_populated_is_invalid() {
        let graph = store();
        let identifier = Identifier::uri_based(&graph, "https://example.org/wall#1");
        identifier
            .entity()
            .set_string(predicate::QUERY_EXPRESSION, Some("SELECT * {}"));
        assert!(!identifier.is_valid());
    }

    #[test]
    fn test_unknown_type_reads_as_none() {
        let graph = store();
        let id = EntityId::parse("https://icdd.vm.rub.de/data/test/ls/links.ttl#Thing-1").unwrap();
        graph
            .write()
            .assert(id.term(), RDF_TYPE, Term::iri("https://example.org/Thing"));
        assert!(Identifier::read(&graph, id).is_none());
    }
}
