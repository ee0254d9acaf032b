use serde::{Deserialize, Serialize};

use crate::{
    entity::{Entity, EntityId, GraphEntity},
    graph::SharedGraph,
    vocab::{class, predicate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyKind {
    Person,
    Organisation,
}

impl PartyKind {
    pub fn class_iri(&self) -> &'static str {
        match self {
            PartyKind::Person => class::PERSON,
            PartyKind::Organisation => class::ORGANISATION,
        }
    }

    pub fn from_class_iri(iri: &str) -> Option<PartyKind> {
        [PartyKind::Person, PartyKind::Organisation]
            .into_iter()
            .find(|kind| kind.class_iri() == iri)
    }
}

/// A person or organisation that created, modified or published something in the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Party {
    entity: GraphEntity,
    kind: PartyKind,
}

impl Entity for Party {
    fn entity(&self) -> &GraphEntity {
        &self.entity
    }
}

impl Party {
    pub fn create(graph: &SharedGraph, kind: PartyKind, name: &str) -> Party {
        let party = Party {
            entity: GraphEntity::create(graph, kind.class_iri()),
            kind,
        };
        party.set_name(name);
        party
    }

    pub fn read(graph: &SharedGraph, id: EntityId) -> Option<Party> {
        let entity = GraphEntity::bind(graph, id);
        let kind = PartyKind::from_class_iri(&entity.class()?)?;
        Some(Party { entity, kind })
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> String {
        self.entity.get_string(predicate::NAME).unwrap_or_default()
    }

    pub fn set_name(&self, name: &str) {
        self.entity.set_string(predicate::NAME, Some(name));
    }

    pub fn description(&self) -> Option<String> {
        self.entity.get_string(predicate::DESCRIPTION)
    }

    pub fn set_description(&self, description: Option<&str>) {
        self.entity.set_string(predicate::DESCRIPTION, description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{shared, TripleStore};
    use test_log::test;

    #[test]
    fn test_party_roundtrip() {
        let graph = shared(TripleStore::with_base("https://icdd.vm.rub.de/data/test/index"));
        let person = Party::create(&graph, PartyKind::Person, "Ada");
        person.set_description(Some("site engineer"));
        let read = Party::read(&graph, person.id().clone()).unwrap();
        assert_eq!(read.kind(), PartyKind::Person);
        assert_eq!(read.name(), "Ada");
        assert_eq!(read.description().as_deref(), Some("site engineer"));
        assert!(person.id().guid().len() >= 22);
    }
}
