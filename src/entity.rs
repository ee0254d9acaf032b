//! Graph-backed entities.
//!
//! A [`GraphEntity`] is nothing but an identifier plus a handle to the store it lives in.
//! Every attribute read is a lookup against the store and every write replaces the
//! `(entity, predicate, *)` statements, so two handles to the same identifier always agree.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::IcddError,
    graph::{SharedGraph, Term},
    vocab::{self, predicate, RDF_TYPE},
};

/// 22-character URL-safe rendering of a UUID.
pub fn encode_guid(guid: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(guid.as_bytes())
}

/// Absolute IRI of a graph entity: `<namespace>#<TypeName>-<guid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Mints a fresh identifier for an entity of `type_name` inside `namespace`.
    pub fn mint(namespace: &str, type_name: &str) -> EntityId {
        let namespace = namespace.trim_end_matches('#');
        EntityId(format!(
            "{namespace}#{type_name}-{}",
            encode_guid(Uuid::new_v4())
        ))
    }

    /// Accepts only absolute IRIs.
    pub fn parse(raw: &str) -> Result<EntityId, IcddError> {
        let url = url::Url::parse(raw).map_err(|err| {
            let err = IcddError::from(err);
            tracing::warn!("'{raw}': {err}");
            err
        })?;
        if url.cannot_be_a_base() && url.scheme() != "urn" {
            let err = IcddError::InvalidIdentifier(format!(
                "'{raw}' is not a dereferenceable IRI"
            ));
            tracing::warn!("{err}");
            return Err(err);
        }
        Ok(EntityId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the `#`.
    pub fn namespace(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(ns, _)| ns)
    }

    /// Fragment after the `#`; the full identifier when there is none.
    pub fn guid(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(_, frag)| frag)
    }

    pub fn term(&self) -> Term {
        Term::Iri(self.0.clone())
    }

    pub fn from_term(term: &Term) -> Option<EntityId> {
        term.as_iri().map(|iri| EntityId(iri.to_string()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for EntityId {
    type Error = IcddError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        EntityId::parse(value)
    }
}

impl From<&EntityId> for Term {
    fn from(id: &EntityId) -> Term {
        id.term()
    }
}

fn now_literal() -> Term {
    Term::typed(
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        vocab::XSD_DATE_TIME,
    )
}

/// Identifier plus store handle. Equality and hashing use the identifier only.
#[derive(Clone)]
pub struct GraphEntity {
    id: EntityId,
    graph: SharedGraph,
}

impl GraphEntity {
    /// Mints a new entity in the store's base namespace and asserts its type and creation date.
    pub fn create(graph: &SharedGraph, class_iri: &str) -> GraphEntity {
        let namespace = graph
            .read()
            .base()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}default", vocab::BASE_URI));
        let id = EntityId::mint(&namespace, vocab::local_name(class_iri));
        {
            let mut store = graph.write();
            store.assert(id.term(), RDF_TYPE, Term::iri(class_iri));
            store.assert(id.term(), predicate::CREATION_DATE, now_literal());
        }
        tracing::debug!(id = %id, "created {}", vocab::local_name(class_iri));
        GraphEntity {
            id,
            graph: graph.clone(),
        }
    }

    /// Binds to an existing identifier without asserting anything.
    pub fn load(graph: &SharedGraph, id: &str) -> Result<GraphEntity, IcddError> {
        let id = EntityId::parse(id)?;
        tracing::debug!(id = %id, "loaded entity");
        Ok(GraphEntity::bind(graph, id))
    }

    pub fn bind(graph: &SharedGraph, id: EntityId) -> GraphEntity {
        GraphEntity {
            id,
            graph: graph.clone(),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    pub fn class(&self) -> Option<String> {
        self.graph.read().type_of(&self.id.term())
    }

    /// True when the store still holds any statement about this entity.
    pub fn exists(&self) -> bool {
        let subject = self.id.term();
        let found = self
            .graph
            .read()
            .matching(Some(&subject), None, None)
            .next()
            .is_some();
        found
    }

    pub fn get(&self, predicate: &str) -> Option<Term> {
        self.graph.read().first_object(&self.id.term(), predicate)
    }

    pub fn get_string(&self, predicate: &str) -> Option<String> {
        self.get(predicate)
            .and_then(|t| t.lexical().map(str::to_string))
    }

    /// Missing or unparsable values read as `false`.
    pub fn get_bool(&self, predicate: &str) -> bool {
        self.get_string(predicate)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }

    pub fn get_int(&self, predicate: &str) -> Option<i64> {
        self.get_string(predicate).and_then(|v| v.parse().ok())
    }

    pub fn get_datetime(&self, predicate: &str) -> Option<DateTime<Utc>> {
        self.get_string(predicate)
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn get_ref(&self, predicate: &str) -> Option<EntityId> {
        self.get(predicate).as_ref().and_then(EntityId::from_term)
    }

    pub fn get_refs(&self, predicate: &str) -> Vec<EntityId> {
        self.graph
            .read()
            .objects(&self.id.term(), predicate)
            .iter()
            .filter_map(EntityId::from_term)
            .collect()
    }

    /// Replaces every value of `predicate`; `None` clears it.
    pub fn set(&self, predicate: &str, value: Option<Term>) {
        {
            let mut store = self.graph.write();
            let subject = self.id.term();
            store.retract(Some(&subject), Some(predicate), None);
            if let Some(value) = value {
                store.assert(subject, predicate, value);
            }
        }
        if !predicate::BOOKKEEPING.contains(&predicate) {
            self.stamp_modified();
        }
    }

    pub fn set_string(&self, predicate: &str, value: Option<&str>) {
        self.set(predicate, value.map(Term::literal));
    }

    pub fn set_bool(&self, predicate: &str, value: bool) {
        self.set(predicate, Some(Term::boolean(value)));
    }

    pub fn set_int(&self, predicate: &str, value: i64) {
        self.set(
            predicate,
            Some(Term::typed(value.to_string(), vocab::XSD_INTEGER)),
        );
    }

    pub fn set_ref(&self, predicate: &str, value: Option<&EntityId>) {
        self.set(predicate, value.map(EntityId::term));
    }

    /// Adds one more value for a multi-valued reference.
    pub fn add_ref(&self, predicate: &str, value: &EntityId) {
        self.graph
            .write()
            .assert(self.id.term(), predicate, value.term());
        self.stamp_modified();
    }

    pub fn remove_ref(&self, predicate: &str, value: &EntityId) -> bool {
        let removed = self.graph.write().retract(
            Some(&self.id.term()),
            Some(predicate),
            Some(&value.term()),
        ) > 0;
        if removed {
            self.stamp_modified();
        }
        removed
    }

    pub fn stamp_modified(&self) {
        let mut store = self.graph.write();
        let subject = self.id.term();
        store.retract(Some(&subject), Some(predicate::MODIFICATION_DATE), None);
        store.retract(Some(&subject), Some(predicate::IS_MODIFIED), None);
        store.assert(subject.clone(), predicate::MODIFICATION_DATE, now_literal());
        store.assert(subject, predicate::IS_MODIFIED, Term::boolean(true));
    }

    pub fn is_modified(&self) -> bool {
        self.get_bool(predicate::IS_MODIFIED)
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.get_datetime(predicate::CREATION_DATE)
    }

    pub fn modification_date(&self) -> Option<DateTime<Utc>> {
        self.get_datetime(predicate::MODIFICATION_DATE)
    }

    pub fn created_by(&self) -> Option<EntityId> {
        self.get_ref(predicate::CREATED_BY)
    }

    pub fn set_created_by(&self, party: Option<&EntityId>) {
        self.set_ref(predicate::CREATED_BY, party);
    }

    pub fn modified_by(&self) -> Option<EntityId> {
        self.get_ref(predicate::MODIFIED_BY)
    }

    /// Records `party` as modifier and stamps the modification.
    pub fn set_modified_by(&self, party: Option<&EntityId>) {
        self.set_ref(predicate::MODIFIED_BY, party);
        self.stamp_modified();
    }

    /// Removes every statement about this entity. Returns the number removed.
    pub fn retract(&self) -> usize {
        self.graph.write().retract(Some(&self.id.term()), None, None)
    }

    /// Removes every statement pointing at this entity.
    pub fn retract_references(&self) -> usize {
        self.graph.write().retract(None, None, Some(&self.id.term()))
    }
}

impl PartialEq for GraphEntity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GraphEntity {}

impl Hash for GraphEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for GraphEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GraphEntity").field(&self.id.0).finish()
    }
}

/// Implemented by every typed wrapper around a [`GraphEntity`].
pub trait Entity {
    fn entity(&self) -> &GraphEntity;

    fn id(&self) -> &EntityId {
        self.entity().id()
    }
}

impl Entity for GraphEntity {
    fn entity(&self) -> &GraphEntity {
        self
    }
}
