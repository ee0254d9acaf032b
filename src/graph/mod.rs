//! In-memory statement store backing every container entity.
//!
//! [`TripleStore`] keeps statements in insertion order so that anything enumerated from a
//! freshly parsed file (links, documents, parties) comes back in discovery order. Stores are
//! shared between entities through [`SharedGraph`].

use std::{fmt, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::IcddError,
    vocab::{self, RDF_TYPE},
};

pub mod codec;

pub use codec::{merge_namespaces, GraphCodec, GraphStyle, TurtleCodec};

/// A store handle shared by the container and every entity bound to it.
pub type SharedGraph = Arc<RwLock<TripleStore>>;

pub fn shared(store: TripleStore) -> SharedGraph {
    Arc::new(RwLock::new(store))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal {
        value: String,
        datatype: Option<String>,
        lang: Option<String>,
    },
}

impl Term {
    pub fn iri<S: Into<String>>(iri: S) -> Term {
        Term::Iri(iri.into())
    }

    /// A plain string literal.
    pub fn literal<S: Into<String>>(value: S) -> Term {
        Term::Literal {
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    /// A typed literal; `xsd:string` collapses to a plain literal.
    pub fn typed<S: Into<String>>(value: S, datatype: &str) -> Term {
        Term::Literal {
            value: value.into(),
            datatype: Some(datatype.to_string()).filter(|dt| dt != vocab::XSD_STRING),
            lang: None,
        }
    }

    pub fn boolean(value: bool) -> Term {
        Term::typed(value.to_string(), vocab::XSD_BOOLEAN)
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// The lexical form of a literal, or the IRI text of an IRI term.
    pub fn lexical(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            Term::Literal { value, .. } => Some(value),
            Term::Blank(_) => None,
        }
    }

    pub fn is_resource(&self) -> bool {
        !matches!(self, Term::Literal { .. })
    }
}

impl From<oxrdf::Term> for Term {
    fn from(term: oxrdf::Term) -> Term {
        match term {
            oxrdf::Term::NamedNode(node) => Term::Iri(node.into_string()),
            oxrdf::Term::BlankNode(node) => Term::Blank(node.into_string()),
            oxrdf::Term::Literal(literal) => {
                let (value, datatype, lang) = literal.destruct();
                let datatype = datatype
                    .map(|dt| dt.into_string())
                    .filter(|dt| dt != vocab::XSD_STRING);
                Term::Literal {
                    value,
                    datatype,
                    lang,
                }
            }
            #[allow(unreachable_patterns)]
            other => Term::Blank(other.to_string()),
        }
    }
}

impl From<&Term> for oxrdf::Term {
    fn from(term: &Term) -> oxrdf::Term {
        match term {
            Term::Iri(iri) => oxrdf::NamedNode::new_unchecked(iri.as_str()).into(),
            Term::Blank(label) => oxrdf::BlankNode::new(label.as_str())
                .unwrap_or_default()
                .into(),
            Term::Literal {
                value,
                datatype,
                lang,
            } => match (lang, datatype) {
                (Some(lang), _) => {
                    oxrdf::Literal::new_language_tagged_literal_unchecked(value.as_str(), lang.as_str())
                }
                (None, Some(dt)) => {
                    oxrdf::Literal::new_typed_literal(value.as_str(), oxrdf::NamedNode::new_unchecked(dt.as_str()))
                }
                (None, None) => oxrdf::Literal::new_simple_literal(value.as_str()),
            }
            .into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&oxrdf::Term::from(self), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: &str, object: Term) -> Triple {
        Triple {
            subject,
            predicate: predicate.to_string(),
            object,
        }
    }

    fn matches(&self, s: Option<&Term>, p: Option<&str>, o: Option<&Term>) -> bool {
        s.map_or(true, |s| &self.subject == s)
            && p.map_or(true, |p| self.predicate == p)
            && o.map_or(true, |o| &self.object == o)
    }
}

impl From<oxrdf::Triple> for Triple {
    fn from(triple: oxrdf::Triple) -> Triple {
        Triple {
            subject: oxrdf::Term::from(triple.subject).into(),
            predicate: triple.predicate.into_string(),
            object: triple.object.into(),
        }
    }
}

impl TryFrom<&Triple> for oxrdf::Triple {
    type Error = IcddError;

    /// Checks the IRIs on the way out; a literal in subject position is rejected.
    fn try_from(triple: &Triple) -> Result<oxrdf::Triple, IcddError> {
        let subject: oxrdf::Subject = match &triple.subject {
            Term::Iri(iri) => checked_iri(iri)?.into(),
            Term::Blank(label) => oxrdf::BlankNode::new(label.as_str())
                .unwrap_or_default()
                .into(),
            Term::Literal { .. } => {
                return Err(IcddError::MalformedGraph(format!(
                    "literal {} in subject position",
                    triple.subject
                )))
            }
        };
        let object = match &triple.object {
            Term::Iri(iri) => checked_iri(iri)?.into(),
            other => oxrdf::Term::from(other),
        };
        Ok(oxrdf::Triple::new(subject, checked_iri(&triple.predicate)?, object))
    }
}

fn checked_iri(iri: &str) -> Result<oxrdf::NamedNode, IcddError> {
    oxrdf::NamedNode::new(iri).map_err(|err| IcddError::MalformedGraph(format!("<{iri}>: {err}")))
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripleStore {
    base: Option<String>,
    prefixes: IndexMap<String, String>,
    triples: IndexSet<Triple>,
}

impl TripleStore {
    pub fn new() -> TripleStore {
        TripleStore::default()
    }

    /// An empty store with `base` as its base IRI, the ICDD prefix table and the empty
    /// prefix bound to `base#`.
    pub fn with_base(base: &str) -> TripleStore {
        let mut store = TripleStore::new();
        store.set_base(base);
        for (prefix, ns) in vocab::PREFIXES {
            store.add_prefix(prefix, ns);
        }
        store
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn set_base(&mut self, base: &str) {
        let base = base.trim_end_matches('#').to_string();
        self.prefixes.insert(String::new(), format!("{base}#"));
        self.base = Some(base);
    }

    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }

    pub fn add_prefix(&mut self, prefix: &str, namespace: &str) {
        self.prefixes
            .insert(prefix.to_string(), namespace.to_string());
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Returns false if the statement was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn assert(&mut self, subject: Term, predicate: &str, object: Term) -> bool {
        self.insert(Triple::new(subject, predicate, object))
    }

    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.shift_remove(triple)
    }

    /// Removes every statement matching the pattern; `None` is a wildcard.
    pub fn retract(&mut self, s: Option<&Term>, p: Option<&str>, o: Option<&Term>) -> usize {
        let before = self.triples.len();
        self.triples.retain(|t| !t.matches(s, p, o));
        before - self.triples.len()
    }

    pub fn matching<'a>(
        &'a self,
        s: Option<&'a Term>,
        p: Option<&'a str>,
        o: Option<&'a Term>,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| t.matches(s, p, o))
    }

    pub fn objects(&self, subject: &Term, predicate: &str) -> Vec<Term> {
        self.matching(Some(subject), Some(predicate), None)
            .map(|t| t.object.clone())
            .collect()
    }

    pub fn first_object(&self, subject: &Term, predicate: &str) -> Option<Term> {
        self.matching(Some(subject), Some(predicate), None)
            .map(|t| t.object.clone())
            .next()
    }

    pub fn subjects(&self, predicate: &str, object: &Term) -> Vec<Term> {
        self.matching(None, Some(predicate), Some(object))
            .map(|t| t.subject.clone())
            .collect()
    }

    /// Subjects declared `rdf:type <class_iri>`, in discovery order.
    pub fn instances_of(&self, class_iri: &str) -> Vec<Term> {
        self.subjects(RDF_TYPE, &Term::iri(class_iri))
    }

    /// The first asserted type of `subject`.
    pub fn type_of(&self, subject: &Term) -> Option<String> {
        self.first_object(subject, RDF_TYPE)
            .and_then(|t| t.as_iri().map(str::to_string))
    }

    /// All `owl:imports` targets, normalized to end in `.rdf`.
    pub fn imports(&self) -> Vec<String> {
        self.matching(None, Some(vocab::OWL_IMPORTS), None)
            .filter_map(|t| t.object.as_iri())
            .map(|iri| {
                let iri = iri.trim_end_matches('#');
                if iri.ends_with(".rdf") {
                    iri.to_string()
                } else {
                    format!("{iri}.rdf")
                }
            })
            .collect()
    }

    /// Copies every statement of `other` into this store.
    pub fn merge(&mut self, other: &TripleStore) {
        merge_namespaces(self, other);
        for triple in other.iter() {
            self.triples.insert(triple.clone());
        }
    }

    /// Set equality of statements, ignoring order, prefixes and base.
    pub fn same_statements(&self, other: &TripleStore) -> bool {
        self.len() == other.len() && self.iter().all(|t| other.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn sample() -> TripleStore {
        let mut store = TripleStore::with_base("https://example.org/data/index");
        let doc = Term::iri("https://example.org/data/index#Doc-1");
        store.assert(doc.clone(), RDF_TYPE, Term::iri(vocab::class::INTERNAL_DOCUMENT));
        store.assert(doc.clone(), vocab::predicate::NAME, Term::literal("a.txt"));
        store.assert(doc, vocab::predicate::REQUESTED, Term::boolean(false));
        store
    }

    #[test]
    fn test_insert_is_set_semantics() {
        let mut store = sample();
        let doc = Term::iri("https://example.org/data/index#Doc-1");
        assert!(!store.assert(doc, vocab::predicate::NAME, Term::literal("a.txt")));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_retract_pattern_preserves_order() {
        let mut store = sample();
        let doc = Term::iri("https://example.org/data/index#Doc-1");
        assert_eq!(store.retract(Some(&doc), Some(vocab::predicate::NAME), None), 1);
        let predicates: Vec<_> = store.iter().map(|t| t.predicate.as_str()).collect();
        assert_eq!(predicates, vec![RDF_TYPE, vocab::predicate::REQUESTED]);
        assert_eq!(store.retract(Some(&doc), None, None), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_instances_and_type() {
        let store = sample();
        let found = store.instances_of(vocab::class::INTERNAL_DOCUMENT);
        assert_eq!(found.len(), 1);
        assert_eq!(
            store.type_of(&found[0]).as_deref(),
            Some(vocab::class::INTERNAL_DOCUMENT)
        );
    }

    #[test]
    fn test_imports_are_normalized() {
        let mut store = TripleStore::new();
        let head = Term::iri("https://example.org/index");
        store.assert(head.clone(), vocab::OWL_IMPORTS, Term::iri(vocab::CONTAINER_ONTOLOGY));
        store.assert(head, vocab::OWL_IMPORTS, Term::iri("https://example.org/Extra"));
        assert_eq!(
            store.imports(),
            vec![
                vocab::CONTAINER_ONTOLOGY.to_string(),
                "https://example.org/Extra.rdf".to_string()
            ]
        );
    }
}
