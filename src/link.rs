//! Links between document fragments.
//!
//! Every link node carries one of twenty type markers. [`LinkKind`] is the closed table of
//! those markers; each kind maps onto one of five structural [`LinkShape`]s, which decide how
//! the elements are stored (`ls:hasLinkElement` for undirected shapes, `ls:hasFromLinkElement`
//! / `ls:hasToLinkElement` for directed ones) and what arity [`Link::is_valid`] demands.

use std::hash::{Hash, Hasher};

use enumset::{enum_set, EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::{
    entity::{Entity, EntityId, GraphEntity},
    error::IcddError,
    graph::SharedGraph,
    identifier::Identifier,
    vocab::{class, local_name, predicate},
};

#[derive(EnumSetType, Debug, Hash, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
pub enum LinkShape {
    /// Undirected, two or more elements.
    Link,
    /// Undirected, exactly two elements.
    Binary,
    /// From and To each non-empty.
    Directed,
    /// From and To each exactly one.
    DirectedBinary,
    /// From exactly one, To at least one.
    Directed1ToN,
}

pub const DIRECTED_SHAPES: EnumSet<LinkShape> =
    enum_set!(LinkShape::Directed | LinkShape::DirectedBinary | LinkShape::Directed1ToN);

impl LinkShape {
    pub fn is_directed(&self) -> bool {
        DIRECTED_SHAPES.contains(*self)
    }

    /// Arity rule for undirected element counts.
    pub fn accepts_undirected(&self, count: usize) -> bool {
        match self {
            LinkShape::Link => count >= 2,
            LinkShape::Binary => count == 2,
            _ => false,
        }
    }

    /// Arity rule for directed From/To counts.
    pub fn accepts_directed(&self, from: usize, to: usize) -> bool {
        match self {
            LinkShape::Directed => from >= 1 && to >= 1,
            LinkShape::DirectedBinary => from == 1 && to == 1,
            LinkShape::Directed1ToN => from == 1 && to >= 1,
            _ => false,
        }
    }
}

#[derive(EnumSetType, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
pub enum LinkKind {
    Link,
    BinaryLink,
    DirectedLink,
    DirectedBinaryLink,
    Directed1ToNLink,
    ConflictsWith,
    Controls,
    Elaborates,
    HasMember,
    HasPart,
    IsAlternativeTo,
    IsControlledBy,
    IsElaboratedBy,
    IsIdenticalTo,
    IsMemberOf,
    IsPartOf,
    IsSpecialisedAs,
    IsSupersededBy,
    Specialises,
    Supersedes,
}

/// Type marker, structural shape.
static LINK_KIND_TABLE: [(LinkKind, &str, LinkShape); 20] = [
    (LinkKind::Link, class::LINK, LinkShape::Link),
    (LinkKind::BinaryLink, class::BINARY_LINK, LinkShape::Binary),
    (LinkKind::DirectedLink, class::DIRECTED_LINK, LinkShape::Directed),
    (LinkKind::DirectedBinaryLink, class::DIRECTED_BINARY_LINK, LinkShape::DirectedBinary),
    (LinkKind::Directed1ToNLink, class::DIRECTED_1TON_LINK, LinkShape::Directed1ToN),
    (LinkKind::ConflictsWith, class::CONFLICTS_WITH, LinkShape::DirectedBinary),
    (LinkKind::Controls, class::CONTROLS, LinkShape::Directed1ToN),
    (LinkKind::Elaborates, class::ELABORATES, LinkShape::Directed1ToN),
    (LinkKind::HasMember, class::HAS_MEMBER, LinkShape::Directed1ToN),
    (LinkKind::HasPart, class::HAS_PART, LinkShape::Directed1ToN),
    (LinkKind::IsAlternativeTo, class::IS_ALTERNATIVE_TO, LinkShape::DirectedBinary),
    (LinkKind::IsControlledBy, class::IS_CONTROLLED_BY, LinkShape::Directed1ToN),
    (LinkKind::IsElaboratedBy, class::IS_ELABORATED_BY, LinkShape::Directed1ToN),
    (LinkKind::IsIdenticalTo, class::IS_IDENTICAL_TO, LinkShape::DirectedBinary),
    (LinkKind::IsMemberOf, class::IS_MEMBER_OF, LinkShape::Directed1ToN),
    (LinkKind::IsPartOf, class::IS_PART_OF, LinkShape::Directed1ToN),
    (LinkKind::IsSpecialisedAs, class::IS_SPECIALISED_AS, LinkShape::Directed1ToN),
    (LinkKind::IsSupersededBy, class::IS_SUPERSEDED_BY, LinkShape::Directed1ToN),
    (LinkKind::Specialises, class::SPECIALISES, LinkShape::Directed1ToN),
    (LinkKind::Supersedes, class::SUPERSEDES, LinkShape::Directed1ToN),
];

impl LinkKind {
    fn row(&self) -> &'static (LinkKind, &'static str, LinkShape) {
        // The table lists every variant exactly once, in declaration order.
        &LINK_KIND_TABLE[*self as usize]
    }

    pub fn class_iri(&self) -> &'static str {
        self.row().1
    }

    pub fn shape(&self) -> LinkShape {
        self.row().2
    }

    pub fn name(&self) -> &'static str {
        local_name(self.class_iri())
    }

    pub fn from_class_iri(iri: &str) -> Option<LinkKind> {
        LINK_KIND_TABLE
            .iter()
            .find(|(_, marker, _)| *marker == iri)
            .map(|(kind, _, _)| *kind)
    }

    pub fn all() -> impl Iterator<Item = LinkKind> {
        LINK_KIND_TABLE.iter().map(|(kind, _, _)| *kind)
    }
}

/// One endpoint of a link: a document plus an optional fragment identifier.
///
/// Equality is by value (same document, same identifier payload), not by node identity, so
/// two element nodes pointing at the same fragment compare equal.
#[derive(Debug, Clone)]
pub struct LinkElement {
    entity: GraphEntity,
}

impl Entity for LinkElement {
    fn entity(&self) -> &GraphEntity {
        &self.entity
    }
}

impl LinkElement {
    pub fn create(
        graph: &SharedGraph,
        document: &EntityId,
        identifier: Option<&Identifier>,
    ) -> LinkElement {
        let element = LinkElement {
            entity: GraphEntity::create(graph, class::LINK_ELEMENT),
        };
        element
            .entity
            .set_ref(predicate::HAS_DOCUMENT, Some(document));
        if let Some(identifier) = identifier {
            element
                .entity
                .set_ref(predicate::HAS_IDENTIFIER, Some(identifier.id()));
        }
        element
    }

    pub fn read(graph: &SharedGraph, id: EntityId) -> LinkElement {
        LinkElement {
            entity: GraphEntity::bind(graph, id),
        }
    }

    pub fn document(&self) -> Option<EntityId> {
        self.entity.get_ref(predicate::HAS_DOCUMENT)
    }

    pub fn identifier_id(&self) -> Option<EntityId> {
        self.entity.get_ref(predicate::HAS_IDENTIFIER)
    }

    pub fn identifier(&self) -> Option<Identifier> {
        let id = self.identifier_id()?;
        Identifier::read(self.entity.graph(), id)
    }

    pub fn refers_to(&self, document: &EntityId) -> bool {
        self.document().as_ref() == Some(document)
    }

    /// Has a document, and a well-formed identifier if it has one at all.
    pub fn is_valid(&self) -> bool {
        self.document().is_some()
            && match self.identifier_id() {
                None => true,
                Some(_) => self.identifier().is_some_and(|i| i.is_valid()),
            }
    }
}

impl PartialEq for LinkElement {
    fn eq(&self, other: &Self) -> bool {
        if self.document() != other.document() {
            return false;
        }
        match (self.identifier(), other.identifier()) {
            (None, None) => self.identifier_id() == other.identifier_id(),
            (Some(a), Some(b)) => a == b || (a.value().is_some() && a.value() == b.value()),
            _ => false,
        }
    }
}

impl Eq for LinkElement {}

impl Hash for LinkElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.document().hash(state);
    }
}

/// Elements of a new link, in the layout its shape requires.
#[derive(Debug, Clone)]
pub enum LinkEnds {
    Undirected(Vec<LinkElement>),
    Directed {
        from: Vec<LinkElement>,
        to: Vec<LinkElement>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    entity: GraphEntity,
    kind: LinkKind,
}

impl Entity for Link {
    fn entity(&self) -> &GraphEntity {
        &self.entity
    }
}

impl Link {
    /// Asserts a new link. Ends that do not fit the kind's shape and arity are refused before
    /// anything is written.
    pub fn create(graph: &SharedGraph, kind: LinkKind, ends: LinkEnds) -> Result<Link, IcddError> {
        let shape = kind.shape();
        match &ends {
            LinkEnds::Undirected(elements) if shape.accepts_undirected(elements.len()) => {}
            LinkEnds::Directed { from, to } if shape.accepts_directed(from.len(), to.len()) => {}
            _ => {
                let err = IcddError::InvalidArgument(format!(
                    "{} cannot be built from {}",
                    kind.name(),
                    describe_ends(&ends)
                ));
                tracing::warn!("{err}");
                return Err(err);
            }
        }
        let link = Link {
            entity: GraphEntity::create(graph, kind.class_iri()),
            kind,
        };
        match ends {
            LinkEnds::Undirected(elements) => {
                for element in &elements {
                    link.entity
                        .add_ref(predicate::HAS_LINK_ELEMENT, element.id());
                }
            }
            LinkEnds::Directed { from, to } => {
                for element in &from {
                    link.entity
                        .add_ref(predicate::HAS_FROM_LINK_ELEMENT, element.id());
                }
                for element in &to {
                    link.entity
                        .add_ref(predicate::HAS_TO_LINK_ELEMENT, element.id());
                }
            }
        }
        Ok(link)
    }

    /// Binds to a link node by its type marker. Unknown markers yield `None` with a warning.
    pub fn read(graph: &SharedGraph, id: EntityId) -> Option<Link> {
        let entity = GraphEntity::bind(graph, id);
        let class = entity.class()?;
        match LinkKind::from_class_iri(&class) {
            Some(kind) => Some(Link { entity, kind }),
            None => {
                tracing::warn!(id = %entity.id(), "unknown link type {class}");
                None
            }
        }
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn shape(&self) -> LinkShape {
        self.kind.shape()
    }

    fn elements_by(&self, predicate: &str) -> Vec<LinkElement> {
        self.entity
            .get_refs(predicate)
            .into_iter()
            .map(|id| LinkElement::read(self.entity.graph(), id))
            .collect()
    }

    /// Undirected elements followed by From and To elements.
    pub fn elements(&self) -> Vec<LinkElement> {
        let mut elements = self.elements_by(predicate::HAS_LINK_ELEMENT);
        elements.extend(self.from_elements());
        elements.extend(self.to_elements());
        elements
    }

    pub fn from_elements(&self) -> Vec<LinkElement> {
        self.elements_by(predicate::HAS_FROM_LINK_ELEMENT)
    }

    pub fn to_elements(&self) -> Vec<LinkElement> {
        self.elements_by(predicate::HAS_TO_LINK_ELEMENT)
    }

    /// First element of a binary link; the From element of a directed binary one.
    pub fn first(&self) -> Option<LinkElement> {
        if self.shape().is_directed() {
            self.from_elements().into_iter().next()
        } else {
            self.elements_by(predicate::HAS_LINK_ELEMENT).into_iter().next()
        }
    }

    /// Last element of a binary link; the To element of a directed binary one.
    pub fn second(&self) -> Option<LinkElement> {
        if self.shape().is_directed() {
            self.to_elements().into_iter().last()
        } else {
            let elements = self.elements_by(predicate::HAS_LINK_ELEMENT);
            if elements.len() < 2 {
                return None;
            }
            elements.into_iter().last()
        }
    }

    /// Checks the stored arity against the declared shape, and that every element is well formed.
    pub fn is_valid(&self) -> bool {
        let undirected = self.entity.get_refs(predicate::HAS_LINK_ELEMENT).len();
        let from = self.entity.get_refs(predicate::HAS_FROM_LINK_ELEMENT).len();
        let to = self.entity.get_refs(predicate::HAS_TO_LINK_ELEMENT).len();
        let shape = self.shape();
        let arity = if shape.is_directed() {
            undirected == 0 && shape.accepts_directed(from, to)
        } else {
            from == 0 && to == 0 && shape.accepts_undirected(undirected)
        };
        arity && self.elements().iter().all(LinkElement::is_valid)
    }

    pub fn references_document(&self, document: &EntityId) -> bool {
        self.elements().iter().any(|e| e.refers_to(document))
    }

    /// Distinct documents touched by this link, in element order.
    pub fn documents(&self) -> Vec<EntityId> {
        let mut documents: Vec<EntityId> = Vec::new();
        for document in self.elements().iter().filter_map(LinkElement::document) {
            if !documents.contains(&document) {
                documents.push(document);
            }
        }
        documents
    }
}

fn describe_ends(ends: &LinkEnds) -> String {
    match ends {
        LinkEnds::Undirected(elements) => format!("{} undirected elements", elements.len()),
        LinkEnds::Directed { from, to } => {
            format!("{} from / {} to elements", from.len(), to.len())
        }
    }
}
