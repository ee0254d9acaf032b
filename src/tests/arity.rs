//! Arity rules of link construction, for every link kind and element count.

use proptest::prelude::*;

use crate::{
    graph::{shared, SharedGraph, TripleStore},
    link::{Link, LinkElement, LinkEnds, LinkKind},
    EntityId,
};

const NS: &str = "https://example.org/arity";

fn elements(graph: &SharedGraph, count: usize) -> Vec<LinkElement> {
    (0..count)
        .map(|_| LinkElement::create(graph, &EntityId::mint(NS, "InternalDocument"), None))
        .collect()
}

fn kinds() -> impl Strategy<Value = LinkKind> {
    prop::sample::select(LinkKind::all().collect::<Vec<_>>())
}

proptest! {
    #[test]
    fn undirected_ends_follow_shape(kind in kinds(), count in 0usize..6) {
        let graph = shared(TripleStore::new());
        let ends = elements(&graph, count);
        let before = graph.read().len();
        let accepted = kind.shape().accepts_undirected(count);
        match Link::create(&graph, kind, LinkEnds::Undirected(ends)) {
            Ok(link) => {
                prop_assert!(accepted);
                prop_assert!(link.is_valid());
                prop_assert_eq!(link.elements().len(), count);
                prop_assert_eq!(link.documents().len(), count);
            }
            Err(_) => {
                prop_assert!(!accepted);
                prop_assert_eq!(graph.read().len(), before);
            }
        }
    }

    #[test]
    fn directed_ends_follow_shape(kind in kinds(), from in 0usize..4, to in 0usize..4) {
        let graph = shared(TripleStore::new());
        let from_elements = elements(&graph, from);
        let to_elements = elements(&graph, to);
        let first = from_elements.first().cloned();
        let last = to_elements.last().cloned();
        let accepted = kind.shape().accepts_directed(from, to);
        let ends = LinkEnds::Directed { from: from_elements, to: to_elements };
        match Link::create(&graph, kind, ends) {
            Ok(link) => {
                prop_assert!(accepted);
                prop_assert!(kind.shape().is_directed());
                prop_assert!(link.is_valid());
                prop_assert_eq!(link.from_elements().len(), from);
                prop_assert_eq!(link.to_elements().len(), to);
                prop_assert_eq!(link.first(), first);
                prop_assert_eq!(link.second(), last);
            }
            Err(_) => prop_assert!(!accepted),
        }
    }
}

#[test]
fn reread_link_keeps_kind_and_arity() {
    super::helpers::init_logging();
    let graph = shared(TripleStore::new());
    for kind in LinkKind::all() {
        let shape = kind.shape();
        let ends = if shape.is_directed() {
            LinkEnds::Directed {
                from: elements(&graph, 1),
                to: elements(&graph, 1),
            }
        } else {
            LinkEnds::Undirected(elements(&graph, 2))
        };
        let link = Link::create(&graph, kind, ends).unwrap();
        let reread = Link::read(&graph, crate::Entity::id(&link).clone()).unwrap();
        assert_eq!(reread.kind(), kind);
        assert_eq!(reread.elements().len(), 2);
        assert!(reread.is_valid());
    }
}

#[test]
fn element_without_document_invalidates_link() {
    let graph = shared(TripleStore::new());
    let ends = elements(&graph, 2);
    let link = Link::create(&graph, LinkKind::BinaryLink, LinkEnds::Undirected(ends.clone())).unwrap();
    assert!(link.is_valid());
    graph.write().retract(
        Some(&crate::Entity::id(&ends[0]).term()),
        Some(crate::vocab::predicate::HAS_DOCUMENT),
        None,
    );
    assert!(!link.is_valid());
}
