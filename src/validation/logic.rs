//! Relational checks over the links of one linkset.
//!
//! Everything here works on links that were already materialized; nothing reads or writes a
//! graph, and nothing fails. Each check records its verdicts and renders them as a flat
//! key/value [`LogicReport`].

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::{
    entity::{Entity, EntityId},
    link::{Link, LinkElement, LinkKind},
};

/// Ordered key/value rendering of one check, keyed by human-readable rule labels.
pub type LogicReport = IndexMap<String, String>;

/// Document to the link elements that reference it.
pub type RelationSets = IndexMap<EntityId, IndexSet<LinkElement>>;

/// How right-totality is judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RightTotality {
    /// Same predicate as left-totality: every document known to the container is touched by
    /// some link element, on either side.
    #[default]
    AsLeftTotal,
    /// Left-totality looks at first elements only and right-totality at second elements only.
    Mirrored,
}

/// Links grouped by kind, groups and their members in discovery order.
pub fn partition_by_kind(links: &[Link]) -> IndexMap<LinkKind, Vec<Link>> {
    let mut partitions: IndexMap<LinkKind, Vec<Link>> = IndexMap::new();
    for link in links {
        partitions.entry(link.kind()).or_default().push(link.clone());
    }
    partitions
}

/// Documents referenced by the links' elements, each with the elements naming it.
pub fn relation_sets(links: &[Link]) -> RelationSets {
    let mut sets = RelationSets::new();
    for link in links {
        for element in link.elements() {
            if let Some(document) = element.document() {
                sets.entry(document).or_default().insert(element);
            }
        }
    }
    sets
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyCheck {
    pub linkset: String,
    /// Kind of the conforming partition; `None` when there are no links to judge.
    pub conforming_type: Option<LinkKind>,
    pub nonconforming: Vec<Link>,
}

impl ConsistencyCheck {
    pub fn is_consistent(&self) -> bool {
        self.nonconforming.is_empty()
    }

    pub fn report(&self) -> LogicReport {
        let mut report = LogicReport::new();
        report.insert("Linkset".into(), self.linkset.clone());
        report.insert("ValidationRule".into(), "Link Consistency Validation".into());
        report.insert(
            "Conformity Type".into(),
            self.conforming_type
                .map(|kind| kind.name().to_string())
                .unwrap_or_else(|| "None".to_string()),
        );
        report.insert("Is Conform".into(), self.is_consistent().to_string());
        report.insert("Unconform Types".into(), self.nonconforming.len().to_string());
        report
    }
}

/// Judges the linkset against its largest kind partition. On a tie the partition met first in
/// discovery order wins.
pub fn check_consistency(linkset: &str, links: &[Link]) -> ConsistencyCheck {
    let partitions = partition_by_kind(links);
    let mut conforming: Option<(LinkKind, usize)> = None;
    for (kind, members) in &partitions {
        match conforming {
            Some((_, count)) if members.len() <= count => {}
            _ => conforming = Some((*kind, members.len())),
        }
    }
    let conforming_type = conforming.map(|(kind, _)| kind);
    ConsistencyCheck {
        linkset: linkset.to_string(),
        conforming_type,
        nonconforming: nonconforming(links, conforming_type),
    }
}

/// Judges the linkset against a fixed kind. An empty linkset conforms to every kind.
pub fn check_consistency_with(linkset: &str, links: &[Link], kind: LinkKind) -> ConsistencyCheck {
    ConsistencyCheck {
        linkset: linkset.to_string(),
        conforming_type: (!links.is_empty()).then_some(kind),
        nonconforming: nonconforming(links, Some(kind)),
    }
}

fn nonconforming(links: &[Link], kind: Option<LinkKind>) -> Vec<Link> {
    links
        .iter()
        .filter(|link| Some(link.kind()) != kind)
        .cloned()
        .collect()
}

/// Whether every link is a plain `BinaryLink`.
pub fn is_binary_linkset(links: &[Link]) -> bool {
    check_consistency_with("", links, LinkKind::BinaryLink).is_consistent()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitotalCheck {
    pub linkset: String,
    pub is_binary: bool,
    pub left_total: bool,
    pub right_total: bool,
}

impl BitotalCheck {
    pub fn is_bitotal(&self) -> bool {
        self.left_total && self.right_total
    }

    pub fn report(&self) -> LogicReport {
        let mut report = LogicReport::new();
        report.insert("Linkset".into(), self.linkset.clone());
        report.insert("ValidationRule".into(), "Link Bitotal Validation".into());
        report.insert("Is Binary Linkset".into(), self.is_binary.to_string());
        report.insert("Is Bitotal Relation".into(), self.is_bitotal().to_string());
        report.insert("Is right-total Relation".into(), self.right_total.to_string());
        report.insert("Is left-total Relation".into(), self.left_total.to_string());
        report
    }
}

/// Checks that every document in `overall` (the container-wide link-element index) is reached
/// by this linkset. Non-binary linksets are neither left- nor right-total.
pub fn check_bitotal(
    linkset: &str,
    links: &[Link],
    overall: &RelationSets,
    right_totality: RightTotality,
) -> BitotalCheck {
    let is_binary = is_binary_linkset(links);
    let covers = |reached: &IndexSet<EntityId>| overall.keys().all(|doc| reached.contains(doc));
    let (left_total, right_total) = match right_totality {
        RightTotality::AsLeftTotal => {
            let reached: IndexSet<EntityId> = relation_sets(links).into_keys().collect();
            let total = covers(&reached);
            (total, total)
        }
        RightTotality::Mirrored => {
            let side = |pick: fn(&Link) -> Option<LinkElement>| -> IndexSet<EntityId> {
                links
                    .iter()
                    .filter_map(pick)
                    .filter_map(|element| element.document())
                    .collect()
            };
            (covers(&side(Link::first)), covers(&side(Link::second)))
        }
    };
    BitotalCheck {
        linkset: linkset.to_string(),
        is_binary,
        left_total: is_binary && left_total,
        right_total: is_binary && right_total,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiuniqueCheck {
    pub linkset: String,
    pub is_binary: bool,
    pub left_unique: bool,
    pub right_unique: bool,
}

impl BiuniqueCheck {
    pub fn is_biunique(&self) -> bool {
        self.left_unique && self.right_unique
    }

    pub fn report(&self) -> LogicReport {
        let mut report = LogicReport::new();
        report.insert("Linkset".into(), self.linkset.clone());
        report.insert("ValidationRule".into(), "Link Biunique Validation".into());
        report.insert("Is Binary Linkset".into(), self.is_binary.to_string());
        report.insert("Is Biunique Relation".into(), self.is_biunique().to_string());
        report.insert("Is right-unique Relation".into(), self.right_unique.to_string());
        report.insert("Is left-unique Relation".into(), self.left_unique.to_string());
        report
    }
}

/// Left-unique: no first element of a binary link occurs in any other link of the linkset.
/// Right-unique: the same for second elements.
pub fn check_biunique(linkset: &str, links: &[Link]) -> BiuniqueCheck {
    let is_binary = is_binary_linkset(links);
    let elements: Vec<Vec<LinkElement>> = links.iter().map(Link::elements).collect();
    let unique_side = |pick: fn(&Link) -> Option<LinkElement>| -> bool {
        links.iter().enumerate().all(|(i, link)| {
            let Some(element) = pick(link) else {
                return true;
            };
            !elements
                .iter()
                .enumerate()
                .any(|(j, others)| i != j && others.contains(&element))
        })
    };
    BiuniqueCheck {
        linkset: linkset.to_string(),
        is_binary,
        left_unique: is_binary && unique_side(Link::first),
        right_unique: is_binary && unique_side(Link::second),
    }
}

/// Link elements occurring in more than one link, with the ids of those links.
pub fn shared_elements(links: &[Link]) -> Vec<(LinkElement, Vec<EntityId>)> {
    let mut owners: IndexMap<LinkElement, Vec<EntityId>> = IndexMap::new();
    for link in links {
        for element in link.elements() {
            let ids = owners.entry(element).or_default();
            if !ids.contains(link.id()) {
                ids.push(link.id().clone());
            }
        }
    }
    owners.into_iter().filter(|(_, ids)| ids.len() > 1).collect()
}
