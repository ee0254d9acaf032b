//! The container description: one node per container version, owning the document, linkset
//! and party collections.
//!
//! Documents and parties are read live from the index graph on every access. Linksets carry
//! their own lazily loaded sub-graphs and link caches, so the description keeps them in memory
//! alongside a derived `document -> link elements` index that the totality checks compare
//! against.

use std::{collections::HashSet, path::Path, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use petgraph::{algo::is_cyclic_directed, graphmap::DiGraphMap};

use crate::{
    document::{Document, DocumentKind},
    entity::{Entity, EntityId, GraphEntity},
    error::IcddError,
    graph::{GraphCodec, SharedGraph},
    link::{Link, LinkElement},
    linkset::Linkset,
    party::{Party, PartyKind},
    vocab::{self, class, predicate},
};

pub struct ContainerDescription {
    entity: GraphEntity,
    linksets: Vec<Linkset>,
    link_elements_by_document: IndexMap<EntityId, IndexSet<LinkElement>>,
}

impl std::fmt::Debug for ContainerDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerDescription")
            .field("id", self.entity.id())
            .field("linksets", &self.linksets.len())
            .finish()
    }
}

impl Entity for ContainerDescription {
    fn entity(&self) -> &GraphEntity {
        &self.entity
    }
}

impl ContainerDescription {
    /// Asserts a fresh description claiming Part 1 conformance.
    pub fn create(graph: &SharedGraph) -> ContainerDescription {
        let entity = GraphEntity::create(graph, class::CONTAINER_DESCRIPTION);
        entity.set_string(
            predicate::CONFORMANCE_INDICATOR,
            Some(vocab::CONFORMANCE_PART1),
        );
        ContainerDescription {
            entity,
            linksets: Vec::new(),
            link_elements_by_document: IndexMap::new(),
        }
    }

    /// Binds to an existing description and reads its linksets. Linksets whose index node is
    /// unusable are logged and skipped.
    pub fn read(
        graph: &SharedGraph,
        id: EntityId,
        triples_dir: &Path,
        codec: Arc<dyn GraphCodec>,
    ) -> ContainerDescription {
        let entity = GraphEntity::bind(graph, id);
        let linksets = entity
            .get_refs(predicate::CONTAINS_LINKSET)
            .into_iter()
            .filter_map(|ls| Linkset::read(graph, ls, triples_dir, codec.clone()))
            .collect();
        ContainerDescription {
            entity,
            linksets,
            link_elements_by_document: IndexMap::new(),
        }
    }

    /// The description no other description names as its prior version.
    pub fn find_current(graph: &SharedGraph) -> Option<EntityId> {
        let store = graph.read();
        let all: Vec<EntityId> = store
            .instances_of(class::CONTAINER_DESCRIPTION)
            .iter()
            .filter_map(EntityId::from_term)
            .collect();
        let superseded: HashSet<EntityId> = store
            .matching(None, Some(predicate::PRIOR_VERSION), None)
            .filter_map(|t| EntityId::from_term(&t.object))
            .collect();
        all.into_iter().find(|id| !superseded.contains(id))
    }

    pub fn graph(&self) -> &SharedGraph {
        self.entity.graph()
    }

    pub fn description(&self) -> Option<String> {
        self.entity.get_string(predicate::DESCRIPTION)
    }

    pub fn set_description(&self, description: Option<&str>) {
        self.entity.set_string(predicate::DESCRIPTION, description);
    }

    pub fn conformance_indicator(&self) -> Option<String> {
        self.entity.get_string(predicate::CONFORMANCE_INDICATOR)
    }

    pub fn set_conformance_indicator(&self, indicator: &str) {
        self.entity
            .set_string(predicate::CONFORMANCE_INDICATOR, Some(indicator));
    }

    pub fn checksum(&self) -> Option<String> {
        self.entity.get_string(predicate::CHECKSUM)
    }

    pub fn checksum_algorithm(&self) -> Option<String> {
        self.entity.get_string(predicate::CHECKSUM_ALGORITHM)
    }

    pub fn set_checksum(&self, checksum: &str, algorithm: &str) {
        self.entity.set_string(predicate::CHECKSUM, Some(checksum));
        self.entity
            .set_string(predicate::CHECKSUM_ALGORITHM, Some(algorithm));
    }

    pub fn version_id(&self) -> Option<String> {
        self.entity.get_string(predicate::VERSION_ID)
    }

    pub fn set_version_id(&self, version_id: Option<&str>) {
        self.entity.set_string(predicate::VERSION_ID, version_id);
    }

    pub fn version_description(&self) -> Option<String> {
        self.entity.get_string(predicate::VERSION_DESCRIPTION)
    }

    pub fn set_version_description(&self, description: Option<&str>) {
        self.entity
            .set_string(predicate::VERSION_DESCRIPTION, description);
    }

    pub fn published_by(&self) -> Option<EntityId> {
        self.entity.get_ref(predicate::PUBLISHED_BY)
    }

    pub fn set_published_by(&self, party: Option<&EntityId>) {
        self.entity.set_ref(predicate::PUBLISHED_BY, party);
    }

    pub fn prior_version(&self) -> Option<EntityId> {
        self.entity.get_ref(predicate::PRIOR_VERSION)
    }

    /// Links this description to `prior`, refusing anything that would close a cycle in the
    /// version chain.
    pub fn set_prior_version(&self, prior: Option<&EntityId>) -> Result<(), IcddError> {
        if let Some(prior) = prior {
            if would_cycle(self.graph(), self.id(), prior) {
                let err = IcddError::InvalidArgument(format!(
                    "{prior} cannot precede {}: the version chain would loop",
                    self.id()
                ));
                tracing::warn!("{err}");
                return Err(err);
            }
        }
        self.entity.set_ref(predicate::PRIOR_VERSION, prior);
        Ok(())
    }

    /// This description followed by every prior version, newest first.
    pub fn version_chain(&self) -> Result<Vec<EntityId>, IcddError> {
        let mut chain = vec![self.id().clone()];
        let mut seen: HashSet<EntityId> = HashSet::from([self.id().clone()]);
        let mut cursor = self.prior_version();
        while let Some(prior) = cursor {
            if !seen.insert(prior.clone()) {
                return Err(IcddError::MalformedGraph(format!(
                    "version chain of {} loops at {prior}",
                    self.id()
                )));
            }
            cursor = GraphEntity::bind(self.graph(), prior.clone()).get_ref(predicate::PRIOR_VERSION);
            chain.push(prior);
        }
        Ok(chain)
    }

    /// Supersedes this description with a new node in the same graph. The new node copies the
    /// text attributes and the document, linkset and party references, and names the old one as
    /// its prior version. Returns the identifier of the superseded node.
    pub fn next_version(
        &mut self,
        version_id: &str,
        version_description: Option<&str>,
    ) -> Result<EntityId, IcddError> {
        let graph = self.graph().clone();
        let next = GraphEntity::create(&graph, class::CONTAINER_DESCRIPTION);
        for predicate in [
            predicate::DESCRIPTION,
            predicate::CONFORMANCE_INDICATOR,
        ] {
            next.set(predicate, self.entity.get(predicate));
        }
        for predicate in [
            predicate::CONTAINS_DOCUMENT,
            predicate::CONTAINS_LINKSET,
            predicate::PUBLISHED_BY,
            predicate::CREATED_BY,
        ] {
            for reference in self.entity.get_refs(predicate) {
                next.add_ref(predicate, &reference);
            }
        }
        let prior = std::mem::replace(&mut self.entity, next);
        self.set_version_id(Some(version_id));
        self.set_version_description(version_description);
        self.set_prior_version(Some(prior.id()))?;
        tracing::info!(
            prior = %prior.id(),
            next = %self.id(),
            "container description advanced to version {version_id}"
        );
        Ok(prior.id().clone())
    }

    // Documents

    /// Every declared document, in declaration order. Unknown document types are skipped.
    pub fn documents(&self) -> Vec<Document> {
        self.entity
            .get_refs(predicate::CONTAINS_DOCUMENT)
            .into_iter()
            .filter_map(|id| Document::read(self.graph(), id))
            .collect()
    }

    pub fn get_document(&self, id: &EntityId) -> Option<Document> {
        if !self.has_document(id) {
            return None;
        }
        Document::read(self.graph(), id.clone())
    }

    pub fn find_document(&self, name: &str) -> Option<Document> {
        self.documents().into_iter().find(|d| d.name() == name)
    }

    pub fn has_document(&self, id: &EntityId) -> bool {
        self.entity
            .get_refs(predicate::CONTAINS_DOCUMENT)
            .contains(id)
    }

    pub fn add_document(&self, document: &Document) {
        if !self.has_document(document.id()) {
            self.entity
                .add_ref(predicate::CONTAINS_DOCUMENT, document.id());
        }
    }

    pub fn remove_document(&self, id: &EntityId) -> bool {
        self.entity.remove_ref(predicate::CONTAINS_DOCUMENT, id)
    }

    /// Internal documents named `foldername/<leaf>`, recomputed on every call.
    pub fn folder_children(&self, foldername: &str) -> Vec<Document> {
        self.documents()
            .into_iter()
            .filter(|d| d.kind() != DocumentKind::Folder && d.is_child_of(foldername))
            .collect()
    }

    // Linksets

    pub fn linksets(&self) -> &[Linkset] {
        &self.linksets
    }

    pub fn linksets_mut(&mut self) -> &mut [Linkset] {
        &mut self.linksets
    }

    pub fn get_linkset(&self, id: &EntityId) -> Option<&Linkset> {
        self.linksets.iter().find(|ls| ls.id() == id)
    }

    pub fn get_linkset_mut(&mut self, id: &EntityId) -> Option<&mut Linkset> {
        self.linksets.iter_mut().find(|ls| ls.id() == id)
    }

    pub fn find_linkset(&self, filename: &str) -> Option<&Linkset> {
        self.linksets.iter().find(|ls| ls.filename() == filename)
    }

    pub fn has_linkset(&self, id: &EntityId) -> bool {
        self.get_linkset(id).is_some()
    }

    pub fn add_linkset(&mut self, linkset: Linkset) {
        if self.has_linkset(linkset.id()) {
            return;
        }
        self.entity
            .add_ref(predicate::CONTAINS_LINKSET, linkset.id());
        self.linksets.push(linkset);
    }

    /// Detaches the linkset from this description and hands it back.
    pub fn remove_linkset(&mut self, id: &EntityId) -> Option<Linkset> {
        let idx = self.linksets.iter().position(|ls| ls.id() == id)?;
        self.entity.remove_ref(predicate::CONTAINS_LINKSET, id);
        Some(self.linksets.remove(idx))
    }

    // Parties

    pub fn parties(&self) -> Vec<Party> {
        let store = self.graph().read();
        let mut ids: Vec<EntityId> = Vec::new();
        for kind in [PartyKind::Person, PartyKind::Organisation] {
            ids.extend(
                store
                    .instances_of(kind.class_iri())
                    .iter()
                    .filter_map(EntityId::from_term),
            );
        }
        drop(store);
        ids.into_iter()
            .filter_map(|id| Party::read(self.graph(), id))
            .collect()
    }

    pub fn add_party(&self, kind: PartyKind, name: &str) -> Party {
        Party::create(self.graph(), kind, name)
    }

    pub fn get_party(&self, id: &EntityId) -> Option<Party> {
        Party::read(self.graph(), id.clone())
    }

    // Link element index

    fn add_link_elements(&mut self, links: &[Link]) {
        for link in links {
            for element in link.elements() {
                if let Some(document) = element.document() {
                    self.link_elements_by_document
                        .entry(document)
                        .or_default()
                        .insert(element);
                }
            }
        }
    }

    fn refresh_link_elements(&mut self) {
        self.link_elements_by_document.clear();
        let mut all = Vec::new();
        for linkset in self.linksets.iter_mut() {
            all.extend_from_slice(linkset.links());
        }
        self.add_link_elements(&all);
    }

    /// Link elements grouped by the document they reference, across every linkset.
    ///
    /// Links can be created, added or loaded through a linkset handle without the description
    /// seeing it, so the index is rebuilt from the linksets on every call.
    pub fn link_elements_by_document(&mut self) -> &IndexMap<EntityId, IndexSet<LinkElement>> {
        self.refresh_link_elements();
        &self.link_elements_by_document
    }

    /// Links across every linkset that reference `document`.
    pub fn links_for_document(&mut self, document: &EntityId) -> Vec<(EntityId, Link)> {
        let mut found = Vec::new();
        for linkset in self.linksets.iter_mut() {
            let linkset_id = linkset.id().clone();
            for link in linkset.links_for(document) {
                found.push((linkset_id.clone(), link));
            }
        }
        found
    }
}

/// True when pointing `from` at `prior` would make the prior-version relation cyclic.
fn would_cycle(graph: &SharedGraph, from: &EntityId, prior: &EntityId) -> bool {
    if from == prior {
        return true;
    }
    let store = graph.read();
    let edges: Vec<(String, String)> = store
        .matching(None, Some(predicate::PRIOR_VERSION), None)
        .filter_map(|t| Some((t.subject.as_iri()?.to_string(), t.object.as_iri()?.to_string())))
        .filter(|(subject, _)| subject != from.as_str())
        .collect();
    drop(store);
    let mut chain: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (subject, object) in &edges {
        chain.add_edge(subject.as_str(), object.as_str(), ());
    }
    chain.add_edge(from.as_str(), prior.as_str(), ());
    is_cyclic_directed(&chain)
}
