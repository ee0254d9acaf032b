//! Linksets: named, separately stored sub-graphs of links.
//!
//! The `ct:Linkset` node lives in the index graph and only records the file name. The links
//! themselves live in `Payload Triples/<file>`, which is parsed the first time anything asks
//! for the links and cached from then on. Every mutation goes through the linkset so the cache
//! and the backing graph never drift apart.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexSet;

use crate::{
    entity::{Entity, EntityId, GraphEntity},
    error::IcddError,
    graph::{shared, GraphCodec, GraphStyle, SharedGraph, Term, TripleStore},
    identifier::Identifier,
    link::{Link, LinkElement, LinkEnds, LinkKind},
    fileutil::make_unique,
    vocab::{self, class, predicate, RDF_TYPE},
};

/// Namespace of a linkset sub-graph stored as `filename` in the container indexed at `index_base`.
pub fn linkset_namespace(index_base: &str, filename: &str) -> String {
    format!("{}/ls/{filename}", index_base.trim_end_matches(['#', '/']))
}

pub struct Linkset {
    entity: GraphEntity,
    path: PathBuf,
    codec: Arc<dyn GraphCodec>,
    graph: Option<SharedGraph>,
    links: Option<Vec<Link>>,
    skipped: Vec<(EntityId, String)>,
}

impl std::fmt::Debug for Linkset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linkset")
            .field("id", self.entity.id())
            .field("path", &self.path)
            .field("loaded", &self.graph.is_some())
            .finish()
    }
}

impl Entity for Linkset {
    fn entity(&self) -> &GraphEntity {
        &self.entity
    }
}

impl PartialEq for Linkset {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl Linkset {
    /// Creates the index node and an empty sub-graph file under `dir`. The file name gets the
    /// codec's extension and a `(n)` suffix if it is already taken.
    pub fn create(
        index: &SharedGraph,
        dir: &Path,
        filename: &str,
        codec: Arc<dyn GraphCodec>,
    ) -> Result<Linkset, IcddError> {
        if filename.trim().is_empty() {
            let err = IcddError::InvalidArgument(
                "linkset file name must not be empty".to_string(),
            );
            tracing::warn!("{err}");
            return Err(err);
        }
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let wished = format!("{stem}.{}", codec.extension());
        let path = make_unique(&dir.join(&wished));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                let err = IcddError::InvalidArgument(format!("bad linkset file name {wished}"));
                tracing::warn!("{err}");
                err
            })?;

        let entity = GraphEntity::create(index, class::LINKSET);
        entity.set_string(predicate::FILE_NAME, Some(&filename));

        let index_base = index.read().base().unwrap_or(vocab::BASE_URI).to_string();
        let namespace = linkset_namespace(&index_base, &filename);
        let mut store = TripleStore::with_base(&namespace);
        let header = Term::iri(namespace.as_str());
        store.assert(header.clone(), RDF_TYPE, Term::iri(vocab::OWL_ONTOLOGY));
        store.assert(header, vocab::OWL_IMPORTS, Term::iri(vocab::LINKSET_ONTOLOGY));

        let mut linkset = Linkset {
            entity,
            path,
            codec,
            graph: Some(shared(store)),
            links: Some(Vec::new()),
            skipped: Vec::new(),
        };
        linkset.save()?;
        tracing::info!(id = %linkset.id(), "created linkset {filename}");
        Ok(linkset)
    }

    /// Binds to an existing index node. The sub-graph is not touched until first use.
    pub fn read(
        index: &SharedGraph,
        id: EntityId,
        dir: &Path,
        codec: Arc<dyn GraphCodec>,
    ) -> Option<Linkset> {
        let entity = GraphEntity::bind(index, id);
        let Some(filename) = entity.get_string(predicate::FILE_NAME) else {
            tracing::warn!(id = %entity.id(), "linkset without file name skipped");
            return None;
        };
        Some(Linkset {
            entity,
            path: dir.join(filename),
            codec,
            graph: None,
            links: None,
            skipped: Vec::new(),
        })
    }

    pub fn filename(&self) -> String {
        self.entity
            .get_string(predicate::FILE_NAME)
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn set_dir(&mut self, dir: &Path) {
        self.path = dir.join(self.filename());
    }

    pub fn description(&self) -> Option<String> {
        self.entity.get_string(predicate::DESCRIPTION)
    }

    pub fn set_description(&self, description: Option<&str>) {
        self.entity.set_string(predicate::DESCRIPTION, description);
    }

    pub fn prior_version(&self) -> Option<EntityId> {
        self.entity.get_ref(predicate::PRIOR_VERSION)
    }

    pub fn set_prior_version(&self, prior: Option<&EntityId>) {
        self.entity.set_ref(predicate::PRIOR_VERSION, prior);
    }

    pub fn namespace(&self) -> String {
        let index_base = self
            .entity
            .graph()
            .read()
            .base()
            .unwrap_or(vocab::BASE_URI)
            .to_string();
        linkset_namespace(&index_base, &self.filename())
    }

    pub fn is_loaded(&self) -> bool {
        self.graph.is_some()
    }

    /// Parses the sub-graph on first use. A missing or malformed file is logged and treated as
    /// an empty graph.
    pub fn graph(&mut self) -> SharedGraph {
        if let Some(graph) = &self.graph {
            return graph.clone();
        }
        let namespace = self.namespace();
        let store = match self.codec.parse(&self.path) {
            Ok(mut store) => {
                if store.base().is_none() {
                    store.set_base(&namespace);
                }
                store
            }
            Err(err) => {
                tracing::error!("linkset {:?} treated as empty: {err}", self.path);
                TripleStore::with_base(&namespace)
            }
        };
        let graph = shared(store);
        self.graph = Some(graph.clone());
        graph
    }

    /// Loads the sub-graph, failing instead of substituting an empty graph.
    pub fn try_load(&mut self) -> Result<SharedGraph, IcddError> {
        if let Some(graph) = &self.graph {
            return Ok(graph.clone());
        }
        let store = self.codec.parse(&self.path)?;
        let graph = shared(store);
        self.graph = Some(graph.clone());
        Ok(graph)
    }

    /// All links, materialized once and cached, in discovery order.
    pub fn links(&mut self) -> &[Link] {
        if self.links.is_none() {
            let graph = self.graph();
            let (links, skipped) = materialize(&graph);
            tracing::debug!(
                "materialized {} links from {} ({} skipped)",
                links.len(),
                self.filename(),
                skipped.len()
            );
            self.links = Some(links);
            self.skipped = skipped;
        }
        self.links.as_deref().unwrap_or_default()
    }

    /// Link nodes whose type marker is not a known link type, with the marker found.
    pub fn skipped_links(&mut self) -> &[(EntityId, String)] {
        self.links();
        &self.skipped
    }

    fn links_mut(&mut self) -> &mut Vec<Link> {
        self.links();
        self.links.get_or_insert_with(Vec::new)
    }

    pub fn get_link(&mut self, id: &EntityId) -> Option<Link> {
        self.links().iter().find(|l| l.id() == id).cloned()
    }

    /// Distinct links referencing `document` through any element.
    pub fn links_for(&mut self, document: &EntityId) -> Vec<Link> {
        let mut found: IndexSet<Link> = IndexSet::new();
        for link in self.links() {
            if link.references_document(document) {
                found.insert(link.clone());
            }
        }
        found.into_iter().collect()
    }

    pub fn create_link_element(
        &mut self,
        document: &EntityId,
        identifier: Option<&Identifier>,
    ) -> LinkElement {
        let graph = self.graph();
        LinkElement::create(&graph, document, identifier)
    }

    pub fn create_string_identifier(&mut self, field: &str, value: &str) -> Identifier {
        let graph = self.graph();
        Identifier::string_based(&graph, field, value)
    }

    pub fn create_uri_identifier(&mut self, uri: &str) -> Identifier {
        let graph = self.graph();
        Identifier::uri_based(&graph, uri)
    }

    pub fn create_query_identifier(&mut self, expression: &str, language: &str) -> Identifier {
        let graph = self.graph();
        Identifier::query_based(&graph, expression, language)
    }

    /// Builds a link in this linkset's sub-graph and registers it.
    pub fn create_link(&mut self, kind: LinkKind, ends: LinkEnds) -> Result<Link, IcddError> {
        let graph = self.graph();
        let link = Link::create(&graph, kind, ends)?;
        self.entity.stamp_modified();
        self.links_mut().push(link.clone());
        Ok(link)
    }

    /// Registers a link already asserted in this linkset's sub-graph.
    pub fn add_link(&mut self, link: Link) -> Result<(), IcddError> {
        let graph = self.graph();
        if !Arc::ptr_eq(&graph, link.entity().graph()) {
            let err = IcddError::InvalidArgument(format!(
                "link {} belongs to another graph",
                link.id()
            ));
            tracing::warn!("{err}");
            return Err(err);
        }
        let links = self.links_mut();
        if !links.contains(&link) {
            links.push(link);
        }
        Ok(())
    }

    /// Removes the link and its statements. Elements no other link uses are removed too, and
    /// with them identifiers no remaining element points at.
    pub fn delete_link(&mut self, id: &EntityId) -> bool {
        let Some(link) = self.get_link(id) else {
            return false;
        };
        let graph = self.graph();
        let elements = link.elements();
        self.links_mut().retain(|l| l.id() != id);
        link.entity().retract();
        link.entity().retract_references();

        for element in elements {
            let still_used = graph
                .read()
                .matching(None, None, Some(&element.id().term()))
                .next()
                .is_some();
            if still_used {
                continue;
            }
            let identifier = element.identifier_id();
            element.entity().retract();
            if let Some(identifier) = identifier {
                let referenced = graph
                    .read()
                    .matching(None, Some(predicate::HAS_IDENTIFIER), Some(&identifier.term()))
                    .next()
                    .is_some();
                if !referenced {
                    GraphEntity::bind(&graph, identifier).retract();
                }
            }
        }
        self.entity.stamp_modified();
        tracing::debug!("deleted link {id}");
        true
    }

    /// Deletes every link. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let ids: Vec<EntityId> = self.links().iter().map(|l| l.id().clone()).collect();
        ids.iter().filter(|id| self.delete_link(id)).count()
    }

    /// Subjects in the sub-graph outside this linkset's namespace.
    pub fn foreign_nodes(&mut self) -> Vec<Term> {
        let namespace = self.namespace();
        let graph = self.graph();
        let store = graph.read();
        let mut foreign: IndexSet<Term> = IndexSet::new();
        for triple in store.iter() {
            if let Term::Iri(iri) = &triple.subject {
                if iri != &namespace && !iri.starts_with(&format!("{namespace}#")) {
                    foreign.insert(triple.subject.clone());
                }
            }
        }
        foreign.into_iter().collect()
    }

    pub fn imports_linkset_ontology(&mut self) -> bool {
        let graph = self.graph();
        let store = graph.read();
        store.imports().iter().any(|iri| vocab::is_linkset_ontology(iri))
    }

    /// Writes the sub-graph if it was ever loaded.
    pub fn save(&mut self) -> Result<(), IcddError> {
        let Some(graph) = &self.graph else {
            return Ok(());
        };
        let store = graph.read();
        self.codec.serialize(&store, &self.path, GraphStyle::Pretty)
    }

    /// Removes the file and every index statement about this linkset.
    pub fn delete(self) -> Result<(), IcddError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        self.entity.retract();
        self.entity.retract_references();
        tracing::info!("deleted linkset {:?}", self.path);
        Ok(())
    }
}

/// Reads every link node of a sub-graph in discovery order. Nodes that carry link elements but
/// an unknown type marker are returned separately.
fn materialize(graph: &SharedGraph) -> (Vec<Link>, Vec<(EntityId, String)>) {
    let candidates: IndexSet<Term> = {
        let store = graph.read();
        store
            .iter()
            .filter(|t| {
                (t.predicate == RDF_TYPE
                    && t.object
                        .as_iri()
                        .is_some_and(|iri| LinkKind::from_class_iri(iri).is_some()))
                    || t.predicate == predicate::HAS_LINK_ELEMENT
                    || t.predicate == predicate::HAS_FROM_LINK_ELEMENT
                    || t.predicate == predicate::HAS_TO_LINK_ELEMENT
            })
            .map(|t| t.subject.clone())
            .collect()
    };
    let mut links = Vec::new();
    let mut skipped = Vec::new();
    for candidate in candidates {
        let Some(id) = EntityId::from_term(&candidate) else {
            continue;
        };
        match Link::read(graph, id.clone()) {
            Some(link) => links.push(link),
            None => {
                let marker = graph
                    .read()
                    .type_of(&candidate)
                    .unwrap_or_else(|| "<untyped>".to_string());
                skipped.push((id, marker));
            }
        }
    }
    (links, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TurtleCodec;
    use test_log::test;

    struct Fixture {
        _dir: tempfile::TempDir,
        index: SharedGraph,
        linkset: Linkset,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let index = shared(TripleStore::with_base("https://icdd.vm.rub.de/data/test/index"));
        let linkset = Linkset::create(&index, dir.path(), "links", Arc::new(TurtleCodec)).unwrap();
        Fixture {
            _dir: dir,
            index,
            linkset,
        }
    }

    fn doc(n: u32) -> EntityId {
        EntityId::parse(&format!("https://icdd.vm.rub.de/data/test/index#InternalDocument-{n}"))
            .unwrap()
    }

    #[test]
    fn test_create_names_and_header() {
        let mut fx = fixture();
        assert_eq!(fx.linkset.filename(), "links.ttl");
        assert!(fx.linkset.path().is_file());
        assert_eq!(
            fx.linkset.namespace(),
            "https://icdd.vm.rub.de/data/test/index/ls/links.ttl"
        );
        assert!(fx.linkset.imports_linkset_ontology());
        assert!(fx.linkset.foreign_nodes().is_empty());

        let again = Linkset::create(
            &fx.index,
            fx.linkset.path().parent().unwrap(),
            "links.ttl",
            Arc::new(TurtleCodec),
        )
        .unwrap();
        assert_eq!(again.filename(), "links(1).ttl");
    }

    #[test]
    fn test_links_survive_save_and_reload() {
        let mut fx = fixture();
        let a = fx.linkset.create_link_element(&doc(1), None);
        let b = fx.linkset.create_link_element(&doc(2), None);
        let link = fx
            .linkset
            .create_link(LinkKind::BinaryLink, LinkEnds::Undirected(vec![a, b]))
            .unwrap();
        fx.linkset.save().unwrap();

        let dir = fx.linkset.path().parent().unwrap().to_path_buf();
        let mut reread =
            Linkset::read(&fx.index, fx.linkset.id().clone(), &dir, Arc::new(TurtleCodec)).unwrap();
        assert!(!reread.is_loaded());
        let links = reread.links().to_vec();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id(), link.id());
        assert_eq!(links[0].kind(), LinkKind::BinaryLink);
        assert!(links[0].is_valid());
    }

    #[test]
    fn test_delete_link_cascades_unshared_nodes() {
        let mut fx = fixture();
        let shared_identifier = fx.linkset.create_string_identifier("GlobalId", "wall-1");
        let a = fx
            .linkset
            .create_link_element(&doc(1), Some(&shared_identifier));
        let b = fx.linkset.create_link_element(&doc(2), None);
        let c = fx.linkset.create_link_element(&doc(3), None);
        let first = fx
            .linkset
            .create_link(LinkKind::BinaryLink, LinkEnds::Undirected(vec![a.clone(), b.clone()]))
            .unwrap();
        let second = fx
            .linkset
            .create_link(LinkKind::BinaryLink, LinkEnds::Undirected(vec![a.clone(), c]))
            .unwrap();

        assert!(fx.linkset.delete_link(first.id()));
        assert_eq!(fx.linkset.links().len(), 1);
        // `a` is still used by the second link, `b` is gone.
        assert!(a.entity().exists());
        assert!(!b.entity().exists());
        assert!(shared_identifier.entity().exists());

        assert!(fx.linkset.delete_link(second.id()));
        assert!(!a.entity().exists());
        assert!(!shared_identifier.entity().exists());
        assert!(!fx.linkset.delete_link(second.id()));
    }

    #[test]
    fn test_links_for_and_clear() {
        let mut fx = fixture();
        for (from, to) in [(1, 2), (1, 3), (2, 3)] {
            let a = fx.linkset.create_link_element(&doc(from), None);
            let b = fx.linkset.create_link_element(&doc(to), None);
            fx.linkset
                .create_link(LinkKind::BinaryLink, LinkEnds::Undirected(vec![a, b]))
                .unwrap();
        }
        assert_eq!(fx.linkset.links_for(&doc(1)).len(), 2);
        assert_eq!(fx.linkset.links_for(&doc(3)).len(), 2);
        assert_eq!(fx.linkset.clear(), 3);
        assert!(fx.linkset.links().is_empty());
    }

    #[test]
    fn test_unknown_markers_are_reported() {
        let mut fx = fixture();
        let graph = fx.linkset.graph();
        let a = fx.linkset.create_link_element(&doc(1), None);
        let odd = Term::iri(format!("{}#Odd-1", fx.linkset.namespace()));
        {
            let mut store = graph.write();
            store.assert(odd.clone(), RDF_TYPE, Term::iri("https://example.org/Odd"));
            store.assert(odd, predicate::HAS_LINK_ELEMENT, a.id().term());
        }
        fx.linkset.save().unwrap();
        let dir = fx.linkset.path().parent().unwrap().to_path_buf();
        let mut reread =
            Linkset::read(&fx.index, fx.linkset.id().clone(), &dir, Arc::new(TurtleCodec)).unwrap();
        assert!(reread.links().is_empty());
        assert_eq!(reread.skipped_links().len(), 1);
        assert_eq!(reread.skipped_links()[0].1, "https://example.org/Odd");
    }

    #[test]
    fn test_malformed_file_reads_as_empty() {
        let mut fx = fixture();
        std::fs::write(fx.linkset.path(), "this is not turtle").unwrap();
        let dir = fx.linkset.path().parent().unwrap().to_path_buf();
        let mut reread =
            Linkset::read(&fx.index, fx.linkset.id().clone(), &dir, Arc::new(TurtleCodec)).unwrap();
        assert!(reread.links().is_empty());
        assert!(reread.try_load().is_ok());
        let mut strict =
            Linkset::read(&fx.index, fx.linkset.id().clone(), &dir, Arc::new(TurtleCodec)).unwrap();
        assert!(matches!(strict.try_load(), Err(IcddError::MalformedGraph(_))));
    }
}
