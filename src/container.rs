//! The information container: a workfolder holding the index graph, payload documents,
//! linksets, ontologies and loose payload triples.
//!
//! A container is always worked on unpacked. Archives are extracted into a workfolder named
//! after the container guid, and exporting packs that workfolder back into a `.icdd` file.
//!
//! ```text
//! <workfolder>/<guid>/
//!     index.ttl
//!     Ontology Resources/
//!     Payload Documents/
//!     Payload Triples/
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    archive,
    config::IcddConfig,
    description::ContainerDescription,
    document::{DatabaseDescriptor, Document, DocumentKind},
    entity::{Entity, EntityId},
    error::IcddError,
    fileutil::{copy_dir, find_child_dir, make_unique, to_slash},
    graph::{shared, GraphCodec, GraphStyle, SharedGraph, Term, TripleStore, TurtleCodec},
    link::Link,
    linkset::Linkset,
    validation::{
        self,
        logic::{self, BitotalCheck, BiuniqueCheck, ConsistencyCheck, RightTotality},
        ValidationReport,
    },
    vocab::{self, RDF_TYPE},
};

pub const INDEX_STEM: &str = "index";
pub const ONTOLOGY_DIR: &str = "Ontology Resources";
pub const DOCUMENTS_DIR: &str = "Payload Documents";
pub const TRIPLES_DIR: &str = "Payload Triples";
pub const CONTAINER_EXTENSION: &str = "icdd";
pub const CHECKSUM_ALGORITHM: &str = "SHA256";

/// Appends `.icdd` unless `name` already ends with it.
pub fn container_file_name(name: &str) -> String {
    let suffix = format!(".{CONTAINER_EXTENSION}");
    if name.to_ascii_lowercase().ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

/// Index file name for graphs written by `codec`.
pub fn index_file_name(codec: &dyn GraphCodec) -> String {
    format!("{INDEX_STEM}.{}", codec.extension())
}

/// Base IRI of the index graph of the container with `guid`.
/// A malformed location handed in by the caller is a bad argument, not a bad identifier.
fn check_url(url: &str) -> Result<url::Url, IcddError> {
    url::Url::parse(url).map_err(|err| {
        let err = IcddError::InvalidArgument(format!("'{url}' is not a valid URL: {err}"));
        tracing::warn!("{err}");
        err
    })
}

pub fn index_base(base_uri: &str, guid: &str) -> String {
    format!("{}/{guid}/{INDEX_STEM}", base_uri.trim_end_matches('/'))
}

/// Hex SHA-256 of the file at `path`.
pub fn file_checksum(path: &Path) -> Result<String, IcddError> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// A schema file stored under `Ontology Resources/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDefinedOntology {
    pub filename: String,
    pub path: PathBuf,
    /// IRI of the `owl:Ontology` node declared by the file, when it could be read.
    pub iri: Option<String>,
}

/// A graph file under `Payload Triples/` that is not a linkset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadTriples {
    pub filename: String,
    pub path: PathBuf,
}

impl PayloadTriples {
    pub fn load(&self, codec: &dyn GraphCodec) -> Result<TripleStore, IcddError> {
        codec.parse(&self.path)
    }
}

pub struct InformationContainer {
    name: String,
    guid: String,
    dir: PathBuf,
    index: SharedGraph,
    description: ContainerDescription,
    ontologies: Vec<UserDefinedOntology>,
    payload_triples: Vec<PayloadTriples>,
    codec: Arc<dyn GraphCodec>,
}

impl std::fmt::Debug for InformationContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InformationContainer")
            .field("name", &self.name)
            .field("guid", &self.guid)
            .field("dir", &self.dir)
            .finish()
    }
}

impl InformationContainer {
    /// Creates an empty container in a fresh workfolder under `config.workfolder`.
    pub fn create(name: &str, config: &IcddConfig) -> Result<InformationContainer, IcddError> {
        let guid = Uuid::new_v4().to_string();
        InformationContainer::create_in(
            &config.container_dir(&guid),
            name,
            &config.base_uri,
            Arc::new(TurtleCodec),
        )
    }

    /// Creates an empty container rooted at `dir`. The last path component becomes the guid.
    pub fn create_in(
        dir: &Path,
        name: &str,
        base_uri: &str,
        codec: Arc<dyn GraphCodec>,
    ) -> Result<InformationContainer, IcddError> {
        if name.trim().is_empty() {
            let err = IcddError::InvalidArgument(
                "container name must not be empty".to_string(),
            );
            tracing::warn!("{err}");
            return Err(err);
        }
        if dir.join(index_file_name(codec.as_ref())).exists() {
            let err = IcddError::InvalidArgument(format!(
                "{dir:?} already holds a container"
            ));
            tracing::warn!("{err}");
            return Err(err);
        }
        for sub in [ONTOLOGY_DIR, DOCUMENTS_DIR, TRIPLES_DIR] {
            fs::create_dir_all(dir.join(sub))?;
        }
        let guid = guid_of(dir)?;
        let base = index_base(base_uri, &guid);
        let mut store = TripleStore::with_base(&base);
        let header = Term::iri(base.as_str());
        store.assert(header.clone(), RDF_TYPE, Term::iri(vocab::OWL_ONTOLOGY));
        store.assert(header, vocab::OWL_IMPORTS, Term::iri(vocab::CONTAINER_ONTOLOGY));
        let index = shared(store);
        let description = ContainerDescription::create(&index);

        let mut container = InformationContainer {
            name: container_file_name(name),
            guid,
            dir: dir.to_path_buf(),
            index,
            description,
            ontologies: Vec::new(),
            payload_triples: Vec::new(),
            codec,
        };
        container.save()?;
        tracing::info!(guid = %container.guid, "created container {}", container.name);
        Ok(container)
    }

    /// Opens an unpacked container. A missing or malformed index fails the open; bad linksets,
    /// ontologies and payload triples are logged and skipped.
    pub fn open_dir(
        dir: &Path,
        name: &str,
        codec: Arc<dyn GraphCodec>,
    ) -> Result<InformationContainer, IcddError> {
        let index_path = dir.join(index_file_name(codec.as_ref()));
        if !index_path.is_file() {
            return Err(IcddError::NotFound(format!("no index file at {index_path:?}")));
        }
        let index = shared(codec.parse(&index_path)?);
        let description_id = ContainerDescription::find_current(&index).ok_or_else(|| {
            IcddError::NotFound(format!("{index_path:?} declares no container description"))
        })?;
        let triples_dir = find_child_dir(dir, TRIPLES_DIR).unwrap_or_else(|| dir.join(TRIPLES_DIR));
        let description =
            ContainerDescription::read(&index, description_id, &triples_dir, codec.clone());

        let mut container = InformationContainer {
            name: container_file_name(name),
            guid: guid_of(dir)?,
            dir: dir.to_path_buf(),
            index,
            description,
            ontologies: Vec::new(),
            payload_triples: Vec::new(),
            codec,
        };
        container.discover_ontologies();
        container.discover_payload_triples();
        tracing::info!(
            guid = %container.guid,
            "opened container {} ({} documents, {} linksets)",
            container.name,
            container.description.documents().len(),
            container.description.linksets().len()
        );
        Ok(container)
    }

    /// Extracts `archive` into a fresh workfolder and opens it.
    pub fn open_archive(archive: &Path, config: &IcddConfig) -> Result<InformationContainer, IcddError> {
        let guid = Uuid::new_v4().to_string();
        let dir = config.container_dir(&guid);
        archive::unpack(archive, &dir)?;
        let name = archive
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(CONTAINER_EXTENSION);
        InformationContainer::open_dir(&dir, name, Arc::new(TurtleCodec))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: &str) {
        self.name = container_file_name(name);
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index(&self) -> &SharedGraph {
        &self.index
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(index_file_name(self.codec.as_ref()))
    }

    pub fn codec(&self) -> Arc<dyn GraphCodec> {
        self.codec.clone()
    }

    pub fn documents_dir(&self) -> PathBuf {
        find_child_dir(&self.dir, DOCUMENTS_DIR).unwrap_or_else(|| self.dir.join(DOCUMENTS_DIR))
    }

    pub fn triples_dir(&self) -> PathBuf {
        find_child_dir(&self.dir, TRIPLES_DIR).unwrap_or_else(|| self.dir.join(TRIPLES_DIR))
    }

    pub fn ontology_dir(&self) -> PathBuf {
        find_child_dir(&self.dir, ONTOLOGY_DIR).unwrap_or_else(|| self.dir.join(ONTOLOGY_DIR))
    }

    pub fn description(&self) -> &ContainerDescription {
        &self.description
    }

    pub fn description_mut(&mut self) -> &mut ContainerDescription {
        &mut self.description
    }

    fn header(&self) -> Term {
        let base = self.index.read().base().unwrap_or(vocab::BASE_URI).to_string();
        Term::iri(base)
    }

    /// Writes the index and every loaded linkset.
    pub fn save(&mut self) -> Result<(), IcddError> {
        {
            let store = self.index.read();
            self.codec
                .serialize(&store, &self.index_path(), GraphStyle::Pretty)?;
        }
        for linkset in self.description.linksets_mut() {
            linkset.save()?;
        }
        Ok(())
    }

    /// Saves and packs the workfolder into `target`, appending `.icdd` if needed.
    pub fn export(&mut self, target: &Path) -> Result<PathBuf, IcddError> {
        self.save()?;
        let file_name = target
            .file_name()
            .and_then(|s| s.to_str())
            .map(container_file_name)
            .unwrap_or_else(|| self.name.clone());
        let target = target.with_file_name(file_name);
        archive::pack(&self.dir, &target)?;
        tracing::info!(guid = %self.guid, "exported container to {:?}", target);
        Ok(target)
    }

    /// Writes the index graph in `style`, for ad hoc inspection.
    pub fn export_index(&self, target: &Path, style: GraphStyle) -> Result<(), IcddError> {
        let store = self.index.read();
        self.codec.serialize(&store, target, style)
    }

    // Documents

    fn copy_payload(&self, source: &Path, folder: Option<&EntityId>) -> Result<String, IcddError> {
        if !source.is_file() {
            return Err(IcddError::NotFound(format!("payload source {source:?}")));
        }
        let file_name = source
            .file_name()
            .ok_or_else(|| IcddError::InvalidArgument(format!("{source:?} has no file name")))?;
        let documents_dir = self.documents_dir();
        let target_dir = match folder {
            Some(id) => documents_dir.join(self.folder_name_of(id)?),
            None => documents_dir.clone(),
        };
        fs::create_dir_all(&target_dir)?;
        let target = make_unique(&target_dir.join(file_name));
        fs::copy(source, &target)?;
        tracing::debug!("copied payload {:?} to {:?}", source, target);
        Ok(to_slash(target.strip_prefix(&documents_dir)?))
    }

    fn folder_name_of(&self, id: &EntityId) -> Result<String, IcddError> {
        self.description
            .get_document(id)
            .filter(|d| d.kind() == DocumentKind::Folder)
            .and_then(|d| d.foldername())
            .ok_or_else(|| IcddError::NotFound(format!("folder document {id}")))
    }

    fn logical_name(&self, name: &str, folder: Option<&EntityId>) -> Result<String, IcddError> {
        Ok(match folder {
            Some(id) => format!("{}/{name}", self.folder_name_of(id)?),
            None => name.to_string(),
        })
    }

    fn register(&self, document: Document) -> Document {
        self.description.add_document(&document);
        document
    }

    /// Copies `source` into `Payload Documents/` (or into `folder`) under a collision-free
    /// file name and declares it.
    pub fn create_internal_document(
        &self,
        source: &Path,
        name: &str,
        file_type: &str,
        format: &str,
        folder: Option<&EntityId>,
    ) -> Result<Document, IcddError> {
        let filename = self.copy_payload(source, folder)?;
        let name = self.logical_name(name, folder)?;
        let document = Document::create(&self.index, DocumentKind::Internal, &name, file_type, format);
        document.set_filename(&filename);
        Ok(self.register(document))
    }

    /// Declares an internal document whose content has not been delivered yet.
    pub fn create_requested_document(
        &self,
        name: &str,
        file_type: &str,
        format: &str,
    ) -> Result<Document, IcddError> {
        if name.trim().is_empty() {
            let err = IcddError::InvalidArgument("document name must not be empty".to_string());
            tracing::warn!("{err}");
            return Err(err);
        }
        let document = Document::create(&self.index, DocumentKind::Internal, name, file_type, format);
        document.set_filename(name);
        document.set_requested(true);
        Ok(self.register(document))
    }

    pub fn create_folder_document(&self, foldername: &str) -> Result<Document, IcddError> {
        let foldername = foldername.trim_matches('/');
        if foldername.is_empty() || foldername.split('/').any(|part| part == "..") {
            let err = IcddError::InvalidArgument(format!("bad folder name '{foldername}'"));
            tracing::warn!("{err}");
            return Err(err);
        }
        let documents_dir = self.documents_dir();
        let path = make_unique(&documents_dir.join(foldername));
        fs::create_dir_all(&path)?;
        let foldername = to_slash(path.strip_prefix(&documents_dir)?);
        let document =
            Document::create(&self.index, DocumentKind::Folder, &foldername, "folder", "folder");
        document.set_foldername(&foldername);
        Ok(self.register(document))
    }

    /// Internal document carrying the SHA-256 checksum of its payload.
    pub fn create_secured_document(
        &self,
        source: &Path,
        name: &str,
        file_type: &str,
        format: &str,
    ) -> Result<Document, IcddError> {
        let filename = self.copy_payload(source, None)?;
        let checksum = file_checksum(&self.documents_dir().join(&filename))?;
        let document = Document::create(&self.index, DocumentKind::Secured, name, file_type, format);
        document.set_filename(&filename);
        document.set_checksum(&checksum, CHECKSUM_ALGORITHM);
        Ok(self.register(document))
    }

    /// Recomputes a secured document's checksum and compares it with the declared one.
    pub fn verify_checksum(&self, id: &EntityId) -> Result<bool, IcddError> {
        let document = self
            .description
            .get_document(id)
            .ok_or_else(|| IcddError::NotFound(format!("document {id}")))?;
        let (Some(expected), Some(path)) = (
            document.checksum(),
            document.payload_path(&self.documents_dir()),
        ) else {
            return Ok(false);
        };
        Ok(file_checksum(&path)? == expected)
    }

    pub fn create_encrypted_document(
        &self,
        source: &Path,
        name: &str,
        file_type: &str,
        format: &str,
        algorithm: &str,
    ) -> Result<Document, IcddError> {
        let filename = self.copy_payload(source, None)?;
        let document =
            Document::create(&self.index, DocumentKind::Encrypted, name, file_type, format);
        document.set_filename(&filename);
        document.set_encryption_algorithm(algorithm);
        Ok(self.register(document))
    }

    pub fn create_external_document(
        &self,
        url: &str,
        name: &str,
        file_type: &str,
        format: &str,
    ) -> Result<Document, IcddError> {
        check_url(url)?;
        let document = Document::create(&self.index, DocumentKind::External, name, file_type, format);
        document.set_url(url);
        Ok(self.register(document))
    }

    pub fn create_database_link(
        &self,
        name: &str,
        database: &DatabaseDescriptor,
    ) -> Result<Document, IcddError> {
        if database.connection_string.is_empty() {
            let err = IcddError::InvalidArgument(
                "database link needs a connection string".to_string(),
            );
            tracing::warn!("{err}");
            return Err(err);
        }
        if let Some(mapping) = &database.mapping {
            if !self.description.has_document(mapping) {
                return Err(IcddError::NotFound(format!("mapping document {mapping}")));
            }
        }
        let document = Document::create(
            &self.index,
            DocumentKind::DatabaseLink,
            name,
            &database.db_type,
            &database.query_language,
        );
        document.set_database(database);
        Ok(self.register(document))
    }

    pub fn create_payload_proxy(&self, name: &str, base_uri: &str) -> Result<Document, IcddError> {
        check_url(base_uri)?;
        let document =
            Document::create(&self.index, DocumentKind::PayloadProxy, name, "http", "rfc3986");
        document.set_proxy_base_uri(base_uri);
        Ok(self.register(document))
    }

    /// Renames a folder document and its directory, then rewrites the logical name and file
    /// name of everything inside it. Returns the number of documents that moved along.
    pub fn rename_folder(&self, id: &EntityId, new_name: &str) -> Result<usize, IcddError> {
        let old = self.folder_name_of(id)?;
        let new_name = new_name.trim_matches('/');
        if new_name.is_empty() || new_name.split('/').any(|part| part == "..") {
            let err = IcddError::InvalidArgument(format!("bad folder name '{new_name}'"));
            tracing::warn!("{err}");
            return Err(err);
        }
        if new_name == old {
            return Ok(0);
        }
        let documents_dir = self.documents_dir();
        let from = documents_dir.join(&old);
        let to = documents_dir.join(new_name);
        if to.exists() {
            let err = IcddError::InvalidArgument(format!("folder '{new_name}' already exists"));
            tracing::warn!("{err}");
            return Err(err);
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        if from.is_dir() {
            fs::rename(&from, &to)?;
        } else {
            fs::create_dir_all(&to)?;
        }

        let prefix = format!("{old}/");
        let rewrite = |value: &str| -> Option<String> {
            value
                .strip_prefix(&prefix)
                .map(|rest| format!("{new_name}/{rest}"))
        };
        let mut moved = 0;
        for document in self.description.documents() {
            if document.id() == id {
                document.set_name(new_name);
                document.set_foldername(new_name);
                continue;
            }
            let mut touched = false;
            if let Some(name) = rewrite(&document.name()) {
                document.set_name(&name);
                touched = true;
            }
            if let Some(filename) = document.filename().as_deref().and_then(rewrite) {
                document.set_filename(&filename);
                touched = true;
            }
            if let Some(foldername) = document.foldername().as_deref().and_then(rewrite) {
                document.set_foldername(&foldername);
                touched = true;
            }
            if touched {
                moved += 1;
            }
        }
        tracing::info!("renamed folder '{old}' to '{new_name}' ({moved} documents)");
        Ok(moved)
    }

    /// Moves an internal document into `folder`, or back to the top level with `None`.
    pub fn move_to_folder(&self, id: &EntityId, folder: Option<&EntityId>) -> Result<(), IcddError> {
        let document = self
            .description
            .get_document(id)
            .filter(|d| d.is_internal() && d.kind() != DocumentKind::Folder)
            .ok_or_else(|| IcddError::NotFound(format!("internal document {id}")))?;
        let documents_dir = self.documents_dir();
        let target_dir = match folder {
            Some(folder) => documents_dir.join(self.folder_name_of(folder)?),
            None => documents_dir.clone(),
        };
        let leaf_name = document
            .name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let new_name = self.logical_name(&leaf_name, folder)?;

        if let Some(current) = document.payload_path(&documents_dir).filter(|p| p.is_file()) {
            let file_name = current
                .file_name()
                .ok_or_else(|| IcddError::InvalidArgument(format!("{current:?} has no file name")))?;
            fs::create_dir_all(&target_dir)?;
            let target = make_unique(&target_dir.join(file_name));
            fs::rename(&current, &target)?;
            document.set_filename(&to_slash(target.strip_prefix(&documents_dir)?));
        } else if let Some(filename) = document.filename() {
            let leaf = filename.rsplit('/').next().unwrap_or_default();
            let rel = target_dir.join(leaf);
            document.set_filename(&to_slash(rel.strip_prefix(&documents_dir)?));
        }
        document.set_name(&new_name);
        Ok(())
    }

    /// Deletes a document: its payload (unless requested), every link referencing it in any
    /// linkset, and its statements. A folder first hands its children to the top level.
    /// Returns the number of links removed.
    pub fn delete_document(&mut self, id: &EntityId) -> Result<usize, IcddError> {
        let document = self
            .description
            .get_document(id)
            .ok_or_else(|| IcddError::NotFound(format!("document {id}")))?;
        let documents_dir = self.documents_dir();
        match document.kind() {
            DocumentKind::Folder => {
                if let Some(foldername) = document.foldername() {
                    for child in self.description.folder_children(&foldername) {
                        self.move_to_folder(child.id(), None)?;
                    }
                    let path = documents_dir.join(&foldername);
                    if path.is_dir() {
                        fs::remove_dir_all(&path)?;
                    }
                }
            }
            kind if kind.is_internal() && !document.requested() => {
                if let Some(path) = document.payload_path(&documents_dir).filter(|p| p.is_file()) {
                    fs::remove_file(&path)?;
                }
            }
            _ => {}
        }

        let mut removed = 0;
        for linkset in self.description.linksets_mut() {
            for link in linkset.links_for(id) {
                if linkset.delete_link(link.id()) {
                    removed += 1;
                }
            }
        }
        self.description.remove_document(id);
        document.entity().retract();
        document.entity().retract_references();
        tracing::info!("deleted document {} and {removed} links", document.name());
        Ok(removed)
    }

    /// Bumps a document's version in place.
    pub fn document_next_version(
        &self,
        id: &EntityId,
        version_id: &str,
        version_description: Option<&str>,
    ) -> Result<Document, IcddError> {
        let document = self
            .description
            .get_document(id)
            .ok_or_else(|| IcddError::NotFound(format!("document {id}")))?;
        document.set_version_id(Some(version_id));
        document.set_version_description(version_description);
        Ok(document)
    }

    /// Copies a document of `source` into this container as its next version. The copy gets a
    /// new identifier and names the original as prior version.
    pub fn adopt_document(
        &self,
        source: &InformationContainer,
        id: &EntityId,
        version_id: &str,
        version_description: Option<&str>,
    ) -> Result<Document, IcddError> {
        let original = source
            .description
            .get_document(id)
            .ok_or_else(|| IcddError::NotFound(format!("document {id}")))?;
        let name = original.name();
        let copy = match original.kind() {
            DocumentKind::Folder => self.create_folder_document(&name)?,
            kind if kind.is_internal() && !original.requested() => {
                let path = original
                    .payload_path(&source.documents_dir())
                    .ok_or_else(|| IcddError::NotFound(format!("payload of {id}")))?;
                let filename = self.copy_payload(&path, None)?;
                let copy = Document::create(
                    &self.index,
                    kind,
                    &name,
                    &original.file_type(),
                    &original.file_format(),
                );
                copy.set_filename(&filename);
                if let Some(checksum) = original.checksum() {
                    let algorithm = original
                        .checksum_algorithm()
                        .unwrap_or_else(|| CHECKSUM_ALGORITHM.to_string());
                    copy.set_checksum(&checksum, &algorithm);
                }
                if let Some(algorithm) = original.encryption_algorithm() {
                    copy.set_encryption_algorithm(&algorithm);
                }
                self.register(copy)
            }
            DocumentKind::DatabaseLink => {
                let database = original.database().unwrap_or_default();
                let copy = Document::create(
                    &self.index,
                    DocumentKind::DatabaseLink,
                    &name,
                    &database.db_type,
                    &database.query_language,
                );
                copy.set_database(&DatabaseDescriptor {
                    mapping: None,
                    ..database
                });
                self.register(copy)
            }
            kind => {
                let copy = Document::create(
                    &self.index,
                    kind,
                    &name,
                    &original.file_type(),
                    &original.file_format(),
                );
                if let Some(url) = original.url() {
                    copy.set_url(&url);
                }
                if let Some(base) = original.proxy_base_uri() {
                    copy.set_proxy_base_uri(&base);
                }
                if original.requested() {
                    copy.set_requested(true);
                    copy.set_filename(&original.filename().unwrap_or(name));
                }
                self.register(copy)
            }
        };
        copy.set_prior_version(Some(original.id()));
        copy.set_version_id(Some(version_id));
        copy.set_version_description(version_description);
        Ok(copy)
    }

    /// Links across all linksets that reference the document, with their linkset ids.
    pub fn links_for_document(&mut self, id: &EntityId) -> Vec<(EntityId, Link)> {
        self.description.links_for_document(id)
    }

    // Linksets

    pub fn create_linkset(&mut self, filename: &str) -> Result<EntityId, IcddError> {
        let linkset = Linkset::create(
            &self.index,
            &self.triples_dir(),
            filename,
            self.codec.clone(),
        )?;
        let id = linkset.id().clone();
        self.description.add_linkset(linkset);
        Ok(id)
    }

    pub fn linkset(&self, id: &EntityId) -> Option<&Linkset> {
        self.description.get_linkset(id)
    }

    pub fn linkset_mut(&mut self, id: &EntityId) -> Option<&mut Linkset> {
        self.description.get_linkset_mut(id)
    }

    pub fn delete_linkset(&mut self, id: &EntityId) -> Result<(), IcddError> {
        let linkset = self
            .description
            .remove_linkset(id)
            .ok_or_else(|| IcddError::NotFound(format!("linkset {id}")))?;
        linkset.delete()?;
        Ok(())
    }

    fn linkset_links(&mut self, id: &EntityId) -> Result<(String, Vec<Link>), IcddError> {
        let linkset = self
            .description
            .get_linkset_mut(id)
            .ok_or_else(|| IcddError::NotFound(format!("linkset {id}")))?;
        Ok((linkset.filename(), linkset.links().to_vec()))
    }

    pub fn check_linkset_consistency(&mut self, id: &EntityId) -> Result<ConsistencyCheck, IcddError> {
        let (filename, links) = self.linkset_links(id)?;
        Ok(logic::check_consistency(&filename, &links))
    }

    pub fn check_linkset_bitotal(
        &mut self,
        id: &EntityId,
        right_totality: RightTotality,
    ) -> Result<BitotalCheck, IcddError> {
        let (filename, links) = self.linkset_links(id)?;
        Ok(logic::check_bitotal(
            &filename,
            &links,
            self.description.link_elements_by_document(),
            right_totality,
        ))
    }

    pub fn check_linkset_biunique(&mut self, id: &EntityId) -> Result<BiuniqueCheck, IcddError> {
        let (filename, links) = self.linkset_links(id)?;
        Ok(logic::check_biunique(&filename, &links))
    }

    /// Structural conformance of the open container. Archive-level checks are skipped.
    pub fn validate(&mut self) -> ValidationReport {
        validation::validate_container(self)
    }

    // Ontologies and payload triples

    pub fn ontologies(&self) -> &[UserDefinedOntology] {
        &self.ontologies
    }

    pub fn payload_triples(&self) -> &[PayloadTriples] {
        &self.payload_triples
    }

    fn read_ontology_iri(&self, path: &Path) -> Option<String> {
        let is_graph = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.codec.extension()));
        if !is_graph {
            return None;
        }
        match self.codec.parse(path) {
            Ok(store) => store
                .instances_of(vocab::OWL_ONTOLOGY)
                .first()
                .and_then(|t| t.as_iri().map(str::to_string)),
            Err(err) => {
                tracing::warn!("ontology {:?} skipped: {err}", path);
                None
            }
        }
    }

    fn discover_ontologies(&mut self) {
        let dir = self.ontology_dir();
        let Ok(entries) = fs::read_dir(&dir) else {
            return;
        };
        let mut found = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !path.is_file() || vocab::BUILTIN_ONTOLOGY_FILES.contains(&filename.as_str()) {
                continue;
            }
            found.push(UserDefinedOntology {
                iri: self.read_ontology_iri(&path),
                filename,
                path,
            });
        }
        found.sort_by(|a, b| a.filename.cmp(&b.filename));
        self.ontologies = found;
    }

    fn discover_payload_triples(&mut self) {
        let dir = self.triples_dir();
        let Ok(entries) = fs::read_dir(&dir) else {
            return;
        };
        let mut found = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !path.is_file() || self.description.find_linkset(&filename).is_some() {
                continue;
            }
            found.push(PayloadTriples { filename, path });
        }
        found.sort_by(|a, b| a.filename.cmp(&b.filename));
        self.payload_triples = found;
    }

    /// Copies a schema file into `Ontology Resources/` and, when it declares an ontology IRI,
    /// imports that IRI from the index.
    pub fn create_ontology(&mut self, source: &Path) -> Result<UserDefinedOntology, IcddError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| IcddError::InvalidArgument(format!("{source:?} has no file name")))?;
        if !source.is_file() {
            return Err(IcddError::NotFound(format!("ontology source {source:?}")));
        }
        let dir = self.ontology_dir();
        fs::create_dir_all(&dir)?;
        let path = make_unique(&dir.join(file_name));
        fs::copy(source, &path)?;
        let ontology = UserDefinedOntology {
            filename: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            iri: self.read_ontology_iri(&path),
            path,
        };
        if let Some(iri) = &ontology.iri {
            let header = self.header();
            self.index
                .write()
                .assert(header, vocab::OWL_IMPORTS, Term::iri(iri.as_str()));
        }
        self.ontologies.push(ontology.clone());
        Ok(ontology)
    }

    pub fn delete_ontology(&mut self, filename: &str) -> Result<(), IcddError> {
        let idx = self
            .ontologies
            .iter()
            .position(|o| o.filename == filename)
            .ok_or_else(|| IcddError::NotFound(format!("ontology {filename}")))?;
        let ontology = self.ontologies.remove(idx);
        if ontology.path.exists() {
            fs::remove_file(&ontology.path)?;
        }
        if let Some(iri) = ontology.iri {
            let header = self.header();
            self.index
                .write()
                .retract(Some(&header), Some(vocab::OWL_IMPORTS), Some(&Term::iri(iri)));
        }
        Ok(())
    }

    /// Writes `store` as a new graph file in `Payload Triples/`.
    pub fn create_payload_triples(
        &mut self,
        filename: &str,
        store: &TripleStore,
    ) -> Result<PayloadTriples, IcddError> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IcddError::InvalidArgument(format!("bad file name '{filename}'")))?;
        let dir = self.triples_dir();
        fs::create_dir_all(&dir)?;
        let path = make_unique(&dir.join(format!("{stem}.{}", self.codec.extension())));
        self.codec.serialize(store, &path, GraphStyle::Pretty)?;
        let triples = PayloadTriples {
            filename: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path,
        };
        self.payload_triples.push(triples.clone());
        Ok(triples)
    }

    pub fn delete_payload_triples(&mut self, filename: &str) -> Result<(), IcddError> {
        let idx = self
            .payload_triples
            .iter()
            .position(|p| p.filename == filename)
            .ok_or_else(|| IcddError::NotFound(format!("payload triples {filename}")))?;
        let triples = self.payload_triples.remove(idx);
        if triples.path.exists() {
            fs::remove_file(&triples.path)?;
        }
        Ok(())
    }

    // Versioning and lifecycle

    /// Supersedes the current description in place. Returns the superseded description id.
    pub fn next_version(
        &mut self,
        version_id: &str,
        version_description: Option<&str>,
    ) -> Result<EntityId, IcddError> {
        self.description.next_version(version_id, version_description)
    }

    /// Saves, copies the workfolder to a sibling named `guid` (fresh when `None`), opens the
    /// copy as `name` and advances its version there. This container is left untouched.
    pub fn next_version_as(
        &mut self,
        version_id: &str,
        version_description: Option<&str>,
        name: &str,
        guid: Option<&str>,
    ) -> Result<InformationContainer, IcddError> {
        self.save()?;
        let guid = guid
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let parent = self.dir.parent().unwrap_or(&self.dir);
        let target = parent.join(&guid);
        if target.exists() {
            let err = IcddError::InvalidArgument(format!(
                "a workfolder for {guid} already exists"
            ));
            tracing::warn!("{err}");
            return Err(err);
        }
        copy_dir(&self.dir, &target)?;
        let mut next = InformationContainer::open_dir(&target, name, self.codec.clone())?;
        next.next_version(version_id, version_description)?;
        next.save()?;
        Ok(next)
    }

    /// A copy under a new guid and name, starting a fresh version line at "1".
    pub fn duplicate(&mut self, name: &str) -> Result<InformationContainer, IcddError> {
        let description = format!("Version 1 of {}", self.name);
        self.next_version_as("1", Some(&description), name, None)
    }

    /// Moves the workfolder under `new_parent`, keeping the guid.
    pub fn move_to(&mut self, new_parent: &Path) -> Result<(), IcddError> {
        self.save()?;
        let target = new_parent.join(&self.guid);
        if target.exists() {
            let err = IcddError::InvalidArgument(format!("{target:?} already exists"));
            tracing::warn!("{err}");
            return Err(err);
        }
        fs::create_dir_all(new_parent)?;
        if fs::rename(&self.dir, &target).is_err() {
            copy_dir(&self.dir, &target)?;
            fs::remove_dir_all(&self.dir)?;
        }
        tracing::info!("moved container {} to {:?}", self.guid, target);
        self.dir = target;
        let triples_dir = self.triples_dir();
        for linkset in self.description.linksets_mut() {
            linkset.set_dir(&triples_dir);
        }
        self.discover_ontologies();
        self.discover_payload_triples();
        Ok(())
    }

    /// Removes the workfolder.
    pub fn delete(self) -> Result<(), IcddError> {
        fs::remove_dir_all(&self.dir)?;
        tracing::info!("deleted container {}", self.guid);
        Ok(())
    }
}

fn guid_of(dir: &Path) -> Result<String, IcddError> {
    dir.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| IcddError::InvalidArgument(format!("{dir:?} cannot name a container")))
}
