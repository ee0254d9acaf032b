//! Document references held by a container description.

use std::path::{Path, PathBuf};

use enumset::{enum_set, EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::{
    entity::{Entity, EntityId, GraphEntity},
    graph::{SharedGraph, Term},
    vocab::{class, predicate},
};

#[derive(EnumSetType, Debug, Hash, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
pub enum DocumentKind {
    Internal,
    External,
    Folder,
    Secured,
    Encrypted,
    DatabaseLink,
    PayloadProxy,
}

/// Kinds whose payload lives under `Payload Documents/`.
pub const INTERNAL_KINDS: EnumSet<DocumentKind> = enum_set!(
    DocumentKind::Internal | DocumentKind::Folder | DocumentKind::Secured | DocumentKind::Encrypted
);

impl DocumentKind {
    pub fn class_iri(&self) -> &'static str {
        match self {
            DocumentKind::Internal => class::INTERNAL_DOCUMENT,
            DocumentKind::External => class::EXTERNAL_DOCUMENT,
            DocumentKind::Folder => class::FOLDER_DOCUMENT,
            DocumentKind::Secured => class::SECURED_DOCUMENT,
            DocumentKind::Encrypted => class::ENCRYPTED_DOCUMENT,
            DocumentKind::DatabaseLink => class::DATABASE_LINK,
            DocumentKind::PayloadProxy => class::PAYLOAD_PROXY,
        }
    }

    pub fn from_class_iri(iri: &str) -> Option<DocumentKind> {
        EnumSet::<DocumentKind>::all()
            .iter()
            .find(|kind| kind.class_iri() == iri)
    }

    pub fn is_internal(&self) -> bool {
        INTERNAL_KINDS.contains(*self)
    }
}

/// A typed view of a `ct:Document` node in the index graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    entity: GraphEntity,
    kind: DocumentKind,
}

impl Entity for Document {
    fn entity(&self) -> &GraphEntity {
        &self.entity
    }
}

impl Document {
    /// Asserts a new document node. File handling is the container's job.
    pub fn create(
        graph: &SharedGraph,
        kind: DocumentKind,
        name: &str,
        file_type: &str,
        file_format: &str,
    ) -> Document {
        let document = Document {
            entity: GraphEntity::create(graph, kind.class_iri()),
            kind,
        };
        document.set_name(name);
        document.set_file_type(file_type);
        document.set_file_format(file_format);
        document.set_requested(false);
        document
    }

    /// Dispatches on the asserted type. Unknown markers yield `None` with a warning.
    pub fn read(graph: &SharedGraph, id: EntityId) -> Option<Document> {
        let entity = GraphEntity::bind(graph, id);
        let Some(class) = entity.class() else {
            tracing::warn!(id = %entity.id(), "document node without type");
            return None;
        };
        match DocumentKind::from_class_iri(&class) {
            Some(kind) => Some(Document { entity, kind }),
            None => {
                tracing::warn!(id = %entity.id(), "unknown document type {class}");
                None
            }
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn is_internal(&self) -> bool {
        self.kind.is_internal()
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

    pub fn file_type(&self) -> String {
        self.entity.get_string(predicate::FILE_TYPE).unwrap_or_default()
    }

    pub fn set_file_type(&self, file_type: &str) {
        self.entity.set_string(predicate::FILE_TYPE, Some(file_type));
    }

    pub fn file_format(&self) -> String {
        self.entity.get_string(predicate::FORMAT).unwrap_or_default()
    }

    pub fn set_file_format(&self, format: &str) {
        self.entity.set_string(predicate::FORMAT, Some(format));
    }

    /// Placeholder for content that has not been delivered yet.
    pub fn requested(&self) -> bool {
        self.entity.get_bool(predicate::REQUESTED)
    }

    pub fn set_requested(&self, requested: bool) {
        self.entity.set_bool(predicate::REQUESTED, requested);
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

    pub fn alternative_document(&self) -> Option<EntityId> {
        self.entity.get_ref(predicate::ALTERNATIVE_DOCUMENT)
    }

    pub fn set_alternative_document(&self, alternative: Option<&EntityId>) {
        self.entity
            .set_ref(predicate::ALTERNATIVE_DOCUMENT, alternative);
    }

    pub fn prior_version(&self) -> Option<EntityId> {
        self.entity.get_ref(predicate::PRIOR_VERSION)
    }

    pub fn set_prior_version(&self, prior: Option<&EntityId>) {
        self.entity.set_ref(predicate::PRIOR_VERSION, prior);
    }

    /// Path relative to `Payload Documents/`, for internal kinds.
    pub fn filename(&self) -> Option<String> {
        self.entity.get_string(predicate::FILE_NAME)
    }

    pub fn set_filename(&self, filename: &str) {
        self.entity.set_string(predicate::FILE_NAME, Some(filename));
    }

    pub fn url(&self) -> Option<String> {
        self.entity.get_string(predicate::URL)
    }

    pub fn set_url(&self, url: &str) {
        self.entity.set(
            predicate::URL,
            Some(Term::typed(url, crate::vocab::XSD_ANY_URI)),
        );
    }

    pub fn foldername(&self) -> Option<String> {
        self.entity.get_string(predicate::FOLDER_NAME)
    }

    pub(crate) fn set_foldername(&self, foldername: &str) {
        self.entity
            .set_string(predicate::FOLDER_NAME, Some(foldername));
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

    pub fn encryption_algorithm(&self) -> Option<String> {
        self.entity.get_string(predicate::ENCRYPTION_ALGORITHM)
    }

    pub fn set_encryption_algorithm(&self, algorithm: &str) {
        self.entity
            .set_string(predicate::ENCRYPTION_ALGORITHM, Some(algorithm));
    }

    pub fn database(&self) -> Option<DatabaseDescriptor> {
        if self.kind != DocumentKind::DatabaseLink {
            return None;
        }
        Some(DatabaseDescriptor {
            connection_string: self
                .entity
                .get_string(predicate::DB_CONNECTION_STRING)
                .unwrap_or_default(),
            name: self.entity.get_string(predicate::DB_NAME).unwrap_or_default(),
            db_type: self.entity.get_string(predicate::DB_TYPE).unwrap_or_default(),
            query_language: self
                .entity
                .get_string(predicate::DB_QUERY_LANGUAGE)
                .unwrap_or_default(),
            mapping: self.entity.get_ref(predicate::DB_MAPPING),
        })
    }

    pub(crate) fn set_database(&self, db: &DatabaseDescriptor) {
        self.entity
            .set_string(predicate::DB_CONNECTION_STRING, Some(&db.connection_string));
        self.entity.set_string(predicate::DB_NAME, Some(&db.name));
        self.entity.set_string(predicate::DB_TYPE, Some(&db.db_type));
        self.entity
            .set_string(predicate::DB_QUERY_LANGUAGE, Some(&db.query_language));
        self.entity
            .set_ref(predicate::DB_MAPPING, db.mapping.as_ref());
    }

    pub fn proxy_base_uri(&self) -> Option<String> {
        self.entity.get_string(predicate::PROXY_BASE_URI)
    }

    pub(crate) fn set_proxy_base_uri(&self, base_uri: &str) {
        self.entity
            .set_string(predicate::PROXY_BASE_URI, Some(base_uri));
    }

    /// Absolute payload path for internal kinds.
    pub fn payload_path(&self, documents_dir: &Path) -> Option<PathBuf> {
        if !self.is_internal() {
            return None;
        }
        self.filename()
            .or_else(|| self.foldername())
            .map(|name| documents_dir.join(name))
    }

    /// Whether the payload is on disk (a directory for folders, a file otherwise). External
    /// kinds are always considered present.
    pub fn is_present(&self, documents_dir: &Path) -> bool {
        match self.payload_path(documents_dir) {
            None if self.is_internal() => false,
            None => true,
            Some(path) if self.kind == DocumentKind::Folder => path.is_dir(),
            Some(path) => path.is_file(),
        }
    }

    /// Satisfies the internal-payload invariant: present on disk, or requested.
    pub fn is_resolved(&self, documents_dir: &Path) -> bool {
        self.requested() || self.is_present(documents_dir)
    }

    /// Logical name below `folder`, if this document is a direct child of it.
    pub fn is_child_of(&self, foldername: &str) -> bool {
        if !self.is_internal() {
            return false;
        }
        let name = self.name();
        matches!(name.rsplit_once('/'), Some((parent, leaf)) if parent == foldername && !leaf.is_empty())
    }

    /// Same identity plus same content. Variants compare their own fields.
    pub fn is_equivalent(&self, other: &Document) -> bool {
        if self != other || self.kind != other.kind {
            return false;
        }
        let common = self.name() == other.name()
            && self.description() == other.description()
            && self.file_type() == other.file_type()
            && self.file_format() == other.file_format()
            && self.requested() == other.requested()
            && self.alternative_document() == other.alternative_document()
            && self.prior_version() == other.prior_version();
        common
            && match self.kind {
                DocumentKind::Internal => self.filename() == other.filename(),
                DocumentKind::Folder => self.foldername() == other.foldername(),
                DocumentKind::Secured => {
                    self.filename() == other.filename()
                        && self.checksum() == other.checksum()
                        && self.checksum_algorithm() == other.checksum_algorithm()
                }
                DocumentKind::Encrypted => {
                    self.filename() == other.filename()
                        && self.encryption_algorithm() == other.encryption_algorithm()
                }
                DocumentKind::External => self.url() == other.url(),
                DocumentKind::DatabaseLink => {
                    self.url() == other.url() && self.database() == other.database()
                }
                DocumentKind::PayloadProxy => {
                    self.url() == other.url() && self.proxy_base_uri() == other.proxy_base_uri()
                }
            }
    }
}

/// Connection facts of a database-link document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub connection_string: String,
    pub name: String,
    pub db_type: String,
    pub query_language: String,
    pub mapping: Option<EntityId>,
}
