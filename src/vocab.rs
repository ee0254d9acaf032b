//! IRIs of the ISO 21597 container, linkset and extension vocabularies.
//!
//! Everything here is a plain `&'static str` so the graph layer can compare terms without
//! allocating. Namespaced constants are assembled at compile time through the `ct!`, `ls!`,
//! `els!` and `exdc!` macros.

macro_rules! ct {
    ($local:literal) => {
        concat!("https://standards.iso.org/iso/21597/-1/ed-1/en/Container#", $local)
    };
}

macro_rules! ls {
    ($local:literal) => {
        concat!("https://standards.iso.org/iso/21597/-1/ed-1/en/Linkset#", $local)
    };
}

macro_rules! els {
    ($local:literal) => {
        concat!(
            "https://standards.iso.org/iso/21597/-2/ed-1/en/ExtendedLinkset#",
            $local
        )
    };
}

macro_rules! exdc {
    ($local:literal) => {
        concat!(
            "https://icdd.vm.rub.de/ontology/icdd/ExtendedDocument#",
            $local
        )
    };
}

pub const BASE_URI: &str = "https://icdd.vm.rub.de/data/";

pub const CONTAINER_NS: &str = ct!("");
pub const CONTAINER_NS_DRAFT: &str = "http://www.iso-icdd.org/draft/Container.rdf#";
pub const CONTAINER_ONTOLOGY: &str = "https://standards.iso.org/iso/21597/-1/ed-1/en/Container.rdf";
pub const LINKSET_NS: &str = ls!("");
pub const LINKSET_NS_DRAFT: &str = "http://www.iso-icdd.org/draft/Linkset.rdf#";
pub const LINKSET_ONTOLOGY: &str = "https://standards.iso.org/iso/21597/-1/ed-1/en/Linkset.rdf";
pub const EXT_LINKSET_NS: &str = els!("");
pub const EXT_LINKSET_ONTOLOGY: &str =
    "https://standards.iso.org/iso/21597/-2/ed-1/en/ExtendedLinkset.rdf";
pub const EXT_DOCUMENT_NS: &str = exdc!("");
pub const EXT_DOCUMENT_ONTOLOGY: &str =
    "https://icdd.vm.rub.de/ontology/icdd/ExtendedDocument.rdf";

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const OWL_ONTOLOGY: &str = "http://www.w3.org/2002/07/owl#Ontology";
pub const OWL_IMPORTS: &str = "http://www.w3.org/2002/07/owl#imports";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const XSD_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";

/// Value of `ct:conformanceIndicator` for a Part 1 container.
pub const CONFORMANCE_PART1: &str = "ICDD-Part1-Container";

/// Ontology files shipped with every container; never reported as user-defined.
pub const BUILTIN_ONTOLOGY_FILES: [&str; 5] = [
    "Container.rdf",
    "Linkset.rdf",
    "ExtendedLinkset.rdf",
    "ExtendedDocument.rdf",
    "DynamicSemantics.rdf",
];

/// Default prefix table written in front of pretty serializations.
pub const PREFIXES: [(&str, &str); 8] = [
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("owl", OWL_NS),
    ("xsd", XSD_NS),
    ("ct", CONTAINER_NS),
    ("ls", LINKSET_NS),
    ("els", EXT_LINKSET_NS),
    ("exdc", EXT_DOCUMENT_NS),
];

pub mod predicate {
    pub const NAME: &str = ct!("name");
    pub const DESCRIPTION: &str = ct!("description");
    pub const CONFORMANCE_INDICATOR: &str = ct!("conformanceIndicator");
    pub const CONTAINS_DOCUMENT: &str = ct!("containsDocument");
    pub const CONTAINS_LINKSET: &str = ct!("containsLinkset");
    pub const BELONGS_TO_CONTAINER: &str = ct!("belongsToContainer");

    pub const URL: &str = ct!("url");
    pub const REQUESTED: &str = ct!("requested");
    pub const FORMAT: &str = ct!("format");
    pub const FILE_TYPE: &str = ct!("filetype");
    pub const FOLDER_NAME: &str = ct!("foldername");
    pub const CHECKSUM: &str = ct!("checksum");
    pub const CHECKSUM_ALGORITHM: &str = ct!("checksumAlgorithm");
    pub const ENCRYPTION_ALGORITHM: &str = ct!("encryptionAlgorithm");
    pub const FILE_NAME: &str = ct!("filename");
    pub const ALTERNATIVE_DOCUMENT: &str = ct!("alternativeDocument");

    pub const DB_CONNECTION_STRING: &str = exdc!("databaseConnectionString");
    pub const DB_NAME: &str = exdc!("databaseName");
    pub const DB_QUERY_LANGUAGE: &str = exdc!("databaseQueryLanguage");
    pub const DB_TYPE: &str = exdc!("databaseType");
    pub const DB_MAPPING: &str = exdc!("databaseMapping");
    pub const PROXY_BASE_URI: &str = exdc!("baseUri");

    pub const QUERY_EXPRESSION: &str = ls!("queryExpression");
    pub const QUERY_LANGUAGE: &str = ls!("queryLanguage");
    pub const URI: &str = ls!("uri");
    pub const IDENTIFIER: &str = ls!("identifier");
    pub const IDENTIFIER_FIELD: &str = ls!("identifierField");
    pub const HAS_IDENTIFIER: &str = ls!("hasIdentifier");
    pub const HAS_LINK_ELEMENT: &str = ls!("hasLinkElement");
    pub const HAS_FROM_LINK_ELEMENT: &str = ls!("hasFromLinkElement");
    pub const HAS_TO_LINK_ELEMENT: &str = ls!("hasToLinkElement");
    pub const HAS_DOCUMENT: &str = ls!("hasDocument");

    pub const MODIFICATION_DATE: &str = ct!("modificationDate");
    pub const CREATION_DATE: &str = ct!("creationDate");
    pub const IS_MODIFIED: &str = ct!("isModified");
    pub const VERSION_DESCRIPTION: &str = ct!("versionDescription");
    pub const VERSION_ID: &str = ct!("versionId");
    pub const PUBLISHED_BY: &str = ct!("publishedBy");
    pub const CREATED_BY: &str = ct!("createdBy");
    pub const MODIFIED_BY: &str = ct!("modifiedBy");
    pub const PRIOR_VERSION: &str = ct!("priorVersion");

    /// Predicates whose mutation never counts as a content modification.
    pub const BOOKKEEPING: [&str; 6] = [
        super::RDF_TYPE,
        CREATION_DATE,
        MODIFICATION_DATE,
        IS_MODIFIED,
        CREATED_BY,
        MODIFIED_BY,
    ];
}

pub mod class {
    pub const CONTAINER_DESCRIPTION: &str = ct!("ContainerDescription");
    pub const DOCUMENT: &str = ct!("Document");
    pub const INTERNAL_DOCUMENT: &str = ct!("InternalDocument");
    pub const EXTERNAL_DOCUMENT: &str = ct!("ExternalDocument");
    pub const FOLDER_DOCUMENT: &str = ct!("FolderDocument");
    pub const SECURED_DOCUMENT: &str = ct!("SecuredDocument");
    pub const ENCRYPTED_DOCUMENT: &str = ct!("EncryptedDocument");
    pub const LINKSET: &str = ct!("Linkset");
    pub const PARTY: &str = ct!("Party");
    pub const PERSON: &str = ct!("Person");
    pub const ORGANISATION: &str = ct!("Organisation");

    pub const DATABASE_LINK: &str = exdc!("DatabaseLink");
    pub const PAYLOAD_PROXY: &str = exdc!("PayloadProxy");

    pub const LINK: &str = ls!("Link");
    pub const BINARY_LINK: &str = ls!("BinaryLink");
    pub const DIRECTED_LINK: &str = ls!("DirectedLink");
    pub const DIRECTED_BINARY_LINK: &str = ls!("DirectedBinaryLink");
    pub const DIRECTED_1TON_LINK: &str = ls!("Directed1toNLink");
    pub const LINK_ELEMENT: &str = ls!("LinkElement");
    pub const IDENTIFIER: &str = ls!("Identifier");
    pub const STRING_BASED_IDENTIFIER: &str = ls!("StringBasedIdentifier");
    pub const URI_BASED_IDENTIFIER: &str = ls!("URIBasedIdentifier");
    pub const QUERY_BASED_IDENTIFIER: &str = ls!("QueryBasedIdentifier");

    pub const CONFLICTS_WITH: &str = els!("ConflictsWith");
    pub const CONTROLS: &str = els!("Controls");
    pub const ELABORATES: &str = els!("Elaborates");
    pub const HAS_MEMBER: &str = els!("HasMember");
    pub const HAS_PART: &str = els!("HasPart");
    pub const IS_ALTERNATIVE_TO: &str = els!("IsAlternativeTo");
    pub const IS_CONTROLLED_BY: &str = els!("IsControlledBy");
    pub const IS_ELABORATED_BY: &str = els!("IsElaboratedBy");
    pub const IS_IDENTICAL_TO: &str = els!("IsIdenticalTo");
    pub const IS_MEMBER_OF: &str = els!("IsMemberOf");
    pub const IS_PART_OF: &str = els!("IsPartOf");
    pub const IS_SPECIALISED_AS: &str = els!("IsSpecialisedAs");
    pub const IS_SUPERSEDED_BY: &str = els!("IsSupersededBy");
    pub const SPECIALISES: &str = els!("Specialises");
    pub const SUPERSEDES: &str = els!("Supersedes");
}

/// The local name of an IRI: everything after the last `#`, or after the last `/`.
pub fn local_name(iri: &str) -> &str {
    match iri.rfind('#') {
        Some(idx) => &iri[idx + 1..],
        None => iri.rsplit('/').next().unwrap_or(iri),
    }
}

/// True when `iri` names the container ontology, final or draft, with or without `.rdf`.
pub fn is_container_ontology(iri: &str) -> bool {
    let trimmed = iri.trim_end_matches('#');
    trimmed == CONTAINER_ONTOLOGY
        || trimmed == CONTAINER_NS.trim_end_matches('#')
        || trimmed == CONTAINER_NS_DRAFT.trim_end_matches('#')
}

/// True when `iri` names the linkset ontology, final or draft, with or without `.rdf`.
pub fn is_linkset_ontology(iri: &str) -> bool {
    let trimmed = iri.trim_end_matches('#');
    trimmed == LINKSET_ONTOLOGY
        || trimmed == LINKSET_NS.trim_end_matches('#')
        || trimmed == LINKSET_NS_DRAFT.trim_end_matches('#')
}
