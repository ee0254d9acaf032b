//! Structural conformance checks.
//!
//! A [`Validator`] is a small state machine. Each state runs one family of checks, appends a
//! result for every criterion it looked at and moves on, whether the checks passed or not. The
//! run ends in [`ValidationState::Valid`] or [`ValidationState::Invalid`]; only I/O trouble with
//! the archive itself is an `Err`.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    archive,
    container::{
        index_file_name, InformationContainer, CONTAINER_EXTENSION, DOCUMENTS_DIR, ONTOLOGY_DIR,
        TRIPLES_DIR,
    },
    description::ContainerDescription,
    document::DocumentKind,
    error::IcddError,
    fileutil::{find_child_dir, relative_files},
    graph::{shared, GraphCodec, SharedGraph, TripleStore},
    vocab,
};

use super::{ValidationGroup, ValidationReport, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationState {
    Archive,
    Layout,
    Index,
    Documents,
    Payload,
    Conformance,
    Linksets,
    Valid,
    Invalid,
}

impl ValidationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ValidationState::Valid | ValidationState::Invalid)
    }
}

enum Description<'a> {
    Missing,
    Owned(ContainerDescription),
    Borrowed(&'a mut ContainerDescription),
}

impl Description<'_> {
    fn get(&mut self) -> Option<&mut ContainerDescription> {
        match self {
            Description::Missing => None,
            Description::Owned(description) => Some(description),
            Description::Borrowed(description) => Some(description),
        }
    }
}

pub struct Validator<'a> {
    state: ValidationState,
    report: ValidationReport,
    archive: Option<PathBuf>,
    dir: PathBuf,
    codec: Arc<dyn GraphCodec>,
    index: Option<SharedGraph>,
    description: Description<'a>,
}

impl<'a> Validator<'a> {
    /// Checks an unpacked container directory. When `archive` is given the archive-level
    /// checks run first against that file.
    pub fn for_directory(
        dir: &Path,
        archive: Option<&Path>,
        codec: Arc<dyn GraphCodec>,
    ) -> Validator<'a> {
        Validator {
            state: match archive {
                Some(_) => ValidationState::Archive,
                None => ValidationState::Layout,
            },
            report: ValidationReport::new(),
            archive: archive.map(Path::to_path_buf),
            dir: dir.to_path_buf(),
            codec,
            index: None,
            description: Description::Missing,
        }
    }

    /// Checks an open container against its in-memory index. Archive and layout checks are
    /// skipped.
    pub fn for_container(container: &'a mut InformationContainer) -> Validator<'a> {
        let dir = container.dir().to_path_buf();
        let codec = container.codec();
        let index = container.index().clone();
        Validator {
            state: ValidationState::Index,
            report: ValidationReport::new(),
            archive: None,
            dir,
            codec,
            index: Some(index),
            description: Description::Borrowed(container.description_mut()),
        }
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    fn documents_dir(&self) -> PathBuf {
        find_child_dir(&self.dir, DOCUMENTS_DIR).unwrap_or_else(|| self.dir.join(DOCUMENTS_DIR))
    }

    fn triples_dir(&self) -> PathBuf {
        find_child_dir(&self.dir, TRIPLES_DIR).unwrap_or_else(|| self.dir.join(TRIPLES_DIR))
    }

    fn record<E: Into<Value>, O: Into<Value>>(
        &mut self,
        group: ValidationGroup,
        criterion: impl Into<String>,
        expected: E,
        observed: O,
    ) {
        self.report
            .push(ValidationResult::new(group, criterion, expected, observed));
    }

    fn check(&mut self, group: ValidationGroup, criterion: impl Into<String>, observed: bool) {
        self.report
            .push(ValidationResult::check(group, criterion, observed));
    }

    /// Runs the checks of the current state and advances. Returns the new state.
    pub fn step(&mut self) -> ValidationState {
        self.state = match self.state {
            ValidationState::Archive => {
                self.check_archive();
                ValidationState::Layout
            }
            ValidationState::Layout => {
                self.check_layout();
                ValidationState::Index
            }
            ValidationState::Index => {
                self.check_index();
                ValidationState::Documents
            }
            ValidationState::Documents => {
                self.check_documents();
                ValidationState::Payload
            }
            ValidationState::Payload => {
                self.check_payload();
                ValidationState::Conformance
            }
            ValidationState::Conformance => {
                self.check_conformance();
                ValidationState::Linksets
            }
            ValidationState::Linksets => {
                self.check_linksets();
                if self.report.is_valid() {
                    ValidationState::Valid
                } else {
                    ValidationState::Invalid
                }
            }
            terminal => terminal,
        };
        self.state
    }

    pub fn run(mut self) -> ValidationReport {
        while !self.state.is_terminal() {
            self.step();
        }
        tracing::info!(
            "validation of {:?} finished {:?} ({} of {} criteria failed)",
            self.dir,
            self.state,
            self.report.failure_count(),
            self.report.len()
        );
        self.report
    }

    fn check_archive(&mut self) {
        let Some(archive) = self.archive.clone() else {
            return;
        };
        self.check(
            ValidationGroup::Part1Container,
            "Is valid ZIP file?",
            archive::is_zip(&archive),
        );
        let extension = archive
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        self.record(
            ValidationGroup::Part1Container,
            "Has *.icdd file extension?",
            CONTAINER_EXTENSION,
            extension,
        );
    }

    fn check_layout(&mut self) {
        let index_file = index_file_name(self.codec.as_ref());
        let has_index = self.dir.join(&index_file).is_file();
        self.check(
            ValidationGroup::Part1Container,
            format!("Has {index_file} index file?"),
            has_index,
        );
        for folder in [ONTOLOGY_DIR, DOCUMENTS_DIR, TRIPLES_DIR] {
            let present = find_child_dir(&self.dir, folder).is_some();
            self.check(
                ValidationGroup::Part1Container,
                format!("Has '{folder}' folder?"),
                present,
            );
        }
    }

    fn check_index(&mut self) {
        let index = match self.index.clone() {
            Some(index) => index,
            None => {
                let path = self.dir.join(index_file_name(self.codec.as_ref()));
                let store = match self.codec.parse(&path) {
                    Ok(store) => store,
                    Err(err) => {
                        tracing::error!("index {:?} unreadable: {err}", path);
                        TripleStore::new()
                    }
                };
                let index = shared(store);
                self.index = Some(index.clone());
                index
            }
        };
        let (non_empty, imports_container) = {
            let store = index.read();
            (
                !store.is_empty(),
                store
                    .imports()
                    .iter()
                    .any(|iri| vocab::is_container_ontology(iri)),
            )
        };
        self.check(
            ValidationGroup::Part1Index,
            "Index parses to a non-empty graph?",
            non_empty,
        );
        self.check(
            ValidationGroup::Part1Index,
            "Index imports the Container ontology?",
            imports_container,
        );

        if matches!(self.description, Description::Missing) {
            if let Some(id) = ContainerDescription::find_current(&index) {
                let triples_dir = self.triples_dir();
                self.description = Description::Owned(ContainerDescription::read(
                    &index,
                    id,
                    &triples_dir,
                    self.codec.clone(),
                ));
            }
        }
        let has_description = !matches!(self.description, Description::Missing);
        self.check(
            ValidationGroup::Part1Index,
            "Index declares a container description?",
            has_description,
        );
    }

    fn check_documents(&mut self) {
        let documents_dir = self.documents_dir();
        let Some(description) = self.description.get() else {
            return;
        };
        let mut results = Vec::new();
        for document in description.documents().iter().filter(|d| d.is_internal()) {
            let criterion = match document.kind() {
                DocumentKind::Folder => format!(
                    "Is folder '{}' stored in '{DOCUMENTS_DIR}'?",
                    document.foldername().unwrap_or_default()
                ),
                _ => format!(
                    "Is document '{}' stored in '{DOCUMENTS_DIR}'?",
                    document.filename().unwrap_or_else(|| document.name())
                ),
            };
            results.push((criterion, document.is_resolved(&documents_dir)));
        }
        for (criterion, present) in results {
            self.check(ValidationGroup::Part1Documents, criterion, present);
        }
    }

    fn check_payload(&mut self) {
        let documents_dir = self.documents_dir();
        let files = if documents_dir.is_dir() {
            match relative_files(&documents_dir) {
                Ok(files) => files,
                Err(err) => {
                    tracing::error!("cannot list {:?}: {err}", documents_dir);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let declared: HashSet<String> = match self.description.get() {
            Some(description) => description
                .documents()
                .iter()
                .filter(|d| d.is_internal())
                .filter_map(|d| d.filename())
                .collect(),
            None => HashSet::new(),
        };
        for file in files {
            let listed = declared.contains(&file);
            self.check(
                ValidationGroup::Part1Index,
                format!("Is file '{file}' in '{DOCUMENTS_DIR}' declared in the index?"),
                listed,
            );
        }
    }

    fn check_conformance(&mut self) {
        let observed = self
            .description
            .get()
            .and_then(|d| d.conformance_indicator())
            .map(Value::from)
            .unwrap_or(Value::Null);
        self.record(
            ValidationGroup::Part1Index,
            "Conformance indicator",
            vocab::CONFORMANCE_PART1,
            observed,
        );
    }

    fn check_linksets(&mut self) {
        let triples_dir = self.triples_dir();
        let codec = self.codec.clone();
        let Some(description) = self.description.get() else {
            return;
        };
        let mut results = Vec::new();
        let mut declared = HashSet::new();
        for linkset in description.linksets_mut() {
            let filename = linkset.filename();
            declared.insert(filename.clone());
            let path = triples_dir.join(&filename);
            let stored = path.is_file();
            let parsed = match stored.then(|| codec.parse(&path)) {
                Some(Ok(store)) => Some(store),
                Some(Err(err)) => {
                    tracing::error!("linkset {:?} unreadable: {err}", path);
                    None
                }
                None => None,
            };
            let non_empty = parsed.as_ref().is_some_and(|s| !s.is_empty());
            let imports_linkset = if linkset.is_loaded() {
                linkset.imports_linkset_ontology()
            } else {
                parsed.as_ref().is_some_and(|store| {
                    store.imports().iter().any(|iri| vocab::is_linkset_ontology(iri))
                })
            };
            results.push((format!("{filename}: parses to a non-empty graph?"), non_empty));
            results.push((format!("{filename}: stored in '{TRIPLES_DIR}'?"), stored));
            results.push((
                format!("{filename}: imports the Linkset ontology?"),
                imports_linkset,
            ));
        }
        for file in undeclared_linksets(&triples_dir, &declared, codec.as_ref()) {
            results.push((
                format!("Is linkset '{file}' in '{TRIPLES_DIR}' declared in the index?"),
                false,
            ));
        }
        for (criterion, passed) in results {
            self.check(ValidationGroup::Part1Linkset, criterion, passed);
        }
    }
}

/// Graph files under `triples_dir` that import the Linkset ontology but are missing from
/// `declared`. Files that do not parse are not linksets as far as this check is concerned.
fn undeclared_linksets(
    triples_dir: &Path,
    declared: &HashSet<String>,
    codec: &dyn GraphCodec,
) -> Vec<String> {
    if !triples_dir.is_dir() {
        return Vec::new();
    }
    let files = match relative_files(triples_dir) {
        Ok(files) => files,
        Err(err) => {
            tracing::error!("cannot list {:?}: {err}", triples_dir);
            return Vec::new();
        }
    };
    files
        .into_iter()
        .filter(|file| !declared.contains(file))
        .filter(|file| {
            Path::new(file).extension().and_then(|ext| ext.to_str()) == Some(codec.extension())
        })
        .filter(|file| match codec.parse(&triples_dir.join(file)) {
            Ok(store) => store.imports().iter().any(|iri| vocab::is_linkset_ontology(iri)),
            Err(err) => {
                tracing::warn!("skipping unparsable graph {file}: {err}");
                false
            }
        })
        .collect()
}

/// Validates an archive by extracting it into `scratch`. A file that is not a ZIP archive is a
/// failed criterion, not an error; a missing file is `NotFound`.
pub fn validate_archive(
    archive: &Path,
    scratch: &Path,
    codec: Arc<dyn GraphCodec>,
) -> Result<ValidationReport, IcddError> {
    if !archive.is_file() {
        return Err(IcddError::NotFound(format!("{archive:?}")));
    }
    std::fs::create_dir_all(scratch)?;
    if archive::is_zip(archive) {
        archive::unpack(archive, scratch)?;
    }
    Ok(Validator::for_directory(scratch, Some(archive), codec).run())
}

pub fn validate_directory(dir: &Path, codec: Arc<dyn GraphCodec>) -> ValidationReport {
    Validator::for_directory(dir, None, codec).run()
}

pub fn validate_container(container: &mut InformationContainer) -> ValidationReport {
    Validator::for_container(container).run()
}
