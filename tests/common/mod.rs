//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::PathBuf;

use icdd_core::{
    config::IcddConfig,
    container::InformationContainer,
    document::Document,
    link::{LinkEnds, LinkKind},
    EntityId,
};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A configuration whose workfolder lives inside `temp_dir`.
#[allow(dead_code)]
pub fn test_config(temp_dir: &TempDir) -> IcddConfig {
    IcddConfig {
        workfolder: temp_dir.path().join("work"),
        ..Default::default()
    }
}

/// Writes `text` to `<temp_dir>/sources/<name>` and returns the path.
#[allow(dead_code)]
pub fn write_source(temp_dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let dir = temp_dir.path().join("sources");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Adds a plain-text internal document named after `file`.
#[allow(dead_code)]
pub fn add_text_document(
    temp_dir: &TempDir,
    container: &InformationContainer,
    file: &str,
) -> Document {
    let source = write_source(temp_dir, file, &format!("contents of {file}"));
    container
        .create_internal_document(&source, file, "txt", "text/plain", None)
        .unwrap()
}

/// Builds a `kind` link between two documents in `linkset`. Directed kinds take `a` as From.
#[allow(dead_code)]
pub fn link_documents(
    container: &mut InformationContainer,
    linkset: &EntityId,
    kind: LinkKind,
    a: &EntityId,
    b: &EntityId,
) -> EntityId {
    let linkset = container.linkset_mut(linkset).unwrap();
    let first = linkset.create_link_element(a, None);
    let second = linkset.create_link_element(b, None);
    let ends = if kind.shape().is_directed() {
        LinkEnds::Directed {
            from: vec![first],
            to: vec![second],
        }
    } else {
        LinkEnds::Undirected(vec![first, second])
    };
    let link = linkset.create_link(kind, ends).unwrap();
    icdd_core::Entity::id(&link).clone()
}

/// A container called "site" with two text documents and one linkset between them.
///
/// Returns the container, the two document ids and the linkset id.
#[allow(dead_code)]
pub fn linked_container(
    temp_dir: &TempDir,
) -> (InformationContainer, EntityId, EntityId, EntityId) {
    let config = test_config(temp_dir);
    let mut container = InformationContainer::create("site", &config).unwrap();
    let a = add_text_document(temp_dir, &container, "a.txt");
    let b = add_text_document(temp_dir, &container, "b.txt");
    let a = icdd_core::Entity::id(&a).clone();
    let b = icdd_core::Entity::id(&b).clone();
    let linkset = container.create_linkset("links").unwrap();
    link_documents(&mut container, &linkset, LinkKind::BinaryLink, &a, &b);
    (container, a, b, linkset)
}
