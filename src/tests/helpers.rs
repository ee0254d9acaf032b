//! Shared fixtures for the crate-internal tests.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use tempfile::TempDir;

use crate::{
    container::InformationContainer,
    document::Document,
    graph::TurtleCodec,
    link::{LinkEnds, LinkKind},
    vocab, EntityId,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` under a thread-local subscriber and returns its WARN-and-above output.
pub fn warnings_during<F: FnOnce()>(f: F) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = captured.0.lock().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// An empty container in a scratch directory. Keep the `TempDir` alive for the test.
pub fn scratch_container() -> (TempDir, InformationContainer) {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let container = InformationContainer::create_in(
        &dir.path().join("container"),
        "scratch",
        vocab::BASE_URI,
        Arc::new(TurtleCodec),
    )
    .unwrap();
    (dir, container)
}

/// Writes a payload source file outside the container.
pub fn source_file(dir: &Path, name: &str, text: &str) -> PathBuf {
    let sources = dir.join("sources");
    std::fs::create_dir_all(&sources).unwrap();
    let path = sources.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Adds `count` plain-text internal documents named `doc<i>.txt`.
pub fn add_documents(dir: &Path, container: &InformationContainer, count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let name = format!("doc{i}.txt");
            let src = source_file(dir, &name, &format!("content {i}"));
            container
                .create_internal_document(&src, &name, "txt", "text/plain", None)
                .unwrap()
        })
        .collect()
}

/// Links `a` and `b` with a fresh binary link in `linkset`.
pub fn link_pair(
    container: &mut InformationContainer,
    linkset: &EntityId,
    a: &EntityId,
    b: &EntityId,
) -> EntityId {
    let linkset = container.linkset_mut(linkset).unwrap();
    let ea = linkset.create_link_element(a, None);
    let eb = linkset.create_link_element(b, None);
    let link = linkset
        .create_link(LinkKind::BinaryLink, LinkEnds::Undirected(vec![ea, eb]))
        .unwrap();
    crate::Entity::id(&link).clone()
}
