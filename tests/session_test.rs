//! Shared session state under concurrent use.

mod common;

use std::{sync::Arc, sync::mpsc, thread, time::Duration};

use icdd_core::{
    session::{
        ContainerCache, ContainerWriter, ExportLock, ReaderRegistry, SynchronizedReader,
        WorkfolderReader,
    },
    IcddError,
};
use pretty_assertions::assert_eq;
use test_log::test;

#[test]
fn test_concurrent_reads_of_one_archive_never_overlap() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&temp_dir);
    let (mut container, _, _, _) = common::linked_container(&temp_dir);
    let archive = ContainerWriter::new(config.clone())
        .write(&mut container, &temp_dir.path().join("shared"))
        .unwrap();

    let reader = Arc::new(SynchronizedReader::new(config));
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let reader = reader.clone();
            let archive = archive.clone();
            thread::spawn(move || reader.read(&archive).map(|c| c.guid().to_string()))
        })
        .collect();

    let mut opened = Vec::new();
    for handle in handles {
        match handle.join().unwrap() {
            Ok(guid) => opened.push(guid),
            Err(IcddError::Locked(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(!opened.is_empty());
    assert!(!ReaderRegistry::global().is_reading(&archive));
}

#[test]
fn test_held_lease_blocks_other_threads() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("held.icdd");
    std::fs::write(&path, b"").unwrap();

    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = {
        let path = path.clone();
        thread::spawn(move || {
            let _lease = ReaderRegistry::global().acquire(&path).unwrap();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
    };

    held_rx.recv().unwrap();
    assert!(matches!(
        ReaderRegistry::global().acquire(&path),
        Err(IcddError::Locked(_))
    ));
    release_tx.send(()).unwrap();
    holder.join().unwrap();
    assert!(ReaderRegistry::global().acquire(&path).is_ok());
}

#[test]
fn test_export_lock_is_visible_across_threads() {
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let exporter = thread::spawn(move || {
        let _exclusive = ExportLock::write();
        held_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    });

    held_rx.recv().unwrap();
    assert!(ExportLock::is_exporting());
    release_tx.send(()).unwrap();
    exporter.join().unwrap();
}

#[test]
fn test_workfolder_reader_shares_cached_containers() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&temp_dir);
    let (mut container, _, _, _) = common::linked_container(&temp_dir);
    container.save().unwrap();
    let guid = container.guid().to_string();

    let cache = Arc::new(ContainerCache::new(Duration::from_secs(60)));
    let reader = WorkfolderReader::new(config, cache.clone());
    assert_eq!(reader.list().unwrap(), vec![guid.clone()]);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            let guid = guid.clone();
            thread::spawn(move || cache.get(&guid).is_some())
        })
        .collect();
    assert!(handles.into_iter().all(|h| !h.join().unwrap()));

    let first = reader.open(&guid, Some("site.icdd")).unwrap();
    let second = reader.open(&guid, None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.lock().name(), "site.icdd");
    assert_eq!(cache.len(), 1);

    assert!(matches!(
        reader.open("missing", None),
        Err(IcddError::NotFound(_))
    ));
}

#[test]
fn test_cache_eviction_is_sliding() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&temp_dir);
    let container = icdd_core::container::InformationContainer::create("site", &config).unwrap();
    let guid = container.guid().to_string();

    let cache = ContainerCache::new(Duration::from_millis(200));
    cache.insert(container);
    for _ in 0..3 {
        thread::sleep(Duration::from_millis(80));
        assert!(cache.get(&guid).is_some());
    }
    assert_eq!(cache.evict_expired(), 0);
    thread::sleep(Duration::from_millis(300));
    assert_eq!(cache.evict_expired(), 1);
    assert!(cache.is_empty());
}
