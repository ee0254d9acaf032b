//! Version chains of container descriptions and documents.

mod common;

use icdd_core::{container::InformationContainer, Entity, IcddError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_each_version_extends_the_chain(steps in 1usize..6) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = common::test_config(&temp_dir);
        let mut container = InformationContainer::create("site", &config).unwrap();
        let mut previous = container.description().id().clone();
        for step in 0..steps {
            let superseded = container
                .next_version(&format!("{}", step + 2), None)
                .unwrap();
            prop_assert_eq!(&superseded, &previous);
            prop_assert_eq!(container.description().prior_version(), Some(previous.clone()));
            previous = container.description().id().clone();
        }
        let chain = container.description().version_chain().unwrap();
        prop_assert_eq!(chain.len(), steps + 1);
        let distinct: std::collections::HashSet<_> = chain.iter().collect();
        prop_assert_eq!(distinct.len(), chain.len());
    }
}

#[test]
fn test_prior_version_refuses_cycles() {
    common::init_logging();
    let temp_dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&temp_dir);
    let mut container = InformationContainer::create("site", &config).unwrap();
    let first = container.next_version("2", Some("second")).unwrap();
    let current = container.description().id().clone();

    let first_node = container
        .description()
        .version_chain()
        .unwrap()
        .into_iter()
        .last()
        .unwrap();
    assert_eq!(first_node, first);
    assert!(matches!(
        container.description().set_prior_version(Some(&current)),
        Err(IcddError::InvalidArgument(_))
    ));
    assert_eq!(container.description().version_id().as_deref(), Some("2"));
    assert_eq!(container.description().version_description().as_deref(), Some("second"));
}

#[test]
fn test_next_version_as_leaves_original_untouched() {
    common::init_logging();
    let temp_dir = tempfile::tempdir().unwrap();
    let (mut container, a, _, linkset) = common::linked_container(&temp_dir);
    let original = container.description().id().clone();

    let mut next = container
        .next_version_as("2", Some("issued"), "site-v2", None)
        .unwrap();
    assert_ne!(next.guid(), container.guid());
    assert_eq!(next.dir().parent(), container.dir().parent());
    assert_eq!(container.description().id(), &original);
    assert_eq!(next.description().prior_version(), Some(original));
    assert!(next.description().has_document(&a));
    assert_eq!(next.linkset_mut(&linkset).unwrap().links().len(), 1);
}

#[test]
fn test_adopted_document_points_at_original() {
    common::init_logging();
    let temp_dir = tempfile::tempdir().unwrap();
    let (source, a, _, _) = common::linked_container(&temp_dir);
    let config = common::test_config(&temp_dir);
    let target = InformationContainer::create("target", &config).unwrap();

    let copy = target.adopt_document(&source, &a, "2", Some("revised")).unwrap();
    assert_ne!(copy.id(), &a);
    assert_eq!(copy.prior_version(), Some(a));
    assert_eq!(copy.name(), "a.txt");
    assert_eq!(copy.version_id().as_deref(), Some("2"));
    assert!(copy.is_present(&target.documents_dir()));
}
