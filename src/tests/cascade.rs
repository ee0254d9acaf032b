//! Deletions and renames that ripple through documents, folders and linksets.

use pretty_assertions::assert_eq;
use test_log::test;

use super::helpers::{add_documents, link_pair, scratch_container, source_file};
use crate::{container::InformationContainer, Entity};

#[test]
fn delete_document_removes_links_in_every_linkset() {
    let (dir, mut container) = scratch_container();
    let docs = add_documents(dir.path(), &container, 4);
    let ids: Vec<_> = docs.iter().map(|d| d.id().clone()).collect();
    let first = container.create_linkset("first").unwrap();
    let second = container.create_linkset("second").unwrap();
    link_pair(&mut container, &first, &ids[0], &ids[1]);
    link_pair(&mut container, &first, &ids[0], &ids[2]);
    link_pair(&mut container, &second, &ids[0], &ids[3]);
    let survivor = link_pair(&mut container, &second, &ids[1], &ids[2]);

    let payload = docs[0].payload_path(&container.documents_dir()).unwrap();
    assert!(payload.is_file());

    assert_eq!(container.delete_document(&ids[0]).unwrap(), 3);
    assert!(!payload.exists());
    assert!(!container.description().has_document(&ids[0]));
    assert!(container.links_for_document(&ids[0]).is_empty());
    assert!(!container
        .description_mut()
        .link_elements_by_document()
        .contains_key(&ids[0]));
    let dangling = container
        .index()
        .read()
        .matching(None, None, Some(&ids[0].term()))
        .count();
    assert_eq!(dangling, 0);

    let remaining = container.links_for_document(&ids[1]);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].1.id(), &survivor);

    container.save().unwrap();
    let codec = container.codec();
    let mut reopened = InformationContainer::open_dir(container.dir(), "scratch", codec).unwrap();
    assert_eq!(reopened.linkset_mut(&first).unwrap().links().len(), 0);
    assert_eq!(reopened.linkset_mut(&second).unwrap().links().len(), 1);
}

#[test]
fn rename_folder_carries_children_along() {
    let (dir, container) = scratch_container();
    let folder = container.create_folder_document("drawings").unwrap();
    let children: Vec<_> = (0..3)
        .map(|i| {
            let name = format!("sheet{i}.pdf");
            let src = source_file(dir.path(), &name, "%PDF");
            container
                .create_internal_document(&src, &name, "pdf", "application/pdf", Some(folder.id()))
                .unwrap()
        })
        .collect();
    let loose = add_documents(dir.path(), &container, 1).remove(0);

    assert_eq!(container.rename_folder(folder.id(), "plans").unwrap(), 3);
    assert_eq!(folder.foldername().as_deref(), Some("plans"));
    assert!(!container.documents_dir().join("drawings").exists());
    for (i, child) in children.iter().enumerate() {
        assert_eq!(child.name(), format!("plans/sheet{i}.pdf"));
        assert!(child.is_child_of("plans"));
        assert!(child.is_present(&container.documents_dir()));
    }
    assert_eq!(loose.name(), "doc0.txt");

    assert_eq!(container.rename_folder(folder.id(), "plans").unwrap(), 0);
}

#[test]
fn delete_folder_releases_children() {
    let (dir, mut container) = scratch_container();
    let folder = container.create_folder_document("drawings").unwrap();
    let src = source_file(dir.path(), "sheet.pdf", "%PDF");
    let child = container
        .create_internal_document(&src, "sheet.pdf", "pdf", "application/pdf", Some(folder.id()))
        .unwrap();

    assert_eq!(container.delete_document(folder.id()).unwrap(), 0);
    assert!(!container.documents_dir().join("drawings").exists());
    assert_eq!(child.name(), "sheet.pdf");
    assert_eq!(child.filename().as_deref(), Some("sheet.pdf"));
    assert!(child.is_present(&container.documents_dir()));
    assert!(container.description().has_document(child.id()));
}

#[test]
fn link_elements_follow_links_made_through_the_linkset() {
    let (dir, mut container) = scratch_container();
    let docs = add_documents(dir.path(), &container, 3);
    let ids: Vec<_> = docs.iter().map(|d| d.id().clone()).collect();
    let links = container.create_linkset("links").unwrap();
    link_pair(&mut container, &links, &ids[0], &ids[1]);

    let index = container.description_mut().link_elements_by_document();
    assert_eq!(index.len(), 2);
    assert_eq!(index[&ids[0]].len(), 1);
    assert!(!index.contains_key(&ids[2]));

    link_pair(&mut container, &links, &ids[0], &ids[2]);
    let index = container.description_mut().link_elements_by_document();
    assert_eq!(index[&ids[0]].len(), 2);
    assert_eq!(index[&ids[2]].len(), 1);

    container.save().unwrap();
    let codec = container.codec();
    let mut reopened = InformationContainer::open_dir(container.dir(), "scratch", codec).unwrap();
    let index = reopened.description_mut().link_elements_by_document();
    assert_eq!(index.len(), 3);
    assert_eq!(index[&ids[0]].len(), 2);
}
