//! Integration tests for data records, manifests and data parameter slots.

mod common;

use common::TestHarness;
use recipehub::db::data_repo;
use recipehub::materialize::MISSING_VALUE;
use recipehub::{params, Data, Editor, HubError, ParamMap, ParamValue};

#[test]
fn test_save_data_lays_out_directory_and_manifest() {
    let h = TestHarness::new();
    let project = h.project("Reads");
    let data = h.data(&project, "Sample 1");

    assert_eq!(data.uid.len(), 8);
    assert_eq!(data.owner, Some(project.owner));
    assert!(h.hub.layout().data_dir(&project.uid, &data.uid).is_dir());

    let manifest = h.hub.layout().toc_path(&data.uid);
    assert_eq!(data.file.as_deref(), Some(manifest.as_path()));
    assert!(manifest.is_file());
    assert!(data.files().unwrap().is_empty());
}

#[test]
fn test_data_type_defaults() {
    let h = TestHarness::new();
    let project = h.project("Types");

    let cases = vec![("", "DATA"), ("FASTQ", "FASTQ"), ("FAST Q", "FASTQ"), ("   ", "DATA")];
    for (input, expected) in cases {
        let mut data = Data::new(project.id, "typed");
        data.data_type = input.to_string();
        h.hub.save_data(&mut data, h.editor).unwrap();
        assert_eq!(data.data_type, expected, "type for input {:?}", input);
    }
}

#[test]
fn test_rebuild_toc_lists_sorted_files() {
    let h = TestHarness::new();
    let project = h.project("Toc");
    let data = h.data(&project, "Sample");
    let dir = h.hub.layout().data_dir(&project.uid, &data.uid);

    h.write_data_file(&project, &data, "b.txt", "bbb");
    h.write_data_file(&project, &data, "a.txt", "a");

    let toc = h.hub.rebuild_toc(data.id).unwrap();
    let expected = format!("{0}/a.txt\n{0}/b.txt", dir.display());
    assert_eq!(std::fs::read_to_string(&toc.manifest_path).unwrap(), expected);
    assert_eq!(toc.file_count, 2);
    assert_eq!(toc.size, 4);

    let stored = h.hub.data(data.id).unwrap();
    assert_eq!(stored.file_count, 2);
    assert_eq!(stored.size, 4);
    assert_eq!(stored.files().unwrap(), toc.files);
}

#[test]
fn test_rebuild_toc_is_idempotent() {
    let h = TestHarness::new();
    let project = h.project("Toc");
    let data = h.data(&project, "Sample");
    h.write_data_file(&project, &data, "nested/reads.fq", "ACGT");

    let first = h.hub.rebuild_toc(data.id).unwrap();
    let content = std::fs::read_to_string(&first.manifest_path).unwrap();
    let second = h.hub.rebuild_toc(data.id).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(&second.manifest_path).unwrap(), content);
    assert!(content.ends_with("nested/reads.fq"));
}

#[test]
fn test_rebuild_toc_of_empty_directory() {
    let h = TestHarness::new();
    let project = h.project("Toc");
    let data = h.data(&project, "Empty");

    let toc = h.hub.rebuild_toc(data.id).unwrap();
    assert_eq!(toc.file_count, 0);
    assert_eq!(std::fs::read_to_string(&toc.manifest_path).unwrap(), "");
}

#[test]
fn test_resave_keeps_existing_manifest() {
    let h = TestHarness::new();
    let project = h.project("Toc");
    let mut data = h.data(&project, "Sample");
    h.write_data_file(&project, &data, "a.txt", "a");
    h.hub.rebuild_toc(data.id).unwrap();

    data.name = "Renamed".to_string();
    h.hub.save_data(&mut data, Editor::new(5)).unwrap();
    assert_eq!(data.files().unwrap().len(), 1);
}

#[test]
fn test_saving_an_old_handle_keeps_toc_values() {
    let h = TestHarness::new();
    let project = h.project("Toc");
    let data = h.data(&project, "Sample");
    let mut stale = h.hub.data(data.id).unwrap();
    let mut other = h.hub.data(data.id).unwrap();

    h.write_data_file(&project, &data, "a.txt", "hello");
    let toc = h.hub.rebuild_toc(data.id).unwrap();
    assert_eq!((toc.size, toc.file_count), (5, 1));

    stale.name = "Renamed".to_string();
    h.hub.save_data(&mut stale, h.editor).unwrap();
    assert_eq!((stale.size, stale.file_count), (5, 1));

    let stored = h.hub.data(data.id).unwrap();
    assert_eq!(stored.name, "Renamed");
    assert_eq!((stored.size, stored.file_count), (5, 1));
    assert_eq!(stored.file.as_deref(), Some(toc.manifest_path.as_path()));

    other.deleted = true;
    h.hub.save_data(&mut other, h.editor).unwrap();
    let deleted = h.hub.soft_delete_data(data.id, h.editor).unwrap();
    assert!(deleted.deleted);

    let stored = h.hub.data(data.id).unwrap();
    assert!(stored.deleted);
    assert_eq!((stored.size, stored.file_count), (5, 1));
    assert_eq!(stored.files().unwrap(), toc.files);
}

#[test]
fn test_bind_data_slot() {
    let h = TestHarness::new();
    let project = h.project("Bind");
    let data = h.data(&project, "Reads");
    let file = h.write_data_file(&project, &data, "r1.fq", "ACGT");
    h.hub.rebuild_toc(data.id).unwrap();

    let mut slot = params::parse("label = \"Input reads\"\ntype = \"FASTQ\"");
    h.hub.bind_data(&mut slot, data.id).unwrap();

    let file = file.to_string_lossy();
    assert_eq!(params::get_str(&slot, "value"), Some(&*file));
    assert_eq!(params::get_str(&slot, "uid"), Some(data.uid.as_str()));
    assert_eq!(params::get_str(&slot, "label"), Some("Input reads"));
    assert_eq!(
        slot.get("files").and_then(ParamValue::as_list).map(<[_]>::len),
        Some(1)
    );
}

#[test]
fn test_bind_data_without_files() {
    let h = TestHarness::new();
    let project = h.project("Bind");
    let data = h.data(&project, "Nothing yet");

    let mut slot = ParamMap::new();
    h.hub.bind_data(&mut slot, data.id).unwrap();
    assert_eq!(params::get_str(&slot, "value"), Some(MISSING_VALUE));
}

#[test]
fn test_soft_delete_keeps_row() {
    let h = TestHarness::new();
    let project = h.project("Deletes");
    let data = h.data(&project, "Old");

    let deleted = h.hub.soft_delete_data(data.id, h.editor).unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.display_name(), "Deleted: Old");

    h.hub
        .database()
        .with_conn(|conn| {
            assert!(data_repo::list_by_project(conn, project.id)?.is_empty());
            assert!(data_repo::find_by_id(conn, data.id)?.is_some());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_data_for_unknown_project() {
    let h = TestHarness::new();
    let mut data = Data::new(404, "Orphan");
    let err = h.hub.save_data(&mut data, h.editor).unwrap_err();
    assert!(matches!(err, HubError::NotFound { entity: "project", .. }));
    assert_eq!(data.id, 0);
}

#[test]
fn test_failed_data_save_rolls_back() {
    let h = TestHarness::new();
    let project = h.project("Blocked");
    let project_dir = h.hub.layout().project_dir(&project.uid);
    std::fs::remove_dir_all(&project_dir).unwrap();
    std::fs::write(&project_dir, "blocker").unwrap();

    let mut data = Data::new(project.id, "Never");
    assert!(h.hub.save_data(&mut data, h.editor).is_err());
    assert_eq!(data.id, 0);
    assert_eq!(h.reload_project(&project).data_count, 0);
}
