//! Integration tests for snippet types and snippets.

mod common;

use common::TestHarness;
use recipehub::db::snippet_repo;
use recipehub::{HubError, Snippet, SnippetType};

#[test]
fn test_snippet_inherits_type_owner() {
    let h = TestHarness::new();
    let mut snippet_type = SnippetType::new(12, "Alignment");
    h.hub.save_snippet_type(&mut snippet_type).unwrap();
    assert_eq!(snippet_type.uid.len(), 6);

    let mut inherited = Snippet::new(&snippet_type, "bwa mem ref.fa r1.fq", "Align reads");
    h.hub.save_snippet(&mut inherited).unwrap();
    assert_eq!(inherited.owner, Some(12));

    let mut explicit = Snippet::new(&snippet_type, "samtools sort", "Sort");
    explicit.owner = Some(3);
    h.hub.save_snippet(&mut explicit).unwrap();
    assert_eq!(explicit.owner, Some(3));

    let stored = h
        .hub
        .database()
        .with_conn(|conn| snippet_repo::list_by_type(conn, snippet_type.id))
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[test]
fn test_snippet_for_unknown_type() {
    let h = TestHarness::new();
    let mut ghost_type = SnippetType::new(1, "Ghost");
    ghost_type.id = 99;

    let mut snippet = Snippet::new(&ghost_type, "ls", "List");
    let err = h.hub.save_snippet(&mut snippet).unwrap_err();
    assert!(matches!(err, HubError::NotFound { entity: "snippet type", .. }));
    assert_eq!(snippet.id, 0);
}
