//! Persistence across store instances backed by a real file

mod common;

use std::sync::Arc;

use boxshelf_core::{DocumentStore, ItemKind, NewFolder, SqliteDocumentStore};
use common::{artist, Fixture};

#[test]
fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boxshelf.db");

    let (box_id, folder_id) = {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::open(&path).unwrap());
        let fx = Fixture::with_store(store);
        fx.user("u1");
        let box_id = fx.new_box("u1", "Persisted");
        fx.boxes
            .add_item(box_id, ItemKind::Artist, artist("a1"))
            .unwrap();
        let folder = fx
            .coordinator
            .create_folder(
                "u1",
                NewFolder {
                    name: "Shelf".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        (box_id, folder.id)
    };

    let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::open(&path).unwrap());
    let fx = Fixture::with_store(store);

    let view = fx.boxes.get_box(box_id).unwrap();
    let doc = view.box_data.unwrap();
    assert_eq!(doc.items.artists.len(), 1);
    assert_eq!(view.creator_name.as_deref(), Some("U1"));

    let user = fx.coordinator.get_user("u1").unwrap();
    assert_eq!(user.dashboard_boxes, vec![box_id]);
    assert_eq!(user.dashboard_folders, vec![folder_id]);

    // Duplicate detection reads the persisted document.
    assert!(fx
        .boxes
        .add_item(box_id, ItemKind::Artist, artist("a1"))
        .is_err());
}
