//! Behavioural properties of the box mutation engine

mod common;

use boxshelf_core::{
    BoxDocument, BoxError, BoxItem, BoxMutation, ItemKind, NewBox, NewSubSection, RemovalKey,
};
use common::{artist, track, Fixture};
use proptest::prelude::*;
use uuid::Uuid;

fn catalog_ids(items: &[BoxItem]) -> Vec<String> {
    items.iter().map(|i| i.catalog_id().to_string()).collect()
}

fn sub_section(fx: &Fixture, box_id: Uuid, kind: ItemKind, name: &str) -> Uuid {
    let sections = fx
        .boxes
        .create_sub_section(
            box_id,
            NewSubSection {
                kind,
                name: name.to_string(),
                display_index: 0,
            },
        )
        .unwrap()
        .unwrap();
    sections.last().unwrap().local_id
}

// === Duplicate Detection ===

#[test]
fn test_second_add_of_same_catalog_id_is_rejected() {
    let fx = Fixture::in_memory();
    fx.user("u1");
    let id = fx.new_box("u1", "Mix");

    fx.boxes.add_item(id, ItemKind::Track, track("t1")).unwrap();
    let err = fx
        .boxes
        .add_item(id, ItemKind::Track, track("t1"))
        .unwrap_err();
    assert!(matches!(
        err,
        BoxError::DuplicateItem { kind: ItemKind::Track, ref catalog_id } if catalog_id == "t1"
    ));
}

#[test]
fn test_road_trip_scenario() {
    let fx = Fixture::in_memory();
    fx.user("u1");
    let id = fx.new_box("u1", "Road Trip");

    fx.boxes.add_item(id, ItemKind::Artist, artist("a1")).unwrap();
    let second = fx.boxes.add_item(id, ItemKind::Artist, artist("a1"));
    assert!(matches!(second, Err(BoxError::DuplicateItem { .. })));

    let doc = fx.store.get_box(id).unwrap().unwrap();
    assert_eq!(doc.name, "Road Trip");
    assert_eq!(doc.creator_id, "u1");
    assert_eq!(doc.items.artists.len(), 1);
}

#[test]
fn test_replace_all_skips_duplicate_check() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "Bulk");
    let items = vec![BoxItem::new(artist("a1")), BoxItem::new(artist("a1"))];
    let stored = fx
        .boxes
        .replace_items(id, ItemKind::Artist, items)
        .unwrap()
        .unwrap();
    assert_eq!(stored.len(), 2);
}

// === Reorder ===

#[test]
fn test_reorder_first_to_last() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "ABC");
    for cid in ["A", "B", "C"] {
        fx.boxes.add_item(id, ItemKind::Artist, artist(cid)).unwrap();
    }

    let items = fx.boxes.reorder_items(id, ItemKind::Artist, 0, 2).unwrap();
    assert_eq!(catalog_ids(&items), vec!["B", "C", "A"]);

    let doc = fx.store.get_box(id).unwrap().unwrap();
    assert_eq!(catalog_ids(&doc.items.artists), vec!["B", "C", "A"]);
}

#[test]
fn test_reorder_leaves_other_collections_alone() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "Mixed");
    for cid in ["A", "B"] {
        fx.boxes.add_item(id, ItemKind::Artist, artist(cid)).unwrap();
        fx.boxes.add_item(id, ItemKind::Track, track(cid)).unwrap();
    }
    fx.boxes.reorder_items(id, ItemKind::Track, 1, 0).unwrap();

    let doc = fx.store.get_box(id).unwrap().unwrap();
    assert_eq!(catalog_ids(&doc.items.tracks), vec!["B", "A"]);
    assert_eq!(catalog_ids(&doc.items.artists), vec!["A", "B"]);
}

proptest! {
    #[test]
    fn test_reorder_is_single_move(len in 1usize..8, a in 0usize..8, b in 0usize..8) {
        let src = a % len;
        let dst = b % len;
        let fx = Fixture::in_memory();
        let id = fx.new_box("u1", "P");
        let ids: Vec<String> = (0..len).map(|i| format!("c{}", i)).collect();
        for cid in &ids {
            fx.boxes.add_item(id, ItemKind::Artist, artist(cid)).unwrap();
        }

        let items = fx.boxes.reorder_items(id, ItemKind::Artist, src, dst).unwrap();

        let mut expected = ids.clone();
        let moved = expected.remove(src);
        expected.insert(dst, moved);
        prop_assert_eq!(catalog_ids(&items), expected);
    }
}

// === Remove ===

#[test]
fn test_remove_by_local_id_keeps_order_of_the_rest() {
    let fx = Fixture::in_memory();
    fx.user("u1");
    let id = fx.new_box("u1", "Trim");

    for cid in ["a1", "a2", "a3"] {
        fx.boxes.add_item(id, ItemKind::Artist, artist(cid)).unwrap();
    }
    let before = fx.store.get_box(id).unwrap().unwrap().items.artists;
    let target = before[1].local_id;

    let items = fx
        .boxes
        .remove_item(id, ItemKind::Artist, target)
        .unwrap()
        .unwrap();
    assert_eq!(catalog_ids(&items), vec!["a1", "a3"]);
    assert_eq!(items[0].local_id, before[0].local_id);
    assert_eq!(items[1].local_id, before[2].local_id);

    let unchanged = fx
        .boxes
        .remove_item(id, ItemKind::Artist, Uuid::new_v4())
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, items);
}

// === Soft Delete Filter ===

#[test]
fn test_absent_deleted_flag_reads_as_false() {
    let fx = Fixture::in_memory();

    let mut legacy = NewBox::named("Legacy").into_document("u1".into());
    legacy.is_deleted_by_user = None;
    let explicit = NewBox::named("Explicit").into_document("u1".into());
    let mut deleted = NewBox::named("Deleted").into_document("u1".into());
    deleted.is_deleted_by_user = Some(true);
    for doc in [legacy.clone(), explicit.clone(), deleted.clone()] {
        fx.store.insert_box(doc).unwrap();
    }

    let listed = fx.boxes.boxes_by_creator("u1").unwrap();
    let names: Vec<&str> = listed.iter().map(|s| s.box_name.as_str()).collect();
    assert_eq!(names, vec!["Legacy", "Explicit"]);

    assert!(fx.boxes.get_box(legacy.id).unwrap().box_data.is_some());
    assert!(fx.boxes.get_box(explicit.id).unwrap().box_data.is_some());
    assert!(fx.boxes.get_box(deleted.id).unwrap().box_data.is_none());
}

#[test]
fn test_soft_deleted_box_disappears_from_listing() {
    let fx = Fixture::in_memory();
    fx.user("u1");
    let keep = fx.new_box("u1", "Keep");
    let gone = fx.new_box("u1", "Gone");

    fx.coordinator.soft_delete_box(gone, None).unwrap();

    let listed = fx.boxes.boxes_by_creator("u1").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].box_id, keep);
    assert_eq!(
        fx.coordinator.get_user("u1").unwrap().dashboard_boxes,
        vec![keep]
    );
}

// === Sub-section Cascade ===

#[test]
fn test_delete_sub_section_clears_pointers_of_named_kind_only() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "Cascade");
    let sid = sub_section(&fx, id, ItemKind::Artist, "Faves");

    let pointing = |item| BoxItem {
        sub_section: Some(sid),
        ..BoxItem::new(item)
    };
    fx.boxes
        .replace_items(
            id,
            ItemKind::Artist,
            vec![
                pointing(artist("a1")),
                pointing(artist("a2")),
                pointing(artist("a3")),
                BoxItem::new(artist("a4")),
            ],
        )
        .unwrap();
    fx.boxes
        .replace_items(id, ItemKind::Track, vec![pointing(track("t1"))])
        .unwrap();

    let doc = fx
        .boxes
        .delete_sub_section(id, sid, ItemKind::Artist)
        .unwrap()
        .unwrap();

    assert!(doc.sub_sections.is_empty());
    assert!(doc.items.artists.iter().all(|i| i.sub_section.is_none()));
    assert_eq!(doc.items.tracks[0].sub_section, Some(sid));
}

#[test]
fn test_cascade_does_not_touch_membership_counts() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "Counts");
    let items = fx
        .boxes
        .add_item(id, ItemKind::Artist, artist("a1"))
        .unwrap()
        .unwrap();
    let item = &items[0];
    let sid = sub_section(&fx, id, ItemKind::Artist, "S");
    fx.boxes
        .add_item_to_sub_section(id, ItemKind::Artist, item.local_id, sid, item.payload.clone())
        .unwrap();

    let doc = fx
        .boxes
        .delete_sub_section(id, sid, ItemKind::Artist)
        .unwrap()
        .unwrap();
    assert_eq!(doc.items.artists[0].sub_section_membership_count, 1);
}

// === Multi-fetch ===

#[test]
fn test_fetch_many_preserves_input_order_and_drops_missing() {
    let fx = Fixture::in_memory();
    fx.user("u1");
    let id1 = fx.new_box("u1", "One");
    let id3 = fx.new_box("u1", "Three");
    let id2 = Uuid::new_v4();

    let got = fx.coordinator.fetch_many_by_ids(&[id3, id1, id2]).unwrap();
    let ids: Vec<Uuid> = got.iter().map(|s| s.box_id).collect();
    assert_eq!(ids, vec![id3, id1]);
    assert_eq!(got[0].box_name, "Three");
}

#[test]
fn test_fetch_many_with_no_ids() {
    let fx = Fixture::in_memory();
    fx.new_box("u1", "Unrelated");
    assert!(fx.coordinator.fetch_many_by_ids(&[]).unwrap().is_empty());
}

// === Membership Counter ===

#[test]
fn test_counter_returns_to_start_and_can_go_negative() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "Counter");
    let items = fx
        .boxes
        .add_item(id, ItemKind::Artist, artist("a1"))
        .unwrap()
        .unwrap();
    let item = items[0].clone();
    let sid = sub_section(&fx, id, ItemKind::Artist, "S");
    let count = |doc: &BoxDocument| doc.items.artists[0].sub_section_membership_count;

    let doc = fx
        .boxes
        .add_item_to_sub_section(id, ItemKind::Artist, item.local_id, sid, item.payload.clone())
        .unwrap()
        .unwrap();
    assert_eq!(count(&doc), 1);
    assert_eq!(doc.sub_section(sid).unwrap().items.len(), 1);

    let remove = || {
        fx.boxes
            .remove_item_from_sub_section(
                id,
                ItemKind::Artist,
                item.local_id,
                sid,
                RemovalKey::CatalogId("a1".into()),
            )
            .unwrap()
            .unwrap()
    };
    let doc = remove();
    assert_eq!(count(&doc), 0);
    assert!(doc.sub_section(sid).unwrap().items.is_empty());

    let doc = remove();
    assert_eq!(count(&doc), -1);
}

#[test]
fn test_copy_is_appended_even_when_item_is_missing() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "Loose");
    let sid = sub_section(&fx, id, ItemKind::Artist, "S");

    let doc = fx
        .boxes
        .add_item_to_sub_section(id, ItemKind::Artist, Uuid::new_v4(), sid, artist("a9"))
        .unwrap()
        .unwrap();
    assert_eq!(doc.sub_section(sid).unwrap().items.len(), 1);
    assert!(doc.items.artists.is_empty());
}

#[test]
fn test_remove_from_sub_section_by_local_id() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "ByLocal");
    let sid = sub_section(&fx, id, ItemKind::Artist, "S");
    let doc = fx
        .boxes
        .add_item_to_sub_section(id, ItemKind::Artist, Uuid::new_v4(), sid, artist("a1"))
        .unwrap()
        .unwrap();
    let entry_id = doc.sub_section(sid).unwrap().items[0].local_id;

    let doc = fx
        .boxes
        .remove_item_from_sub_section(
            id,
            ItemKind::Artist,
            Uuid::new_v4(),
            sid,
            RemovalKey::LocalId(entry_id),
        )
        .unwrap()
        .unwrap();
    assert!(doc.sub_section(sid).unwrap().items.is_empty());
}

// === Whole-document Writes ===

#[test]
fn test_rename_and_replace_sub_sections() {
    let fx = Fixture::in_memory();
    let id = fx.new_box("u1", "Sections");
    let a = sub_section(&fx, id, ItemKind::Artist, "A");
    let b = sub_section(&fx, id, ItemKind::Track, "B");

    let sections = fx
        .boxes
        .rename_sub_section(id, a, "Renamed".into())
        .unwrap()
        .unwrap();
    assert_eq!(sections[0].name, "Renamed");

    let mut reordered = sections.clone();
    reordered.reverse();
    let sections = fx
        .boxes
        .replace_sub_sections(id, reordered)
        .unwrap()
        .unwrap();
    assert_eq!(sections[0].local_id, b);
    assert_eq!(sections[1].local_id, a);
}

#[test]
fn test_update_on_missing_box_returns_none() {
    let fx = Fixture::in_memory();
    let out = fx
        .store
        .update_box(Uuid::new_v4(), vec![BoxMutation::SetDeletedByUser(true)])
        .unwrap();
    assert!(out.is_none());
    assert!(fx
        .boxes
        .remove_item(Uuid::new_v4(), ItemKind::Album, Uuid::new_v4())
        .unwrap()
        .is_none());
}
