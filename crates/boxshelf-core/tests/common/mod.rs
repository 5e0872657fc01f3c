//! Shared fixtures for boxshelf-core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use boxshelf_core::{
    Artist, BoxId, BoxService, CatalogItem, Coordinator, DocumentStore, Extra, NewBox, NewUser,
    SqliteDocumentStore, Track,
};

pub struct Fixture {
    pub store: Arc<dyn DocumentStore>,
    pub boxes: BoxService,
    pub coordinator: Coordinator,
}

impl Fixture {
    pub fn in_memory() -> Self {
        let store: Arc<dyn DocumentStore> =
            Arc::new(SqliteDocumentStore::open_in_memory().expect("in-memory store"));
        Self::with_store(store)
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            boxes: BoxService::new(store.clone()),
            coordinator: Coordinator::new(store.clone()),
            store,
        }
    }

    pub fn user(&self, id: &str) {
        self.coordinator
            .create_user(
                id,
                NewUser {
                    display_name: id.to_uppercase(),
                    image: None,
                    email: None,
                },
            )
            .expect("create user");
    }

    pub fn new_box(&self, owner: &str, name: &str) -> BoxId {
        self.coordinator
            .create_box(owner, NewBox::named(name))
            .expect("create box")
            .id
    }
}

pub fn artist(id: &str) -> CatalogItem {
    CatalogItem::Artist(Artist {
        id: id.to_string(),
        name: format!("Artist {}", id),
        uri: format!("spotify:artist:{}", id),
        genres: vec![],
        images: vec![],
        popularity: None,
        extra: Extra::new(),
    })
}

pub fn track(id: &str) -> CatalogItem {
    CatalogItem::Track(Track {
        id: id.to_string(),
        name: format!("Track {}", id),
        uri: format!("spotify:track:{}", id),
        duration_ms: Some(180_000),
        track_number: Some(1),
        popularity: None,
        extra: Extra::new(),
    })
}
