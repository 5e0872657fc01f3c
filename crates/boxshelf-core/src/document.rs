use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::{BoxId, BoxItem, CatalogItem, FolderId, ItemKind, LocalId, UserId};

/// Per-kind display preference. Independent of storage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub primary_sorting: String,
    pub secondary_sorting: String,
    pub view: String,
    pub ascending_order: bool,
    #[serde(default)]
    pub display_grouping: bool,
    #[serde(default)]
    pub display_sub_sections: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            primary_sorting: "custom".into(),
            secondary_sorting: "none".into(),
            view: "grid".into(),
            ascending_order: true,
            display_grouping: false,
            display_sub_sections: false,
        }
    }
}

/// One value per item kind, serialized under the collection names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerKind<T> {
    pub artists: T,
    pub albums: T,
    pub tracks: T,
    pub playlists: T,
}

impl<T> PerKind<T> {
    pub fn get(&self, kind: ItemKind) -> &T {
        match kind {
            ItemKind::Artist => &self.artists,
            ItemKind::Album => &self.albums,
            ItemKind::Track => &self.tracks,
            ItemKind::Playlist => &self.playlists,
        }
    }

    pub fn get_mut(&mut self, kind: ItemKind) -> &mut T {
        match kind {
            ItemKind::Artist => &mut self.artists,
            ItemKind::Album => &mut self.albums,
            ItemKind::Track => &mut self.tracks,
            ItemKind::Playlist => &mut self.playlists,
        }
    }
}

pub type ItemCollections = PerKind<Vec<BoxItem>>;
pub type SectionSorting = PerKind<SortSpec>;
pub type SectionVisibility = PerKind<bool>;

impl SectionVisibility {
    pub fn all_visible() -> Self {
        PerKind {
            artists: true,
            albums: true,
            tracks: true,
            playlists: true,
        }
    }
}

/// A copy of an item's catalog payload held by a sub-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSectionEntry {
    pub local_id: LocalId,
    pub payload: CatalogItem,
}

impl SubSectionEntry {
    pub fn new(payload: CatalogItem) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            payload,
        }
    }
}

/// Named grouping of copied entries within one kind-section.
///
/// `display_index` is advisory; the position in `BoxDocument::sub_sections`
/// is the authoritative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSection {
    pub local_id: LocalId,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub display_index: i64,
    #[serde(default)]
    pub items: Vec<SubSectionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub local_id: LocalId,
    pub target_item_local_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_section_local_id: Option<LocalId>,
}

/// The box aggregate as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxDocument {
    pub id: BoxId,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub description: String,
    pub creator_id: UserId,
    #[serde(default)]
    pub items: ItemCollections,
    #[serde(default)]
    pub section_sorting: SectionSorting,
    #[serde(default = "SectionVisibility::all_visible")]
    pub section_visibility: SectionVisibility,
    #[serde(default)]
    pub sub_sections: Vec<SubSection>,
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Absent on documents written before soft delete existed; absent reads
    /// as not deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted_by_user: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoxDocument {
    pub fn is_deleted(&self) -> bool {
        self.is_deleted_by_user.unwrap_or(false)
    }

    pub fn summary(&self) -> BoxSummary {
        BoxSummary {
            box_id: self.id,
            box_name: self.name.clone(),
        }
    }

    pub fn sub_section(&self, id: LocalId) -> Option<&SubSection> {
        self.sub_sections.iter().find(|s| s.local_id == id)
    }
}

/// Client-supplied data for a new box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewBox {
    pub name: String,
    pub is_public: bool,
    pub description: String,
    pub items: Option<ItemCollections>,
    pub section_sorting: Option<SectionSorting>,
    pub section_visibility: Option<SectionVisibility>,
    pub sub_sections: Vec<SubSection>,
    pub notes: Vec<Note>,
}

impl NewBox {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn into_document(self, creator_id: UserId) -> BoxDocument {
        let now = Utc::now();
        BoxDocument {
            id: Uuid::new_v4(),
            name: self.name,
            is_public: self.is_public,
            description: self.description,
            creator_id,
            items: self.items.unwrap_or_default(),
            section_sorting: self.section_sorting.unwrap_or_default(),
            section_visibility: self
                .section_visibility
                .unwrap_or_else(SectionVisibility::all_visible),
            sub_sections: self.sub_sections,
            notes: self.notes,
            is_deleted_by_user: Some(false),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Dashboard listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSummary {
    pub box_id: BoxId,
    pub box_name: String,
}

/// Membership record of a box inside a folder.
pub type FolderBox = BoxSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub description: String,
    pub creator_id: UserId,
    #[serde(default)]
    pub boxes: Vec<FolderBox>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewFolder {
    pub name: String,
    pub is_public: bool,
    pub description: String,
    pub boxes: Vec<FolderBox>,
}

impl NewFolder {
    pub fn into_folder(self, creator_id: UserId) -> Folder {
        Folder {
            id: Uuid::new_v4(),
            name: self.name,
            is_public: self.is_public,
            description: self.description,
            creator_id,
            boxes: self.boxes,
            created_at: Utc::now(),
        }
    }
}

/// Application user and their dashboard listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub dashboard_boxes: Vec<BoxId>,
    #[serde(default)]
    pub dashboard_folders: Vec<FolderId>,
}
