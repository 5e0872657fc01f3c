//! Single-document update operators.
//!
//! Every variant corresponds to one server-side document update primitive
//! (push, pull, set by array filter, increment, unset). A store applies a
//! whole `Vec` of them to one document atomically. An operator whose
//! filter matches nothing leaves the document untouched.

use serde::{Deserialize, Serialize};

use crate::document::{
    BoxDocument, Folder, FolderBox, Note, SectionSorting, SectionVisibility, SubSection,
    SubSectionEntry, User,
};
use crate::item::{BoxId, BoxItem, FolderId, ItemKind, LocalId};

/// How a sub-section entry is matched for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemovalKey {
    CatalogId(String),
    LocalId(LocalId),
}

impl RemovalKey {
    fn matches(&self, entry: &SubSectionEntry) -> bool {
        match self {
            RemovalKey::CatalogId(id) => entry.payload.catalog_id() == id,
            RemovalKey::LocalId(id) => entry.local_id == *id,
        }
    }
}

/// Box-level fields editable through the info form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxInfo {
    pub name: String,
    pub is_public: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoxMutation {
    PushItem(ItemKind, BoxItem),
    SetItems(ItemKind, Vec<BoxItem>),
    SetItemWhere {
        kind: ItemKind,
        local_id: LocalId,
        item: BoxItem,
    },
    PullItem(ItemKind, LocalId),
    IncSubSectionCount {
        kind: ItemKind,
        local_id: LocalId,
        delta: i64,
    },
    /// Unset the back-pointer of every item in `kind` pointing at `sub_section`.
    ClearSubSectionPointer {
        kind: ItemKind,
        sub_section: LocalId,
    },
    PushSubSection(SubSection),
    SetSubSections(Vec<SubSection>),
    RenameSubSection(LocalId, String),
    PullSubSection(LocalId),
    PushSubSectionEntry(LocalId, SubSectionEntry),
    PullSubSectionEntry(LocalId, RemovalKey),
    SetSectionSorting(SectionSorting),
    SetSectionVisibility(SectionVisibility),
    SetInfo(BoxInfo),
    PushNote(Note),
    SetNoteText(LocalId, String),
    PullNote(LocalId),
    SetDeletedByUser(bool),
}

impl BoxMutation {
    pub fn apply(&self, doc: &mut BoxDocument) {
        match self {
            BoxMutation::PushItem(kind, item) => {
                doc.items.get_mut(*kind).push(item.clone());
            }
            BoxMutation::SetItems(kind, items) => {
                *doc.items.get_mut(*kind) = items.clone();
            }
            BoxMutation::SetItemWhere {
                kind,
                local_id,
                item,
            } => {
                for slot in doc
                    .items
                    .get_mut(*kind)
                    .iter_mut()
                    .filter(|i| i.local_id == *local_id)
                {
                    *slot = item.clone();
                }
            }
            BoxMutation::PullItem(kind, local_id) => {
                doc.items.get_mut(*kind).retain(|i| i.local_id != *local_id);
            }
            BoxMutation::IncSubSectionCount {
                kind,
                local_id,
                delta,
            } => {
                for item in doc
                    .items
                    .get_mut(*kind)
                    .iter_mut()
                    .filter(|i| i.local_id == *local_id)
                {
                    item.sub_section_membership_count += delta;
                }
            }
            BoxMutation::ClearSubSectionPointer { kind, sub_section } => {
                for item in doc
                    .items
                    .get_mut(*kind)
                    .iter_mut()
                    .filter(|i| i.sub_section == Some(*sub_section))
                {
                    item.sub_section = None;
                }
            }
            BoxMutation::PushSubSection(section) => {
                doc.sub_sections.push(section.clone());
            }
            BoxMutation::SetSubSections(sections) => {
                doc.sub_sections = sections.clone();
            }
            BoxMutation::RenameSubSection(id, name) => {
                if let Some(section) = doc.sub_sections.iter_mut().find(|s| s.local_id == *id) {
                    section.name = name.clone();
                }
            }
            BoxMutation::PullSubSection(id) => {
                doc.sub_sections.retain(|s| s.local_id != *id);
            }
            BoxMutation::PushSubSectionEntry(id, entry) => {
                if let Some(section) = doc.sub_sections.iter_mut().find(|s| s.local_id == *id) {
                    section.items.push(entry.clone());
                }
            }
            BoxMutation::PullSubSectionEntry(id, key) => {
                if let Some(section) = doc.sub_sections.iter_mut().find(|s| s.local_id == *id) {
                    section.items.retain(|e| !key.matches(e));
                }
            }
            BoxMutation::SetSectionSorting(sorting) => {
                doc.section_sorting = sorting.clone();
            }
            BoxMutation::SetSectionVisibility(visibility) => {
                doc.section_visibility = visibility.clone();
            }
            BoxMutation::SetInfo(info) => {
                doc.name = info.name.clone();
                doc.is_public = info.is_public;
                doc.description = info.description.clone();
            }
            BoxMutation::PushNote(note) => {
                doc.notes.push(note.clone());
            }
            BoxMutation::SetNoteText(id, text) => {
                if let Some(note) = doc.notes.iter_mut().find(|n| n.local_id == *id) {
                    note.text = text.clone();
                }
            }
            BoxMutation::PullNote(id) => {
                doc.notes.retain(|n| n.local_id != *id);
            }
            BoxMutation::SetDeletedByUser(v) => {
                doc.is_deleted_by_user = Some(*v);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FolderMutation {
    PushBox(FolderBox),
    PullBox(BoxId),
    SetBoxes(Vec<FolderBox>),
    RenameBox(BoxId, String),
}

impl FolderMutation {
    pub fn apply(&self, folder: &mut Folder) {
        match self {
            FolderMutation::PushBox(entry) => folder.boxes.push(entry.clone()),
            FolderMutation::PullBox(id) => folder.boxes.retain(|b| b.box_id != *id),
            FolderMutation::SetBoxes(entries) => folder.boxes = entries.clone(),
            FolderMutation::RenameBox(id, name) => {
                for entry in folder.boxes.iter_mut().filter(|b| b.box_id == *id) {
                    entry.box_name = name.clone();
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserMutation {
    PushDashboardBox(BoxId),
    PushDashboardBoxes(Vec<BoxId>),
    PullDashboardBox(BoxId),
    SetDashboardBoxes(Vec<BoxId>),
    PushDashboardFolder(FolderId),
    PullDashboardFolder(FolderId),
    SetDashboardFolders(Vec<FolderId>),
}

impl UserMutation {
    pub fn apply(&self, user: &mut User) {
        match self {
            UserMutation::PushDashboardBox(id) => user.dashboard_boxes.push(*id),
            UserMutation::PushDashboardBoxes(ids) => user.dashboard_boxes.extend(ids.iter().copied()),
            UserMutation::PullDashboardBox(id) => user.dashboard_boxes.retain(|b| b != id),
            UserMutation::SetDashboardBoxes(ids) => user.dashboard_boxes = ids.clone(),
            UserMutation::PushDashboardFolder(id) => user.dashboard_folders.push(*id),
            UserMutation::PullDashboardFolder(id) => user.dashboard_folders.retain(|f| f != id),
            UserMutation::SetDashboardFolders(ids) => user.dashboard_folders = ids.clone(),
        }
    }
}
