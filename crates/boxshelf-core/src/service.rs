//! Box aggregate operations
//!
//! `BoxService` validates each request and turns it into one batch of
//! single-document mutations. Operations whose target element does not
//! exist degrade to a silent no-op and return the document unchanged; only
//! the reorder paths report a missing box or sub-section as an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{
    BoxDocument, BoxSummary, Note, SectionSorting, SectionVisibility, SubSection, SubSectionEntry,
};
use crate::error::{BoxError, Result};
use crate::item::{BoxId, BoxItem, CatalogItem, ItemKind, LocalId};
use crate::mutation::{BoxInfo, BoxMutation, RemovalKey};
use crate::query::BoxQuery;
use crate::sequence::move_element;
use crate::store::DocumentStore;

/// A box as shown to a reader, with the creator's display name resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxView {
    pub box_data: Option<BoxDocument>,
    pub creator_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubSection {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub display_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub target_item_local_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sub_section_local_id: Option<LocalId>,
}

/// Operations on a single box document.
pub struct BoxService {
    store: Arc<dyn DocumentStore>,
}

impl BoxService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn apply(&self, box_id: BoxId, mutations: Vec<BoxMutation>) -> Result<Option<BoxDocument>> {
        tracing::debug!(box_id = %box_id, count = mutations.len(), "applying box mutations");
        Ok(self.store.update_box(box_id, mutations)?)
    }

    fn check_kind(kind: ItemKind, payload: &CatalogItem) -> Result<()> {
        if payload.kind() != kind {
            return Err(BoxError::Validation(format!(
                "{} payload cannot be stored in the {} collection",
                payload.kind(),
                kind.collection_name()
            )));
        }
        Ok(())
    }

    // ==================== Box Operations ====================

    /// Fetch a box unless it was deleted by its user.
    pub fn get_box(&self, box_id: BoxId) -> Result<BoxView> {
        let Some(doc) = self
            .store
            .find_boxes(&BoxQuery::visible_by_id(box_id))?
            .into_iter()
            .next()
        else {
            return Ok(BoxView {
                box_data: None,
                creator_name: None,
            });
        };
        let creator_name = self
            .store
            .get_user(&doc.creator_id)?
            .map(|u| u.display_name);
        Ok(BoxView {
            box_data: Some(doc),
            creator_name,
        })
    }

    /// Dashboard summaries of a user's boxes, oldest first.
    pub fn boxes_by_creator(&self, creator_id: &str) -> Result<Vec<BoxSummary>> {
        Ok(self
            .store
            .find_boxes(&BoxQuery::visible_by_creator(creator_id))?
            .iter()
            .map(BoxDocument::summary)
            .collect())
    }

    /// Overwrite the whole document. The id in the path wins.
    pub fn replace_box(&self, box_id: BoxId, doc: BoxDocument) -> Result<Option<BoxDocument>> {
        for kind in ItemKind::ALL {
            for item in doc.items.get(kind) {
                Self::check_kind(kind, &item.payload)?;
            }
        }
        Ok(self.store.replace_box(box_id, doc)?)
    }

    pub fn update_section_sorting(
        &self,
        box_id: BoxId,
        sorting: SectionSorting,
    ) -> Result<Option<SectionSorting>> {
        Ok(self
            .apply(box_id, vec![BoxMutation::SetSectionSorting(sorting)])?
            .map(|d| d.section_sorting))
    }

    pub fn update_section_visibility(
        &self,
        box_id: BoxId,
        visibility: SectionVisibility,
    ) -> Result<Option<SectionVisibility>> {
        Ok(self
            .apply(box_id, vec![BoxMutation::SetSectionVisibility(visibility)])?
            .map(|d| d.section_visibility))
    }

    pub fn update_box_info(&self, box_id: BoxId, info: BoxInfo) -> Result<Option<BoxDocument>> {
        if info.name.trim().is_empty() {
            return Err(BoxError::Validation("box name must not be empty".into()));
        }
        self.apply(box_id, vec![BoxMutation::SetInfo(info)])
    }

    // ==================== Item Operations ====================

    /// Append a catalog item to the collection of its kind.
    ///
    /// The duplicate check is a read issued before the write; two concurrent
    /// adds of the same catalog id can both pass it.
    pub fn add_item(
        &self,
        box_id: BoxId,
        kind: ItemKind,
        payload: CatalogItem,
    ) -> Result<Option<Vec<BoxItem>>> {
        Self::check_kind(kind, &payload)?;

        let existing = BoxQuery::holding_catalog_item(box_id, kind, payload.catalog_id());
        if self.store.count_boxes(&existing)? > 0 {
            return Err(BoxError::DuplicateItem {
                kind,
                catalog_id: payload.catalog_id().to_string(),
            });
        }

        let item = BoxItem::new(payload);
        Ok(self
            .apply(box_id, vec![BoxMutation::PushItem(kind, item)])?
            .map(|mut d| std::mem::take(d.items.get_mut(kind))))
    }

    /// Overwrite a whole collection. No duplicate check.
    pub fn replace_items(
        &self,
        box_id: BoxId,
        kind: ItemKind,
        items: Vec<BoxItem>,
    ) -> Result<Option<Vec<BoxItem>>> {
        for item in &items {
            Self::check_kind(kind, &item.payload)?;
        }
        Ok(self
            .apply(box_id, vec![BoxMutation::SetItems(kind, items)])?
            .map(|mut d| std::mem::take(d.items.get_mut(kind))))
    }

    /// Replace one item in place, keeping its position and local id.
    pub fn update_item(
        &self,
        box_id: BoxId,
        kind: ItemKind,
        local_id: LocalId,
        item: BoxItem,
    ) -> Result<Option<Vec<BoxItem>>> {
        Self::check_kind(kind, &item.payload)?;
        let item = BoxItem { local_id, ..item };
        Ok(self
            .apply(
                box_id,
                vec![BoxMutation::SetItemWhere {
                    kind,
                    local_id,
                    item,
                }],
            )?
            .map(|mut d| std::mem::take(d.items.get_mut(kind))))
    }

    /// Move one item within its collection and write the collection back.
    pub fn reorder_items(
        &self,
        box_id: BoxId,
        kind: ItemKind,
        source: usize,
        destination: usize,
    ) -> Result<Vec<BoxItem>> {
        let doc = self
            .store
            .get_box(box_id)?
            .ok_or(BoxError::BoxNotFound(box_id))?;

        let mut items = doc.items.get(kind).clone();
        move_element(&mut items, source, destination)?;

        let updated = self
            .apply(box_id, vec![BoxMutation::SetItems(kind, items)])?
            .ok_or(BoxError::BoxNotFound(box_id))?;
        Ok(updated.items.get(kind).clone())
    }

    pub fn remove_item(
        &self,
        box_id: BoxId,
        kind: ItemKind,
        local_id: LocalId,
    ) -> Result<Option<Vec<BoxItem>>> {
        Ok(self
            .apply(box_id, vec![BoxMutation::PullItem(kind, local_id)])?
            .map(|mut d| std::mem::take(d.items.get_mut(kind))))
    }

    // ==================== Sub-section Operations ====================

    pub fn create_sub_section(
        &self,
        box_id: BoxId,
        new: NewSubSection,
    ) -> Result<Option<Vec<SubSection>>> {
        let section = SubSection {
            local_id: Uuid::new_v4(),
            kind: new.kind,
            name: new.name,
            display_index: new.display_index,
            items: Vec::new(),
        };
        Ok(self
            .apply(box_id, vec![BoxMutation::PushSubSection(section)])?
            .map(|d| d.sub_sections))
    }

    pub fn rename_sub_section(
        &self,
        box_id: BoxId,
        sub_section_id: LocalId,
        name: String,
    ) -> Result<Option<Vec<SubSection>>> {
        Ok(self
            .apply(
                box_id,
                vec![BoxMutation::RenameSubSection(sub_section_id, name)],
            )?
            .map(|d| d.sub_sections))
    }

    pub fn replace_sub_sections(
        &self,
        box_id: BoxId,
        sections: Vec<SubSection>,
    ) -> Result<Option<Vec<SubSection>>> {
        for section in &sections {
            for entry in &section.items {
                Self::check_kind(section.kind, &entry.payload)?;
            }
        }
        Ok(self
            .apply(box_id, vec![BoxMutation::SetSubSections(sections)])?
            .map(|d| d.sub_sections))
    }

    /// Move one entry within a sub-section and write all sub-sections back.
    pub fn reorder_within_sub_section(
        &self,
        box_id: BoxId,
        sub_section_id: LocalId,
        source: usize,
        destination: usize,
    ) -> Result<SubSection> {
        let doc = self
            .store
            .get_box(box_id)?
            .ok_or(BoxError::BoxNotFound(box_id))?;

        let mut sections = doc.sub_sections;
        let section = sections
            .iter_mut()
            .find(|s| s.local_id == sub_section_id)
            .ok_or(BoxError::SubSectionNotFound {
                box_id,
                sub_section_id,
            })?;
        move_element(&mut section.items, source, destination)?;
        let reordered = section.clone();

        self.apply(box_id, vec![BoxMutation::SetSubSections(sections)])?
            .ok_or(BoxError::BoxNotFound(box_id))?;
        Ok(reordered)
    }

    /// Copy an item into a sub-section and bump the item's membership count.
    ///
    /// Both operators go in one update. A counter that matches no item does
    /// not stop the copy from being appended. The payload must match both
    /// `kind` and the kind of the target sub-section.
    pub fn add_item_to_sub_section(
        &self,
        box_id: BoxId,
        kind: ItemKind,
        item_local_id: LocalId,
        sub_section_id: LocalId,
        payload: CatalogItem,
    ) -> Result<Option<BoxDocument>> {
        Self::check_kind(kind, &payload)?;
        if let Some(section) = self
            .store
            .get_box(box_id)?
            .and_then(|doc| doc.sub_section(sub_section_id).cloned())
        {
            Self::check_kind(section.kind, &payload)?;
        }
        self.apply(
            box_id,
            vec![
                BoxMutation::IncSubSectionCount {
                    kind,
                    local_id: item_local_id,
                    delta: 1,
                },
                BoxMutation::PushSubSectionEntry(sub_section_id, SubSectionEntry::new(payload)),
            ],
        )
    }

    /// Drop a copy from a sub-section and decrement the item's membership
    /// count. The count is not clamped at zero.
    pub fn remove_item_from_sub_section(
        &self,
        box_id: BoxId,
        kind: ItemKind,
        item_local_id: LocalId,
        sub_section_id: LocalId,
        key: RemovalKey,
    ) -> Result<Option<BoxDocument>> {
        self.apply(
            box_id,
            vec![
                BoxMutation::IncSubSectionCount {
                    kind,
                    local_id: item_local_id,
                    delta: -1,
                },
                BoxMutation::PullSubSectionEntry(sub_section_id, key),
            ],
        )
    }

    /// Remove a sub-section and clear the back-pointers to it held by items
    /// of `affected_kind`. Items of other kinds keep theirs.
    pub fn delete_sub_section(
        &self,
        box_id: BoxId,
        sub_section_id: LocalId,
        affected_kind: ItemKind,
    ) -> Result<Option<BoxDocument>> {
        self.apply(
            box_id,
            vec![
                BoxMutation::PullSubSection(sub_section_id),
                BoxMutation::ClearSubSectionPointer {
                    kind: affected_kind,
                    sub_section: sub_section_id,
                },
            ],
        )
    }

    // ==================== Note Operations ====================

    pub fn add_note(&self, box_id: BoxId, new: NewNote) -> Result<Option<Vec<Note>>> {
        let note = Note {
            local_id: Uuid::new_v4(),
            target_item_local_id: new.target_item_local_id,
            text: new.text,
            sub_section_local_id: new.sub_section_local_id,
        };
        Ok(self
            .apply(box_id, vec![BoxMutation::PushNote(note)])?
            .map(|d| d.notes))
    }

    pub fn edit_note(
        &self,
        box_id: BoxId,
        note_id: LocalId,
        text: String,
    ) -> Result<Option<Vec<Note>>> {
        Ok(self
            .apply(box_id, vec![BoxMutation::SetNoteText(note_id, text)])?
            .map(|d| d.notes))
    }

    pub fn delete_note(&self, box_id: BoxId, note_id: LocalId) -> Result<Option<Vec<Note>>> {
        Ok(self
            .apply(box_id, vec![BoxMutation::PullNote(note_id)])?
            .map(|d| d.notes))
    }
}
