//! Cross-document coordination
//!
//! Box lifecycle changes touch more than one document: the box, the owner's
//! dashboard listing and folder membership lists. Each document is updated
//! on its own; a failure between steps is logged and left in place.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::{BoxDocument, BoxSummary, Folder, FolderBox, NewBox, NewFolder, User};
use crate::error::{BoxError, Result};
use crate::item::{BoxId, FolderId};
use crate::mutation::{BoxMutation, FolderMutation, UserMutation};
use crate::query::{BoxQuery, FolderQuery};
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub display_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub struct Coordinator {
    store: Arc<dyn DocumentStore>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // ==================== Box Lifecycle ====================

    /// Insert a box and list it on the owner's dashboard.
    ///
    /// If the listing step fails the box stays in place unlisted.
    pub fn create_box(&self, owner: &str, data: NewBox) -> Result<BoxDocument> {
        if data.name.trim().is_empty() {
            return Err(BoxError::Validation("box name must not be empty".into()));
        }
        let doc = data.into_document(owner.to_string());
        self.store.insert_box(doc.clone())?;
        tracing::info!(box_id = %doc.id, owner, "box created");

        match self
            .store
            .update_user(owner, vec![UserMutation::PushDashboardBox(doc.id)])
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(box_id = %doc.id, owner, "box created for unknown user, left unlisted")
            }
            Err(e) => {
                tracing::warn!(box_id = %doc.id, owner, "box created but dashboard listing failed: {}", e);
                return Err(e.into());
            }
        }
        Ok(doc)
    }

    /// Flag a box deleted and detach it from wherever the caller says it is
    /// listed: the given folder, or otherwise the creator's dashboard.
    pub fn soft_delete_box(
        &self,
        box_id: BoxId,
        containing_folder: Option<FolderId>,
    ) -> Result<Option<BoxDocument>> {
        let Some(doc) = self
            .store
            .update_box(box_id, vec![BoxMutation::SetDeletedByUser(true)])?
        else {
            return Ok(None);
        };
        tracing::info!(box_id = %box_id, folder = ?containing_folder, "box soft-deleted");

        let detached = match containing_folder {
            Some(folder_id) => self
                .store
                .update_folder(folder_id, vec![FolderMutation::PullBox(box_id)])?
                .is_some(),
            None => self
                .store
                .update_user(
                    &doc.creator_id,
                    vec![UserMutation::PullDashboardBox(box_id)],
                )?
                .is_some(),
        };
        if !detached {
            tracing::warn!(box_id = %box_id, "deleted box had no listing to detach from");
        }
        Ok(Some(doc))
    }

    /// Dashboard summaries for `ids`, in the order given. Ids without a
    /// document are dropped.
    pub fn fetch_many_by_ids(&self, ids: &[BoxId]) -> Result<Vec<BoxSummary>> {
        let found: HashMap<BoxId, BoxDocument> = self
            .store
            .find_boxes(&BoxQuery::by_ids(ids.to_vec()))?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| found.get(id).map(BoxDocument::summary))
            .collect())
    }

    // ==================== Folder Membership ====================

    /// Put a box into a folder and take it off the folder owner's dashboard.
    pub fn attach_box(&self, folder_id: FolderId, entry: FolderBox) -> Result<Folder> {
        let box_id = entry.box_id;
        let folder = self
            .store
            .update_folder(folder_id, vec![FolderMutation::PushBox(entry)])?
            .ok_or(BoxError::FolderNotFound(folder_id))?;
        tracing::info!(box_id = %box_id, folder_id = %folder_id, "box attached to folder");

        let owner = folder.creator_id.as_str();
        if self
            .store
            .update_user(owner, vec![UserMutation::PullDashboardBox(box_id)])?
            .is_none()
        {
            tracing::warn!(box_id = %box_id, owner, "folder owner not found, dashboard untouched");
        }
        Ok(folder)
    }

    /// Take a box out of a folder and put it back on the folder owner's dashboard.
    pub fn detach_box(&self, folder_id: FolderId, box_id: BoxId) -> Result<Folder> {
        let folder = self
            .store
            .update_folder(folder_id, vec![FolderMutation::PullBox(box_id)])?
            .ok_or(BoxError::FolderNotFound(folder_id))?;
        tracing::info!(box_id = %box_id, folder_id = %folder_id, "box detached from folder");

        let owner = folder.creator_id.as_str();
        if self
            .store
            .update_user(owner, vec![UserMutation::PushDashboardBox(box_id)])?
            .is_none()
        {
            tracing::warn!(box_id = %box_id, owner, "folder owner not found, box is unlisted");
        }
        Ok(folder)
    }

    /// Move a box between folders. Returns the target folder.
    pub fn move_box(&self, source: FolderId, target: FolderId, entry: FolderBox) -> Result<Folder> {
        let box_id = entry.box_id;
        self.store
            .update_folder(source, vec![FolderMutation::PullBox(box_id)])?
            .ok_or(BoxError::FolderNotFound(source))?;

        match self
            .store
            .update_folder(target, vec![FolderMutation::PushBox(entry)])?
        {
            Some(folder) => {
                tracing::info!(box_id = %box_id, from = %source, to = %target, "box moved");
                Ok(folder)
            }
            None => {
                tracing::warn!(box_id = %box_id, from = %source, to = %target, "box left source folder but target is missing");
                Err(BoxError::FolderNotFound(target))
            }
        }
    }

    // ==================== Folder Operations ====================

    pub fn create_folder(&self, owner: &str, data: NewFolder) -> Result<Folder> {
        if data.name.trim().is_empty() {
            return Err(BoxError::Validation("folder name must not be empty".into()));
        }
        let folder = data.into_folder(owner.to_string());
        self.store.insert_folder(folder.clone())?;
        tracing::info!(folder_id = %folder.id, owner, "folder created");

        if self
            .store
            .update_user(owner, vec![UserMutation::PushDashboardFolder(folder.id)])?
            .is_none()
        {
            tracing::warn!(folder_id = %folder.id, owner, "folder created for unknown user, left unlisted");
        }
        Ok(folder)
    }

    pub fn get_folder(&self, folder_id: FolderId) -> Result<Option<Folder>> {
        Ok(self.store.get_folder(folder_id)?)
    }

    /// Folders for `ids`, in the order given. Missing ids are dropped.
    pub fn fetch_many_folders(&self, ids: &[FolderId]) -> Result<Vec<Folder>> {
        let found: HashMap<FolderId, Folder> = self
            .store
            .find_folders(&FolderQuery {
                creator: None,
                ids: Some(ids.to_vec()),
            })?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();
        Ok(ids.iter().filter_map(|id| found.get(id).cloned()).collect())
    }

    pub fn folders_by_creator(&self, creator_id: &str) -> Result<Vec<Folder>> {
        Ok(self.store.find_folders(&FolderQuery {
            creator: Some(creator_id.to_string()),
            ids: None,
        })?)
    }

    /// Hard-delete a folder. Its boxes go back to the owner's dashboard.
    pub fn delete_folder(&self, folder_id: FolderId) -> Result<Option<Folder>> {
        let Some(folder) = self.store.delete_folder(folder_id)? else {
            return Ok(None);
        };
        tracing::info!(folder_id = %folder_id, boxes = folder.boxes.len(), "folder deleted");

        let returned: Vec<BoxId> = folder.boxes.iter().map(|b| b.box_id).collect();
        let owner = &folder.creator_id;
        if self
            .store
            .update_user(owner, vec![UserMutation::PullDashboardFolder(folder_id)])?
            .is_none()
        {
            tracing::warn!(folder_id = %folder_id, owner = %owner, "deleted folder owner not found");
            return Ok(Some(folder));
        }
        self.store
            .update_user(owner, vec![UserMutation::PushDashboardBoxes(returned)])?;
        Ok(Some(folder))
    }

    pub fn rename_folder_box(
        &self,
        folder_id: FolderId,
        box_id: BoxId,
        name: String,
    ) -> Result<Option<Folder>> {
        Ok(self
            .store
            .update_folder(folder_id, vec![FolderMutation::RenameBox(box_id, name)])?)
    }

    pub fn replace_folder_boxes(
        &self,
        folder_id: FolderId,
        entries: Vec<FolderBox>,
    ) -> Result<Option<Folder>> {
        Ok(self
            .store
            .update_folder(folder_id, vec![FolderMutation::SetBoxes(entries)])?)
    }

    // ==================== User Operations ====================

    /// Register the verified subject as a user with empty listings.
    pub fn create_user(&self, subject: &str, data: NewUser) -> Result<User> {
        let user = User {
            id: subject.to_string(),
            display_name: data.display_name,
            image: data.image,
            email: data.email,
            dashboard_boxes: Vec::new(),
            dashboard_folders: Vec::new(),
        };
        self.store.insert_user(user.clone())?;
        tracing::info!(user_id = subject, "user created");
        Ok(user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| BoxError::UserNotFound(user_id.to_string()))
    }

    pub fn set_dashboard_boxes(&self, user_id: &str, ids: Vec<BoxId>) -> Result<Option<User>> {
        Ok(self
            .store
            .update_user(user_id, vec![UserMutation::SetDashboardBoxes(ids)])?)
    }

    pub fn set_dashboard_folders(
        &self,
        user_id: &str,
        ids: Vec<FolderId>,
    ) -> Result<Option<User>> {
        Ok(self
            .store
            .update_user(user_id, vec![UserMutation::SetDashboardFolders(ids)])?)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::sqlite_store::SqliteDocumentStore;
    use uuid::Uuid;

    fn setup() -> (Coordinator, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::open_in_memory().unwrap());
        let coord = Coordinator::new(store.clone());
        coord
            .create_user(
                "u1",
                NewUser {
                    display_name: "Ann".into(),
                    image: None,
                    email: None,
                },
            )
            .unwrap();
        (coord, store)
    }

    fn folder(coord: &Coordinator, name: &str) -> Folder {
        coord
            .create_folder(
                "u1",
                NewFolder {
                    name: name.into(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn create_box_lists_on_dashboard() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("Road Trip")).unwrap();
        assert_eq!(coord.get_user("u1").unwrap().dashboard_boxes, vec![doc.id]);
    }

    #[test]
    fn create_box_for_unknown_user_leaves_orphan() {
        let (coord, store) = setup();
        let doc = coord.create_box("ghost", NewBox::named("Orphan")).unwrap();
        assert!(store.get_box(doc.id).unwrap().is_some());
    }

    #[test]
    fn soft_delete_from_dashboard() {
        let (coord, store) = setup();
        let doc = coord.create_box("u1", NewBox::named("Gone")).unwrap();
        let deleted = coord.soft_delete_box(doc.id, None).unwrap().unwrap();
        assert!(deleted.is_deleted());
        assert!(coord.get_user("u1").unwrap().dashboard_boxes.is_empty());
        assert!(store.get_box(doc.id).unwrap().is_some());
    }

    #[test]
    fn soft_delete_from_folder_leaves_dashboard() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("Boxed")).unwrap();
        let other = coord.create_box("u1", NewBox::named("Stays")).unwrap();
        let f = folder(&coord, "F");
        coord.attach_box(f.id, doc.summary()).unwrap();

        coord.soft_delete_box(doc.id, Some(f.id)).unwrap();
        assert!(coord.get_folder(f.id).unwrap().unwrap().boxes.is_empty());
        assert_eq!(coord.get_user("u1").unwrap().dashboard_boxes, vec![other.id]);
    }

    #[test]
    fn soft_delete_missing_box_is_noop() {
        let (coord, _) = setup();
        assert!(coord.soft_delete_box(Uuid::new_v4(), None).unwrap().is_none());
    }

    #[test]
    fn attach_detach_round_trip() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("B")).unwrap();
        let f = folder(&coord, "F");

        let attached = coord.attach_box(f.id, doc.summary()).unwrap();
        assert_eq!(attached.boxes, vec![doc.summary()]);
        assert!(coord.get_user("u1").unwrap().dashboard_boxes.is_empty());

        let detached = coord.detach_box(f.id, doc.id).unwrap();
        assert!(detached.boxes.is_empty());
        assert_eq!(coord.get_user("u1").unwrap().dashboard_boxes, vec![doc.id]);
    }

    #[test]
    fn attach_by_other_user_updates_folder_owner_dashboard() {
        let (coord, _) = setup();
        coord
            .create_user(
                "u2",
                NewUser {
                    display_name: "Ben".into(),
                    image: None,
                    email: None,
                },
            )
            .unwrap();
        let doc = coord.create_box("u1", NewBox::named("Shared")).unwrap();
        let f = folder(&coord, "F");
        let u2_before = coord.get_user("u2").unwrap();

        coord.attach_box(f.id, doc.summary()).unwrap();
        assert!(coord.get_user("u1").unwrap().dashboard_boxes.is_empty());
        assert_eq!(coord.get_user("u2").unwrap(), u2_before);

        coord.detach_box(f.id, doc.id).unwrap();
        assert_eq!(coord.get_user("u1").unwrap().dashboard_boxes, vec![doc.id]);
        assert_eq!(coord.get_user("u2").unwrap(), u2_before);
    }

    #[test]
    fn attach_to_missing_folder_fails() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("B")).unwrap();
        let err = coord
            .attach_box(Uuid::new_v4(), doc.summary())
            .unwrap_err();
        assert!(matches!(err, BoxError::FolderNotFound(_)));
        assert_eq!(coord.get_user("u1").unwrap().dashboard_boxes, vec![doc.id]);
    }

    #[test]
    fn move_between_folders() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("B")).unwrap();
        let a = folder(&coord, "A");
        let b = folder(&coord, "B");
        coord.attach_box(a.id, doc.summary()).unwrap();

        let target = coord.move_box(a.id, b.id, doc.summary()).unwrap();
        assert_eq!(target.boxes, vec![doc.summary()]);
        assert!(coord.get_folder(a.id).unwrap().unwrap().boxes.is_empty());
    }

    #[test]
    fn move_to_missing_target_detaches_from_source() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("B")).unwrap();
        let a = folder(&coord, "A");
        coord.attach_box(a.id, doc.summary()).unwrap();

        let err = coord
            .move_box(a.id, Uuid::new_v4(), doc.summary())
            .unwrap_err();
        assert!(matches!(err, BoxError::FolderNotFound(_)));
        assert!(coord.get_folder(a.id).unwrap().unwrap().boxes.is_empty());
    }

    #[test]
    fn delete_folder_returns_boxes_to_dashboard() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("B")).unwrap();
        let f = folder(&coord, "F");
        coord.attach_box(f.id, doc.summary()).unwrap();

        let removed = coord.delete_folder(f.id).unwrap().unwrap();
        assert_eq!(removed.id, f.id);
        let user = coord.get_user("u1").unwrap();
        assert!(user.dashboard_folders.is_empty());
        assert_eq!(user.dashboard_boxes, vec![doc.id]);
        assert!(coord.get_folder(f.id).unwrap().is_none());
    }

    #[test]
    fn fetch_many_folders_preserves_order() {
        let (coord, _) = setup();
        let a = folder(&coord, "A");
        let b = folder(&coord, "B");
        let got = coord
            .fetch_many_folders(&[b.id, Uuid::new_v4(), a.id])
            .unwrap();
        let names: Vec<&str> = got.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn rename_box_in_folder() {
        let (coord, _) = setup();
        let doc = coord.create_box("u1", NewBox::named("Old")).unwrap();
        let f = folder(&coord, "F");
        coord.attach_box(f.id, doc.summary()).unwrap();
        let f = coord
            .rename_folder_box(f.id, doc.id, "New".into())
            .unwrap()
            .unwrap();
        assert_eq!(f.boxes[0].box_name, "New");
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (coord, _) = setup();
        assert!(matches!(
            coord.get_user("nobody").unwrap_err(),
            BoxError::UserNotFound(_)
        ));
    }
}
