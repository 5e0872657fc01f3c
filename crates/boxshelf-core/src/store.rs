use crate::document::{BoxDocument, Folder, User};
use crate::item::{BoxId, FolderId, UserId};
use crate::mutation::{BoxMutation, FolderMutation, UserMutation};
use crate::query::{BoxQuery, FolderQuery};

/// The persistence seam: a transactional document store whose only atomic
/// unit is a single document.
///
/// `update_*` applies the whole mutation list to one document in one step
/// and returns the document as written, or `None` when the document does
/// not exist (nothing is written and no error is raised).
pub trait DocumentStore: Send + Sync {
    /// Insert a new box document.
    fn insert_box(&self, doc: BoxDocument) -> Result<BoxId, StoreError>;

    /// Get a box by ID, regardless of its soft-delete flag.
    fn get_box(&self, id: BoxId) -> Result<Option<BoxDocument>, StoreError>;

    /// Query boxes matching predicates.
    fn find_boxes(&self, q: &BoxQuery) -> Result<Vec<BoxDocument>, StoreError>;

    /// Count boxes matching a query without fetching them.
    fn count_boxes(&self, q: &BoxQuery) -> Result<usize, StoreError>;

    /// Apply mutations to an existing box atomically.
    fn update_box(
        &self,
        id: BoxId,
        mutations: Vec<BoxMutation>,
    ) -> Result<Option<BoxDocument>, StoreError>;

    /// Replace a whole box document, keeping its id.
    fn replace_box(&self, id: BoxId, doc: BoxDocument) -> Result<Option<BoxDocument>, StoreError>;

    fn insert_folder(&self, folder: Folder) -> Result<FolderId, StoreError>;

    fn get_folder(&self, id: FolderId) -> Result<Option<Folder>, StoreError>;

    fn find_folders(&self, q: &FolderQuery) -> Result<Vec<Folder>, StoreError>;

    fn update_folder(
        &self,
        id: FolderId,
        mutations: Vec<FolderMutation>,
    ) -> Result<Option<Folder>, StoreError>;

    /// Hard-delete a folder, returning what was removed.
    fn delete_folder(&self, id: FolderId) -> Result<Option<Folder>, StoreError>;

    fn insert_user(&self, user: User) -> Result<UserId, StoreError>;

    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    fn update_user(
        &self,
        id: &str,
        mutations: Vec<UserMutation>,
    ) -> Result<Option<User>, StoreError>;
}

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::AlreadyExists("box 42".into());
        assert_eq!(err.to_string(), "Document already exists: box 42");

        let err: StoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
