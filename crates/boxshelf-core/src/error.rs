//! Error types for boxshelf-core

use thiserror::Error;

use crate::item::{BoxId, FolderId, ItemKind, LocalId, UserId};
use crate::store::StoreError;

/// Result type alias for box operations
pub type Result<T> = std::result::Result<T, BoxError>;

/// Main error type for box, folder and user operations
#[derive(Error, Debug)]
pub enum BoxError {
    #[error("Box not found: {0}")]
    BoxNotFound(BoxId),

    #[error("Sub-section {sub_section_id} not found in box {box_id}")]
    SubSectionNotFound {
        box_id: BoxId,
        sub_section_id: LocalId,
    },

    #[error("Folder not found: {0}")]
    FolderNotFound(FolderId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The catalog item is already in the target collection
    #[error("{kind} {catalog_id} is already in this box")]
    DuplicateItem { kind: ItemKind, catalog_id: String },

    /// Malformed or inconsistent payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reorder index outside the sequence
    #[error("Index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Identity or catalog collaborator failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl BoxError {
    /// Whether this is one of the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BoxError::BoxNotFound(_)
                | BoxError::SubSectionNotFound { .. }
                | BoxError::FolderNotFound(_)
                | BoxError::UserNotFound(_)
        )
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BoxError::BoxNotFound(_) => "box_not_found",
            BoxError::SubSectionNotFound { .. } => "sub_section_not_found",
            BoxError::FolderNotFound(_) => "folder_not_found",
            BoxError::UserNotFound(_) => "user_not_found",
            BoxError::DuplicateItem { .. } => "duplicate_item",
            BoxError::Validation(_) => "validation",
            BoxError::IndexOutOfRange { .. } => "index_out_of_range",
            BoxError::UpstreamUnavailable(_) => "upstream_unavailable",
            BoxError::Storage(_) => "storage",
        }
    }
}
