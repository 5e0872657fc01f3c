use serde::{Deserialize, Serialize};

use crate::item::{BoxId, FolderId, ItemKind, UserId};

/// A query against the box collection.
///
/// Read paths that list boxes to users must include
/// [`BoxPredicate::NotDeletedByUser`]; the constructors below do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxQuery {
    pub predicates: Vec<BoxPredicate>,
    pub sort: Vec<SortDescriptor>,
}

impl BoxQuery {
    /// Soft-delete filtered fetch of a single box.
    pub fn visible_by_id(id: BoxId) -> Self {
        Self {
            predicates: vec![
                BoxPredicate::IdIn(vec![id]),
                BoxPredicate::NotDeletedByUser,
            ],
            ..Default::default()
        }
    }

    /// Soft-delete filtered listing of a user's boxes, oldest first.
    pub fn visible_by_creator(creator: impl Into<UserId>) -> Self {
        Self {
            predicates: vec![
                BoxPredicate::CreatedBy(creator.into()),
                BoxPredicate::NotDeletedByUser,
            ],
            sort: vec![SortDescriptor {
                field: SortField::Created,
                ascending: true,
            }],
            ..Default::default()
        }
    }

    /// Unfiltered in-set fetch. Result order is unspecified.
    pub fn by_ids(ids: Vec<BoxId>) -> Self {
        Self {
            predicates: vec![BoxPredicate::IdIn(ids)],
            ..Default::default()
        }
    }

    /// Matches the box only if `kind`'s collection already holds `catalog_id`.
    pub fn holding_catalog_item(id: BoxId, kind: ItemKind, catalog_id: impl Into<String>) -> Self {
        Self {
            predicates: vec![
                BoxPredicate::IdIn(vec![id]),
                BoxPredicate::HoldsCatalogItem(kind, catalog_id.into()),
            ],
            ..Default::default()
        }
    }
}

/// Filter predicate for box queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoxPredicate {
    IdIn(Vec<BoxId>),
    CreatedBy(UserId),
    /// `isDeletedByUser` is false or absent.
    NotDeletedByUser,
    HoldsCatalogItem(ItemKind, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Created,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub field: SortField,
    pub ascending: bool,
}

/// A query against the folder collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderQuery {
    pub creator: Option<UserId>,
    pub ids: Option<Vec<FolderId>>,
}
