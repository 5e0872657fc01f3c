//! boxshelf-core: box documents and the operations that mutate them
//!
//! A box holds four ordered item collections (artists, albums, tracks,
//! playlists), named sub-sections of copied entries, display settings and
//! notes. All writes go through [`DocumentStore::update_box`] as a batch of
//! [`BoxMutation`] operators applied to one document atomically.

pub mod coordinator;
pub mod document;
pub mod error;
pub mod item;
pub mod mutation;
pub mod query;
pub mod sequence;
pub mod service;
pub mod store;

#[cfg(feature = "sqlite")]
mod sql_query;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;

pub use coordinator::{Coordinator, NewUser};
pub use document::*;
pub use error::{BoxError, Result};
pub use item::*;
pub use mutation::*;
pub use query::*;
pub use service::{BoxService, BoxView, NewNote, NewSubSection};
pub use store::*;

#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteDocumentStore;
