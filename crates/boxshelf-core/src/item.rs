use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a box document.
pub type BoxId = Uuid;

/// Identifier of a folder document.
pub type FolderId = Uuid;

/// Store-assigned identity of an element inside a box (item, sub-section,
/// sub-section entry, note).
pub type LocalId = Uuid;

/// Verified subject id handed over by the identity provider.
pub type UserId = String;

/// Opaque upstream fields the core never interprets.
pub type Extra = BTreeMap<String, serde_json::Value>;

/// The four kinds of catalog entity a box can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Artist,
    Album,
    Track,
    Playlist,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Artist,
        ItemKind::Album,
        ItemKind::Track,
        ItemKind::Playlist,
    ];

    /// Name of the collection inside `BoxDocument::items` holding this kind.
    pub fn collection_name(self) -> &'static str {
        match self {
            ItemKind::Artist => "artists",
            ItemKind::Album => "albums",
            ItemKind::Track => "tracks",
            ItemKind::Playlist => "playlists",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Artist => write!(f, "artist"),
            ItemKind::Album => write!(f, "album"),
            ItemKind::Track => write!(f, "track"),
            ItemKind::Playlist => write!(f, "playlist"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    /// Accepts both the singular kind and the collection name, so route
    /// segments like `artists` and query values like `artist` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" | "artists" => Ok(ItemKind::Artist),
            "album" | "albums" => Ok(ItemKind::Album),
            "track" | "tracks" => Ok(ItemKind::Track),
            "playlist" | "playlists" => Ok(ItemKind::Playlist),
            other => Err(format!("unknown item kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub total_tracks: Option<u32>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Snapshot of a catalog entity, tagged by the upstream `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogItem {
    Artist(Artist),
    Album(Album),
    Track(Track),
    Playlist(Playlist),
}

impl CatalogItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            CatalogItem::Artist(_) => ItemKind::Artist,
            CatalogItem::Album(_) => ItemKind::Album,
            CatalogItem::Track(_) => ItemKind::Track,
            CatalogItem::Playlist(_) => ItemKind::Playlist,
        }
    }

    /// External upstream identity.
    pub fn catalog_id(&self) -> &str {
        match self {
            CatalogItem::Artist(a) => &a.id,
            CatalogItem::Album(a) => &a.id,
            CatalogItem::Track(t) => &t.id,
            CatalogItem::Playlist(p) => &p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Artist(a) => &a.name,
            CatalogItem::Album(a) => &a.name,
            CatalogItem::Track(t) => &t.name,
            CatalogItem::Playlist(p) => &p.name,
        }
    }
}

/// An item stored in one of a box's collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxItem {
    pub local_id: LocalId,
    pub payload: CatalogItem,
    /// Number of sub-section copies of this item. Best-effort hint: it may
    /// drift from the real count and may go negative.
    #[serde(default)]
    pub sub_section_membership_count: i64,
    /// Back-pointer to the sub-section the client grouped this item under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_section: Option<LocalId>,
}

impl BoxItem {
    /// Wrap a payload with a fresh local id.
    pub fn new(payload: CatalogItem) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            payload,
            sub_section_membership_count: 0,
            sub_section: None,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    pub fn catalog_id(&self) -> &str {
        self.payload.catalog_id()
    }
}

#[cfg(test)]
pub(crate) fn artist(id: &str, name: &str) -> CatalogItem {
    CatalogItem::Artist(Artist {
        id: id.into(),
        name: name.into(),
        uri: format!("spotify:artist:{}", id),
        genres: vec![],
        images: vec![],
        popularity: None,
        extra: Extra::new(),
    })
}

#[cfg(test)]
pub(crate) fn album(id: &str, name: &str) -> CatalogItem {
    CatalogItem::Album(Album {
        id: id.into(),
        name: name.into(),
        uri: format!("spotify:album:{}", id),
        album_type: Some("album".into()),
        release_date: None,
        total_tracks: None,
        images: vec![],
        extra: Extra::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_item_reads_upstream_type_tag() {
        let json = r#"{
            "type": "artist",
            "id": "4Z8W4fKeB5YxbusRsdQVPb",
            "name": "Radiohead",
            "uri": "spotify:artist:4Z8W4fKeB5YxbusRsdQVPb",
            "genres": ["alternative rock"],
            "external_urls": {"spotify": "https://open.spotify.com/artist/4Z8W4fKeB5YxbusRsdQVPb"}
        }"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind(), ItemKind::Artist);
        assert_eq!(item.catalog_id(), "4Z8W4fKeB5YxbusRsdQVPb");
        match &item {
            CatalogItem::Artist(a) => {
                assert_eq!(a.genres, vec!["alternative rock".to_string()]);
                assert!(a.extra.contains_key("external_urls"));
                assert!(!a.extra.contains_key("type"));
            }
            other => panic!("expected artist, got {:?}", other),
        }
    }

    #[test]
    fn unknown_upstream_fields_survive_serialization() {
        let json = r#"{"type":"playlist","id":"p1","name":"Mix","owner":{"id":"u9"}}"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["type"], "playlist");
        assert_eq!(out["owner"]["id"], "u9");
    }

    #[test]
    fn item_kind_parses_singular_and_plural() {
        assert_eq!("albums".parse::<ItemKind>().unwrap(), ItemKind::Album);
        assert_eq!("track".parse::<ItemKind>().unwrap(), ItemKind::Track);
        assert!("podcasts".parse::<ItemKind>().is_err());
        assert_eq!(ItemKind::Playlist.collection_name(), "playlists");
    }

    #[test]
    fn box_item_defaults_counter_and_pointer() {
        let json = format!(
            r#"{{"localId":"{}","payload":{{"type":"album","id":"x","name":"X"}}}}"#,
            Uuid::new_v4()
        );
        let item: BoxItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item.sub_section_membership_count, 0);
        assert!(item.sub_section.is_none());
        assert_eq!(item.kind(), ItemKind::Album);
    }
}
