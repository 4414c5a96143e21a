use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Kind of stored media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type; anything other than `image/*` or `video/*` is rejected.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Media item stored under a sub-collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Item {
    pub id: Uuid,
    pub sub_collection_id: Uuid,
    pub kind: MediaKind,
    pub storage_key: String,
    pub url: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub description: Option<String>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item together with its current tag names.
#[derive(Debug, Clone, Serialize)]
pub struct ItemWithTags {
    #[serde(flatten)]
    pub item: Item,
    pub tags: Vec<String>,
}

/// Reference to binary content that the storage service has already persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPayload {
    pub storage_key: String,
    pub url: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub kind: MediaKind,
}

/// Geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Location attached to an item. Coordinates are resolved through the geocoder
/// when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

/// Optional metadata supplied when adding an item.
#[derive(Debug, Clone, Default)]
pub struct NewItemMeta {
    pub description: Option<String>,
    pub location: Option<LocationInput>,
    pub tags: Vec<String>,
}

/// Metadata edit for an existing item.
///
/// Description and location are overwritten (`None` clears them); tags are only
/// reconciled when `Some`, and `Some(vec![])` clears all tags.
#[derive(Debug, Clone, Default)]
pub struct ItemMetaUpdate {
    pub description: Option<String>,
    pub location: Option<LocationInput>,
    pub tags: Option<Vec<String>>,
}

/// Resolved location fields as written to the item row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedLocation {
    pub name: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Reference returned after a thumbnail replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThumbnailRef {
    pub sub_collection_id: Uuid,
    pub item_id: Uuid,
    pub url: String,
    /// True when an existing thumbnail item was updated in place.
    pub replaced: bool,
}

/// Item position on the account's map.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MapLocation {
    pub item_id: Uuid,
    pub sub_collection_id: Uuid,
    pub collection_id: Uuid,
    pub kind: MediaKind,
    pub url: String,
    pub location_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_image_and_video_mime_types() {
        assert_eq!(MediaKind::from_mime("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_mime("IMAGE/JPEG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_mime("video/mp4"), Some(MediaKind::Video));
    }

    #[test]
    fn rejects_other_mime_types() {
        assert_eq!(MediaKind::from_mime("application/pdf"), None);
        assert_eq!(MediaKind::from_mime("audio/mpeg"), None);
        assert_eq!(MediaKind::from_mime(""), None);
    }

    #[test]
    fn coordinate_bounds() {
        assert!(Coordinates {
            latitude: 37.5665,
            longitude: 126.978
        }
        .is_valid());
        assert!(!Coordinates {
            latitude: 91.0,
            longitude: 0.0
        }
        .is_valid());
    }
}
