use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    cryptomatte::manifest::Manifest,
    foundation::core::{BoundingBox, Contour},
};

/// `bbox_mode` for `[left, top, width, height]` in absolute pixels.
pub const BBOX_MODE_XYWH_ABS: &str = "XYWH_ABS";
/// `contour_mode` for `[[x, y], ...]` polygons in absolute pixels.
pub const CONTOUR_MODE_XY_ABS: &str = "XY_ABS";
/// Content type recorded for materialized reference images.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Reference to an image file stored beside the metadata file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res: Option<[u32; 2]>,
    #[serde(
        rename = "content-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,
}

/// The `synthetic.cryptomatte` block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CryptomatteRef {
    pub filename: String,
    pub manifest: Manifest,
}

/// The `synthetic` block present on rendered samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRef {
    pub image: ImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cryptomatte: Option<CryptomatteRef>,
}

/// The optional `provenance` block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// One entry of the `annotations` list.
///
/// Keys this crate does not model are kept in `extra` and written back unchanged.
/// A `bbox` or `contours` key holding `null` also lands in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAnnotation")]
pub struct Annotation {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contours: Option<Vec<Contour>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contour_mode: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Annotation {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            bbox: None,
            bbox_mode: None,
            contours: None,
            contour_mode: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_bbox(category: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            bbox: Some(bbox),
            bbox_mode: Some(BBOX_MODE_XYWH_ABS.to_string()),
            ..Self::new(category)
        }
    }

    pub fn with_contours(category: impl Into<String>, contours: Vec<Contour>) -> Self {
        Self {
            contours: Some(contours),
            contour_mode: Some(CONTOUR_MODE_XY_ABS.to_string()),
            ..Self::new(category)
        }
    }

    /// Whether this entry carries derived geometry (a bbox or contours).
    ///
    /// A geometry key that is present with a `null` value counts.
    pub fn has_geometry(&self) -> bool {
        self.bbox.is_some()
            || self.contours.is_some()
            || GEOMETRY_KEYS.iter().any(|k| self.extra.contains_key(*k))
    }
}

const GEOMETRY_KEYS: [&str; 2] = ["bbox", "contours"];

/// Deserialized form of [`Annotation`] that tells a missing key from a `null` one.
#[derive(Deserialize)]
struct RawAnnotation {
    category: String,
    #[serde(default, deserialize_with = "present")]
    bbox: Option<Option<BoundingBox>>,
    #[serde(default)]
    bbox_mode: Option<String>,
    #[serde(default, deserialize_with = "present")]
    contours: Option<Option<Vec<Contour>>>,
    #[serde(default)]
    contour_mode: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<RawAnnotation> for Annotation {
    fn from(raw: RawAnnotation) -> Self {
        let mut extra = raw.extra;
        if let Some(None) = raw.bbox {
            extra.insert("bbox".to_string(), serde_json::Value::Null);
        }
        if let Some(None) = raw.contours {
            extra.insert("contours".to_string(), serde_json::Value::Null);
        }
        Self {
            category: raw.category,
            bbox: raw.bbox.flatten(),
            bbox_mode: raw.bbox_mode,
            contours: raw.contours.flatten(),
            contour_mode: raw.contour_mode,
            extra,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/model.rs"]
mod tests;
