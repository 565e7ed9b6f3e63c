pub use kurbo::{Point, Rect};

/// Closed polygon in absolute pixel coordinates, `(x, y)` per vertex.
///
/// Traced contours repeat their first vertex as the last one. Vertex order is
/// meaningful: see [`crate::ccw`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour(Vec<Point>);

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Point> for Contour {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl serde::Serialize for Contour {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for p in &self.0 {
            seq.serialize_element(&[p.x, p.y])?;
        }
        seq.end()
    }
}

impl<'de> serde::Deserialize<'de> for Contour {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<[f64; 2]>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|[x, y]| Point::new(x, y)).collect())
    }
}

/// Axis-aligned box `(left, top, width, height)` in absolute pixel units.
///
/// Serialized as a four element array, the `XYWH_ABS` bbox mode.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// `true` only when both width and height are exactly zero.
    ///
    /// A box that is degenerate in one axis only (a line) is not empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right(), self.bottom())
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([left, top, width, height]: [f64; 4]) -> Self {
        Self::new(left, top, width, height)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.left, b.top, b.width, b.height]
    }
}

/// Category part of an instance label: everything before the last `/`.
///
/// Labels without a `/` are their own category.
pub fn instance_category(label: &str) -> &str {
    label.rsplit_once('/').map_or(label, |(category, _)| category)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
