use crate::foundation::core::{BoundingBox, Contour, Rect};

/// Axis-aligned bounds of every vertex in `contours`.
///
/// `None` when there are no vertices at all; a single vertex gives a zero-sized box.
pub fn compute_bbox(contours: &[Contour]) -> Option<BoundingBox> {
    let mut points = contours.iter().flat_map(|c| c.points().iter().copied());
    let first = points.next()?;
    let rect = points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p));
    Some(BoundingBox::new(rect.x0, rect.y0, rect.width(), rect.height()))
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/bbox.rs"]
mod tests;
