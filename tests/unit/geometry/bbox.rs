use super::*;
use crate::foundation::core::Point;

fn contour(points: &[(f64, f64)]) -> Contour {
    points.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

#[test]
fn no_contours_means_no_box() {
    assert_eq!(compute_bbox(&[]), None);
    assert_eq!(compute_bbox(&[Contour::default()]), None);
}

#[test]
fn box_spans_min_and_extent_of_vertices() {
    let c = contour(&[(0.0, 0.5), (0.5, 0.0), (0.0, -0.5), (-0.5, 0.0), (0.0, 0.5)]);
    assert_eq!(
        compute_bbox(&[c]),
        Some(BoundingBox::new(-0.5, -0.5, 1.0, 1.0))
    );
}

#[test]
fn box_covers_the_union_of_disjoint_contours() {
    let a = contour(&[(1.0, 2.0), (3.0, 2.0), (2.0, 4.0)]);
    let b = contour(&[(10.0, -1.0), (12.0, 0.0)]);
    let bbox = compute_bbox(&[a, b]).unwrap();
    assert_eq!(bbox, BoundingBox::new(1.0, -1.0, 11.0, 5.0));
    assert_eq!(bbox.right(), 12.0);
    assert_eq!(bbox.bottom(), 4.0);
}

#[test]
fn single_vertex_gives_a_point_box() {
    let bbox = compute_bbox(&[contour(&[(4.0, 5.0)])]).unwrap();
    assert_eq!(bbox, BoundingBox::new(4.0, 5.0, 0.0, 0.0));
    assert!(bbox.is_empty());
}
