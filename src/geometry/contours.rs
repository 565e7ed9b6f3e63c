use std::collections::{HashMap, VecDeque};

use crate::{
    foundation::core::{Contour, Point},
    imaging::layers::Matte,
};

/// Coverage level traced by [`extract_contours`].
pub const ISO_LEVEL: f64 = 0.5;

/// `(row, col)` position on the sample grid.
type GridPoint = (f64, f64);

/// Closed sub-pixel contours of `matte` at [`ISO_LEVEL`].
///
/// The matte is zero-padded by one pixel so shapes touching the frame still close.
/// Returns `None` for an all-zero matte and `Some(vec![])` when coverage exists but
/// never exceeds the level. Points are `(x, y)` in matte pixel coordinates, each
/// contour repeats its first vertex at the end, and outer boundaries wind with
/// positive [`signed_area`].
pub fn extract_contours(matte: &Matte) -> Option<Vec<Contour>> {
    if matte.is_zero() {
        return None;
    }

    let (w, h) = (matte.width as usize, matte.height as usize);
    let (rows, cols) = (h + 2, w + 2);
    let mut padded = vec![0.0f64; rows * cols];
    for (y, row) in matte.data.chunks_exact(w.max(1)).take(h).enumerate() {
        for (x, v) in row.iter().enumerate() {
            padded[(y + 1) * cols + x + 1] = f64::from(*v);
        }
    }

    let contours = trace_level(&padded, rows, cols, ISO_LEVEL)
        .into_iter()
        .map(|line| {
            line.into_iter()
                .rev()
                .map(|(r, c)| Point::new(c - 1.0, r - 1.0))
                .collect()
        })
        .collect();
    Some(contours)
}

/// Signed area term `sum((x2 - x1) * (y2 + y1))` over the closed vertex cycle.
///
/// Positive when the vertices run counter-clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            (b.x - a.x) * (b.y + a.y)
        })
        .sum()
}

/// Whether `contour` winds counter-clockwise.
pub fn ccw(contour: &Contour) -> bool {
    signed_area(contour.points()) > 0.0
}

/// Marching squares over a row-major `rows x cols` grid, assembled into polylines.
///
/// Saddles use low connectivity. Polylines come out in order of their first segment.
pub(crate) fn trace_level(
    values: &[f64],
    rows: usize,
    cols: usize,
    level: f64,
) -> Vec<Vec<GridPoint>> {
    assemble(square_segments(values, rows, cols, level))
}

fn fraction(from: f64, to: f64, level: f64) -> f64 {
    if to == from {
        0.0
    } else {
        (level - from) / (to - from)
    }
}

fn square_segments(
    values: &[f64],
    rows: usize,
    cols: usize,
    level: f64,
) -> Vec<(GridPoint, GridPoint)> {
    let at = |r: usize, c: usize| values[r * cols + c];
    let mut segments = Vec::new();
    for r0 in 0..rows.saturating_sub(1) {
        for c0 in 0..cols.saturating_sub(1) {
            let (r1, c1) = (r0 + 1, c0 + 1);
            let (ul, ur, ll, lr) = (at(r0, c0), at(r0, c1), at(r1, c0), at(r1, c1));

            let case = u8::from(ul > level)
                | u8::from(ur > level) << 1
                | u8::from(ll > level) << 2
                | u8::from(lr > level) << 3;
            if case == 0 || case == 15 {
                continue;
            }

            let (rf, cf) = (r0 as f64, c0 as f64);
            let top = (rf, cf + fraction(ul, ur, level));
            let bottom = (rf + 1.0, cf + fraction(ll, lr, level));
            let left = (rf + fraction(ul, ll, level), cf);
            let right = (rf + fraction(ur, lr, level), cf + 1.0);

            match case {
                1 => segments.push((top, left)),
                2 => segments.push((right, top)),
                3 => segments.push((right, left)),
                4 => segments.push((left, bottom)),
                5 => segments.push((top, bottom)),
                6 => {
                    segments.push((right, top));
                    segments.push((left, bottom));
                }
                7 => segments.push((right, bottom)),
                8 => segments.push((bottom, right)),
                9 => {
                    segments.push((top, left));
                    segments.push((bottom, right));
                }
                10 => segments.push((bottom, top)),
                11 => segments.push((bottom, left)),
                12 => segments.push((left, right)),
                13 => segments.push((top, right)),
                14 => segments.push((left, top)),
                _ => unreachable!("square case is a 4-bit mask"),
            }
        }
    }
    segments
}

type Key = (u64, u64);

fn key(p: GridPoint) -> Key {
    ((p.0 + 0.0).to_bits(), (p.1 + 0.0).to_bits())
}

/// Chain directed segments into polylines by matching endpoints exactly.
fn assemble(segments: Vec<(GridPoint, GridPoint)>) -> Vec<Vec<GridPoint>> {
    let mut lines: Vec<Option<VecDeque<GridPoint>>> = Vec::new();
    let mut starts: HashMap<Key, usize> = HashMap::new();
    let mut ends: HashMap<Key, usize> = HashMap::new();

    for (from, to) in segments {
        if key(from) == key(to) {
            continue;
        }
        let tail = starts.remove(&key(to));
        let head = ends.remove(&key(from));

        match (tail, head) {
            (Some(t), Some(h)) if t == h => {
                if let Some(line) = lines[h].as_mut() {
                    line.push_back(to);
                }
            }
            (Some(t), Some(h)) => {
                let (keep, gone) = if t > h { (h, t) } else { (t, h) };
                let Some(moved) = lines[gone].take() else {
                    continue;
                };
                let Some(line) = lines[keep].as_mut() else {
                    continue;
                };
                if t > h {
                    line.extend(moved);
                } else {
                    for p in moved.into_iter().rev() {
                        line.push_front(p);
                    }
                }
                if let (Some(&first), Some(&last)) = (line.front(), line.back()) {
                    starts.insert(key(first), keep);
                    ends.insert(key(last), keep);
                }
            }
            (None, None) => {
                let idx = lines.len();
                lines.push(Some(VecDeque::from([from, to])));
                starts.insert(key(from), idx);
                ends.insert(key(to), idx);
            }
            (Some(t), None) => {
                if let Some(line) = lines[t].as_mut() {
                    line.push_front(from);
                }
                starts.insert(key(from), t);
            }
            (None, Some(h)) => {
                if let Some(line) = lines[h].as_mut() {
                    line.push_back(to);
                }
                ends.insert(key(to), h);
            }
        }
    }

    lines
        .into_iter()
        .flatten()
        .map(|line| line.into_iter().collect())
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/contours.rs"]
mod tests;
