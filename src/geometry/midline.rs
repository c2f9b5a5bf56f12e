use nalgebra::{Matrix4x2, Vector2};
use ndarray::Array2;
use tracing::debug;

use crate::geometry::line::Line2D;

/// Anchor landmarks for the symmetry axis: chin tip, nose tip, glabella, forehead.
pub const MIDLINE_ANCHORS: [usize; 4] = [152, 1, 168, 10];

/// xy position of landmark `index`, if present.
pub fn landmark_xy(landmarks: &Array2<f32>, index: usize) -> Option<Vector2<f32>> {
    if index >= landmarks.nrows() || landmarks.ncols() < 2 {
        return None;
    }
    Some(Vector2::new(landmarks[[index, 0]], landmarks[[index, 1]]))
}

/// midsagittal_line fits the face symmetry axis through the four anchor landmarks.
///
/// The direction is the first principal axis of the centred anchors, oriented so
/// its y component is non-negative. The origin is the anchor centroid.
///
/// # Arguments
/// * `landmarks` - Landmark set of shape (N, 2) or (N, 3)
///
/// # Returns
/// * `Option<Line2D>` - `None` when landmarks are missing or degenerate
pub fn midsagittal_line(landmarks: &Array2<f32>) -> Option<Line2D> {
    if landmarks.nrows() == 0 {
        return None;
    }

    let mut anchors = [Vector2::zeros(); 4];
    for (slot, &index) in anchors.iter_mut().zip(MIDLINE_ANCHORS.iter()) {
        *slot = landmark_xy(landmarks, index)?;
    }

    let centroid = anchors.iter().fold(Vector2::zeros(), |acc, p| acc + p) / 4.0;
    let centered = Matrix4x2::from_fn(|r, c| anchors[r][c] - centroid[c]);

    let svd = centered.svd(false, true);
    let v_t = svd.v_t?;
    let principal = svd
        .singular_values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(*b))
        .map(|(idx, _)| idx)?;

    let mut direction = Vector2::new(v_t[(principal, 0)], v_t[(principal, 1)]);
    if direction.y < 0.0 {
        direction = -direction;
    }

    let line = Line2D::new(centroid, direction);
    if line.is_none() {
        debug!("midline anchors are degenerate");
    }
    line
}

/// Line through `point` perpendicular to `midline` (direction rotated by +90 degrees).
pub fn perpendicular_through(point: &Vector2<f32>, midline: &Line2D) -> Line2D {
    let d = midline.direction;
    Line2D {
        origin: *point,
        direction: Vector2::new(-d.y, d.x),
    }
}
