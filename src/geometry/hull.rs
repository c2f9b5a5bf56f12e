use nalgebra::Vector2;
use opencv::core::{Point2f, Vector};
use opencv::imgproc;

use crate::error::Result;

/// Hulls enclosing less area than this are treated as collinear.
const MIN_HULL_AREA: f64 = 1e-12;

/// convex_hull outlines `points` with OpenCV's `convexHull`.
///
/// # Returns
/// * `Result<Option<Vec<Vector2<f32>>>>` - `None` for fewer than three finite
///   points or when they are collinear
pub fn convex_hull(points: &[Vector2<f32>]) -> Result<Option<Vec<Vector2<f32>>>> {
    let pts: Vector<Point2f> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| Point2f::new(p.x, p.y))
        .collect();
    if pts.len() < 3 {
        return Ok(None);
    }

    let mut hull: Vector<Point2f> = Vector::new();
    imgproc::convex_hull(&pts, &mut hull, false, true)?;
    if hull.len() < 3 || imgproc::contour_area(&hull, false)? <= MIN_HULL_AREA {
        return Ok(None);
    }
    Ok(Some(hull.iter().map(|p| Vector2::new(p.x, p.y)).collect()))
}
