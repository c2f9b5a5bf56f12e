use std::collections::HashMap;

use ndarray::{array, concatenate, s, Array2, ArrayView2, Axis};
use opencv::core::{Point2f, Rect, Vec6f, Vector};
use opencv::imgproc::Subdiv2D;
use opencv::prelude::*;
use tracing::debug;

use crate::error::{Result, SymmetryError};

/// Normalized coordinates are scaled up before triangulation so Subdiv2D's
/// float tolerances stay well below the landmark spacing.
const TRIANGULATION_SCALE: f32 = 1000.0;

/// Topology for piecewise-affine warping: rows of three point indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleMesh {
    triangles: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Wraps explicit triangles, checking each row against `num_points`.
    pub fn new(triangles: Vec<[usize; 3]>, num_points: usize) -> Result<Self> {
        for tri in triangles.iter() {
            if tri.iter().any(|&idx| idx >= num_points) {
                return Err(SymmetryError::invalid(format!(
                    "triangle {tri:?} references a point outside 0..{num_points}"
                )));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(SymmetryError::invalid(format!(
                    "triangle {tri:?} repeats a vertex"
                )));
            }
        }
        Ok(TriangleMesh { triangles })
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize; 3]> {
        self.triangles.iter()
    }

    /// Largest point index referenced, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.triangles.iter().flat_map(|t| t.iter().copied()).max()
    }
}

pub(crate) fn validate_points(points: &ArrayView2<f32>, what: &str) -> Result<()> {
    if points.ncols() != 2 {
        return Err(SymmetryError::invalid(format!(
            "{what} must be an (N, 2) array, got {:?}",
            points.dim()
        )));
    }
    if points.nrows() < 3 {
        return Err(SymmetryError::invalid(format!(
            "at least three points are required, got {}",
            points.nrows()
        )));
    }
    if points.iter().any(|v| !v.is_finite()) {
        return Err(SymmetryError::invalid(format!("{what} contains non-finite values")));
    }
    Ok(())
}

/// build_mesh constructs a planar Delaunay triangulation over `points`.
///
/// # Arguments
/// * `points` - (N, 2) array of normalized coordinates, N >= 3
///
/// # Returns
/// * `Result<TriangleMesh>` - every row references three distinct indices into `points`
pub fn build_mesh(points: &Array2<f32>) -> Result<TriangleMesh> {
    let view = points.view();
    validate_points(&view, "points")?;

    let scaled: Vec<Point2f> = view
        .rows()
        .into_iter()
        .map(|row| Point2f::new(row[0] * TRIANGULATION_SCALE, row[1] * TRIANGULATION_SCALE))
        .collect();

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in scaled.iter() {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let margin = 10;
    let rect = Rect::new(
        min_x.floor() as i32 - margin,
        min_y.floor() as i32 - margin,
        (max_x - min_x).ceil() as i32 + 2 * margin + 1,
        (max_y - min_y).ceil() as i32 + 2 * margin + 1,
    );

    let mut subdiv = Subdiv2D::new(rect)?;
    // Duplicate points collapse onto the first index that inserted them.
    let mut lookup: HashMap<(u32, u32), usize> = HashMap::with_capacity(scaled.len());
    for (idx, p) in scaled.iter().enumerate() {
        subdiv.insert(*p)?;
        lookup.entry((p.x.to_bits(), p.y.to_bits())).or_insert(idx);
    }

    let mut raw: Vector<Vec6f> = Vector::new();
    subdiv.get_triangle_list(&mut raw)?;

    let mut triangles = Vec::with_capacity(raw.len());
    for tri in raw.iter() {
        let mut ids = [0usize; 3];
        for (k, id) in ids.iter_mut().enumerate() {
            let vertex = Point2f::new(tri[2 * k], tri[2 * k + 1]);
            *id = match lookup.get(&(vertex.x.to_bits(), vertex.y.to_bits())) {
                Some(&idx) => idx,
                None => nearest_point(&scaled, &vertex),
            };
        }
        if ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2] {
            triangles.push(ids);
        }
    }

    if triangles.is_empty() {
        return Err(SymmetryError::invalid(
            "points are collinear, no triangle could be formed",
        ));
    }

    debug!(points = scaled.len(), triangles = triangles.len(), "built delaunay mesh");
    TriangleMesh::new(triangles, scaled.len())
}

fn nearest_point(points: &[Point2f], target: &Point2f) -> usize {
    points
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let dx = p.x - target.x;
            let dy = p.y - target.y;
            (idx, dx * dx + dy * dy)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// augment_with_boundary appends eight frame anchors (corners and edge
/// midpoints of the unit square, pushed outward by `padding`) after `points`.
///
/// Only the xy columns of `points` are kept.
pub fn augment_with_boundary(points: &Array2<f32>, padding: f32) -> Result<Array2<f32>> {
    if points.ncols() < 2 {
        return Err(SymmetryError::invalid(format!(
            "points must have at least two columns, got {:?}",
            points.dim()
        )));
    }
    let lo = -padding;
    let hi = 1.0 + padding;
    let anchors: Array2<f32> = array![
        [lo, lo],
        [hi, lo],
        [lo, hi],
        [hi, hi],
        [0.5, lo],
        [0.5, hi],
        [lo, 0.5],
        [hi, 0.5],
    ];
    let xy = points.slice(s![.., 0..2]);
    Ok(concatenate(Axis(0), &[xy, anchors.view()])?)
}

/// Number of anchors [`augment_with_boundary`] appends.
pub const BOUNDARY_ANCHORS: usize = 8;
