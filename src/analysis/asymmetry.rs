use std::collections::BTreeSet;

use nalgebra::Vector2;
use ndarray::{Array2, ArrayView1};
use serde::Serialize;
use tracing::debug;

use crate::config::config::{Config, Side};
use crate::geometry::line::Line2D;
use crate::geometry::midline::perpendicular_through;
use crate::landmarks::nodes::{self, LandmarkClass};

/// Displacement metrics for a healthy/droopy landmark pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandmarkDisplacement {
    pub healthy_index: usize,
    pub droopy_index: usize,

    pub healthy_coords: Vector2<f32>,
    pub droopy_coords: Vector2<f32>,
    pub healthy_depth: Option<f32>,
    pub droopy_depth: Option<f32>,

    pub perpendicular_line: Line2D,

    pub healthy_perp_offset: f32,
    pub droopy_perp_offset: f32,
    pub perpendicular_delta: f32,

    pub healthy_mid_offset: f32,
    pub droopy_mid_offset: f32,
    pub midline_delta: f32,

    /// Cartesian delta, +x toward the anatomical right and +y upward.
    pub x_delta: f32,
    pub y_delta: f32,
    pub weighted_delta: f32,
}

/// Offset of a landmark expected to lie on the midline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MidlineAnchorMetric {
    pub index: usize,
    pub coords: Vector2<f32>,
    pub depth: Option<f32>,
    pub perpendicular_line: Line2D,
    pub perpendicular_offset: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsymmetryMetrics {
    pub droopy_side: Side,
    pub healthy_side: Side,
    pub displacements: Vec<LandmarkDisplacement>,
    pub midline_anchors: Vec<MidlineAnchorMetric>,
}

impl AsymmetryMetrics {
    pub fn empty(droopy_side: Side) -> Self {
        AsymmetryMetrics {
            droopy_side,
            healthy_side: droopy_side.opposite(),
            displacements: vec![],
            midline_anchors: vec![],
        }
    }

    /// Mean length of the per-pair cartesian deltas; lower is more symmetric.
    pub fn symmetry_score(&self) -> Option<f32> {
        if self.displacements.is_empty() {
            return None;
        }
        let total: f32 = self
            .displacements
            .iter()
            .map(|d| (d.x_delta * d.x_delta + d.y_delta * d.y_delta).sqrt())
            .sum();
        Some(total / self.displacements.len() as f32)
    }

    /// Mean perpendicular offset of the droopy landmarks, if any were paired.
    pub fn mean_droopy_perp_offset(&self) -> Option<f32> {
        if self.displacements.is_empty() {
            return None;
        }
        let total: f32 = self.displacements.iter().map(|d| d.droopy_perp_offset).sum();
        Some(total / self.displacements.len() as f32)
    }
}

/// Landmarks analysed when no explicit selection is configured: healthy side plus midline.
pub fn default_tracked_indices(droopy_side: Side) -> Vec<usize> {
    let healthy = nodes::side_landmarks(droopy_side.opposite());
    healthy
        .union(&nodes::MIDLINE_LANDMARKS)
        .copied()
        .collect()
}

/// compute_asymmetry_metrics pairs tracked landmarks across the midline and
/// measures how far each droopy landmark sits from its healthy mirror.
///
/// # Arguments
/// * `cfg` - configuration providing the droopy side
/// * `midline` - current symmetry axis, `None` when unavailable
/// * `tracked_indices` - landmark indices selected for analysis
/// * `landmarks` - normalized landmarks, shape (N, 2) or (N, 3)
///
/// # Returns
/// * `AsymmetryMetrics` - empty lists when the midline or landmarks are missing
pub fn compute_asymmetry_metrics(
    cfg: &Config,
    midline: Option<&Line2D>,
    tracked_indices: &[usize],
    landmarks: &Array2<f32>,
) -> AsymmetryMetrics {
    let droopy_side = cfg.runtime.droopy_side;
    let healthy_side = droopy_side.opposite();

    let midline = match midline {
        Some(line) if landmarks.nrows() > 0 && landmarks.ncols() >= 2 => line,
        _ => return AsymmetryMetrics::empty(droopy_side),
    };

    let n = landmarks.nrows();
    let (mut healthy, droopy, anchors) = classify_indices(
        tracked_indices.iter().copied().filter(|&idx| idx < n),
        droopy_side,
    );

    // Every tracked droopy landmark gets compared against its healthy mirror.
    for &idx in droopy.iter() {
        if let Some(partner) = nodes::flip(idx) {
            if nodes::belongs_to_side(partner, healthy_side) {
                healthy.insert(partner);
            }
        }
    }

    let mut displacements = Vec::with_capacity(healthy.len());
    for &healthy_idx in healthy.iter() {
        let droopy_idx = match select_counterpart(healthy_idx, droopy_side) {
            Some(idx) if idx < n => idx,
            _ => continue,
        };

        let healthy_row = landmarks.row(healthy_idx);
        let droopy_row = landmarks.row(droopy_idx);
        let healthy_xy = row_xy(&healthy_row);
        let droopy_xy = row_xy(&droopy_row);

        let (healthy_mid, healthy_perp) = midline.components(&healthy_xy);
        let (droopy_mid, droopy_perp) = midline.components(&droopy_xy);

        // The droopy point is compared on the mirrored side, so a perfectly
        // reflected pair yields zero in both deltas.
        let perp_delta = healthy_perp - mirrored(droopy_perp);
        let mid_delta = healthy_mid - droopy_mid;
        let (x_delta, y_delta) = cartesian_delta(midline, mid_delta, perp_delta);

        displacements.push(LandmarkDisplacement {
            healthy_index: healthy_idx,
            droopy_index: droopy_idx,
            healthy_coords: healthy_xy,
            droopy_coords: droopy_xy,
            healthy_depth: row_depth(&healthy_row),
            droopy_depth: row_depth(&droopy_row),
            perpendicular_line: perpendicular_through(&healthy_xy, midline),
            healthy_perp_offset: healthy_perp,
            droopy_perp_offset: droopy_perp,
            perpendicular_delta: perp_delta,
            healthy_mid_offset: healthy_mid,
            droopy_mid_offset: droopy_mid,
            midline_delta: mid_delta,
            x_delta,
            y_delta,
            weighted_delta: perp_delta * mid_delta,
        });
    }

    let midline_anchors: Vec<MidlineAnchorMetric> = anchors
        .iter()
        .map(|&idx| {
            let row = landmarks.row(idx);
            let xy = row_xy(&row);
            let (_, perp) = midline.components(&xy);
            MidlineAnchorMetric {
                index: idx,
                coords: xy,
                depth: row_depth(&row),
                perpendicular_line: perpendicular_through(&xy, midline),
                perpendicular_offset: perp,
            }
        })
        .collect();

    debug!(
        pairs = displacements.len(),
        anchors = midline_anchors.len(),
        droopy = droopy_side.as_str(),
        "computed asymmetry metrics"
    );

    AsymmetryMetrics {
        droopy_side,
        healthy_side,
        displacements,
        midline_anchors,
    }
}

/// Splits indices into (healthy, droopy, midline) buckets, each ordered ascending.
fn classify_indices(
    indices: impl Iterator<Item = usize>,
    droopy_side: Side,
) -> (BTreeSet<usize>, BTreeSet<usize>, BTreeSet<usize>) {
    let mut healthy = BTreeSet::new();
    let mut droopy = BTreeSet::new();
    let mut midline = BTreeSet::new();

    for idx in indices {
        match (nodes::classify(idx), droopy_side) {
            (LandmarkClass::Left, Side::Left) | (LandmarkClass::Right, Side::Right) => {
                droopy.insert(idx);
            }
            (LandmarkClass::Left, Side::Right) | (LandmarkClass::Right, Side::Left) => {
                healthy.insert(idx);
            }
            // Unlisted indices fall back to midline anchors.
            (LandmarkClass::Midline, _) | (LandmarkClass::Unlisted, _) => {
                midline.insert(idx);
            }
        }
    }

    (healthy, droopy, midline)
}

fn select_counterpart(healthy_index: usize, droopy_side: Side) -> Option<usize> {
    let counterpart = nodes::flip(healthy_index)?;
    if nodes::belongs_to_side(counterpart, droopy_side) {
        return Some(counterpart);
    }
    if nodes::belongs_to_side(healthy_index, droopy_side) {
        return Some(healthy_index);
    }
    None
}

fn mirrored(perp_offset: f32) -> f32 {
    -perp_offset
}

fn cartesian_delta(midline: &Line2D, mid_delta: f32, perp_delta: f32) -> (f32, f32) {
    let delta = midline.direction * mid_delta + midline.normal() * perp_delta;
    // screen y grows downward
    (delta.x, -delta.y)
}

fn row_xy(row: &ArrayView1<f32>) -> Vector2<f32> {
    Vector2::new(row[0], row[1])
}

fn row_depth(row: &ArrayView1<f32>) -> Option<f32> {
    if row.len() >= 3 {
        Some(row[2])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::midline::{midsagittal_line, MIDLINE_ANCHORS};
    use ndarray::Array2;

    /// A face mirrored exactly about x = 0.5; the droopy side is offset by `shift`.
    fn mirrored_face(shift: (f32, f32)) -> Array2<f32> {
        let mut landmarks = Array2::<f32>::zeros((478, 3));
        for (i, &index) in MIDLINE_ANCHORS.iter().enumerate() {
            landmarks[[index, 0]] = 0.5;
            landmarks[[index, 1]] = 0.1 + 0.25 * i as f32;
        }
        for (k, &(left, right)) in nodes::LEFT_RIGHT_PAIRS.iter().enumerate() {
            let x = 0.1 + 0.3 * ((k * 7) % 13) as f32 / 13.0;
            let y = 0.1 + 0.8 * ((k * 5) % 17) as f32 / 17.0;
            landmarks[[right, 0]] = x;
            landmarks[[right, 1]] = y;
            landmarks[[left, 0]] = 1.0 - x + shift.0;
            landmarks[[left, 1]] = y + shift.1;
            landmarks[[left, 2]] = 0.01;
        }
        landmarks
    }

    #[test]
    fn test_symmetric_face_has_zero_deltas() {
        let cfg = Config::new();
        let landmarks = mirrored_face((0.0, 0.0));
        let midline = midsagittal_line(&landmarks).unwrap();
        let tracked = default_tracked_indices(cfg.runtime.droopy_side);
        let metrics = compute_asymmetry_metrics(&cfg, Some(&midline), &tracked, &landmarks);

        assert_eq!(metrics.displacements.len(), nodes::LEFT_RIGHT_PAIRS.len());
        for d in metrics.displacements.iter() {
            assert!(d.perpendicular_delta.abs() < 1e-5, "perp delta {}", d.perpendicular_delta);
            assert!(d.midline_delta.abs() < 1e-5, "midline delta {}", d.midline_delta);
            assert!(d.healthy_perp_offset * d.droopy_perp_offset <= 0.0);
        }
        assert!(metrics.symmetry_score().unwrap() < 1e-5);
    }

    #[test]
    fn test_tilted_symmetric_face_has_zero_deltas() {
        let cfg = Config::new();
        let mut landmarks = mirrored_face((0.0, 0.0));
        let (sin, cos) = 0.35f32.sin_cos();
        for mut row in landmarks.rows_mut() {
            let (dx, dy) = (row[0] - 0.5, row[1] - 0.5);
            row[0] = 0.5 + cos * dx - sin * dy;
            row[1] = 0.5 + sin * dx + cos * dy;
        }

        let midline = midsagittal_line(&landmarks).unwrap();
        assert!(midline.direction.x.abs() > 0.3, "midline should follow the tilt");
        let tracked = default_tracked_indices(cfg.runtime.droopy_side);
        let metrics = compute_asymmetry_metrics(&cfg, Some(&midline), &tracked, &landmarks);

        assert_eq!(metrics.displacements.len(), nodes::LEFT_RIGHT_PAIRS.len());
        for d in metrics.displacements.iter() {
            assert!(d.perpendicular_delta.abs() < 1e-5, "perp delta {}", d.perpendicular_delta);
            assert!(d.midline_delta.abs() < 1e-5, "midline delta {}", d.midline_delta);
        }
        assert!(metrics.symmetry_score().unwrap() < 1e-5);
    }

    #[test]
    fn test_sorted_and_paired() {
        let cfg = Config::new();
        let landmarks = mirrored_face((0.0, 0.02));
        let midline = midsagittal_line(&landmarks).unwrap();
        let tracked = default_tracked_indices(cfg.runtime.droopy_side);
        let metrics = compute_asymmetry_metrics(&cfg, Some(&midline), &tracked, &landmarks);

        assert_eq!(metrics.droopy_side, Side::Left);
        assert_eq!(metrics.healthy_side, Side::Right);
        let healthy: Vec<usize> = metrics.displacements.iter().map(|d| d.healthy_index).collect();
        let mut sorted = healthy.clone();
        sorted.sort_unstable();
        assert_eq!(healthy, sorted);

        for d in metrics.displacements.iter() {
            assert_eq!(nodes::flip(d.healthy_index), Some(d.droopy_index));
            assert!(d.perpendicular_delta.abs() < 1e-5);
            assert!((d.midline_delta + 0.02).abs() < 1e-5);
            assert!((d.y_delta - 0.02).abs() < 1e-5);
            assert_eq!(d.droopy_depth, Some(0.01));
            assert!((d.weighted_delta - d.perpendicular_delta * d.midline_delta).abs() < 1e-9);
        }
        assert_eq!(metrics.midline_anchors.len(), nodes::MIDLINE_INDICES.len());
    }

    #[test]
    fn test_droopy_only_selection_pulls_in_healthy_partner() {
        let cfg = Config::new();
        let landmarks = mirrored_face((0.0, 0.0));
        let midline = midsagittal_line(&landmarks).unwrap();
        let metrics = compute_asymmetry_metrics(&cfg, Some(&midline), &[33], &landmarks);
        assert_eq!(metrics.displacements.len(), 1);
        assert_eq!(metrics.displacements[0].healthy_index, 263);
        assert_eq!(metrics.displacements[0].droopy_index, 33);
    }

    #[test]
    fn test_unlisted_and_out_of_range_indices() {
        let cfg = Config::new();
        let landmarks = mirrored_face((0.0, 0.0));
        let midline = midsagittal_line(&landmarks).unwrap();
        let metrics = compute_asymmetry_metrics(&cfg, Some(&midline), &[468, 9999], &landmarks);
        assert!(metrics.displacements.is_empty());
        assert_eq!(metrics.midline_anchors.len(), 1);
        assert_eq!(metrics.midline_anchors[0].index, 468);
    }

    #[test]
    fn test_missing_midline_keeps_side_labels() {
        let mut cfg = Config::new();
        cfg.runtime.droopy_side = Side::Right;
        let landmarks = mirrored_face((0.0, 0.0));
        let metrics = compute_asymmetry_metrics(&cfg, None, &[33, 263], &landmarks);
        assert_eq!(metrics.droopy_side, Side::Right);
        assert_eq!(metrics.healthy_side, Side::Left);
        assert!(metrics.displacements.is_empty());
        assert!(metrics.midline_anchors.is_empty());
        assert!(metrics.symmetry_score().is_none());
    }
}
