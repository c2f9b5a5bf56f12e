use nalgebra::Vector2;
use ndarray::{Array2, Axis};
use tracing::debug;

use crate::config::config::{RegionNode, Side};
use crate::error::{Result, SymmetryError};
use crate::geometry::hull::convex_hull;
use crate::geometry::line::Line2D;
use crate::landmarks::nodes;
use crate::warp::mesh::augment_with_boundary;

/// Source and destination points for one warp, in the warp engine's
/// y-up normalized space, boundary anchors included.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpTargets {
    pub src: Array2<f32>,
    pub dst: Array2<f32>,
    /// Landmarks whose destination differs from their source.
    pub moved: usize,
}

/// build_warp_targets maps every droopy landmark onto its healthy partner
/// reflected across the midline. Healthy, midline and boundary points stay put.
///
/// # Arguments
/// * `landmarks` - tracker landmarks (y = 0 at the top), shape (N, 2) or (N, 3)
/// * `midline` - symmetry axis in the same space as `landmarks`
/// * `droopy_side` - side to be corrected
/// * `padding` - boundary anchor padding, see [`augment_with_boundary`]
///
/// # Returns
/// * `Result<WarpTargets>` - points converted to y-up space
pub fn build_warp_targets(
    landmarks: &Array2<f32>,
    midline: &Line2D,
    droopy_side: Side,
    padding: f32,
) -> Result<WarpTargets> {
    if landmarks.ncols() < 2 || landmarks.nrows() < 3 {
        return Err(SymmetryError::invalid(format!(
            "warp targets need at least three 2D landmarks, got {:?}",
            landmarks.dim()
        )));
    }

    let n = landmarks.nrows();
    let mut targets = landmarks.clone();
    let mut moved = 0usize;
    for idx in 0..n {
        if !nodes::belongs_to_side(idx, droopy_side) {
            continue;
        }
        let partner = match nodes::flip(idx) {
            Some(partner) if partner < n => partner,
            _ => continue,
        };
        let healthy = Vector2::new(landmarks[[partner, 0]], landmarks[[partner, 1]]);
        let target = midline.reflect(&healthy);
        targets[[idx, 0]] = target.x;
        targets[[idx, 1]] = target.y;
        moved += 1;
    }

    let mut src = augment_with_boundary(landmarks, padding)?;
    let mut dst = augment_with_boundary(&targets, padding)?;
    flip_y(&mut src);
    flip_y(&mut dst);

    debug!(moved, points = src.nrows(), "built warp targets");
    Ok(WarpTargets { src, dst, moved })
}

/// Tracker y-down coordinates to the warp engine's y-up convention, in place.
pub fn flip_y(points: &mut Array2<f32>) {
    points.column_mut(1).mapv_inplace(|y| 1.0 - y);
}

/// Mirrors landmark x coordinates (`1 - x`) for a horizontally flipped frame.
pub fn mirror_x(landmarks: &Array2<f32>) -> Array2<f32> {
    let mut mirrored = landmarks.clone();
    if mirrored.ncols() > 0 {
        mirrored.column_mut(0).mapv_inplace(|x| 1.0 - x);
    }
    mirrored
}

/// A resolved overlay region: display name and sorted landmark indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionGroup {
    pub name: String,
    pub indices: Vec<usize>,
}

/// resolve_region_groups turns configured region nodes into index lists.
/// Unknown tree paths and groups with fewer than three landmarks are dropped;
/// with `hflip` every index is swapped for its mirror partner.
pub fn resolve_region_groups(region_nodes: &[RegionNode], hflip: bool) -> Vec<RegionGroup> {
    let mut groups = Vec::with_capacity(region_nodes.len());
    for node in region_nodes.iter() {
        let (name, mut indices) = match node {
            RegionNode::Named { name, indices } => (name.clone(), indices.clone()),
            RegionNode::Path(path) => {
                let path: Vec<&str> = match path.split_first() {
                    Some((first, rest)) if first == "face" => rest.iter().map(String::as_str).collect(),
                    _ => path.iter().map(String::as_str).collect(),
                };
                if path.is_empty() {
                    continue;
                }
                match nodes::group_indices(&path[..]) {
                    Some(indices) => (format!("face/{}", path.join("/")), indices.iter().copied().collect()),
                    None => {
                        debug!(path = %path.join("/"), "unknown region path");
                        continue;
                    }
                }
            }
        };

        if hflip {
            indices = indices.into_iter().map(nodes::flip_or_self).collect();
        }
        indices.sort_unstable();
        indices.dedup();

        if indices.len() < 3 {
            continue;
        }
        groups.push(RegionGroup { name, indices });
    }
    groups
}

/// Convex outline of the group's landmarks; out-of-range indices are skipped.
pub fn region_polygon(group: &RegionGroup, landmarks: &Array2<f32>) -> Result<Option<Vec<Vector2<f32>>>> {
    if landmarks.ncols() < 2 {
        return Ok(None);
    }
    let points: Vec<Vector2<f32>> = group
        .indices
        .iter()
        .filter(|&&idx| idx < landmarks.nrows())
        .map(|&idx| {
            let row = landmarks.index_axis(Axis(0), idx);
            Vector2::new(row[0], row[1])
        })
        .collect();
    convex_hull(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::mesh::BOUNDARY_ANCHORS;

    fn face() -> Array2<f32> {
        let mut landmarks = Array2::<f32>::from_elem((478, 3), 0.5);
        for (k, &(left, right)) in nodes::LEFT_RIGHT_PAIRS.iter().enumerate() {
            let y = 0.2 + 0.6 * (k % 10) as f32 / 10.0;
            landmarks[[right, 0]] = 0.3;
            landmarks[[right, 1]] = y;
            // droopy side sags by 0.05
            landmarks[[left, 0]] = 0.7;
            landmarks[[left, 1]] = y + 0.05;
        }
        landmarks
    }

    #[test]
    fn test_droopy_landmarks_move_to_reflected_partner() {
        let landmarks = face();
        let midline = Line2D::new(Vector2::new(0.5, 0.5), Vector2::new(0.0, 1.0)).unwrap();
        let targets = build_warp_targets(&landmarks, &midline, Side::Left, 0.02).unwrap();

        assert_eq!(targets.src.dim(), (478 + BOUNDARY_ANCHORS, 2));
        assert_eq!(targets.dst.dim(), targets.src.dim());
        assert_eq!(targets.moved, nodes::LEFT_RIGHT_PAIRS.len());

        let (left, right) = nodes::LEFT_RIGHT_PAIRS[0];
        // left moves onto the mirrored right point, y flipped
        assert!((targets.dst[[left, 0]] - 0.7).abs() < 1e-6);
        assert!((targets.dst[[left, 1]] - (1.0 - landmarks[[right, 1]])).abs() < 1e-6);
        assert!((targets.src[[left, 1]] - (1.0 - landmarks[[left, 1]])).abs() < 1e-6);
        // healthy side and anchors stay put
        assert_eq!(targets.src.row(right), targets.dst.row(right));
        for k in 478..478 + BOUNDARY_ANCHORS {
            assert_eq!(targets.src.row(k), targets.dst.row(k));
        }
    }

    #[test]
    fn test_too_few_landmarks() {
        let midline = Line2D::new(Vector2::new(0.5, 0.5), Vector2::new(0.0, 1.0)).unwrap();
        assert!(build_warp_targets(&Array2::zeros((2, 2)), &midline, Side::Left, 0.02).is_err());
    }

    #[test]
    fn test_mirror_x() {
        let mirrored = mirror_x(&ndarray::array![[0.2, 0.3, 0.1]]);
        assert!((mirrored[[0, 0]] - 0.8).abs() < 1e-6);
        assert_eq!(mirrored[[0, 1]], 0.3);
        assert_eq!(mirrored[[0, 2]], 0.1);
    }

    #[test]
    fn test_resolve_region_groups() {
        let region_nodes = vec![
            RegionNode::Path(vec!["face".into(), "eyes".into(), "left".into()]),
            RegionNode::Path(vec!["face".into(), "nowhere".into()]),
            RegionNode::Named {
                name: "tiny".into(),
                indices: vec![1, 2],
            },
            RegionNode::Named {
                name: "pair".into(),
                indices: vec![33, 133, 159],
            },
        ];
        let groups = resolve_region_groups(&region_nodes, false);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "face/eyes/left");
        assert_eq!(groups[1].indices, vec![33, 133, 159]);

        let flipped = resolve_region_groups(&region_nodes[3..], true);
        let expected: Vec<usize> = {
            let mut v: Vec<usize> = [33, 133, 159].iter().map(|&i| nodes::flip_or_self(i)).collect();
            v.sort_unstable();
            v
        };
        assert_eq!(flipped[0].indices, expected);
    }

    #[test]
    fn test_region_polygon_skips_out_of_range() {
        let landmarks = ndarray::array![[0.1, 0.1], [0.9, 0.1], [0.5, 0.9], [0.5, 0.4]];
        let group = RegionGroup {
            name: "test".into(),
            indices: vec![0, 1, 2, 3, 900],
        };
        let hull = region_polygon(&group, &landmarks).unwrap().unwrap();
        assert_eq!(hull.len(), 3);
        assert!(!hull.contains(&Vector2::new(0.5, 0.4)));
    }
}
