use ndarray::Array2;
use opencv::core::{self, Mat, Point, Point2f, Scalar, Vector, BORDER_REFLECT_101, CV_32F, CV_32FC1, CV_8UC1};
use opencv::imgproc::{self, INTER_LINEAR, LINE_8, THRESH_TRUNC};
use opencv::prelude::*;
use tracing::debug;

use crate::config::config::WarpMethod;
use crate::error::{Result, SymmetryError};
use crate::warp::blend::{blend_with_mask, expand_channels, BlendParams};
use crate::warp::mesh::{build_mesh, validate_points, TriangleMesh};

/// Lower bound on accumulated coverage before division.
const WEIGHT_EPSILON: f64 = 1e-6;

/// Triangles with a smaller pixel area are skipped.
const DEGENERATE_AREA: f32 = 1e-3;

/// warp_face moves `src_points` onto `dst_points` with a piecewise-affine
/// warp and feathers the result back into `frame`.
///
/// Points are normalized with y = 0 at the bottom of the frame.
///
/// # Arguments
/// * `frame` - input image, any depth and channel count OpenCV can warp
/// * `src_points` - (N, 2) source positions, N >= 3
/// * `dst_points` - (N, 2) destination positions matching `src_points`
/// * `mesh` - triangulation over the points, built from `src_points` when `None`
/// * `method` - warp method, only `WarpMethod::Delaunay` is implemented
/// * `blend_params` - feather settings for the final composite
///
/// # Returns
/// * `Result<Mat>` - warped frame with the type of `frame`
pub fn warp_face(
    frame: &Mat,
    src_points: &Array2<f32>,
    dst_points: &Array2<f32>,
    mesh: Option<&TriangleMesh>,
    method: WarpMethod,
    blend_params: &BlendParams,
) -> Result<Mat> {
    if frame.empty() {
        return Err(SymmetryError::invalid("frame is empty"));
    }
    if src_points.dim() != dst_points.dim() {
        return Err(SymmetryError::invalid(format!(
            "source and destination points differ in shape: {:?} vs {:?}",
            src_points.dim(),
            dst_points.dim()
        )));
    }
    validate_points(&src_points.view(), "source points")?;
    validate_points(&dst_points.view(), "destination points")?;

    if method != WarpMethod::Delaunay {
        return Err(SymmetryError::NotImplemented(format!(
            "{} warping",
            method.as_str()
        )));
    }

    let size = frame.size()?;
    let src_px = to_pixels(src_points, size.width, size.height);
    let dst_px = to_pixels(dst_points, size.width, size.height);

    let built;
    let mesh = match mesh {
        Some(mesh) => {
            if let Some(max) = mesh.max_index() {
                if max >= src_points.nrows() {
                    return Err(SymmetryError::invalid(format!(
                        "mesh references point {max} but only {} were given",
                        src_points.nrows()
                    )));
                }
            }
            mesh
        }
        None => {
            built = build_mesh(src_points)?;
            &built
        }
    };

    let (warped, mask) = piecewise_affine_warp(frame, &src_px, &dst_px, mesh)?;
    blend_with_mask(frame, &warped, &mask, blend_params)
}

/// piecewise_affine_warp warps the full frame once per triangle and keeps
/// each result only inside the destination triangle.
///
/// # Returns
/// * `Result<(Mat, Mat)>` - coverage-averaged frame (32-bit float, same
///   channels as `frame`) and the coverage mask clamped to [0, 1]
pub fn piecewise_affine_warp(
    frame: &Mat,
    src_pixels: &[Point2f],
    dst_pixels: &[Point2f],
    mesh: &TriangleMesh,
) -> Result<(Mat, Mat)> {
    if src_pixels.len() != dst_pixels.len() {
        return Err(SymmetryError::invalid(format!(
            "pixel correspondences differ in length: {} vs {}",
            src_pixels.len(),
            dst_pixels.len()
        )));
    }
    if let Some(max) = mesh.max_index() {
        if max >= src_pixels.len() {
            return Err(SymmetryError::invalid(format!(
                "mesh references point {max} but only {} were given",
                src_pixels.len()
            )));
        }
    }

    let size = frame.size()?;
    let channels = frame.channels();

    let mut frame_f = Mat::default();
    frame.convert_to(&mut frame_f, CV_32F, 1.0, 0.0)?;

    let mut accumulator = Mat::new_rows_cols_with_default(
        size.height,
        size.width,
        frame_f.typ(),
        Scalar::all(0.0),
    )?;
    let mut weight = Mat::new_rows_cols_with_default(size.height, size.width, CV_32FC1, Scalar::all(0.0))?;
    let ones = Mat::new_rows_cols_with_default(size.height, size.width, CV_32FC1, Scalar::all(1.0))?;

    let mut skipped = 0usize;
    for tri in mesh.iter() {
        let src_tri: Vector<Point2f> = tri.iter().map(|&idx| src_pixels[idx]).collect();
        let dst_tri: Vector<Point2f> = tri.iter().map(|&idx| dst_pixels[idx]).collect();

        if triangle_area(&src_tri) < DEGENERATE_AREA || triangle_area(&dst_tri) < DEGENERATE_AREA {
            skipped += 1;
            continue;
        }

        let warp_mat = imgproc::get_affine_transform(&src_tri, &dst_tri)?;
        let mut warped_full = Mat::default();
        imgproc::warp_affine(
            &frame_f,
            &mut warped_full,
            &warp_mat,
            size,
            INTER_LINEAR,
            BORDER_REFLECT_101,
            Scalar::default(),
        )?;

        let mut tri_mask = Mat::new_rows_cols_with_default(size.height, size.width, CV_8UC1, Scalar::all(0.0))?;
        let polygon: Vector<Point> = dst_tri
            .iter()
            .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        imgproc::fill_convex_poly(&mut tri_mask, &polygon, Scalar::all(255.0), LINE_8, 0)?;

        imgproc::accumulate(&warped_full, &mut accumulator, &tri_mask)?;
        imgproc::accumulate(&ones, &mut weight, &tri_mask)?;
    }

    if skipped > 0 {
        debug!(skipped, triangles = mesh.len(), "skipped degenerate triangles");
    }

    let mut safe_weight = Mat::default();
    core::max(&weight, &Scalar::all(WEIGHT_EPSILON), &mut safe_weight)?;
    let safe_weight = expand_channels(&safe_weight, channels)?;

    let mut warped = Mat::default();
    core::divide2(&accumulator, &safe_weight, &mut warped, 1.0, -1)?;

    let mut mask = Mat::default();
    imgproc::threshold(&weight, &mut mask, 1.0, 1.0, THRESH_TRUNC)?;

    Ok((warped, mask))
}

/// Normalized (x, y-up) points to pixel positions, row 0 at the top.
pub fn to_pixels(points: &Array2<f32>, width: i32, height: i32) -> Vec<Point2f> {
    let (w, h) = (width as f32, height as f32);
    points
        .rows()
        .into_iter()
        .map(|row| Point2f::new(row[0] * w, (1.0 - row[1]) * h))
        .collect()
}

fn triangle_area(tri: &Vector<Point2f>) -> f32 {
    let a = tri.get(0).unwrap_or_default();
    let b = tri.get(1).unwrap_or_default();
    let c = tri.get(2).unwrap_or_default();
    ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs() * 0.5
}
