use facial_symmetry_pipeline::config::config::WarpMethod;
use facial_symmetry_pipeline::warp::blend::BlendParams;
use facial_symmetry_pipeline::warp::mesh::build_mesh;
use facial_symmetry_pipeline::warp::warp::warp_face;
use ndarray::Array2;
use opencv::core::{Mat, Point, Scalar, Vec3b, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

const SIZE: i32 = 64;
const SHIFT: (f32, f32) = (5.0, 4.0);

fn square_frame() -> Mat {
    let mut frame = Mat::new_rows_cols_with_default(SIZE, SIZE, CV_8UC3, Scalar::all(0.0)).unwrap();
    imgproc::rectangle_points(
        &mut frame,
        Point::new(20, 20),
        Point::new(44, 44),
        Scalar::new(0.0, 0.0, 255.0, 0.0),
        -1,
        imgproc::LINE_8,
        0,
    )
    .unwrap();
    frame
}

/// Pixel position to normalized y-up coordinates.
fn normalized(px: &[(f32, f32)]) -> Array2<f32> {
    let s = SIZE as f32;
    let mut points = Array2::<f32>::zeros((px.len(), 2));
    for (i, &(x, y)) in px.iter().enumerate() {
        points[[i, 0]] = x / s;
        points[[i, 1]] = 1.0 - y / s;
    }
    points
}

/// Square corners followed by a fixed ring of anchors around them.
fn correspondences() -> (Array2<f32>, Array2<f32>) {
    let corners = [(20.0, 20.0), (44.0, 20.0), (44.0, 44.0), (20.0, 44.0)];
    let ring = [
        (10.0, 10.0),
        (32.0, 10.0),
        (54.0, 10.0),
        (10.0, 32.0),
        (54.0, 32.0),
        (10.0, 54.0),
        (32.0, 54.0),
        (54.0, 54.0),
    ];

    let mut src: Vec<(f32, f32)> = corners.to_vec();
    let mut dst: Vec<(f32, f32)> = corners.iter().map(|&(x, y)| (x + SHIFT.0, y + SHIFT.1)).collect();
    src.extend_from_slice(&ring);
    dst.extend_from_slice(&ring);
    (normalized(&src), normalized(&dst))
}

fn red_centroid(frame: &Mat) -> (f32, f32) {
    let (mut sx, mut sy, mut n) = (0.0f32, 0.0f32, 0.0f32);
    for r in 0..frame.rows() {
        for c in 0..frame.cols() {
            let px = frame.at_2d::<Vec3b>(r, c).unwrap();
            if px[2] > 127 && px[0] < 64 && px[1] < 64 {
                sx += c as f32;
                sy += r as f32;
                n += 1.0;
            }
        }
    }
    assert!(n > 0.0, "no colored pixels found");
    (sx / n, sy / n)
}

#[test]
fn test_square_moves_by_the_correspondence_offset() {
    let frame = square_frame();
    let (src, dst) = correspondences();

    let before = red_centroid(&frame);
    assert!((before.0 - 32.0).abs() < 1e-3 && (before.1 - 32.0).abs() < 1e-3);

    let out = warp_face(&frame, &src, &dst, None, WarpMethod::Delaunay, &BlendParams::default()).unwrap();
    assert_eq!(out.typ(), frame.typ());
    assert_eq!(out.size().unwrap(), frame.size().unwrap());

    let after = red_centroid(&out);
    assert!((after.0 - before.0 - SHIFT.0).abs() <= 1.0, "x shift {}", after.0 - before.0);
    assert!((after.1 - before.1 - SHIFT.1).abs() <= 1.0, "y shift {}", after.1 - before.1);
}

#[test]
fn test_pixels_outside_the_hull_are_untouched() {
    let mut frame = square_frame();
    // texture outside the anchor ring so a changed pixel would show
    for r in 0..SIZE {
        for c in 0..SIZE {
            if !(6..=58).contains(&r) || !(6..=58).contains(&c) {
                let v = ((r * 7 + c * 3) % 200) as u8;
                *frame.at_2d_mut::<Vec3b>(r, c).unwrap() = Vec3b::from([v, 255 - v, 40]);
            }
        }
    }
    let (src, dst) = correspondences();
    let out = warp_face(&frame, &src, &dst, None, WarpMethod::Delaunay, &BlendParams::default()).unwrap();

    for (r, c) in [(1, 1), (2, 60), (62, 3), (61, 61), (0, 32), (32, 63)] {
        assert_eq!(
            *out.at_2d::<Vec3b>(r, c).unwrap(),
            *frame.at_2d::<Vec3b>(r, c).unwrap(),
            "pixel ({r}, {c}) changed"
        );
    }
}

#[test]
fn test_precomputed_mesh_matches_built_mesh() {
    let frame = square_frame();
    let (src, dst) = correspondences();
    let mesh = build_mesh(&src).unwrap();

    let with_mesh = warp_face(&frame, &src, &dst, Some(&mesh), WarpMethod::Delaunay, &BlendParams::default()).unwrap();
    let without = warp_face(&frame, &src, &dst, None, WarpMethod::Delaunay, &BlendParams::default()).unwrap();

    let diff = opencv::core::norm2(&with_mesh, &without, opencv::core::NORM_INF, &opencv::core::no_array()).unwrap();
    assert_eq!(diff, 0.0);
}
