use opencv::core::{self, Mat, Scalar, Size, Vector, BORDER_DEFAULT, CV_32F};
use opencv::imgproc;
use opencv::prelude::*;

use crate::error::{Result, SymmetryError};

/// Feathering options for [`blend_with_mask`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    /// Blur kernel size as a fraction of the larger frame side.
    pub feather: f32,
    /// Explicit kernel size; wins over `feather` when greater than one.
    pub feather_kernel: Option<i32>,
}

impl BlendParams {
    pub fn new(feather: f32, feather_kernel: Option<i32>) -> Self {
        BlendParams {
            feather,
            feather_kernel,
        }
    }
}

impl Default for BlendParams {
    fn default() -> Self {
        BlendParams::new(0.02, None)
    }
}

/// Odd Gaussian kernel size for the mask blur; 1 disables blurring.
pub fn feather_kernel_size(feather: f32, kernel: Option<i32>, size: i32) -> i32 {
    if let Some(k) = kernel {
        if k > 1 {
            return if k % 2 == 1 { k } else { k + 1 };
        }
    }
    if feather <= 0.0 {
        return 1;
    }
    let k = 3.max((feather * size as f32) as i32);
    if k % 2 == 0 {
        k + 1
    } else {
        k
    }
}

/// Repeats a single-channel mask across `channels` planes.
pub(crate) fn expand_channels(mask: &Mat, channels: i32) -> Result<Mat> {
    if channels <= 1 {
        return Ok(mask.clone());
    }
    let mut planes: Vector<Mat> = Vector::new();
    for _ in 0..channels {
        planes.push(mask.clone());
    }
    let mut merged = Mat::default();
    core::merge(&planes, &mut merged)?;
    Ok(merged)
}

/// blend_with_mask composites `warped` over `original` as
/// `warped * m + original * (1 - m)`, where `m` is the feathered mask.
///
/// # Arguments
/// * `original` - frame whose type the result takes
/// * `warped` - candidate frame, same size and channel count as `original`
/// * `mask` - single channel coverage in [0, 1]
/// * `params` - feather settings
///
/// # Returns
/// * `Result<Mat>` - blended frame clamped to [0, 255]
pub fn blend_with_mask(original: &Mat, warped: &Mat, mask: &Mat, params: &BlendParams) -> Result<Mat> {
    let size = original.size()?;
    if warped.size()? != size || mask.size()? != size {
        return Err(SymmetryError::invalid(format!(
            "blend inputs differ in size: original {:?}, warped {:?}, mask {:?}",
            size,
            warped.size()?,
            mask.size()?
        )));
    }
    if warped.channels() != original.channels() || mask.channels() != 1 {
        return Err(SymmetryError::invalid(
            "warped must match the original channel count and mask must be single channel",
        ));
    }

    let mut mask_f = Mat::default();
    mask.convert_to(&mut mask_f, CV_32F, 1.0, 0.0)?;

    let kernel = feather_kernel_size(params.feather, params.feather_kernel, size.width.max(size.height));
    if kernel > 1 {
        let mut blurred = Mat::default();
        imgproc::gaussian_blur(
            &mask_f,
            &mut blurred,
            Size::new(kernel, kernel),
            0.0,
            0.0,
            BORDER_DEFAULT,
        )?;
        mask_f = blurred;
    }
    let mask_f = clamp(&mask_f, 0.0, 1.0)?;

    let channels = original.channels();
    let mask_c = expand_channels(&mask_f, channels)?;
    let mut inverse_c = Mat::default();
    mask_c.convert_to(&mut inverse_c, CV_32F, -1.0, 1.0)?;

    let mut original_f = Mat::default();
    original.convert_to(&mut original_f, CV_32F, 1.0, 0.0)?;
    let mut warped_f = Mat::default();
    warped.convert_to(&mut warped_f, CV_32F, 1.0, 0.0)?;

    let mut warped_part = Mat::default();
    core::multiply(&warped_f, &mask_c, &mut warped_part, 1.0, -1)?;
    let mut original_part = Mat::default();
    core::multiply(&original_f, &inverse_c, &mut original_part, 1.0, -1)?;

    let mut blended = Mat::default();
    core::add(&warped_part, &original_part, &mut blended, &Mat::default(), -1)?;
    let blended = clamp(&blended, 0.0, 255.0)?;

    let mut output = Mat::default();
    blended.convert_to(&mut output, original.depth(), 1.0, 0.0)?;
    Ok(output)
}

/// Clamps every element of `src` into [lo, hi].
pub(crate) fn clamp(src: &Mat, lo: f64, hi: f64) -> Result<Mat> {
    let mut upper = Mat::default();
    core::min(src, &Scalar::all(hi), &mut upper)?;
    let mut out = Mat::default();
    core::max(&upper, &Scalar::all(lo), &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{CV_32FC1, CV_8UC3};

    fn frame(value: f64) -> Mat {
        Mat::new_rows_cols_with_default(32, 48, CV_8UC3, Scalar::new(value, value / 2.0, 10.0, 0.0))
            .unwrap()
    }

    fn mask(value: f64) -> Mat {
        Mat::new_rows_cols_with_default(32, 48, CV_32FC1, Scalar::all(value)).unwrap()
    }

    fn max_abs_diff(a: &Mat, b: &Mat) -> f64 {
        core::norm2(a, b, core::NORM_INF, &core::no_array()).unwrap()
    }

    #[test]
    fn test_kernel_size() {
        assert_eq!(feather_kernel_size(0.0, None, 640), 1);
        assert_eq!(feather_kernel_size(0.02, None, 640), 13);
        assert_eq!(feather_kernel_size(0.001, None, 640), 3);
        assert_eq!(feather_kernel_size(0.02, Some(8), 640), 9);
        assert_eq!(feather_kernel_size(0.02, Some(7), 640), 7);
        assert_eq!(feather_kernel_size(0.0, Some(1), 640), 1);
    }

    #[test]
    fn test_zero_mask_returns_original() {
        let original = frame(200.0);
        let warped = frame(20.0);
        let out = blend_with_mask(&original, &warped, &mask(0.0), &BlendParams::default()).unwrap();
        assert_eq!(out.typ(), original.typ());
        assert_eq!(max_abs_diff(&out, &original), 0.0);
    }

    #[test]
    fn test_full_mask_returns_warped() {
        let original = frame(200.0);
        let warped = frame(20.0);
        let out = blend_with_mask(&original, &warped, &mask(1.0), &BlendParams::default()).unwrap();
        assert!(max_abs_diff(&out, &warped) <= 1.0);
    }

    #[test]
    fn test_half_mask_mixes_evenly() {
        let original = frame(200.0);
        let warped = frame(100.0);
        let params = BlendParams::new(0.0, None);
        let out = blend_with_mask(&original, &warped, &mask(0.5), &params).unwrap();
        let px = *out.at_2d::<core::Vec3b>(10, 10).unwrap();
        assert!((px[0] as i32 - 150).abs() <= 1);
        assert!((px[1] as i32 - 75).abs() <= 1);
        assert_eq!(px[2], 10);
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let original = frame(200.0);
        let small = Mat::new_rows_cols_with_default(8, 8, CV_32FC1, Scalar::all(1.0)).unwrap();
        let err = blend_with_mask(&original, &original, &small, &BlendParams::default()).unwrap_err();
        assert!(matches!(err, SymmetryError::InvalidInput(_)));
    }

    #[test]
    fn test_clamp() {
        let m = Mat::from_slice_2d(&[[-2.0f32, 0.5, 3.0]]).unwrap();
        let out = clamp(&m, 0.0, 1.0).unwrap();
        assert_eq!(*out.at_2d::<f32>(0, 0).unwrap(), 0.0);
        assert_eq!(*out.at_2d::<f32>(0, 1).unwrap(), 0.5);
        assert_eq!(*out.at_2d::<f32>(0, 2).unwrap(), 1.0);

        let color = Mat::new_rows_cols_with_default(2, 2, opencv::core::CV_32FC3, Scalar::new(-5.0, 120.0, 300.0, 0.0))
            .unwrap();
        let out = clamp(&color, 0.0, 255.0).unwrap();
        assert_eq!(out.typ(), color.typ());
        assert_eq!(
            *out.at_2d::<opencv::core::Vec3f>(1, 1).unwrap(),
            opencv::core::Vec3f::from([0.0, 120.0, 255.0])
        );
    }
}
