use ndarray::Array2;
use opencv::core::{self, Mat, Vector};
use opencv::imgcodecs::{imdecode, imencode, IMREAD_COLOR};
use opencv::prelude::*;

use crate::error::{Result, SymmetryError};
use crate::utils::coordinate::LandmarkPayload;

/// decode_frame decodes an encoded image (PNG, JPEG, ...) into a BGR frame.
///
/// # Arguments
/// * `im_bytes` - encoded image bytes
///
/// # Returns
/// * `Result<Mat>` - 8-bit, 3-channel frame
pub fn decode_frame(im_bytes: &[u8]) -> Result<Mat> {
    let buffer = Mat::from_slice(im_bytes)?;
    let frame = imdecode(&buffer, IMREAD_COLOR)?;
    if frame.empty() {
        return Err(SymmetryError::invalid("image bytes could not be decoded"));
    }
    Ok(frame)
}

/// encode_png encodes `frame` as PNG bytes.
pub fn encode_png(frame: &Mat) -> Result<Vec<u8>> {
    if frame.empty() {
        return Err(SymmetryError::invalid("cannot encode an empty frame"));
    }
    let mut buffer: Vector<u8> = Vector::new();
    imencode(".png", frame, &mut buffer, &Vector::new())?;
    Ok(buffer.to_vec())
}

/// Mirrors `frame` left to right.
pub fn flip_horizontal(frame: &Mat) -> Result<Mat> {
    let mut flipped = Mat::default();
    core::flip(frame, &mut flipped, 1)?;
    Ok(flipped)
}

/// convert_payload_to_ndarray stacks tracker landmarks into an (N, 3) array,
/// or (N, 2) when no landmark carries depth.
///
/// # Returns
/// * `Result<Option<Array2<f32>>>` - `None` when the payload has no landmarks
pub fn convert_payload_to_ndarray(payload: &LandmarkPayload) -> Result<Option<Array2<f32>>> {
    if payload.landmarks.is_empty() {
        return Ok(None);
    }

    let with_depth = payload.landmarks.iter().any(|p| p.z.is_some());
    let ncols = if with_depth { 3 } else { 2 };
    let mut values = Vec::with_capacity(payload.landmarks.len() * ncols);
    for p in payload.landmarks.iter() {
        values.push(p.x);
        values.push(p.y);
        if with_depth {
            values.push(p.z.unwrap_or(0.0));
        }
    }

    let arr = Array2::from_shape_vec((payload.landmarks.len(), ncols), values)?;
    if arr.iter().any(|v| !v.is_finite()) {
        return Err(SymmetryError::invalid("landmark payload contains non-finite values"));
    }
    Ok(Some(arr))
}

/// Parses a JSON tracker payload, see [`convert_payload_to_ndarray`].
pub fn convert_json_payload_to_ndarray(payload: &str) -> Result<Option<Array2<f32>>> {
    let payload: LandmarkPayload = serde_json::from_str(payload)?;
    convert_payload_to_ndarray(&payload)
}
