use opencv::core::Mat;
use serde::Serialize;

use crate::analysis::asymmetry::AsymmetryMetrics;
use crate::error::{Result, SymmetryError};
use crate::utils::image::{decode_frame, encode_png};

/// Poses captured per session.
pub const MAX_POSES: u32 = 9;

/// A processed frame handed to persistence, with its symmetry score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseCapture {
    pub session_id: u64,
    pub pose_index: u32,
    #[serde(skip)]
    pub png_bytes: Vec<u8>,
    pub score: Option<f32>,
}

impl PoseCapture {
    /// from_frame encodes `frame` and scores it from `metrics`.
    ///
    /// # Arguments
    /// * `session_id` - store-assigned session id
    /// * `pose_index` - pose slot, 1 to `MAX_POSES`
    /// * `frame` - processed frame to persist
    /// * `metrics` - metrics of the same frame, if computed
    pub fn from_frame(
        session_id: u64,
        pose_index: u32,
        frame: &Mat,
        metrics: Option<&AsymmetryMetrics>,
    ) -> Result<Self> {
        if !(1..=MAX_POSES).contains(&pose_index) {
            return Err(SymmetryError::invalid(format!(
                "pose index must be within 1..={MAX_POSES}, got {pose_index}"
            )));
        }
        Ok(PoseCapture {
            session_id,
            pose_index,
            png_bytes: encode_png(frame)?,
            score: metrics.and_then(|m| m.symmetry_score()),
        })
    }

    /// Decodes the stored PNG back into a frame, e.g. for a store preview.
    pub fn frame(&self) -> Result<Mat> {
        decode_frame(&self.png_bytes)
    }

    /// Standard file name for the capture, e.g. `pose_03.png`.
    pub fn file_name(&self) -> String {
        format!("pose_{:02}.png", self.pose_index)
    }
}

/// Boundary to the session store; the pipeline itself never writes storage.
pub trait CaptureStore {
    fn save(&mut self, capture: PoseCapture) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::Side;
    use opencv::core::{Scalar, CV_8UC3};
    use opencv::prelude::*;

    #[derive(Default)]
    struct MemoryStore {
        saved: Vec<PoseCapture>,
    }

    impl CaptureStore for MemoryStore {
        fn save(&mut self, capture: PoseCapture) -> Result<()> {
            self.saved.push(capture);
            Ok(())
        }
    }

    fn frame() -> Mat {
        Mat::new_rows_cols_with_default(8, 8, CV_8UC3, Scalar::all(90.0)).unwrap()
    }

    #[test]
    fn test_pose_index_bounds() {
        assert!(PoseCapture::from_frame(1, 0, &frame(), None).is_err());
        assert!(PoseCapture::from_frame(1, MAX_POSES + 1, &frame(), None).is_err());
        let capture = PoseCapture::from_frame(1, MAX_POSES, &frame(), None).unwrap();
        assert_eq!(capture.file_name(), "pose_09.png");
    }

    #[test]
    fn test_capture_reaches_store() {
        let metrics = AsymmetryMetrics::empty(Side::Left);
        let capture = PoseCapture::from_frame(7, 3, &frame(), Some(&metrics)).unwrap();
        assert!(capture.score.is_none());
        assert!(!capture.png_bytes.is_empty());

        let mut store = MemoryStore::default();
        store.save(capture).unwrap();
        assert_eq!(store.saved.len(), 1);
        assert_eq!(store.saved[0].session_id, 7);
        assert_eq!(store.saved[0].file_name(), "pose_03.png");

        let restored = store.saved[0].frame().unwrap();
        assert_eq!(restored.size().unwrap(), frame().size().unwrap());
        assert_eq!(restored.typ(), CV_8UC3);
    }
}
