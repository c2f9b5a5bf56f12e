use std::collections::VecDeque;

use ndarray::Array2;
use opencv::core::Mat;
use tracing::debug;

use crate::error::Result;
use crate::utils::image::convert_json_payload_to_ndarray;

/// Boundary to the face tracker that turns frames into landmarks.
///
/// Implementations return normalized landmarks of shape (N, 3) or (N, 2)
/// with y = 0 at the top of the frame, or `None` when no face is found.
pub trait LandmarkTracker {
    fn detect(&mut self, frame: &Mat) -> Result<Option<Array2<f32>>>;
}

/// Replays recorded tracker output, one payload per frame.
#[derive(Debug, Clone, Default)]
pub struct ReplayTracker {
    frames: VecDeque<Option<Array2<f32>>>,
}

impl ReplayTracker {
    pub fn new(frames: impl IntoIterator<Item = Option<Array2<f32>>>) -> Self {
        ReplayTracker {
            frames: frames.into_iter().collect(),
        }
    }

    /// Builds a replay from JSON lines, each a landmark payload.
    /// Blank lines count as frames without a face.
    pub fn from_json_lines(contents: &str) -> Result<Self> {
        let mut frames = VecDeque::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                frames.push_back(None);
                continue;
            }
            frames.push_back(convert_json_payload_to_ndarray(line)?);
        }
        debug!(frames = frames.len(), "loaded landmark replay");
        Ok(ReplayTracker { frames })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkTracker for ReplayTracker {
    fn detect(&mut self, _frame: &Mat) -> Result<Option<Array2<f32>>> {
        Ok(self.frames.pop_front().flatten())
    }
}
