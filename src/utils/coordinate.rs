use serde::{Deserialize, Serialize};

/// One normalized landmark as reported by a face tracker, y = 0 at the top.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate3D {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

/// Tracker output for one frame; an empty or missing list means no face.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LandmarkPayload {
    #[serde(default)]
    pub landmarks: Vec<Coordinate3D>,
}
