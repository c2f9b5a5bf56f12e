use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SymmetryError};
use crate::landmarks::nodes;

/// Side of the face, in landmark-table terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Metrics and overlays only, the frame passes through.
    Analyze,
    /// Droopy side is warped onto the mirrored healthy side.
    Warp,
}

/// Deserialized through [`FromStr`], so an unknown name reports as not implemented.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum WarpMethod {
    Delaunay,
    /// Thin-plate spline, reserved.
    Tps,
}

impl WarpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            WarpMethod::Delaunay => "delaunay",
            WarpMethod::Tps => "tps",
        }
    }
}

impl FromStr for WarpMethod {
    type Err = SymmetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "delaunay" => Ok(WarpMethod::Delaunay),
            "tps" => Ok(WarpMethod::Tps),
            other => Err(SymmetryError::NotImplemented(format!("warp method {other:?}"))),
        }
    }
}

impl TryFrom<String> for WarpMethod {
    type Error = SymmetryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub droopy_side: Side,
}

impl RuntimeConfig {
    pub(crate) fn new() -> Self {
        RuntimeConfig {
            droopy_side: Side::Left,
        }
    }

    pub fn healthy_side(&self) -> Side {
        self.droopy_side.opposite()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub hflip: bool,
}

impl CameraConfig {
    pub(crate) fn new() -> Self {
        CameraConfig { hflip: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub smoothing_alpha: f32,
}

impl TrackerConfig {
    pub(crate) fn new() -> Self {
        TrackerConfig {
            smoothing_alpha: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MethodConfig {
    pub mode: ProcessingMode,
    /// Explicit landmark selection; empty means healthy side plus midline.
    pub tracked_indices: Vec<usize>,
    pub warp_method: WarpMethod,
    pub blend_feather_width: f32,
    pub blend_feather_kernel: Option<i32>,
    /// Advisory, the mesh builder does not filter on it.
    pub delaunay_min_triangle_area: f32,
    pub boundary_padding: f32,
    pub pose_max_abs_z: f32,
    pub pose_reference_indices: Vec<usize>,
}

impl MethodConfig {
    pub(crate) fn new() -> Self {
        MethodConfig {
            mode: ProcessingMode::Analyze,
            tracked_indices: vec![],
            warp_method: WarpMethod::Delaunay,
            blend_feather_width: 0.04,
            blend_feather_kernel: None,
            delaunay_min_triangle_area: 1e-4,
            boundary_padding: 0.02,
            pose_max_abs_z: 0.08,
            pose_reference_indices: vec![1, 33, 263, 152],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    pub show_debug: bool,
    pub landmarks: bool,
    pub midline: bool,
    pub perpendicular: bool,
    pub regions: bool,
    pub displacements: bool,
}

impl DebugConfig {
    pub(crate) fn new() -> Self {
        DebugConfig {
            show_debug: false,
            landmarks: true,
            midline: false,
            perpendicular: false,
            regions: false,
            displacements: false,
        }
    }

    /// Whether instructions tagged with `flag` should be drawn.
    pub fn is_enabled(&self, flag: &str) -> bool {
        if !self.show_debug {
            return false;
        }
        match flag {
            "landmarks" => self.landmarks,
            "midline" => self.midline,
            "perpendicular" => self.perpendicular,
            "regions" => self.regions,
            "displacements" => self.displacements,
            _ => false,
        }
    }
}

/// A region overlay group, either an explicit index list or a tree path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RegionNode {
    Named { name: String, indices: Vec<usize> },
    Path(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    pub pts_color: String,
    pub pts_radius: f32,
    pub midline_color: String,
    pub midline_width: f32,
    pub perp_color: String,
    pub perp_width: f32,
    pub region_color: String,
    pub region_width: f32,
    pub displacement_color: String,
    pub displacement_width: f32,
    pub region_nodes: Vec<RegionNode>,
}

impl OverlayConfig {
    pub(crate) fn new() -> Self {
        let mut indices: Vec<usize> = nodes::LEFT_LANDMARKS
            .iter()
            .chain(nodes::MIDLINE_LANDMARKS.iter())
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();

        OverlayConfig {
            pts_color: "#00FF00".to_string(),
            pts_radius: 0.5,
            midline_color: "#0000FF".to_string(),
            midline_width: 1.0,
            perp_color: "#FF00FF".to_string(),
            perp_width: 1.5,
            region_color: "#FFFF00".to_string(),
            region_width: 1.2,
            displacement_color: "#FF0000".to_string(),
            displacement_width: 1.0,
            region_nodes: vec![RegionNode::Named {
                name: "left_with_midline".to_string(),
                indices,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub camera: CameraConfig,
    pub tracker: TrackerConfig,
    pub method: MethodConfig,
    pub debug: DebugConfig,
    pub overlay: OverlayConfig,
}

impl Config {
    pub fn new() -> Self {
        Config {
            runtime: RuntimeConfig::new(),
            camera: CameraConfig::new(),
            tracker: TrackerConfig::new(),
            method: MethodConfig::new(),
            debug: DebugConfig::new(),
            overlay: OverlayConfig::new(),
        }
    }

    /// load reads a JSON config file; missing sections and fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let alpha = self.tracker.smoothing_alpha;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SymmetryError::Config(format!(
                "smoothing_alpha must be within [0, 1], got {alpha}"
            )));
        }
        if self.method.blend_feather_width < 0.0 {
            return Err(SymmetryError::Config(
                "blend_feather_width must not be negative".to_string(),
            ));
        }
        if self.method.boundary_padding < 0.0 {
            return Err(SymmetryError::Config(
                "boundary_padding must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig::new()
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig::new()
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig::new()
    }
}

impl Default for MethodConfig {
    fn default() -> Self {
        MethodConfig::new()
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        DebugConfig::new()
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig::new()
    }
}
