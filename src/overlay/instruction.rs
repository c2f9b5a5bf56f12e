use nalgebra::Vector2;
use opencv::core::Scalar;
use serde::Serialize;

use crate::config::config::DebugConfig;
use crate::error::{Result, SymmetryError};
use crate::geometry::line::Line2D;

/// Debug layer an instruction belongs to; each maps to a `DebugConfig` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLayer {
    Landmarks,
    Midline,
    Perpendicular,
    Regions,
    Displacements,
}

impl DebugLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            DebugLayer::Landmarks => "landmarks",
            DebugLayer::Midline => "midline",
            DebugLayer::Perpendicular => "perpendicular",
            DebugLayer::Regions => "regions",
            DebugLayer::Displacements => "displacements",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Parses `#RRGGBB`, `RRGGBB` or one of the basic color names.
    pub fn parse(value: &str) -> Result<Color> {
        let value = value.trim();
        let hex = match value.to_ascii_lowercase().as_str() {
            "red" => "FF0000",
            "green" => "00FF00",
            "blue" => "0000FF",
            "yellow" => "FFFF00",
            "white" => "FFFFFF",
            "black" => "000000",
            _ => value.trim_start_matches('#'),
        };
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(SymmetryError::Config(format!("invalid color {value:?}")));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| SymmetryError::Config(format!("invalid color {value:?}")))
        };
        Ok(Color::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// OpenCV BGR scalar.
    pub fn to_scalar(self) -> Scalar {
        Scalar::new(self.b as f64, self.g as f64, self.r as f64, 255.0)
    }
}

/// Geometry to draw, in normalized frame coordinates (y = 0 at the top).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Shape {
    Points(Vec<Vector2<f32>>),
    /// Infinite line, clipped to the frame when drawn.
    Line(Line2D),
    Segment(Vector2<f32>, Vector2<f32>),
    /// Closed outline.
    Polygon(Vec<Vector2<f32>>),
}

/// One overlay primitive produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawInstruction {
    pub layer: DebugLayer,
    pub shape: Shape,
    pub color: Color,
    /// Stroke width, or point radius for `Shape::Points`.
    pub width: f32,
    /// Lower values are drawn first.
    pub z: i32,
    /// Stable slot for renderers that retain primitives between frames.
    pub slot: Option<usize>,
}

impl DrawInstruction {
    pub fn new(layer: DebugLayer, shape: Shape, color: Color, width: f32) -> Self {
        DrawInstruction {
            layer,
            shape,
            color,
            width,
            z: 0,
            slot: None,
        }
    }

    pub fn with_z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }
}

/// Drawing backend that receives instructions routed by [`dispatch`].
pub trait OverlayRenderer {
    fn draw_points(&mut self, instruction: &DrawInstruction, points: &[Vector2<f32>]) -> Result<()>;

    fn draw_line(&mut self, instruction: &DrawInstruction, line: &Line2D) -> Result<()>;

    fn draw_segment(
        &mut self,
        instruction: &DrawInstruction,
        start: &Vector2<f32>,
        end: &Vector2<f32>,
    ) -> Result<()>;

    fn draw_polygon(&mut self, instruction: &DrawInstruction, points: &[Vector2<f32>]) -> Result<()>;
}

/// dispatch draws the instructions whose debug layer is enabled, lowest z first.
///
/// # Returns
/// * `Result<usize>` - number of instructions handed to the renderer
pub fn dispatch<R: OverlayRenderer + ?Sized>(
    instructions: &[DrawInstruction],
    debug: &DebugConfig,
    renderer: &mut R,
) -> Result<usize> {
    let mut ordered: Vec<&DrawInstruction> = instructions
        .iter()
        .filter(|item| debug.is_enabled(item.layer.as_str()))
        .collect();
    ordered.sort_by_key(|item| item.z);

    let mut drawn = 0;
    for item in ordered {
        match &item.shape {
            Shape::Points(points) => renderer.draw_points(item, points)?,
            Shape::Line(line) => renderer.draw_line(item, line)?,
            Shape::Segment(start, end) => renderer.draw_segment(item, start, end)?,
            Shape::Polygon(points) if points.len() >= 3 => renderer.draw_polygon(item, points)?,
            Shape::Polygon(_) => continue,
        }
        drawn += 1;
    }
    Ok(drawn)
}
