use anyhow::{ensure, Context, Result};
use nalgebra::Vector2;
use ndarray::Array2;
use opencv::core::Mat;
use opencv::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::asymmetry::{compute_asymmetry_metrics, default_tracked_indices, AsymmetryMetrics};
use crate::analysis::orientation::{check_droopy_side, SideCheck};
use crate::config::config::{Config, ProcessingMode};
use crate::geometry::line::Line2D;
use crate::geometry::midline::{landmark_xy, midsagittal_line, perpendicular_through};
use crate::landmarks::smoother::LandmarkSmoother;
use crate::overlay::instruction::{Color, DebugLayer, DrawInstruction, Shape};
use crate::pipeline::targets::{build_warp_targets, mirror_x, region_polygon, resolve_region_groups, RegionGroup};
use crate::utils::image::flip_horizontal;
use crate::warp::blend::BlendParams;
use crate::warp::warp::warp_face;

/// Landmark the perpendicular guide passes through (mouth corner).
pub const PERPENDICULAR_ANCHOR: usize = 61;

/// Per-session mutable state: smoother memory and the last raw detection.
#[derive(Debug, Clone)]
pub struct FrameContext {
    smoother: LandmarkSmoother,
    last_detection: Option<Array2<f32>>,
    frames: u64,
}

impl FrameContext {
    pub fn new(smoothing_alpha: f32) -> Self {
        info!(smoothing_alpha, "created frame context");
        FrameContext {
            smoother: LandmarkSmoother::new(smoothing_alpha),
            last_detection: None,
            frames: 0,
        }
    }

    /// Forgets smoothing history and the stale-detection fallback.
    pub fn reset(&mut self) {
        info!(frames = self.frames, "reset frame context");
        self.smoother.reset();
        self.last_detection = None;
        self.frames = 0;
    }

    pub fn last_detection(&self) -> Option<&Array2<f32>> {
        self.last_detection.as_ref()
    }

    pub fn smoothed(&self) -> Option<&Array2<f32>> {
        self.smoother.last()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Everything one `process_frame` call produces.
#[derive(Debug)]
pub struct FrameOutput {
    /// Display frame: mirrored when `hflip`, warped in warp mode.
    pub frame: Mat,
    /// Smoothed landmarks in display space, y = 0 at the top.
    pub landmarks: Option<Array2<f32>>,
    pub midline: Option<Line2D>,
    pub pose_ok: bool,
    pub metrics: Option<AsymmetryMetrics>,
    pub side_check: SideCheck,
    pub warped: bool,
    pub instructions: Vec<DrawInstruction>,
}

#[derive(Debug, Clone, Copy)]
struct OverlayPalette {
    points: Color,
    midline: Color,
    perpendicular: Color,
    region: Color,
    displacement: Color,
}

#[derive(Debug, Clone)]
pub struct SymmetryPipeline {
    cfg: Config,
    tracked_indices: Vec<usize>,
    region_groups: Vec<RegionGroup>,
    palette: OverlayPalette,
    blend: BlendParams,
}

impl SymmetryPipeline {
    /// new validates `cfg` and resolves everything that stays fixed per session.
    ///
    /// # Arguments
    /// * `cfg` - pipeline configuration
    ///
    /// # Returns
    /// * `Result<SymmetryPipeline>`
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;

        let mut tracked_indices = if cfg.method.tracked_indices.is_empty() {
            default_tracked_indices(cfg.runtime.droopy_side)
        } else {
            cfg.method.tracked_indices.clone()
        };
        tracked_indices.sort_unstable();
        tracked_indices.dedup();

        let overlay = &cfg.overlay;
        let palette = OverlayPalette {
            points: Color::parse(&overlay.pts_color).context("overlay.pts_color")?,
            midline: Color::parse(&overlay.midline_color).context("overlay.midline_color")?,
            perpendicular: Color::parse(&overlay.perp_color).context("overlay.perp_color")?,
            region: Color::parse(&overlay.region_color).context("overlay.region_color")?,
            displacement: Color::parse(&overlay.displacement_color).context("overlay.displacement_color")?,
        };

        let region_groups = resolve_region_groups(&overlay.region_nodes, cfg.camera.hflip);
        let blend = BlendParams::new(cfg.method.blend_feather_width, cfg.method.blend_feather_kernel);

        info!(
            droopy = cfg.runtime.droopy_side.as_str(),
            mode = ?cfg.method.mode,
            tracked = tracked_indices.len(),
            regions = region_groups.len(),
            "initialized symmetry pipeline"
        );

        Ok(SymmetryPipeline {
            cfg,
            tracked_indices,
            region_groups,
            palette,
            blend,
        })
    }

    /// new_context starts a tracking session smoothed with `tracker.smoothing_alpha`.
    pub fn new_context(&self) -> FrameContext {
        FrameContext::new(self.cfg.tracker.smoothing_alpha)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn tracked_indices(&self) -> &[usize] {
        &self.tracked_indices
    }

    pub fn region_groups(&self) -> &[RegionGroup] {
        &self.region_groups
    }

    /// process_frame runs one frame through smoothing, midline fit, metrics,
    /// the optional warp and overlay construction.
    ///
    /// # Arguments
    /// * `ctx` - session state, mutated by this call only
    /// * `frame` - camera frame
    /// * `detection` - tracker landmarks for `frame`, `None` when no face was found
    ///
    /// # Returns
    /// * `Result<FrameOutput>` - a failed warp degrades to the unwarped frame
    pub fn process_frame(
        &self,
        ctx: &mut FrameContext,
        frame: &Mat,
        detection: Option<Array2<f32>>,
    ) -> Result<FrameOutput> {
        ensure!(!frame.empty(), "frame is empty");
        if let Some(landmarks) = detection.as_ref() {
            ensure!(
                landmarks.ncols() >= 2,
                "landmarks must have at least two columns, got {:?}",
                landmarks.dim()
            );
        }
        ctx.frames += 1;

        let raw = match detection {
            Some(landmarks) => {
                ctx.last_detection = Some(landmarks.clone());
                Some(landmarks)
            }
            None => {
                if ctx.last_detection.is_some() {
                    debug!(frame = ctx.frames, "no detection, reusing last landmarks");
                }
                ctx.last_detection.clone()
            }
        };

        let hflip = self.cfg.camera.hflip;
        let landmarks = raw.map(|raw| {
            let smoothed = ctx.smoother.smooth(&raw);
            if hflip {
                mirror_x(&smoothed)
            } else {
                smoothed
            }
        });

        let midline = landmarks.as_ref().and_then(midsagittal_line);
        let pose_ok = landmarks.as_ref().map_or(true, |lm| {
            pose_within_limits(lm, &self.cfg.method.pose_reference_indices, self.cfg.method.pose_max_abs_z)
        });

        let metrics = match (landmarks.as_ref(), midline.as_ref()) {
            (Some(lm), Some(line)) if pose_ok => Some(compute_asymmetry_metrics(
                &self.cfg,
                Some(line),
                &self.tracked_indices,
                lm,
            )),
            _ => None,
        };
        let side_check = metrics
            .as_ref()
            .map_or(SideCheck::Indeterminate, |m| check_droopy_side(m, hflip));

        let mut output_frame = if hflip {
            flip_horizontal(frame)?
        } else {
            frame.clone()
        };

        let mut warped = false;
        if self.cfg.method.mode == ProcessingMode::Warp {
            if let (Some(lm), Some(line)) = (landmarks.as_ref(), midline.as_ref()) {
                match self.warp(&output_frame, lm, line) {
                    Ok(result) => {
                        output_frame = result;
                        warped = true;
                    }
                    Err(e) => warn!(frame = ctx.frames, error = %e, "warp failed, showing unwarped frame"),
                }
            }
        }

        let instructions = match landmarks.as_ref() {
            Some(lm) => self.build_instructions(lm, midline.as_ref(), metrics.as_ref()),
            None => vec![],
        };

        Ok(FrameOutput {
            frame: output_frame,
            landmarks,
            midline,
            pose_ok,
            metrics,
            side_check,
            warped,
            instructions,
        })
    }

    fn warp(&self, frame: &Mat, landmarks: &Array2<f32>, midline: &Line2D) -> Result<Mat> {
        let targets = build_warp_targets(
            landmarks,
            midline,
            self.cfg.runtime.droopy_side,
            self.cfg.method.boundary_padding,
        )?;
        let output = warp_face(
            frame,
            &targets.src,
            &targets.dst,
            None,
            self.cfg.method.warp_method,
            &self.blend,
        )?;
        Ok(output)
    }

    /// build_instructions assembles the debug overlay for one frame. Nothing is
    /// produced unless `debug.show_debug` is on; each layer has its own flag.
    pub fn build_instructions(
        &self,
        landmarks: &Array2<f32>,
        midline: Option<&Line2D>,
        metrics: Option<&AsymmetryMetrics>,
    ) -> Vec<DrawInstruction> {
        let debug = &self.cfg.debug;
        let overlay = &self.cfg.overlay;
        let mut instructions = Vec::new();
        if !debug.show_debug || landmarks.ncols() < 2 {
            return instructions;
        }

        if debug.is_enabled(DebugLayer::Landmarks.as_str()) {
            let points = landmarks
                .rows()
                .into_iter()
                .map(|row| Vector2::new(row[0], row[1]))
                .collect();
            instructions.push(
                DrawInstruction::new(
                    DebugLayer::Landmarks,
                    Shape::Points(points),
                    self.palette.points,
                    overlay.pts_radius,
                )
                .with_z(2),
            );
        }

        if let Some(line) = midline {
            if debug.is_enabled(DebugLayer::Midline.as_str()) {
                instructions.push(
                    DrawInstruction::new(
                        DebugLayer::Midline,
                        Shape::Line(*line),
                        self.palette.midline,
                        overlay.midline_width,
                    )
                    .with_z(1)
                    .with_slot(0),
                );
            }
            if debug.is_enabled(DebugLayer::Perpendicular.as_str()) {
                if let Some(anchor) = landmark_xy(landmarks, PERPENDICULAR_ANCHOR) {
                    instructions.push(
                        DrawInstruction::new(
                            DebugLayer::Perpendicular,
                            Shape::Line(perpendicular_through(&anchor, line)),
                            self.palette.perpendicular,
                            overlay.perp_width,
                        )
                        .with_z(1)
                        .with_slot(1),
                    );
                }
            }
        }

        if debug.is_enabled(DebugLayer::Regions.as_str()) {
            for (slot, group) in self.region_groups.iter().enumerate() {
                let hull = match region_polygon(group, landmarks) {
                    Ok(Some(hull)) => hull,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(region = %group.name, error = %e, "region outline failed");
                        continue;
                    }
                };
                instructions.push(
                    DrawInstruction::new(
                        DebugLayer::Regions,
                        Shape::Polygon(hull),
                        self.palette.region,
                        overlay.region_width,
                    )
                    .with_slot(slot),
                );
            }
        }

        if let (Some(line), Some(metrics)) = (midline, metrics) {
            if debug.is_enabled(DebugLayer::Displacements.as_str()) {
                for (slot, d) in metrics.displacements.iter().enumerate() {
                    let target = line.reflect(&d.healthy_coords);
                    instructions.push(
                        DrawInstruction::new(
                            DebugLayer::Displacements,
                            Shape::Segment(d.droopy_coords, target),
                            self.palette.displacement,
                            overlay.displacement_width,
                        )
                        .with_z(3)
                        .with_slot(slot),
                    );
                }
            }
        }

        instructions
    }
}

/// pose_within_limits reports whether the head faces the camera closely enough
/// for asymmetry metrics: the reference landmarks' depths may deviate from
/// their mean by at most `max_abs_z`. Landmarks without depth always pass.
pub fn pose_within_limits(landmarks: &Array2<f32>, reference_indices: &[usize], max_abs_z: f32) -> bool {
    if landmarks.ncols() < 3 {
        return true;
    }
    let depths: Vec<f32> = reference_indices
        .iter()
        .filter(|&&idx| idx < landmarks.nrows())
        .map(|&idx| landmarks[[idx, 2]])
        .collect();
    if depths.is_empty() {
        return true;
    }
    let mean = depths.iter().sum::<f32>() / depths.len() as f32;
    let worst = depths.iter().fold(0.0f32, |acc, z| acc.max((z - mean).abs()));
    worst <= max_abs_z
}
