use nalgebra::Vector2;
use opencv::core::{Mat, Point, Vector};
use opencv::imgproc::{self, FILLED, LINE_AA};
use opencv::prelude::*;

use crate::error::{Result, SymmetryError};
use crate::geometry::line::Line2D;
use crate::overlay::instruction::{DrawInstruction, OverlayRenderer};

/// Renders overlay instructions directly onto an OpenCV frame.
pub struct MatOverlay<'a> {
    frame: &'a mut Mat,
    width: f32,
    height: f32,
}

impl<'a> MatOverlay<'a> {
    pub fn new(frame: &'a mut Mat) -> Result<Self> {
        if frame.empty() {
            return Err(SymmetryError::invalid("cannot draw on an empty frame"));
        }
        let size = frame.size()?;
        Ok(MatOverlay {
            frame,
            width: size.width as f32,
            height: size.height as f32,
        })
    }

    fn to_pixel(&self, p: &Vector2<f32>) -> Point {
        Point::new(
            (p.x * self.width).round() as i32,
            (p.y * self.height).round() as i32,
        )
    }
}

fn thickness(width: f32) -> i32 {
    (width.round() as i32).max(1)
}

impl OverlayRenderer for MatOverlay<'_> {
    fn draw_points(&mut self, instruction: &DrawInstruction, points: &[Vector2<f32>]) -> Result<()> {
        let radius = thickness(instruction.width);
        let color = instruction.color.to_scalar();
        for p in points.iter() {
            let center = self.to_pixel(p);
            imgproc::circle(&mut *self.frame, center, radius, color, FILLED, LINE_AA, 0)?;
        }
        Ok(())
    }

    fn draw_line(&mut self, instruction: &DrawInstruction, line: &Line2D) -> Result<()> {
        let (start, end) = match line.clip_to_unit_square() {
            Some(segment) => segment,
            None => return Ok(()),
        };
        self.draw_segment(instruction, &start, &end)
    }

    fn draw_segment(
        &mut self,
        instruction: &DrawInstruction,
        start: &Vector2<f32>,
        end: &Vector2<f32>,
    ) -> Result<()> {
        let (a, b) = (self.to_pixel(start), self.to_pixel(end));
        imgproc::line(
            &mut *self.frame,
            a,
            b,
            instruction.color.to_scalar(),
            thickness(instruction.width),
            LINE_AA,
            0,
        )?;
        Ok(())
    }

    fn draw_polygon(&mut self, instruction: &DrawInstruction, points: &[Vector2<f32>]) -> Result<()> {
        let outline: Vector<Point> = points.iter().map(|p| self.to_pixel(p)).collect();
        let mut contours: Vector<Vector<Point>> = Vector::new();
        contours.push(outline);
        imgproc::polylines(
            &mut *self.frame,
            &contours,
            true,
            instruction.color.to_scalar(),
            thickness(instruction.width),
            LINE_AA,
            0,
        )?;
        Ok(())
    }
}
