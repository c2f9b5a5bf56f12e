use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// A line in normalized image space: `origin + t * direction`, `|direction| = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line2D {
    pub origin: Vector2<f32>,
    pub direction: Vector2<f32>,
}

impl Line2D {
    /// Builds a line, normalizing `direction`. Returns `None` for a zero direction.
    pub fn new(origin: Vector2<f32>, direction: Vector2<f32>) -> Option<Self> {
        let norm = direction.norm();
        if !norm.is_finite() || norm <= f32::EPSILON {
            return None;
        }
        Some(Line2D {
            origin,
            direction: direction / norm,
        })
    }

    pub fn point_at(&self, t: f32) -> Vector2<f32> {
        self.origin + self.direction * t
    }

    /// Nearest point on the line to `point`.
    pub fn project(&self, point: &Vector2<f32>) -> Vector2<f32> {
        let t = (point - self.origin).dot(&self.direction);
        self.point_at(t)
    }

    /// Direction rotated by -90 degrees, `(d.y, -d.x)`.
    pub fn normal(&self) -> Vector2<f32> {
        Vector2::new(self.direction.y, -self.direction.x)
    }

    /// `(along, across)` components of `point - origin` against
    /// `direction` and `normal()`.
    pub fn components(&self, point: &Vector2<f32>) -> (f32, f32) {
        let rel = point - self.origin;
        (rel.dot(&self.direction), rel.dot(&self.normal()))
    }

    /// Mirror image of `point` across the line.
    pub fn reflect(&self, point: &Vector2<f32>) -> Vector2<f32> {
        let projected = self.project(point);
        projected * 2.0 - point
    }

    /// The part of the line inside the unit square, if any.
    pub fn clip_to_unit_square(&self) -> Option<(Vector2<f32>, Vector2<f32>)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..2 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            if d.abs() <= 1e-9 {
                if !(0.0..=1.0).contains(&o) {
                    return None;
                }
                continue;
            }
            let t0 = (0.0 - o) / d;
            let t1 = (1.0 - o) / d;
            t_min = t_min.max(t0.min(t1));
            t_max = t_max.min(t0.max(t1));
        }

        if t_min > t_max {
            return None;
        }
        Some((self.point_at(t_min), self.point_at(t_max)))
    }
}
