use serde::Serialize;
use tracing::warn;

use crate::analysis::asymmetry::AsymmetryMetrics;
use crate::config::config::Side;

/// Droopy landmarks closer to the midline than this are not judged.
pub const SIDE_CHECK_EPSILON: f32 = 1e-3;

/// Outcome of comparing the configured droopy side with landmark geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SideCheck {
    Agrees,
    Disagrees,
    /// No pairs, or the droopy landmarks sit on the midline.
    Indeterminate,
}

/// Sign of the perpendicular offset the table side is expected to have.
///
/// Table "left" landmarks appear at smaller x in an unmirrored frame, which is
/// a negative offset against the midline normal; mirroring swaps it.
fn expected_sign(side: Side, hflip: bool) -> f32 {
    let sign = match side {
        Side::Left => -1.0,
        Side::Right => 1.0,
    };
    if hflip {
        -sign
    } else {
        sign
    }
}

/// check_droopy_side compares the configured droopy side against where the
/// droopy landmarks actually sit. The configuration stays authoritative; a
/// disagreement is reported and logged, never swapped.
pub fn check_droopy_side(metrics: &AsymmetryMetrics, hflip: bool) -> SideCheck {
    let mean = match metrics.mean_droopy_perp_offset() {
        Some(mean) if mean.abs() > SIDE_CHECK_EPSILON => mean,
        _ => return SideCheck::Indeterminate,
    };

    if mean.signum() == expected_sign(metrics.droopy_side, hflip) {
        SideCheck::Agrees
    } else {
        warn!(
            droopy = metrics.droopy_side.as_str(),
            hflip,
            mean_offset = mean,
            "configured droopy side disagrees with landmark positions"
        );
        SideCheck::Disagrees
    }
}
