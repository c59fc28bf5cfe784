//! Pose and grid geometry
//!
//! The arena is an axis-aligned grid of lines `grid_width` apart. Headings
//! are radians normalized to (-π, π], 0 along +x, counter-clockwise positive.

use core::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::config::GridConfig;

/// Radians per degree
pub const DEGS: f64 = PI / 180.0;

/// Global robot pose
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pose {
    /// Position along x (mm)
    pub x: f64,
    /// Position along y (mm)
    pub y: f64,
    /// Heading (rad), normalized to (-π, π]
    pub theta: f64,
}

impl Pose {
    /// Create a pose, normalizing the heading
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Straight-line distance to a point
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        libm::hypot(x - self.x, y - self.y)
    }

    /// Bearing of a point relative to the current heading, in (-π, π]
    pub fn bearing_to(&self, x: f64, y: f64) -> f64 {
        normalize_angle(libm::atan2(y - self.y, x - self.x) - self.theta)
    }
}

/// Wrap an angle into (-π, π]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = libm::remainder(angle, TAU);
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Nearest cardinal heading in whole degrees (0, 90, 180 or 270)
///
/// The grid is axis-aligned, so a line crossing is always measured against
/// one of these.
pub fn square_heading(theta: f64) -> i32 {
    let quarter_turns = libm::round(theta / FRAC_PI_2) as i32;
    quarter_turns.rem_euclid(4) * 90
}

/// Offset of a coordinate from the grid line below it
///
/// Truncates toward zero and mirrors negative coordinates, the way the
/// line sensors see a symmetric grid around the origin.
fn grid_offset(coordinate: f64, grid: &GridConfig) -> u32 {
    (coordinate as i32).unsigned_abs() % grid.grid_width
}

/// Check whether a coordinate lies within the margin of a grid line
pub fn near_grid_line(coordinate: f64, grid: &GridConfig) -> bool {
    let offset = grid_offset(coordinate, grid);
    offset < grid.intersection_too_close
        || offset > grid.grid_width - grid.intersection_too_close
}

/// Check whether exactly one axis is near a grid line
///
/// Neither axis near a line means there is nothing to correct against;
/// both near means an intersection, where crossings are ambiguous.
pub fn far_from_intersection(x: f64, y: f64, grid: &GridConfig) -> bool {
    near_grid_line(x, grid) ^ near_grid_line(y, grid)
}

/// Round a coordinate to the nearest grid line
pub fn nearest_grid_line(coordinate: f64, grid: &GridConfig) -> f64 {
    let width = grid.grid_width as f64;
    libm::round(coordinate / width) * width
}

/// Snap the pose onto the grid line it is currently crossing
///
/// Each axis is handled independently: an axis inside the line margin is
/// rounded to its nearest line, the other axis is left alone.
pub fn snap_to_grid(pose: &mut Pose, grid: &GridConfig) {
    if near_grid_line(pose.x, grid) {
        pose.x = nearest_grid_line(pose.x, grid);
    }
    if near_grid_line(pose.y, grid) {
        pose.y = nearest_grid_line(pose.y, grid);
    }
}
