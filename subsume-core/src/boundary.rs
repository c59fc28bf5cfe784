//! Boundary threat model
//!
//! Boundaries are circular keep-out zones. Each cycle every boundary gets a
//! distance, a bearing and a threat score; the most threatening one becomes
//! the active boundary and stays active until the robot is far enough away.
//! While a boundary is active, BOUNDARY_AVOID steers to keep it broadside.

use core::f64::consts::FRAC_PI_2;

use heapless::Vec;

use crate::arbiter::Layer;
use crate::capacity::CapacityError;
use crate::config::{BoundaryConfig, MAX_BOUNDARIES};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::geometry::Pose;

/// Threat assigned to a boundary the robot is already inside
///
/// Far above anything [`threat_level`] can produce.
pub const EXISTENTIAL_THREAT: f64 = 1.0e9;

/// A circular keep-out zone
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Boundary {
    x: f64,
    y: f64,
    radius: f64,
    distance: f64,
    theta: f64,
    threat: f64,
}

impl Boundary {
    /// Create a boundary; a zero radius is a point obstacle
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            radius,
            distance: 0.0,
            theta: 0.0,
            threat: 0.0,
        }
    }

    /// Center x (mm)
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Center y (mm)
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Radius (mm)
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Clearance from the robot to the boundary edge at the last evaluation (mm)
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Bearing relative to the robot heading at the last evaluation (rad)
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Threat score at the last evaluation
    pub fn threat(&self) -> f64 {
        self.threat
    }

    /// Check if the robot was inside this boundary at the last evaluation
    pub fn is_colliding(&self) -> bool {
        self.threat >= EXISTENTIAL_THREAT
    }

    /// Recompute the derived fields for a pose
    pub fn evaluate(&mut self, pose: &Pose, config: &BoundaryConfig) {
        let raw_distance = pose.distance_to(self.x, self.y) - self.radius;
        self.theta = pose.bearing_to(self.x, self.y);

        if raw_distance <= 0.0 {
            self.distance = 0.0;
            self.threat = EXISTENTIAL_THREAT;
        } else {
            self.distance = raw_distance;
            self.threat = threat_level(raw_distance, self.theta, config);
        }
    }
}

/// Threat of a boundary at `distance` and bearing `theta`
///
/// Grows as the boundary gets closer and more directly ahead, and falls to
/// zero at `too_close_mm` or at the edge of the bearing tolerance.
pub fn threat_level(distance: f64, theta: f64, config: &BoundaryConfig) -> f64 {
    let off_axis = libm::fabs(theta);
    if distance < config.too_close_mm && off_axis < config.tolerance_rad {
        (config.too_close_mm - distance) * (config.tolerance_rad - off_axis) / config.tolerance_rad
    } else {
        0.0
    }
}

/// Angular command that keeps a boundary at ±90° bearing
fn hug_angle(theta: f64, turn: i32) -> i32 {
    if theta > 0.0 {
        // Boundary on the left: turn away, unless already past broadside
        if theta > FRAC_PI_2 {
            turn
        } else {
            -turn
        }
    } else if theta < -FRAC_PI_2 {
        -turn
    } else {
        turn
    }
}

/// Conditions under which boundary avoidance stands down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AvoidanceContext {
    /// TURN_IN_PLACE is active
    pub turning: bool,
    /// TARGET_ACQUIRE is active
    pub acquiring: bool,
    /// Current target is a docking target
    pub docking_target: bool,
    /// Robot is within the immediate range of its current target
    pub near_target: bool,
}

impl AvoidanceContext {
    /// Check if avoidance must not override the current maneuver
    pub fn suppresses_avoidance(&self) -> bool {
        self.turning || self.acquiring || self.docking_target || self.near_target
    }
}

/// Registered boundaries and the hysteresis-selected active one
#[derive(Debug, Clone)]
pub struct BoundaryField {
    config: BoundaryConfig,
    boundaries: Vec<Boundary, MAX_BOUNDARIES>,
    active: Option<usize>,
}

impl BoundaryField {
    /// Create an empty field
    pub fn new(config: BoundaryConfig) -> Self {
        Self {
            config,
            boundaries: Vec::new(),
            active: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    /// Register a boundary, returning its index
    ///
    /// The field is left unchanged when full.
    pub fn add(&mut self, x: f64, y: f64, radius: f64) -> Result<usize, CapacityError> {
        self.boundaries
            .push(Boundary::new(x, y, radius))
            .map_err(|_| CapacityError)?;
        Ok(self.boundaries.len() - 1)
    }

    /// Number of registered boundaries
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Check if no boundaries are registered
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Get a boundary by index
    pub fn get(&self, index: usize) -> Option<&Boundary> {
        self.boundaries.get(index)
    }

    /// Iterate boundaries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Boundary> {
        self.boundaries.iter()
    }

    /// Index of the active boundary
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Recompute distance, bearing and threat of every boundary
    pub fn evaluate(&mut self, pose: &Pose) {
        for boundary in self.boundaries.iter_mut() {
            boundary.evaluate(pose, &self.config);
        }
    }

    /// Index of the highest positive threat, first one on ties
    fn leader(&self) -> Option<usize> {
        let mut leader = None;
        let mut max_threat = 0.0;
        for (i, boundary) in self.boundaries.iter().enumerate() {
            if boundary.threat > max_threat {
                max_threat = boundary.threat;
                leader = Some(i);
            }
        }
        leader
    }

    /// Run the BOUNDARY_AVOID behavior for one cycle
    ///
    /// Writes the layer intention. `top_speed` is the navigation cruise
    /// speed; avoidance runs at half of it.
    pub fn avoid<D: DiagnosticSink>(
        &mut self,
        pose: &Pose,
        context: AvoidanceContext,
        top_speed: i32,
        layer: &mut Layer,
        diag: &mut D,
    ) {
        // Release uses last cycle's distance
        if let Some(index) = self.active {
            if self.boundaries[index].distance > self.config.far_enough_mm {
                self.active = None;
                layer.active = false;
                diag.emit(Diagnostic::BoundaryReleased { index: index as u8 });
            }
        }

        self.evaluate(pose);

        if context.suppresses_avoidance() {
            layer.active = false;
            return;
        }

        if let Some(leader) = self.leader() {
            if self.active != Some(leader) {
                diag.emit(Diagnostic::BoundaryEngaged {
                    index: leader as u8,
                });
            }
            self.active = Some(leader);
        }

        if let Some(index) = self.active {
            let boundary = &self.boundaries[index];
            // Only a collision forces the layer on
            if boundary.is_colliding() {
                layer.active = true;
            }
            layer.command(top_speed / 2, hug_angle(boundary.theta, self.config.turn));
        }
    }
}
