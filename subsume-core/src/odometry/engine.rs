//! Dead-reckoning from encoder ticks
//!
//! Encoders only count edges, they cannot tell which way a wheel turned.
//! The sign of each wheel's displacement comes from the direction the wheel
//! was last commanded in ([`WheelDirections`]).

use super::ticks::WheelTicks;
use crate::config::OdometryConfig;
use crate::geometry::{normalize_angle, Pose};
use crate::traits::Direction;

/// Commanded direction of each wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelDirections {
    pub left: Direction,
    pub right: Direction,
}

/// Odometry integrator
///
/// Holds the latest tick snapshot every cycle and folds it into the pose
/// every `integrate_every` cycles. Between folds, [`current_distance`]
/// still accounts for the held ticks.
///
/// [`current_distance`]: OdometryEngine::current_distance
#[derive(Debug, Clone)]
pub struct OdometryEngine {
    config: OdometryConfig,
    /// Cumulative path length (mm), never decreases
    tot_distance: f64,
    /// Counter values already folded into the pose
    folded: WheelTicks,
    /// Snapshot held for the current cycle
    held: WheelTicks,
    /// Snapshot held during the previous cycle
    previous: WheelTicks,
    directions: WheelDirections,
    cycles_since_fold: u8,
    /// First snapshot seen; counters may not start at zero
    primed: bool,
}

impl OdometryEngine {
    /// Create an engine with zero travelled distance
    pub fn new(config: OdometryConfig) -> Self {
        Self {
            config,
            tot_distance: 0.0,
            folded: WheelTicks::ZERO,
            held: WheelTicks::ZERO,
            previous: WheelTicks::ZERO,
            directions: WheelDirections::default(),
            cycles_since_fold: 0,
            primed: false,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &OdometryConfig {
        &self.config
    }

    /// Cumulative distance folded so far (mm)
    pub fn tot_distance(&self) -> f64 {
        self.tot_distance
    }

    /// Cumulative distance including held ticks not yet folded (mm)
    pub fn current_distance(&self) -> f64 {
        let (left, right) = self.displacements(self.in_flight());
        self.tot_distance + libm::fabs(left + right) * 0.5
    }

    /// Ticks held but not yet folded into the pose
    pub fn in_flight(&self) -> WheelTicks {
        self.held.since(self.folded)
    }

    /// Ticks each wheel produced between the last two snapshots
    pub fn cycle_ticks(&self) -> WheelTicks {
        self.held.since(self.previous)
    }

    /// Current wheel direction flags
    pub fn directions(&self) -> WheelDirections {
        self.directions
    }

    /// Hold this cycle's counter snapshot
    pub fn hold(&mut self, snapshot: WheelTicks) {
        if !self.primed {
            self.folded = snapshot;
            self.held = snapshot;
            self.primed = true;
        }
        self.previous = self.held;
        self.held = snapshot;
    }

    /// Hold a snapshot and fold it if the integration period elapsed
    ///
    /// Returns true if the pose was updated.
    pub fn step(&mut self, snapshot: WheelTicks, pose: &mut Pose) -> bool {
        self.hold(snapshot);
        self.cycles_since_fold = self.cycles_since_fold.saturating_add(1);

        if self.cycles_since_fold >= self.config.integrate_every {
            self.integrate(pose);
            true
        } else {
            false
        }
    }

    /// Fold all held ticks into distance and pose
    pub fn integrate(&mut self, pose: &mut Pose) {
        self.cycles_since_fold = 0;

        let ticks = self.in_flight();
        self.folded = self.held;
        if ticks.is_zero() {
            return;
        }

        let (left, right) = self.displacements(ticks);
        let distance = (left + right) * 0.5;
        let dtheta = (right - left) / self.config.wheel_base_mm;

        // Mid-point integration: travel along the average heading
        let mid_theta = pose.theta + dtheta * 0.5;
        pose.x += distance * libm::cos(mid_theta);
        pose.y += distance * libm::sin(mid_theta);
        pose.theta = normalize_angle(pose.theta + dtheta);

        self.tot_distance += libm::fabs(distance);
    }

    /// Change the wheel direction flags
    ///
    /// Ticks already held were produced under the old directions, so they
    /// are folded first when a direction actually flips.
    pub fn set_directions(&mut self, directions: WheelDirections, pose: &mut Pose) {
        if directions != self.directions && !self.in_flight().is_zero() {
            self.integrate(pose);
        }
        self.directions = directions;
    }

    /// Signed per-wheel displacement (mm) for a tick count
    fn displacements(&self, ticks: WheelTicks) -> (f64, f64) {
        let left = self.directions.left.sign() * ticks.left as f64 * self.config.mm_per_tick_left;
        let right =
            self.directions.right.sign() * ticks.right as f64 * self.config.mm_per_tick_right;
        (left, right)
    }
}
