//! Waypoint pursuit
//!
//! The [`Navigator`] owns the route and drives three layers:
//! - NAVIGATE steers straight at the current target, always active
//! - TURN_IN_PLACE rotates to a waypoint's heading on arrival
//! - TARGET_ACQUIRE takes over near a docking target

use heapless::Vec;

use crate::arbiter::{LayerId, Layers};
use crate::capacity::CapacityError;
use crate::config::{NavigationConfig, MAX_TARGETS};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::geometry::{normalize_angle, Pose, DEGS};

/// What to do at a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetKind {
    /// Pass-through waypoint
    #[default]
    Nav,
    /// Docking target, approached by TARGET_ACQUIRE
    Get,
}

/// A waypoint with an optional arrival heading
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Target {
    pub x: f64,
    pub y: f64,
    /// Heading to turn to on arrival (rad), `None` for any
    pub heading: Option<f64>,
    pub kind: TargetKind,
}

impl Target {
    /// Pass-through waypoint
    pub fn nav(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            heading: None,
            kind: TargetKind::Nav,
        }
    }

    /// Docking target
    pub fn dock(x: f64, y: f64) -> Self {
        Self {
            kind: TargetKind::Get,
            ..Self::nav(x, y)
        }
    }

    /// Require an arrival heading in radians
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(normalize_angle(heading));
        self
    }

    /// Require an arrival heading in degrees
    pub fn with_heading_degrees(self, degrees: f64) -> Self {
        self.with_heading(degrees * DEGS)
    }
}

/// Proportional steering toward a heading error, limited to `max`
fn steer(error: f64, gain: f64, max: i32) -> i32 {
    (libm::round(error * gain) as i32).clamp(-max, max)
}

/// Route and approach state
#[derive(Debug, Clone)]
pub struct Navigator {
    config: NavigationConfig,
    targets: Vec<Target, MAX_TARGETS>,
    current: usize,
    target_distance: f64,
    heading_error: f64,
    to_turn: Option<f64>,
}

impl Navigator {
    /// Create a navigator with an empty route
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            targets: Vec::new(),
            current: 0,
            target_distance: 0.0,
            heading_error: 0.0,
            to_turn: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Append a target to the route, returning its index
    pub fn add_target(&mut self, target: Target) -> Result<usize, CapacityError> {
        self.targets.push(target).map_err(|_| CapacityError)?;
        Ok(self.targets.len() - 1)
    }

    /// Every target in route order
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Index of the target being pursued
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Target being pursued, `None` once finished
    pub fn current_target(&self) -> Option<&Target> {
        self.targets.get(self.current)
    }

    /// Check if every target has been reached
    pub fn finished(&self) -> bool {
        self.current >= self.targets.len()
    }

    /// Distance to the current target at the last update (mm)
    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    /// Bearing of the current target relative to heading (rad)
    pub fn heading_error(&self) -> f64 {
        self.heading_error
    }

    /// Heading TURN_IN_PLACE is rotating to
    pub fn to_turn(&self) -> Option<f64> {
        self.to_turn
    }

    /// Check if the robot is within the immediate range of its target
    pub fn near_target(&self) -> bool {
        !self.finished() && self.target_distance < self.config.target_immediate_mm
    }

    /// Check if the current target is a docking target
    pub fn docking_target(&self) -> bool {
        self.current_target()
            .is_some_and(|target| target.kind == TargetKind::Get)
    }

    /// Refresh distance and heading error to the current target
    pub fn update(&mut self, pose: &Pose) {
        match self.targets.get(self.current) {
            Some(target) => {
                self.target_distance = pose.distance_to(target.x, target.y);
                self.heading_error = pose.bearing_to(target.x, target.y);
            }
            None => {
                self.target_distance = 0.0;
                self.heading_error = 0.0;
            }
        }
    }

    /// Arm TURN_IN_PLACE toward an absolute heading
    pub fn turn_to(&mut self, heading: f64) {
        self.to_turn = Some(normalize_angle(heading));
    }

    /// Restart the route from its first target
    pub fn restart(&mut self, pose: &Pose) {
        self.current = 0;
        self.to_turn = None;
        self.update(pose);
    }

    /// Mark the current target reached and move on
    fn arrive<D: DiagnosticSink>(&mut self, pose: &Pose, diag: &mut D) {
        if let Some(target) = self.targets.get(self.current) {
            diag.emit(Diagnostic::WaypointReached {
                index: self.current as u8,
            });
            if let Some(heading) = target.heading {
                self.to_turn = Some(heading);
            }
            self.current += 1;
            self.update(pose);
        }
    }

    /// Run the TARGET_ACQUIRE behavior
    pub fn locate_target<D: DiagnosticSink>(&mut self, pose: &Pose, layers: &mut Layers, diag: &mut D) {
        if !self.docking_target() {
            layers.get_mut(LayerId::TargetAcquire).active = false;
            return;
        }

        if self.target_distance < self.config.target_close_mm {
            layers.get_mut(LayerId::TargetAcquire).active = false;
            self.arrive(pose, diag);
        } else if self.target_distance < self.config.target_acquire_range_mm {
            let angle = steer(self.heading_error, self.config.turn_gain, self.config.turn_max);
            let layer = layers.get_mut(LayerId::TargetAcquire);
            layer.active = true;
            layer.command(self.config.dock_speed, angle);
        } else {
            layers.get_mut(LayerId::TargetAcquire).active = false;
        }
    }

    /// Run the NAVIGATE behavior
    pub fn navigate<D: DiagnosticSink>(&mut self, pose: &Pose, layers: &mut Layers, diag: &mut D) {
        if !self.finished()
            && !self.docking_target()
            && self.target_distance < self.config.target_close_mm
        {
            self.arrive(pose, diag);
        }

        let layer = layers.get_mut(LayerId::Navigate);
        layer.active = true;
        if self.finished() {
            layer.command(0, 0);
            return;
        }

        let speed = if self.target_distance < self.config.target_slow_mm {
            let scaled = self.config.top_speed as f64 * self.target_distance / self.config.target_slow_mm;
            (scaled as i32).max(self.config.min_speed)
        } else {
            self.config.top_speed
        };
        let angle = steer(self.heading_error, self.config.turn_gain, self.config.turn_max);
        layer.command(speed, angle);
    }

    /// Run the TURN_IN_PLACE behavior
    pub fn hard_turn(&mut self, pose: &Pose, layers: &mut Layers) {
        let layer = layers.get_mut(LayerId::TurnInPlace);
        let Some(heading) = self.to_turn else {
            layer.active = false;
            return;
        };

        let error = normalize_angle(heading - pose.theta);
        if libm::fabs(error) < self.config.turn_tolerance_rad {
            self.to_turn = None;
            layer.active = false;
            layer.command(0, 0);
        } else {
            let turn = if error > 0.0 {
                self.config.turn_speed
            } else {
                -self.config.turn_speed
            };
            layer.active = true;
            layer.command(0, turn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;
    use core::f64::consts::FRAC_PI_2;

    fn navigator() -> Navigator {
        Navigator::new(NavigationConfig::default())
    }

    fn run(nav: &mut Navigator, pose: &Pose, layers: &mut Layers, log: &mut DiagnosticLog<8>) {
        nav.update(pose);
        nav.locate_target(pose, layers, log);
        nav.navigate(pose, layers, log);
        nav.hard_turn(pose, layers);
    }

    #[test]
    fn test_capacity() {
        let mut nav = navigator();
        for i in 0..MAX_TARGETS {
            assert_eq!(nav.add_target(Target::nav(i as f64, 0.0)), Ok(i));
        }
        assert_eq!(nav.add_target(Target::nav(0.0, 0.0)), Err(CapacityError));
        assert_eq!(nav.targets().len(), MAX_TARGETS);
    }

    #[test]
    fn test_cruise_and_steer() {
        let mut nav = navigator();
        nav.add_target(Target::nav(1000.0, 0.0)).unwrap();
        let mut layers = Layers::new();
        let mut log = DiagnosticLog::new();

        run(&mut nav, &Pose::new(0.0, 0.0, 0.2), &mut layers, &mut log);

        let layer = layers.get(LayerId::Navigate);
        assert!(layer.active);
        assert_eq!(layer.speed, 10);
        // -0.2 rad * 8 rounds to -2
        assert_eq!(layer.angle, -2);
        assert!(!nav.near_target());
    }

    #[test]
    fn test_steering_is_limited() {
        assert_eq!(steer(3.0, 8.0, 6), 6);
        assert_eq!(steer(-3.0, 8.0, 6), -6);
        assert_eq!(steer(0.3, 8.0, 6), 2);
    }

    #[test]
    fn test_slows_on_approach() {
        let mut nav = navigator();
        nav.add_target(Target::nav(75.0, 0.0)).unwrap();
        let mut layers = Layers::new();
        let mut log = DiagnosticLog::new();

        run(&mut nav, &Pose::default(), &mut layers, &mut log);
        assert_eq!(layers.get(LayerId::Navigate).speed, 5);

        run(&mut nav, &Pose::new(50.0, 0.0, 0.0), &mut layers, &mut log);
        assert_eq!(layers.get(LayerId::Navigate).speed, 3);
        assert!(nav.near_target());
    }

    #[test]
    fn test_waypoint_advances_and_arms_turn() {
        let mut nav = navigator();
        nav.add_target(Target::nav(100.0, 0.0).with_heading_degrees(90.0))
            .unwrap();
        nav.add_target(Target::nav(100.0, 500.0)).unwrap();
        let mut layers = Layers::new();
        let mut log = DiagnosticLog::new();

        run(&mut nav, &Pose::new(95.0, 0.0, 0.0), &mut layers, &mut log);

        assert_eq!(nav.current_index(), 1);
        assert_eq!(log.pop(), Some(Diagnostic::WaypointReached { index: 0 }));
        let turn = layers.get(LayerId::TurnInPlace);
        assert!(turn.active);
        assert_eq!((turn.speed, turn.angle), (0, 4));

        // Within tolerance of 90°: turn complete
        run(&mut nav, &Pose::new(100.0, 0.0, FRAC_PI_2 - 0.01), &mut layers, &mut log);
        assert!(!layers.is_active(LayerId::TurnInPlace));
        assert_eq!(nav.to_turn(), None);
    }

    #[test]
    fn test_route_finishes_with_stop() {
        let mut nav = navigator();
        nav.add_target(Target::nav(10.0, 0.0)).unwrap();
        let mut layers = Layers::new();
        let mut log = DiagnosticLog::new();

        run(&mut nav, &Pose::default(), &mut layers, &mut log);

        assert!(nav.finished());
        let layer = layers.get(LayerId::Navigate);
        assert!(layer.active);
        assert_eq!((layer.speed, layer.angle), (0, 0));
        assert!(!nav.near_target());
    }

    #[test]
    fn test_dock_target_acquired_and_docked() {
        let mut nav = navigator();
        nav.add_target(Target::dock(0.0, 300.0)).unwrap();
        let mut layers = Layers::new();
        let mut log = DiagnosticLog::new();

        // Out of range: navigate only
        run(&mut nav, &Pose::new(0.0, 0.0, FRAC_PI_2), &mut layers, &mut log);
        assert!(!layers.is_active(LayerId::TargetAcquire));
        assert!(nav.docking_target());

        run(&mut nav, &Pose::new(0.0, 150.0, FRAC_PI_2), &mut layers, &mut log);
        let acquire = layers.get(LayerId::TargetAcquire);
        assert!(acquire.active);
        assert_eq!((acquire.speed, acquire.angle), (3, 0));

        run(&mut nav, &Pose::new(0.0, 290.0, FRAC_PI_2), &mut layers, &mut log);
        assert!(!layers.is_active(LayerId::TargetAcquire));
        assert!(nav.finished());
        assert_eq!(log.pop(), Some(Diagnostic::WaypointReached { index: 0 }));
    }

    #[test]
    fn test_dock_target_not_reached_by_navigate() {
        let mut nav = navigator();
        nav.add_target(Target::dock(10.0, 0.0)).unwrap();
        let mut layers = Layers::new();
        let mut log: DiagnosticLog<8> = DiagnosticLog::new();

        nav.update(&Pose::default());
        nav.navigate(&Pose::default(), &mut layers, &mut log);

        assert!(!nav.finished());
        assert!(log.is_empty());
    }
}
