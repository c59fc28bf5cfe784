//! Robot state aggregate and control cycle
//!
//! [`Robot`] owns every piece of control state and runs one control cycle
//! per call to [`Robot::cycle`]:
//!
//! 1. Fold the encoder snapshot into the pose
//! 2. Refresh the line sensors and run the line corrections
//! 3. Let each behavior write its layer intention
//! 4. Arbitrate and latch the wheel directions for the next fold
//!
//! A new robot is stopped; call [`Robot::start`] to release it.

use crate::arbiter::{Arbiter, Arbitration, LayerId, Layers};
use crate::boundary::{AvoidanceContext, BoundaryField};
use crate::capacity::{index_or_sentinel, CapacityError};
use crate::config::{ConfigError, RobotConfig};
use crate::correction::{CrossingInput, GridCorrector, PassiveCorrector, PassiveState};
use crate::diagnostics::{DiagnosticLog, DIAGNOSTIC_LOG_DEPTH};
use crate::geometry::{far_from_intersection, Pose};
use crate::navigation::{Navigator, Target};
use crate::odometry::{OdometryEngine, WheelDirections, WheelTicks};
use crate::sensors::{LineSensor, LineSensors};
use crate::traits::{Direction, WheelServo, WheelTargets};

/// Complete control state of one robot
#[derive(Debug, Clone)]
pub struct Robot {
    config: RobotConfig,
    pose: Pose,
    odometry: OdometryEngine,
    sensors: LineSensors,
    layers: Layers,
    arbiter: Arbiter,
    boundaries: BoundaryField,
    navigator: Navigator,
    passive: PassiveCorrector,
    grid: GridCorrector,
    diagnostics: DiagnosticLog<DIAGNOSTIC_LOG_DEPTH>,
    correction: bool,
    last: Arbitration,
}

impl Robot {
    /// Create a stopped robot at the origin facing +x
    pub fn new(config: RobotConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut arbiter = Arbiter::new();
        arbiter.halt();

        Ok(Self {
            pose: Pose::default(),
            odometry: OdometryEngine::new(config.odometry),
            sensors: LineSensors::new(),
            layers: Layers::new(),
            arbiter,
            boundaries: BoundaryField::new(config.boundary),
            navigator: Navigator::new(config.navigation),
            passive: PassiveCorrector::new(config.correction),
            grid: GridCorrector::new(),
            diagnostics: DiagnosticLog::new(),
            correction: true,
            last: Arbitration {
                layer: LayerId::Navigate,
                speed: 0,
                angle: 0,
                halted: true,
            },
            config,
        })
    }

    /// Run one control cycle
    ///
    /// `ticks` must be a single snapshot of the encoder counters taken at
    /// the top of the cycle; `on_lines` is this cycle's sensor bitmap.
    pub fn cycle(&mut self, ticks: WheelTicks, on_lines: u8) -> Arbitration {
        self.odometry.step(ticks, &mut self.pose);
        self.sensors.refresh(on_lines);

        if self.correction {
            self.correct();
        }

        self.navigator.update(&self.pose);
        self.navigator
            .locate_target(&self.pose, &mut self.layers, &mut self.diagnostics);
        self.navigator
            .navigate(&self.pose, &mut self.layers, &mut self.diagnostics);
        self.navigator.hard_turn(&self.pose, &mut self.layers);

        let context = AvoidanceContext {
            turning: self.layers.is_active(LayerId::TurnInPlace),
            acquiring: self.layers.is_active(LayerId::TargetAcquire),
            docking_target: self.navigator.docking_target(),
            near_target: self.navigator.near_target(),
        };
        self.boundaries.avoid(
            &self.pose,
            context,
            self.config.navigation.top_speed,
            self.layers.get_mut(LayerId::BoundaryAvoid),
            &mut self.diagnostics,
        );

        let arbitration = self.arbiter.arbitrate(&self.layers);

        #[cfg(feature = "defmt")]
        if arbitration.layer != self.last.layer {
            defmt::debug!("layer {} -> {}", self.last.layer, arbitration.layer);
        }

        self.last = arbitration;
        self.latch_directions();
        arbitration
    }

    /// Run both line-correction machines
    fn correct(&mut self) {
        let grid = &self.config.grid;
        // Sign of the layer driving the robot since the last arbitration
        let reversing = self.layers.get(self.arbiter.selected()).speed < 0;
        let input = CrossingInput {
            on_lines: self.sensors.current(),
            current_distance: self.odometry.current_distance(),
            tot_distance: self.odometry.tot_distance(),
            far_from_intersection: far_from_intersection(self.pose.x, self.pose.y, grid),
            reversing,
            heading: self.pose.theta,
        };
        if let Some(theta) = self.passive.update(&input, &mut self.diagnostics) {
            self.pose.theta = theta;
        }

        self.grid.update(
            self.sensors.on_line(LineSensor::Center),
            &mut self.pose,
            grid,
            &mut self.diagnostics,
        );
    }

    /// Record the commanded wheel directions for the next odometry fold
    fn latch_directions(&mut self) {
        let targets = self.wheel_targets();
        let current = self.odometry.directions();
        let directions = WheelDirections {
            left: Direction::from_rate(targets.left).unwrap_or(current.left),
            right: Direction::from_rate(targets.right).unwrap_or(current.right),
        };
        self.odometry.set_directions(directions, &mut self.pose);
    }

    /// Wheel rates for the last arbitration
    pub fn wheel_targets(&self) -> WheelTargets {
        if self.last.halted {
            WheelTargets::STOPPED
        } else {
            WheelTargets::from_command(self.last.speed, self.last.angle)
        }
    }

    /// Hand the last arbitration to the wheel servo loop
    pub fn drive<S: WheelServo>(&self, servo: &mut S) {
        if self.last.halted {
            servo.halt();
        } else {
            let measured = self.odometry.cycle_ticks();
            servo.drive(self.wheel_targets(), measured.left, measured.right);
        }
    }

    /// Register a boundary, returning its index
    pub fn add_boundary(&mut self, x: f64, y: f64, radius: f64) -> Result<usize, CapacityError> {
        self.boundaries.add(x, y, radius)
    }

    /// Register a boundary, returning its index or -1 when full
    pub fn add_boundary_index(&mut self, x: f64, y: f64, radius: f64) -> i32 {
        index_or_sentinel(self.add_boundary(x, y, radius))
    }

    /// Append a target to the route, returning its index
    pub fn add_target(&mut self, target: Target) -> Result<usize, CapacityError> {
        self.navigator.add_target(target)
    }

    /// Append a target to the route, returning its index or -1 when full
    pub fn add_target_index(&mut self, target: Target) -> i32 {
        index_or_sentinel(self.add_target(target))
    }

    /// Overwrite the pose estimate
    ///
    /// Any line crossing in progress is abandoned.
    pub fn set_coordinate(&mut self, x: f64, y: f64, theta: f64) {
        self.pose = Pose::new(x, y, theta);
        self.passive.reset();
        self.grid.reset();
        self.navigator.update(&self.pose);
    }

    /// Rotate in place to an absolute heading (rad)
    pub fn turn_to(&mut self, heading: f64) {
        self.navigator.turn_to(heading);
    }

    /// Drive the route again from its first target
    pub fn restart_route(&mut self) {
        self.navigator.restart(&self.pose);
    }

    /// Release the robot to drive
    pub fn start(&mut self) {
        self.arbiter.resume();
    }

    /// Stop until [`Robot::start`] or [`Robot::resume_drive`]
    pub fn stop(&mut self) {
        self.arbiter.halt();
    }

    /// Stop for a number of cycles, then resume arbitration
    pub fn hard_break(&mut self, cycles: u16) {
        self.arbiter.hard_break(cycles);
    }

    /// Cancel any hard stop
    pub fn resume_drive(&mut self) {
        self.arbiter.resume();
    }

    /// Let the arbiter select a layer again
    pub fn enable_layer(&mut self, id: LayerId) {
        self.arbiter.enable_layer(id);
    }

    /// Keep the arbiter from selecting a layer; NAVIGATE stays allowed
    pub fn disable_layer(&mut self, id: LayerId) {
        self.arbiter.disable_layer(id);
    }

    /// Check if the arbiter may select a layer
    pub fn allowed_layer(&self, id: LayerId) -> bool {
        self.arbiter.allowed_layer(id)
    }

    /// Layer that won the last arbitration
    pub fn active_layer(&self) -> LayerId {
        self.arbiter.selected()
    }

    /// Turn the line corrections on or off
    pub fn set_correction(&mut self, enabled: bool) {
        self.correction = enabled;
        if !enabled {
            self.passive.reset();
            self.grid.reset();
        }
    }

    /// Check if the line corrections run
    pub fn correction_enabled(&self) -> bool {
        self.correction
    }

    /// Configuration the robot was built with
    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    /// Current pose estimate
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Path length folded into the pose (mm)
    pub fn tot_distance(&self) -> f64 {
        self.odometry.tot_distance()
    }

    /// Path length including ticks not yet folded (mm)
    pub fn current_distance(&self) -> f64 {
        self.odometry.current_distance()
    }

    /// Wheel directions used for the next fold
    pub fn directions(&self) -> WheelDirections {
        self.odometry.directions()
    }

    /// Distance to the current target (mm)
    pub fn target_distance(&self) -> f64 {
        self.navigator.target_distance()
    }

    /// Bearing of the current target relative to heading (rad)
    pub fn heading_error(&self) -> f64 {
        self.navigator.heading_error()
    }

    /// Target being pursued, `None` once the route is done
    pub fn current_target(&self) -> Option<&Target> {
        self.navigator.current_target()
    }

    /// Route and approach state
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Registered boundaries
    pub fn boundaries(&self) -> &BoundaryField {
        &self.boundaries
    }

    /// Layer intentions written this cycle
    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// Arbiter state
    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Line sensor state
    pub fn sensors(&self) -> &LineSensors {
        &self.sensors
    }

    /// Passive heading correction state
    pub fn passive_state(&self) -> &PassiveState {
        self.passive.state()
    }

    /// Grid correction debounce and tally
    pub fn grid_corrector(&self) -> &GridCorrector {
        &self.grid
    }

    /// Last arbitration result
    pub fn last_arbitration(&self) -> Arbitration {
        self.last
    }

    /// Buffered diagnostic events
    pub fn diagnostics(&self) -> &DiagnosticLog<DIAGNOSTIC_LOG_DEPTH> {
        &self.diagnostics
    }

    /// Mutable access for draining diagnostics
    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticLog<DIAGNOSTIC_LOG_DEPTH> {
        &mut self.diagnostics
    }
}
