//! Configuration type definitions
//!
//! Lengths are millimetres, angles are radians, and layer speeds are
//! encoder ticks per control cycle.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of registered boundaries
pub const MAX_BOUNDARIES: usize = 10;

/// Maximum number of registered targets
pub const MAX_TARGETS: usize = 16;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A distance-per-tick scale is zero or negative
    NonPositiveTickScale,
    /// Wheel base is zero or negative
    NonPositiveWheelBase,
    /// Odometry must fold ticks at least once per cycle
    ZeroIntegrationPeriod,
    /// Boundary release distance must exceed the activation distance
    HysteresisInverted,
    /// An angular tolerance is zero or negative
    NonPositiveTolerance,
    /// Grid cells must be wider than both intersection margins
    GridTooNarrow,
    /// Side sensor separation is zero or negative
    NonPositiveSensorSeparation,
    /// Stored blob does not start with the config magic
    BadMagic,
    /// Stored blob has an unsupported version
    VersionMismatch,
    /// Stored blob could not be decoded
    Deserialize,
    /// Output buffer too small to encode the config
    Serialize,
}

/// Encoder and kinematics calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OdometryConfig {
    /// Distance travelled by the left wheel per encoder tick (mm)
    pub mm_per_tick_left: f64,
    /// Distance travelled by the right wheel per encoder tick (mm)
    pub mm_per_tick_right: f64,
    /// Distance between the wheel contact points (mm)
    pub wheel_base_mm: f64,
    /// Fold held ticks into the pose every this many cycles
    pub integrate_every: u8,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            mm_per_tick_left: 0.785,
            mm_per_tick_right: 0.785,
            wheel_base_mm: 125.0,
            integrate_every: 5,
        }
    }
}

/// Boundary avoidance thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundaryConfig {
    /// Boundaries closer than this can generate threat (mm)
    pub too_close_mm: f64,
    /// The active boundary is released beyond this distance (mm)
    pub far_enough_mm: f64,
    /// Bearing window in which a boundary is considered ahead (rad)
    pub tolerance_rad: f64,
    /// Angular command used while hugging a boundary
    pub turn: i32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            too_close_mm: 150.0,
            far_enough_mm: 220.0,
            tolerance_rad: 1.0,
            turn: 4,
        }
    }
}

/// Waypoint pursuit, turn-in-place and docking parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationConfig {
    /// Full forward speed
    pub top_speed: i32,
    /// Speed floor while slowing on approach
    pub min_speed: i32,
    /// Angular command while turning in place
    pub turn_speed: i32,
    /// Proportional steering gain (angle units per radian)
    pub turn_gain: f64,
    /// Steering command limit
    pub turn_max: i32,
    /// Waypoint is reached inside this distance (mm)
    pub target_close_mm: f64,
    /// Boundary avoidance is suppressed inside this distance (mm)
    pub target_immediate_mm: f64,
    /// Start slowing down inside this distance (mm)
    pub target_slow_mm: f64,
    /// Docking behavior takes over inside this distance of a GET target (mm)
    pub target_acquire_range_mm: f64,
    /// Speed while docking
    pub dock_speed: i32,
    /// Turn in place finishes when heading error is below this (rad)
    pub turn_tolerance_rad: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            top_speed: 10,
            min_speed: 3,
            turn_speed: 4,
            turn_gain: 8.0,
            turn_max: 6,
            target_close_mm: 20.0,
            target_immediate_mm: 60.0,
            target_slow_mm: 150.0,
            target_acquire_range_mm: 200.0,
            dock_speed: 3,
            turn_tolerance_rad: 0.05,
        }
    }
}

/// Passive heading correction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrectionConfig {
    /// Lateral distance between the left and right line sensors (mm)
    pub side_sensor_distance_mm: f64,
    /// A crossing that has not resolved after this much travel is dropped (mm)
    pub too_far_mm: f64,
    /// Maximum difference between the two half-crossing distances (mm)
    pub crossing_tolerance_mm: f64,
    /// Gated cycles to wait after a correction attempt
    pub cool_down_cycles: u8,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            side_sensor_distance_mm: 100.0,
            too_far_mm: 250.0,
            crossing_tolerance_mm: 20.0,
            cool_down_cycles: 20,
        }
    }
}

/// Line grid geometry and grid correction debounce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    /// Spacing between parallel grid lines (mm)
    pub grid_width: u32,
    /// Margin around a grid line that counts as "near" it (mm)
    pub intersection_too_close: u32,
    /// Minimum consecutive on-line cycles for a genuine crossing
    pub cycles_crossing_line: u16,
    /// Crossings counted before a snap is attempted
    pub lines_per_correct: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_width: 200,
            intersection_too_close: 20,
            cycles_crossing_line: 3,
            lines_per_correct: 2,
        }
    }
}

/// Complete control core configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RobotConfig {
    pub odometry: OdometryConfig,
    pub boundary: BoundaryConfig,
    pub navigation: NavigationConfig,
    pub correction: CorrectionConfig,
    pub grid: GridConfig,
}

impl RobotConfig {
    /// Check cross-field constraints
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let odo = &self.odometry;
        if !(odo.mm_per_tick_left > 0.0 && odo.mm_per_tick_right > 0.0) {
            return Err(ConfigError::NonPositiveTickScale);
        }
        if !(odo.wheel_base_mm > 0.0) {
            return Err(ConfigError::NonPositiveWheelBase);
        }
        if odo.integrate_every == 0 {
            return Err(ConfigError::ZeroIntegrationPeriod);
        }

        let bound = &self.boundary;
        if !(bound.far_enough_mm > bound.too_close_mm) {
            return Err(ConfigError::HysteresisInverted);
        }
        if !(bound.tolerance_rad > 0.0) || !(self.navigation.turn_tolerance_rad > 0.0) {
            return Err(ConfigError::NonPositiveTolerance);
        }

        if self.grid.grid_width <= 2 * self.grid.intersection_too_close {
            return Err(ConfigError::GridTooNarrow);
        }
        if !(self.correction.side_sensor_distance_mm > 0.0) {
            return Err(ConfigError::NonPositiveSensorSeparation);
        }

        Ok(())
    }
}
