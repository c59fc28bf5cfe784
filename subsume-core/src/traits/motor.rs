//! Wheel motor traits
//!
//! The core never drives PWM itself. The arbiter's winning command is
//! converted to [`WheelTargets`] and handed to a [`WheelServo`], which owns
//! the inner speed loop and the [`MotorOutput`]s.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Wheel rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Wheel drives the robot forward
    #[default]
    Forward,
    /// Wheel drives the robot backward
    Reverse,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    /// Signed multiplier for displacements (+1 forward, -1 reverse)
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }

    /// Direction implied by a signed rate, or `None` for zero
    pub fn from_rate(rate: i32) -> Option<Self> {
        match rate {
            r if r > 0 => Some(Direction::Forward),
            r if r < 0 => Some(Direction::Reverse),
            _ => None,
        }
    }
}

/// Per-wheel target rates in encoder ticks per cycle (signed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelTargets {
    pub left: i32,
    pub right: i32,
}

impl WheelTargets {
    /// Both wheels stopped
    pub const STOPPED: Self = Self { left: 0, right: 0 };

    /// Mix a layer command into wheel rates
    ///
    /// Positive `angle` turns counter-clockwise (right wheel faster).
    pub fn from_command(speed: i32, angle: i32) -> Self {
        Self {
            left: speed.saturating_sub(angle),
            right: speed.saturating_add(angle),
        }
    }

    /// Check if both wheels are commanded to stop
    pub fn is_stopped(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

/// Signed duty output for one wheel's H-bridge
pub trait MotorOutput {
    /// Apply a signed duty in [-255, 255]; the sign selects direction
    fn set_duty(&mut self, duty: i16);

    /// Stop driving the motor
    fn coast(&mut self) {
        self.set_duty(0);
    }
}

/// Inner speed loop from commanded wheel rates to motor duty
///
/// Called once per control cycle with the new targets and the ticks each
/// wheel actually produced during the previous cycle.
pub trait WheelServo {
    /// Close the loop for one cycle
    fn drive(&mut self, targets: WheelTargets, measured_left: u32, measured_right: u32);

    /// Stop both wheels immediately and clear loop state
    fn halt(&mut self);
}
