//! Differential-drive wheel servo
//!
//! Pairs one [`WheelPid`] with one [`MotorOutput`] per side.

use subsume_core::traits::{MotorOutput, WheelServo, WheelTargets};

use super::pid::{WheelPid, WheelPidConfig};

/// Encoder counts carry no sign; take it from the rate commanded while
/// they were produced
fn signed_ticks(measured: u32, commanded: i32) -> i32 {
    let magnitude = i32::try_from(measured).unwrap_or(i32::MAX);
    if commanded < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Two-wheel speed servo
pub struct DiffDriveServo<L, R> {
    left: WheelPid,
    right: WheelPid,
    left_motor: L,
    right_motor: R,
    /// Targets applied during the previous cycle
    last: WheelTargets,
}

impl<L: MotorOutput, R: MotorOutput> DiffDriveServo<L, R> {
    /// Create a servo with both motors coasting
    pub fn new(config: WheelPidConfig, mut left_motor: L, mut right_motor: R) -> Self {
        left_motor.coast();
        right_motor.coast();
        Self {
            left: WheelPid::new(config),
            right: WheelPid::new(config),
            left_motor,
            right_motor,
            last: WheelTargets::STOPPED,
        }
    }

    /// Left wheel loop
    pub fn left(&self) -> &WheelPid {
        &self.left
    }

    /// Right wheel loop
    pub fn right(&self) -> &WheelPid {
        &self.right
    }

    /// Left motor output
    pub fn left_motor(&self) -> &L {
        &self.left_motor
    }

    /// Right motor output
    pub fn right_motor(&self) -> &R {
        &self.right_motor
    }

    /// Give back the motor outputs
    pub fn release(self) -> (L, R) {
        (self.left_motor, self.right_motor)
    }
}

impl<L: MotorOutput, R: MotorOutput> WheelServo for DiffDriveServo<L, R> {
    fn drive(&mut self, targets: WheelTargets, measured_left: u32, measured_right: u32) {
        let left = self
            .left
            .update(targets.left, signed_ticks(measured_left, self.last.left));
        let right = self
            .right
            .update(targets.right, signed_ticks(measured_right, self.last.right));

        self.left_motor.set_duty(left);
        self.right_motor.set_duty(right);
        self.last = targets;
    }

    fn halt(&mut self) {
        self.left.reset();
        self.right.reset();
        self.left_motor.coast();
        self.right_motor.coast();
        self.last = WheelTargets::STOPPED;
    }
}
