//! H-bridge motor output
//!
//! One PWM channel sets the magnitude, two direction inputs select the
//! bridge leg (L298N / TB6612 style):
//!
//! | duty | in1  | in2  |
//! |------|------|------|
//! | > 0  | high | low  |
//! | < 0  | low  | high |
//! | 0    | low  | low  |

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use subsume_core::traits::MotorOutput;

/// Largest duty magnitude accepted by [`MotorOutput::set_duty`]
pub const FULL_DUTY: u16 = 255;

/// PWM plus two direction pins
pub struct HBridge<P, A, B> {
    pwm: P,
    in1: A,
    in2: B,
    /// Swap the direction pins for a motor mounted mirrored
    reversed: bool,
    duty: i16,
    faults: u32,
}

impl<P, A, B> HBridge<P, A, B>
where
    P: SetDutyCycle,
    A: OutputPin,
    B: OutputPin,
{
    /// Create a bridge, initially coasting
    pub fn new(pwm: P, in1: A, in2: B, reversed: bool) -> Self {
        let mut bridge = Self {
            pwm,
            in1,
            in2,
            reversed,
            duty: 0,
            faults: 0,
        };
        bridge.set_duty(0);
        bridge
    }

    /// Last applied duty
    pub fn duty(&self) -> i16 {
        self.duty
    }

    /// Number of writes the hardware rejected
    pub fn faults(&self) -> u32 {
        self.faults
    }

    /// Give back the PWM channel and pins
    pub fn release(self) -> (P, A, B) {
        (self.pwm, self.in1, self.in2)
    }

    fn apply(&mut self, forward: bool, backward: bool, magnitude: u16) -> bool {
        let (a, b) = if self.reversed {
            (backward, forward)
        } else {
            (forward, backward)
        };

        // Drop the PWM first so the bridge never drives through a stale leg
        let pwm_off = self.pwm.set_duty_cycle_fully_off().is_ok();
        let in1 = self.in1.set_state(a.into()).is_ok();
        let in2 = self.in2.set_state(b.into()).is_ok();
        let pwm = magnitude == 0 || self.pwm.set_duty_cycle_fraction(magnitude, FULL_DUTY).is_ok();
        pwm_off && in1 && in2 && pwm
    }
}

impl<P, A, B> MotorOutput for HBridge<P, A, B>
where
    P: SetDutyCycle,
    A: OutputPin,
    B: OutputPin,
{
    fn set_duty(&mut self, duty: i16) {
        let max = FULL_DUTY as i16;
        let duty = duty.clamp(-max, max);
        let magnitude = duty.unsigned_abs();

        if !self.apply(duty > 0, duty < 0, magnitude) {
            self.faults = self.faults.saturating_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("h-bridge write failed at duty {}", duty);
        }
        self.duty = duty;
    }
}
