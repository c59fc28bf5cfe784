//! Per-wheel speed loop
//!
//! Turns a target tick rate and the measured tick rate of the last cycle
//! into a signed duty. A feed-forward term gets the wheel moving, the PID
//! terms trim the remaining error. Integer-only so it runs on parts without
//! an FPU.

use subsume_core::traits::Direction;

use super::fixed::Q16;

/// Loop gains, in duty units per tick/cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidGains {
    /// Feed-forward on the target rate
    pub kf: Q16,
    pub kp: Q16,
    pub ki: Q16,
    pub kd: Q16,
}

impl PidGains {
    /// Gains given in hundredths
    ///
    /// ```
    /// use subsume_drivers::wheel::pid::PidGains;
    /// // kf=20, kp=8, ki=1, kd=0.5
    /// let gains = PidGains::from_hundredths(2000, 800, 100, 50);
    /// assert!(!gains.kd.is_zero());
    /// ```
    pub const fn from_hundredths(kf: i32, kp: i32, ki: i32, kd: i32) -> Self {
        Self {
            kf: Q16::from_hundredths(kf),
            kp: Q16::from_hundredths(kp),
            ki: Q16::from_hundredths(ki),
            kd: Q16::from_hundredths(kd),
        }
    }
}

/// Wheel loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelPidConfig {
    pub gains: PidGains,
    /// Integral term limit (duty units)
    pub integral_limit: i16,
    /// Output limit (duty units)
    pub max_duty: i16,
}

impl Default for WheelPidConfig {
    fn default() -> Self {
        Self {
            gains: PidGains::from_hundredths(2000, 800, 100, 50),
            integral_limit: 80,
            max_duty: 255,
        }
    }
}

/// Speed loop for one wheel
#[derive(Debug, Clone)]
pub struct WheelPid {
    config: WheelPidConfig,
    integral: Q16,
    prev_error: i32,
    direction: Option<Direction>,
    duty: i16,
}

impl WheelPid {
    /// Create an idle loop
    pub fn new(config: WheelPidConfig) -> Self {
        Self {
            config,
            integral: Q16::ZERO,
            prev_error: 0,
            direction: None,
            duty: 0,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &WheelPidConfig {
        &self.config
    }

    /// Duty produced by the last update
    pub fn duty(&self) -> i16 {
        self.duty
    }

    /// Direction of the last non-zero target
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Clear accumulated loop state
    pub fn reset(&mut self) {
        self.integral = Q16::ZERO;
        self.prev_error = 0;
        self.duty = 0;
    }

    /// Run one loop iteration
    ///
    /// `measured` is signed: ticks produced last cycle, negative when the
    /// wheel was turning in reverse.
    pub fn update(&mut self, target: i32, measured: i32) -> i16 {
        let Some(direction) = Direction::from_rate(target) else {
            self.reset();
            return 0;
        };

        // Windup from the other direction would fight the new command
        if self.direction.is_some_and(|previous| previous != direction) {
            self.reset();
        }
        self.direction = Some(direction);

        let gains = &self.config.gains;
        let error = target.saturating_sub(measured);

        self.integral = self
            .integral
            .saturating_add(gains.ki.scale(error))
            .limit(Q16::from_int(self.config.integral_limit));

        let feed_forward = gains.kf.scale(target);
        let proportional = gains.kp.scale(error);
        let derivative = gains.kd.scale(error.saturating_sub(self.prev_error));
        self.prev_error = error;

        let output = feed_forward + proportional + self.integral + derivative;
        let max = i32::from(self.config.max_duty);
        self.duty = output.round().clamp(-max, max) as i16;
        self.duty
    }
}
