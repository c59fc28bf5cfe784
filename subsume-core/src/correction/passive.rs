//! Passive heading correction
//!
//! Crossing a line at an angle trips one side sensor first, then the center,
//! then the other side. The distance travelled between the side triggers,
//! against the fixed side sensor separation, gives the crossing angle
//! relative to the nearest cardinal heading.

use crate::config::CorrectionConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::geometry::{normalize_angle, square_heading, DEGS};
use crate::sensors::{LineMask, LineSensor};

/// Status bit set once the left sensor has crossed the line
const PASSED_LEFT_BIT: u8 = 1 << 3;
/// Status bit set once the right sensor has crossed the line
const PASSED_RIGHT_BIT: u8 = 1 << 4;

/// Progress through one line crossing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Crossing {
    /// Distance when the first side sensor triggered
    pub initial: f64,
    /// Side sensor that triggered first (left when both did)
    pub leading: LineSensor,
    /// Sensors that have been on the line since activation
    pub seen: LineMask,
    /// Side sensors that have come back off the line
    pub passed: LineMask,
}

impl Crossing {
    fn new(initial: f64, seen: LineMask) -> Self {
        let leading = if seen.has(LineSensor::Left) {
            LineSensor::Left
        } else {
            LineSensor::Right
        };
        Self {
            initial,
            leading,
            seen,
            passed: LineMask::NONE,
        }
    }

    /// Diagnostic status bitmap: seen sensors in bits 0-2, passed sides in 3-4
    pub fn status(&self) -> u8 {
        let mut status = self.seen.bits();
        if self.passed.has(LineSensor::Left) {
            status |= PASSED_LEFT_BIT;
        }
        if self.passed.has(LineSensor::Right) {
            status |= PASSED_RIGHT_BIT;
        }
        status
    }

    /// Record this cycle's sensors
    fn track(&mut self, on: LineMask) {
        self.seen |= on;
        for side in [LineSensor::Left, LineSensor::Right] {
            if self.seen.has(side) && !on.has(side) {
                self.passed |= side.mask();
            }
        }
    }

    /// One side fully across while the other has reached the line
    fn is_resolved(&self) -> bool {
        (self.passed.has(LineSensor::Left) && self.seen.has(LineSensor::Right))
            || (self.passed.has(LineSensor::Right) && self.seen.has(LineSensor::Left))
    }
}

/// Passive correction state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PassiveState {
    /// Waiting for a side sensor
    #[default]
    Idle,
    /// A side sensor triggered, center not yet seen
    OneSideTriggered(Crossing),
    /// Center sensor has been on the line during this crossing
    CenterSeen(Crossing),
    /// Ignoring lines for a number of gated cycles after an attempt
    CoolingDown { remaining: u8 },
}

impl PassiveState {
    fn tracking(crossing: Crossing) -> Self {
        if crossing.seen.has(LineSensor::Center) {
            PassiveState::CenterSeen(crossing)
        } else {
            PassiveState::OneSideTriggered(crossing)
        }
    }

    /// Crossing in progress, if any
    pub fn crossing(&self) -> Option<&Crossing> {
        match self {
            PassiveState::OneSideTriggered(crossing) | PassiveState::CenterSeen(crossing) => {
                Some(crossing)
            }
            _ => None,
        }
    }

    /// Check if a cooldown window is running
    pub fn is_cooling_down(&self) -> bool {
        matches!(self, PassiveState::CoolingDown { .. })
    }
}

/// Per-cycle inputs to the passive corrector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingInput {
    /// Sensors on a line this cycle
    pub on_lines: LineMask,
    /// Distance including ticks not yet folded
    pub current_distance: f64,
    /// Folded distance
    pub tot_distance: f64,
    /// Pose is far from any grid intersection
    pub far_from_intersection: bool,
    /// Selected layer is commanding reverse
    pub reversing: bool,
    /// Current heading estimate (rad)
    pub heading: f64,
}

/// Heading correction from oblique line crossings
#[derive(Debug, Clone)]
pub struct PassiveCorrector {
    config: CorrectionConfig,
    state: PassiveState,
    half: f64,
}

impl PassiveCorrector {
    /// Create an idle corrector
    pub fn new(config: CorrectionConfig) -> Self {
        Self {
            config,
            state: PassiveState::Idle,
            half: 0.0,
        }
    }

    /// Current machine state
    pub fn state(&self) -> &PassiveState {
        &self.state
    }

    /// Distance when the center sensor last reached a line
    pub fn half(&self) -> f64 {
        self.half
    }

    /// Abandon any crossing in progress
    pub fn reset(&mut self) {
        self.state = PassiveState::Idle;
    }

    fn cool_down(&mut self) {
        self.state = match self.config.cool_down_cycles {
            0 => PassiveState::Idle,
            remaining => PassiveState::CoolingDown { remaining },
        };
    }

    /// Advance the machine one cycle
    ///
    /// Returns the corrected heading when a crossing resolves cleanly.
    pub fn update<D: DiagnosticSink>(&mut self, input: &CrossingInput, diag: &mut D) -> Option<f64> {
        if !input.far_from_intersection {
            return None;
        }

        if let PassiveState::CoolingDown { remaining } = &mut self.state {
            *remaining -= 1;
            if *remaining == 0 {
                self.state = PassiveState::Idle;
            }
            return None;
        }

        let on = input.on_lines;
        let center_marked = self
            .state
            .crossing()
            .is_some_and(|crossing| crossing.seen.has(LineSensor::Center));
        if on.has(LineSensor::Center) && !center_marked {
            self.half = input.current_distance;
            diag.emit(Diagnostic::CenterHalfway);
        }

        let mut crossing = match self.state {
            PassiveState::OneSideTriggered(crossing) | PassiveState::CenterSeen(crossing) => {
                crossing
            }
            _ => {
                if on.has(LineSensor::Left) || on.has(LineSensor::Right) {
                    let crossing = Crossing::new(input.current_distance, on);
                    diag.emit(Diagnostic::LineActivated {
                        status: crossing.status(),
                    });
                    self.state = PassiveState::tracking(crossing);
                }
                return None;
            }
        };

        // Running nearly parallel to a line, or crossed several
        if input.tot_distance - crossing.initial > self.config.too_far_mm {
            diag.emit(Diagnostic::CrossingTimedOut);
            self.cool_down();
            return None;
        }

        crossing.track(on);
        if !crossing.is_resolved() {
            self.state = PassiveState::tracking(crossing);
            return None;
        }

        let corrected = self.resolve(&crossing, input, diag);
        self.cool_down();
        corrected
    }

    fn resolve<D: DiagnosticSink>(
        &self,
        crossing: &Crossing,
        input: &CrossingInput,
        diag: &mut D,
    ) -> Option<f64> {
        let after_half = input.current_distance - self.half;
        let before_half = self.half - crossing.initial;

        if libm::fabs(after_half - before_half) >= self.config.crossing_tolerance_mm {
            diag.emit(Diagnostic::SuspectedIntersection {
                after_half,
                before_half,
            });
            return None;
        }

        let elapsed = input.current_distance - crossing.initial;
        let mut offset = libm::atan2(elapsed, self.config.side_sensor_distance_mm);
        if input.reversing {
            offset = -offset;
        }

        let square = square_heading(input.heading) as f64 * DEGS;
        let heading = if crossing.leading == LineSensor::Left {
            square + offset
        } else {
            square - offset
        };

        diag.emit(Diagnostic::HeadingCorrected {
            status: crossing.status(),
        });
        Some(normalize_angle(heading))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;
    use core::f64::consts::FRAC_PI_4;
    use core::fmt::Write;

    const EPS: f64 = 1e-9;

    fn config() -> CorrectionConfig {
        CorrectionConfig {
            side_sensor_distance_mm: 100.0,
            too_far_mm: 250.0,
            crossing_tolerance_mm: 20.0,
            cool_down_cycles: 3,
        }
    }

    fn input(on_lines: LineMask, distance: f64) -> CrossingInput {
        CrossingInput {
            on_lines,
            current_distance: distance,
            tot_distance: distance,
            far_from_intersection: true,
            reversing: false,
            heading: 0.02,
        }
    }

    /// Left, then center, then right at the given distances
    fn cross(
        corrector: &mut PassiveCorrector,
        log: &mut DiagnosticLog<16>,
        half: f64,
        end: f64,
        reversing: bool,
    ) -> Option<f64> {
        assert_eq!(corrector.update(&input(LineMask::LEFT, 0.0), log), None);
        assert_eq!(corrector.update(&input(LineMask::CENTER, half), log), None);
        let mut last = input(LineMask::RIGHT, end);
        last.reversing = reversing;
        corrector.update(&last, log)
    }

    #[test]
    fn test_symmetric_crossing_corrects_heading() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log = DiagnosticLog::new();

        let heading = cross(&mut corrector, &mut log, 50.0, 100.0, false).unwrap();

        // atan2(100, 100) on top of the 0° cardinal
        assert!((heading - FRAC_PI_4).abs() < EPS);
        assert!(corrector.state().is_cooling_down());

        let mut tokens = log.iter().map(|event| {
            let mut token: heapless::String<16> = heapless::String::new();
            write!(token, "{}", event).unwrap();
            token
        });
        assert_eq!(tokens.next().unwrap(), "p1");
        assert_eq!(tokens.next().unwrap(), "pH");
        assert_eq!(tokens.next().unwrap(), "P1111");
        assert!(tokens.next().is_none());
    }

    #[test]
    fn test_right_first_subtracts() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log: DiagnosticLog<16> = DiagnosticLog::new();

        corrector.update(&input(LineMask::RIGHT, 0.0), &mut log);
        corrector.update(&input(LineMask::CENTER, 50.0), &mut log);
        let heading = corrector
            .update(&input(LineMask::LEFT, 100.0), &mut log)
            .unwrap();

        assert!((heading + FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn test_sides_clearing_together_use_leading_side() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log: DiagnosticLog<16> = DiagnosticLog::new();

        corrector.update(&input(LineMask::RIGHT, 0.0), &mut log);
        corrector.update(&input(LineMask::ALL, 50.0), &mut log);
        let heading = corrector
            .update(&input(LineMask::NONE, 100.0), &mut log)
            .unwrap();

        // Right led, so the offset is subtracted even though left also passed
        assert!((heading + FRAC_PI_4).abs() < EPS);
        assert_eq!(
            log.iter().last(),
            Some(&Diagnostic::HeadingCorrected { status: 0b11111 })
        );
    }

    #[test]
    fn test_reverse_negates_offset() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log = DiagnosticLog::new();

        let heading = cross(&mut corrector, &mut log, 50.0, 100.0, true).unwrap();
        assert!((heading + FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn test_asymmetric_crossing_is_suspected_intersection() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log = DiagnosticLog::new();

        assert_eq!(cross(&mut corrector, &mut log, 50.0, 140.0, false), None);
        assert!(corrector.state().is_cooling_down());
        assert_eq!(
            log.iter().last(),
            Some(&Diagnostic::SuspectedIntersection {
                after_half: 90.0,
                before_half: 50.0
            })
        );
    }

    #[test]
    fn test_correction_snaps_to_cardinal() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log: DiagnosticLog<16> = DiagnosticLog::new();
        let mut step = |on, distance| {
            let mut i = input(on, distance);
            i.heading = core::f64::consts::FRAC_PI_2 + 0.1;
            corrector.update(&i, &mut log)
        };

        step(LineMask::LEFT, 0.0);
        step(LineMask::CENTER, 10.0);
        let heading = step(LineMask::RIGHT, 20.0).unwrap();

        let expected = core::f64::consts::FRAC_PI_2 + libm::atan2(20.0, 100.0);
        assert!((heading - expected).abs() < EPS);
    }

    #[test]
    fn test_timeout_cools_down_without_correction() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log: DiagnosticLog<16> = DiagnosticLog::new();

        corrector.update(&input(LineMask::LEFT, 0.0), &mut log);
        corrector.update(&input(LineMask::LEFT, 200.0), &mut log);
        assert!(corrector.state().crossing().is_some());

        assert_eq!(corrector.update(&input(LineMask::RIGHT, 251.0), &mut log), None);
        assert!(corrector.state().is_cooling_down());
        assert_eq!(log.iter().last(), Some(&Diagnostic::CrossingTimedOut));
    }

    #[test]
    fn test_cooldown_counts_gated_cycles() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log = DiagnosticLog::new();
        cross(&mut corrector, &mut log, 50.0, 100.0, false);

        // Cycles near an intersection do not advance the cooldown
        let mut near = input(LineMask::LEFT, 110.0);
        near.far_from_intersection = false;
        corrector.update(&near, &mut log);
        assert_eq!(
            corrector.state(),
            &PassiveState::CoolingDown { remaining: 3 }
        );

        for _ in 0..3 {
            corrector.update(&input(LineMask::LEFT, 120.0), &mut log);
        }
        assert_eq!(corrector.state(), &PassiveState::Idle);

        corrector.update(&input(LineMask::LEFT, 130.0), &mut log);
        assert!(matches!(
            corrector.state(),
            PassiveState::OneSideTriggered(_)
        ));
    }

    #[test]
    fn test_ignored_near_intersection() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log: DiagnosticLog<16> = DiagnosticLog::new();
        let mut i = input(LineMask::ALL, 0.0);
        i.far_from_intersection = false;

        assert_eq!(corrector.update(&i, &mut log), None);
        assert_eq!(corrector.state(), &PassiveState::Idle);
        assert!(log.is_empty());
    }

    #[test]
    fn test_states_follow_crossing() {
        let mut corrector = PassiveCorrector::new(config());
        let mut log: DiagnosticLog<16> = DiagnosticLog::new();

        corrector.update(&input(LineMask::NONE, 0.0), &mut log);
        assert_eq!(corrector.state(), &PassiveState::Idle);

        corrector.update(&input(LineMask::RIGHT, 5.0), &mut log);
        let crossing = *corrector.state().crossing().unwrap();
        assert_eq!(crossing.initial, 5.0);
        assert!(matches!(corrector.state(), PassiveState::OneSideTriggered(_)));

        corrector.update(&input(LineMask::RIGHT | LineMask::CENTER, 20.0), &mut log);
        assert!(matches!(corrector.state(), PassiveState::CenterSeen(_)));
        assert_eq!(corrector.half(), 20.0);

        corrector.update(&input(LineMask::CENTER, 30.0), &mut log);
        let crossing = corrector.state().crossing().unwrap();
        assert_eq!(crossing.status(), 0b10110);
    }
}
