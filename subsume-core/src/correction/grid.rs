//! Grid position correction
//!
//! Counts debounced center-sensor line crossings and snaps the position
//! onto the grid every few crossings.

use crate::config::GridConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::geometry::{far_from_intersection, snap_to_grid, Pose};

/// Line crossing debounce and tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GridCorrector {
    cycles_on_line: u16,
    counted_lines: u16,
}

impl GridCorrector {
    /// Create with no streak and no counted lines
    pub const fn new() -> Self {
        Self {
            cycles_on_line: 0,
            counted_lines: 0,
        }
    }

    /// Cycles the center sensor has been on the current line
    pub fn cycles_on_line(&self) -> u16 {
        self.cycles_on_line
    }

    /// Genuine crossings since the last snap
    pub fn counted_lines(&self) -> u16 {
        self.counted_lines
    }

    /// Forget the current streak and the crossing tally
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance one cycle; returns true if the pose was snapped
    pub fn update<D: DiagnosticSink>(
        &mut self,
        center_on: bool,
        pose: &mut Pose,
        grid: &GridConfig,
        diag: &mut D,
    ) -> bool {
        if center_on {
            self.cycles_on_line = self.cycles_on_line.saturating_add(1);
            return false;
        }

        let streak = core::mem::take(&mut self.cycles_on_line);
        if streak < grid.cycles_crossing_line {
            if streak > 0 {
                diag.emit(Diagnostic::LineNoise { cycles: streak });
            }
            return false;
        }

        if self.counted_lines >= grid.lines_per_correct && far_from_intersection(pose.x, pose.y, grid)
        {
            self.counted_lines = 0;
            snap_to_grid(pose, grid);
            diag.emit(Diagnostic::GridSnapped);
            true
        } else {
            self.counted_lines = self.counted_lines.saturating_add(1);
            diag.emit(Diagnostic::LineCounted {
                counted: self.counted_lines,
            });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;

    fn grid() -> GridConfig {
        GridConfig {
            grid_width: 200,
            intersection_too_close: 20,
            cycles_crossing_line: 3,
            lines_per_correct: 2,
        }
    }

    fn crossing(
        corrector: &mut GridCorrector,
        cycles: u16,
        pose: &mut Pose,
        log: &mut DiagnosticLog<16>,
    ) -> bool {
        for _ in 0..cycles {
            assert!(!corrector.update(true, pose, &grid(), log));
        }
        corrector.update(false, pose, &grid(), log)
    }

    #[test]
    fn test_short_streak_is_noise() {
        let mut corrector = GridCorrector::new();
        let mut pose = Pose::new(205.0, 100.0, 0.0);
        let mut log = DiagnosticLog::new();

        assert!(!crossing(&mut corrector, 2, &mut pose, &mut log));
        assert_eq!(corrector.counted_lines(), 0);
        assert_eq!(corrector.cycles_on_line(), 0);
        assert_eq!(log.pop(), Some(Diagnostic::LineNoise { cycles: 2 }));

        // Idle cycles are not noise
        corrector.update(false, &mut pose, &grid(), &mut log);
        assert!(log.is_empty());
    }

    #[test]
    fn test_snaps_after_enough_crossings() {
        let mut corrector = GridCorrector::new();
        let mut pose = Pose::new(207.0, 93.0, 0.0);
        let mut log = DiagnosticLog::new();

        assert!(!crossing(&mut corrector, 3, &mut pose, &mut log));
        assert!(!crossing(&mut corrector, 4, &mut pose, &mut log));
        assert_eq!(corrector.counted_lines(), 2);

        assert!(crossing(&mut corrector, 3, &mut pose, &mut log));
        assert_eq!(corrector.counted_lines(), 0);
        assert_eq!(pose.x, 200.0);
        assert_eq!(pose.y, 93.0);
        assert_eq!(log.iter().last(), Some(&Diagnostic::GridSnapped));
    }

    #[test]
    fn test_reset_drops_streak_and_tally() {
        let mut corrector = GridCorrector::new();
        let mut pose = Pose::new(207.0, 93.0, 0.0);
        let mut log = DiagnosticLog::new();

        crossing(&mut corrector, 3, &mut pose, &mut log);
        for _ in 0..4 {
            corrector.update(true, &mut pose, &grid(), &mut log);
        }
        corrector.reset();
        log.clear();

        // The streak from before the reset is not counted
        assert!(!corrector.update(false, &mut pose, &grid(), &mut log));
        assert_eq!(corrector.counted_lines(), 0);
        assert_eq!(corrector.cycles_on_line(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_no_snap_at_intersection() {
        let mut corrector = GridCorrector::new();
        let mut pose = Pose::new(205.0, 195.0, 0.0);
        let mut log = DiagnosticLog::new();

        for _ in 0..3 {
            assert!(!crossing(&mut corrector, 3, &mut pose, &mut log));
        }
        assert_eq!(corrector.counted_lines(), 3);
        assert_eq!(pose.x, 205.0);
    }
}
