//! Diagnostic event stream
//!
//! Components report state transitions as [`Diagnostic`] events. Each event
//! renders as a short token (`p101`, `pH`, `C`, ...) for a serial console.
//! The stream is best-effort: [`DiagnosticLog`] drops the oldest event
//! when full.

use core::fmt;

use heapless::Deque;

/// Default diagnostic log depth
pub const DIAGNOSTIC_LOG_DEPTH: usize = 32;

/// Events emitted at control state transitions
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Diagnostic {
    /// Side sensor started a line crossing (`p` + crossing status bits)
    LineActivated { status: u8 },
    /// Center sensor reached the line (`pH`)
    CenterHalfway,
    /// Heading corrected from a crossing (`P` + crossing status bits)
    HeadingCorrected { status: u8 },
    /// Crossing halves disagreed, likely an intersection (`pI`)
    SuspectedIntersection { after_half: f64, before_half: f64 },
    /// Crossing did not resolve in time (`pP`)
    CrossingTimedOut,
    /// Position snapped to the grid (`C`)
    GridSnapped,
    /// Center detection too short to be a line (`L`)
    LineNoise { cycles: u16 },
    /// Genuine line crossing counted toward the next snap (`l`)
    LineCounted { counted: u16 },
    /// Boundary became the active avoidance target (`B`)
    BoundaryEngaged { index: u8 },
    /// Active boundary left behind (`b`)
    BoundaryReleased { index: u8 },
    /// Waypoint reached or docked (`W`)
    WaypointReached { index: u8 },
}

impl Diagnostic {
    /// Short token identifying the event kind
    pub fn token(&self) -> &'static str {
        match self {
            Diagnostic::LineActivated { .. } => "p",
            Diagnostic::CenterHalfway => "pH",
            Diagnostic::HeadingCorrected { .. } => "P",
            Diagnostic::SuspectedIntersection { .. } => "pI",
            Diagnostic::CrossingTimedOut => "pP",
            Diagnostic::GridSnapped => "C",
            Diagnostic::LineNoise { .. } => "L",
            Diagnostic::LineCounted { .. } => "l",
            Diagnostic::BoundaryEngaged { .. } => "B",
            Diagnostic::BoundaryReleased { .. } => "b",
            Diagnostic::WaypointReached { .. } => "W",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())?;
        match *self {
            Diagnostic::LineActivated { status } | Diagnostic::HeadingCorrected { status } => {
                write!(f, "{:b}", status)
            }
            Diagnostic::SuspectedIntersection {
                after_half,
                before_half,
            } => write!(f, "{:.1} {:.1}", after_half, before_half),
            Diagnostic::LineNoise { cycles } => write!(f, "{}", cycles),
            Diagnostic::LineCounted { counted } => write!(f, "{}", counted),
            Diagnostic::BoundaryEngaged { index }
            | Diagnostic::BoundaryReleased { index }
            | Diagnostic::WaypointReached { index } => write!(f, "{}", index),
            Diagnostic::CenterHalfway | Diagnostic::CrossingTimedOut | Diagnostic::GridSnapped => {
                Ok(())
            }
        }
    }
}

/// Receiver of diagnostic events
pub trait DiagnosticSink {
    /// Record an event; must never block or fail
    fn emit(&mut self, event: Diagnostic);
}

/// Bounded, append-only diagnostic history
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog<const N: usize> {
    events: Deque<Diagnostic, N>,
    dropped: u32,
}

impl<const N: usize> DiagnosticLog<N> {
    /// Create an empty log
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
            dropped: 0,
        }
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no events are buffered
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events discarded because the log was full
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Iterate buffered events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter()
    }

    /// Take the oldest buffered event
    pub fn pop(&mut self) -> Option<Diagnostic> {
        self.events.pop_front()
    }

    /// Discard all buffered events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl<const N: usize> DiagnosticSink for DiagnosticLog<N> {
    fn emit(&mut self, event: Diagnostic) {
        #[cfg(feature = "defmt")]
        defmt::debug!("diag {}: {}", event.token(), event);

        if self.events.is_full() {
            self.events.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        // Cannot fail: a slot was just freed
        let _ = self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    fn render(event: Diagnostic) -> heapless::String<32> {
        let mut out = heapless::String::new();
        write!(out, "{}", event).unwrap();
        out
    }

    #[test]
    fn test_tokens_render() {
        assert_eq!(render(Diagnostic::LineActivated { status: 0b101 }), "p101");
        assert_eq!(render(Diagnostic::CenterHalfway), "pH");
        assert_eq!(
            render(Diagnostic::HeadingCorrected { status: 0b01111 }),
            "P1111"
        );
        assert_eq!(
            render(Diagnostic::SuspectedIntersection {
                after_half: 90.0,
                before_half: 50.0
            }),
            "pI90.0 50.0"
        );
        assert_eq!(render(Diagnostic::CrossingTimedOut), "pP");
        assert_eq!(render(Diagnostic::GridSnapped), "C");
        assert_eq!(render(Diagnostic::LineNoise { cycles: 2 }), "L2");
        assert_eq!(render(Diagnostic::LineCounted { counted: 1 }), "l1");
        assert_eq!(render(Diagnostic::WaypointReached { index: 3 }), "W3");
    }

    #[test]
    fn test_log_drops_oldest_when_full() {
        let mut log: DiagnosticLog<2> = DiagnosticLog::new();
        log.emit(Diagnostic::CenterHalfway);
        log.emit(Diagnostic::GridSnapped);
        log.emit(Diagnostic::CrossingTimedOut);

        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 1);
        assert_eq!(log.pop(), Some(Diagnostic::GridSnapped));
        assert_eq!(log.pop(), Some(Diagnostic::CrossingTimedOut));
        assert!(log.is_empty());
    }
}
