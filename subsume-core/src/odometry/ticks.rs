//! Interrupt-shared encoder counters
//!
//! The counters only ever grow, and only interrupt handlers write them.
//! The control loop reads each counter exactly once per cycle through
//! [`TickCounters::snapshot`] and works from that copy.

use portable_atomic::{AtomicU32, Ordering};

/// Encoder counter values for both wheels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelTicks {
    pub left: u32,
    pub right: u32,
}

impl WheelTicks {
    /// No ticks on either wheel
    pub const ZERO: Self = Self { left: 0, right: 0 };

    /// Create from raw counts
    pub const fn new(left: u32, right: u32) -> Self {
        Self { left, right }
    }

    /// Ticks elapsed since an earlier snapshot, tolerating counter wrap
    pub fn since(self, earlier: WheelTicks) -> WheelTicks {
        WheelTicks {
            left: self.left.wrapping_sub(earlier.left),
            right: self.right.wrapping_sub(earlier.right),
        }
    }

    /// Check if neither wheel moved
    pub fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

/// Encoder edge counters shared with interrupt context
///
/// Intended to live in a `static`:
///
/// ```
/// use subsume_core::odometry::TickCounters;
///
/// static ENCODERS: TickCounters = TickCounters::new();
///
/// // left encoder edge interrupt
/// ENCODERS.tick_left();
///
/// // top of the control cycle
/// let ticks = ENCODERS.snapshot();
/// assert_eq!(ticks.left, 1);
/// ```
#[derive(Debug)]
pub struct TickCounters {
    left: AtomicU32,
    right: AtomicU32,
}

impl Default for TickCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounters {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            left: AtomicU32::new(0),
            right: AtomicU32::new(0),
        }
    }

    /// Record one left encoder edge (interrupt context)
    #[inline]
    pub fn tick_left(&self) {
        self.left.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one right encoder edge (interrupt context)
    #[inline]
    pub fn tick_right(&self) {
        self.right.fetch_add(1, Ordering::Relaxed);
    }

    /// Read both counters once
    ///
    /// Each load is a single atomic read, so a value can never be torn.
    /// Call once per control cycle and pass the copy around.
    pub fn snapshot(&self) -> WheelTicks {
        WheelTicks {
            left: self.left.load(Ordering::Acquire),
            right: self.right.load(Ordering::Acquire),
        }
    }
}
