//! Line sensor bitmap
//!
//! An external reader refreshes `on_lines` once per cycle, one bit per
//! sensor. The core only consumes the three lowest bits.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Line sensors the core reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineSensor {
    Left,
    Right,
    Center,
}

impl LineSensor {
    /// Bit position in the `on_lines` bitmap
    pub const fn bit(self) -> u8 {
        match self {
            LineSensor::Left => 0,
            LineSensor::Right => 1,
            LineSensor::Center => 2,
        }
    }

    /// Single-sensor mask
    pub const fn mask(self) -> LineMask {
        LineMask(1 << self.bit())
    }
}

/// Set of line sensors, laid out like the `on_lines` bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineMask(u8);

impl LineMask {
    /// No sensor
    pub const NONE: Self = Self(0);
    /// Left sensor only
    pub const LEFT: Self = LineSensor::Left.mask();
    /// Right sensor only
    pub const RIGHT: Self = LineSensor::Right.mask();
    /// Center sensor only
    pub const CENTER: Self = LineSensor::Center.mask();
    /// Every sensor the core consumes
    pub const ALL: Self = Self(0b111);

    /// Keep only the consumed bits of a raw bitmap
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check if every sensor in `other` is set
    pub const fn contains(self, other: LineMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if `sensor` is set
    pub const fn has(self, sensor: LineSensor) -> bool {
        self.contains(sensor.mask())
    }

    /// Check if no sensor is set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LineMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LineMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for LineMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Binary for LineMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

/// Current and previous cycle sensor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineSensors {
    on_lines: u8,
    prev_on_lines: u8,
}

impl LineSensors {
    /// Create with nothing on a line
    pub const fn new() -> Self {
        Self {
            on_lines: 0,
            prev_on_lines: 0,
        }
    }

    /// Install this cycle's bitmap, keeping the last one as previous
    pub fn refresh(&mut self, on_lines: u8) {
        self.prev_on_lines = self.on_lines;
        self.on_lines = on_lines;
    }

    /// Raw bitmap for this cycle
    pub fn on_lines(&self) -> u8 {
        self.on_lines
    }

    /// Consumed sensors that are on a line this cycle
    pub fn current(&self) -> LineMask {
        LineMask::from_bits(self.on_lines)
    }

    /// Check if a sensor is on a line this cycle
    pub fn on_line(&self, sensor: LineSensor) -> bool {
        self.current().has(sensor)
    }

    /// Check if a sensor was on a line last cycle
    pub fn prev_on_line(&self, sensor: LineSensor) -> bool {
        LineMask::from_bits(self.prev_on_lines).has(sensor)
    }
}
