//! Board-agnostic behavior-control core for a differential-drive robot
//!
//! This crate contains all control logic that does not depend on
//! specific hardware implementations:
//!
//! - Encoder odometry with an interrupt-safe tick snapshot
//! - Boundary threat model with hysteresis
//! - Passive heading correction and grid position correction
//! - Waypoint navigation, turn-in-place and docking behaviors
//! - Subsumption arbiter selecting one layer per control cycle
//! - Configuration types and diagnostic event stream
//!
//! A control cycle is driven through [`robot::Robot::cycle`].

#![no_std]
#![deny(unsafe_code)]

pub mod arbiter;
pub mod boundary;
pub mod capacity;
pub mod config;
pub mod correction;
pub mod diagnostics;
pub mod geometry;
pub mod navigation;
pub mod odometry;
pub mod robot;
pub mod sensors;
pub mod traits;

pub use robot::Robot;
