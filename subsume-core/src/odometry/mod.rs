//! Encoder odometry
//!
//! Interrupt handlers count encoder edges into [`TickCounters`]; the
//! control loop takes one [`WheelTicks`] snapshot per cycle and the
//! [`OdometryEngine`] folds it into distance and pose.

pub mod engine;
pub mod ticks;

pub use engine::{OdometryEngine, WheelDirections};
pub use ticks::{TickCounters, WheelTicks};
