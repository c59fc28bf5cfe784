//! Wheel speed control

pub mod fixed;
pub mod pid;
pub mod servo;

pub use pid::{PidGains, WheelPid, WheelPidConfig};
pub use servo::DiffDriveServo;
