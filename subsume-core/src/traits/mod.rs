//! Hardware abstraction traits
//!
//! These traits define the boundary between the control core and its
//! external collaborators: the wheel servo loop, the motor outputs and
//! the line sensor readers.

pub mod motor;
pub mod sensor;

pub use motor::{Direction, MotorOutput, WheelServo, WheelTargets};
pub use sensor::{AnalogReader, SensorError};
