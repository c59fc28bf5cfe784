//! Hardware driver implementations
//!
//! Concrete implementations of the traits defined in subsume-core:
//!
//! - Wheel speed servo (Q16.16 fixed-point PID per wheel)
//! - H-bridge motor output over `embedded-hal` PWM and GPIO
//! - Thresholded analog line sensor bank

#![no_std]
#![deny(unsafe_code)]

pub mod hbridge;
pub mod line_sensor;
pub mod wheel;
