//! Line-crossing corrections
//!
//! Both machines bound odometric drift using the floor grid:
//! - [`PassiveCorrector`] re-estimates heading from the order and spacing
//!   of sensor triggers while crossing a line at an angle
//! - [`GridCorrector`] snaps position onto a grid line after enough
//!   debounced crossings

pub mod grid;
pub mod passive;

pub use grid::GridCorrector;
pub use passive::{Crossing, CrossingInput, PassiveCorrector, PassiveState};
