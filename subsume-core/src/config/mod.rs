//! Configuration types
//!
//! Every tunable of the control core, grouped per component. Defaults
//! match a 200 mm line grid and millimetre odometry.

pub mod types;
#[cfg(feature = "serde")]
pub mod stored;

pub use types::*;
#[cfg(feature = "serde")]
pub use stored::{StoredConfig, CONFIG_MAGIC, CONFIG_VERSION};
