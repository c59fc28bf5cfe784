//! Analog line sensor bank
//!
//! Reads a set of reflectance sensors and thresholds them into the
//! `on_lines` bitmap the control core consumes. Sensor `i` sets bit `i`,
//! so the first three registered sensors must be left, right and center.

use heapless::Vec;
use subsume_core::capacity::CapacityError;
use subsume_core::traits::{AnalogReader, SensorError};

/// Bits available in the `on_lines` bitmap
pub const MAX_LINE_SENSORS: usize = 8;

/// Threshold used until a sensor is calibrated (12-bit midscale)
pub const DEFAULT_THRESHOLD: u16 = 2048;

struct Channel<R> {
    reader: R,
    threshold: u16,
    last: u16,
    /// Lightest and darkest readings seen while calibrating
    seen: Option<(u16, u16)>,
}

/// Fixed-capacity set of thresholded line sensors
pub struct LineSensorBank<R, const N: usize> {
    channels: Vec<Channel<R>, N>,
}

impl<R: AnalogReader, const N: usize> Default for LineSensorBank<R, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AnalogReader, const N: usize> LineSensorBank<R, N> {
    /// Create an empty bank
    pub const fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Register a sensor with the default threshold, returning its bit index
    pub fn add(&mut self, reader: R) -> Result<usize, CapacityError> {
        if self.channels.len() >= MAX_LINE_SENSORS {
            return Err(CapacityError);
        }
        self.channels
            .push(Channel {
                reader,
                threshold: DEFAULT_THRESHOLD,
                last: 0,
                seen: None,
            })
            .map_err(|_| CapacityError)?;
        Ok(self.channels.len() - 1)
    }

    /// Number of registered sensors
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if no sensors are registered
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Current threshold of a sensor
    pub fn threshold(&self, index: usize) -> Option<u16> {
        self.channels.get(index).map(|c| c.threshold)
    }

    /// Override a sensor's threshold
    pub fn set_threshold(&mut self, index: usize, threshold: u16) -> Result<(), SensorError> {
        let channel = self
            .channels
            .get_mut(index)
            .ok_or(SensorError::NoSuchSensor)?;
        channel.threshold = threshold;
        Ok(())
    }

    /// Raw reading of a sensor from the last [`read`](Self::read)
    pub fn last_reading(&self, index: usize) -> Option<u16> {
        self.channels.get(index).map(|c| c.last)
    }

    /// Read every sensor and build the `on_lines` bitmap
    ///
    /// A reading above its threshold means the sensor sees a (dark) line.
    pub fn read(&mut self) -> Result<u8, SensorError> {
        let mut on_lines = 0u8;
        for (bit, channel) in self.channels.iter_mut().enumerate() {
            channel.last = channel.reader.read()?;
            if channel.last > channel.threshold {
                on_lines |= 1 << bit;
            }
        }
        Ok(on_lines)
    }

    /// Take one calibration sample from every sensor
    ///
    /// Call repeatedly while sweeping the sensors across a line.
    pub fn sample_calibration(&mut self) -> Result<(), SensorError> {
        for channel in self.channels.iter_mut() {
            let value = channel.reader.read()?;
            channel.last = value;
            channel.seen = Some(match channel.seen {
                Some((light, dark)) => (light.min(value), dark.max(value)),
                None => (value, value),
            });
        }
        Ok(())
    }

    /// Set each sampled sensor's threshold halfway between light and dark
    ///
    /// Returns the number of sensors calibrated. Sensors that never saw any
    /// contrast keep their threshold.
    pub fn finish_calibration(&mut self) -> usize {
        let mut calibrated = 0;
        for channel in self.channels.iter_mut() {
            if let Some((light, dark)) = channel.seen.take() {
                if dark > light {
                    channel.threshold = light + (dark - light) / 2;
                    calibrated += 1;
                }
            }
        }

        #[cfg(feature = "defmt")]
        defmt::info!("line sensors calibrated: {}/{}", calibrated, self.channels.len());

        calibrated
    }
}
