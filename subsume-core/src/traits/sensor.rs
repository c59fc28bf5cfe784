//! Line sensor traits

/// Errors that can occur reading a line sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// ADC conversion failed
    ConversionError,
    /// No sensor registered at this index
    NoSuchSensor,
}

/// Raw reflectance reading from one analog line sensor
///
/// Implementations wrap a chip-specific ADC channel. Higher values mean
/// darker surface.
pub trait AnalogReader {
    /// Read the raw value
    ///
    /// Takes `&mut self` because ADC reads typically require mutable access.
    fn read(&mut self) -> Result<u16, SensorError>;
}
