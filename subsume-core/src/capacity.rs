//! Capacity-bounded registration

/// A fixed-capacity collection is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError;

/// Sentinel returned by index-style registration when full
pub const REGISTRATION_FAILED: i32 = -1;

/// Flatten a registration result into an index or [`REGISTRATION_FAILED`]
///
/// For callers that speak the classic `index | -1` convention.
pub fn index_or_sentinel(result: Result<usize, CapacityError>) -> i32 {
    match result {
        Ok(index) => i32::try_from(index).unwrap_or(REGISTRATION_FAILED),
        Err(CapacityError) => REGISTRATION_FAILED,
    }
}
