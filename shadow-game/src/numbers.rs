//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the u64 range, returning 0 for NaN and
/// negative values and `u64::MAX` for anything too large to represent.
#[must_use]
pub fn floor_f64_to_u64(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value.is_infinite() {
        return u64::MAX;
    }
    cast::<f64, u64>(value.floor()).unwrap_or(u64::MAX)
}

/// Whole seconds contained in a millisecond duration.
#[must_use]
pub const fn whole_seconds(elapsed_ms: u64) -> u64 {
    elapsed_ms / 1_000
}

/// Convert u64 to i64, saturating at `i64::MAX`.
#[must_use]
pub fn u64_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Clamp an i64 into the `[min, max]` window and narrow it to u32.
#[must_use]
pub fn clamp_i64_to_u32(value: i64, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(i64::from(min), i64::from(max));
    cast::<i64, u32>(clamped).unwrap_or(min)
}
