//! Unit conversion and rounding for published readings
//!
//! Sensors report in their native units (Celsius, %RH, hPa); everything
//! crossing the wire is converted here and rounded to one decimal place.

/// Convert a Celsius temperature to Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Round to one decimal place using `f64::round` semantics
/// (ties away from zero). Applied to every numeric field before publish.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
