//! Human-readable rate formatting for telemetry samples.

const UNITS: [&str; 5] = ["Kb/s", "Mb/s", "Gb/s", "Tb/s", "Pb/s"];

/// Format a byte rate with binary prefixes and two decimals.
///
/// The smallest unit is `Kb/s`, so sub-kilobyte rates render as fractions
/// (`512` → `"0.50 Kb/s"`). Each further unit is a factor of 1024; a value
/// that would round up to `1024.00` moves to the next unit instead.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_rate(bytes_per_sec: u64) -> String {
    let mut value = bytes_per_sec as f64 / 1024.0;
    let mut unit = 0;
    while (value * 100.0).round() >= 102_400.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
