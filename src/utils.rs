pub mod date_formatter;

/// Clamps a percentage into [0, 100], mapping NaN to 0.
pub fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
