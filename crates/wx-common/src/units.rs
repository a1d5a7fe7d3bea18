//! Unit normalization. Temperatures are carried in °F and pressures in hPa.

/// hPa per inch of mercury.
pub const HPA_PER_INHG: f64 = 33.863886;

/// Convert Celsius to Fahrenheit.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Convert an altimeter setting in inches of mercury to hPa.
pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg * HPA_PER_INHG
}

/// Plausible surface temperature range in °F. Values outside are sensor faults.
pub fn plausible_temperature_f(value: f64) -> bool {
    value.is_finite() && (-80.0..=140.0).contains(&value)
}

/// Plausible sea-level pressure range in hPa.
pub fn plausible_pressure_hpa(value: f64) -> bool {
    value.is_finite() && (850.0..=1090.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn test_altimeter_conversion() {
        let hpa = inhg_to_hpa(29.92);
        assert!((hpa - 1013.2).abs() < 0.1);
    }

    #[test]
    fn test_plausibility() {
        assert!(plausible_temperature_f(72.5));
        assert!(!plausible_temperature_f(-999.0));
        assert!(plausible_pressure_hpa(1013.25));
        assert!(!plausible_pressure_hpa(29.92));
    }
}
