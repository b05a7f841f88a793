use crate::PtError;

/// Rejects NaN and infinities before a value reaches the bus or a driver.
///
/// Passes the value through on success so call sites can stay expression
/// shaped: `bus.set(key, ensure_finite(reading, "sensor reading")?)`.
pub fn ensure_finite(value: f64, what: &'static str) -> Result<f64, PtError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PtError::NonFinite { what, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_values_pass_through() {
        assert_eq!(ensure_finite(21.5, "reading").unwrap(), 21.5);
        assert_eq!(ensure_finite(-40.0, "reading").unwrap(), -40.0);
        assert_eq!(ensure_finite(0.0, "reading").unwrap(), 0.0);
    }

    #[test]
    fn nan_and_infinities_are_rejected() {
        assert!(ensure_finite(f64::NAN, "reading").is_err());
        assert!(ensure_finite(f64::INFINITY, "reading").is_err());
        assert!(ensure_finite(f64::NEG_INFINITY, "reading").is_err());

        let err = ensure_finite(f64::NAN, "duty cycle").unwrap_err();
        assert!(format!("{err}").contains("duty cycle"));
    }
}
