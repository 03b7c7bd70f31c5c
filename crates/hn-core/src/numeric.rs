use crate::HnError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, HnError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HnError::NonFinite { what, value: v })
    }
}

/// Finite and `>= 0`. Demands, capacities and forecasts all go through this.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, HnError> {
    let v = ensure_finite(v, what)?;
    if v < 0.0 {
        return Err(HnError::Negative { what, value: v });
    }
    Ok(v)
}

/// Finite and strictly positive.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, HnError> {
    let v = ensure_finite(v, what)?;
    if v <= 0.0 {
        return Err(HnError::InvalidArg { what });
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_non_negative_rejects_negative() {
        assert!(ensure_non_negative(0.0, "demand").is_ok());
        assert!(matches!(
            ensure_non_negative(-1.0, "demand"),
            Err(HnError::Negative { what: "demand", .. })
        ));
        assert!(ensure_positive(0.0, "diameter").is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
                let tol = Tolerances::default();
                prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
            }

            #[test]
            fn non_negative_values_pass_through(v in 0.0f64..1e9) {
                prop_assert_eq!(ensure_non_negative(v, "demand").unwrap(), v);
                prop_assert!(ensure_non_negative(-v - 1e-9, "demand").is_err());
            }
        }
    }
}
