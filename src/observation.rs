//! Observed stellar quantities and their construction-time validation.

use thiserror::Error;

/// Errors produced when an [`Observation`] is built from degenerate inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObservationError {
    /// A field that must be strictly positive was zero or negative.
    /// Zero uncertainties in particular would divide by zero in the
    /// likelihood.
    #[error("{name} must be strictly positive; got {value}")]
    NonPositive { name: &'static str, value: f64 },

    /// A field was NaN or infinite.
    #[error("{name} must be finite; got {value}")]
    NonFinite { name: &'static str, value: f64 },
}

/**
An immutable bundle of the three observed quantities the model fits against,
each with its 1-sigma uncertainty.

Units follow the usual stellar-rotation conventions: `vsini` in km/s,
`rstar` in solar radii, `prot` in days.

Construct with [`Observation::new`] when `vsini` is a measurement, or with
[`Observation::upper_limit`] when only a ceiling on `vsini` is known; the
upper-limit flag switches the likelihood branch in
[`CosiModel`](crate::model::CosiModel).

# Examples

```rust
use cosi_mcmc::observation::Observation;

let obs = Observation::new(7.3, 0.3, 0.912, 0.034, 6.45, 0.05).unwrap();
assert!(!obs.is_upper_limit());

// A zero uncertainty is rejected outright.
assert!(Observation::new(7.3, 0.0, 0.912, 0.034, 6.45, 0.05).is_err());
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Projected rotation velocity (km/s), or its ceiling in upper-limit mode.
    pub vsini: f64,
    /// 1-sigma uncertainty on `vsini` (km/s).
    pub e_vsini: f64,
    /// Stellar radius (solar radii).
    pub rstar: f64,
    /// 1-sigma uncertainty on `rstar` (solar radii).
    pub e_rstar: f64,
    /// Rotation period (days).
    pub prot: f64,
    /// 1-sigma uncertainty on `prot` (days).
    pub e_prot: f64,
    upper_limit: bool,
}

impl Observation {
    /// Creates an observation where `vsini` is a measured value.
    pub fn new(
        vsini: f64,
        e_vsini: f64,
        rstar: f64,
        e_rstar: f64,
        prot: f64,
        e_prot: f64,
    ) -> Result<Self, ObservationError> {
        check_positive("vsini", vsini)?;
        Self::build(vsini, e_vsini, rstar, e_rstar, prot, e_prot, false)
    }

    /// Creates an observation where `vsini` is only an upper bound, not a
    /// measurement. The bound itself is exempt from the positivity check
    /// applied to measured central values.
    pub fn upper_limit(
        vsini: f64,
        e_vsini: f64,
        rstar: f64,
        e_rstar: f64,
        prot: f64,
        e_prot: f64,
    ) -> Result<Self, ObservationError> {
        check_finite("vsini", vsini)?;
        Self::build(vsini, e_vsini, rstar, e_rstar, prot, e_prot, true)
    }

    fn build(
        vsini: f64,
        e_vsini: f64,
        rstar: f64,
        e_rstar: f64,
        prot: f64,
        e_prot: f64,
        upper_limit: bool,
    ) -> Result<Self, ObservationError> {
        check_positive("e_vsini", e_vsini)?;
        check_positive("rstar", rstar)?;
        check_positive("e_rstar", e_rstar)?;
        check_positive("prot", prot)?;
        check_positive("e_prot", e_prot)?;
        Ok(Self {
            vsini,
            e_vsini,
            rstar,
            e_rstar,
            prot,
            e_prot,
            upper_limit,
        })
    }

    /// Whether `vsini` is a ceiling rather than a measurement.
    pub fn is_upper_limit(&self) -> bool {
        self.upper_limit
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ObservationError> {
    if !value.is_finite() {
        return Err(ObservationError::NonFinite { name, value });
    }
    Ok(())
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ObservationError> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(ObservationError::NonPositive { name, value });
    }
    Ok(())
}
