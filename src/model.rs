//! The three-parameter probability model tying the observed quantities to
//! the inclination-angle cosine.
//!
//! The parameter vector is `theta = [cosi, rstar_fit, prot_fit]`. The prior
//! is flat inside the box `0 <= cosi <= 1`, `rstar_fit >= 0`,
//! `prot_fit >= 0` and impossible outside it; the likelihood is a Gaussian
//! chi-square comparing the implied line-of-sight rotation velocity and the
//! fitted radius and period against the observation. Everything here is a
//! pure function of `theta` and the immutable [`Observation`], so a model
//! value can be shared freely across threads.

use crate::ensemble::LogProb;
use crate::observation::Observation;

/// Solar radius in kilometers.
pub const R_SUN_KM: f64 = 6.957e5;

/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/**
Log-prior, log-likelihood, and log-posterior evaluation for one
[`Observation`].

# Examples

```rust
use cosi_mcmc::model::CosiModel;
use cosi_mcmc::observation::Observation;

let obs = Observation::new(7.3, 0.3, 0.912, 0.034, 6.45, 0.05).unwrap();
let model = CosiModel::new(obs);

// Inside the prior box the posterior is prior + likelihood.
let lp = model.log_probability(&[0.5, 0.912, 6.45]);
assert!(lp.is_finite());

// Outside it the posterior is impossible, encoded as -inf, not an error.
assert_eq!(model.log_probability(&[1.5, 0.912, 6.45]), f64::NEG_INFINITY);
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosiModel {
    observation: Observation,
}

impl CosiModel {
    pub fn new(observation: Observation) -> Self {
        Self { observation }
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    /// Flat prior over the physical box: `0.0` when `0 <= cosi <= 1`,
    /// `rstar_fit >= 0`, and `prot_fit >= 0`; `-inf` otherwise.
    pub fn log_prior(&self, theta: &[f64]) -> f64 {
        let (cosi, rstar_fit, prot_fit) = (theta[0], theta[1], theta[2]);
        if !(0.0..=1.0).contains(&cosi) {
            return f64::NEG_INFINITY;
        }
        if rstar_fit < 0.0 || prot_fit < 0.0 {
            return f64::NEG_INFINITY;
        }
        0.0
    }

    /// Gaussian log-likelihood of `theta` given the observation.
    ///
    /// The implied equatorial velocity is
    /// `cv = 2 pi * rstar_fit * R_SUN_KM / (prot_fit * SECONDS_PER_DAY)`
    /// (km/s), projected to the line of sight with `sqrt(1 - cosi^2)`. In
    /// upper-limit mode a projected velocity above the `vsini` ceiling is
    /// physically excluded (`-inf`) and the `vsini` term drops from the
    /// chi-square, since only a bound is known.
    ///
    /// `cosi` outside `[-1, 1]` makes `sqrt(1 - cosi^2)` NaN; callers go
    /// through [`log_probability`](Self::log_probability), which rejects
    /// such `theta` at the prior before this is evaluated.
    pub fn log_likelihood(&self, theta: &[f64]) -> f64 {
        let (cosi, rstar_fit, prot_fit) = (theta[0], theta[1], theta[2]);
        let obs = &self.observation;

        let sini = (1.0 - cosi * cosi).sqrt();
        // line-of-sight velocity; km/s
        let cv = 2.0 * std::f64::consts::PI * rstar_fit * R_SUN_KM / (prot_fit * SECONDS_PER_DAY);
        let cv_sini = cv * sini;

        let rstar_term = ((rstar_fit - obs.rstar) / obs.e_rstar).powi(2);
        let prot_term = ((prot_fit - obs.prot) / obs.e_prot).powi(2);

        let chi2 = if obs.is_upper_limit() {
            if cv_sini > obs.vsini {
                return f64::NEG_INFINITY;
            }
            rstar_term + prot_term
        } else {
            ((obs.vsini - cv_sini) / obs.e_vsini).powi(2) + rstar_term + prot_term
        };

        -0.5 * chi2
    }

    /// Log-posterior: `-inf` as soon as the prior is not finite, otherwise
    /// `log_prior + log_likelihood`. The prior check comes first so the
    /// likelihood's square root is never evaluated on out-of-box `cosi`.
    pub fn log_probability(&self, theta: &[f64]) -> f64 {
        let lp = self.log_prior(theta);
        if !lp.is_finite() {
            return f64::NEG_INFINITY;
        }
        lp + self.log_likelihood(theta)
    }
}

impl LogProb for CosiModel {
    fn log_prob(&self, theta: &[f64]) -> f64 {
        self.log_probability(theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn fixture() -> CosiModel {
        let obs = Observation::new(7.3, 0.3, 0.912, 0.034, 6.45, 0.05).unwrap();
        CosiModel::new(obs)
    }

    #[test]
    fn prior_is_flat_inside_the_box() {
        let model = fixture();
        assert_eq!(model.log_prior(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(model.log_prior(&[1.0, 0.912, 6.45]), 0.0);
        assert_eq!(model.log_prior(&[0.5, 10.0, 100.0]), 0.0);
    }

    #[test]
    fn prior_excludes_out_of_box_theta() {
        let model = fixture();
        assert_eq!(model.log_prior(&[-0.1, 0.912, 6.45]), f64::NEG_INFINITY);
        assert_eq!(model.log_prior(&[1.1, 0.912, 6.45]), f64::NEG_INFINITY);
        assert_eq!(model.log_prior(&[0.5, -0.912, 6.45]), f64::NEG_INFINITY);
        assert_eq!(model.log_prior(&[0.5, 0.912, -6.45]), f64::NEG_INFINITY);
    }

    #[test]
    fn posterior_short_circuits_on_impossible_prior() {
        let model = fixture();
        // cosi = 1.5 would make sqrt(1 - cosi^2) NaN if the likelihood ran.
        assert_eq!(model.log_probability(&[1.5, 0.912, 6.45]), f64::NEG_INFINITY);
        assert_eq!(
            model.log_probability(&[0.5, -1.0, 6.45]),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn posterior_is_prior_plus_likelihood_inside_the_box() {
        let model = fixture();
        let theta = [0.3, 0.95, 6.4];
        assert_eq!(
            model.log_probability(&theta),
            model.log_prior(&theta) + model.log_likelihood(&theta)
        );
    }

    #[test]
    fn likelihood_matches_hand_computed_value() {
        let model = fixture();
        let theta = [0.5, 0.912, 6.45];

        // At the observed radius and period only the vsini term contributes.
        let cv = 2.0 * std::f64::consts::PI * 0.912 * 6.957e5 / (6.45 * 86_400.0);
        let cv_sini = cv * 0.75f64.sqrt();
        let expected = -0.5 * ((7.3 - cv_sini) / 0.3).powi(2);

        assert_abs_diff_eq!(model.log_likelihood(&theta), expected, epsilon = 1e-12);
        assert!(cv > 7.0 && cv < 7.3, "cv = {cv}");
        assert!(model.log_likelihood(&theta) < -6.0);
        assert_eq!(model.log_prior(&theta), 0.0);
    }

    #[test]
    fn likelihood_is_deterministic() {
        let model = fixture();
        let theta = [0.42, 0.9, 6.5];
        let first = model.log_likelihood(&theta);
        let second = model.log_likelihood(&theta);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn upper_limit_excludes_velocities_above_the_ceiling() {
        // Ceiling well below the implied velocity at cosi = 0.
        let obs = Observation::upper_limit(3.0, 0.3, 0.912, 0.034, 6.45, 0.05).unwrap();
        let model = CosiModel::new(obs);
        assert_eq!(
            model.log_likelihood(&[0.0, 0.912, 6.45]),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn upper_limit_drops_the_vsini_term_below_the_ceiling() {
        let obs = Observation::upper_limit(7.3, 0.3, 0.912, 0.034, 6.45, 0.05).unwrap();
        let model = CosiModel::new(obs);

        // At the observed radius and period both remaining terms vanish, so
        // the log-likelihood is exactly zero however far cv_sini sits below
        // the ceiling.
        assert_eq!(model.log_likelihood(&[0.9, 0.912, 6.45]), 0.0);
        assert_eq!(model.log_likelihood(&[0.2, 0.912, 6.45]), 0.0);

        // Off-center radius contributes only its own term.
        let rstar_fit = 0.912 + 0.034;
        assert_abs_diff_eq!(
            model.log_likelihood(&[0.9, rstar_fit, 6.45]),
            -0.5,
            epsilon = 1e-12
        );
    }
}
