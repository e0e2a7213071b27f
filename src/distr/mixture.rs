use super::Univariate;
use super::normal::{normal_log_prob, normal_prob};
use crate::fit::InvalidInput;
use serde::{Serialize, Deserialize};
use rand::Rng;
use rand_distr::StandardNormal;

/// Parameter state of a two-component normal mixture with shared variance:
/// p(y) = pi N(y; mu1, sigma2) + (1 - pi) N(y; mu2, sigma2).
/// The mixture is the marginal of a latent binary allocation z: the observation was
/// generated by component 1 with probability pi and by component 2 otherwise, and
/// we only see y. The posterior of z given y is the responsibility of each component.
///
/// Which of the components is called "1" is arbitrary: the likelihood is invariant
/// to exchanging (pi, mu1) with (1 - pi, mu2), so two fits from different initial
/// guesses may recover the same mixture with its labels exchanged (label switching).
/// Use ordered() to compare estimates regardless of labelling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureParameters {

    /// Mixing weight of component 1.
    pub pi : f64,

    /// Mean of component 1.
    pub mu1 : f64,

    /// Mean of component 2.
    pub mu2 : f64,

    /// Variance shared by both components.
    pub sigma2 : f64

}

impl MixtureParameters {

    pub fn new(pi : f64, mu1 : f64, mu2 : f64, sigma2 : f64) -> Result<Self, InvalidInput> {
        let params = Self { pi, mu1, mu2, sigma2 };
        params.validate()?;
        Ok(params)
    }

    /// Verifies the parameter domain: pi in the open interval (0, 1), finite means
    /// and a finite, strictly positive variance.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if !(self.pi > 0.0 && self.pi < 1.0) {
            return Err(InvalidInput::MixingWeight(self.pi));
        }
        if !self.mu1.is_finite() {
            return Err(InvalidInput::Mean(self.mu1));
        }
        if !self.mu2.is_finite() {
            return Err(InvalidInput::Mean(self.mu2));
        }
        if !(self.sigma2 > 0.0 && self.sigma2.is_finite()) {
            return Err(InvalidInput::Variance(self.sigma2));
        }
        Ok(())
    }

    /// Initial guess placing both components one standard deviation away from the
    /// sample mean, with equal weights and the sample variance as the shared variance.
    /// A sample without dispersion yields unit variance and coincident means.
    pub fn from_moments(y : &[f64]) -> Result<Self, InvalidInput> {
        if y.is_empty() {
            return Err(InvalidInput::EmptySample);
        }
        let n = y.len() as f64;
        let mean = y.iter().sum::<f64>() / n;
        let var = y.iter().map(|y| (y - mean).powi(2) ).sum::<f64>() / n;
        let sigma2 = if var > 0.0 { var } else { 1.0 };
        let sd = var.sqrt();
        Self::new(0.5, mean - sd, mean + sd, sigma2)
    }

    /// Weighted (unnormalized) densities (pi N(y; mu1, sigma2), (1-pi) N(y; mu2, sigma2)).
    pub fn component_densities(&self, y : f64) -> (f64, f64) {
        (
            self.pi * normal_prob(y, self.mu1, self.sigma2),
            (1.0 - self.pi) * normal_prob(y, self.mu2, self.sigma2)
        )
    }

    /// Posterior probability that y was generated by component 2. When both weighted
    /// densities underflow to zero the observation is assigned to the component with the
    /// closer mean, and ties go to component 1.
    pub fn responsibility(&self, y : f64) -> f64 {
        let (d1, d2) = self.component_densities(y);
        let marg = d1 + d2;
        if marg > 0.0 && marg.is_finite() {
            d2 / marg
        } else if (y - self.mu2).abs() < (y - self.mu1).abs() {
            1.0
        } else {
            0.0
        }
    }

    /// Returns the same mixture with component labels exchanged.
    pub fn swapped(&self) -> Self {
        Self { pi : 1.0 - self.pi, mu1 : self.mu2, mu2 : self.mu1, sigma2 : self.sigma2 }
    }

    /// Returns the labelling where component 1 has the smaller mean.
    pub fn ordered(&self) -> Self {
        if self.mu1 <= self.mu2 {
            *self
        } else {
            self.swapped()
        }
    }

    /// Weight, mean and variance of each component.
    pub fn components(&self) -> [(f64, f64, f64); 2] {
        [(self.pi, self.mu1, self.sigma2), (1.0 - self.pi, self.mu2, self.sigma2)]
    }

}

impl Univariate for MixtureParameters {

    // log(a + b) = max + log(exp(a - max) + exp(b - max)), so the likelihood stays finite
    // for observations where both densities underflow.
    fn log_prob(&self, y : f64) -> f64 {
        let a = self.pi.ln() + normal_log_prob(y, self.mu1, self.sigma2);
        let b = (1.0 - self.pi).ln() + normal_log_prob(y, self.mu2, self.sigma2);
        let max = a.max(b);
        if max == f64::NEG_INFINITY || max.is_nan() {
            return max;
        }
        max + ((a - max).exp() + (b - max).exp()).ln()
    }

    fn mean(&self) -> f64 {
        self.pi * self.mu1 + (1.0 - self.pi) * self.mu2
    }

    // Within-component variance plus the variance of the component means.
    fn var(&self) -> f64 {
        self.sigma2 + self.pi * (1.0 - self.pi) * (self.mu1 - self.mu2).powi(2)
    }

}

impl rand_distr::Distribution<f64> for MixtureParameters {

    fn sample<R>(&self, rng : &mut R) -> f64
    where
        R : Rng + ?Sized
    {
        let loc = if rng.gen::<f64>() < self.pi { self.mu1 } else { self.mu2 };
        let z : f64 = rng.sample(StandardNormal);
        z * self.sigma2.sqrt() + loc
    }

}
