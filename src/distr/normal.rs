use super::Univariate;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::default::Default;
use rand::Rng;
use rand_distr::StandardNormal;

/// Univariate normal distribution, parametrized by its location and variance
/// (not the standard deviation, which is how the mixture shares its dispersion
/// parameter between components).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normal {

    loc : f64,

    var : f64

}

impl Default for Normal {

    fn default() -> Self {
        Normal { loc : 0.0, var : 1.0 }
    }

}

impl Normal {

    /// Returns None when the location is not finite or when the variance
    /// is not a finite, strictly positive value.
    pub fn new(loc : f64, var : f64) -> Option<Self> {
        if loc.is_finite() && var.is_finite() && var > 0.0 {
            Some(Self { loc, var })
        } else {
            None
        }
    }

    pub fn loc(&self) -> f64 {
        self.loc
    }

    pub fn stddev(&self) -> f64 {
        self.var.sqrt()
    }

}

impl Univariate for Normal {

    fn log_prob(&self, y : f64) -> f64 {
        normal_log_prob(y, self.loc, self.var)
    }

    fn mean(&self) -> f64 {
        self.loc
    }

    fn var(&self) -> f64 {
        self.var
    }

}

impl rand_distr::Distribution<f64> for Normal {

    fn sample<R>(&self, rng : &mut R) -> f64
    where
        R : Rng + ?Sized
    {
        let z : f64 = rng.sample(StandardNormal);
        z * self.var.sqrt() + self.loc
    }

}

/// Log-density of y under N(mu, var). Evaluated directly from the variance, so it
/// can be called with parameters that are not (or not yet) wrapped in a Normal.
pub(crate) fn normal_log_prob(y : f64, mu : f64, var : f64) -> f64 {
    -0.5 * (2.0 * PI * var).ln() - (y - mu).powi(2) / (2.0 * var)
}

pub(crate) fn normal_prob(y : f64, mu : f64, var : f64) -> f64 {
    normal_log_prob(y, mu, var).exp()
}
