pub mod normal;

pub use normal::*;

pub mod mixture;

pub use mixture::*;

/// Trait shared by the univariate distributions of this crate. The immediate
/// state of an implementor is its parameter set; the log-probability of a single
/// realization and the distribution summaries are functions of that state.
/// Sampling is delegated to rand_distr::Distribution<f64>, which every implementor
/// also satisfies, so the same value can be used to evaluate and to simulate data.
pub trait Univariate
    where Self : rand_distr::Distribution<f64>
{

    /// Evaluates the log-probability (log-density) of the realization y with respect
    /// to the current parameter state.
    fn log_prob(&self, y : f64) -> f64;

    fn prob(&self, y : f64) -> f64 {
        self.log_prob(y).exp()
    }

    /// Sums the log-probability over a sample of independent realizations.
    fn log_likelihood(&self, y : &[f64]) -> f64 {
        y.iter().map(|y| self.log_prob(*y) ).sum()
    }

    /// Returns the expected value of the distribution.
    fn mean(&self) -> f64;

    /// Returns the dispersion around the expected value.
    fn var(&self) -> f64;

}
