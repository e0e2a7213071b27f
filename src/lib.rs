/// Univariate densities used by the mixture model: the normal distribution
/// and the two-component normal mixture with a shared variance, both of which
/// can be evaluated (log-probability, likelihood) and sampled from.
pub mod distr;

/// Maximum likelihood estimation of the two-component mixture via the
/// Expectation-Maximization algorithm, with the fit state exposed step-by-step,
/// a multi-start driver for independent fits and a JSON-loadable configuration.
pub mod fit;

/// Reproducibility scores for paired measurements (local and global irreproducible
/// discovery rate) built over the latent component assignment of a fitted mixture.
pub mod idr;

pub use distr::{Normal, MixtureParameters, Univariate};

pub use fit::{FitError, InvalidInput, FitResult, Termination, Degeneracy, Estimator};

pub use fit::em::{ExpectMax, FitState, initialize, DEFAULT_TOLERANCE, DEFAULT_MAX_ITER};
