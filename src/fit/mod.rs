use crate::distr::MixtureParameters;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Expectation-Maximization for the two-component normal mixture with shared variance.
pub mod em;

/// Independent fits from several initial guesses, executed in parallel.
pub mod multistart;

/// JSON-serializable fit configuration (tolerance, iteration budget and initial guesses).
pub mod config;

pub use config::FitConfig;

/// Reasons for rejecting a fit before any computation takes place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {

    #[error("Sample is empty")]
    EmptySample,

    #[error("Observation {index} is not finite ({value})")]
    NonFiniteObservation { index : usize, value : f64 },

    #[error("Mixing weight {0} outside the open interval (0, 1)")]
    MixingWeight(f64),

    #[error("Component mean {0} is not finite")]
    Mean(f64),

    #[error("Variance {0} is not a finite, strictly positive value")]
    Variance(f64),

    #[error("Tolerance {0} is not a finite, strictly positive value")]
    Tolerance(f64),

    #[error("Maximum number of iterations must be positive")]
    MaxIterations,

    #[error("Paired measurements have different lengths ({0} and {1})")]
    UnpairedSample(usize, usize),

    #[error("At least one initial guess is required")]
    NoInitialGuess

}

/// The only hard failure of a fit. Numerical problems found while iterating are
/// recorded in the FitResult instead, since a partial or degenerate fit is still
/// useful diagnostic output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput)

}

/// Mixture component, as labelled by the parameter vector (component 1 carries the
/// mixing weight pi; component 2 carries 1 - pi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    First,
    Second
}

/// Numerical anomalies detected during an EM step. A fit that records any of them
/// should be inspected before its estimates are used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Degeneracy {

    /// The total responsibility of the component collapsed to zero at this iteration,
    /// so its mean could not be updated and was held at the previous value.
    EmptyComponent { iteration : usize, component : Component },

    /// The mixing weight reached the boundary of (0, 1).
    BoundaryWeight { iteration : usize, pi : f64 },

    /// The pooled variance update was zero or not finite. The previous variance is
    /// kept and the fit stops.
    Variance { iteration : usize, sigma2 : f64 }

}

impl Degeneracy {

    pub fn iteration(&self) -> usize {
        match self {
            Degeneracy::EmptyComponent { iteration, .. } => *iteration,
            Degeneracy::BoundaryWeight { iteration, .. } => *iteration,
            Degeneracy::Variance { iteration, .. } => *iteration
        }
    }

    /// Whether the fit cannot proceed past this anomaly.
    pub fn is_fatal(&self) -> bool {
        match self {
            Degeneracy::Variance { .. } => true,
            _ => false
        }
    }

}

/// Why the EM iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {

    /// The absolute log-likelihood change between two iterations fell below the tolerance.
    Converged,

    /// The iteration budget was exhausted before convergence; estimates are the last ones
    /// computed.
    MaxIterations,

    /// The variance update degenerated; estimates carry the last valid variance.
    Degenerate

}

/// Final state of an EM fit, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {

    pub params : MixtureParameters,

    /// Posterior probabilities of component 2 for each observation, evaluated at the
    /// final parameters.
    pub responsibilities : Vec<f64>,

    pub iterations : usize,

    pub termination : Termination,

    /// Log-likelihood at the final parameters.
    pub log_likelihood : f64,

    /// Log-likelihood at the initial guess followed by the value after each step.
    pub trace : Vec<f64>,

    pub degeneracies : Vec<Degeneracy>

}

impl FitResult {

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// True when any numerical anomaly was recorded, fatal or not.
    pub fn is_degenerate(&self) -> bool {
        self.termination == Termination::Degenerate || !self.degeneracies.is_empty()
    }

    /// Hard allocation of each observation to the component with the larger
    /// responsibility (ties go to component 1).
    pub fn classify(&self) -> Vec<Component> {
        self.responsibilities.iter()
            .map(|w| if *w > 0.5 { Component::Second } else { Component::First } )
            .collect()
    }

}

/// Trait shared by inference algorithms, parametrized by what the fit yields. Estimator
/// does not care how the implementor is instantiated: tolerance, budgets and initial
/// guesses belong to the implementor; the trait only receives the sample.
pub trait Estimator {

    type Output;

    /// Runs the inference algorithm for the informed sample, returning a reference
    /// to the stored output.
    fn fit<'a>(&'a mut self, sample : &[f64]) -> Result<&'a Self::Output, FitError>;

    /// If fit(.) has been called successfully at least once, returns the last
    /// output without changing the algorithm state.
    fn posterior<'a>(&'a self) -> Option<&'a Self::Output>;

}
