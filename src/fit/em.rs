use nalgebra::DVector;
use crate::distr::{MixtureParameters, Univariate};
use super::{FitError, InvalidInput, FitResult, Termination, Degeneracy, Component, Estimator};
use log::{debug, info, warn};

pub const DEFAULT_TOLERANCE : f64 = 1E-6;

pub const DEFAULT_MAX_ITER : usize = 1000;

/// The expectation maximization algorithm finds a local maximum of the likelihood
/// of a model with latent variables by alternating two steps. In the expectation step,
/// the posterior probability of the latent component allocation of each observation
/// (its responsibility) is computed at the current parameters; in the maximization step,
/// the parameters are set at the maximum of the expected complete-data log-likelihood,
/// which for the normal mixture are closed-form weighted averages of the sample.
/// Each iteration cannot decrease the observed-data likelihood, so iterating until the
/// log-likelihood stops changing yields a stationary point, which depends on the initial
/// guess: components may come out with labels exchanged relative to another guess
/// (see MixtureParameters), and poor guesses may reach a worse local maximum (see
/// multistart::multi_start).
///
/// # References
/// Dempster, A. P., Laird, N. M., & Rubin, D. B.
/// ([1977](https://rss.onlinelibrary.wiley.com/doi/abs/10.1111/j.2517-6161.1977.tb01600.x)).
/// Maximum Likelihood from Incomplete Data
/// Via the EM Algorithm. Journal of the Royal Statistical Society: Series B (Methodological),
/// 39(1), 1-22. doi: 10.1111/j.2517-6161.1977.tb01600.x
#[derive(Debug, Clone)]
pub struct ExpectMax {

    init : MixtureParameters,

    tolerance : f64,

    max_iter : usize,

    result : Option<FitResult>

}

impl ExpectMax {

    pub fn new(init : MixtureParameters) -> Self {
        Self { init, tolerance : DEFAULT_TOLERANCE, max_iter : DEFAULT_MAX_ITER, result : None }
    }

    pub fn tolerance(mut self, tolerance : f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iter(mut self, max_iter : usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Validates the sample against this configuration, yielding a state that can be
    /// iterated manually with FitState::step.
    pub fn initialize(&self, sample : &[f64]) -> Result<FitState, FitError> {
        initialize(sample, self.init, self.tolerance, self.max_iter)
    }

}

impl Estimator for ExpectMax {

    type Output = FitResult;

    fn fit<'a>(&'a mut self, sample : &[f64]) -> Result<&'a FitResult, FitError> {
        let res = self.initialize(sample)?.run();
        let res : &FitResult = self.result.insert(res);
        Ok(res)
    }

    fn posterior<'a>(&'a self) -> Option<&'a FitResult> {
        self.result.as_ref()
    }

}

/// State of an EM fit between iterations. The state exclusively owns a copy of the
/// sample, so independent fits never share mutable data.
#[derive(Debug, Clone)]
pub struct FitState {

    y : DVector<f64>,

    // Variances at or below this value are within the rounding error of summing
    // n observations of this magnitude, and are taken as zero.
    var_floor : f64,

    params : MixtureParameters,

    // Responsibilities of component 2 computed at the last expectation step.
    resp : DVector<f64>,

    log_lik : f64,

    trace : Vec<f64>,

    iteration : usize,

    tolerance : f64,

    max_iter : usize,

    degeneracies : Vec<Degeneracy>

}

/// Validates the fit input and evaluates the log-likelihood at the initial guess.
/// Nothing is computed when the sample is empty or has non-finite values, when the
/// guess is outside the parameter domain (pi in (0,1), sigma2 > 0, finite means),
/// or when the tolerance or the iteration budget are not positive.
pub fn initialize(
    sample : &[f64],
    initial : MixtureParameters,
    tolerance : f64,
    max_iter : usize
) -> Result<FitState, FitError> {
    if sample.is_empty() {
        return Err(InvalidInput::EmptySample.into());
    }
    if let Some((index, value)) = sample.iter().enumerate().find(|(_, y)| !y.is_finite() ) {
        return Err(InvalidInput::NonFiniteObservation { index, value : *value }.into());
    }
    initial.validate()?;
    if !(tolerance > 0.0 && tolerance.is_finite()) {
        return Err(InvalidInput::Tolerance(tolerance).into());
    }
    if max_iter == 0 {
        return Err(InvalidInput::MaxIterations.into());
    }
    let y = DVector::from_column_slice(sample);
    let n = y.nrows() as f64;
    let var_floor = (4.0 * n * f64::EPSILON).powi(2) * y.norm_squared() / n;
    let log_lik = initial.log_likelihood(sample);
    let resp = DVector::zeros(y.nrows());
    Ok(FitState {
        y,
        var_floor,
        params : initial,
        resp,
        log_lik,
        trace : vec![log_lik],
        iteration : 0,
        tolerance,
        max_iter,
        degeneracies : Vec::new()
    })
}

impl FitState {

    pub fn params(&self) -> &MixtureParameters {
        &self.params
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_lik
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Responsibilities of component 2 from the last expectation step (all zero
    /// before the first step).
    pub fn responsibilities(&self) -> &[f64] {
        self.resp.as_slice()
    }

    pub fn trace(&self) -> &[f64] {
        &self.trace
    }

    pub fn degeneracies(&self) -> &[Degeneracy] {
        &self.degeneracies
    }

    /// Performs one expectation step followed by one maximization step, updating
    /// the parameters, the log-likelihood and the iteration counter.
    pub fn step(mut self) -> Self {
        self.iteration += 1;
        expectation_step(&mut self.resp, &self.y, &self.params);
        let (next, found) = maximization_step(
            &self.y,
            &self.resp,
            &self.params,
            self.var_floor,
            self.iteration
        );
        for d in found.iter() {
            warn!("Numerical degeneracy: {:?}", d);
        }
        self.degeneracies.extend(found);
        self.params = next;
        self.log_lik = self.params.log_likelihood(self.y.as_slice());
        self.trace.push(self.log_lik);
        debug!(
            "Iteration {}: log-likelihood = {}; pi = {}; mu1 = {}; mu2 = {}; sigma2 = {}",
            self.iteration,
            self.log_lik,
            self.params.pi,
            self.params.mu1,
            self.params.mu2,
            self.params.sigma2
        );
        self
    }

    // Whether the last step found a variance collapse.
    fn collapsed(&self) -> bool {
        self.degeneracies.iter()
            .any(|d| d.is_fatal() && d.iteration() == self.iteration )
    }

    /// Steps until the absolute log-likelihood change falls below the tolerance, the
    /// iteration budget is exhausted or the variance collapses.
    pub fn run(mut self) -> FitResult {
        let termination = loop {
            if self.iteration >= self.max_iter {
                break Termination::MaxIterations;
            }
            let prev = self.log_lik;
            self = self.step();
            if self.collapsed() {
                break Termination::Degenerate;
            }
            if (self.log_lik - prev).abs() < self.tolerance {
                break Termination::Converged;
            }
        };
        self.finish(termination)
    }

    fn finish(mut self, termination : Termination) -> FitResult {
        expectation_step(&mut self.resp, &self.y, &self.params);
        info!(
            "EM finished after {} iterations ({:?}); log-likelihood = {}",
            self.iteration,
            termination,
            self.log_lik
        );
        FitResult {
            params : self.params,
            responsibilities : self.resp.as_slice().to_vec(),
            iterations : self.iteration,
            termination,
            log_likelihood : self.log_lik,
            trace : self.trace,
            degeneracies : self.degeneracies
        }
    }

}

/// Update responsibility vector from the current parameters.
fn expectation_step(resp : &mut DVector<f64>, y : &DVector<f64>, params : &MixtureParameters) {
    resp.iter_mut()
        .zip(y.iter())
        .for_each(|(w, y)| *w = params.responsibility(*y) );
}

/// Closed-form maximizer of the expected complete-data log-likelihood given the
/// responsibilities. Quantities that cannot be updated are held at their previous
/// values, and the anomaly is returned alongside the new parameters.
/// - y : Sample
/// - resp : Responsibilities of component 2
/// - prev : Parameters used at the expectation step
/// - floor : Variances at or below this value are taken as zero
fn maximization_step(
    y : &DVector<f64>,
    resp : &DVector<f64>,
    prev : &MixtureParameters,
    floor : f64,
    iteration : usize
) -> (MixtureParameters, Vec<Degeneracy>) {

    let n = y.nrows() as f64;
    let compl = resp.map(|w| 1.0 - w );
    let mut found = Vec::new();

    // Marginal responsibilities (over observations) for each component
    let mass1 = compl.sum();
    let mass2 = resp.sum();

    let mu1 = if mass1 > 0.0 {
        compl.dot(y) / mass1
    } else {
        found.push(Degeneracy::EmptyComponent { iteration, component : Component::First });
        prev.mu1
    };
    let mu2 = if mass2 > 0.0 {
        resp.dot(y) / mass2
    } else {
        found.push(Degeneracy::EmptyComponent { iteration, component : Component::Second });
        prev.mu2
    };

    let pi = mass1 / n;
    if !(pi > 0.0 && pi < 1.0) {
        found.push(Degeneracy::BoundaryWeight { iteration, pi });
    }

    let pooled = y.iter()
        .zip(resp.iter())
        .map(|(y, w)| w * (y - mu2).powi(2) + (1.0 - w) * (y - mu1).powi(2) )
        .sum::<f64>() / n;
    let sigma2 = if pooled.is_finite() && pooled > floor {
        pooled
    } else {
        found.push(Degeneracy::Variance { iteration, sigma2 : pooled });
        prev.sigma2
    };

    (MixtureParameters { pi, mu1, mu2, sigma2 }, found)
}
