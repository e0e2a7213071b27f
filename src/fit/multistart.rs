use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use crate::distr::MixtureParameters;
use super::{FitError, FitResult, InvalidInput};
use super::em::{initialize, FitState};
use log::info;
use std::cmp::Ordering;

/// Results of independent EM fits, one per initial guess (in the order the guesses
/// were informed), and the position of the preferred one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiStart {

    pub fits : Vec<FitResult>,

    pub best : usize

}

impl MultiStart {

    pub fn best(&self) -> &FitResult {
        &self.fits[self.best]
    }

}

/// Runs one EM fit per initial guess. Every guess is validated before any fit starts,
/// so an invalid guess fails the whole call without computation. The fits share no
/// mutable state (each owns its FitState) and are distributed over the rayon pool.
/// The preferred fit has the largest final log-likelihood among fits that recorded no
/// degeneracy; when all of them did, the largest overall.
pub fn multi_start(
    sample : &[f64],
    starts : &[MixtureParameters],
    tolerance : f64,
    max_iter : usize
) -> Result<MultiStart, FitError> {
    if starts.is_empty() {
        return Err(InvalidInput::NoInitialGuess.into());
    }
    let states = starts.iter()
        .map(|init| initialize(sample, *init, tolerance, max_iter) )
        .collect::<Result<Vec<FitState>, FitError>>()?;
    let fits : Vec<FitResult> = states.into_par_iter()
        .map(|state| state.run() )
        .collect();
    let best = best_fit(&fits);
    info!(
        "Multi-start: {} fits; best is fit {} (log-likelihood = {})",
        fits.len(),
        best,
        fits[best].log_likelihood
    );
    Ok(MultiStart { fits, best })
}

fn by_lik(a : &(usize, &FitResult), b : &(usize, &FitResult)) -> Ordering {
    a.1.log_likelihood.total_cmp(&b.1.log_likelihood)
}

fn best_fit(fits : &[FitResult]) -> usize {
    fits.iter()
        .enumerate()
        .filter(|(_, f)| !f.is_degenerate() )
        .max_by(by_lik)
        .or_else(|| fits.iter().enumerate().max_by(by_lik) )
        .map(|(ix, _)| ix )
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::fit::Termination;

    fn sample() -> Vec<f64> {
        vec![-1.1, -0.3, 0.2, 0.4, 1.0, 5.6, 6.1, 6.3, 5.9, 6.0, 6.2]
    }

    #[test]
    fn fits_follow_input_order() {
        let starts = [
            MixtureParameters::new(0.5, -1.0, 7.0, 2.0).unwrap(),
            MixtureParameters::new(0.5, 7.0, -1.0, 2.0).unwrap(),
            MixtureParameters::new(0.2, 3.0, 3.1, 10.0).unwrap()
        ];
        let ms = multi_start(&sample(), &starts, 1E-9, 500).unwrap();
        assert_eq!(ms.fits.len(), 3);
        assert!(ms.fits[0].params.mu1 < ms.fits[0].params.mu2);
        assert!(ms.fits[1].params.mu1 > ms.fits[1].params.mu2);
        assert!((ms.fits[0].log_likelihood - ms.fits[1].log_likelihood).abs() < 1E-6);
        assert!(ms.best().log_likelihood >= ms.fits[0].log_likelihood - 1E-9);
    }

    #[test]
    fn invalid_guess_fails_everything() {
        let starts = [
            MixtureParameters::new(0.5, -1.0, 7.0, 2.0).unwrap(),
            MixtureParameters { pi : 1.0, mu1 : 0.0, mu2 : 1.0, sigma2 : 1.0 }
        ];
        assert_eq!(
            multi_start(&sample(), &starts, 1E-9, 500),
            Err(FitError::InvalidInput(InvalidInput::MixingWeight(1.0)))
        );
        assert_eq!(
            multi_start(&sample(), &[], 1E-9, 500),
            Err(FitError::InvalidInput(InvalidInput::NoInitialGuess))
        );
    }

    #[test]
    fn degenerate_fits_are_not_preferred() {
        let fit = |log_likelihood, termination| FitResult {
            params : MixtureParameters::new(0.5, 0.0, 1.0, 1.0).unwrap(),
            responsibilities : Vec::new(),
            iterations : 1,
            termination,
            log_likelihood,
            trace : vec![log_likelihood],
            degeneracies : Vec::new()
        };
        let fits = vec![
            fit(-10.0, Termination::Converged),
            fit(50.0, Termination::Degenerate),
            fit(-5.0, Termination::MaxIterations)
        ];
        assert_eq!(best_fit(&fits), 2);
        assert_eq!(best_fit(&fits[1..2]), 0);
    }

}
