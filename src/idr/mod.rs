use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use crate::distr::MixtureParameters;
use crate::fit::{FitError, FitResult, InvalidInput};
use crate::fit::em::{initialize, DEFAULT_TOLERANCE, DEFAULT_MAX_ITER};
use log::info;

/// Estimators of reproducibility for paired measurements (e.g. the same signals scored
/// in two replicates). Given the pairs and an initial guess for the latent two-group
/// model, an implementor returns, for each pair, a score in [0,1] with the posterior
/// probability that the pair belongs to the reproducible group. The copula-based
/// estimators of dedicated IDR packages fit behind this same contract.
pub trait Reproducibility {

    fn reproducibility(
        &self,
        x : &[f64],
        y : &[f64],
        init : &MixtureParameters
    ) -> Result<ReproducibilityScores, FitError>;

}

/// Per-pair reproducibility, in the order the pairs were informed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproducibilityScores {

    /// Posterior probability of the reproducible group.
    pub reproducible : Vec<f64>,

    /// Local irreproducible discovery rate (posterior probability of the
    /// irreproducible group).
    pub local_idr : Vec<f64>,

    /// Global IDR: the average local idr over all pairs at least as reproducible as
    /// this one, i.e. the expected irreproducible fraction if every pair down to this
    /// one is selected.
    pub idr : Vec<f64>,

    pub fit : FitResult

}

impl ReproducibilityScores {

    /// Indices of the pairs with global IDR at or below alpha, from the most
    /// reproducible down.
    pub fn select(&self, alpha : f64) -> Vec<usize> {
        let mut ixs : Vec<usize> = (0..self.idr.len())
            .filter(|ix| self.idr[*ix] <= alpha )
            .collect();
        ixs.sort_by(|a, b| self.local_idr[*a].total_cmp(&self.local_idr[*b]) );
        ixs
    }

}

/// Reproducibility from the two-component normal mixture: each pair is summarized
/// by the mean of its two measurements, the mixture is fitted by EM over the summaries,
/// and the component with the larger mean is taken as the reproducible group.
/// Reproducible signals score consistently high in both replicates, so their average
/// is shifted away from the irreproducible noise.
#[derive(Debug, Clone)]
pub struct MixtureIdr {

    pub tolerance : f64,

    pub max_iter : usize

}

impl Default for MixtureIdr {

    fn default() -> Self {
        Self { tolerance : DEFAULT_TOLERANCE, max_iter : DEFAULT_MAX_ITER }
    }

}

impl Reproducibility for MixtureIdr {

    fn reproducibility(
        &self,
        x : &[f64],
        y : &[f64],
        init : &MixtureParameters
    ) -> Result<ReproducibilityScores, FitError> {
        if x.len() != y.len() {
            return Err(InvalidInput::UnpairedSample(x.len(), y.len()).into());
        }
        let summary : Vec<f64> = x.iter().zip(y.iter()).map(|(a, b)| 0.5 * (a + b) ).collect();
        let fit = initialize(&summary, *init, self.tolerance, self.max_iter)?.run();

        // Responsibilities are for component 2; flip them when component 1 sits higher.
        let second_reproducible = fit.params.mu2 >= fit.params.mu1;
        let reproducible : Vec<f64> = fit.responsibilities.iter()
            .map(|w| if second_reproducible { *w } else { 1.0 - w } )
            .collect();
        let local_idr : Vec<f64> = reproducible.iter().map(|r| 1.0 - r ).collect();
        let idr = global_idr(&local_idr);
        info!(
            "Reproducibility: {} of {} pairs with IDR <= 0.05",
            idr.iter().filter(|v| **v <= 0.05 ).count(),
            idr.len()
        );
        Ok(ReproducibilityScores { reproducible, local_idr, idr, fit })
    }

}

/// Global IDR from local idr values: ranks the observations by increasing local idr and
/// takes the running mean. Observations with tied local idr share the value of the
/// last member of the tie, so the result does not depend on their order.
pub fn global_idr(local_idr : &[f64]) -> Vec<f64> {
    let mut order : Vec<usize> = (0..local_idr.len()).collect();
    order.sort_by(|a, b| local_idr[*a].total_cmp(&local_idr[*b]) );
    let mut idr = vec![0.0; local_idr.len()];
    let mut sum = 0.0;
    let mut pos = 0;
    while pos < order.len() {
        let val = local_idr[order[pos]];
        let end = pos + order[pos..].iter()
            .take_while(|ix| local_idr[**ix].total_cmp(&val) == Ordering::Equal )
            .count();
        for ix in &order[pos..end] {
            sum += local_idr[*ix];
        }
        let avg = sum / end as f64;
        for ix in &order[pos..end] {
            idr[*ix] = avg;
        }
        pos = end;
    }
    idr
}
