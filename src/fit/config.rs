use serde::{Serialize, Deserialize};
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use crate::distr::MixtureParameters;
use super::{FitError, InvalidInput, FitResult, Estimator};
use super::em::{ExpectMax, DEFAULT_TOLERANCE, DEFAULT_MAX_ITER};
use super::multistart::{multi_start, MultiStart};

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_max_iter() -> usize {
    DEFAULT_MAX_ITER
}

/// Fit settings as read from a JSON file, e.g.
/// `{ "tolerance" : 1e-8, "max_iterations" : 200, "initial" : { "pi" : 0.5, "mu1" : -2, "mu2" : 8, "sigma2" : 2 } }`.
/// Absent fields take the defaults; an absent initial guess is derived from the sample
/// moments (MixtureParameters::from_moments). Additional guesses under "starts" turn the
/// fit into a multi-start fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {

    #[serde(default = "default_tolerance")]
    pub tolerance : f64,

    #[serde(default = "default_max_iter")]
    pub max_iterations : usize,

    #[serde(default)]
    pub initial : Option<MixtureParameters>,

    #[serde(default)]
    pub starts : Vec<MixtureParameters>

}

impl Default for FitConfig {

    fn default() -> Self {
        Self {
            tolerance : DEFAULT_TOLERANCE,
            max_iterations : DEFAULT_MAX_ITER,
            initial : None,
            starts : Vec::new()
        }
    }

}

impl FitConfig {

    pub fn load_from_path<P>(path : P) -> Result<Self, Box<dyn Error>>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(mut reader : R) -> Result<Self, Box<dyn Error>>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let config : FitConfig = serde_json::from_str(&content[..])?;
        Ok(config)
    }

    pub fn save_to_path<P>(&self, path : P) -> Result<(), Box<dyn Error>>
    where
        P : AsRef<Path>
    {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        self.save(file)
    }

    pub fn save<W>(&self, mut writer : W) -> Result<(), Box<dyn Error>>
    where
        W : Write
    {
        let content = serde_json::to_string_pretty(self)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Initial guesses in the order they are fitted: the informed (or moment-based)
    /// initial guess, then any additional starts.
    pub fn guesses(&self, sample : &[f64]) -> Result<Vec<MixtureParameters>, FitError> {
        let first = match self.initial {
            Some(init) => init,
            None => MixtureParameters::from_moments(sample)?
        };
        Ok(std::iter::once(first).chain(self.starts.iter().cloned()).collect())
    }

    /// Single EM fit from the first guess.
    pub fn fit(&self, sample : &[f64]) -> Result<FitResult, FitError> {
        let init = self.guesses(sample)?
            .first()
            .cloned()
            .ok_or(InvalidInput::NoInitialGuess)?;
        let mut em = ExpectMax::new(init)
            .tolerance(self.tolerance)
            .max_iter(self.max_iterations);
        em.fit(sample).map(|res| res.clone() )
    }

    /// Independent EM fits from every guess.
    pub fn multi_start(&self, sample : &[f64]) -> Result<MultiStart, FitError> {
        let guesses = self.guesses(sample)?;
        multi_start(sample, &guesses, self.tolerance, self.max_iterations)
    }

}
