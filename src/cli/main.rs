use mixem::distr::MixtureParameters;
use mixem::fit::FitConfig;
use mixem::idr::{MixtureIdr, Reproducibility};
use structopt::*;
use anyhow::{Context, Error, anyhow};
use serde::Serialize;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use std::fs::File;
use std::io::{self, Read, Write};
use log::info;

/// Fit two-component normal mixtures by expectation-maximization and score the
/// reproducibility of paired measurements from the command line
#[derive(StructOpt, Debug)]
pub enum Mixem {

    /// Fits the mixture to the first column of a CSV file (or standard input), writing
    /// the fit result as JSON.
    Fit {
        data : Option<String>,

        /// JSON fit configuration (tolerance, max_iterations, initial, starts)
        #[structopt(short)]
        config : Option<String>,

        #[structopt(short)]
        output : Option<String>,

        /// Fit from every guess in the configuration and report all fits
        #[structopt(long)]
        multi : bool,

        /// The CSV file has no header row
        #[structopt(long)]
        no_header : bool
    },

    /// Draws observations from a mixture, writing them as a single-column CSV.
    Simulate {
        #[structopt(short)]
        n : usize,

        #[structopt(long, default_value = "0.5")]
        pi : f64,

        #[structopt(long, allow_hyphen_values = true)]
        mu1 : f64,

        #[structopt(long, allow_hyphen_values = true)]
        mu2 : f64,

        #[structopt(long, default_value = "1.0")]
        sigma2 : f64,

        #[structopt(long)]
        seed : Option<u64>,

        #[structopt(short)]
        output : Option<String>
    },

    /// Scores the reproducibility of the pairs at the first two columns of a CSV file,
    /// writing local and global IDR as JSON.
    Idr {
        data : Option<String>,

        /// JSON fit configuration; its initial guess is used for the mixture
        #[structopt(short)]
        config : Option<String>,

        #[structopt(short)]
        output : Option<String>,

        #[structopt(long)]
        no_header : bool
    }

}

fn open_input(src : &Option<String>) -> Result<Box<dyn Read>, Error> {
    match src {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("Error opening {}", path) )?;
            Ok(Box::new(f))
        },
        None => Ok(Box::new(io::stdin()))
    }
}

fn open_output(dst : &Option<String>) -> Result<Box<dyn Write>, Error> {
    match dst {
        Some(path) => {
            let f = File::create(path).with_context(|| format!("Error creating {}", path) )?;
            Ok(Box::new(f))
        },
        None => Ok(Box::new(io::stdout()))
    }
}

fn load_config(src : &Option<String>) -> Result<FitConfig, Error> {
    match src {
        Some(path) => FitConfig::load_from_path(path)
            .map_err(|e| anyhow!("Error loading configuration {}: {}", path, e) ),
        None => Ok(FitConfig::default())
    }
}

/// Reads the first ncols columns of a CSV table as numeric columns.
fn read_columns(src : &Option<String>, ncols : usize, no_header : bool) -> Result<Vec<Vec<f64>>, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(!no_header)
        .from_reader(open_input(src)?);
    let mut cols = vec![Vec::new(); ncols];
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        for (c, col) in cols.iter_mut().enumerate() {
            let field = record.get(c)
                .ok_or_else(|| anyhow!("Row {} has fewer than {} columns", row + 1, ncols) )?;
            let val : f64 = field.trim().parse()
                .with_context(|| format!("Row {}, column {}: invalid number {:?}", row + 1, c + 1, field) )?;
            col.push(val);
        }
    }
    Ok(cols)
}

fn write_json<T>(value : &T, dst : &Option<String>) -> Result<(), Error>
where
    T : Serialize
{
    let mut out = open_output(dst)?;
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<(), Error> {
    let env = env_logger::Env::default().filter_or("MIXEM_LOG", "info");
    env_logger::init_from_env(env);
    match Mixem::from_args() {
        Mixem::Fit { data, config, output, multi, no_header } => {
            let config = load_config(&config)?;
            let sample = read_columns(&data, 1, no_header)?.remove(0);
            info!("Fitting mixture to {} observations", sample.len());
            if multi {
                let ms = config.multi_start(&sample)?;
                write_json(&ms, &output)
            } else {
                let res = config.fit(&sample)?;
                write_json(&res, &output)
            }
        },
        Mixem::Simulate { n, pi, mu1, mu2, sigma2, seed, output } => {
            let params = MixtureParameters::new(pi, mu1, mu2, sigma2)?;
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy()
            };
            let mut wtr = csv::Writer::from_writer(open_output(&output)?);
            wtr.write_record(&["y"])?;
            for _ in 0..n {
                let y : f64 = params.sample(&mut rng);
                wtr.write_record(&[y.to_string()])?;
            }
            wtr.flush()?;
            Ok(())
        },
        Mixem::Idr { data, config, output, no_header } => {
            let config = load_config(&config)?;
            let mut cols = read_columns(&data, 2, no_header)?;
            let y = cols.remove(1);
            let x = cols.remove(0);
            let init = match config.initial {
                Some(init) => init,
                None => {
                    let summary : Vec<f64> = x.iter().zip(y.iter()).map(|(a, b)| 0.5 * (a + b) ).collect();
                    MixtureParameters::from_moments(&summary)?
                }
            };
            let idr = MixtureIdr { tolerance : config.tolerance, max_iter : config.max_iterations };
            let scores = idr.reproducibility(&x, &y, &init)?;
            write_json(&scores, &output)
        }
    }
}
