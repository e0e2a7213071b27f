use mixem::distr::*;
use mixem::fit::*;
use mixem::fit::em::*;
use mixem::fit::multistart::multi_start;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;

// Floating-point slack allowed for log-likelihood decreases between iterations.
const EPS : f64 = 1E-9;

/// 1000 draws with 30% of the mass at mean 0 and 70% at mean 10, unit variance.
fn well_separated(seed : u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let truth = MixtureParameters::new(0.3, 0.0, 10.0, 1.0).unwrap();
    (0..1000).map(|_| truth.sample(&mut rng) ).collect()
}

/// Overlapping components, where EM needs many iterations.
fn overlapping(seed : u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let truth = MixtureParameters::new(0.6, 0.0, 2.0, 1.5).unwrap();
    (0..500).map(|_| truth.sample(&mut rng) ).collect()
}

#[test]
fn likelihood_is_monotone() {
    let guesses = [
        MixtureParameters::new(0.5, -2.0, 8.0, 2.0).unwrap(),
        MixtureParameters::new(0.9, 4.0, 5.0, 30.0).unwrap(),
        MixtureParameters::new(0.1, -5.0, 20.0, 0.5).unwrap()
    ];
    for sample in [well_separated(1), overlapping(2)].iter() {
        for init in guesses.iter() {
            let mut state = initialize(sample, *init, 1E-12, 300).unwrap();
            let mut prev = state.log_likelihood();
            for _ in 0..100 {
                state = state.step();
                assert!(state.log_likelihood() >= prev - EPS);
                prev = state.log_likelihood();
            }
            let res = initialize(sample, *init, 1E-12, 300).unwrap().run();
            for w in res.trace.windows(2) {
                assert!(w[1] >= w[0] - EPS);
            }
        }
    }
}

#[test]
fn responsibilities_are_probabilities() {
    let sample = overlapping(3);
    let init = MixtureParameters::new(0.5, -1.0, 3.0, 1.0).unwrap();
    let mut state = initialize(&sample, init, 1E-10, 100).unwrap();
    for _ in 0..20 {
        state = state.step();
        assert!(state.responsibilities().iter().all(|w| !w.is_nan() && *w >= 0.0 && *w <= 1.0 ));
    }
    let res = state.run();
    assert_eq!(res.responsibilities.len(), sample.len());
    assert!(res.responsibilities.iter().all(|w| !w.is_nan() && *w >= 0.0 && *w <= 1.0 ));
}

#[test]
fn recovers_well_separated_mixture() {
    let sample = well_separated(42);
    let init = MixtureParameters::new(0.5, -2.0, 8.0, 2.0).unwrap();
    let res = initialize(&sample, init, DEFAULT_TOLERANCE, 200).unwrap().run();
    assert!(res.converged());
    assert!(res.iterations <= 200);
    assert!(res.degeneracies.is_empty());
    assert!(res.params.mu1.abs() < 0.5);
    assert!((res.params.mu2 - 10.0).abs() < 0.5);
    assert!((res.params.pi - 0.3).abs() < 0.05);
    assert!((res.params.sigma2 - 1.0).abs() < 0.2);
    let first = res.classify().iter().filter(|c| **c == Component::First ).count();
    assert!((first as f64 / 1000.0 - 0.3).abs() < 0.05);
}

#[test]
fn identical_observations_are_degenerate() {
    let sample = vec![5.0; 50];
    for init in [
        MixtureParameters::new(0.5, 4.0, 6.0, 1.0).unwrap(),
        MixtureParameters::new(0.3, 4.0, 8.0, 2.0).unwrap()
    ].iter() {
        let res = initialize(&sample, *init, DEFAULT_TOLERANCE, DEFAULT_MAX_ITER).unwrap().run();
        assert_eq!(res.termination, Termination::Degenerate);
        assert!(res.is_degenerate());
        assert!(res.degeneracies.iter().any(|d| match d {
            Degeneracy::Variance { .. } => true,
            _ => false
        }));
        assert!(res.params.sigma2 > 0.0 && res.params.sigma2.is_finite());
        assert!((res.params.mu1 - 5.0).abs() < 1E-9);
        assert!((res.params.mu2 - 5.0).abs() < 1E-9);
        assert!(res.log_likelihood.is_finite());
    }
}

#[test]
fn swapped_guess_swaps_labels() {
    let sample = well_separated(7);
    let a = MixtureParameters::new(0.5, 0.0, 8.0, 2.0).unwrap();
    let b = MixtureParameters::new(0.5, 8.0, 0.0, 2.0).unwrap();
    let fit_a = initialize(&sample, a, 1E-10, 500).unwrap().run();
    let fit_b = initialize(&sample, b, 1E-10, 500).unwrap().run();
    assert!(fit_a.converged() && fit_b.converged());
    assert!((fit_a.params.mu1 - fit_b.params.mu2).abs() < 1E-6);
    assert!((fit_a.params.mu2 - fit_b.params.mu1).abs() < 1E-6);
    assert!((fit_a.params.pi - (1.0 - fit_b.params.pi)).abs() < 1E-6);
    assert!((fit_a.params.sigma2 - fit_b.params.sigma2).abs() < 1E-6);
    assert!((fit_a.log_likelihood - fit_b.log_likelihood).abs() < 1E-6);
    let (oa, ob) = (fit_a.params.ordered(), fit_b.params.ordered());
    assert!((oa.pi - ob.pi).abs() < 1E-6);
}

#[test]
fn invalid_input_is_rejected() {
    let sample = [1.0, 2.0, 3.0];
    let valid = MixtureParameters { pi : 0.5, mu1 : 0.0, mu2 : 1.0, sigma2 : 1.0 };
    let check = |sample : &[f64], init : MixtureParameters, expected : InvalidInput| {
        let res = initialize(sample, init, DEFAULT_TOLERANCE, DEFAULT_MAX_ITER);
        assert_eq!(res.err(), Some(FitError::InvalidInput(expected)));
    };
    check(&[], valid, InvalidInput::EmptySample);
    check(&sample, MixtureParameters { pi : 0.0, ..valid }, InvalidInput::MixingWeight(0.0));
    check(&sample, MixtureParameters { pi : 1.0, ..valid }, InvalidInput::MixingWeight(1.0));
    check(&sample, MixtureParameters { sigma2 : 0.0, ..valid }, InvalidInput::Variance(0.0));
    check(&sample, MixtureParameters { sigma2 : -1.0, ..valid }, InvalidInput::Variance(-1.0));
    check(&[1.0, f64::INFINITY], valid, InvalidInput::NonFiniteObservation { index : 1, value : f64::INFINITY });
    assert_eq!(
        initialize(&sample, valid, 0.0, 10).err(),
        Some(FitError::InvalidInput(InvalidInput::Tolerance(0.0)))
    );
    assert_eq!(
        initialize(&sample, valid, 1E-6, 0).err(),
        Some(FitError::InvalidInput(InvalidInput::MaxIterations))
    );
}

#[test]
fn budget_exhaustion_is_not_an_error() {
    let sample = overlapping(11);
    let init = MixtureParameters::new(0.5, -3.0, 6.0, 4.0).unwrap();
    let res = initialize(&sample, init, 1E-14, 3).unwrap().run();
    assert_eq!(res.termination, Termination::MaxIterations);
    assert!(!res.converged());
    assert_eq!(res.iterations, 3);
    assert_eq!(res.trace.len(), 4);
    assert_eq!(res.log_likelihood, res.trace[3]);
}

#[test]
fn multi_start_prefers_highest_likelihood() {
    let sample = well_separated(5);
    let starts = [
        MixtureParameters::new(0.5, -2.0, 8.0, 2.0).unwrap(),
        MixtureParameters::new(0.5, 8.0, -2.0, 2.0).unwrap(),
        MixtureParameters::new(0.5, 100.0, 101.0, 0.1).unwrap()
    ];
    let ms = multi_start(&sample, &starts, 1E-8, 1000).unwrap();
    assert_eq!(ms.fits.len(), 3);
    let best = ms.best().params.ordered();
    assert!(best.mu1.abs() < 0.5 && (best.mu2 - 10.0).abs() < 0.5);
    for f in ms.fits.iter().filter(|f| !f.is_degenerate() ) {
        assert!(f.log_likelihood <= ms.best().log_likelihood + EPS);
    }
}

#[test]
fn result_serializes_as_plain_data() {
    let sample = well_separated(9);
    let init = MixtureParameters::new(0.5, -2.0, 8.0, 2.0).unwrap();
    let res = initialize(&sample, init, DEFAULT_TOLERANCE, 200).unwrap().run();
    let json = serde_json::to_string(&res).unwrap();
    let back : FitResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.termination, res.termination);
    assert_eq!(back.iterations, res.iterations);
    assert_eq!(back.responsibilities.len(), sample.len());
}
