// Worked three-document example: sports vs. business vocabulary.

use ndarray::{array, Array1, Array2};
use topicmix::mixture::{
    e_step, fit, log_likelihood, m_step, CountMatrix, DegenerateSite, EmSettings,
    EmptyTopicPolicy, FitOptions, FitStatus, Initializer, MixtureError, ParameterState,
};

const VOCAB: [&str; 10] = [
    "ball",
    "bonds",
    "business",
    "competition",
    "economics",
    "football",
    "games",
    "macro",
    "rugby",
    "stocks",
];

fn corpus() -> CountMatrix {
    let counts = array![
        [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        [0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
    ];
    CountMatrix::with_labels(
        counts,
        vec!["sport".into(), "mixed".into(), "finance".into()],
        VOCAB.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
}

fn initial_rho() -> Array1<f64> {
    array![0.5, 0.5]
}

fn initial_beta() -> Array2<f64> {
    array![
        [0.15, 0.05, 0.05, 0.15, 0.05, 0.15, 0.15, 0.05, 0.15, 0.05],
        [0.05, 0.15, 0.15, 0.05, 0.20, 0.05, 0.05, 0.10, 0.05, 0.15],
    ]
}

fn options(tolerance: f64, max_iter: usize) -> FitOptions {
    FitOptions {
        initializer: Initializer::new(Some(initial_rho()), Some(initial_beta())),
        settings: EmSettings {
            tolerance,
            max_iter,
            ..EmSettings::default()
        },
        seed: None,
    }
}

/// ln sum_k rho_k prod_v beta[k,v]^count[d,v], summed over documents, without
/// any log-space tricks.
fn direct_log_likelihood(counts: &CountMatrix, rho: &Array1<f64>, beta: &Array2<f64>) -> f64 {
    let mut total = 0.0;
    for row in counts.counts().rows() {
        let mut p_doc = 0.0;
        for k in 0..rho.len() {
            let mut p = rho[k];
            for (v, &c) in row.iter().enumerate() {
                p *= beta[(k, v)].powf(c);
            }
            p_doc += p;
        }
        total += p_doc.ln();
    }
    total
}

#[test]
fn first_e_step_matches_closed_form() {
    let counts = corpus();
    let params = ParameterState::new(initial_rho(), initial_beta()).unwrap();
    let expectation = e_step(&counts, &params).unwrap();
    let reference = direct_log_likelihood(&counts, &initial_rho(), &initial_beta());
    assert!((expectation.log_likelihood - reference).abs() < 1e-6);
    assert!((expectation.log_likelihood - (-28.002231646303)).abs() < 1e-6);
    for row in expectation.responsibilities.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-6);
    }
}

#[test]
fn fit_converges_and_separates_topics() {
    let counts = corpus();
    let result = fit(&counts, 2, &options(0.001, 500)).unwrap();
    assert_eq!(result.status, FitStatus::Converged);
    assert!(result.iterations < 500);
    assert!(result.regressions.is_empty());

    let assigned = result.assignments();
    assert_eq!(assigned[0], assigned[1]);
    assert_ne!(assigned[0], assigned[2]);
    let sports = assigned[0];
    let finance = assigned[2];
    assert!(result.responsibilities[(0, sports)] > 0.99);
    assert!(result.responsibilities[(1, sports)] > 0.99);
    assert!(result.responsibilities[(2, finance)] > 0.99);
    assert!((result.params.rho()[sports] - 2.0 / 3.0).abs() < 1e-3);

    // Terms never seen by a topic's documents lose their mass.
    let beta = result.params.beta();
    assert!(beta[(finance, 0)] < 1e-6, "ball under the finance topic");
    assert!(beta[(sports, 9)] < 1e-6, "stocks under the sports topic");
}

#[test]
fn trajectory_is_non_decreasing_and_invariants_hold() {
    let counts = corpus();
    let result = fit(&counts, 2, &options(0.001, 500)).unwrap();
    for pair in result.trajectory.windows(2) {
        assert!(pair[1] - pair[0] >= -1e-9, "{:?}", pair);
    }
    assert!((result.params.rho().sum() - 1.0).abs() < 1e-6);
    for row in result.params.beta().rows() {
        assert!((row.sum() - 1.0).abs() < 1e-6);
    }
    for row in result.responsibilities.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-6);
    }
}

#[test]
fn manual_steps_keep_simplex_invariants() {
    let counts = corpus();
    let mut params = ParameterState::new(initial_rho(), initial_beta()).unwrap();
    let mut previous = f64::NEG_INFINITY;
    for _ in 0..10 {
        let expectation = e_step(&counts, &params).unwrap();
        for row in expectation.responsibilities.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!(expectation.log_likelihood - previous >= -1e-9);
        previous = expectation.log_likelihood;
        params = m_step(&counts, &expectation.responsibilities).unwrap();
        assert!((params.rho().sum() - 1.0).abs() < 1e-6);
        for row in params.beta().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn explicit_priors_are_deterministic() {
    let counts = corpus();
    let a = fit(&counts, 2, &options(0.001, 500)).unwrap();
    let b = fit(&counts, 2, &options(0.001, 500)).unwrap();
    assert_eq!(a.params, b.params);
    assert_eq!(a.trajectory, b.trajectory);
    assert_eq!(a.responsibilities, b.responsibilities);
}

#[test]
fn seeded_random_start_is_reproducible() {
    let counts = corpus();
    let seeded = FitOptions {
        seed: Some(2024),
        ..FitOptions::default()
    };
    let a = fit(&counts, 2, &seeded).unwrap();
    let b = fit(&counts, 2, &seeded).unwrap();
    assert_eq!(a.params, b.params);
    assert_eq!(a.trajectory, b.trajectory);
    assert_ne!(a.status, FitStatus::Cancelled);
}

#[test]
fn exhausting_max_iter_is_not_an_error() {
    let counts = corpus();
    let result = fit(&counts, 2, &options(0.0, 2)).unwrap();
    assert_eq!(result.status, FitStatus::MaxIterationsReached);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.trajectory.len(), 2);
}

#[test]
fn bad_priors_abort_before_iterating() {
    let counts = corpus();
    let bad = FitOptions {
        initializer: Initializer::new(Some(array![0.7, 0.7]), Some(initial_beta())),
        ..options(0.001, 500)
    };
    assert!(fit(&counts, 2, &bad).is_err());
    let wrong_k = options(0.001, 500);
    assert!(fit(&counts, 3, &wrong_k).is_err());
}

fn dead_topic_options(policy: EmptyTopicPolicy) -> FitOptions {
    FitOptions {
        initializer: Initializer::new(Some(array![1.0, 0.0]), Some(initial_beta())),
        settings: EmSettings {
            empty_topic_policy: policy,
            ..EmSettings::default()
        },
        seed: Some(17),
    }
}

#[test]
fn empty_topic_aborts_fit_with_context() {
    let counts = corpus();
    let err = fit(&counts, 2, &dead_topic_options(EmptyTopicPolicy::Fail)).unwrap_err();
    match err {
        MixtureError::NumericalDegenerate {
            site, iteration, ..
        } => {
            assert_eq!(site, DegenerateSite::Topic(1));
            assert_eq!(iteration, Some(1));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn empty_topic_reseeded_through_fit() {
    let counts = corpus();
    let result = fit(&counts, 2, &dead_topic_options(EmptyTopicPolicy::Reseed)).unwrap();
    assert_eq!(result.status, FitStatus::Converged);
    assert!(!result.reseeded_topics.is_empty());
    assert_eq!(result.reseeded_topics.len(), result.iterations);
    for (i, &(iteration, topic)) in result.reseeded_topics.iter().enumerate() {
        assert_eq!(iteration, i + 1);
        assert_eq!(topic, 1);
    }
    assert_eq!(result.params.rho(), &array![1.0, 0.0]);
    for row in result.params.beta().rows() {
        assert!((row.sum() - 1.0).abs() < 1e-6);
        assert!(row.iter().all(|&p| p >= 0.0));
    }
    for row in result.responsibilities.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-6);
    }
}

#[test]
fn final_log_likelihood_scores_returned_params() {
    let counts = corpus();
    let result = fit(&counts, 2, &options(0.001, 500)).unwrap();
    let scored = log_likelihood(&counts, &result.params).unwrap();
    assert_eq!(result.final_log_likelihood, scored);
    let last = result.trajectory[result.trajectory.len() - 1];
    assert!(result.final_log_likelihood - last >= -1e-9);
}
