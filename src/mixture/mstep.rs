use crate::mixture::counts::CountMatrix;
use crate::mixture::error::{DegenerateSite, MixtureError};
use crate::mixture::init::sample_topic_row;
use crate::mixture::params::ParameterState;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What to do when a topic receives no responsibility-weighted word mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTopicPolicy {
    /// Abort with `NumericalDegenerate`.
    #[default]
    Fail,
    /// Replace the topic's emission row with a fresh Dirichlet(1) draw.
    Reseed,
}

/// Output of one M-step.
#[derive(Debug, Clone)]
pub struct Maximization {
    pub params: ParameterState,
    /// Topics whose emission row was redrawn under `EmptyTopicPolicy::Reseed`.
    pub reseeded: Vec<usize>,
}

/// Re-estimate parameters from counts and responsibilities, failing on an
/// empty topic.
pub fn m_step(counts: &CountMatrix, responsibilities: &Array2<f64>) -> Result<ParameterState, MixtureError> {
    let (rho, raw) = expected_counts(counts, responsibilities)?;
    let mut beta = raw;
    for (k, mut row) in beta.rows_mut().into_iter().enumerate() {
        let total = row.sum();
        if !(total > 0.0) {
            return Err(empty_topic(k));
        }
        row.mapv_inplace(|x| x / total);
    }
    ParameterState::new(rho, beta)
}

/// M-step under an explicit empty-topic policy, drawing replacement rows
/// from `rng` when reseeding.
pub fn m_step_with_policy<R: Rng + ?Sized>(
    counts: &CountMatrix,
    responsibilities: &Array2<f64>,
    policy: EmptyTopicPolicy,
    rng: &mut R,
) -> Result<Maximization, MixtureError> {
    if policy == EmptyTopicPolicy::Fail {
        return Ok(Maximization {
            params: m_step(counts, responsibilities)?,
            reseeded: Vec::new(),
        });
    }
    let (rho, raw) = expected_counts(counts, responsibilities)?;
    let mut beta = raw;
    let mut reseeded = Vec::new();
    for (k, mut row) in beta.rows_mut().into_iter().enumerate() {
        let total = row.sum();
        if total > 0.0 {
            row.mapv_inplace(|x| x / total);
        } else {
            let fresh = sample_topic_row(row.len(), rng)?;
            row.assign(&Array1::from_vec(fresh));
            reseeded.push(k);
        }
    }
    Ok(Maximization {
        params: ParameterState::new(rho, beta)?,
        reseeded,
    })
}

/// New prevalence `rho` and unnormalized expected counts `Z^T X`.
fn expected_counts(
    counts: &CountMatrix,
    responsibilities: &Array2<f64>,
) -> Result<(Array1<f64>, Array2<f64>), MixtureError> {
    let n_docs = counts.n_docs();
    if responsibilities.nrows() != n_docs || responsibilities.ncols() == 0 {
        return Err(MixtureError::InvalidShape(format!(
            "responsibilities are {} x {}, expected {} rows and at least one topic",
            responsibilities.nrows(),
            responsibilities.ncols(),
            n_docs
        )));
    }
    let mut rho = responsibilities.sum_axis(Axis(0)) / n_docs as f64;
    // Clear rounding drift so rho stays on the simplex across many iterations.
    let rho_total = rho.sum();
    if rho_total > 0.0 {
        rho.mapv_inplace(|r| r / rho_total);
    }
    let raw = responsibilities.t().dot(counts.counts());
    Ok((rho, raw))
}

fn empty_topic(k: usize) -> MixtureError {
    MixtureError::degenerate(
        DegenerateSite::Topic(k),
        "topic received zero responsibility-weighted word mass",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn counts() -> CountMatrix {
        CountMatrix::from_rows(&[vec![2.0, 0.0, 1.0], vec![0.0, 3.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_hard_assignments_give_empirical_frequencies() {
        let z = array![[1.0, 0.0], [0.0, 1.0]];
        let params = m_step(&counts(), &z).unwrap();
        assert_eq!(params.rho(), &array![0.5, 0.5]);
        let beta = params.beta();
        assert!((beta[(0, 0)] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(beta[(0, 1)], 0.0);
        assert!((beta[(1, 1)] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_soft_assignments_stay_on_simplex() {
        let z = array![[0.3, 0.7], [0.9, 0.1]];
        let params = m_step(&counts(), &z).unwrap();
        assert!((params.rho().sum() - 1.0).abs() < 1e-6);
        assert!((params.rho()[0] - 0.6).abs() < 1e-12);
        for row in params.beta().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_topic_fails_fast_by_default() {
        let z = array![[1.0, 0.0], [1.0, 0.0]];
        match m_step(&counts(), &z).unwrap_err() {
            MixtureError::NumericalDegenerate { site, .. } => assert_eq!(site, DegenerateSite::Topic(1)),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_empty_topic_reseeded_on_request() {
        let z = array![[1.0, 0.0], [1.0, 0.0]];
        let mut rng = StdRng::seed_from_u64(9);
        let out = m_step_with_policy(&counts(), &z, EmptyTopicPolicy::Reseed, &mut rng).unwrap();
        assert_eq!(out.reseeded, vec![1]);
        assert_eq!(out.params.rho(), &array![1.0, 0.0]);
        assert!((out.params.topic(1).sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_responsibilities_rejected() {
        let z = array![[1.0, 0.0]];
        assert!(matches!(m_step(&counts(), &z), Err(MixtureError::InvalidShape(_))));
    }
}
