use crate::mixture::error::MixtureError;
use crate::mixture::params::ParameterState;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};

/// Builds the starting parameter state for a fit.
#[derive(Debug, Clone, Default)]
pub struct Initializer {
    pub prior_rho: Option<Array1<f64>>,
    pub prior_beta: Option<Array2<f64>>,
}

impl Initializer {
    pub fn new(prior_rho: Option<Array1<f64>>, prior_beta: Option<Array2<f64>>) -> Self {
        Self {
            prior_rho,
            prior_beta,
        }
    }

    /// Produce a validated state for `n_docs` documents, `n_terms` terms and
    /// `n_topics` topics. Missing `rho` is uniform; missing `beta` rows are
    /// independent symmetric Dirichlet(1) draws from `rng`.
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        n_docs: usize,
        n_terms: usize,
        n_topics: usize,
        rng: &mut R,
    ) -> Result<ParameterState, MixtureError> {
        if n_docs == 0 || n_terms == 0 || n_topics == 0 {
            return Err(MixtureError::InvalidShape(format!(
                "dimensions must be positive (D = {}, V = {}, K = {})",
                n_docs, n_terms, n_topics
            )));
        }
        let rho = match &self.prior_rho {
            Some(rho) => rho.clone(),
            None => Array1::from_elem(n_topics, 1.0 / n_topics as f64),
        };
        let beta = match &self.prior_beta {
            Some(beta) => beta.clone(),
            None => sample_beta(n_topics, n_terms, rng)?,
        };
        ParameterState::with_dims(rho, beta, n_topics, n_terms)
    }
}

/// Draw a single row uniformly from the probability simplex over `n_terms`.
pub fn sample_topic_row<R: Rng + ?Sized>(
    n_terms: usize,
    rng: &mut R,
) -> Result<Vec<f64>, MixtureError> {
    // Dirichlet needs at least two categories; the 1-simplex is a point.
    if n_terms == 1 {
        return Ok(vec![1.0]);
    }
    let alpha = vec![1.0; n_terms];
    let dirichlet = Dirichlet::new(&alpha).map_err(|e| {
        MixtureError::Config(format!("invalid Dirichlet parameters: {}", e))
    })?;
    Ok(dirichlet.sample(rng))
}

fn sample_beta<R: Rng + ?Sized>(
    n_topics: usize,
    n_terms: usize,
    rng: &mut R,
) -> Result<Array2<f64>, MixtureError> {
    let mut beta = Array2::<f64>::zeros((n_topics, n_terms));
    for k in 0..n_topics {
        let sample = sample_topic_row(n_terms, rng)?;
        for (v, p) in sample.into_iter().enumerate() {
            beta[(k, v)] = p;
        }
    }
    Ok(beta)
}
