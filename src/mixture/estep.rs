use crate::mixture::counts::CountMatrix;
use crate::mixture::error::{DegenerateSite, MixtureError};
use crate::mixture::params::ParameterState;
use ndarray::{Array1, Array2};

/// Output of one E-step.
#[derive(Debug, Clone)]
pub struct Expectation {
    /// Posterior topic probabilities, shape [n_docs][n_topics].
    pub responsibilities: Array2<f64>,
    /// Per-document log-likelihood `ll_d`.
    pub doc_log_likelihoods: Array1<f64>,
    /// Corpus log-likelihood, the sum of `doc_log_likelihoods`.
    pub log_likelihood: f64,
}

/// Joint log-weights `L[d,k] = ln rho_k + sum_v count[d,v] ln beta[k,v]`.
///
/// Zero counts are skipped so an absent term never contributes `0 * -inf`.
/// A positive count on a zero-probability term yields `-inf` for that cell.
pub fn log_weights(counts: &CountMatrix, params: &ParameterState) -> Result<Array2<f64>, MixtureError> {
    if counts.n_terms() != params.n_terms() {
        return Err(MixtureError::InvalidShape(format!(
            "counts have {} terms, parameters have {}",
            counts.n_terms(),
            params.n_terms()
        )));
    }
    let n_topics = params.n_topics();
    let log_rho = params.rho().mapv(f64::ln);
    let log_beta = params.beta().mapv(f64::ln);
    let mut weights = Array2::<f64>::zeros((counts.n_docs(), n_topics));
    for (d, row) in counts.counts().rows().into_iter().enumerate() {
        for k in 0..n_topics {
            let mut score = log_rho[k];
            for (v, &c) in row.iter().enumerate() {
                if c > 0.0 {
                    score += c * log_beta[(k, v)];
                }
            }
            weights[(d, k)] = score;
        }
    }
    Ok(weights)
}

/// Row-wise log-sum-exp of `log_weights`, stabilized by the row maximum.
///
/// `-inf` entries are allowed as long as each row has a finite one.
pub fn row_log_sum_exp(log_weights: &Array2<f64>) -> Result<Array1<f64>, MixtureError> {
    let mut out = Array1::<f64>::zeros(log_weights.nrows());
    for (d, row) in log_weights.rows().into_iter().enumerate() {
        if row.iter().any(|x| x.is_nan() || *x == f64::INFINITY) {
            return Err(MixtureError::degenerate(
                DegenerateSite::Document(d),
                "log-weights contain NaN or +inf",
            ));
        }
        let max_log = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max_log == f64::NEG_INFINITY {
            return Err(MixtureError::degenerate(
                DegenerateSite::Document(d),
                "every topic assigns zero probability to this document",
            ));
        }
        let sum: f64 = row.iter().map(|x| (x - max_log).exp()).sum();
        out[d] = max_log + sum.ln();
    }
    Ok(out)
}

/// Run the E-step: log-likelihoods and normalized responsibilities.
pub fn e_step(counts: &CountMatrix, params: &ParameterState) -> Result<Expectation, MixtureError> {
    let weights = log_weights(counts, params)?;
    let doc_log_likelihoods = row_log_sum_exp(&weights)?;
    let mut responsibilities = weights;
    for (d, mut row) in responsibilities.rows_mut().into_iter().enumerate() {
        let ll = doc_log_likelihoods[d];
        row.mapv_inplace(|x| (x - ll).exp());
    }
    let log_likelihood = doc_log_likelihoods.sum();
    Ok(Expectation {
        responsibilities,
        doc_log_likelihoods,
        log_likelihood,
    })
}

/// Corpus log-likelihood only, e.g. for scoring held-out documents.
pub fn log_likelihood(counts: &CountMatrix, params: &ParameterState) -> Result<f64, MixtureError> {
    let weights = log_weights(counts, params)?;
    Ok(row_log_sum_exp(&weights)?.sum())
}
