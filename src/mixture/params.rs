use crate::mixture::error::MixtureError;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tolerance used when checking that a probability vector sums to one.
pub const SIMPLEX_TOLERANCE: f64 = 1e-6;

/// Topic prevalence and topic-word emission probabilities.
///
/// Both `rho` and every row of `beta` lie on the probability simplex. The
/// only ways to obtain a value are the validating constructors, so any
/// `ParameterState` in hand satisfies the invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParams", into = "RawParams")]
pub struct ParameterState {
    rho: Array1<f64>,
    beta: Array2<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawParams {
    rho: Array1<f64>,
    beta: Array2<f64>,
}

impl TryFrom<RawParams> for ParameterState {
    type Error = MixtureError;

    fn try_from(raw: RawParams) -> Result<Self, Self::Error> {
        ParameterState::new(raw.rho, raw.beta)
    }
}

impl From<ParameterState> for RawParams {
    fn from(params: ParameterState) -> Self {
        RawParams {
            rho: params.rho,
            beta: params.beta,
        }
    }
}

impl ParameterState {
    /// Validate and wrap `rho` (length K) and `beta` (K x V).
    pub fn new(rho: Array1<f64>, beta: Array2<f64>) -> Result<Self, MixtureError> {
        let (n_topics, n_terms) = beta.dim();
        check_shapes(&rho, &beta, rho.len(), n_terms)?;
        if n_topics == 0 || n_terms == 0 {
            return Err(MixtureError::InvalidShape(format!(
                "beta must be non-empty, got {} x {}",
                n_topics, n_terms
            )));
        }
        check_simplex(rho.view(), "rho")?;
        for (k, row) in beta.rows().into_iter().enumerate() {
            check_simplex(row, &format!("beta row {}", k))?;
        }
        Ok(Self { rho, beta })
    }

    /// Validate against declared dimensions as well as the simplex constraints.
    pub fn with_dims(
        rho: Array1<f64>,
        beta: Array2<f64>,
        n_topics: usize,
        n_terms: usize,
    ) -> Result<Self, MixtureError> {
        check_shapes(&rho, &beta, n_topics, n_terms)?;
        Self::new(rho, beta)
    }

    pub fn n_topics(&self) -> usize {
        self.rho.len()
    }

    pub fn n_terms(&self) -> usize {
        self.beta.ncols()
    }

    pub fn rho(&self) -> &Array1<f64> {
        &self.rho
    }

    pub fn beta(&self) -> &Array2<f64> {
        &self.beta
    }

    pub fn topic(&self, k: usize) -> ArrayView1<'_, f64> {
        self.beta.row(k)
    }

    pub fn into_parts(self) -> (Array1<f64>, Array2<f64>) {
        (self.rho, self.beta)
    }

    /// Indices of the `n` most probable terms for topic `k`, best first.
    pub fn top_terms(&self, k: usize, n: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> =
            self.beta.row(k).iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        ranked
    }
}

fn check_shapes(
    rho: &Array1<f64>,
    beta: &Array2<f64>,
    n_topics: usize,
    n_terms: usize,
) -> Result<(), MixtureError> {
    if rho.len() != n_topics {
        return Err(MixtureError::InvalidShape(format!(
            "rho has length {}, expected {}",
            rho.len(),
            n_topics
        )));
    }
    if beta.dim() != (n_topics, n_terms) {
        return Err(MixtureError::InvalidShape(format!(
            "beta is {} x {}, expected {} x {}",
            beta.nrows(),
            beta.ncols(),
            n_topics,
            n_terms
        )));
    }
    Ok(())
}

pub(crate) fn check_simplex(values: ArrayView1<'_, f64>, label: &str) -> Result<(), MixtureError> {
    for (i, &p) in values.iter().enumerate() {
        if !p.is_finite() || p < 0.0 {
            return Err(MixtureError::InvalidProbability(format!(
                "{} entry {} must be finite and non-negative, got {}",
                label, i, p
            )));
        }
    }
    let total = values.sum();
    if (total - 1.0).abs() > SIMPLEX_TOLERANCE {
        return Err(MixtureError::InvalidProbability(format!(
            "{} sums to {}, expected 1",
            label, total
        )));
    }
    Ok(())
}

/// Optional caller-supplied starting values, as read from a JSON priors file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorSpec {
    #[serde(default)]
    pub rho: Option<Vec<f64>>,
    #[serde(default)]
    pub beta: Option<Vec<Vec<f64>>>,
}

impl PriorSpec {
    pub fn rho_array(&self) -> Option<Array1<f64>> {
        self.rho.as_ref().map(|r| Array1::from_vec(r.clone()))
    }

    pub fn beta_array(&self) -> Result<Option<Array2<f64>>, MixtureError> {
        let rows = match &self.beta {
            Some(rows) => rows,
            None => return Ok(None),
        };
        let n_terms = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * n_terms);
        for (k, row) in rows.iter().enumerate() {
            if row.len() != n_terms {
                return Err(MixtureError::InvalidShape(format!(
                    "prior beta row {} has {} entries, expected {}",
                    k,
                    row.len(),
                    n_terms
                )));
            }
            flat.extend_from_slice(row);
        }
        Array2::from_shape_vec((rows.len(), n_terms), flat)
            .map(Some)
            .map_err(|e| MixtureError::InvalidShape(e.to_string()))
    }
}

/// Load a priors file. Shape and simplex checks happen at initialization.
pub fn load_priors(path: &Path) -> Result<PriorSpec, MixtureError> {
    let file = std::fs::File::open(path)?;
    let priors: PriorSpec = serde_json::from_reader(file)?;
    Ok(priors)
}
