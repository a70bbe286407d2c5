use crate::mixture::counts::CountMatrix;
use crate::mixture::driver::{hard_assignments, EmResult, FitStatus};
use crate::mixture::error::MixtureError;
use crate::mixture::params::ParameterState;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Serialized fitted model: parameters plus the vocabulary they index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub params: ParameterState,
    pub vocabulary: Vec<String>,
    pub status: FitStatus,
    pub iterations: usize,
    /// Corpus log-likelihood of `params` on the training counts.
    pub log_likelihood: f64,
    pub trajectory: Vec<f64>,
}

impl ModelFile {
    pub fn from_result(counts: &CountMatrix, result: &EmResult) -> Self {
        Self {
            params: result.params.clone(),
            vocabulary: counts.vocabulary().to_vec(),
            status: result.status,
            iterations: result.iterations,
            log_likelihood: result.final_log_likelihood,
            trajectory: result.trajectory.clone(),
        }
    }

    /// Check that `counts` uses the same vocabulary, in the same order.
    pub fn check_vocabulary(&self, counts: &CountMatrix) -> Result<(), MixtureError> {
        if self.vocabulary.len() != counts.n_terms() {
            return Err(MixtureError::InvalidShape(format!(
                "model has {} terms, data has {}",
                self.vocabulary.len(),
                counts.n_terms()
            )));
        }
        if let Some(v) = (0..counts.n_terms()).find(|&v| self.vocabulary[v] != counts.vocabulary()[v]) {
            return Err(MixtureError::InvalidShape(format!(
                "term {} differs: model has {:?}, data has {:?}",
                v,
                self.vocabulary[v],
                counts.vocabulary()[v]
            )));
        }
        Ok(())
    }
}

pub fn write_model(path: &Path, model: &ModelFile) -> Result<(), MixtureError> {
    let serialized = serde_json::to_string_pretty(model)?;
    let mut file = File::create(path)?;
    file.write_all(serialized.as_bytes())?;
    Ok(())
}

pub fn load_model(path: &Path) -> Result<ModelFile, MixtureError> {
    let file = File::open(path)?;
    let model: ModelFile = serde_json::from_reader(file)?;
    if model.vocabulary.len() != model.params.n_terms() {
        return Err(MixtureError::InvalidShape(format!(
            "model vocabulary has {} terms, beta has {}",
            model.vocabulary.len(),
            model.params.n_terms()
        )));
    }
    Ok(model)
}

/// Write per-document topic probabilities plus the most probable topic.
pub fn write_responsibilities(
    path: &Path,
    counts: &CountMatrix,
    responsibilities: &Array2<f64>,
    delimiter: u8,
) -> Result<(), MixtureError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    let n_topics = responsibilities.ncols();
    let header: Vec<String> = std::iter::once("id".to_string())
        .chain((0..n_topics).map(|k| format!("topic_{}", k)))
        .chain(std::iter::once("assigned".to_string()))
        .collect();
    writer.write_record(&header)?;
    let assigned = hard_assignments(responsibilities);
    for (d, id) in counts.doc_ids().iter().enumerate() {
        let mut row = vec![id.clone()];
        for k in 0..n_topics {
            row.push(format!("{:.6}", responsibilities[(d, k)]));
        }
        row.push(assigned[d].to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the `n` most probable terms of every topic.
pub fn write_top_terms(
    path: &Path,
    params: &ParameterState,
    vocabulary: &[String],
    n: usize,
    delimiter: u8,
) -> Result<(), MixtureError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    writer.write_record(["topic", "rank", "term", "probability"])?;
    for k in 0..params.n_topics() {
        for (rank, (v, p)) in params.top_terms(k, n).into_iter().enumerate() {
            let term = vocabulary
                .get(v)
                .ok_or_else(|| MixtureError::InvalidShape(format!("term {} out of bounds", v)))?;
            writer.write_record(&[
                k.to_string(),
                (rank + 1).to_string(),
                term.clone(),
                format!("{:.6}", p),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
