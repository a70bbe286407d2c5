use crate::mixture::error::MixtureError;
use csv::ReaderBuilder;
use ndarray::Array2;
use std::path::Path;

/// Dense document-term count matrix, shape [n_docs][n_terms].
///
/// Entries are non-negative and finite; fractional values are accepted as
/// pseudo-counts. Document ids and vocabulary labels are only used for
/// reporting and default to positional names.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    counts: Array2<f64>,
    doc_ids: Vec<String>,
    vocabulary: Vec<String>,
}

impl CountMatrix {
    /// Wrap an existing matrix, checking that every entry is a valid count.
    pub fn new(counts: Array2<f64>) -> Result<Self, MixtureError> {
        let (n_docs, n_terms) = counts.dim();
        let doc_ids = (0..n_docs).map(|d| format!("doc_{}", d)).collect();
        let vocabulary = (0..n_terms).map(|v| format!("term_{}", v)).collect();
        Self::with_labels(counts, doc_ids, vocabulary)
    }

    pub fn with_labels(
        counts: Array2<f64>,
        doc_ids: Vec<String>,
        vocabulary: Vec<String>,
    ) -> Result<Self, MixtureError> {
        let (n_docs, n_terms) = counts.dim();
        if n_docs == 0 || n_terms == 0 {
            return Err(MixtureError::InvalidShape(format!(
                "count matrix must be non-empty, got {} x {}",
                n_docs, n_terms
            )));
        }
        if doc_ids.len() != n_docs {
            return Err(MixtureError::InvalidShape(format!(
                "doc ids {} != rows {}",
                doc_ids.len(),
                n_docs
            )));
        }
        if vocabulary.len() != n_terms {
            return Err(MixtureError::InvalidShape(format!(
                "vocabulary {} != columns {}",
                vocabulary.len(),
                n_terms
            )));
        }
        for ((d, v), &c) in counts.indexed_iter() {
            if !c.is_finite() || c < 0.0 {
                return Err(MixtureError::InvalidProbability(format!(
                    "count at document {} term {} must be finite and non-negative, got {}",
                    d, v, c
                )));
            }
        }
        Ok(Self {
            counts,
            doc_ids,
            vocabulary,
        })
    }

    /// Build from nested rows, mostly for tests and small corpora.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, MixtureError> {
        let n_terms = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * n_terms);
        for (d, row) in rows.iter().enumerate() {
            if row.len() != n_terms {
                return Err(MixtureError::InvalidShape(format!(
                    "row {} has {} terms, expected {}",
                    d,
                    row.len(),
                    n_terms
                )));
            }
            flat.extend_from_slice(row);
        }
        let counts = Array2::from_shape_vec((rows.len(), n_terms), flat)
            .map_err(|e| MixtureError::InvalidShape(e.to_string()))?;
        Self::new(counts)
    }

    pub fn n_docs(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_terms(&self) -> usize {
        self.counts.ncols()
    }

    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    pub fn doc_ids(&self) -> &[String] {
        &self.doc_ids
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Total word count per document.
    pub fn doc_lengths(&self) -> Vec<f64> {
        self.counts.rows().into_iter().map(|r| r.sum()).collect()
    }
}

/// Load a count matrix from delimited text.
///
/// The header row is `id` followed by one column per vocabulary term; each
/// following row is a document id followed by its term counts.
pub fn load_counts(path: &Path, delimiter: u8) -> Result<CountMatrix, MixtureError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let header = reader.headers()?.clone();
    if header.len() < 2 {
        return Err(MixtureError::Parse(
            "header needs an id column and at least one term".to_string(),
        ));
    }
    let vocabulary: Vec<String> = header.iter().skip(1).map(|s| s.to_string()).collect();

    let mut doc_ids = Vec::new();
    let mut flat = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.is_empty() {
            continue;
        }
        let id = record
            .get(0)
            .ok_or_else(|| MixtureError::Parse("missing id column".to_string()))?;
        if record.len() != vocabulary.len() + 1 {
            return Err(MixtureError::Parse(format!(
                "row {} has {} counts, expected {}",
                line,
                record.len() - 1,
                vocabulary.len()
            )));
        }
        doc_ids.push(id.to_string());
        for field in record.iter().skip(1) {
            let val: f64 = field.trim().parse().map_err(|e| {
                MixtureError::Parse(format!("failed to parse count {}: {}", field, e))
            })?;
            flat.push(val);
        }
    }

    let counts = Array2::from_shape_vec((doc_ids.len(), vocabulary.len()), flat)
        .map_err(|e| MixtureError::InvalidShape(e.to_string()))?;
    CountMatrix::with_labels(counts, doc_ids, vocabulary)
}
