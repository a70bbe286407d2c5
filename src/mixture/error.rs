use std::fmt;
use thiserror::Error;

/// Where a numerical degeneracy was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateSite {
    /// Every topic assigns zero probability to this document.
    Document(usize),
    /// This topic received no responsibility-weighted word mass.
    Topic(usize),
}

impl fmt::Display for DegenerateSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateSite::Document(d) => write!(f, "document {}", d),
            DegenerateSite::Topic(k) => write!(f, "topic {}", k),
        }
    }
}

/// Error type shared by the fitting library and the CLI layer.
#[derive(Debug, Error)]
pub enum MixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
    #[error("Invalid probability: {0}")]
    InvalidProbability(String),
    #[error("Numerically degenerate {site}{}: {message}", iteration_suffix(.iteration))]
    NumericalDegenerate {
        site: DegenerateSite,
        iteration: Option<usize>,
        message: String,
    },
}

fn iteration_suffix(iteration: &Option<usize>) -> String {
    match iteration {
        Some(i) => format!(" at iteration {}", i),
        None => String::new(),
    }
}

impl MixtureError {
    pub(crate) fn degenerate(site: DegenerateSite, message: impl Into<String>) -> Self {
        MixtureError::NumericalDegenerate {
            site,
            iteration: None,
            message: message.into(),
        }
    }

    /// Attach the driver's iteration number to a step-level degeneracy.
    pub fn at_iteration(self, iter: usize) -> Self {
        match self {
            MixtureError::NumericalDegenerate { site, message, .. } => {
                MixtureError::NumericalDegenerate {
                    site,
                    iteration: Some(iter),
                    message,
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_message_carries_context() {
        let err = MixtureError::degenerate(DegenerateSite::Topic(3), "zero mass").at_iteration(7);
        assert_eq!(
            err.to_string(),
            "Numerically degenerate topic 3 at iteration 7: zero mass"
        );
        let bare = MixtureError::degenerate(DegenerateSite::Document(0), "all -inf");
        assert_eq!(bare.to_string(), "Numerically degenerate document 0: all -inf");
    }
}
