use crate::mixture::error::MixtureError;
use crate::mixture::params::ParameterState;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Resumable fit state: parameters, completed iterations and the
/// log-likelihood trajectory recorded so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCheckpoint", into = "RawCheckpoint")]
pub struct Checkpoint {
    params: ParameterState,
    iteration: usize,
    trajectory: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawCheckpoint {
    params: ParameterState,
    iteration: usize,
    trajectory: Vec<f64>,
}

impl TryFrom<RawCheckpoint> for Checkpoint {
    type Error = MixtureError;

    fn try_from(raw: RawCheckpoint) -> Result<Self, Self::Error> {
        Checkpoint::new(raw.params, raw.iteration, raw.trajectory)
    }
}

impl From<Checkpoint> for RawCheckpoint {
    fn from(c: Checkpoint) -> Self {
        RawCheckpoint {
            params: c.params,
            iteration: c.iteration,
            trajectory: c.trajectory,
        }
    }
}

impl Checkpoint {
    /// One trajectory entry is recorded per completed iteration.
    pub fn new(
        params: ParameterState,
        iteration: usize,
        trajectory: Vec<f64>,
    ) -> Result<Self, MixtureError> {
        if trajectory.len() != iteration {
            return Err(MixtureError::InvalidShape(format!(
                "trajectory has {} entries for {} iterations",
                trajectory.len(),
                iteration
            )));
        }
        if let Some(bad) = trajectory.iter().position(|ll| ll.is_nan()) {
            return Err(MixtureError::Parse(format!(
                "trajectory entry {} is NaN",
                bad
            )));
        }
        Ok(Self {
            params,
            iteration,
            trajectory,
        })
    }

    /// Starting point before any iteration has run.
    pub fn initial(params: ParameterState) -> Self {
        Self {
            params,
            iteration: 0,
            trajectory: Vec::new(),
        }
    }

    pub fn params(&self) -> &ParameterState {
        &self.params
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn trajectory(&self) -> &[f64] {
        &self.trajectory
    }

    pub fn into_parts(self) -> (ParameterState, usize, Vec<f64>) {
        (self.params, self.iteration, self.trajectory)
    }
}

pub fn write_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<(), MixtureError> {
    let serialized = serde_json::to_string_pretty(checkpoint)?;
    let mut file = File::create(path)?;
    file.write_all(serialized.as_bytes())?;
    Ok(())
}

/// Read a checkpoint, re-validating the parameter simplices and the
/// trajectory length.
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, MixtureError> {
    let file = File::open(path)?;
    let checkpoint: Checkpoint = serde_json::from_reader(file)?;
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn params() -> ParameterState {
        ParameterState::new(array![0.5, 0.5], array![[0.2, 0.8], [0.6, 0.4]]).unwrap()
    }

    #[test]
    fn test_checkpoint_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ckpt.json");
        let ckpt = Checkpoint::new(params(), 2, vec![-10.5, -9.25]).unwrap();
        write_checkpoint(&path, &ckpt).unwrap();
        let loaded = load_checkpoint(&path).unwrap();
        assert_eq!(loaded, ckpt);
    }

    #[test]
    fn test_trajectory_must_match_iteration_count() {
        assert!(matches!(
            Checkpoint::new(params(), 3, vec![-1.0]),
            Err(MixtureError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_invalid_parameters_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ckpt.json");
        let ckpt = Checkpoint::new(params(), 1, vec![-3.0]).unwrap();
        write_checkpoint(&path, &ckpt).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("0.8", "0.9")).unwrap();
        assert!(load_checkpoint(&path).is_err());
    }
}
