use crate::mixture::driver::EmSettings;
use crate::mixture::error::MixtureError;
use crate::mixture::mstep::EmptyTopicPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fit settings read from a TOML file. Every key is optional; missing keys
/// keep the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FitConfig {
    pub tolerance: Option<f64>,
    pub max_iter: Option<usize>,
    pub regression_slack: Option<f64>,
    pub seed: Option<u64>,
    pub empty_topic_policy: Option<EmptyTopicPolicy>,
}

impl FitConfig {
    /// Overlay the configured values onto `base`.
    pub fn apply(&self, base: EmSettings) -> EmSettings {
        EmSettings {
            tolerance: self.tolerance.unwrap_or(base.tolerance),
            max_iter: self.max_iter.unwrap_or(base.max_iter),
            regression_slack: self.regression_slack.unwrap_or(base.regression_slack),
            empty_topic_policy: self.empty_topic_policy.unwrap_or(base.empty_topic_policy),
        }
    }
}

/// Load a TOML settings file.
pub fn load_config(path: &Path) -> Result<FitConfig, MixtureError> {
    let contents = std::fs::read_to_string(path)?;
    let config: FitConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: FitConfig = toml::from_str(
            "max_iter = 50\nempty_topic_policy = \"reseed\"\nseed = 7\n",
        )
        .unwrap();
        let settings = config.apply(EmSettings::default());
        assert_eq!(settings.max_iter, 50);
        assert_eq!(settings.tolerance, 1e-3);
        assert_eq!(settings.empty_topic_policy, EmptyTopicPolicy::Reseed);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(toml::from_str::<FitConfig>("max_iters = 3\n").is_err());
    }
}
