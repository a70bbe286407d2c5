//! Multinomial mixture ("topic") model fitted by expectation-maximization.
//!
//! Each document is generated by first picking a topic `k` with probability
//! `rho[k]` and then drawing its word counts from the topic's emission
//! distribution `beta[k]`. [`fit`] alternates [`e_step`] and [`m_step`]
//! until the corpus log-likelihood stops improving.

pub mod checkpoint;
pub mod config;
pub mod counts;
pub mod driver;
pub mod error;
pub mod estep;
pub mod init;
pub mod mstep;
pub mod params;
pub mod report;

pub use checkpoint::Checkpoint;
pub use counts::CountMatrix;
pub use driver::{
    fit, fit_with_observer, resume, run_em, EmResult, EmSettings, FitOptions, FitStatus,
    IterationReport,
};
pub use error::{DegenerateSite, MixtureError};
pub use estep::{e_step, log_likelihood, row_log_sum_exp, Expectation};
pub use init::Initializer;
pub use mstep::{m_step, m_step_with_policy, EmptyTopicPolicy};
pub use params::{ParameterState, SIMPLEX_TOLERANCE};
