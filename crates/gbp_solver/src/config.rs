//! TOML configuration for the GBP solver, mirroring the section-and-defaults
//! style of the teacher's `gbp_config` crate, minus the ECS-specific
//! `Resource`/`Reflect` derives which have no purpose outside a running app.

use gbp_factorgraph::graph::GbpConfig;
use gbp_linalg::Float;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// **GBP section**: the numerical knobs of [`GbpConfig`], exposed as a
/// serializable section so a run can be fully described by one file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GbpSection {
    #[serde(default = "GbpSection::default_nonlinear_factors")]
    pub nonlinear_factors: bool,
    #[serde(default = "GbpSection::default_eta_damping")]
    pub eta_damping: Float,
    #[serde(default = "GbpSection::default_beta")]
    pub beta: Float,
    #[serde(default = "GbpSection::default_num_undamped_iters")]
    pub num_undamped_iters: u32,
    #[serde(default = "GbpSection::default_min_linear_iters")]
    pub min_linear_iters: u32,
    #[serde(default = "GbpSection::default_outlier_threshold")]
    pub outlier_threshold: Float,
}

impl GbpSection {
    fn default_nonlinear_factors() -> bool {
        true
    }

    fn default_eta_damping() -> Float {
        0.1
    }

    fn default_beta() -> Float {
        0.01
    }

    fn default_num_undamped_iters() -> u32 {
        5
    }

    fn default_min_linear_iters() -> u32 {
        10
    }

    fn default_outlier_threshold() -> Float {
        Float::INFINITY
    }
}

impl Default for GbpSection {
    fn default() -> Self {
        Self {
            nonlinear_factors: Self::default_nonlinear_factors(),
            eta_damping: Self::default_eta_damping(),
            beta: Self::default_beta(),
            num_undamped_iters: Self::default_num_undamped_iters(),
            min_linear_iters: Self::default_min_linear_iters(),
            outlier_threshold: Self::default_outlier_threshold(),
        }
    }
}

impl From<GbpSection> for GbpConfig {
    fn from(section: GbpSection) -> Self {
        Self {
            nonlinear_factors: section.nonlinear_factors,
            eta_damping: section.eta_damping,
            beta: section.beta,
            num_undamped_iters: section.num_undamped_iters,
            min_linear_iters: section.min_linear_iters,
            outlier_threshold: section.outlier_threshold,
        }
    }
}

/// **Run section**: which canonical scenario to run and how many sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSection {
    #[serde(default = "RunSection::default_iterations")]
    pub iterations: usize,
}

impl RunSection {
    fn default_iterations() -> usize {
        20
    }
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            iterations: Self::default_iterations(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gbp: GbpSection,
    #[serde(default)]
    pub run: RunSection,
}

impl Config {
    /// Parse a config file from a given path.
    pub fn from_file<P>(path: P) -> Result<Self, ParseError>
    where
        P: AsRef<std::path::Path>,
    {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a config from its TOML text.
    pub fn parse(contents: &str) -> Result<Self, ParseError> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_all_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.gbp.nonlinear_factors);
        assert_eq!(config.run.iterations, 20);
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let config = Config::parse("[gbp]\nbeta = 0.5\n").unwrap();
        assert!((config.gbp.beta - 0.5).abs() < 1e-12);
        assert!((config.gbp.eta_damping - 0.1).abs() < 1e-12);
    }
}
