use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{FeatureError, Result};

///
/// Every tunable of the feature pipeline. The defaults are the values the
/// published models were trained with, so features computed with
/// `PipelineConfig::default()` are compatible with them.
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window sizes in bp, one per resolution, in tensor order.
    pub window_sizes: Vec<u32>,
    /// Windows per promoter per resolution; half upstream, half downstream.
    pub num_windows: usize,
    /// Target range of the min-max scaling.
    pub scale_range: (f64, f64),
    /// Value written for windows without methylation data, after scaling.
    pub missing_fill: f64,
    /// Width of the response-variable window centred on the TSS.
    pub response_window: i64,
    /// Minimum distance between kept TSSs when deriving promoters from a GFF.
    pub min_tss_spacing: i64,
    /// Chromosomes kept when deriving promoters from a GFF.
    pub keep_chromosomes: Vec<String>,
    pub threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            window_sizes: vec![250, 2500],
            num_windows: 20,
            scale_range: (0.1, 1.0),
            missing_fill: 0.0,
            response_window: 2000,
            min_tss_spacing: 1000,
            keep_chromosomes: (1..=22).map(|i| format!("chr{}", i)).collect(),
            threads: 2,
        }
    }
}

impl TryFrom<&Path> for PipelineConfig {
    type Error = FeatureError;

    fn try_from(path: &Path) -> Result<Self> {
        let toml_str = read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_sizes.is_empty() {
            return Err(FeatureError::InvalidConfig(
                "at least one window size is required".into(),
            ));
        }
        if self.window_sizes.contains(&0) {
            return Err(FeatureError::InvalidConfig(
                "window sizes must be positive".into(),
            ));
        }
        let mut sizes = self.window_sizes.clone();
        sizes.sort_unstable();
        sizes.dedup();
        if sizes.len() != self.window_sizes.len() {
            return Err(FeatureError::InvalidConfig(format!(
                "window sizes must be unique: {:?}",
                self.window_sizes
            )));
        }
        if self.num_windows == 0 || self.num_windows % 2 != 0 {
            return Err(FeatureError::InvalidConfig(format!(
                "num_windows must be a positive even number, got {}",
                self.num_windows
            )));
        }
        let (low, high) = self.scale_range;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(FeatureError::InvalidConfig(format!(
                "scale_range must satisfy low < high, got ({}, {})",
                low, high
            )));
        }
        if self.response_window < 0 || self.min_tss_spacing < 0 {
            return Err(FeatureError::InvalidConfig(
                "response_window and min_tss_spacing can't be negative".into(),
            ));
        }
        if self.threads == 0 {
            return Err(FeatureError::InvalidConfig("threads must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keep_chromosomes.len(), 22);
        assert_eq!(config.keep_chromosomes[0], "chr1");
    }

    #[rstest]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str("num_windows = 4\nwindow_sizes = [100]\n").unwrap();
        assert_eq!(config.num_windows, 4);
        assert_eq!(config.window_sizes, vec![100]);
        assert_eq!(config.scale_range, (0.1, 1.0));
        assert_eq!(config.threads, 2);
    }

    #[rstest]
    #[case(PipelineConfig { num_windows: 5, ..PipelineConfig::default() })]
    #[case(PipelineConfig { num_windows: 0, ..PipelineConfig::default() })]
    #[case(PipelineConfig { window_sizes: vec![], ..PipelineConfig::default() })]
    #[case(PipelineConfig { window_sizes: vec![250, 250], ..PipelineConfig::default() })]
    #[case(PipelineConfig { scale_range: (1.0, 0.1), ..PipelineConfig::default() })]
    #[case(PipelineConfig { threads: 0, ..PipelineConfig::default() })]
    fn test_invalid_configs(#[case] config: PipelineConfig) {
        assert!(matches!(config.validate(), Err(FeatureError::InvalidConfig(_))));
    }

    #[rstest]
    fn test_try_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m2a.toml");
        std::fs::write(&path, "window_sizes = [100, 1000]\nnum_windows = 4\nscale_range = [0.0, 1.0]\n").unwrap();

        let config = PipelineConfig::try_from(path.as_path()).unwrap();
        assert_eq!(config.window_sizes, vec![100, 1000]);
        assert_eq!(config.scale_range, (0.0, 1.0));
    }
}
