//! Typed configuration for candidate generation, selection and evaluation.
//!
//! Configs are plain TOML files. A main file can be combined with an overlay file that only
//! contains the keys that differ, see [`Config::load_with_overlay`].

use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use toml::Table;

use crate::{Error, Result};

/// Trait for configuration structs that are stored in a TOML file.
pub trait Config: Sized + DeserializeOwned {
    /// Path of the configuration file, relative to a config directory.
    const PATH: &'static str;

    /// Load the configuration from `dir`.
    fn load(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_file(dir.as_ref().join(Self::PATH))
    }

    /// Load the configuration from a file at an arbitrary path.
    fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let table = read_table(path.as_ref())?;
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Load the configuration from `main_dir`, with the values from `overlay_dir` on top.
    ///
    /// A missing overlay file is not an error, the main config is used as is.
    fn load_with_overlay(main_dir: impl AsRef<Path>, overlay_dir: impl AsRef<Path>) -> Result<Self> {
        let main = read_table(&main_dir.as_ref().join(Self::PATH))?;

        let overlay_path = overlay_dir.as_ref().join(Self::PATH);
        if !overlay_path.is_file() {
            tracing::debug!("`{}`: no overlay at `{}`", Self::PATH, overlay_path.display());
            return Ok(toml::Value::Table(main).try_into()?);
        }

        let overlay = read_table(&overlay_path)?;
        Ok(toml::Value::Table(merge_tables(main, overlay)).try_into()?)
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(contents.parse::<Table>()?)
}

/// Recursively merge `overlay` into `main`.
///
/// Nested tables are merged key by key, any other overlay value replaces the main value.
/// Keys that only exist in the overlay are added.
pub fn merge_tables(main: Table, overlay: Table) -> Table {
    let mut merged = main;

    for (key, overlay_value) in overlay {
        let value = match (merged.remove(&key), overlay_value) {
            (Some(toml::Value::Table(main_table)), toml::Value::Table(overlay_table)) => {
                toml::Value::Table(merge_tables(main_table, overlay_table))
            }
            (_, overlay_value) => overlay_value,
        };
        merged.insert(key, value);
    }

    merged
}

/// Top level configuration of the localization pipeline.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct HeatlocConfig {
    pub candidates: CandidateConfig,
    pub selection: SelectionConfig,
    pub evaluation: EvaluationConfig,
    pub cache: CacheConfig,
}

impl Config for HeatlocConfig {
    const PATH: &'static str = "heatloc.toml";
}

impl HeatlocConfig {
    /// Check the values that would otherwise lead to an empty or endless candidate template.
    pub fn validate(&self) -> Result<()> {
        let candidates = &self.candidates;

        if !is_positive(candidates.base_length) {
            return Err(invalid(format!(
                "base_length must be positive, got {}",
                candidates.base_length
            )));
        }

        if candidates.scale_multipliers.is_empty() || candidates.aspect_ratios.is_empty() {
            return Err(invalid(
                "scale_multipliers and aspect_ratios must not be empty",
            ));
        }

        if let Some(value) = candidates
            .scale_multipliers
            .iter()
            .chain(&candidates.aspect_ratios)
            .find(|value| !is_positive(**value))
        {
            return Err(invalid(format!(
                "template multipliers must be positive, got {value}"
            )));
        }

        if let Some((scale, ratio)) = candidates
            .scale_multipliers
            .iter()
            .cartesian_product(&candidates.aspect_ratios)
            .find(|(scale, ratio)| (*scale * *ratio * candidates.base_length) as usize == 0)
        {
            return Err(invalid(format!(
                "template extent {scale} * {ratio} * {} is less than one pixel",
                candidates.base_length
            )));
        }

        if !is_positive(candidates.stride_fraction) || candidates.stride_fraction > 1.0 {
            return Err(invalid(format!(
                "stride_fraction must be in (0, 1], got {}",
                candidates.stride_fraction
            )));
        }

        if self.cache.capacity == 0 {
            return Err(invalid("cache capacity must be at least 1"));
        }

        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value > 0.0
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        reason: reason.into(),
    }
}

/// Configuration of the candidate box template.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CandidateConfig {
    /// Length in pixels that all template extents are multiplied with.
    pub base_length: f64,
    /// Scale multipliers, crossed with the aspect ratios to get the template extents.
    pub scale_multipliers: Vec<f64>,
    pub aspect_ratios: Vec<f64>,
    /// Sliding window stride as a fraction of the window size.
    pub stride_fraction: f64,
    /// Record the area of the final corners for every candidate, instead of the nominal
    /// template area for candidates that were not clipped.
    pub use_exact_clipped_area: bool,
    /// Reserved, does not change the template.
    pub scales: Vec<u32>,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            base_length: 100.0,
            scale_multipliers: vec![1.0, 1.5, 2.0],
            aspect_ratios: vec![1.0, 4.0 / 3.0, 1.6180, 2.0, 2.76],
            stride_fraction: 0.5,
            use_exact_clipped_area: false,
            scales: vec![2, 5, 7],
        }
    }
}

/// Configuration of the thresholds used to go from candidates to detections.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct SelectionConfig {
    /// Candidates need a density above this fraction of the maximum density.
    pub density_ratio: f64,
    /// Overlap above which lower scoring candidates are suppressed.
    pub nms_threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            density_ratio: 0.2,
            nms_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct EvaluationConfig {
    /// Minimum intersection over left for a prediction to hit a target.
    pub hit_threshold: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self { hit_threshold: 0.7 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    /// Number of image shapes for which the candidate sets are retained.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn default_is_valid() {
        HeatlocConfig::default().validate().unwrap();
    }

    #[test]
    fn load_partial_config() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(HeatlocConfig::PATH),
            r#"
            [candidates]
            base_length = 20.0

            [selection]
            nms_threshold = 0.3
            "#,
        )
        .unwrap();

        let config = HeatlocConfig::load(dir.path()).unwrap();
        assert_eq!(config.candidates.base_length, 20.0);
        assert_eq!(config.candidates.aspect_ratios.len(), 5);
        assert_eq!(config.selection.nms_threshold, 0.3);
        assert_eq!(config.selection.density_ratio, 0.2);
        assert_eq!(config.cache.capacity, 32);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(HeatlocConfig::PATH),
            "[selection]\nnms_treshold = 0.3\n",
        )
        .unwrap();

        assert!(matches!(
            HeatlocConfig::load(dir.path()),
            Err(Error::ConfigDeserialize(_))
        ));
    }

    #[test]
    fn overlay_replaces_only_given_keys() {
        let main_dir = tempdir().unwrap();
        let overlay_dir = tempdir().unwrap();

        fs::write(
            main_dir.path().join(HeatlocConfig::PATH),
            r#"
            [candidates]
            base_length = 50.0
            stride_fraction = 0.25

            [evaluation]
            hit_threshold = 0.5
            "#,
        )
        .unwrap();
        fs::write(
            overlay_dir.path().join(HeatlocConfig::PATH),
            "[candidates]\nbase_length = 20.0\n",
        )
        .unwrap();

        let config =
            HeatlocConfig::load_with_overlay(main_dir.path(), overlay_dir.path()).unwrap();
        assert_eq!(config.candidates.base_length, 20.0);
        assert_eq!(config.candidates.stride_fraction, 0.25);
        assert_eq!(config.evaluation.hit_threshold, 0.5);
    }

    #[test]
    fn missing_overlay_uses_main() {
        let main_dir = tempdir().unwrap();
        let overlay_dir = tempdir().unwrap();
        fs::write(
            main_dir.path().join(HeatlocConfig::PATH),
            "[cache]\ncapacity = 4\n",
        )
        .unwrap();

        let config =
            HeatlocConfig::load_with_overlay(main_dir.path(), overlay_dir.path()).unwrap();
        assert_eq!(config.cache.capacity, 4);
    }

    #[test]
    fn validate_rejects_bad_template() {
        let mut config = HeatlocConfig::default();
        config.candidates.stride_fraction = 0.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));

        let mut config = HeatlocConfig::default();
        config.candidates.aspect_ratios.clear();
        assert!(config.validate().is_err());

        let mut config = HeatlocConfig::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_sub_pixel_extents() {
        let mut config = HeatlocConfig::default();
        config.candidates.base_length = 0.5;

        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { reason }) if reason.contains("less than one pixel")
        ));

        // the smallest extent is 1 * 1 * 1.0
        config.candidates.base_length = 1.0;
        config.validate().unwrap();
    }
}
