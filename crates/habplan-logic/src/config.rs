//! Validation thresholds and editor settings.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```
//! use habplan_logic::config::{validate_config, HabitatConfig};
//!
//! let config: HabitatConfig =
//!     serde_json::from_str(r#"{ "validation": { "minVolumePerCrew": 12.0 } }"#).unwrap();
//! assert_eq!(config.validation.min_volume_per_crew, 12.0);
//! assert_eq!(config.editor.grid_size, 0.5);
//! assert!(validate_config(&config).is_empty());
//! ```

use crate::constants::{
    CAPACITY_WARNING_RATIO, CREW_PER_HYGIENE_MODULE, GRID_SIZE, MIN_VOLUME_PER_CREW,
    OVERLAP_TOLERANCE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Thresholds used by the validator rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Required pressurized volume per crew member (m³).
    pub min_volume_per_crew: f64,
    /// Child volume fraction above which a parent is reported as near capacity.
    pub capacity_warning_ratio: f64,
    /// Edge tolerance for footprint overlap (m).
    pub overlap_tolerance: f64,
    /// Crew members one hygiene module serves.
    pub crew_per_hygiene_module: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_volume_per_crew: MIN_VOLUME_PER_CREW,
            capacity_warning_ratio: CAPACITY_WARNING_RATIO,
            overlap_tolerance: OVERLAP_TOLERANCE,
            crew_per_hygiene_module: CREW_PER_HYGIENE_MODULE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Snap grid for dropped and dragged main modules (m).
    pub grid_size: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HabitatConfig {
    pub validation: ValidationConfig,
    pub editor: EditorConfig,
}

/// A configuration value outside its usable range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("minVolumePerCrew must be positive, got {0}")]
    NonPositiveVolumePerCrew(f64),
    #[error("capacityWarningRatio must be in (0, 1], got {0}")]
    WarningRatioOutOfRange(f64),
    #[error("overlapTolerance must not be negative, got {0}")]
    NegativeTolerance(f64),
    #[error("crewPerHygieneModule must be at least 1")]
    ZeroCrewPerHygiene,
    #[error("gridSize must be positive, got {0}")]
    NonPositiveGrid(f64),
}

/// Failure reading a config file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &HabitatConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let v = &config.validation;

    if v.min_volume_per_crew <= 0.0 {
        errors.push(ConfigError::NonPositiveVolumePerCrew(v.min_volume_per_crew));
    }
    if !(v.capacity_warning_ratio > 0.0 && v.capacity_warning_ratio <= 1.0) {
        errors.push(ConfigError::WarningRatioOutOfRange(v.capacity_warning_ratio));
    }
    if v.overlap_tolerance < 0.0 {
        errors.push(ConfigError::NegativeTolerance(v.overlap_tolerance));
    }
    if v.crew_per_hygiene_module == 0 {
        errors.push(ConfigError::ZeroCrewPerHygiene);
    }
    if config.editor.grid_size <= 0.0 {
        errors.push(ConfigError::NonPositiveGrid(config.editor.grid_size));
    }

    errors
}

/// Read a JSON config file. Range problems are not checked here; pass the
/// result to [`validate_config`].
pub fn load_config(path: impl AsRef<Path>) -> Result<HabitatConfig, ConfigLoadError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let config: HabitatConfig = serde_json::from_str(&text)?;
    log::info!("Loaded config from {}", path.as_ref().display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HabitatConfig::default();
        let errors = validate_config(&config);
        assert!(errors.is_empty(), "default config should be valid: {errors:?}");
        assert_eq!(config.validation.min_volume_per_crew, 10.0);
        assert_eq!(config.validation.crew_per_hygiene_module, 3);
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config: HabitatConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HabitatConfig::default());
    }

    #[test]
    fn warning_ratio_out_of_range() {
        let mut config = HabitatConfig::default();
        config.validation.capacity_warning_ratio = 1.5;
        assert!(validate_config(&config).contains(&ConfigError::WarningRatioOutOfRange(1.5)));
        config.validation.capacity_warning_ratio = 0.0;
        assert!(validate_config(&config).contains(&ConfigError::WarningRatioOutOfRange(0.0)));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = HabitatConfig::default();
        config.validation.min_volume_per_crew = 0.0;
        config.validation.overlap_tolerance = -0.1;
        config.validation.crew_per_hygiene_module = 0;
        config.editor.grid_size = 0.0;
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.contains(&ConfigError::ZeroCrewPerHygiene));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config("/nonexistent/habplan-config.json").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io(_)));
    }
}
