//! JSON settings for model loading and hazard calculation.

use super::constants::{
    DEFAULT_MAG_DIST_CUTOFF_DISTANCES, DEFAULT_MAG_DIST_CUTOFF_MAGNITUDES, DEFAULT_MAX_DISTANCE_KM,
};
use crate::domain::{GeographicWindow, NshmpError, NshmpResult, TectonicRegion};
use crate::io::ByteOrder;
use crate::numerics::PiecewiseLinear;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLoadSettings {
    #[serde(rename = "tectonicRegion", default = "default_tectonic_region")]
    pub tectonic_region: TectonicRegion,
    #[serde(rename = "fileWeight", default = "default_file_weight")]
    pub file_weight: f64,
    #[serde(default)]
    pub window: GeographicWindow,
    #[serde(rename = "byteOrder", default)]
    pub byte_order: ByteOrder,
}

fn default_tectonic_region() -> TectonicRegion {
    TectonicRegion::ActiveShallow
}

fn default_file_weight() -> f64 {
    1.0
}

impl Default for SourceLoadSettings {
    fn default() -> Self {
        Self {
            tectonic_region: default_tectonic_region(),
            file_weight: default_file_weight(),
            window: GeographicWindow::unbounded(),
            byte_order: ByteOrder::default(),
        }
    }
}

impl SourceLoadSettings {
    pub fn validate(&self) -> NshmpResult<()> {
        if !(self.file_weight >= 0.0) || !self.file_weight.is_finite() {
            return Err(NshmpError::configuration(
                "CONFIG.FILE_WEIGHT",
                format!("file weight must be a finite non-negative number, got {}", self.file_weight),
            ));
        }
        self.window.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardSettings {
    #[serde(rename = "maxDistanceKm", default = "default_max_distance")]
    pub max_distance_km: f64,
    #[serde(rename = "includeMagDistCutoff", default)]
    pub include_mag_dist_cutoff: bool,
    /// `(distance km, minimum magnitude)` pairs.
    #[serde(rename = "magDistCutoff", default = "default_mag_dist_cutoff")]
    pub mag_dist_cutoff: Vec<(f64, f64)>,
    #[serde(rename = "durationYears", default = "default_duration")]
    pub duration_years: f64,
    #[serde(rename = "intensityLevels", default)]
    pub intensity_levels: Vec<f64>,
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE_KM
}

fn default_mag_dist_cutoff() -> Vec<(f64, f64)> {
    DEFAULT_MAG_DIST_CUTOFF_DISTANCES
        .iter()
        .copied()
        .zip(DEFAULT_MAG_DIST_CUTOFF_MAGNITUDES.iter().copied())
        .collect()
}

fn default_duration() -> f64 {
    1.0
}

impl Default for HazardSettings {
    fn default() -> Self {
        Self {
            max_distance_km: default_max_distance(),
            include_mag_dist_cutoff: false,
            mag_dist_cutoff: default_mag_dist_cutoff(),
            duration_years: default_duration(),
            intensity_levels: Vec::new(),
        }
    }
}

impl HazardSettings {
    /// The magnitude-distance cutoff, `None` when the filter is disabled.
    pub fn mag_dist_function(&self) -> NshmpResult<Option<PiecewiseLinear>> {
        if !self.include_mag_dist_cutoff {
            return Ok(None);
        }
        PiecewiseLinear::from_points(&self.mag_dist_cutoff)
            .map(Some)
            .ok_or_else(|| {
                NshmpError::configuration(
                    "CONFIG.MAG_DIST_CUTOFF",
                    "magnitude-distance cutoff needs strictly increasing distances",
                )
            })
    }

    pub fn validate(&self) -> NshmpResult<()> {
        if !(self.max_distance_km > 0.0) {
            return Err(NshmpError::configuration(
                "CONFIG.MAX_DISTANCE",
                format!("maximum distance must be positive, got {}", self.max_distance_km),
            ));
        }
        if !(self.duration_years > 0.0) {
            return Err(NshmpError::configuration(
                "CONFIG.DURATION",
                format!("forecast duration must be positive, got {}", self.duration_years),
            ));
        }
        self.mag_dist_function().map(|_| ())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsLoadError {
    #[error("failed to read settings '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid settings '{}': {source}", path.display())]
    Invalid { path: PathBuf, source: NshmpError },
}

impl From<SettingsLoadError> for NshmpError {
    fn from(error: SettingsLoadError) -> Self {
        match error {
            SettingsLoadError::Read { .. } => NshmpError::io_system("IO.SETTINGS_READ", error.to_string()),
            SettingsLoadError::Parse { .. } => {
                NshmpError::configuration("CONFIG.SETTINGS_PARSE", error.to_string())
            }
            SettingsLoadError::Invalid { source, .. } => source,
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, SettingsLoadError> {
    let source = fs::read_to_string(path).map_err(|source| SettingsLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| SettingsLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_source_settings(
    path: impl AsRef<Path>,
) -> Result<SourceLoadSettings, SettingsLoadError> {
    let path = path.as_ref();
    let settings: SourceLoadSettings = load_json(path)?;
    settings.validate().map_err(|source| SettingsLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings)
}

pub fn load_hazard_settings(path: impl AsRef<Path>) -> Result<HazardSettings, SettingsLoadError> {
    let path = path.as_ref();
    let settings: HazardSettings = load_json(path)?;
    settings.validate().map_err(|source| SettingsLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings)
}
