//! JSON configuration and report for batch detection.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::board::BoardConfigError;
use crate::{Board, BoardConfiguration, CameraParameters, Marker, MarkerDetectorParams};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Board(#[from] BoardConfigError),
}

/// Input of `fiducial detect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    pub image_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub detector: MarkerDetectorParams,
    #[serde(default)]
    pub camera: Option<CameraParameters>,
    /// Physical marker side length; `0` leaves markers without size or pose.
    #[serde(default)]
    pub marker_size: f32,
    #[serde(default)]
    pub board: Option<BoardConfiguration>,
}

impl DetectConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fiducial_report.json"))
    }

    /// `image_path`, relative paths taken from the directory of the config file.
    pub fn resolve_image_path(&self, config_path: &Path) -> PathBuf {
        let image = Path::new(&self.image_path);
        match config_path.parent() {
            Some(dir) if image.is_relative() => dir.join(image),
            _ => image.to_path_buf(),
        }
    }
}

/// Output of `fiducial detect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectReport {
    pub image_path: String,
    pub config_path: String,
    #[serde(default)]
    pub width: usize,
    #[serde(default)]
    pub height: usize,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub board: Option<Board>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DetectReport {
    pub fn new(cfg: &DetectConfig, config_path: &Path) -> Self {
        Self {
            image_path: cfg.image_path.clone(),
            config_path: config_path.to_string_lossy().into_owned(),
            width: 0,
            height: 0,
            markers: Vec::new(),
            board: None,
            error: None,
        }
    }

    /// Record a failure; earlier results stay in place.
    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Read a board layout from JSON and validate it.
pub fn load_board_json(path: impl AsRef<Path>) -> Result<BoardConfiguration, IoError> {
    let raw = fs::read_to_string(path)?;
    let config: BoardConfiguration = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
