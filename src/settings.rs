//! Application settings
//!
//! Persisted as JSON. Every field has a default, so a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Environment variable that overrides the settings file location
pub const SETTINGS_ENV: &str = "QUAD_PONG_SETTINGS";
/// Settings file looked up in the working directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Errors from reading or writing a settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Which scene the frame loop drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    /// Two textured quads, one rotating and one pulsing
    Transforms,
    /// Ball and two keyboard-driven paddles
    #[default]
    Pong,
}

impl Scene {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scene::Transforms => "transforms",
            Scene::Pong => "pong",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Wait for vertical sync on present
    pub vsync: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Quad Pong".to_string(),
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            vsync: true,
        }
    }
}

/// Optional shader overrides; the built-in WGSL is used when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderPaths {
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

/// An image bound to a texture uniform of the program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureSource {
    /// Name of the `texture_2d` variable in the fragment shader
    pub uniform: String,
    pub path: PathBuf,
    #[serde(default)]
    pub flip_vertically: bool,
}

/// Pong tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PongSettings {
    pub ball_position: [f32; 2],
    pub ball_velocity: [f32; 2],
    /// Edge length of the (square) ball quad
    pub ball_size: f32,
    /// Distance of each paddle from the vertical centre line
    pub paddle_x: f32,
    pub paddle_size: [f32; 2],
    pub paddle_speed: f32,
    pub ball_color: [f32; 4],
    pub paddle_color: [f32; 4],
}

impl Default for PongSettings {
    fn default() -> Self {
        Self {
            ball_position: BALL_START_POS,
            ball_velocity: BALL_START_VEL,
            ball_size: BALL_SIZE,
            paddle_x: PADDLE_X,
            paddle_size: PADDLE_SIZE,
            paddle_speed: PADDLE_SPEED,
            ball_color: [1.0, 1.0, 1.0, 1.0],
            paddle_color: [0.2, 0.8, 0.4, 1.0],
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub scene: Scene,
    /// Background colour (RGBA)
    pub clear_color: [f32; 4],
    pub shaders: ShaderPaths,
    pub textures: Vec<TextureSource>,
    /// Blend factor between `texture1` and `texture2`
    pub mix_amount: f32,
    pub pong: PongSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            scene: Scene::default(),
            clear_color: [0.2, 0.3, 0.3, 1.0],
            shaders: ShaderPaths::default(),
            textures: Vec::new(),
            mix_amount: MIX_AMOUNT,
            pong: PongSettings::default(),
        }
    }
}

impl Settings {
    /// Settings path: `$QUAD_PONG_SETTINGS`, else `settings.json`
    pub fn default_path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
    }

    /// Load settings from the default path, falling back to defaults
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Texture source configured for a given uniform name
    pub fn texture_for(&self, uniform: &str) -> Option<&TextureSource> {
        self.textures.iter().find(|t| t.uniform == uniform)
    }
}
