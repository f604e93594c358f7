//! Startup configuration
//!
//! Read from `config.toml` under the XDG config directory. A missing file
//! means defaults; a malformed one is a startup error. Command-line flags
//! are applied on top by `main`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::Orientation;
use crate::render::DEFAULT_GAP;
use crate::{Error, Result};

/// How the keyboard orientation is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationSetting {
    /// Follow the framebuffer's own rotation metadata
    #[default]
    Auto,
    Upright,
    UpsideDown,
    Clockwise,
    CounterClockwise,
}

impl OrientationSetting {
    /// From fbcon numbering, as given on the command line
    pub fn from_rotate(rotate: u8) -> Option<Self> {
        Orientation::from_fb_rotate(rotate as u32).map(Self::from)
    }

    /// Pick the orientation, falling back to upright for unknown metadata
    pub fn resolve(self, fb_rotate: u32) -> Orientation {
        match self {
            Self::Auto => Orientation::from_fb_rotate(fb_rotate).unwrap_or_else(|| {
                tracing::warn!(fb_rotate, "Unknown framebuffer rotation, assuming upright");
                Orientation::Upright
            }),
            Self::Upright => Orientation::Upright,
            Self::UpsideDown => Orientation::UpsideDown,
            Self::Clockwise => Orientation::ClockwiseQuarter,
            Self::CounterClockwise => Orientation::CounterClockwiseQuarter,
        }
    }
}

impl From<Orientation> for OrientationSetting {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Upright => Self::Upright,
            Orientation::UpsideDown => Self::UpsideDown,
            Orientation::ClockwiseQuarter => Self::Clockwise,
            Orientation::CounterClockwiseQuarter => Self::CounterClockwise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// TrueType font for key labels
    pub font: PathBuf,
    /// Touch device; discovered when unset
    pub device: Option<PathBuf>,
    pub framebuffer: PathBuf,
    pub orientation: OrientationSetting,
    /// Inset of the key border from the cell edge, in pixels
    pub gap: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font: PathBuf::from("/usr/share/fonts/ttf-dejavu/DejaVuSans.ttf"),
            device: None,
            framebuffer: PathBuf::from("/dev/fb0"),
            orientation: OrientationSetting::Auto,
            gap: DEFAULT_GAP,
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/fbkeyboard/config.toml`, else under `$HOME/.config`
    pub fn default_path() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
            .ok()
            .map(|dir| dir.join("fbkeyboard").join("config.toml"))
    }

    /// Load from `path`, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_toml(&contents).map_err(|message| Error::Config {
                    path: path.to_path_buf(),
                    message,
                })?;
                tracing::info!("Loaded config from {:?}", path);
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No config at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }
}
