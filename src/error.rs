//! Error types for the framebuffer keyboard

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open {}: {source}", path.display())]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no touchscreen with absolute axes found in /dev/input")]
    NoTouchDevice,

    #[error("unsupported framebuffer depth: {0} bits per pixel (need 32)")]
    UnsupportedPixelFormat(u32),

    #[error("invalid screen geometry: {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("font error: {0}")]
    Font(String),

    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("read interrupted by signal")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;
