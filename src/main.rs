//! fbkeyboard - on-screen keyboard for the Linux framebuffer console
//!
//! Features:
//! - Draws a five-line keyboard into the bottom third of /dev/fb0
//! - Turns taps on the touchscreen into key events on a uinput keyboard
//! - Sticky Shift/Alt/Ctrl, two symbol pages, navigation keys above the keyboard
//! - All four screen rotations

mod app;
mod backend;
mod config;
mod error;
mod geometry;
mod input;
mod keyboard;
mod layout;
mod render;
mod signal;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::App;
use crate::backend::Framebuffer;
use crate::config::{Config, OrientationSetting};
use crate::error::{Error, Result};
use crate::geometry::ScreenGeometry;
use crate::input::{TouchDevice, TouchReader, VirtualKeyboard};
use crate::layout::Layout;
use crate::render::{FontRasterizer, KeyboardRenderer};

#[derive(Parser, Debug)]
#[command(name = "fbkeyboard")]
#[command(about = "On-screen keyboard for framebuffer consoles on touchscreen devices", long_about = None)]
struct Args {
    /// Touchscreen event device (default: first device with absolute axes)
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// TrueType font for key labels
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Screen rotation: 0 upright, 1 clockwise, 2 upside down, 3 counter-clockwise
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=3))]
    rotate: Option<u8>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long)]
    debug: bool,
}

impl Args {
    /// Command-line values win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.device = Some(device.clone());
        }
        if let Some(font) = &self.font {
            config.font = font.clone();
        }
        if let Some(setting) = self.rotate.and_then(OrientationSetting::from_rotate) {
            config.orientation = setting;
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Set up log directory (~/.local/state/fbkeyboard or /tmp/fbkeyboard)
    let log_dir = std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/state")))
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("fbkeyboard");

    std::fs::create_dir_all(&log_dir).ok();

    // Log panics before crashing
    let crash_log = log_dir.join("crash.log");
    std::panic::set_hook(Box::new(move |panic_info| {
        eprintln!("PANIC: {}", panic_info);
        if let Ok(mut f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&crash_log)
        {
            use std::io::Write;
            let _ = writeln!(f, "[{}] PANIC: {}", chrono::Local::now(), panic_info);
        }
    }));

    let args = Args::parse();

    let file_appender = rolling::daily(&log_dir, "fbkeyboard.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Quiet by default, verbose with --debug
    let default_filter = if args.debug {
        "debug,fbkeyboard=debug"
    } else {
        "warn,fbkeyboard=info"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!(log_path = %log_dir.display(), "fbkeyboard starting");

    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    args.apply(&mut config);

    signal::install().context("failed to install signal handlers")?;

    let framebuffer = Framebuffer::open(&config.framebuffer)
        .with_context(|| format!("cannot use framebuffer {:?}", config.framebuffer))?;
    let fb = framebuffer.info();
    let orientation = config.orientation.resolve(fb.rotate);
    let geometry = ScreenGeometry::new(orientation, fb.size())?;

    let device = match &config.device {
        Some(path) => TouchDevice::open(path)?,
        None => TouchDevice::discover()?,
    }
    .wake_on(signal::wake_fd());
    let axes = device
        .panel()
        .with_context(|| format!("{:?} reports no absolute position axes", device.path()))?;
    info!(path = %device.path().display(), ?axes, "Using touch panel");

    let layout = Layout::builtin();
    let keyboard = VirtualKeyboard::create(&layout.key_codes())?;
    let font = FontRasterizer::load(&config.font)?;
    let renderer = KeyboardRenderer::new(font, geometry, config.gap);

    let mut app = App::new(
        TouchReader::new(device, axes),
        keyboard,
        framebuffer,
        renderer,
        layout,
        geometry,
        fb.line_length as usize,
    )?;
    app.run(signal::flag())?;

    info!("fbkeyboard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from(["fbkeyboard", "-r", "1", "-f", "/tmp/font.ttf"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.orientation, OrientationSetting::Clockwise);
        assert_eq!(config.font, PathBuf::from("/tmp/font.ttf"));
        assert_eq!(config.device, None);
    }

    #[test]
    fn test_rotate_out_of_range_rejected() {
        assert!(Args::try_parse_from(["fbkeyboard", "-r", "4"]).is_err());
    }
}
