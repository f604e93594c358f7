//! Touchscreen discovery and the evdev-backed event source

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use evdev::{AbsoluteAxisType, Device};
use tracing::{debug, info};

use super::touch::{AxisRange, AxisSource, PanelAxes};
use super::{RawEvent, RawEventSource};
use crate::{Error, Result};

const INPUT_DIR: &str = "/dev/input";

/// An opened touch panel
pub struct TouchDevice {
    device: Device,
    path: PathBuf,
    buffered: VecDeque<RawEvent>,
    /// Readable when the blocking wait should give up
    wake: Option<RawFd>,
}

impl TouchDevice {
    pub fn open(path: &Path) -> Result<Self> {
        let device = Device::open(path).map_err(|source| Error::DeviceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            device,
            path: path.to_path_buf(),
            buffered: VecDeque::new(),
            wake: None,
        })
    }

    /// Stop waiting for events, as if interrupted, once `fd` is readable
    pub fn wake_on(mut self, fd: Option<RawFd>) -> Self {
        self.wake = fd;
        self
    }

    /// First `/dev/input/event*` node, in numeric order, with absolute position axes
    pub fn discover() -> Result<Self> {
        let mut nodes: Vec<(u32, PathBuf)> = fs::read_dir(INPUT_DIR)
            .map_err(|source| Error::DeviceUnavailable {
                path: PathBuf::from(INPUT_DIR),
                source,
            })?
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let index = event_index(&path)?;
                Some((index, path))
            })
            .collect();
        nodes.sort();

        for (_, path) in nodes {
            let device = match Self::open(&path) {
                Ok(device) => device,
                Err(e) => {
                    debug!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            if device.panel().is_some() {
                info!(
                    path = %path.display(),
                    name = device.device.name().unwrap_or("unknown"),
                    "Touch device found"
                );
                return Ok(device);
            }
        }
        Err(Error::NoTouchDevice)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Axis ranges of the panel: multitouch axes if present, else single-touch
    pub fn panel(&self) -> Option<PanelAxes> {
        let axes = self.device.supported_absolute_axes()?;
        let (source, x, y) = if axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
            && axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
        {
            (
                AxisSource::MultiTouch,
                AbsoluteAxisType::ABS_MT_POSITION_X,
                AbsoluteAxisType::ABS_MT_POSITION_Y,
            )
        } else if axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y) {
            (AxisSource::SingleTouch, AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y)
        } else {
            return None;
        };

        let state = self.device.get_abs_state().ok()?;
        let range = |axis: AbsoluteAxisType| {
            state
                .get(axis.0 as usize)
                .map(|info| AxisRange::new(info.minimum, info.maximum))
        };
        Some(PanelAxes {
            source,
            x: range(x)?,
            y: range(y)?,
        })
    }
}

impl RawEventSource for TouchDevice {
    fn next_raw(&mut self) -> io::Result<RawEvent> {
        while self.buffered.is_empty() {
            self.wait_readable()?;
            let events = self.device.fetch_events()?;
            self.buffered.extend(
                events.map(|e| RawEvent::new(e.event_type().0, e.code(), e.value())),
            );
        }
        self.buffered
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))
    }
}

impl TouchDevice {
    /// Block until the device has events or the wake descriptor fires
    fn wait_readable(&self) -> io::Result<()> {
        let Some(wake) = self.wake else {
            return Ok(());
        };
        let mut fds = [
            libc::pollfd {
                fd: self.device.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: wake,
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        // SAFETY: fds is a live array of initialized pollfd records
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if ready < 0 {
            return Err(io::Error::last_os_error());
        }
        if fds[1].revents != 0 {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        Ok(())
    }
}

/// `eventN` file name to N
fn event_index(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("event")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_index() {
        assert_eq!(event_index(Path::new("/dev/input/event0")), Some(0));
        assert_eq!(event_index(Path::new("/dev/input/event12")), Some(12));
        assert_eq!(event_index(Path::new("/dev/input/mice")), None);
        assert_eq!(event_index(Path::new("/dev/input/eventX")), None);
    }

    #[test]
    fn test_open_missing_device() {
        let result = TouchDevice::open(Path::new("/nonexistent/event0"));
        assert!(matches!(result, Err(Error::DeviceUnavailable { .. })));
    }
}
