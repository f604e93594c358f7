//! Synthesized keyboard via uinput

use std::io;
use std::path::PathBuf;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use tracing::{debug, info};

use crate::keyboard::KeyEvent;
use crate::{Error, Result};

/// Name the virtual keyboard registers under
pub const DEVICE_NAME: &str = "fbkeyboard";

const UINPUT_PATH: &str = "/dev/uinput";

/// Destination for synthesized key transitions
pub trait KeySink {
    /// Deliver transitions in order, each followed by a frame terminator
    fn send(&mut self, events: &[KeyEvent]) -> io::Result<()>;
}

/// A uinput keyboard declaring every key the layout can produce
pub struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    pub fn create(keys: &[Key]) -> Result<Self> {
        let mut set = AttributeSet::<Key>::new();
        for key in keys {
            set.insert(*key);
        }
        let unavailable = |source: io::Error| Error::DeviceUnavailable {
            path: PathBuf::from(UINPUT_PATH),
            source,
        };
        let device = VirtualDeviceBuilder::new()
            .map_err(unavailable)?
            .name(DEVICE_NAME)
            .with_keys(&set)
            .and_then(|builder| builder.build())
            .map_err(unavailable)?;
        info!(name = DEVICE_NAME, keys = keys.len(), "Virtual keyboard created");
        Ok(Self { device })
    }
}

impl KeySink for VirtualKeyboard {
    fn send(&mut self, events: &[KeyEvent]) -> io::Result<()> {
        emit_each(events, |event| {
            debug!(key = ?event.key, pressed = event.pressed, "Emitting key");
            // emit() appends SYN_REPORT
            self.device.emit(&[to_input_event(event)])
        })
    }
}

/// Attempt every transition even after a failure, reporting the first error
fn emit_each(
    events: &[KeyEvent],
    mut emit: impl FnMut(&KeyEvent) -> io::Result<()>,
) -> io::Result<()> {
    let mut first_error = None;
    for event in events {
        if let Err(e) = emit(event) {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn to_input_event(event: &KeyEvent) -> InputEvent {
    InputEvent::new(EventType::KEY, event.key.code(), i32::from(event.pressed))
}
