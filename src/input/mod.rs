//! Touch input and synthesized key output
//!
//! Provides:
//! - `RawEventSource`, the seam between the kernel event stream and the core
//! - `TouchReader`, reducing raw frames to `Contact`/`Release` (see [`touch`])
//! - evdev device discovery (see [`evdev_source`])
//! - The uinput virtual keyboard (see [`uinput`])

pub mod evdev_source;
pub mod touch;
pub mod uinput;

use std::io;

pub use evdev_source::TouchDevice;
pub use touch::{TouchEvent, TouchReader};
pub use uinput::{KeySink, VirtualKeyboard};

/// Raw type and code values of the events the touch reader consumes
pub mod codes {
    use evdev::{AbsoluteAxisType, EventType, Key, Synchronization};

    pub const EV_SYN: u16 = EventType::SYNCHRONIZATION.0;
    pub const EV_KEY: u16 = EventType::KEY.0;
    pub const EV_ABS: u16 = EventType::ABSOLUTE.0;

    pub const SYN_REPORT: u16 = Synchronization::SYN_REPORT.0;
    pub const SYN_MT_REPORT: u16 = Synchronization::SYN_MT_REPORT.0;

    pub const ABS_X: u16 = AbsoluteAxisType::ABS_X.0;
    pub const ABS_Y: u16 = AbsoluteAxisType::ABS_Y.0;
    pub const ABS_MT_POSITION_X: u16 = AbsoluteAxisType::ABS_MT_POSITION_X.0;
    pub const ABS_MT_POSITION_Y: u16 = AbsoluteAxisType::ABS_MT_POSITION_Y.0;
    pub const ABS_MT_TRACKING_ID: u16 = AbsoluteAxisType::ABS_MT_TRACKING_ID.0;

    pub const BTN_TOUCH: u16 = Key::BTN_TOUCH.code();
}

/// One `{type, code, value}` record from the input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }
}

/// Blocking source of raw input events
pub trait RawEventSource {
    /// Block until the next event; `ErrorKind::Interrupted` when a signal arrives
    fn next_raw(&mut self) -> io::Result<RawEvent>;
}
