//! Touch event reduction
//!
//! Raw events are coalesced per frame and only the frame terminator
//! (`SYN_REPORT`) produces logical events. Position fields may arrive in
//! separate events, or not at all when unchanged, so the last known X and Y
//! are cached across frames.
//!
//! A contact ends on any of: tracking ID -1 (protocol B), `BTN_TOUCH` 0, or
//! an empty `SYN_MT_REPORT` (protocol A devices that never send IDs).

use std::collections::VecDeque;
use std::io;

use tracing::trace;

use super::codes::*;
use super::{RawEvent, RawEventSource};
use crate::geometry::{NormalizedPoint, ONE};
use crate::{Error, Result};

/// Reported extent of one panel axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Raw axis value to a fixed-point fraction, clamped to the range.
    ///
    /// A degenerate range maps everything to 0.
    pub fn normalize(&self, value: i32) -> u32 {
        if self.max <= self.min {
            return 0;
        }
        let value = value.clamp(self.min, self.max) as i64 - self.min as i64;
        let span = self.max as i64 - self.min as i64;
        (value * ONE as i64 / span) as u32
    }
}

/// Which pair of position axes the panel reports through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    /// `ABS_MT_POSITION_X`/`Y`
    MultiTouch,
    /// `ABS_X`/`Y`
    SingleTouch,
}

/// Both axis ranges of a touch panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelAxes {
    pub source: AxisSource,
    pub x: AxisRange,
    pub y: AxisRange,
}

impl PanelAxes {
    /// Event codes carrying X and Y; the other pair may use another scale
    pub fn position_codes(&self) -> (u16, u16) {
        match self.source {
            AxisSource::MultiTouch => (ABS_MT_POSITION_X, ABS_MT_POSITION_Y),
            AxisSource::SingleTouch => (ABS_X, ABS_Y),
        }
    }

    pub fn normalize(&self, x: i32, y: i32) -> NormalizedPoint {
        NormalizedPoint::new(self.x.normalize(x), self.y.normalize(y))
    }
}

/// Logical touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    /// Finger is on the panel at this physical panel position
    Contact(NormalizedPoint),
    /// Finger lifted
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contact {
    Idle,
    Down,
}

/// What the current, unterminated frame has reported so far
#[derive(Debug, Default)]
struct Frame {
    moved: bool,
    touched: bool,
    released: bool,
    /// Data seen since the last `SYN_MT_REPORT`
    report_has_data: bool,
}

/// Idle/Down state machine over a raw event source
pub struct TouchReader<S> {
    source: S,
    axes: PanelAxes,
    contact: Contact,
    x: Option<i32>,
    y: Option<i32>,
    frame: Frame,
    pending: VecDeque<TouchEvent>,
}

impl<S: RawEventSource> TouchReader<S> {
    pub fn new(source: S, axes: PanelAxes) -> Self {
        Self {
            source,
            axes,
            contact: Contact::Idle,
            x: None,
            y: None,
            frame: Frame::default(),
            pending: VecDeque::new(),
        }
    }

    /// Block until the next logical event.
    ///
    /// Returns `Error::Interrupted` when a signal interrupts the read, so the
    /// caller can check for shutdown.
    pub fn next_event(&mut self) -> Result<TouchEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            let raw = self.source.next_raw().map_err(|e| match e.kind() {
                io::ErrorKind::Interrupted => Error::Interrupted,
                _ => Error::Io(e),
            })?;
            self.feed(raw);
        }
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    #[cfg(test)]
    fn is_down(&self) -> bool {
        self.contact == Contact::Down
    }

    fn feed(&mut self, raw: RawEvent) {
        let (x_code, y_code) = self.axes.position_codes();
        match (raw.kind, raw.code) {
            (EV_ABS, code) if code == x_code => {
                self.x = Some(raw.value);
                self.frame.moved = true;
                self.frame.report_has_data = true;
            }
            (EV_ABS, code) if code == y_code => {
                self.y = Some(raw.value);
                self.frame.moved = true;
                self.frame.report_has_data = true;
            }
            (EV_ABS, ABS_MT_TRACKING_ID) => {
                if raw.value < 0 {
                    self.frame.released = true;
                } else {
                    self.frame.touched = true;
                    self.frame.report_has_data = true;
                }
            }
            (EV_KEY, BTN_TOUCH) => {
                if raw.value == 0 {
                    self.frame.released = true;
                } else {
                    self.frame.touched = true;
                }
            }
            (EV_SYN, SYN_MT_REPORT) => {
                if !self.frame.report_has_data {
                    self.frame.released = true;
                }
                self.frame.report_has_data = false;
            }
            (EV_SYN, SYN_REPORT) => self.end_frame(),
            _ => {}
        }
    }

    fn end_frame(&mut self) {
        let frame = std::mem::take(&mut self.frame);
        if frame.released && self.contact == Contact::Down {
            self.contact = Contact::Idle;
            self.pending.push_back(TouchEvent::Release);
        }
        let starts = frame.touched && self.contact == Contact::Idle;
        // A release frame may carry a trailing position update; only a new touch revives it
        let moves = frame.moved && (frame.touched || !frame.released);
        if moves || starts {
            if let (Some(x), Some(y)) = (self.x, self.y) {
                self.contact = Contact::Down;
                self.pending.push_back(TouchEvent::Contact(self.axes.normalize(x, y)));
            }
        }
        trace!(pending = ?self.pending, "Touch frame");
    }
}
