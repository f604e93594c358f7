//! Render/dispatch loop
//!
//! Single-threaded and synchronous: draw, present, block on the next touch
//! event, dispatch it, repeat. The blocking read is the only suspension
//! point; a shutdown signal wakes it, and the flag is checked both before
//! the redraw and right before the read.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::backend::{self, DisplaySink};
use crate::geometry::ScreenGeometry;
use crate::input::{KeySink, RawEventSource, TouchEvent, TouchReader};
use crate::keyboard::KeyboardState;
use crate::layout::{KeyGrid, Layout};
use crate::render::{colors, GlyphRasterizer, KeyboardRenderer, Surface};
use crate::{Error, Result};

/// Everything the loop owns
pub struct App<S, K, D, R> {
    reader: TouchReader<S>,
    sink: K,
    display: D,
    renderer: KeyboardRenderer<R>,
    surface: Surface,
    geometry: ScreenGeometry,
    grid: KeyGrid,
    layout: Layout,
    state: KeyboardState,
    line_length: usize,
}

impl<S, K, D, R> App<S, K, D, R>
where
    S: RawEventSource,
    K: KeySink,
    D: DisplaySink,
    R: GlyphRasterizer,
{
    pub fn new(
        reader: TouchReader<S>,
        sink: K,
        display: D,
        renderer: KeyboardRenderer<R>,
        layout: Layout,
        geometry: ScreenGeometry,
        line_length: usize,
    ) -> Result<Self> {
        let surface = Surface::for_geometry(&geometry, line_length)?;
        Ok(Self {
            reader,
            sink,
            display,
            renderer,
            surface,
            geometry,
            grid: KeyGrid::new(&geometry),
            layout,
            state: KeyboardState::new(),
            line_length,
        })
    }

    /// Run until `shutdown` is set.
    ///
    /// Only a failing touch device ends the loop early; display and key
    /// write failures are logged and the next frame tries again.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        self.clear();
        info!(
            orientation = ?self.geometry.orientation(),
            width = self.geometry.logical().w,
            row_height = self.geometry.row_height(),
            "Keyboard running"
        );
        while !shutdown.load(Ordering::SeqCst) {
            self.redraw();
            // A signal during the redraw has no read to interrupt
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            match self.reader.next_event() {
                Ok(event) => self.dispatch(event),
                Err(Error::Interrupted) => debug!("Read interrupted"),
                Err(e) => return Err(e),
            }
        }
        info!("Shutdown requested, leaving dispatch loop");
        Ok(())
    }

    /// Blank the keyboard region before the first frame
    fn clear(&mut self) {
        self.surface.fill(colors::BACKGROUND);
        self.present();
    }

    fn redraw(&mut self) {
        self.renderer.draw(&mut self.surface, &self.layout, &self.state);
        self.present();
    }

    fn present(&mut self) {
        let result =
            backend::present(&mut self.display, &self.surface, &self.geometry, self.line_length);
        if let Err(e) = result {
            warn!("Failed to write framebuffer: {}", e);
        }
    }

    fn dispatch(&mut self, event: TouchEvent) {
        match event {
            TouchEvent::Contact(point) => {
                let pixel = self.geometry.to_pixel_space(point);
                let hit = self.grid.hit_test(pixel);
                if hit != self.state.pressed {
                    debug!(x = pixel.x, y = pixel.y, ?hit, "Contact");
                }
                self.state.contact(hit);
            }
            TouchEvent::Release => {
                let events = self.state.release(&self.layout).events();
                if events.is_empty() {
                    return;
                }
                if let Err(e) = self.sink.send(&events) {
                    warn!("Failed to send key events: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use evdev::Key;

    use super::*;
    use crate::backend::tests::MemoryDisplay;
    use crate::geometry::{NormalizedPoint, Orientation, Size, ONE};
    use crate::input::codes::{ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_TRACKING_ID};
    use crate::input::touch::tests::{abs, panel_1000, syn, ScriptedSource};
    use crate::input::uinput::tests::RecordingSink;
    use crate::input::RawEvent;
    use crate::keyboard::{KeyEvent, ModifierLocks};
    use crate::render::glyph::tests::BoxRasterizer;
    use crate::render::DEFAULT_GAP;

    /// Raises the shutdown flag once the script runs dry
    struct UntilExhausted {
        inner: ScriptedSource,
        shutdown: Arc<AtomicBool>,
        reads: usize,
    }

    impl RawEventSource for UntilExhausted {
        fn next_raw(&mut self) -> io::Result<RawEvent> {
            self.reads += 1;
            let result = self.inner.next_raw();
            if result.is_err() {
                self.shutdown.store(true, Ordering::SeqCst);
            }
            result
        }
    }

    type TestApp = App<UntilExhausted, RecordingSink, MemoryDisplay, BoxRasterizer>;

    /// Tap at raw panel coordinates on a 0..1000 panel
    fn tap(x: i32, y: i32) -> Vec<RawEvent> {
        vec![
            abs(ABS_MT_TRACKING_ID, 1),
            abs(ABS_MT_POSITION_X, x),
            abs(ABS_MT_POSITION_Y, y),
            syn(),
            abs(ABS_MT_TRACKING_ID, -1),
            syn(),
        ]
    }

    fn app(
        orientation: Orientation,
        physical: Size,
        script: Vec<RawEvent>,
    ) -> (TestApp, Arc<AtomicBool>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = UntilExhausted {
            inner: ScriptedSource::new(script),
            shutdown: shutdown.clone(),
            reads: 0,
        };
        let geometry = ScreenGeometry::new(orientation, physical).unwrap();
        let line_length = physical.w as usize * 4;
        let app = App::new(
            TouchReader::new(source, panel_1000()),
            RecordingSink::default(),
            MemoryDisplay::new(line_length * physical.h as usize),
            KeyboardRenderer::new(BoxRasterizer, geometry, DEFAULT_GAP),
            Layout::builtin(),
            geometry,
            line_length,
        )
        .unwrap();
        (app, shutdown)
    }

    fn run(orientation: Orientation, physical: Size, script: Vec<RawEvent>) -> TestApp {
        let (mut app, shutdown) = app(orientation, physical, script);
        app.run(&shutdown).unwrap();
        app
    }

    const PORTRAIT: Size = Size { w: 720, h: 1440 };

    #[test]
    fn test_tap_on_s() {
        // Logical (0.20, 0.83): home line, second key
        let app = run(Orientation::Upright, PORTRAIT, tap(200, 830));
        assert_eq!(
            app.sink.events,
            vec![KeyEvent::new(Key::KEY_S, true), KeyEvent::new(Key::KEY_S, false)]
        );
        assert_eq!(app.state.locks, ModifierLocks::default());
        assert_eq!(app.state.pressed, None);
    }

    #[test]
    fn test_rotation_preserves_struck_key() {
        // Same logical point on a clockwise-mounted landscape panel:
        // physical x = 1 - logical y, physical y = logical x
        let app = run(
            Orientation::ClockwiseQuarter,
            Size::new(1440, 720),
            tap(170, 200),
        );
        assert_eq!(
            app.sink.events,
            vec![KeyEvent::new(Key::KEY_S, true), KeyEvent::new(Key::KEY_S, false)]
        );
    }

    /// Panel fraction at the centre of physical pixel `px`
    fn panel_fraction(px: u32, dim: u32) -> u32 {
        ((2 * px as u64 + 1) * ONE as u64 / (2 * dim as u64)) as u32
    }

    #[test]
    fn test_drawn_key_pixels_hit_same_key() {
        for physical in [PORTRAIT, Size::new(1440, 720), Size::new(333, 777)] {
            for orientation in Orientation::ALL {
                let geometry = ScreenGeometry::new(orientation, physical).unwrap();
                let grid = KeyGrid::new(&geometry);
                let (ox, oy) = geometry.surface_origin();
                for (id, rect) in grid.drawn_keys() {
                    // Where the key's centre lands in the framebuffer
                    let s = geometry.surface_point(rect.x + rect.w / 2, rect.y + rect.h / 2);
                    let (px, py) = (ox + s.x as u32, oy + s.y as u32);
                    assert!(px < physical.w && py < physical.h);

                    // A finger on that framebuffer pixel
                    let touch = NormalizedPoint::new(
                        panel_fraction(px, physical.w),
                        panel_fraction(py, physical.h),
                    );
                    let hit = grid.hit_test(geometry.to_pixel_space(touch));
                    assert_eq!(hit, Some(id), "{:?} {:?}", orientation, physical);
                }
            }
        }
    }

    #[test]
    fn test_toggle_then_former_q() {
        let mut script = tap(50, 970);
        script.extend(tap(50, 760));
        let app = run(Orientation::Upright, PORTRAIT, script);
        assert_eq!(
            app.sink.events,
            vec![KeyEvent::new(Key::KEY_1, true), KeyEvent::new(Key::KEY_1, false)]
        );
        assert!(app.state.symbol_page);
    }

    #[test]
    fn test_alt_brackets_tap() {
        let mut script = tap(200, 970);
        script.extend(tap(250, 760));
        script.extend(tap(200, 970));
        let app = run(Orientation::Upright, PORTRAIT, script);
        assert_eq!(
            app.sink.events,
            vec![
                KeyEvent::new(Key::KEY_LEFTALT, true),
                KeyEvent::new(Key::KEY_E, true),
                KeyEvent::new(Key::KEY_E, false),
                KeyEvent::new(Key::KEY_LEFTALT, false),
            ]
        );
        assert!(!app.state.locks.alt);
    }

    #[test]
    fn test_dead_zone_release_is_silent() {
        let app = run(Orientation::Upright, PORTRAIT, tap(20, 830));
        assert!(app.sink.events.is_empty());
    }

    #[test]
    fn test_drag_acts_on_last_key_only() {
        let script = vec![
            abs(ABS_MT_TRACKING_ID, 1),
            abs(ABS_MT_POSITION_X, 50),
            abs(ABS_MT_POSITION_Y, 760),
            syn(),
            // Slide from q to w before lifting
            abs(ABS_MT_POSITION_X, 150),
            syn(),
            abs(ABS_MT_TRACKING_ID, -1),
            syn(),
        ];
        let app = run(Orientation::Upright, PORTRAIT, script);
        assert_eq!(
            app.sink.events,
            vec![KeyEvent::new(Key::KEY_W, true), KeyEvent::new(Key::KEY_W, false)]
        );
    }

    #[test]
    fn test_navigation_area_above_keyboard() {
        // Centre of the screen's upper two thirds is the middle nav cell
        let app = run(Orientation::Upright, PORTRAIT, tap(500, 333));
        assert_eq!(
            app.sink.events,
            vec![KeyEvent::new(Key::KEY_ENTER, true), KeyEvent::new(Key::KEY_ENTER, false)]
        );
    }

    #[test]
    fn test_write_failures_do_not_stop_loop() {
        let mut script = tap(200, 830);
        script.extend(tap(200, 830));
        let (mut app, shutdown) = app(Orientation::Upright, PORTRAIT, script);
        app.display.fail = true;
        app.sink.fail = true;
        app.run(&shutdown).unwrap();
        assert!(app.sink.events.is_empty());
        assert!(shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn test_frames_reach_display() {
        let app = run(Orientation::Upright, PORTRAIT, tap(200, 830));
        assert!(app.display.writes >= 2);
        assert!(app.display.bytes.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_preset_shutdown_skips_reading() {
        let (mut app, shutdown) = app(Orientation::Upright, PORTRAIT, tap(200, 830));
        shutdown.store(true, Ordering::SeqCst);
        app.run(&shutdown).unwrap();
        assert!(app.sink.events.is_empty());
        assert_eq!(app.display.writes, 1);
    }

    /// Display that raises the shutdown flag on its `n`th write
    struct SignalOnWrite {
        inner: MemoryDisplay,
        shutdown: Arc<AtomicBool>,
        at_write: usize,
    }

    impl DisplaySink for SignalOnWrite {
        fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
            self.inner.write_at(offset, bytes)?;
            if self.inner.writes == self.at_write {
                self.shutdown.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[test]
    fn test_shutdown_during_redraw_skips_read() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = UntilExhausted {
            inner: ScriptedSource::new(tap(200, 830)),
            shutdown: shutdown.clone(),
            reads: 0,
        };
        let geometry = ScreenGeometry::new(Orientation::Upright, PORTRAIT).unwrap();
        let line_length = PORTRAIT.w as usize * 4;
        // Write 1 clears the screen, write 2 is the first frame
        let display = SignalOnWrite {
            inner: MemoryDisplay::new(line_length * PORTRAIT.h as usize),
            shutdown: shutdown.clone(),
            at_write: 2,
        };
        let mut app = App::new(
            TouchReader::new(source, panel_1000()),
            RecordingSink::default(),
            display,
            KeyboardRenderer::new(BoxRasterizer, geometry, DEFAULT_GAP),
            Layout::builtin(),
            geometry,
            line_length,
        )
        .unwrap();
        app.run(&shutdown).unwrap();
        assert_eq!(app.reader.source().reads, 0);
        assert!(app.sink.events.is_empty());
    }
}
