//! Key geometry: draw rectangles and hit-testing
//!
//! Both are derived from one list of horizontal spans per keyboard line, so
//! what the user sees as a key is exactly what a touch resolves to. The
//! breakpoint fractions are hand-tuned and kept as named constants.

use crate::geometry::{Point, Rect, ScreenGeometry, KEYBOARD_LINES};

use super::KeyId;

/// Columns on the function line
const FUNCTION_COLUMNS: u32 = 7;
/// Columns on the top letter line
const LETTER_COLUMNS: u32 = 10;
/// Letter keys on the home line (a-l)
const HOME_KEYS: u8 = 9;
/// Letter keys on the Shift line (z-m)
const SHIFT_LINE_KEYS: u8 = 7;
/// Lines 2-4 are laid out in twentieths of the width
const TWENTIETHS: u32 = 20;
/// Home line dead zone at each edge (1/20 = 5%)
const HOME_INSET: u32 = 1;
/// Shift, Backspace, page toggle and Enter are 3/20 wide
const WIDE_KEY: u32 = 3;
/// Letter keys are 2/20 wide
const LETTER_KEY: u32 = 2;
/// Right edge of the letter block on the Shift line
const LETTER_BLOCK_END: u32 = 17;
/// Alt ends where the space bar begins
const SPACE_START: u32 = 5;
/// Space bar ends where Ctrl begins
const SPACE_END: u32 = 15;
/// Navigation area above the keyboard is a 3x3 grid
const NAV_COLUMNS: u32 = 3;

/// Horizontal extent of one key, in fractions of the width
#[derive(Debug, Clone, Copy)]
struct Span {
    id: KeyId,
    start: u32,
    end: u32,
    denominator: u32,
}

impl Span {
    fn new(id: KeyId, start: u32, end: u32, denominator: u32) -> Self {
        Self { id, start, end, denominator }
    }

    /// Pixel range `[x0, x1)` for the given width
    fn pixels(&self, width: u32) -> (i32, i32) {
        let at = |n: u32| (width as u64 * n as u64 / self.denominator as u64) as i32;
        (at(self.start), at(self.end))
    }
}

/// Spans for keyboard line `line` (0 = function line, 4 = space line)
fn line_spans(line: u32) -> Vec<Span> {
    match line {
        0 => (0..FUNCTION_COLUMNS as u8)
            .map(|k| Span::new(KeyId::new(0, k), k as u32, k as u32 + 1, FUNCTION_COLUMNS))
            .collect(),
        1 => (0..LETTER_COLUMNS as u8)
            .map(|k| Span::new(KeyId::new(1, k), k as u32, k as u32 + 1, LETTER_COLUMNS))
            .collect(),
        2 => (0..HOME_KEYS)
            .map(|k| {
                let start = HOME_INSET + LETTER_KEY * k as u32;
                Span::new(KeyId::new(1, 10 + k), start, start + LETTER_KEY, TWENTIETHS)
            })
            .collect(),
        3 => {
            let mut spans = vec![Span::new(KeyId::SHIFT, 0, WIDE_KEY, TWENTIETHS)];
            spans.extend((0..SHIFT_LINE_KEYS).map(|k| {
                let start = WIDE_KEY + LETTER_KEY * k as u32;
                Span::new(KeyId::new(1, 19 + k), start, start + LETTER_KEY, TWENTIETHS)
            }));
            spans.push(Span::new(KeyId::BACKSPACE, LETTER_BLOCK_END, TWENTIETHS, TWENTIETHS));
            spans
        }
        4 => vec![
            Span::new(KeyId::PAGE_TOGGLE, 0, WIDE_KEY, TWENTIETHS),
            Span::new(KeyId::ALT, WIDE_KEY, SPACE_START, TWENTIETHS),
            Span::new(KeyId::SPACE, SPACE_START, SPACE_END, TWENTIETHS),
            Span::new(KeyId::CTRL, SPACE_END, LETTER_BLOCK_END, TWENTIETHS),
            Span::new(KeyId::ENTER, LETTER_BLOCK_END, TWENTIETHS, TWENTIETHS),
        ],
        _ => Vec::new(),
    }
}

/// Draw rectangle for a cell: one pixel of separation on the left and top
fn cell_rect(x0: i32, x1: i32, y0: i32, y1: i32) -> Rect {
    Rect::new(x0 + 1, y0 + 1, x1 - x0 - 1, y1 - y0 - 1)
}

/// Key geometry for one screen, in logical pixels
#[derive(Debug, Clone, Copy)]
pub struct KeyGrid {
    width: u32,
    height: u32,
    row_height: u32,
    top: u32,
}

impl KeyGrid {
    pub fn new(geometry: &ScreenGeometry) -> Self {
        Self {
            width: geometry.logical().w,
            height: geometry.logical().h,
            row_height: geometry.row_height(),
            top: geometry.keyboard_top(),
        }
    }

    /// Every drawn key with its rectangle in keyboard-local coordinates
    pub fn drawn_keys(&self) -> Vec<(KeyId, Rect)> {
        let top = self.top as i32;
        (0..KEYBOARD_LINES)
            .flat_map(line_spans)
            .filter_map(|span| {
                let rect = self.key_rect(span.id)?;
                Some((span.id, Rect::new(rect.x, rect.y - top, rect.w, rect.h)))
            })
            .collect()
    }

    /// Rectangle of a key in logical screen coordinates.
    ///
    /// Navigation keys live above the keyboard and are never drawn, but
    /// still have a rectangle for hit-testing.
    pub fn key_rect(&self, id: KeyId) -> Option<Rect> {
        if id.row == KeyId::NAV_ROW {
            if id.index as u32 >= NAV_COLUMNS * NAV_COLUMNS {
                return None;
            }
            let (r, c) = (id.index as u32 / NAV_COLUMNS, id.index as u32 % NAV_COLUMNS);
            let (x0, x1) = self.nav_band(c, self.width);
            let (y0, y1) = self.nav_band(r, self.top);
            return Some(cell_rect(x0, x1, y0, y1));
        }
        (0..KEYBOARD_LINES).find_map(|line| {
            let span = line_spans(line).into_iter().find(|s| s.id == id)?;
            let (x0, x1) = span.pixels(self.width);
            let y0 = (self.top + line * self.row_height) as i32;
            Some(cell_rect(x0, x1, y0, y0 + self.row_height as i32))
        })
    }

    /// Map a logical screen pixel to the key under it.
    ///
    /// Returns `None` outside the screen and in the home line's edge dead zones.
    pub fn hit_test(&self, p: Point) -> Option<KeyId> {
        if p.x < 0 || p.y < 0 || p.x >= self.width as i32 || p.y >= self.height as i32 {
            return None;
        }
        let (x, y) = (p.x, p.y as u32);
        if y < self.top {
            let column = (0..NAV_COLUMNS).find(|&c| within(self.nav_band(c, self.width), x))?;
            let row = (0..NAV_COLUMNS).find(|&r| within(self.nav_band(r, self.top), p.y))?;
            return Some(KeyId::new(KeyId::NAV_ROW, (row * NAV_COLUMNS + column) as u8));
        }
        let line = ((y - self.top) / self.row_height).min(KEYBOARD_LINES - 1);
        line_spans(line)
            .into_iter()
            .find(|span| within(span.pixels(self.width), x))
            .map(|span| span.id)
    }

    /// One third of `extent`
    fn nav_band(&self, n: u32, extent: u32) -> (i32, i32) {
        let at = |k: u32| (extent as u64 * k as u64 / NAV_COLUMNS as u64) as i32;
        (at(n), at(n + 1))
    }
}

fn within((start, end): (i32, i32), v: i32) -> bool {
    v >= start && v < end
}
