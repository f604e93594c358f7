//! Keyboard layout model
//!
//! Provides:
//! - Logical key identity (`KeyId`, a row and an index within it)
//! - The four built-in pages (lower, upper, two symbol pages)
//! - Key geometry and hit-testing (see [`grid`])
//!
//! Rows: 0 function keys, 1 the whole letter/number grid (three lines on
//! screen), 3 Shift/Backspace, 4 page toggle/Alt/Space/Ctrl/Enter, 5 the
//! undrawn navigation area above the keyboard.

pub mod grid;

use evdev::Key;

pub use grid::KeyGrid;

/// Logical key identity, independent of position on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId {
    pub row: u8,
    pub index: u8,
}

impl KeyId {
    pub const FUNCTION_ROW: u8 = 0;
    pub const LETTER_ROW: u8 = 1;
    pub const SHIFT_ROW: u8 = 3;
    pub const SPACE_ROW: u8 = 4;
    pub const NAV_ROW: u8 = 5;

    pub const SHIFT: Self = Self::new(Self::SHIFT_ROW, 0);
    pub const BACKSPACE: Self = Self::new(Self::SHIFT_ROW, 1);
    pub const PAGE_TOGGLE: Self = Self::new(Self::SPACE_ROW, 99);
    pub const ALT: Self = Self::new(Self::SPACE_ROW, 0);
    pub const SPACE: Self = Self::new(Self::SPACE_ROW, 1);
    pub const CTRL: Self = Self::new(Self::SPACE_ROW, 2);
    pub const ENTER: Self = Self::new(Self::SPACE_ROW, 3);

    pub const fn new(row: u8, index: u8) -> Self {
        Self { row, index }
    }
}

/// One of the selectable key-label/code sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutPage {
    Lower,
    Upper,
    SymbolsPrimary,
    SymbolsSecondary,
}

impl LayoutPage {
    pub const ALL: [Self; 4] = [
        Self::Lower,
        Self::Upper,
        Self::SymbolsPrimary,
        Self::SymbolsSecondary,
    ];

    /// Page selection is a pure function of the two sticky bits
    pub fn select(shift: bool, symbols: bool) -> Self {
        match (symbols, shift) {
            (false, false) => Self::Lower,
            (false, true) => Self::Upper,
            (true, false) => Self::SymbolsPrimary,
            (true, true) => Self::SymbolsSecondary,
        }
    }

    pub fn is_symbols(self) -> bool {
        matches!(self, Self::SymbolsPrimary | Self::SymbolsSecondary)
    }

    pub fn is_shifted(self) -> bool {
        matches!(self, Self::Upper | Self::SymbolsSecondary)
    }

    fn index(self) -> usize {
        match self {
            Self::Lower => 0,
            Self::Upper => 1,
            Self::SymbolsPrimary => 2,
            Self::SymbolsSecondary => 3,
        }
    }
}

/// A labelled key; `key` is `None` for meta actions and blank cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCell {
    pub id: KeyId,
    pub label: String,
    pub key: Option<Key>,
}

impl KeyCell {
    fn new(id: KeyId, label: impl Into<String>, key: Option<Key>) -> Self {
        Self { id, label: label.into(), key }
    }
}

const LETTER_LABELS: [&str; 4] = [
    "qwertyuiopasdfghjklzxcvbnm",
    "QWERTYUIOPASDFGHJKLZXCVBNM",
    "1234567890-=[];'\\,.`/",
    "!@#$%^&*()_+{}:\"|<>~?",
];

/// Cells on the letter grid; the symbol pages leave the tail blank
const LETTER_CELLS: usize = 26;

const LETTER_KEYS: [Key; LETTER_CELLS] = [
    Key::KEY_Q, Key::KEY_W, Key::KEY_E, Key::KEY_R, Key::KEY_T,
    Key::KEY_Y, Key::KEY_U, Key::KEY_I, Key::KEY_O, Key::KEY_P,
    Key::KEY_A, Key::KEY_S, Key::KEY_D, Key::KEY_F, Key::KEY_G,
    Key::KEY_H, Key::KEY_J, Key::KEY_K, Key::KEY_L,
    Key::KEY_Z, Key::KEY_X, Key::KEY_C, Key::KEY_V, Key::KEY_B, Key::KEY_N, Key::KEY_M,
];

/// Both symbol pages share these codes; the OS applies Shift for the second
const SYMBOL_KEYS: [Key; 21] = [
    Key::KEY_1, Key::KEY_2, Key::KEY_3, Key::KEY_4, Key::KEY_5,
    Key::KEY_6, Key::KEY_7, Key::KEY_8, Key::KEY_9, Key::KEY_0,
    Key::KEY_MINUS, Key::KEY_EQUAL, Key::KEY_LEFTBRACE, Key::KEY_RIGHTBRACE,
    Key::KEY_SEMICOLON, Key::KEY_APOSTROPHE, Key::KEY_BACKSLASH,
    Key::KEY_COMMA, Key::KEY_DOT, Key::KEY_GRAVE, Key::KEY_SLASH,
];

/// (label, shifted label, code)
const FUNCTION_KEYS: [(&str, &str, Key); 7] = [
    ("Esc", "Esc", Key::KEY_ESC),
    ("Tab", "Tab", Key::KEY_TAB),
    ("F10", "F10", Key::KEY_F10),
    (" / ", " ? ", Key::KEY_SLASH),
    (" - ", " _ ", Key::KEY_MINUS),
    (" . ", " > ", Key::KEY_DOT),
    (" \\ ", " | ", Key::KEY_BACKSLASH),
];

const NAV_KEYS: [(&str, Key); 9] = [
    ("Home", Key::KEY_HOME),
    ("Up", Key::KEY_UP),
    ("PgUp", Key::KEY_PAGEUP),
    ("Left", Key::KEY_LEFT),
    ("Enter", Key::KEY_ENTER),
    ("Right", Key::KEY_RIGHT),
    ("End", Key::KEY_END),
    ("Down", Key::KEY_DOWN),
    ("PgDn", Key::KEY_PAGEDOWN),
];

/// Label of the page toggle: names the page it switches to
const TO_SYMBOLS_LABEL: &str = "123!@\"";
const TO_LETTERS_LABEL: &str = "abcABC";

/// All pages, built once at startup from the tables above
#[derive(Debug, Clone)]
pub struct Layout {
    /// `pages[page][row]` holds that row's cells
    pages: [Vec<Vec<KeyCell>>; 4],
}

impl Layout {
    pub fn builtin() -> Self {
        Self {
            pages: LayoutPage::ALL.map(build_page),
        }
    }

    pub fn row(&self, page: LayoutPage, row: u8) -> &[KeyCell] {
        self.pages[page.index()]
            .get(row as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cell(&self, page: LayoutPage, id: KeyId) -> Option<&KeyCell> {
        self.row(page, id.row).iter().find(|cell| cell.id == id)
    }

    /// Every key code any page can emit, modifiers included
    pub fn key_codes(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .pages
            .iter()
            .flatten()
            .flatten()
            .filter_map(|cell| cell.key)
            .collect();
        keys.sort_by_key(|k| k.code());
        keys.dedup();
        keys
    }
}

fn build_page(page: LayoutPage) -> Vec<Vec<KeyCell>> {
    let shifted = page.is_shifted();

    let function = FUNCTION_KEYS
        .iter()
        .enumerate()
        .map(|(i, &(label, shifted_label, key))| {
            let label = if shifted { shifted_label } else { label };
            KeyCell::new(KeyId::new(KeyId::FUNCTION_ROW, i as u8), label, Some(key))
        })
        .collect();

    let labels: Vec<char> = LETTER_LABELS[page.index()].chars().collect();
    let letters = (0..LETTER_CELLS)
        .map(|i| {
            let id = KeyId::new(KeyId::LETTER_ROW, i as u8);
            let key = if page.is_symbols() {
                SYMBOL_KEYS.get(i).copied()
            } else {
                Some(LETTER_KEYS[i])
            };
            match labels.get(i) {
                Some(c) => KeyCell::new(id, c.to_string(), key),
                None => KeyCell::new(id, " ", None),
            }
        })
        .collect();

    let shift_row = vec![
        KeyCell::new(KeyId::SHIFT, "Shift", Some(Key::KEY_LEFTSHIFT)),
        KeyCell::new(KeyId::BACKSPACE, "Bcksp", Some(Key::KEY_BACKSPACE)),
    ];

    let toggle = if page.is_symbols() { TO_LETTERS_LABEL } else { TO_SYMBOLS_LABEL };
    let space_row = vec![
        KeyCell::new(KeyId::PAGE_TOGGLE, toggle, None),
        KeyCell::new(KeyId::ALT, "Alt", Some(Key::KEY_LEFTALT)),
        KeyCell::new(KeyId::SPACE, " ", Some(Key::KEY_SPACE)),
        KeyCell::new(KeyId::CTRL, "Ctrl", Some(Key::KEY_RIGHTCTRL)),
        KeyCell::new(KeyId::ENTER, "Enter", Some(Key::KEY_ENTER)),
    ];

    let nav = NAV_KEYS
        .iter()
        .enumerate()
        .map(|(i, &(label, key))| KeyCell::new(KeyId::new(KeyId::NAV_ROW, i as u8), label, Some(key)))
        .collect();

    // Row 2 is unused; the letter grid spans three screen lines as row 1
    vec![function, letters, Vec::new(), shift_row, space_row, nav]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_selection() {
        assert_eq!(LayoutPage::select(false, false), LayoutPage::Lower);
        assert_eq!(LayoutPage::select(true, false), LayoutPage::Upper);
        assert_eq!(LayoutPage::select(false, true), LayoutPage::SymbolsPrimary);
        assert_eq!(LayoutPage::select(true, true), LayoutPage::SymbolsSecondary);
    }

    #[test]
    fn test_letter_pages() {
        let layout = Layout::builtin();
        let s = KeyId::new(1, 11);
        assert_eq!(layout.cell(LayoutPage::Lower, s).unwrap().label, "s");
        assert_eq!(layout.cell(LayoutPage::Upper, s).unwrap().label, "S");
        assert_eq!(layout.cell(LayoutPage::Lower, s).unwrap().key, Some(Key::KEY_S));
        assert_eq!(layout.cell(LayoutPage::Upper, s).unwrap().key, Some(Key::KEY_S));
    }

    #[test]
    fn test_symbol_pages() {
        let layout = Layout::builtin();
        let q = KeyId::new(1, 0);
        assert_eq!(layout.cell(LayoutPage::SymbolsPrimary, q).unwrap().label, "1");
        assert_eq!(layout.cell(LayoutPage::SymbolsSecondary, q).unwrap().label, "!");
        assert_eq!(layout.cell(LayoutPage::SymbolsSecondary, q).unwrap().key, Some(Key::KEY_1));

        let slash = layout.cell(LayoutPage::SymbolsPrimary, KeyId::new(1, 20)).unwrap();
        assert_eq!((slash.label.as_str(), slash.key), ("/", Some(Key::KEY_SLASH)));

        let blank = layout.cell(LayoutPage::SymbolsPrimary, KeyId::new(1, 25)).unwrap();
        assert_eq!(blank.key, None);
    }

    #[test]
    fn test_every_page_has_full_rows() {
        let layout = Layout::builtin();
        for page in LayoutPage::ALL {
            assert_eq!(layout.row(page, 0).len(), 7);
            assert_eq!(layout.row(page, 1).len(), 26);
            assert_eq!(layout.row(page, 3).len(), 2);
            assert_eq!(layout.row(page, 4).len(), 5);
            assert_eq!(layout.row(page, 5).len(), 9);
            assert!(layout.row(page, 6).is_empty());
        }
    }

    #[test]
    fn test_toggle_label_names_other_page() {
        let layout = Layout::builtin();
        let label = |p| layout.cell(p, KeyId::PAGE_TOGGLE).unwrap().label.clone();
        assert_eq!(label(LayoutPage::Lower), TO_SYMBOLS_LABEL);
        assert_eq!(label(LayoutPage::SymbolsSecondary), TO_LETTERS_LABEL);
    }

    #[test]
    fn test_key_codes_cover_modifiers() {
        let codes = Layout::builtin().key_codes();
        for key in [Key::KEY_LEFTSHIFT, Key::KEY_LEFTALT, Key::KEY_RIGHTCTRL, Key::KEY_PAGEDOWN] {
            assert!(codes.contains(&key), "{:?}", key);
        }
        let mut sorted = codes.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
