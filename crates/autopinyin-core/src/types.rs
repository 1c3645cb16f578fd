use serde::{Deserialize, Serialize};

/// Windows Scancode + Extended flag key identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScKey {
    pub sc: u16,
    pub ext: bool,
}

impl ScKey {
    pub const fn new(sc: u16, ext: bool) -> Self {
        Self { sc, ext }
    }
}

/// Event to be injected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Scancode injection (scancode, ext, up).
    Scancode(u16, bool, bool),
    /// Unicode character injection (char, up).
    Unicode(char, bool),
}

/// Modifier keys applied to a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl Modifiers {
    pub const fn none() -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            win: false,
        }
    }

    pub const fn shift() -> Self {
        Self {
            shift: true,
            ..Self::none()
        }
    }

    pub const fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::none()
        }
    }

    pub const fn win() -> Self {
        Self {
            win: true,
            ..Self::none()
        }
    }

    pub const fn is_empty(self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.win)
    }
}

/// Key specification inside a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    /// A character to be mapped to a scancode (fallback to Unicode if unknown).
    Char(char),
    /// Explicit scancode.
    Scancode(ScKey),
}

/// A single keystroke with optional modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: KeySpec,
    pub mods: Modifiers,
}

impl KeyStroke {
    pub const fn char(c: char) -> Self {
        Self {
            key: KeySpec::Char(c),
            mods: Modifiers::none(),
        }
    }

    pub const fn scancode(key: ScKey, mods: Modifiers) -> Self {
        Self {
            key: KeySpec::Scancode(key),
            mods,
        }
    }

    /// Digit key selecting the candidate at a 1-based position.
    pub fn digit(position: usize) -> Option<Self> {
        match position {
            1..=9 => char::from_digit(position as u32, 10).map(Self::char),
            _ => None,
        }
    }
}

/// Character class of a classified run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunKind {
    Ideograph,
    ChinesePunctuation,
    Ascii,
    Newline,
    Other,
}

/// A maximal substring whose characters share one [`RunKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRun {
    pub kind: RunKind,
    pub text: String,
}

impl ClassifiedRun {
    pub fn new(kind: RunKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Active keyboard input language as seen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputMode {
    Chinese,
    English,
}

/// Which keyboard (input language) is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardKind {
    /// Microsoft Pinyin (zh-CN).
    Pinyin,
    /// Any other layout, typically en-US.
    Other,
}

/// Conversion mode of the Pinyin IME.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    Chinese,
    English,
}

/// Raw IME state reported by a mode provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImeStatus {
    pub keyboard: KeyboardKind,
    pub conversion: Conversion,
}

impl ImeStatus {
    pub const fn new(keyboard: KeyboardKind, conversion: Conversion) -> Self {
        Self {
            keyboard,
            conversion,
        }
    }

    /// Chinese only when the Pinyin keyboard is active and converting.
    pub fn mode(self) -> InputMode {
        match (self.keyboard, self.conversion) {
            (KeyboardKind::Pinyin, Conversion::Chinese) => InputMode::Chinese,
            _ => InputMode::English,
        }
    }
}

/// One visible IME candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 1-based display position on the current page.
    pub index: usize,
    pub text: String,
}

/// Enabled state of the candidate page buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageState {
    pub has_previous: bool,
    pub has_next: bool,
}
