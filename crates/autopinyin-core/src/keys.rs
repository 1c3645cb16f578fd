use crate::error::Result;
use crate::types::{InputEvent, KeySpec, KeyStroke, Modifiers, ScKey};
use crate::wait::pause;
use std::time::Duration;

pub const SC_ESCAPE: ScKey = ScKey::new(0x01, false);
pub const SC_ENTER: ScKey = ScKey::new(0x1C, false);
pub const SC_LCTRL: ScKey = ScKey::new(0x1D, false);
pub const SC_LSHIFT: ScKey = ScKey::new(0x2A, false);
pub const SC_LALT: ScKey = ScKey::new(0x38, false);
pub const SC_SPACE: ScKey = ScKey::new(0x39, false);
pub const SC_LWIN: ScKey = ScKey::new(0x5B, true);

pub const ENTER: KeyStroke = KeyStroke::scancode(SC_ENTER, Modifiers::none());
pub const SHIFT_ENTER: KeyStroke = KeyStroke::scancode(SC_ENTER, Modifiers::shift());
pub const ESCAPE: KeyStroke = KeyStroke::scancode(SC_ESCAPE, Modifiers::none());
/// A bare Shift tap flips the Pinyin IME between Chinese and English.
pub const SHIFT_TAP: KeyStroke = KeyStroke::scancode(SC_LSHIFT, Modifiers::none());
/// Cycles the active keyboard layout.
pub const WIN_SPACE: KeyStroke = KeyStroke::scancode(SC_SPACE, Modifiers::win());
pub const CTRL_V: KeyStroke = KeyStroke {
    key: KeySpec::Char('v'),
    mods: Modifiers::ctrl(),
};
/// Microsoft Pinyin page-down key.
pub const NEXT_PAGE: KeyStroke = KeyStroke::char(']');

/// Synthetic keyboard and clipboard access.
pub trait KeyInjector {
    fn send(&mut self, events: &[InputEvent]) -> Result<()>;

    fn set_clipboard(&mut self, text: &str) -> Result<()>;

    fn tap(&mut self, stroke: KeyStroke) -> Result<()> {
        self.send(&stroke_events(&stroke))
    }

    /// Types `text` one character at a time, `interval` apart.
    fn type_text(&mut self, text: &str, interval: Duration) -> Result<()> {
        for (i, c) in text.chars().enumerate() {
            if i > 0 {
                pause(interval);
            }
            self.tap(KeyStroke::char(c))?;
        }
        Ok(())
    }

    fn paste(&mut self, text: &str) -> Result<()> {
        self.set_clipboard(text)?;
        self.tap(CTRL_V)
    }
}

impl<T: KeyInjector + ?Sized> KeyInjector for Box<T> {
    fn send(&mut self, events: &[InputEvent]) -> Result<()> {
        (**self).send(events)
    }

    fn set_clipboard(&mut self, text: &str) -> Result<()> {
        (**self).set_clipboard(text)
    }

    fn tap(&mut self, stroke: KeyStroke) -> Result<()> {
        (**self).tap(stroke)
    }

    fn type_text(&mut self, text: &str, interval: Duration) -> Result<()> {
        (**self).type_text(text, interval)
    }

    fn paste(&mut self, text: &str) -> Result<()> {
        (**self).paste(text)
    }
}

/// Expands a keystroke into down/up events, modifiers wrapped around the key.
pub fn stroke_events(stroke: &KeyStroke) -> Vec<InputEvent> {
    let (key, needs_shift) = match stroke.key {
        KeySpec::Scancode(k) => (Some(k), false),
        KeySpec::Char(c) => match char_to_scancode(c) {
            Some((k, shift)) => (Some(k), shift),
            None => (None, false),
        },
    };

    let Some(key) = key else {
        // Fallback to Unicode injection
        if let KeySpec::Char(c) = stroke.key {
            return vec![InputEvent::Unicode(c, false), InputEvent::Unicode(c, true)];
        }
        return Vec::new();
    };

    let mods = Modifiers {
        shift: stroke.mods.shift || needs_shift,
        ..stroke.mods
    };
    let mut held = Vec::new();
    if mods.ctrl {
        held.push(SC_LCTRL);
    }
    if mods.shift {
        held.push(SC_LSHIFT);
    }
    if mods.alt {
        held.push(SC_LALT);
    }
    if mods.win {
        held.push(SC_LWIN);
    }

    let mut events = Vec::with_capacity(held.len() * 2 + 2);
    for m in &held {
        events.push(InputEvent::Scancode(m.sc, m.ext, false));
    }
    events.push(InputEvent::Scancode(key.sc, key.ext, false));
    events.push(InputEvent::Scancode(key.sc, key.ext, true));
    for m in held.iter().rev() {
        events.push(InputEvent::Scancode(m.sc, m.ext, true));
    }
    events
}

/// US-layout scancode for `c`, and whether Shift is needed.
pub fn char_to_scancode(c: char) -> Option<(ScKey, bool)> {
    let shifted = c.is_ascii_uppercase()
        || matches!(
            c,
            '!' | '@'
                | '#'
                | '$'
                | '%'
                | '^'
                | '&'
                | '*'
                | '('
                | ')'
                | '_'
                | '+'
                | '{'
                | '}'
                | ':'
                | '"'
                | '~'
                | '|'
                | '<'
                | '>'
                | '?'
        );
    let sc = match c.to_ascii_lowercase() {
        'a' => 0x1E,
        'b' => 0x30,
        'c' => 0x2E,
        'd' => 0x20,
        'e' => 0x12,
        'f' => 0x21,
        'g' => 0x22,
        'h' => 0x23,
        'i' => 0x17,
        'j' => 0x24,
        'k' => 0x25,
        'l' => 0x26,
        'm' => 0x32,
        'n' => 0x31,
        'o' => 0x18,
        'p' => 0x19,
        'q' => 0x10,
        'r' => 0x13,
        's' => 0x1F,
        't' => 0x14,
        'u' => 0x16,
        'v' => 0x2F,
        'w' => 0x11,
        'x' => 0x2D,
        'y' => 0x15,
        'z' => 0x2C,
        '1' | '!' => 0x02,
        '2' | '@' => 0x03,
        '3' | '#' => 0x04,
        '4' | '$' => 0x05,
        '5' | '%' => 0x06,
        '6' | '^' => 0x07,
        '7' | '&' => 0x08,
        '8' | '*' => 0x09,
        '9' | '(' => 0x0A,
        '0' | ')' => 0x0B,
        '-' | '_' => 0x0C,
        '=' | '+' => 0x0D,
        '[' | '{' => 0x1A,
        ']' | '}' => 0x1B,
        ';' | ':' => 0x27,
        '\'' | '"' => 0x28,
        '`' | '~' => 0x29,
        '\\' | '|' => 0x2B,
        ',' | '<' => 0x33,
        '.' | '>' => 0x34,
        '/' | '?' => 0x35,
        ' ' => 0x39,
        '\t' => 0x0F,
        '\u{0008}' => 0x0E, // BS
        '\r' => 0x1C,       // Enter
        _ => return None,
    };
    Some((ScKey::new(sc, false), shifted))
}
