//! `SendInput` backed [`KeyInjector`].

use crate::error::{Error, Result};
use crate::keys::KeyInjector;
use crate::types::InputEvent;
use arboard::Clipboard;
use tracing::trace;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY,
    KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, KEYEVENTF_UNICODE, VIRTUAL_KEY,
};

/// Marks events we injected ourselves.
const INJECTED_EXTRA_INFO: usize = 0xFFC3C3C3;

fn key_input(scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: INJECTED_EXTRA_INFO,
            },
        },
    }
}

fn to_inputs(event: &InputEvent, out: &mut Vec<INPUT>) {
    match *event {
        InputEvent::Scancode(sc, ext, up) => {
            let mut flags = KEYEVENTF_SCANCODE;
            if ext {
                flags |= KEYEVENTF_EXTENDEDKEY;
            }
            if up {
                flags |= KEYEVENTF_KEYUP;
            }
            out.push(key_input(sc, flags));
        }
        InputEvent::Unicode(c, up) => {
            let mut flags = KEYEVENTF_UNICODE;
            if up {
                flags |= KEYEVENTF_KEYUP;
            }
            let mut buf = [0; 2];
            for unit in c.encode_utf16(&mut buf) {
                out.push(key_input(*unit, flags));
            }
        }
    }
}

fn clipboard_error(e: arboard::Error) -> Error {
    Error::Injection(format!("clipboard: {}", e))
}

/// Injects into whatever window has keyboard focus.
#[derive(Default)]
pub struct SendInputInjector {
    clipboard: Option<Clipboard>,
}

impl SendInputInjector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyInjector for SendInputInjector {
    fn send(&mut self, events: &[InputEvent]) -> Result<()> {
        let mut inputs = Vec::with_capacity(events.len());
        for event in events {
            to_inputs(event, &mut inputs);
        }
        if inputs.is_empty() {
            return Ok(());
        }

        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        trace!("SendInput {}/{}", sent, inputs.len());
        if sent as usize != inputs.len() {
            return Err(Error::Injection(format!(
                "SendInput accepted {} of {} events",
                sent,
                inputs.len()
            )));
        }
        Ok(())
    }

    fn set_clipboard(&mut self, text: &str) -> Result<()> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new().map_err(clipboard_error)?);
        }
        match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text.to_string()).map_err(clipboard_error),
            None => Ok(()),
        }
    }
}
