//! IME state through the IMM window messages of the foreground window.

use crate::error::{Error, Result};
use crate::mode::{ModeAction, ModeProvider, ModeSwitcher};
use crate::types::{Conversion, ImeStatus, KeyboardKind};
use tracing::{debug, trace};
use windows::core::w;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::Input::Ime::ImmGetDefaultIMEWnd;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetKeyboardLayout, LoadKeyboardLayoutW, KLF_ACTIVATE};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowThreadProcessId, PostMessageW, SendMessageW, WM_IME_CONTROL,
};

const IMC_GETCONVERSIONMODE: usize = 0x0001;
const IMC_SETCONVERSIONMODE: usize = 0x0002;
const IMC_GETOPENSTATUS: usize = 0x0005;
const IMC_SETOPENSTATUS: usize = 0x0006;
const IME_CMODE_NATIVE: isize = 0x0001;
const WM_INPUTLANGCHANGEREQUEST: u32 = 0x0050;
/// zh-CN primary language id.
const LANG_ZH_CN: usize = 0x0804;

fn foreground() -> Result<HWND> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.0 == 0 {
        return Err(Error::Accessibility("no foreground window".into()));
    }
    Ok(hwnd)
}

fn ime_window(hwnd: HWND) -> Option<HWND> {
    let ime = unsafe { ImmGetDefaultIMEWnd(hwnd) };
    (ime.0 != 0).then_some(ime)
}

fn ime_control(ime: HWND, command: usize, value: isize) -> isize {
    unsafe { SendMessageW(ime, WM_IME_CONTROL, WPARAM(command), LPARAM(value)).0 }
}

/// Conversion mode that flips the reported mode. A closed IME reads as
/// English, so opening it must also select native conversion.
fn toggled_conversion(was_open: bool, mode: isize) -> isize {
    if was_open {
        mode ^ IME_CMODE_NATIVE
    } else {
        mode | IME_CMODE_NATIVE
    }
}

/// Keyboard language and conversion mode of the foreground thread.
#[derive(Debug, Default)]
pub struct ImmModeProvider;

impl ImmModeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ModeProvider for ImmModeProvider {
    fn status(&mut self) -> Result<ImeStatus> {
        let hwnd = foreground()?;
        let thread = unsafe { GetWindowThreadProcessId(hwnd, None) };
        let hkl = unsafe { GetKeyboardLayout(thread) };
        let keyboard = if (hkl.0 as usize) & 0xFFFF == LANG_ZH_CN {
            KeyboardKind::Pinyin
        } else {
            KeyboardKind::Other
        };

        let conversion = match ime_window(hwnd) {
            Some(ime) => {
                let open = ime_control(ime, IMC_GETOPENSTATUS, 0) != 0;
                let mode = ime_control(ime, IMC_GETCONVERSIONMODE, 0);
                trace!("IME open: {}, conversion mode: {:#x}", open, mode);
                if open && mode & IME_CMODE_NATIVE != 0 {
                    Conversion::Chinese
                } else {
                    Conversion::English
                }
            }
            None => Conversion::English,
        };
        Ok(ImeStatus::new(keyboard, conversion))
    }
}

/// Switches modes with window messages instead of keystrokes.
#[derive(Debug, Default)]
pub struct SystemMessageSwitcher;

impl SystemMessageSwitcher {
    pub fn new() -> Self {
        Self
    }

    fn request_pinyin_layout(&self, hwnd: HWND) -> Result<bool> {
        let hkl = match unsafe { LoadKeyboardLayoutW(w!("00000804"), KLF_ACTIVATE) } {
            Ok(hkl) => hkl,
            Err(e) => {
                debug!("LoadKeyboardLayoutW failed: {}", e);
                return Ok(false);
            }
        };
        let posted = unsafe {
            PostMessageW(hwnd, WM_INPUTLANGCHANGEREQUEST, WPARAM(0), LPARAM(hkl.0))
        };
        Ok(posted.is_ok())
    }

    fn toggle_conversion(&self, hwnd: HWND) -> Result<bool> {
        let Some(ime) = ime_window(hwnd) else {
            return Ok(false);
        };
        let open = ime_control(ime, IMC_GETOPENSTATUS, 0) != 0;
        if !open {
            ime_control(ime, IMC_SETOPENSTATUS, 1);
        }
        let mode = toggled_conversion(open, ime_control(ime, IMC_GETCONVERSIONMODE, 0));
        debug!("Setting conversion mode {:#x} (IME was open: {})", mode, open);
        Ok(ime_control(ime, IMC_SETCONVERSIONMODE, mode) == 0)
    }
}

impl ModeSwitcher for SystemMessageSwitcher {
    fn perform(&mut self, action: ModeAction) -> Result<bool> {
        let hwnd = foreground()?;
        match action {
            ModeAction::SwitchKeyboard => self.request_pinyin_layout(hwnd),
            ModeAction::ToggleConversion => self.toggle_conversion(hwnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_open_ime() {
        assert_eq!(toggled_conversion(true, 0x0009), 0x0008);
        assert_eq!(toggled_conversion(true, 0x0008), 0x0009);
    }

    #[test]
    fn test_toggle_on_closed_ime_selects_chinese() {
        // Closed with native conversion still set: it reads as English.
        assert_eq!(toggled_conversion(false, 0x0009), 0x0009);
        assert_eq!(toggled_conversion(false, 0x0000), 0x0001);
    }
}
