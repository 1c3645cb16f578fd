//! Reads the input mode from the taskbar input indicator.

use crate::accessibility::{find_at_depth, find_child, find_descendant, is_named, name_contains, subtree_text, UiNode, UiTree};
use crate::config::{OsVariant, OsVariantSetting, UiNames};
use crate::error::{Error, Result};
use crate::mode::ModeProvider;
use crate::types::{Conversion, ImeStatus, KeyboardKind};
use tracing::{debug, trace};

/// Levels below the taskbar searched for the nested indicator.
const NESTED_SEARCH_DEPTH: usize = 8;
/// Levels below the nested indicator whose names carry the mode glyph.
const NESTED_TEXT_DEPTH: usize = 3;
/// First Windows build with the nested taskbar layout.
const NESTED_MIN_BUILD: u32 = 22000;

impl OsVariantSetting {
    pub fn resolve(self) -> OsVariant {
        match self {
            OsVariantSetting::Flat => OsVariant::Flat,
            OsVariantSetting::Nested => OsVariant::Nested,
            OsVariantSetting::Auto => detect_os_variant(),
        }
    }
}

pub fn detect_os_variant() -> OsVariant {
    match windows_build_number() {
        Some(build) if build >= NESTED_MIN_BUILD => OsVariant::Nested,
        Some(build) => {
            debug!("Windows build {} uses the flat indicator", build);
            OsVariant::Flat
        }
        None => OsVariant::Flat,
    }
}

#[cfg(windows)]
fn windows_build_number() -> Option<u32> {
    use windows::core::w;
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ};

    let mut buf = [0u16; 32];
    let mut size = (buf.len() * std::mem::size_of::<u16>()) as u32;
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            w!("SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion"),
            w!("CurrentBuildNumber"),
            RRF_RT_REG_SZ,
            None,
            Some(buf.as_mut_ptr() as *mut std::ffi::c_void),
            Some(&mut size as *mut u32),
        )
    };
    if status != ERROR_SUCCESS {
        return None;
    }
    let len = (size as usize / 2).min(buf.len());
    String::from_utf16_lossy(&buf[..len])
        .trim_end_matches('\0')
        .parse()
        .ok()
}

#[cfg(not(windows))]
fn windows_build_number() -> Option<u32> {
    None
}

/// Interprets indicator text such as `托盘输入指示器 中文模式` or a bare `英` glyph.
pub fn parse_indicator_text(text: &str) -> Option<ImeStatus> {
    if text.contains("英语(") || text.contains("英语（") {
        return Some(ImeStatus::new(KeyboardKind::Other, Conversion::English));
    }

    let conversion = if text.contains("英语模式") {
        Conversion::English
    } else if text.contains("中文模式") {
        Conversion::Chinese
    } else if text.split_whitespace().any(|w| w == "英") {
        Conversion::English
    } else if text.split_whitespace().any(|w| w == "中") {
        Conversion::Chinese
    } else {
        return None;
    };
    Some(ImeStatus::new(KeyboardKind::Pinyin, conversion))
}

/// [`ModeProvider`] backed by the taskbar input indicator.
pub struct IndicatorModeProvider<T: UiTree> {
    tree: T,
    variant: OsVariant,
    names: UiNames,
    indicator: Option<T::Node>,
}

impl<T: UiTree> IndicatorModeProvider<T> {
    pub fn new(tree: T, variant: OsVariant, names: UiNames) -> Self {
        Self {
            tree,
            variant,
            names,
            indicator: None,
        }
    }

    pub fn variant(&self) -> OsVariant {
        self.variant
    }

    fn locate(&mut self) -> Result<T::Node> {
        if let Some(node) = &self.indicator {
            return Ok(node.clone());
        }

        let root = self.tree.root()?;
        let taskbar = find_child(&root, |n| is_named(n, None, &self.names.taskbar))?
            .ok_or(Error::TaskbarNotFound)?;

        let found = match self.variant {
            OsVariant::Flat => find_at_depth(&taskbar, 3, |n| {
                name_contains(n, &self.names.tray_indicator)
            })?,
            OsVariant::Nested => find_descendant(&taskbar, NESTED_SEARCH_DEPTH, |n| {
                name_contains(n, &self.names.nested_indicator)
            })?,
        };
        let node = found.ok_or(Error::IndicatorNotFound)?;
        debug!("Located {:?} input indicator", self.variant);
        self.indicator = Some(node.clone());
        Ok(node)
    }

    fn read(&self, node: &T::Node) -> Result<String> {
        let name = node.name()?;
        Ok(match self.variant {
            OsVariant::Flat => name,
            OsVariant::Nested => subtree_text(node, NESTED_TEXT_DEPTH),
        })
    }
}

impl<T: UiTree> ModeProvider for IndicatorModeProvider<T> {
    fn status(&mut self) -> Result<ImeStatus> {
        // A cached indicator may have been recreated; rediscover it once.
        let had_cache = self.indicator.is_some();
        let node = self.locate()?;
        let parsed = self.read(&node).map(|text| {
            trace!("indicator text: {:?}", text);
            parse_indicator_text(&text)
        });
        match parsed {
            Ok(Some(status)) => Ok(status),
            _ if had_cache => {
                self.indicator = None;
                let node = self.locate()?;
                let text = self.read(&node)?;
                parse_indicator_text(&text).ok_or_else(|| {
                    self.indicator = None;
                    Error::IndicatorNotFound
                })
            }
            Ok(None) => {
                self.indicator = None;
                Err(Error::IndicatorNotFound)
            }
            Err(e) => {
                self.indicator = None;
                Err(e)
            }
        }
    }
}
