use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on Han characters handed to the candidate engine at once.
pub const MAX_TARGET_CHARS: usize = 10;

/// What to do when no candidate page can place the remaining characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    #[default]
    Fail,
    /// Drop the pending composition and carry on with the next chunk.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewlineKeys {
    #[default]
    ShiftEnter,
    Enter,
}

/// How literal (non-IME) text reaches the target window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInjection {
    /// Switch to English mode and type the text key by key.
    Typewrite,
    /// Put the text on the clipboard and press Ctrl+V.
    Paste,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSwitchMethod {
    /// WM_INPUTLANGCHANGEREQUEST / IMC_SETCONVERSIONMODE, hotkeys as fallback.
    #[default]
    SystemMessage,
    /// Win+Space and Shift only.
    Hotkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSource {
    /// Read the taskbar input indicator.
    #[default]
    Indicator,
    /// Ask the foreground window's IME directly.
    Imm,
}

/// Taskbar layout generation the indicator lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsVariant {
    /// Windows 10: the indicator is a flat element three levels under the taskbar.
    Flat,
    /// Windows 11: the mode glyph sits on a nested child of the indicator.
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsVariantSetting {
    #[default]
    Auto,
    Flat,
    Nested,
}

/// Element names used by the accessibility lookups (Chinese-locale Windows).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiNames {
    pub taskbar: String,
    pub tray_indicator: String,
    pub nested_indicator: String,
    pub input_experience: String,
    pub candidate_menu: String,
    pub candidate_list: String,
    pub previous_page: String,
    pub next_page: String,
}

impl Default for UiNames {
    fn default() -> Self {
        Self {
            taskbar: "任务栏".to_string(),
            tray_indicator: "托盘输入指示器".to_string(),
            nested_indicator: "输入指示器".to_string(),
            input_experience: "Windows 输入体验".to_string(),
            candidate_menu: "Microsoft 候选项 UI".to_string(),
            candidate_list: "候选项面板".to_string(),
            previous_page: "上一页".to_string(),
            next_page: "下一页".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_ui_respond_time_ms")]
    pub ui_respond_time_ms: u64,
    #[serde(default = "default_type_interval_ms")]
    pub type_interval_ms: u64,
    #[serde(default = "default_split_length")]
    pub split_length: usize,
    #[serde(default)]
    pub start_delay_ms: u64,

    #[serde(default = "default_mode_switch_timeout_ms")]
    pub mode_switch_timeout_ms: u64,
    #[serde(default = "default_mode_retry_after_ms")]
    pub mode_retry_after_ms: u64,
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_poll_initial_ms")]
    pub poll_initial_ms: u64,
    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,

    #[serde(default = "default_max_page_turns")]
    pub max_page_turns: usize,
    #[serde(default)]
    pub on_exhausted: ExhaustionPolicy,

    #[serde(default)]
    pub newline: NewlineKeys,
    #[serde(default = "default_ascii_input")]
    pub ascii_input: TextInjection,
    #[serde(default = "default_other_input")]
    pub other_input: TextInjection,

    #[serde(default)]
    pub mode_switch: ModeSwitchMethod,
    #[serde(default)]
    pub mode_source: ModeSource,
    #[serde(default)]
    pub os_variant: OsVariantSetting,

    #[serde(default)]
    pub ui: UiNames,
}

fn default_ui_respond_time_ms() -> u64 {
    80
}

fn default_type_interval_ms() -> u64 {
    10
}

fn default_split_length() -> usize {
    5
}

fn default_mode_switch_timeout_ms() -> u64 {
    3000
}

fn default_mode_retry_after_ms() -> u64 {
    500
}

fn default_settle_timeout_ms() -> u64 {
    1000
}

fn default_poll_initial_ms() -> u64 {
    1
}

fn default_poll_max_ms() -> u64 {
    32
}

fn default_max_page_turns() -> usize {
    20
}

fn default_ascii_input() -> TextInjection {
    TextInjection::Typewrite
}

fn default_other_input() -> TextInjection {
    TextInjection::Paste
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ui_respond_time_ms: default_ui_respond_time_ms(),
            type_interval_ms: default_type_interval_ms(),
            split_length: default_split_length(),
            start_delay_ms: 0,
            mode_switch_timeout_ms: default_mode_switch_timeout_ms(),
            mode_retry_after_ms: default_mode_retry_after_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
            poll_initial_ms: default_poll_initial_ms(),
            poll_max_ms: default_poll_max_ms(),
            max_page_turns: default_max_page_turns(),
            on_exhausted: ExhaustionPolicy::default(),
            newline: NewlineKeys::default(),
            ascii_input: default_ascii_input(),
            other_input: default_other_input(),
            mode_switch: ModeSwitchMethod::default(),
            mode_source: ModeSource::default(),
            os_variant: OsVariantSetting::default(),
            ui: UiNames::default(),
        }
    }
}

impl Config {
    /// Reads a JSON config file; missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.split_length == 0 || self.split_length > MAX_TARGET_CHARS {
            return Err(Error::Config(format!(
                "split_length must be within 1..={}, got {}",
                MAX_TARGET_CHARS, self.split_length
            )));
        }
        if self.max_page_turns == 0 {
            return Err(Error::Config("max_page_turns must be positive".into()));
        }
        if self.poll_initial_ms == 0 {
            return Err(Error::Config("poll_initial_ms must be positive".into()));
        }
        if self.poll_initial_ms > self.poll_max_ms {
            return Err(Error::Config(format!(
                "poll_initial_ms ({}) exceeds poll_max_ms ({})",
                self.poll_initial_ms, self.poll_max_ms
            )));
        }
        Ok(())
    }

    pub fn ui_respond_time(&self) -> Duration {
        Duration::from_millis(self.ui_respond_time_ms)
    }

    pub fn type_interval(&self) -> Duration {
        Duration::from_millis(self.type_interval_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn mode_switch_timeout(&self) -> Duration {
        Duration::from_millis(self.mode_switch_timeout_ms)
    }

    pub fn mode_retry_after(&self) -> Duration {
        Duration::from_millis(self.mode_retry_after_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn backoff(&self) -> crate::wait::Backoff {
        crate::wait::Backoff::new(
            Duration::from_millis(self.poll_initial_ms),
            Duration::from_millis(self.poll_max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "split_length": 8, "on_exhausted": "skip" }"#)
                .expect("parse config");
        assert_eq!(config.split_length, 8);
        assert_eq!(config.on_exhausted, ExhaustionPolicy::Skip);
        assert_eq!(config.ui_respond_time_ms, 80);
        assert_eq!(config.max_page_turns, 20);
        assert_eq!(config.other_input, TextInjection::Paste);
        assert_eq!(config.ui.candidate_list, "候选项面板");
    }

    #[test]
    fn test_ui_names_override() {
        let config: Config =
            serde_json::from_str(r#"{ "ui": { "taskbar": "Taskbar" } }"#).expect("parse config");
        assert_eq!(config.ui.taskbar, "Taskbar");
        assert_eq!(config.ui.next_page, "下一页");
    }

    #[test]
    fn test_validate_split_length() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.split_length = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.split_length = MAX_TARGET_CHARS + 1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_backoff_bounds() {
        let config = Config {
            poll_initial_ms: 64,
            poll_max_ms: 8,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let config = Config {
            poll_initial_ms: 0,
            poll_max_ms: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let config = Config {
            poll_initial_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
