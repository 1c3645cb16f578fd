use crate::config::Config;
use crate::error::{Error, Result};
use crate::keys::{KeyInjector, SHIFT_TAP, WIN_SPACE};
use crate::types::{Conversion, ImeStatus, InputMode, KeyboardKind};
use crate::wait::{poll_until, Backoff};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Source of the current IME state.
pub trait ModeProvider {
    fn status(&mut self) -> Result<ImeStatus>;

    fn current_mode(&mut self) -> Result<InputMode> {
        Ok(self.status()?.mode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeAction {
    /// Make the Pinyin keyboard the active input language.
    SwitchKeyboard,
    /// Flip the Pinyin IME between Chinese and English conversion.
    ToggleConversion,
}

/// Issues mode-change requests.
pub trait ModeSwitcher {
    /// Returns `Ok(false)` when the request was not accepted.
    fn perform(&mut self, action: ModeAction) -> Result<bool>;

    /// Called when an accepted request left the mode unchanged.
    fn no_effect(&mut self, _action: ModeAction) {}
}

/// Win+Space cycles keyboards, a bare Shift tap toggles conversion.
pub struct HotkeySwitcher<K: KeyInjector> {
    keys: K,
}

impl<K: KeyInjector> HotkeySwitcher<K> {
    pub fn new(keys: K) -> Self {
        Self { keys }
    }
}

impl<K: KeyInjector> ModeSwitcher for HotkeySwitcher<K> {
    fn perform(&mut self, action: ModeAction) -> Result<bool> {
        let stroke = match action {
            ModeAction::SwitchKeyboard => WIN_SPACE,
            ModeAction::ToggleConversion => SHIFT_TAP,
        };
        self.keys.tap(stroke)?;
        Ok(true)
    }
}

/// Uses `primary` until it fails, is refused, or has no effect, then `fallback`.
pub struct FallbackSwitcher<P: ModeSwitcher, F: ModeSwitcher> {
    primary: P,
    fallback: F,
    demoted: Vec<ModeAction>,
}

impl<P: ModeSwitcher, F: ModeSwitcher> FallbackSwitcher<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            demoted: Vec::new(),
        }
    }
}

impl<P: ModeSwitcher, F: ModeSwitcher> ModeSwitcher for FallbackSwitcher<P, F> {
    fn perform(&mut self, action: ModeAction) -> Result<bool> {
        if !self.demoted.contains(&action) {
            match self.primary.perform(action) {
                Ok(true) => return Ok(true),
                Ok(false) => debug!("{:?} refused by primary switcher", action),
                Err(e) => warn!("{:?} failed on primary switcher: {}", action, e),
            }
            self.demoted.push(action);
        }
        self.fallback.perform(action)
    }

    fn no_effect(&mut self, action: ModeAction) {
        if self.demoted.contains(&action) {
            self.fallback.no_effect(action);
        } else {
            debug!("{:?} had no effect, demoting primary switcher", action);
            self.demoted.push(action);
        }
    }
}

/// Brings the OS input mode to a requested value.
pub struct ModeController {
    provider: Box<dyn ModeProvider>,
    switcher: Box<dyn ModeSwitcher>,
    timeout: Duration,
    retry_after: Duration,
    backoff: Backoff,
}

impl ModeController {
    pub fn new(
        provider: Box<dyn ModeProvider>,
        switcher: Box<dyn ModeSwitcher>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            switcher,
            timeout: config.mode_switch_timeout(),
            retry_after: config.mode_retry_after(),
            backoff: config.backoff(),
        }
    }

    pub fn current_mode(&mut self) -> Result<InputMode> {
        self.provider.current_mode()
    }

    /// No-op when already in `target`; otherwise switches and waits for the OS
    /// to report `target`, failing with `ModeSwitchTimeout`.
    pub fn ensure_mode(&mut self, target: InputMode) -> Result<()> {
        let status = self.provider.status()?;
        if status.mode() == target {
            return Ok(());
        }
        info!("Switching input mode {:?} -> {:?}", status.mode(), target);

        let started = Instant::now();
        let mut status = status;
        if status.keyboard != KeyboardKind::Pinyin {
            status = self.drive(ModeAction::SwitchKeyboard, target, started, |s| {
                s.keyboard == KeyboardKind::Pinyin
            })?;
        }

        let wanted = match target {
            InputMode::Chinese => Conversion::Chinese,
            InputMode::English => Conversion::English,
        };
        if status.conversion != wanted {
            self.drive(ModeAction::ToggleConversion, target, started, |s| {
                s.keyboard == KeyboardKind::Pinyin && s.conversion == wanted
            })?;
        }

        debug!("Input mode is {:?} after {:?}", target, started.elapsed());
        Ok(())
    }

    fn drive(
        &mut self,
        action: ModeAction,
        target: InputMode,
        started: Instant,
        reached: impl Fn(&ImeStatus) -> bool,
    ) -> Result<ImeStatus> {
        let deadline = started + self.timeout;
        loop {
            if !self.switcher.perform(action)? {
                debug!("{:?} was not accepted", action);
            }

            let now = Instant::now();
            let window = self.retry_after.min(deadline.saturating_duration_since(now));
            let provider = &mut self.provider;
            let settled = poll_until(self.backoff, window, || {
                let s = provider.status()?;
                Ok(reached(&s).then_some(s))
            })?;
            if let Some(status) = settled {
                return Ok(status);
            }

            if Instant::now() >= deadline {
                return Err(Error::ModeSwitchTimeout {
                    target,
                    waited: started.elapsed(),
                });
            }
            self.switcher.no_effect(action);
            debug!("{:?} had no visible effect, retrying", action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDesktop;

    fn status(keyboard: KeyboardKind, conversion: Conversion) -> ImeStatus {
        ImeStatus::new(keyboard, conversion)
    }

    fn fast_config() -> Config {
        Config {
            mode_switch_timeout_ms: 50,
            mode_retry_after_ms: 10,
            poll_initial_ms: 1,
            poll_max_ms: 2,
            ..Config::default()
        }
    }

    fn controller(desktop: &ScriptedDesktop) -> ModeController {
        ModeController::new(
            Box::new(desktop.mode_provider()),
            Box::new(desktop.switcher()),
            &fast_config(),
        )
    }

    #[test]
    fn test_already_chinese_is_noop() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Pinyin, Conversion::Chinese));
        let mut modes = controller(&desktop);
        modes.ensure_mode(InputMode::Chinese).expect("ensure");
        assert!(desktop.mode_actions().is_empty());
    }

    #[test]
    fn test_english_to_chinese_is_one_toggle() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Pinyin, Conversion::English));
        let mut modes = controller(&desktop);
        modes.ensure_mode(InputMode::Chinese).expect("ensure");
        assert_eq!(desktop.mode_actions(), vec![ModeAction::ToggleConversion]);
        assert_eq!(modes.current_mode().unwrap(), InputMode::Chinese);
    }

    #[test]
    fn test_other_keyboard_switches_then_toggles() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Other, Conversion::English));
        let mut modes = controller(&desktop);
        modes.ensure_mode(InputMode::Chinese).expect("ensure");
        assert_eq!(
            desktop.mode_actions(),
            vec![ModeAction::SwitchKeyboard, ModeAction::ToggleConversion]
        );
    }

    #[test]
    fn test_other_keyboard_already_counts_as_english() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Other, Conversion::Chinese));
        let mut modes = controller(&desktop);
        modes.ensure_mode(InputMode::English).expect("ensure");
        assert!(desktop.mode_actions().is_empty());
    }

    #[test]
    fn test_lagging_switch_converges_without_retry() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Pinyin, Conversion::Chinese));
        desktop.set_mode_lag(3);
        let mut modes = ModeController::new(
            Box::new(desktop.mode_provider()),
            Box::new(desktop.switcher()),
            &Config {
                mode_retry_after_ms: 1000,
                ..fast_config()
            },
        );
        modes.ensure_mode(InputMode::English).expect("ensure");
        assert_eq!(desktop.mode_actions(), vec![ModeAction::ToggleConversion]);
    }

    #[test]
    fn test_stuck_mode_times_out() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Pinyin, Conversion::English));
        desktop.set_mode_frozen(true);
        let mut modes = controller(&desktop);
        let err = modes.ensure_mode(InputMode::Chinese).unwrap_err();
        assert!(matches!(
            err,
            Error::ModeSwitchTimeout {
                target: InputMode::Chinese,
                ..
            }
        ));
        // The toggle was re-issued while waiting.
        assert!(desktop.mode_actions().len() > 1);
    }

    struct Refusing(usize);

    impl ModeSwitcher for Refusing {
        fn perform(&mut self, _action: ModeAction) -> Result<bool> {
            self.0 += 1;
            Ok(false)
        }
    }

    #[test]
    fn test_fallback_switcher_uses_fallback_after_refusal() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Pinyin, Conversion::English));
        let mut switcher = FallbackSwitcher::new(Refusing(0), desktop.switcher());
        assert!(switcher.perform(ModeAction::ToggleConversion).unwrap());
        assert!(switcher.perform(ModeAction::ToggleConversion).unwrap());
        // Once demoted, the primary is not asked again.
        assert_eq!(switcher.primary.0, 1);
        assert_eq!(desktop.mode_actions().len(), 2);
    }

    #[test]
    fn test_fallback_switcher_demotes_on_no_effect() {
        let desktop = ScriptedDesktop::new(status(KeyboardKind::Pinyin, Conversion::English));
        let mut switcher = FallbackSwitcher::new(desktop.switcher(), HotkeySwitcher::new(desktop.injector()));
        switcher.perform(ModeAction::SwitchKeyboard).unwrap();
        switcher.no_effect(ModeAction::SwitchKeyboard);
        switcher.perform(ModeAction::SwitchKeyboard).unwrap();
        assert_eq!(desktop.mode_actions(), vec![ModeAction::SwitchKeyboard]);
        assert_eq!(desktop.taps(), vec![WIN_SPACE]);
    }
}
