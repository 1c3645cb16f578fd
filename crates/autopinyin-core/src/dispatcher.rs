use crate::candidate::{CandidateResolver, ResolveOutcome};
use crate::classifier::{chunk_chars, classify};
use crate::config::{Config, ExhaustionPolicy, NewlineKeys, TextInjection};
use crate::error::Result;
use crate::keys::{KeyInjector, ENTER, SHIFT_ENTER};
use crate::mode::ModeController;
use crate::punctuation::translate;
use crate::types::{ClassifiedRun, InputMode, RunKind};
use crate::wait::pause;
use tracing::{debug, info};

/// Summary of one [`AutoPinyin::auto_input`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputReport {
    pub runs: usize,
    /// Input characters delivered to the focused window.
    pub committed_chars: usize,
    /// Han text dropped under [`ExhaustionPolicy::Skip`], one entry per chunk.
    pub skipped: Vec<String>,
}

/// Types mixed Chinese/ASCII text into the focused window through the IME.
pub struct AutoPinyin {
    config: Config,
    keys: Box<dyn KeyInjector>,
    modes: ModeController,
    resolver: CandidateResolver,
}

impl AutoPinyin {
    pub fn new(
        config: Config,
        keys: Box<dyn KeyInjector>,
        modes: ModeController,
        resolver: CandidateResolver,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            keys,
            modes,
            resolver,
        })
    }

    /// Wires the Windows backends selected by `config`.
    #[cfg(windows)]
    pub fn for_desktop(config: Config) -> Result<Self> {
        use crate::config::{ModeSource, ModeSwitchMethod};
        use crate::ime::{ImmModeProvider, SystemMessageSwitcher};
        use crate::indicator::IndicatorModeProvider;
        use crate::keyboard::SendInputInjector;
        use crate::mode::{FallbackSwitcher, HotkeySwitcher, ModeProvider, ModeSwitcher};
        use crate::panel::CandidatePanel;
        use crate::romanizer::PinyinRomanizer;
        use crate::uia::UiaTree;

        config.validate()?;
        let tree = UiaTree::new()?;

        let provider: Box<dyn ModeProvider> = match config.mode_source {
            ModeSource::Indicator => {
                let variant = config.os_variant.resolve();
                info!("Reading input mode from the {:?} taskbar indicator", variant);
                Box::new(IndicatorModeProvider::new(
                    tree.clone(),
                    variant,
                    config.ui.clone(),
                ))
            }
            ModeSource::Imm => Box::new(ImmModeProvider::new()),
        };
        let switcher: Box<dyn ModeSwitcher> = match config.mode_switch {
            ModeSwitchMethod::SystemMessage => Box::new(FallbackSwitcher::new(
                SystemMessageSwitcher::new(),
                HotkeySwitcher::new(SendInputInjector::new()),
            )),
            ModeSwitchMethod::Hotkey => Box::new(HotkeySwitcher::new(SendInputInjector::new())),
        };

        let modes = ModeController::new(provider, switcher, &config);
        let resolver = CandidateResolver::new(
            Box::new(CandidatePanel::new(tree, config.ui.clone())),
            Box::new(PinyinRomanizer),
            &config,
        );
        Self::new(config, Box::new(SendInputInjector::new()), modes, resolver)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_exhaustion_policy(&mut self, policy: ExhaustionPolicy) {
        self.config.on_exhausted = policy;
        self.resolver.set_policy(policy);
    }

    pub fn current_mode(&mut self) -> Result<InputMode> {
        self.modes.current_mode()
    }

    pub fn switch_to_chinese(&mut self) -> Result<()> {
        self.modes.ensure_mode(InputMode::Chinese)
    }

    pub fn switch_to_english(&mut self) -> Result<()> {
        self.modes.ensure_mode(InputMode::English)
    }

    /// Commits up to ten Han characters through the candidate window.
    pub fn auto_pinyin_input(&mut self, chars: &str) -> Result<ResolveOutcome> {
        self.resolver
            .resolve(chars, &mut self.modes, self.keys.as_mut())
    }

    /// Types `text`, run by run. The first failure stops the call; text
    /// already delivered stays in the target window.
    pub fn auto_input(&mut self, text: &str) -> Result<InputReport> {
        pause(self.config.start_delay());

        let text = text.replace("\r\n", "\n");
        let runs = classify(&text);
        info!("Typing {} characters in {} runs", text.chars().count(), runs.len());

        let mut report = InputReport {
            runs: runs.len(),
            ..InputReport::default()
        };
        for run in &runs {
            self.dispatch(run, &mut report)?;
        }
        Ok(report)
    }

    fn dispatch(&mut self, run: &ClassifiedRun, report: &mut InputReport) -> Result<()> {
        debug!("{:?} run {:?}", run.kind, run.text);
        match run.kind {
            RunKind::Ideograph => {
                self.modes.ensure_mode(InputMode::Chinese)?;
                for chunk in chunk_chars(&run.text, self.config.split_length) {
                    let outcome = self.auto_pinyin_input(chunk)?;
                    report.committed_chars += outcome.committed.chars().count();
                    if !outcome.skipped.is_empty() {
                        report.skipped.push(outcome.skipped);
                    }
                }
                return Ok(());
            }
            RunKind::ChinesePunctuation => {
                self.modes.ensure_mode(InputMode::Chinese)?;
                pause(self.config.ui_respond_time());
                self.keys
                    .type_text(&translate(&run.text), self.config.type_interval())?;
            }
            RunKind::Newline => {
                let stroke = match self.config.newline {
                    NewlineKeys::ShiftEnter => SHIFT_ENTER,
                    NewlineKeys::Enter => ENTER,
                };
                for _ in run.text.chars() {
                    self.keys.tap(stroke)?;
                }
            }
            RunKind::Ascii => self.inject_literal(&run.text, self.config.ascii_input)?,
            RunKind::Other => self.inject_literal(&run.text, self.config.other_input)?,
        }
        report.committed_chars += run.text.chars().count();
        Ok(())
    }

    fn inject_literal(&mut self, text: &str, method: TextInjection) -> Result<()> {
        match method {
            TextInjection::Typewrite => {
                self.modes.ensure_mode(InputMode::English)?;
                pause(self.config.ui_respond_time());
                self.keys.type_text(text, self.config.type_interval())
            }
            TextInjection::Paste => self.keys.paste(text),
        }
    }
}
