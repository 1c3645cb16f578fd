use crate::config::{Config, ExhaustionPolicy, MAX_TARGET_CHARS};
use crate::error::{Error, Result};
use crate::keys::{KeyInjector, ESCAPE, NEXT_PAGE};
use crate::mode::ModeController;
use crate::romanizer::Romanizer;
use crate::types::{Candidate, InputMode, KeyStroke, PageState, RunKind};
use crate::wait::{pause, poll_until, Backoff};
use std::time::Duration;
use tracing::{debug, warn};

/// Re-acquisitions allowed per read when the candidate list goes stale.
const STALE_RETRIES: usize = 2;

/// Live view of the IME candidate window.
///
/// Implementations cache the UI handles found by `acquire` until
/// `invalidate` is called or the handles stop answering.
pub trait CandidateListProvider {
    /// Locates the candidate UI, failing with `CandidatePanelNotFound`.
    fn acquire(&mut self) -> Result<()>;

    /// Candidates on the visible page, in display order.
    fn candidates(&mut self) -> Result<Vec<Candidate>>;

    fn page_state(&mut self) -> Result<PageState>;

    fn invalidate(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolveOutcome {
    pub committed: String,
    /// Characters dropped under [`ExhaustionPolicy::Skip`].
    pub skipped: String,
    pub page_turns: usize,
}

/// First selectable candidate whose text is a prefix of `remaining`.
///
/// Greedy: no alternative segmentations are considered.
pub fn pick<'a>(page: &'a [Candidate], remaining: &str) -> Option<&'a Candidate> {
    page.iter().find(|c| {
        !c.text.is_empty() && KeyStroke::digit(c.index).is_some() && remaining.starts_with(&c.text)
    })
}

fn validate_target(target: &str) -> Result<()> {
    let count = target.chars().count();
    if count == 0 {
        return Err(Error::InvalidTarget("empty target".into()));
    }
    if count > MAX_TARGET_CHARS {
        return Err(Error::InvalidTarget(format!(
            "{} characters exceeds the limit of {}",
            count, MAX_TARGET_CHARS
        )));
    }
    if let Some(c) = target.chars().find(|&c| RunKind::of(c) != RunKind::Ideograph) {
        return Err(Error::InvalidTarget(format!("{:?} is not a Han ideograph", c)));
    }
    Ok(())
}

/// Types pinyin and picks IME candidates until the target is committed.
pub struct CandidateResolver {
    provider: Box<dyn CandidateListProvider>,
    romanizer: Box<dyn Romanizer>,
    ui_respond_time: Duration,
    type_interval: Duration,
    settle_timeout: Duration,
    backoff: Backoff,
    max_page_turns: usize,
    policy: ExhaustionPolicy,
}

impl CandidateResolver {
    pub fn new(
        provider: Box<dyn CandidateListProvider>,
        romanizer: Box<dyn Romanizer>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            romanizer,
            ui_respond_time: config.ui_respond_time(),
            type_interval: config.type_interval(),
            settle_timeout: config.settle_timeout(),
            backoff: config.backoff(),
            max_page_turns: config.max_page_turns,
            policy: config.on_exhausted,
        }
    }

    pub fn policy(&self) -> ExhaustionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ExhaustionPolicy) {
        self.policy = policy;
    }

    pub fn resolve(
        &mut self,
        target: &str,
        modes: &mut ModeController,
        keys: &mut dyn KeyInjector,
    ) -> Result<ResolveOutcome> {
        validate_target(target)?;

        modes.ensure_mode(InputMode::Chinese)?;
        pause(self.ui_respond_time);

        let syllables = self.romanizer.romanize(target);
        debug!("Typing {:?} for {:?}", syllables, target);
        keys.type_text(&syllables, self.type_interval)?;
        pause(self.ui_respond_time);

        let result = self
            .acquire_panel()
            .and_then(|_| self.select_all(target, keys));
        if let Err(e) = &result {
            if !matches!(e, Error::CandidateMatchExhausted { .. }) {
                self.provider.invalidate();
                // Drop whatever is still composing before reporting.
                if let Err(esc) = keys.tap(ESCAPE) {
                    warn!("Escape after {} failed: {}", e, esc);
                }
            }
        }
        result
    }

    fn acquire_panel(&mut self) -> Result<()> {
        let provider = &mut self.provider;
        let found = poll_until(self.backoff, self.settle_timeout, || match provider.acquire() {
            Ok(()) => Ok(Some(())),
            Err(Error::CandidatePanelNotFound) => Ok(None),
            Err(e) => Err(e),
        })?;
        found.ok_or(Error::CandidatePanelNotFound)
    }

    /// Runs `read`, re-acquiring the list when its handles went stale.
    fn read_live<T>(
        &mut self,
        mut read: impl FnMut(&mut dyn CandidateListProvider) -> Result<T>,
    ) -> Result<T> {
        let mut retries = 0;
        loop {
            match read(self.provider.as_mut()) {
                Ok(value) => return Ok(value),
                Err(e @ (Error::Accessibility(_) | Error::CandidatePanelNotFound))
                    if retries < STALE_RETRIES =>
                {
                    retries += 1;
                    debug!("Candidate list went stale ({}), re-acquiring", e);
                    self.provider.invalidate();
                    self.acquire_panel()?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn candidates(&mut self) -> Result<Vec<Candidate>> {
        self.read_live(|p| p.candidates())
    }

    fn page_state(&mut self) -> Result<PageState> {
        self.read_live(|p| p.page_state())
    }

    fn select_all(&mut self, target: &str, keys: &mut dyn KeyInjector) -> Result<ResolveOutcome> {
        let mut remaining = target;
        let mut page_requested = false;
        let mut page_turns = 0;
        let mut total_turns = 0;

        while !remaining.is_empty() {
            if !page_requested {
                self.wait_first_page()?;
            }

            let page = self.candidates()?;
            debug!(
                "Candidates: {:?}",
                page.iter().map(|c| c.text.as_str()).collect::<Vec<_>>()
            );

            if let Some(hit) = pick(&page, remaining) {
                if let Some(stroke) = KeyStroke::digit(hit.index) {
                    keys.tap(stroke)?;
                }
                debug!("Selected #{} {:?}", hit.index, hit.text);
                remaining = &remaining[hit.text.len()..];
                page_requested = false;
                page_turns = 0;
                pause(self.ui_respond_time);
                if !remaining.is_empty() {
                    self.wait_for_repaint(&page)?;
                }
                continue;
            }

            let pages = self.page_state()?;
            if pages.has_next && page_turns < self.max_page_turns {
                keys.tap(NEXT_PAGE)?;
                page_turns += 1;
                total_turns += 1;
                page_requested = true;
                debug!("No match for {:?}, turning to page {}", remaining, page_turns + 1);
                pause(self.ui_respond_time);
                self.wait_for_repaint(&page)?;
                continue;
            }

            return self.exhausted(target, remaining, page_turns, total_turns, keys);
        }

        Ok(ResolveOutcome {
            committed: target.to_string(),
            skipped: String::new(),
            page_turns: total_turns,
        })
    }

    fn exhausted(
        &mut self,
        target: &str,
        remaining: &str,
        page_turns: usize,
        total_turns: usize,
        keys: &mut dyn KeyInjector,
    ) -> Result<ResolveOutcome> {
        // Drop the pending composition so later input starts clean.
        keys.tap(ESCAPE)?;
        pause(self.ui_respond_time);

        match self.policy {
            ExhaustionPolicy::Fail => Err(Error::CandidateMatchExhausted {
                remaining: remaining.to_string(),
                page_turns,
            }),
            ExhaustionPolicy::Skip => {
                warn!(
                    "No candidate for {:?} after {} page turns, skipping",
                    remaining, page_turns
                );
                Ok(ResolveOutcome {
                    committed: target[..target.len() - remaining.len()].to_string(),
                    skipped: remaining.to_string(),
                    page_turns: total_turns,
                })
            }
        }
    }

    /// Waits for the IME to settle on its first page after typing.
    fn wait_first_page(&mut self) -> Result<()> {
        let (backoff, timeout) = (self.backoff, self.settle_timeout);
        let settled = poll_until(backoff, timeout, || {
            Ok((!self.page_state()?.has_previous).then_some(()))
        })?;
        if settled.is_none() {
            warn!("Candidate list still past page 1 after {:?}", self.settle_timeout);
        }
        Ok(())
    }

    /// Waits until the visible candidates differ from `before`.
    fn wait_for_repaint(&mut self, before: &[Candidate]) -> Result<()> {
        let (backoff, timeout) = (self.backoff, self.settle_timeout);
        let changed = poll_until(backoff, timeout, || {
            Ok((self.candidates()? != before).then_some(()))
        })?;
        if changed.is_none() {
            debug!("Candidate list unchanged after {:?}", self.settle_timeout);
        }
        Ok(())
    }
}
