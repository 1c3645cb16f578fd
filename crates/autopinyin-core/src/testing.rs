//! Scripted stand-ins for the desktop, shared by unit tests, integration tests
//! and benches.
//!
//! [`ScriptedDesktop`] models one foreground window with a Pinyin IME: typed
//! keys are interpreted according to the current [`ImeStatus`], syllables open
//! a composition whose candidate pages come from a script, and committed text
//! accumulates in [`ScriptedDesktop::output`].

use crate::accessibility::{ControlKind, UiNode, UiTree};
use crate::candidate::{CandidateListProvider, CandidateResolver};
use crate::config::Config;
use crate::dispatcher::AutoPinyin;
use crate::error::{Error, Result};
use crate::keys::{KeyInjector, CTRL_V, ENTER, ESCAPE, SHIFT_ENTER, SHIFT_TAP, WIN_SPACE};
use crate::mode::{ModeAction, ModeController, ModeProvider, ModeSwitcher};
use crate::romanizer::PinyinRomanizer;
use crate::types::{
    Candidate, Conversion, ImeStatus, InputEvent, InputMode, KeySpec, KeyStroke, KeyboardKind,
    PageState,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Config with every delay shrunk so scripted runs finish quickly.
pub fn fast_config() -> Config {
    Config {
        ui_respond_time_ms: 0,
        type_interval_ms: 0,
        mode_switch_timeout_ms: 50,
        mode_retry_after_ms: 10,
        settle_timeout_ms: 20,
        poll_initial_ms: 1,
        poll_max_ms: 2,
        ..Config::default()
    }
}

struct NodeData {
    kind: ControlKind,
    name: String,
    enabled: bool,
    children: Vec<FakeNode>,
    broken: bool,
}

/// In-memory accessibility element. Clones share state, so a test can keep a
/// handle and mutate the element after the tree is built.
#[derive(Clone)]
pub struct FakeNode(Arc<Mutex<NodeData>>);

impl FakeNode {
    pub fn new(kind: ControlKind, name: &str) -> Self {
        Self(Arc::new(Mutex::new(NodeData {
            kind,
            name: name.to_string(),
            enabled: true,
            children: Vec::new(),
            broken: false,
        })))
    }

    pub fn with_children(self, children: Vec<FakeNode>) -> Self {
        self.0.lock().children = children;
        self
    }

    pub fn set_name(&self, name: &str) {
        self.0.lock().name = name.to_string();
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.0.lock().enabled = enabled;
    }

    pub fn set_children(&self, children: Vec<FakeNode>) {
        self.0.lock().children = children;
    }

    /// A broken node fails every query, like an element the OS has destroyed.
    pub fn set_broken(&self, broken: bool) {
        self.0.lock().broken = broken;
    }

    fn live(&self) -> Result<parking_lot::MutexGuard<'_, NodeData>> {
        let data = self.0.lock();
        if data.broken {
            return Err(Error::Accessibility("element is no longer available".into()));
        }
        Ok(data)
    }
}

impl UiNode for FakeNode {
    fn name(&self) -> Result<String> {
        Ok(self.live()?.name.clone())
    }

    fn control_kind(&self) -> Result<ControlKind> {
        Ok(self.live()?.kind)
    }

    fn is_enabled(&self) -> Result<bool> {
        Ok(self.live()?.enabled)
    }

    fn children(&self) -> Result<Vec<Self>> {
        Ok(self.live()?.children.clone())
    }
}

#[derive(Clone)]
pub struct FakeTree {
    root: FakeNode,
}

impl FakeTree {
    pub fn new(root: FakeNode) -> Self {
        Self { root }
    }

    pub fn root_node(&self) -> FakeNode {
        self.root.clone()
    }
}

impl UiTree for FakeTree {
    type Node = FakeNode;

    fn root(&self) -> Result<FakeNode> {
        Ok(self.root.clone())
    }
}

/// Everything the scripted keyboard received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injected {
    Typed(String),
    Tap(KeyStroke),
    Clipboard(String),
    Raw(Vec<InputEvent>),
}

struct Composition {
    syllables: String,
    committed: String,
    page: usize,
}

struct DesktopState {
    status: ImeStatus,
    pending: Option<(ImeStatus, usize)>,
    mode_lag: usize,
    mode_frozen: bool,
    mode_actions: Vec<ModeAction>,

    script: HashMap<(String, String), Vec<Vec<String>>>,
    composing: Option<Composition>,
    previous_lag: usize,
    invalidations: usize,
    candidate_reads: usize,
    failing_reads: Option<(usize, usize)>,

    output: String,
    clipboard: String,
    double_quote_open: bool,
    single_quote_open: bool,
    log: Vec<Injected>,
}

impl DesktopState {
    fn read_status(&mut self) -> ImeStatus {
        if let Some((next, left)) = self.pending.take() {
            if left == 0 {
                self.status = next;
            } else {
                self.pending = Some((next, left - 1));
            }
        }
        self.status
    }

    fn change_status(&mut self, f: impl FnOnce(ImeStatus) -> ImeStatus) {
        if self.mode_frozen {
            return;
        }
        let base = self.pending.map(|(s, _)| s).unwrap_or(self.status);
        let next = f(base);
        if self.mode_lag == 0 {
            self.status = next;
            self.pending = None;
        } else {
            self.pending = Some((next, self.mode_lag));
        }
    }

    fn pages(&self) -> Option<&Vec<Vec<String>>> {
        let comp = self.composing.as_ref()?;
        self.script
            .get(&(comp.syllables.clone(), comp.committed.clone()))
    }

    fn visible(&self) -> Option<Vec<Candidate>> {
        let page = self.composing.as_ref()?.page;
        let texts = self.pages()?.get(page)?;
        Some(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Candidate {
                    index: i + 1,
                    text: t.clone(),
                })
                .collect(),
        )
    }

    fn select(&mut self, position: usize) {
        let Some(text) = self
            .visible()
            .and_then(|page| page.into_iter().find(|c| c.index == position))
            .map(|c| c.text)
        else {
            return;
        };
        self.output.push_str(&text);
        if let Some(comp) = self.composing.as_mut() {
            comp.committed.push_str(&text);
            comp.page = 0;
        }
        if self.pages().is_none() {
            self.composing = None;
        }
    }

    fn next_page(&mut self) {
        let count = self.pages().map(|p| p.len()).unwrap_or(0);
        if let Some(comp) = self.composing.as_mut() {
            if comp.page + 1 < count {
                comp.page += 1;
            }
        }
    }

    fn press_char(&mut self, c: char) {
        let chinese = self.status.mode() == InputMode::Chinese;
        if self.composing.is_some() {
            match c {
                '1'..='9' => return self.select(c as usize - '0' as usize),
                ']' => return self.next_page(),
                'a'..='z' if chinese => {
                    if let Some(comp) = self.composing.as_mut() {
                        comp.syllables.push(c);
                    }
                    return;
                }
                _ => {}
            }
        }
        if chinese && c.is_ascii_lowercase() {
            self.composing = Some(Composition {
                syllables: c.to_string(),
                committed: String::new(),
                page: 0,
            });
            return;
        }
        let rendered = if chinese { self.full_width(c) } else { c };
        self.output.push(rendered);
    }

    fn full_width(&mut self, c: char) -> char {
        match c {
            ',' => '，',
            '.' => '。',
            '!' => '！',
            '?' => '？',
            '[' => '【',
            ']' => '】',
            '(' => '（',
            ')' => '）',
            ';' => '；',
            ':' => '：',
            '<' => '《',
            '>' => '》',
            '\\' => '、',
            '"' => {
                self.double_quote_open = !self.double_quote_open;
                if self.double_quote_open {
                    '“'
                } else {
                    '”'
                }
            }
            '\'' => {
                self.single_quote_open = !self.single_quote_open;
                if self.single_quote_open {
                    '‘'
                } else {
                    '’'
                }
            }
            other => other,
        }
    }

    fn press(&mut self, stroke: KeyStroke) {
        self.log.push(Injected::Tap(stroke));
        if stroke == ESCAPE {
            self.composing = None;
        } else if stroke == ENTER || stroke == SHIFT_ENTER {
            self.output.push('\n');
        } else if stroke == SHIFT_TAP {
            self.change_status(|s| match s.keyboard {
                KeyboardKind::Pinyin => ImeStatus::new(s.keyboard, flip(s.conversion)),
                KeyboardKind::Other => s,
            });
        } else if stroke == WIN_SPACE {
            self.change_status(|s| {
                let keyboard = match s.keyboard {
                    KeyboardKind::Pinyin => KeyboardKind::Other,
                    KeyboardKind::Other => KeyboardKind::Pinyin,
                };
                ImeStatus::new(keyboard, s.conversion)
            });
        } else if stroke == CTRL_V {
            let clip = self.clipboard.clone();
            self.output.push_str(&clip);
        } else if let KeySpec::Char(c) = stroke.key {
            if stroke.mods.is_empty() {
                self.press_char(c);
            }
        }
    }
}

fn flip(conversion: Conversion) -> Conversion {
    match conversion {
        Conversion::Chinese => Conversion::English,
        Conversion::English => Conversion::Chinese,
    }
}

/// Shared scripted desktop. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct ScriptedDesktop {
    state: Arc<Mutex<DesktopState>>,
}

impl ScriptedDesktop {
    pub fn new(status: ImeStatus) -> Self {
        Self {
            state: Arc::new(Mutex::new(DesktopState {
                status,
                pending: None,
                mode_lag: 0,
                mode_frozen: false,
                mode_actions: Vec::new(),
                script: HashMap::new(),
                composing: None,
                previous_lag: 0,
                invalidations: 0,
                candidate_reads: 0,
                failing_reads: None,
                output: String::new(),
                clipboard: String::new(),
                double_quote_open: false,
                single_quote_open: false,
                log: Vec::new(),
            })),
        }
    }

    /// Candidate pages shown while composing `syllables` after `committed`
    /// has already been selected. A composition ends once its committed text
    /// has no entry.
    pub fn with_pages(self, syllables: &str, committed: &str, pages: &[&[&str]]) -> Self {
        let pages = pages
            .iter()
            .map(|p| p.iter().map(|t| t.to_string()).collect())
            .collect();
        self.state
            .lock()
            .script
            .insert((syllables.to_string(), committed.to_string()), pages);
        self
    }

    /// Mode reads that still report the old status after a switch.
    pub fn set_mode_lag(&self, reads: usize) {
        self.state.lock().mode_lag = reads;
    }

    /// Ignore every mode change request.
    pub fn set_mode_frozen(&self, frozen: bool) {
        self.state.lock().mode_frozen = frozen;
    }

    /// Page-state reads that report a stale previous-page button.
    pub fn set_previous_page_lag(&self, reads: usize) {
        self.state.lock().previous_lag = reads;
    }

    /// Makes `count` candidate reads starting at the `first` one (counted
    /// from 1) fail as if the list element had been destroyed.
    pub fn fail_candidate_reads(&self, first: usize, count: usize) {
        let mut state = self.state.lock();
        state.candidate_reads = 0;
        state.failing_reads = Some((first, count));
    }

    pub fn injector(&self) -> ScriptedKeys {
        ScriptedKeys {
            state: self.state.clone(),
        }
    }

    pub fn mode_provider(&self) -> ScriptedModes {
        ScriptedModes {
            state: self.state.clone(),
        }
    }

    pub fn switcher(&self) -> ScriptedSwitcher {
        ScriptedSwitcher {
            state: self.state.clone(),
        }
    }

    pub fn panel(&self) -> ScriptedPanel {
        ScriptedPanel {
            state: self.state.clone(),
        }
    }

    /// Mode controller, resolver and keyboard wired to this desktop.
    pub fn engine_parts(&self, config: Config) -> (ModeController, CandidateResolver, ScriptedKeys) {
        let modes = ModeController::new(
            Box::new(self.mode_provider()),
            Box::new(self.switcher()),
            &config,
        );
        let resolver = CandidateResolver::new(Box::new(self.panel()), Box::new(PinyinRomanizer), &config);
        (modes, resolver, self.injector())
    }

    pub fn auto_pinyin(&self, config: Config) -> Result<AutoPinyin> {
        let (modes, resolver, keys) = self.engine_parts(config.clone());
        AutoPinyin::new(config, Box::new(keys), modes, resolver)
    }

    pub fn output(&self) -> String {
        self.state.lock().output.clone()
    }

    pub fn status(&self) -> ImeStatus {
        self.state.lock().status
    }

    pub fn is_composing(&self) -> bool {
        self.state.lock().composing.is_some()
    }

    pub fn log(&self) -> Vec<Injected> {
        self.state.lock().log.clone()
    }

    pub fn taps(&self) -> Vec<KeyStroke> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|e| match e {
                Injected::Tap(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|e| match e {
                Injected::Typed(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn mode_actions(&self) -> Vec<ModeAction> {
        self.state.lock().mode_actions.clone()
    }

    pub fn panel_invalidations(&self) -> usize {
        self.state.lock().invalidations
    }
}

pub struct ScriptedKeys {
    state: Arc<Mutex<DesktopState>>,
}

impl KeyInjector for ScriptedKeys {
    fn send(&mut self, events: &[InputEvent]) -> Result<()> {
        self.state.lock().log.push(Injected::Raw(events.to_vec()));
        Ok(())
    }

    fn set_clipboard(&mut self, text: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.clipboard = text.to_string();
        state.log.push(Injected::Clipboard(text.to_string()));
        Ok(())
    }

    fn tap(&mut self, stroke: KeyStroke) -> Result<()> {
        self.state.lock().press(stroke);
        Ok(())
    }

    fn type_text(&mut self, text: &str, _interval: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push(Injected::Typed(text.to_string()));
        for c in text.chars() {
            if c == '\n' {
                state.output.push('\n');
            } else {
                state.press_char(c);
            }
        }
        Ok(())
    }
}

pub struct ScriptedModes {
    state: Arc<Mutex<DesktopState>>,
}

impl ModeProvider for ScriptedModes {
    fn status(&mut self) -> Result<ImeStatus> {
        Ok(self.state.lock().read_status())
    }
}

pub struct ScriptedSwitcher {
    state: Arc<Mutex<DesktopState>>,
}

impl ModeSwitcher for ScriptedSwitcher {
    fn perform(&mut self, action: ModeAction) -> Result<bool> {
        let mut state = self.state.lock();
        state.mode_actions.push(action);
        match action {
            ModeAction::SwitchKeyboard => {
                state.change_status(|s| ImeStatus::new(KeyboardKind::Pinyin, s.conversion))
            }
            ModeAction::ToggleConversion => {
                state.change_status(|s| ImeStatus::new(s.keyboard, flip(s.conversion)))
            }
        }
        Ok(true)
    }
}

pub struct ScriptedPanel {
    state: Arc<Mutex<DesktopState>>,
}

impl CandidateListProvider for ScriptedPanel {
    fn acquire(&mut self) -> Result<()> {
        match self.state.lock().pages() {
            Some(_) => Ok(()),
            None => Err(Error::CandidatePanelNotFound),
        }
    }

    fn candidates(&mut self) -> Result<Vec<Candidate>> {
        let mut state = self.state.lock();
        state.candidate_reads += 1;
        if let Some((first, count)) = state.failing_reads {
            let read = state.candidate_reads;
            if read >= first && read - first < count {
                return Err(Error::Accessibility(
                    "element is no longer available".to_string(),
                ));
            }
        }
        state.visible().ok_or(Error::CandidatePanelNotFound)
    }

    fn page_state(&mut self) -> Result<PageState> {
        let mut state = self.state.lock();
        let page = state
            .composing
            .as_ref()
            .map(|c| c.page)
            .ok_or(Error::CandidatePanelNotFound)?;
        let count = state.pages().map(|p| p.len()).ok_or(Error::CandidatePanelNotFound)?;
        let stale = state.previous_lag > 0;
        if stale {
            state.previous_lag -= 1;
        }
        Ok(PageState {
            has_previous: page > 0 || stale,
            has_next: page + 1 < count,
        })
    }

    fn invalidate(&mut self) {
        self.state.lock().invalidations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::NEXT_PAGE;

    #[test]
    fn test_chinese_mode_renders_full_width_quotes() {
        let desktop = ScriptedDesktop::new(ImeStatus::new(KeyboardKind::Pinyin, Conversion::Chinese));
        let mut keys = desktop.injector();
        keys.type_text("\"x\",", Duration::ZERO).expect("type");
        // 'x' opens a composition that has no script, so nothing is committed for it.
        assert_eq!(desktop.output(), "“”，");
    }

    #[test]
    fn test_english_mode_types_verbatim() {
        let desktop = ScriptedDesktop::new(ImeStatus::new(KeyboardKind::Pinyin, Conversion::English));
        let mut keys = desktop.injector();
        keys.type_text("ni, hao", Duration::ZERO).expect("type");
        keys.tap(NEXT_PAGE).expect("tap");
        assert_eq!(desktop.output(), "ni, hao]");
    }

    #[test]
    fn test_shift_tap_toggles_conversion() {
        let desktop = ScriptedDesktop::new(ImeStatus::new(KeyboardKind::Pinyin, Conversion::English));
        desktop.injector().tap(SHIFT_TAP).expect("tap");
        assert_eq!(desktop.status().conversion, Conversion::Chinese);
    }
}
