use crate::types::InputMode;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("taskbar not found in the accessibility tree")]
    TaskbarNotFound,

    #[error("input indicator not found or not recognised")]
    IndicatorNotFound,

    #[error("IME candidate panel not found")]
    CandidatePanelNotFound,

    #[error("input mode did not switch to {target:?} within {waited:?}")]
    ModeSwitchTimeout { target: InputMode, waited: Duration },

    #[error("no candidate matches {remaining:?} after {page_turns} page turns")]
    CandidateMatchExhausted { remaining: String, page_turns: usize },

    #[error("invalid target text: {0}")]
    InvalidTarget(String),

    #[error("accessibility query failed: {0}")]
    Accessibility(String),

    #[error("input injection failed: {0}")]
    Injection(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
