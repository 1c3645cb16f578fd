pub mod accessibility;
pub mod candidate;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod indicator;
pub mod keys;
pub mod mode;
pub mod panel;
pub mod punctuation;
pub mod romanizer;
pub mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod wait;

#[cfg(windows)]
pub mod ime;
#[cfg(windows)]
pub mod keyboard;
#[cfg(windows)]
pub mod uia;

pub use candidate::{CandidateListProvider, CandidateResolver, ResolveOutcome};
pub use classifier::classify;
pub use config::{Config, ExhaustionPolicy};
pub use dispatcher::{AutoPinyin, InputReport};
pub use error::{Error, Result};
pub use types::{ClassifiedRun, InputMode, RunKind};
