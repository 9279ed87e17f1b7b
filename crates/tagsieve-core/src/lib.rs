mod engine;
mod error;
mod rules;
mod session;
mod tokenizer;

pub use engine::{FilterEngine, FilterOptions};
pub use error::{E_INVALID_INPUT, E_RULES, FilterError};
pub use rules::{RuleSet, SELF_CLOSING};
pub use tokenizer::{Event, StartTag, TokenSink, events, tokenize};
