//! Tag matcher rule sets.
//!
//! Each rule set is loaded from a plain-text expression file and answers a
//! single question: does this key/value pair match any of my expressions?

mod matcher;

pub use matcher::{MatcherSet, RuleKind};
