//! Context building for model calls
//!
//! Combines:
//! - Secretary persona and clock
//! - Per-user history (newest first)
//! - The live message and behavioral directives

mod builder;

pub use builder::{
    DIRECTIVES, HISTORY_HEADER, PERSONA, PromptComposer, PromptContext, UNDECODABLE_PLACEHOLDER,
    UTTERANCE_HEADER,
};
