//! Operator decision source.
//!
//! The engine never reads a terminal itself. Every interactive choice is
//! one of four shapes behind this trait, so a scripted source can drive a
//! whole run deterministically.

use crate::error::DecisionError;
use async_trait::async_trait;

pub type DecisionResult<T> = std::result::Result<T, DecisionError>;

/// The four interaction shapes the engine needs
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// Yes/no question with a default
    async fn confirm(&self, prompt: &str, default_yes: bool) -> DecisionResult<bool>;

    /// Positive integer entry, `None` when the operator skips
    async fn manual_limit(&self, prompt: &str) -> DecisionResult<Option<u32>>;

    /// Free-text entry, `None` when the operator aborts
    async fn search_term(&self, prompt: &str) -> DecisionResult<Option<String>>;

    /// Selection from a list of `len` items, 1-based; 0 asks to search again
    async fn pick_index(&self, prompt: &str, len: usize) -> DecisionResult<usize>;
}
