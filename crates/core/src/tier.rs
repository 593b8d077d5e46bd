//! Typed tier results.
//!
//! Each retrieval tier reports whether it produced data, produced nothing,
//! or failed and degraded. The assembler treats `Empty` and `Degraded` the
//! same way when building the prompt (no contribution) but logs and
//! reports them differently.

use serde::{Deserialize, Serialize};

/// The outcome of one retrieval tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TierOutcome<T> {
    /// The tier produced data.
    Full(T),
    /// The tier ran fine and found nothing.
    Empty,
    /// The tier failed or timed out; reason is for logs/diagnostics only.
    Degraded { reason: String },
}

impl<T> TierOutcome<T> {
    /// Build a `Degraded` outcome from anything displayable.
    pub fn degraded(reason: impl std::fmt::Display) -> Self {
        Self::Degraded {
            reason: reason.to_string(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The payload, or `None` for `Empty`/`Degraded`.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Full(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Default> TierOutcome<T> {
    /// The payload, defaulting for `Empty`/`Degraded` — the "forgiving"
    /// view used when merging tiers into a prompt.
    pub fn unwrap_or_default(self) -> T {
        self.into_value().unwrap_or_default()
    }
}

impl<T> TierOutcome<Vec<T>> {
    /// Wrap a list, collapsing an empty one into `Empty`.
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            Self::Empty
        } else {
            Self::Full(items)
        }
    }
}
