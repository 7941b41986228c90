//! Remaining-generation counter.

use serde::{Deserialize, Serialize};

/// Server-enforced cap on generations per user.
pub const GENERATION_LIMIT: u32 = 10;

/// Advisory cache of the server's remaining-generation count.
///
/// The backend is the only authority on quota. This counter is refreshed
/// when the generation screen is entered, decremented optimistically after
/// each successful generation, and may drift until the next refresh.
///
/// `None` means the count is unknown (not fetched yet, or the fetch failed);
/// an unknown counter does not block requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotaCounter(Option<u32>);

impl QuotaCounter {
    /// A counter whose value has not been fetched.
    #[must_use]
    pub const fn unknown() -> Self {
        Self(None)
    }

    /// A counter seeded from the server's `remaining` value.
    #[must_use]
    pub const fn from_server(remaining: u32) -> Self {
        Self(Some(remaining))
    }

    /// The remaining count, if known.
    #[must_use]
    pub const fn remaining(&self) -> Option<u32> {
        self.0
    }

    /// Whether a generation request may be issued.
    #[must_use]
    pub const fn allows_request(&self) -> bool {
        match self.0 {
            None => true,
            Some(n) => n > 0,
        }
    }

    /// Record one successful generation. Never goes below zero; an unknown
    /// counter stays unknown.
    pub const fn record_generation(&mut self) {
        if let Some(n) = self.0 {
            self.0 = Some(n.saturating_sub(1));
        }
    }

    /// UI line describing the counter, or `None` while unknown.
    #[must_use]
    pub fn describe(&self) -> Option<String> {
        self.0.map(|n| {
            if n > 0 {
                format!("You have {n} out of {GENERATION_LIMIT} avatars remaining.")
            } else {
                format!("You've reached your {GENERATION_LIMIT}-image limit.")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_allows_request() {
        let counter = QuotaCounter::unknown();
        assert!(counter.allows_request());
        assert_eq!(counter.describe(), None);
    }

    #[test]
    fn test_zero_blocks_request() {
        assert!(!QuotaCounter::from_server(0).allows_request());
        assert!(QuotaCounter::from_server(1).allows_request());
    }

    #[test]
    fn test_record_generation_floors_at_zero() {
        let mut counter = QuotaCounter::from_server(1);
        counter.record_generation();
        assert_eq!(counter.remaining(), Some(0));
        counter.record_generation();
        assert_eq!(counter.remaining(), Some(0));
    }

    #[test]
    fn test_record_generation_keeps_unknown() {
        let mut counter = QuotaCounter::unknown();
        counter.record_generation();
        assert_eq!(counter.remaining(), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            QuotaCounter::from_server(3).describe().as_deref(),
            Some("You have 3 out of 10 avatars remaining.")
        );
        assert_eq!(
            QuotaCounter::from_server(0).describe().as_deref(),
            Some("You've reached your 10-image limit.")
        );
    }
}
