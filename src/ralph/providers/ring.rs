//! Provider ring — the ordered rotation of available providers.
//!
//! Construction scans the registry in its stable order and retains the
//! adapters whose CLI resolves on PATH. The cursor is always valid while the
//! ring is non-empty; `advance` moves it modulo the length, which makes a
//! single-member ring's advance a no-op.
//!
//! Rotation policy lives in the driver, not here: GUTTER advances the
//! cursor, ROTATE keeps it (fresh context, same provider), and promotion to
//! verification advances it so the verifier differs from the implementer
//! whenever at least two providers exist.

use std::sync::Arc;

use crate::ralph::error::RalphError;
use crate::ralph::providers::{detect_available, ProviderAdapter};

pub struct ProviderRing {
    members: Vec<Arc<dyn ProviderAdapter>>,
    cursor: usize,
}

impl ProviderRing {
    /// Build a ring from an explicit member list.
    pub fn new(members: Vec<Arc<dyn ProviderAdapter>>) -> Result<Self, RalphError> {
        if members.is_empty() {
            return Err(RalphError::NoProviders);
        }
        Ok(Self { members, cursor: 0 })
    }

    /// Build a ring from the providers available on this system.
    pub fn detect() -> Result<Self, RalphError> {
        Self::new(detect_available())
    }

    /// The provider at the cursor.
    pub fn current(&self) -> Arc<dyn ProviderAdapter> {
        Arc::clone(&self.members[self.cursor])
    }

    /// Move the cursor to the next member and return it.
    pub fn advance(&mut self) -> Arc<dyn ProviderAdapter> {
        self.cursor = (self.cursor + 1) % self.members.len();
        self.current()
    }

    /// Whether rotation can reach a different provider.
    pub fn has_alternates(&self) -> bool {
        self.members.len() > 1
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        // A constructed ring is never empty; kept for API completeness.
        self.members.is_empty()
    }

    /// Display names of all members in rotation order.
    pub fn display_names(&self) -> Vec<&'static str> {
        self.members.iter().map(|m| m.display_name()).collect()
    }
}
