//! Tests for the provider ring: cursor movement, single-member behavior,
//! and full coverage under repeated advances.

use std::path::Path;
use std::sync::Arc;

use ralph::event::AgentEvent;
use ralph::providers::{ProviderAdapter, ring::ProviderRing};

struct FakeAdapter(&'static str);

impl ProviderAdapter for FakeAdapter {
    fn name(&self) -> &'static str {
        self.0
    }
    fn display_name(&self) -> &'static str {
        self.0
    }
    fn available(&self) -> bool {
        true
    }
    fn spawn_args(&self, _workspace: &Path) -> Vec<String> {
        vec![self.0.to_string()]
    }
    fn normalize(&self, _raw_line: &str) -> Option<AgentEvent> {
        None
    }
}

fn ring_of(names: &[&'static str]) -> ProviderRing {
    let members: Vec<Arc<dyn ProviderAdapter>> = names
        .iter()
        .map(|n| Arc::new(FakeAdapter(n)) as Arc<dyn ProviderAdapter>)
        .collect();
    ProviderRing::new(members).unwrap()
}

#[test]
fn test_empty_ring_is_an_error() {
    assert!(ProviderRing::new(Vec::new()).is_err());
}

#[test]
fn test_current_starts_at_first_member() {
    let ring = ring_of(&["a", "b", "c"]);
    assert_eq!(ring.current().name(), "a");
}

#[test]
fn test_advance_moves_modulo_length() {
    let mut ring = ring_of(&["a", "b", "c"]);
    assert_eq!(ring.advance().name(), "b");
    assert_eq!(ring.advance().name(), "c");
    assert_eq!(ring.advance().name(), "a");
}

#[test]
fn test_single_member_advance_is_a_noop() {
    let mut ring = ring_of(&["solo"]);
    assert_eq!(ring.advance().name(), "solo");
    assert_eq!(ring.advance().name(), "solo");
    assert_eq!(ring.current().name(), "solo");
}

#[test]
fn test_has_alternates() {
    assert!(!ring_of(&["solo"]).has_alternates());
    assert!(ring_of(&["a", "b"]).has_alternates());
}

#[test]
fn test_repeated_advance_visits_every_member_within_len_calls() {
    let names = ["a", "b", "c", "d", "e"];
    let mut ring = ring_of(&names);

    let mut seen = vec![ring.current().name()];
    for _ in 0..names.len() - 1 {
        seen.push(ring.advance().name());
    }
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), names.len(), "every member visited");
}

#[test]
fn test_display_names_follow_rotation_order() {
    let ring = ring_of(&["a", "b", "c"]);
    assert_eq!(ring.display_names(), vec!["a", "b", "c"]);
    assert_eq!(ring.len(), 3);
    assert!(!ring.is_empty());
}
