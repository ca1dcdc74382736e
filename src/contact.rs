#![allow(dead_code)]
//! Shared contact records — the inputs every core component consumes.
use std::collections::HashMap;

use chrono::NaiveDateTime;

/// One person as currently known to a tenant. `display_names` holds every
/// name variant seen across imports (entity resolution compares all pairs).
#[derive(Debug, Clone)]
pub struct Person {
    pub id: i64,
    pub display_names: Vec<String>,
    pub attributes: PersonAttributes,
}

impl Person {
    /// Primary display name (first variant, or a placeholder).
    pub fn name(&self) -> &str {
        self.display_names
            .first()
            .map(|s| s.as_str())
            .unwrap_or("(unnamed)")
    }
}

/// Known attributes, pulled out of the untyped bag the sources provide.
/// Anything we don't model explicitly lands in `extra`.
#[derive(Debug, Clone, Default)]
pub struct PersonAttributes {
    /// This record is the searching user themself.
    pub is_self: bool,
    pub organization: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    /// platform → handle, e.g. "linkedin" → "jane-doe".
    pub social_handles: HashMap<String, String>,
    /// Soft-deleted records are kept for audit but excluded from matching.
    pub deleted: bool,
    pub extra: HashMap<String, String>,
}

/// One stored relationship. Storage records each pair once; the graph
/// builder mirrors it into both directions.
#[derive(Debug, Clone)]
pub struct RelationshipRecord {
    pub from_id: i64,
    pub to_id: i64,
    /// Derived strength in [0,1]. `None` only for records imported before
    /// any interaction data existed; scoring substitutes a default.
    pub weight: Option<f64>,
    pub channels: Vec<String>,
    pub last_interaction: Option<NaiveDateTime>,
}

/// Raw interaction aggregates for one relationship, as produced by the
/// import adapters. Never persisted as factors — only the derived weight is.
#[derive(Debug, Clone)]
pub struct InteractionSignals {
    pub first_seen_at: Option<NaiveDateTime>,
    pub last_seen_at: Option<NaiveDateTime>,
    pub interaction_count: u64,
    pub sent_count: u64,
    pub received_count: u64,
    pub channels: Vec<String>,
}

impl InteractionSignals {
    pub fn empty() -> Self {
        Self {
            first_seen_at: None,
            last_seen_at: None,
            interaction_count: 0,
            sent_count: 0,
            received_count: 0,
            channels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_falls_back_when_empty() {
        let p = Person {
            id: 1,
            display_names: vec![],
            attributes: PersonAttributes::default(),
        };
        assert_eq!(p.name(), "(unnamed)");
    }

    #[test]
    fn test_name_uses_first_variant() {
        let p = Person {
            id: 1,
            display_names: vec!["Ada Lovelace".into(), "A. Lovelace".into()],
            attributes: PersonAttributes::default(),
        };
        assert_eq!(p.name(), "Ada Lovelace");
    }
}
