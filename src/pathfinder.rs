//! Warm-introduction pathfinding: composes graph build, search, scoring,
//! ranking and explanation into one call.
use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::contact::{Person, RelationshipRecord};
use crate::graph::{self, Graph};
use crate::paths::{self, RankedPath};

/// The surrounding storage layer, seen from the core. Implementations must
/// hand back collections already scoped to a single tenant; the core never
/// checks this. A provider failure surfaces as an error, which is distinct
/// from the empty list that means "no warm path found".
pub trait DataProvider {
    fn list_persons(&self) -> Result<Vec<Person>>;
    fn list_relationships(&self) -> Result<Vec<RelationshipRecord>>;
}

/// Search knobs. The same bounds the API boundary enforces (hops 1–10,
/// results 1–20) before handing the query down.
#[derive(Debug, Clone, Copy)]
pub struct PathQuery {
    pub max_hops: usize,
    pub max_results: usize,
    pub min_strength: f64,
}

impl Default for PathQuery {
    fn default() -> Self {
        Self {
            max_hops: 3,
            max_results: 5,
            min_strength: 0.3,
        }
    }
}

/// Fetch one tenant's records, build a fresh graph, and rank the best
/// introduction chains from `from` to `to`. The graph is discarded after
/// the call; nothing is cached between searches.
pub fn find_warm_paths(
    provider: &dyn DataProvider,
    from: i64,
    to: i64,
    query: &PathQuery,
) -> Result<Vec<RankedPath>> {
    let persons = provider.list_persons().context("listing persons")?;
    let relationships = provider
        .list_relationships()
        .context("listing relationships")?;
    let graph = graph::build_graph(&persons, &relationships);
    find_paths_in_graph(&graph, from, to, query)
}

/// Same search over a graph the caller already holds.
pub fn find_paths_in_graph(
    graph: &Graph,
    from: i64,
    to: i64,
    query: &PathQuery,
) -> Result<Vec<RankedPath>> {
    let found = graph::search_paths(graph, from, to, query.max_hops, query.min_strength)?;
    let scored = paths::score_paths(found);
    let names: HashMap<i64, String> = graph
        .nodes
        .iter()
        .map(|(&id, node)| (id, node.display_name.clone()))
        .collect();
    Ok(paths::rank_paths(scored, query.max_results, &names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::PersonAttributes;

    struct StaticProvider {
        persons: Vec<Person>,
        relationships: Vec<RelationshipRecord>,
    }

    impl DataProvider for StaticProvider {
        fn list_persons(&self) -> Result<Vec<Person>> {
            Ok(self.persons.clone())
        }
        fn list_relationships(&self) -> Result<Vec<RelationshipRecord>> {
            Ok(self.relationships.clone())
        }
    }

    struct BrokenProvider;

    impl DataProvider for BrokenProvider {
        fn list_persons(&self) -> Result<Vec<Person>> {
            anyhow::bail!("backing store went away")
        }
        fn list_relationships(&self) -> Result<Vec<RelationshipRecord>> {
            anyhow::bail!("backing store went away")
        }
    }

    fn person(id: i64, name: &str) -> Person {
        Person {
            id,
            display_names: vec![name.to_string()],
            attributes: PersonAttributes::default(),
        }
    }

    fn rel(from: i64, to: i64, weight: f64) -> RelationshipRecord {
        RelationshipRecord {
            from_id: from,
            to_id: to,
            weight: Some(weight),
            channels: vec!["email".into()],
            last_interaction: None,
        }
    }

    fn provider() -> StaticProvider {
        StaticProvider {
            persons: vec![person(1, "Alice"), person(2, "Bob"), person(3, "Carol")],
            relationships: vec![rel(1, 2, 0.9), rel(2, 3, 0.8), rel(1, 3, 0.6)],
        }
    }

    #[test]
    fn test_end_to_end_ranking() {
        let ranked = find_warm_paths(&provider(), 1, 3, &PathQuery::default()).unwrap();
        assert_eq!(ranked.len(), 2);
        // 0.9*0.8*0.9 = 0.648 beats the 0.6 direct edge.
        assert_eq!(ranked[0].path.nodes, vec![1, 2, 3]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(
            ranked[0].explanation,
            "Connect through Bob to reach Carol (moderate path)"
        );
        assert_eq!(ranked[1].explanation, "Direct moderate connection to Carol");
    }

    #[test]
    fn test_min_strength_filters_direct_edge() {
        let query = PathQuery {
            min_strength: 0.7,
            ..PathQuery::default()
        };
        let ranked = find_warm_paths(&provider(), 1, 3, &query).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].path.nodes, vec![1, 2, 3]);
    }

    #[test]
    fn test_max_results_truncates() {
        let query = PathQuery {
            max_results: 1,
            ..PathQuery::default()
        };
        let ranked = find_warm_paths(&provider(), 1, 3, &query).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn test_no_path_is_empty_not_error() {
        let ranked = find_warm_paths(&provider(), 1, 99, &PathQuery::default()).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_broken_provider_is_an_error() {
        let err = find_warm_paths(&BrokenProvider, 1, 3, &PathQuery::default());
        assert!(err.is_err());
    }
}
