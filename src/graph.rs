#![allow(dead_code)]
//! In-memory relationship graph: builder and bounded multi-path search.
use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::contact::{Person, RelationshipRecord};

/// Substituted when an edge carries no stored weight (pre-scoring imports).
pub const DEFAULT_EDGE_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct Node {
    pub id: i64,
    pub display_name: String,
    /// The searching user's own node.
    pub is_self: bool,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from_id: i64,
    pub to_id: i64,
    pub weight: Option<f64>,
    pub channels: Vec<String>,
    pub last_interaction: Option<NaiveDateTime>,
}

impl Edge {
    /// Stored weight clamped to [0,1], or the documented default when absent.
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(DEFAULT_EDGE_WEIGHT).clamp(0.0, 1.0)
    }
}

/// Adjacency view over one tenant's contacts. Every node id has an
/// adjacency entry, even when empty. Built fresh per search and discarded —
/// nothing mutates a graph after construction.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: HashMap<i64, Node>,
    pub adjacency: HashMap<i64, Vec<Edge>>,
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Directed edge count (each relationship contributes two).
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|v| v.len()).sum()
    }

    pub fn neighbors(&self, id: i64) -> &[Edge] {
        self.adjacency.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The node flagged as the searching user, if any.
    pub fn self_node(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.is_self)
    }
}

/// Build a graph from pre-scoped person and relationship records.
///
/// Precondition: the inputs are already scoped to one tenant; no check is
/// performed here. Each relationship is inserted in both directions with the
/// same weight and channels. Relationships whose endpoints are not among the
/// supplied persons are silently dropped (the other end may not have synced
/// yet). Duplicate records for a pair, in either order, are ignored after the
/// first, so a pair never yields parallel edges. Persons without
/// relationships still get an empty adjacency entry.
pub fn build_graph(persons: &[Person], relationships: &[RelationshipRecord]) -> Graph {
    let mut graph = Graph::default();
    let mut seen_pairs = HashSet::new();

    for person in persons {
        graph.nodes.insert(
            person.id,
            Node {
                id: person.id,
                display_name: person.name().to_string(),
                is_self: person.attributes.is_self,
            },
        );
        graph.adjacency.entry(person.id).or_default();
    }

    for rel in relationships {
        if !graph.nodes.contains_key(&rel.from_id) || !graph.nodes.contains_key(&rel.to_id) {
            continue;
        }
        let pair = (rel.from_id.min(rel.to_id), rel.from_id.max(rel.to_id));
        if !seen_pairs.insert(pair) {
            continue;
        }
        let forward = Edge {
            from_id: rel.from_id,
            to_id: rel.to_id,
            weight: rel.weight,
            channels: rel.channels.clone(),
            last_interaction: rel.last_interaction,
        };
        let mut backward = forward.clone();
        backward.from_id = rel.to_id;
        backward.to_id = rel.from_id;
        graph
            .adjacency
            .entry(rel.from_id)
            .or_default()
            .push(forward);
        graph.adjacency.entry(rel.to_id).or_default().push(backward);
    }

    graph
}

/// Batched adjacency lookup for one BFS frontier level. A materialized
/// `Graph` answers from memory; a storage-backed implementation can answer
/// a whole level in a single round trip. Unknown ids are simply absent from
/// the returned map.
pub trait FrontierSource {
    fn fetch_frontier(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<Edge>>>;
}

impl FrontierSource for Graph {
    fn fetch_frontier(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<Edge>>> {
        let mut out = HashMap::with_capacity(ids.len());
        for &id in ids {
            if let Some(edges) = self.adjacency.get(&id) {
                out.insert(id, edges.clone());
            }
        }
        Ok(out)
    }
}

/// An acyclic chain from source toward a target, with the edges traversed.
#[derive(Debug, Clone)]
pub struct Path {
    pub nodes: Vec<i64>,
    pub edges: Vec<Edge>,
}

impl Path {
    fn seed(start: i64) -> Self {
        Self {
            nodes: vec![start],
            edges: Vec::new(),
        }
    }

    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    pub fn tip(&self) -> i64 {
        *self.nodes.last().unwrap_or(&0)
    }

    pub fn visits(&self, id: i64) -> bool {
        self.nodes.contains(&id)
    }

    fn extended(&self, edge: &Edge) -> Path {
        let mut nodes = self.nodes.clone();
        let mut edges = self.edges.clone();
        nodes.push(edge.to_id);
        edges.push(edge.clone());
        Path { nodes, edges }
    }
}

/// Find every acyclic path from `from` to `to` within `max_hops` edges.
///
/// Level-synchronized BFS: all tips of a level are fetched with one
/// `fetch_frontier` call, so a storage-backed source pays one round trip per
/// level instead of one per node. Cycle avoidance is per-path — a node used
/// in one branch stays available to disjoint branches. Edges below
/// `min_weight` are pruned during expansion, not post-filtered. A branch
/// that reaches the target is emitted and not extended further.
///
/// `from == to`, an unknown source, or an unreachable target all yield an
/// empty list — "no warm path" is a result, not an error.
pub fn search_paths<S: FrontierSource>(
    source: &S,
    from: i64,
    to: i64,
    max_hops: usize,
    min_weight: f64,
) -> Result<Vec<Path>> {
    if from == to || max_hops == 0 {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    let mut frontier = vec![Path::seed(from)];

    while !frontier.is_empty() {
        let mut tips: Vec<i64> = frontier.iter().map(|p| p.tip()).collect();
        tips.sort_unstable();
        tips.dedup();
        let adjacency = source.fetch_frontier(&tips)?;

        let mut next = Vec::new();
        for path in &frontier {
            let Some(edges) = adjacency.get(&path.tip()) else {
                continue;
            };
            for edge in edges {
                if edge.effective_weight() < min_weight {
                    continue;
                }
                if edge.to_id == to {
                    results.push(path.extended(edge));
                } else if !path.visits(edge.to_id) && path.hops() + 1 < max_hops {
                    next.push(path.extended(edge));
                }
            }
        }
        frontier = next;
    }

    Ok(results)
}
