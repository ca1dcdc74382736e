//! Path scoring, ranking, and human-readable explanations.
use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::graph::Path;

/// Per-additional-hop multiplicative discount. A direct (1-hop) path is not
/// penalized; every further hop multiplies the score by this once.
pub const HOP_PENALTY: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct ScoredPath {
    pub path: Path,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct RankedPath {
    pub path: Path,
    pub score: f64,
    /// 1-based, 1 = best.
    pub rank: usize,
    pub explanation: String,
}

/// Score a path: product of its edge weights, discounted per extra hop,
/// clamped to [0,1]. The product means one weak edge collapses the whole
/// chain — a warm intro is only as strong as its weakest link. Edges with
/// no stored weight contribute the documented default instead of failing.
pub fn score_path(path: &Path) -> f64 {
    if path.edges.is_empty() {
        return 0.0;
    }
    let base: f64 = path.edges.iter().map(|e| e.effective_weight()).product();
    let penalty = HOP_PENALTY.powi(path.edges.len() as i32 - 1);
    (base * penalty).clamp(0.0, 1.0)
}

pub fn score_paths(paths: Vec<Path>) -> Vec<ScoredPath> {
    paths
        .into_iter()
        .map(|path| {
            let score = score_path(&path);
            ScoredPath { path, score }
        })
        .collect()
}

/// The staleness bottleneck: the oldest last-interaction timestamp among the
/// path's edges. `None` if any edge has no timestamp at all.
fn stalest_edge(path: &Path) -> Option<NaiveDateTime> {
    path.edges.iter().map(|e| e.last_interaction).min().flatten()
}

/// Order scored paths best-first and keep the top `max_results`.
///
/// Sort: score descending, then fewer hops, then the fresher staleness
/// bottleneck (see `stalest_edge`). The sort is stable, so exact ties keep
/// their original relative order. Ranks are assigned 1-based after
/// truncation, and each kept path gets its explanation attached.
pub fn rank_paths(
    mut scored: Vec<ScoredPath>,
    max_results: usize,
    names: &HashMap<i64, String>,
) -> Vec<RankedPath> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.hops().cmp(&b.path.hops()))
            .then_with(|| stalest_edge(&b.path).cmp(&stalest_edge(&a.path)))
    });
    scored.truncate(max_results);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, sp)| {
            let explanation = explain_path(&sp.path, sp.score, names);
            RankedPath {
                path: sp.path,
                score: sp.score,
                rank: i + 1,
                explanation,
            }
        })
        .collect()
}

/// Score bands for explanations. Fixed thresholds: ≥0.8 strong, ≥0.5 moderate.
pub fn strength_word(score: f64) -> &'static str {
    if score >= 0.8 {
        "strong"
    } else if score >= 0.5 {
        "moderate"
    } else {
        "weak"
    }
}

/// Render one path as an introduction rationale.
pub fn explain_path(path: &Path, score: f64, names: &HashMap<i64, String>) -> String {
    let name_of = |id: i64| {
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("person {id}"))
    };
    let word = strength_word(score);
    let target = name_of(path.tip());

    if path.nodes.len() == 2 {
        return format!("Direct {word} connection to {target}");
    }

    let intermediaries: Vec<String> = path.nodes[1..path.nodes.len() - 1]
        .iter()
        .map(|&id| name_of(id))
        .collect();
    format!(
        "Connect through {} to reach {target} ({word} path)",
        intermediaries.join(" → ")
    )
}
