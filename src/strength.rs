//! Relationship strength scoring: raw interaction signals to a 0-1 weight.
use chrono::NaiveDateTime;

use crate::contact::InteractionSignals;

/// Recency half-life: a contact last seen this many days ago scores 0.5.
pub const HALF_LIFE_DAYS: f64 = 90.0;

/// Mutuality when all interactions flow one way.
pub const ONE_WAY_MUTUALITY: f64 = 0.3;

/// Frequency when the observation window is zero-length but interactions exist.
pub const POINT_WINDOW_FREQUENCY: f64 = 0.5;

const DAYS_PER_MONTH: f64 = 30.44;

/// The four independent factors, each in [0,1]. Never persisted — only the
/// weighted combination is stored as the edge weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthFactors {
    pub recency: f64,
    pub frequency: f64,
    pub mutuality: f64,
    pub channels: f64,
}

/// Factor weights. Defaults sum to 1.0; callers may override (e.g. from
/// config) — the result is clamped regardless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthWeights {
    pub recency: f64,
    pub frequency: f64,
    pub mutuality: f64,
    pub channels: f64,
}

impl Default for StrengthWeights {
    fn default() -> Self {
        Self {
            recency: 0.35,
            frequency: 0.30,
            mutuality: 0.20,
            channels: 0.15,
        }
    }
}

/// Exponential decay from the last interaction: `exp(-ln2 · days / 90)`.
/// 0 days → 1.0, 90 days → 0.5. Future timestamps clamp to 1.0.
pub fn recency_factor(days_since_last_contact: f64) -> f64 {
    let days = days_since_last_contact.max(0.0);
    (-std::f64::consts::LN_2 * days / HALF_LIFE_DAYS).exp()
}

/// Log-compressed interactions per month: `min(1, log10(ipm+1)/log10(11))`.
/// Saturates at 10 interactions/month. A zero-length window with at least
/// one interaction scores a flat mid-value instead of dividing by zero.
pub fn frequency_factor(interaction_count: u64, window_days: f64) -> f64 {
    if interaction_count == 0 {
        return 0.0;
    }
    if window_days <= 0.0 {
        return POINT_WINDOW_FREQUENCY;
    }
    let per_month = interaction_count as f64 / (window_days / DAYS_PER_MONTH);
    ((per_month + 1.0).log10() / 11f64.log10()).min(1.0)
}

/// Balance of sent vs received: `2·min/(sent+received)`, 1.0 only at a
/// perfect 50/50 split. Any one-way relationship scores a flat low value.
pub fn mutuality_factor(sent: u64, received: u64) -> f64 {
    if sent == 0 || received == 0 {
        return ONE_WAY_MUTUALITY;
    }
    2.0 * sent.min(received) as f64 / (sent + received) as f64
}

/// Step function over distinct channel count.
pub fn channels_factor(channel_count: usize) -> f64 {
    match channel_count {
        0 => 0.0,
        1 => 0.4,
        2 => 0.7,
        _ => 1.0,
    }
}

/// Compute all four factors from raw signals, relative to `now`.
/// A relationship with no last-seen timestamp has recency 0.
pub fn factors_from_signals(signals: &InteractionSignals, now: NaiveDateTime) -> StrengthFactors {
    let recency = match signals.last_seen_at {
        Some(last) => {
            let days = (now - last).num_seconds() as f64 / 86_400.0;
            recency_factor(days)
        }
        None => 0.0,
    };

    let window_days = match (signals.first_seen_at, signals.last_seen_at) {
        (Some(first), Some(last)) => (last - first).num_seconds() as f64 / 86_400.0,
        _ => 0.0,
    };

    StrengthFactors {
        recency,
        frequency: frequency_factor(signals.interaction_count, window_days),
        mutuality: mutuality_factor(signals.sent_count, signals.received_count),
        channels: channels_factor(signals.channels.len()),
    }
}

/// Weighted linear combination of the factors, clamped to [0,1].
pub fn calculate_strength(factors: &StrengthFactors, weights: &StrengthWeights) -> f64 {
    let score = factors.recency * weights.recency
        + factors.frequency * weights.frequency
        + factors.mutuality * weights.mutuality
        + factors.channels * weights.channels;
    score.clamp(0.0, 1.0)
}

/// Convenience: signals straight to a stored edge weight.
pub fn score_signals(
    signals: &InteractionSignals,
    weights: &StrengthWeights,
    now: NaiveDateTime,
) -> f64 {
    calculate_strength(&factors_from_signals(signals, now), weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_recency_fresh_contact() {
        assert!((recency_factor(0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_recency_half_life() {
        assert!((recency_factor(90.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_recency_two_half_lives() {
        assert!((recency_factor(180.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_recency_future_clamps() {
        assert_eq!(recency_factor(-5.0), 1.0);
    }

    #[test]
    fn test_frequency_zero_interactions() {
        assert_eq!(frequency_factor(0, 365.0), 0.0);
    }

    #[test]
    fn test_frequency_zero_window_with_interactions() {
        assert_eq!(frequency_factor(3, 0.0), POINT_WINDOW_FREQUENCY);
    }

    #[test]
    fn test_frequency_saturates_at_ten_per_month() {
        // 10/month hits the log10(11)/log10(11) ceiling exactly.
        let f = frequency_factor(10, DAYS_PER_MONTH);
        assert!((f - 1.0).abs() < 1e-9);
        assert_eq!(frequency_factor(1000, DAYS_PER_MONTH), 1.0);
    }

    #[test]
    fn test_frequency_monotonic_in_count() {
        let window = 365.0;
        assert!(frequency_factor(1, window) < frequency_factor(5, window));
        assert!(frequency_factor(5, window) < frequency_factor(50, window));
    }

    #[test]
    fn test_mutuality_one_way() {
        assert_eq!(mutuality_factor(12, 0), ONE_WAY_MUTUALITY);
        assert_eq!(mutuality_factor(0, 7), ONE_WAY_MUTUALITY);
        assert_eq!(mutuality_factor(0, 0), ONE_WAY_MUTUALITY);
    }

    #[test]
    fn test_mutuality_perfect_balance() {
        assert!((mutuality_factor(10, 10) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mutuality_imbalanced() {
        // 2*min/(sum) = 2*2/10
        assert!((mutuality_factor(8, 2) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_channels_steps() {
        assert_eq!(channels_factor(0), 0.0);
        assert_eq!(channels_factor(1), 0.4);
        assert_eq!(channels_factor(2), 0.7);
        assert_eq!(channels_factor(3), 1.0);
        assert_eq!(channels_factor(9), 1.0);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = StrengthWeights::default();
        assert!((w.recency + w.frequency + w.mutuality + w.channels - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_strength_all_max() {
        let f = StrengthFactors {
            recency: 1.0,
            frequency: 1.0,
            mutuality: 1.0,
            channels: 1.0,
        };
        assert!((calculate_strength(&f, &StrengthWeights::default()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_strength_clamps_overweighted() {
        let f = StrengthFactors {
            recency: 1.0,
            frequency: 1.0,
            mutuality: 1.0,
            channels: 1.0,
        };
        let heavy = StrengthWeights {
            recency: 1.0,
            frequency: 1.0,
            mutuality: 1.0,
            channels: 1.0,
        };
        assert_eq!(calculate_strength(&f, &heavy), 1.0);
    }

    #[test]
    fn test_factors_from_signals() {
        let now = Utc::now().naive_utc();
        let signals = crate::contact::InteractionSignals {
            first_seen_at: Some(now - Duration::days(365)),
            last_seen_at: Some(now - Duration::days(90)),
            interaction_count: 24,
            sent_count: 12,
            received_count: 12,
            channels: vec!["email".into(), "linkedin".into()],
        };
        let f = factors_from_signals(&signals, now);
        assert!((f.recency - 0.5).abs() < 1e-6);
        assert!((f.mutuality - 1.0).abs() < 1e-12);
        assert_eq!(f.channels, 0.7);
        assert!(f.frequency > 0.0 && f.frequency <= 1.0);
    }

    #[test]
    fn test_factors_no_history() {
        let now = Utc::now().naive_utc();
        let f = factors_from_signals(&crate::contact::InteractionSignals::empty(), now);
        assert_eq!(f.recency, 0.0);
        assert_eq!(f.frequency, 0.0);
        assert_eq!(f.mutuality, ONE_WAY_MUTUALITY);
        assert_eq!(f.channels, 0.0);
    }
}
