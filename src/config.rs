use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pathfinder::PathQuery;
use crate::strength::StrengthWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the contact database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Tenant used when the CLI is not told otherwise.
    #[serde(default = "default_tenant")]
    pub default_tenant: String,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub strength: StrengthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum introduction-chain length in hops.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Paths returned per search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Edges weaker than this are ignored during search.
    #[serde(default = "default_min_strength")]
    pub min_strength: f64,
}

/// Factor weights for relationship-strength scoring. Should sum to 1.0;
/// the scorer clamps its output either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrengthConfig {
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
    #[serde(default = "default_frequency_weight")]
    pub frequency: f64,
    #[serde(default = "default_mutuality_weight")]
    pub mutuality: f64,
    #[serde(default = "default_channels_weight")]
    pub channels: f64,
}

// ── defaults ──

fn default_db_path() -> String {
    "rolo.db".to_string()
}
fn default_tenant() -> String {
    "default".to_string()
}
fn default_max_hops() -> usize {
    3
}
fn default_max_results() -> usize {
    5
}
fn default_min_strength() -> f64 {
    0.3
}
fn default_recency_weight() -> f64 {
    0.35
}
fn default_frequency_weight() -> f64 {
    0.30
}
fn default_mutuality_weight() -> f64 {
    0.20
}
fn default_channels_weight() -> f64 {
    0.15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_tenant: default_tenant(),
            search: SearchConfig::default(),
            strength: StrengthConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            max_results: default_max_results(),
            min_strength: default_min_strength(),
        }
    }
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            recency: default_recency_weight(),
            frequency: default_frequency_weight(),
            mutuality: default_mutuality_weight(),
            channels: default_channels_weight(),
        }
    }
}

impl Config {
    /// Default config file path: `~/.rolo/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rolo")
            .join("config.toml")
    }

    /// Load from the default path, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Write the default config to the default path, creating `~/.rolo/`.
    pub fn write_default() -> Result<PathBuf> {
        let path = Self::default_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(&path, content)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

impl SearchConfig {
    pub fn to_query(&self) -> PathQuery {
        PathQuery {
            max_hops: self.max_hops,
            max_results: self.max_results,
            min_strength: self.min_strength,
        }
    }
}

impl StrengthConfig {
    pub fn to_weights(&self) -> StrengthWeights {
        StrengthWeights {
            recency: self.recency,
            frequency: self.frequency,
            mutuality: self.mutuality,
            channels: self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_bounds() {
        let cfg = Config::default();
        assert_eq!(cfg.search.max_hops, 3);
        assert_eq!(cfg.search.max_results, 5);
        assert_eq!(cfg.search.min_strength, 0.3);
        let w = cfg.strength.to_weights();
        assert!((w.recency + w.frequency + w.mutuality + w.channels - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str("db_path = \"/tmp/test.db\"").unwrap();
        assert_eq!(cfg.db_path, "/tmp/test.db");
        assert_eq!(cfg.default_tenant, "default");
        assert_eq!(cfg.search.max_hops, 3);
    }

    #[test]
    fn test_roundtrip() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.db_path, cfg.db_path);
        assert_eq!(back.strength.recency, cfg.strength.recency);
    }
}
