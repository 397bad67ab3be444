use crate::error::LciaError;
use crate::model::GLOBAL_LOCALE;
use crate::terms::MergeStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How to pick one conversion when several are valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// The first one found.
    First,
    /// The largest factor.
    #[default]
    Highest,
    /// The smallest factor.
    Lowest,
}

impl FromStr for Strategy {
    type Err = LciaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Strategy::First),
            "highest" => Ok(Strategy::Highest),
            "lowest" => Ok(Strategy::Lowest),
            _ => Err(LciaError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::First => write!(f, "first"),
            Strategy::Highest => write!(f, "highest"),
            Strategy::Lowest => write!(f, "lowest"),
        }
    }
}

/// Per-query knobs for the conversion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Preferred locale for factors.
    pub locale: String,
    /// Context search distance, 0 to 3.
    pub dist: u8,
    pub strategy: Strategy,
    /// Fall back to factors from other locales when nothing matches.
    pub allow_proxy: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            locale: GLOBAL_LOCALE.to_string(),
            dist: 2,
            strategy: Strategy::default(),
            allow_proxy: true,
        }
    }
}

impl QueryOptions {
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_dist(mut self, dist: u8) -> Self {
        self.dist = dist.min(3);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Engine-wide settings, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Origin recorded on factors derived by the engine itself.
    pub origin: String,
    /// Refuse conflicting factors within a context.
    pub strict_clookup: bool,
    pub merge_strategy: MergeStrategy,
    pub query: QueryOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin: "local.lcia".to_string(),
            strict_clookup: true,
            merge_strategy: MergeStrategy::default(),
            query: QueryOptions::default(),
        }
    }
}

/// Load engine settings from a JSON file.
pub fn load_config(path: &Path) -> Result<EngineConfig, LciaError> {
    let content = std::fs::read_to_string(path).map_err(|e| LciaError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: EngineConfig = serde_json::from_str(&content).map_err(|e| LciaError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if config.query.dist > 3 {
        return Err(LciaError::ConfigLoad {
            path: path.to_path_buf(),
            reason: format!("dist must be between 0 and 3, got {}", config.query.dist),
        });
    }
    Ok(config)
}

/// Parse engine settings from a JSON string.
pub fn parse_config_str(json: &str) -> Result<EngineConfig, LciaError> {
    let config: EngineConfig = serde_json::from_str(json)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = parse_config_str("{}").unwrap();
        assert!(config.strict_clookup);
        assert_eq!(config.query.locale, "GLO");
        assert_eq!(config.query.dist, 2);
        assert_eq!(config.query.strategy, Strategy::Highest);
        assert!(config.query.allow_proxy);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{ "merge_strategy": "prune", "query": { "strategy": "lowest", "locale": "US" } }"#;
        let config = parse_config_str(json).unwrap();
        assert_eq!(config.merge_strategy, MergeStrategy::Prune);
        assert_eq!(config.query.strategy, Strategy::Lowest);
        assert_eq!(config.query.locale, "US");
        assert_eq!(config.query.dist, 2);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Highest".parse::<Strategy>().unwrap(), Strategy::Highest);
        assert_eq!("first".parse::<Strategy>().unwrap(), Strategy::First);
        assert!(matches!(
            "median".parse::<Strategy>(),
            Err(LciaError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "strict_clookup": false }}"#).unwrap();
        let config = load_config(file.path()).unwrap();
        assert!(!config.strict_clookup);
    }

    #[test]
    fn test_load_config_bad_dist() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "query": {{ "dist": 7 }} }}"#).unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(LciaError::ConfigLoad { .. })
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Path::new("/nonexistent/lcia.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/lcia.json"));
    }
}
