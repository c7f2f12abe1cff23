use serde::{Deserialize, Serialize};
use std::{fmt::Display, fs, path::Path, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown join mode '{0}' (expected cost, block, hash, merge, product or index)")]
    UnknownJoinMode(String),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which join algorithm the table planner uses.
/// `Cost` compares the estimates of every applicable algorithm; the others
/// force one algorithm regardless of cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    #[default]
    Cost,
    Block,
    Hash,
    Merge,
    Product,
    Index,
}

impl FromStr for JoinMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cost" => Ok(JoinMode::Cost),
            "block" => Ok(JoinMode::Block),
            "hash" => Ok(JoinMode::Hash),
            "merge" => Ok(JoinMode::Merge),
            "product" => Ok(JoinMode::Product),
            "index" => Ok(JoinMode::Index),
            _ => Err(ConfigError::UnknownJoinMode(s.to_string())),
        }
    }
}

impl Display for JoinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinMode::Cost => "cost",
            JoinMode::Block => "block",
            JoinMode::Hash => "hash",
            JoinMode::Merge => "merge",
            JoinMode::Product => "product",
            JoinMode::Index => "index",
        };
        write!(f, "{}", name)
    }
}

/// Planner settings, passed explicitly to every planner that needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub join_mode: JoinMode,
    /// When false, a table that no join predicate connects is an error
    /// instead of being folded in with a Cartesian product.
    pub allow_product: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            join_mode: JoinMode::Cost,
            allow_product: true,
        }
    }
}

impl ExecConfig {
    pub fn with_join_mode(mut self, join_mode: JoinMode) -> Self {
        self.join_mode = join_mode;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_every_join_mode() {
        for (name, mode) in [
            ("cost", JoinMode::Cost),
            ("block", JoinMode::Block),
            ("hash", JoinMode::Hash),
            ("merge", JoinMode::Merge),
            ("product", JoinMode::Product),
            ("index", JoinMode::Index),
        ] {
            assert_eq!(name.parse::<JoinMode>().unwrap(), mode);
            assert_eq!(mode.to_string(), name);
        }
        assert_eq!("HASH".parse::<JoinMode>().unwrap(), JoinMode::Hash);
    }

    #[test]
    fn should_reject_unknown_join_mode() {
        let err = "nested".parse::<JoinMode>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownJoinMode(name) if name == "nested"));
    }

    #[test]
    fn should_default_to_cost_based() {
        let config = ExecConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExecConfig::default());
        assert_eq!(config.join_mode, JoinMode::Cost);
        assert!(config.allow_product);
    }

    #[test]
    fn should_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exec.toml");
        fs::write(&path, "join_mode = \"merge\"\nallow_product = false\n").unwrap();
        let config = ExecConfig::load(&path).unwrap();
        assert_eq!(config.join_mode, JoinMode::Merge);
        assert!(!config.allow_product);
    }

    #[test]
    fn should_reject_bad_toml_join_mode() {
        assert!(ExecConfig::from_toml_str("join_mode = \"sideways\"").is_err());
    }
}
