//! Node configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use warden_authz::{EngineConfig, GcConfig};
use warden_vault::JwtConfig;

/// Complete node configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    pub node: NodeSection,

    #[serde(default)]
    pub storage: StorageSection,

    pub fixtures: FixturesSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub gc: GcConfig,

    #[serde(default)]
    pub multipass: MultipassSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSection {
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Auth method reported to policy programs by `check`
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSection {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// JSON files the engine is served from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixturesSection {
    /// Tenants, projects, roles, groups, bindings and sharings
    pub grants: PathBuf,
    /// Array of policy programs
    pub policies: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,
    #[serde(default = "default_true")]
    pub enable_program_cache: bool,
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            artifact_prefix: default_artifact_prefix(),
            enable_program_cache: true,
            enable_metrics: true,
        }
    }
}

impl From<&EngineSection> for EngineConfig {
    fn from(section: &EngineSection) -> Self {
        EngineConfig {
            artifact_prefix: section.artifact_prefix.clone(),
            enable_program_cache: section.enable_program_cache,
            enable_metrics: section.enable_metrics,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MultipassSection {
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_issuer")]
    pub audience: String,
    /// Environment variable holding the HS256 key
    #[serde(default = "default_key_env")]
    pub key_env: String,
    /// Used when `multipass create` gets no `--ttl`
    #[serde(default = "default_multipass_ttl")]
    pub default_ttl_secs: u64,
}

impl Default for MultipassSection {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: default_issuer(),
            key_env: default_key_env(),
            default_ttl_secs: default_multipass_ttl(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_auth_method() -> String { "multipass".to_string() }
fn default_storage_path() -> PathBuf { PathBuf::from("db") }
fn default_artifact_prefix() -> String { "warden".to_string() }
fn default_issuer() -> String { "warden".to_string() }
fn default_key_env() -> String { "WARDEN_MULTIPASS_KEY".to_string() }
fn default_multipass_ttl() -> u64 { 24 * 3600 }

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl NodeConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read configuration file {:?}", path.as_ref()))?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.node.log_level.as_str()) {
            anyhow::bail!("Log level must be one of {}", LOG_LEVELS.join(", "));
        }

        if self.node.auth_method.is_empty() {
            anyhow::bail!("Auth method must not be empty");
        }

        // Artifact names are split on `_till_` to recover their expiry
        if self.engine.artifact_prefix.is_empty() || self.engine.artifact_prefix.contains("_till_") {
            anyhow::bail!("Artifact prefix must be non-empty and must not contain '_till_'");
        }

        if self.gc.batch_size == 0 {
            anyhow::bail!("GC batch size must be at least 1");
        }

        if self.gc.period.is_zero() {
            anyhow::bail!("GC period must be positive");
        }

        if self.multipass.key_env.is_empty() {
            anyhow::bail!("Multipass key_env must name an environment variable");
        }

        if self.multipass.default_ttl_secs == 0 {
            anyhow::bail!("Multipass default ttl must be positive");
        }

        Ok(())
    }

    /// Token issuer settings with the key taken from the environment
    pub fn jwt_config(&self) -> Result<JwtConfig> {
        let key = std::env::var(&self.multipass.key_env)
            .with_context(|| format!("Environment variable {} is not set", self.multipass.key_env))?;

        Ok(JwtConfig {
            issuer: self.multipass.issuer.clone(),
            audience: self.multipass.audience.clone(),
            key,
        })
    }

    /// Get absolute data directory path
    pub fn data_dir(&self) -> PathBuf {
        if self.node.data_dir.is_absolute() {
            self.node.data_dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.node.data_dir)
        }
    }

    /// Get absolute storage path
    pub fn storage_path(&self) -> PathBuf {
        self.under_data_dir(&self.storage.path)
    }

    /// sled database of the downstream artifact registry
    pub fn artifacts_path(&self) -> PathBuf {
        self.storage_path().join("artifacts")
    }

    /// sled database of multipasses and their generations
    pub fn credentials_path(&self) -> PathBuf {
        self.storage_path().join("credentials")
    }

    pub fn grants_path(&self) -> PathBuf {
        self.under_data_dir(&self.fixtures.grants)
    }

    pub fn policies_path(&self) -> PathBuf {
        self.under_data_dir(&self.fixtures.policies)
    }

    fn under_data_dir(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MINIMAL: &str = r#"
        [node]
        data_dir = "/var/lib/warden"

        [fixtures]
        grants = "grants.json"
        policies = "/etc/warden/policies.json"
    "#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = NodeConfig::parse(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.node.log_level, "info");
        assert_eq!(config.engine.artifact_prefix, "warden");
        assert_eq!(config.gc.period, Duration::from_secs(300));
        assert_eq!(config.gc.batch_size, 50);
        assert_eq!(config.multipass.key_env, "WARDEN_MULTIPASS_KEY");

        assert_eq!(config.storage_path(), PathBuf::from("/var/lib/warden/db"));
        assert_eq!(config.artifacts_path(), PathBuf::from("/var/lib/warden/db/artifacts"));
        assert_eq!(config.grants_path(), PathBuf::from("/var/lib/warden/grants.json"));
        assert_eq!(config.policies_path(), PathBuf::from("/etc/warden/policies.json"));
    }

    #[test]
    fn test_gc_section_in_seconds() {
        let contents = format!("{}\n[gc]\nperiod = 60\nbatch_size = 10\n", MINIMAL);
        let config = NodeConfig::parse(&contents).unwrap();

        assert_eq!(config.gc.period, Duration::from_secs(60));
        assert_eq!(config.gc.batch_size, 10);
        assert_eq!(config.gc.unreachable_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = NodeConfig::parse(MINIMAL).unwrap();
        config.engine.artifact_prefix = "a_till_b".into();
        assert!(config.validate().is_err());

        let mut config = NodeConfig::parse(MINIMAL).unwrap();
        config.gc.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::parse(MINIMAL).unwrap();
        config.node.log_level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_fixtures_section_fails_to_parse() {
        assert!(NodeConfig::parse("[node]\ndata_dir = \"/tmp\"\n").is_err());
    }

    #[test]
    fn test_engine_config_from_section() {
        let section = EngineSection {
            artifact_prefix: "ssh".into(),
            enable_program_cache: false,
            enable_metrics: true,
        };
        let engine = EngineConfig::from(&section);
        assert_eq!(engine.artifact_prefix, "ssh");
        assert!(!engine.enable_program_cache);
    }
}
