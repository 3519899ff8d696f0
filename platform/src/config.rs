//! Platform configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tradefin_escrow::EscrowParams;
use tradefin_governance::GovernanceParams;
use tradefin_nullables::NullStore;
use tradefin_pga::PgaParams;
use tradefin_registry::RegistryParams;
use tradefin_staking::StakingParams;
use tradefin_store::{KvStore, StoreError};
use tradefin_store_lmdb::{check_integrity, LmdbStore};
use tradefin_types::Address;

use crate::error::PlatformError;
use crate::logging::LogFormat;

/// Configuration for a platform instance.
///
/// Every field has a default, so an empty file is a valid in-memory
/// configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,tradefin_escrow=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub genesis: GenesisConfig,

    #[serde(default)]
    pub staking: StakingParams,

    #[serde(default)]
    pub governance: GovernanceParams,

    #[serde(default)]
    pub escrow: EscrowParams,

    #[serde(default)]
    pub pga: PgaParams,

    #[serde(default)]
    pub registry: RegistryParams,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Volatile; everything is lost on drop.
    Memory,
    Lmdb {
        path: PathBuf,
        #[serde(default = "default_map_size")]
        map_size: usize,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// State written once into an empty store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Hex address of the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default)]
    pub countries: Vec<String>,

    #[serde(default)]
    pub currencies: Vec<String>,

    /// Hex token addresses.
    #[serde(default)]
    pub tokens: Vec<String>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_map_size() -> usize {
    tradefin_store_lmdb::environment::DEFAULT_MAP_SIZE
}

// ── Impl ───────────────────────────────────────────────────────────────

impl PlatformConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, PlatformError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PlatformError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, PlatformError> {
        toml::from_str(s).map_err(|e| PlatformError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, PlatformError> {
        toml::to_string_pretty(self).map_err(|e| PlatformError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, PlatformError> {
        self.log_format.parse()
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            storage: StorageConfig::default(),
            genesis: GenesisConfig::default(),
            staking: StakingParams::default(),
            governance: GovernanceParams::default(),
            escrow: EscrowParams::default(),
            pga: PgaParams::default(),
            registry: RegistryParams::default(),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend.
    pub fn open(&self) -> Result<Box<dyn KvStore>, PlatformError> {
        match self {
            Self::Memory => Ok(Box::new(NullStore::new())),
            Self::Lmdb { path, map_size } => {
                let store = LmdbStore::open(path, *map_size).map_err(StoreError::from)?;
                let report = check_integrity(store.env()).map_err(StoreError::from)?;
                if !report.is_healthy() {
                    let mut problems = report.errors;
                    problems.extend(report.missing.iter().map(|name| format!("missing database {name}")));
                    return Err(StoreError::Corruption(problems.join("; ")).into());
                }
                tracing::info!(
                    path = %path.display(),
                    map_size,
                    entries = report.total_entries,
                    "opened lmdb store"
                );
                Ok(Box::new(store))
            }
        }
    }
}

impl GenesisConfig {
    pub fn owner_address(&self) -> Result<Option<Address>, PlatformError> {
        self.owner.as_deref().map(parse_address).transpose()
    }

    pub fn token_addresses(&self) -> Result<Vec<Address>, PlatformError> {
        self.tokens.iter().map(|t| parse_address(t)).collect()
    }
}

fn parse_address(s: &str) -> Result<Address, PlatformError> {
    Address::from_hex(s.trim()).map_err(|e| PlatformError::Config(format!("bad address {s}: {e}")))
}
