//! Configuration for the trade workflow node

use crate::access::{AccessGate, CredentialTable, ExportingEntityMode};
use crate::payment::InsufficientFundsPolicy;
use serde::{Deserialize, Serialize};

/// Trade workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Ledger configuration
    pub ledger: ledger_core::Config,

    /// Access control configuration
    pub access: AccessConfig,

    /// Payment settlement configuration
    pub payment: PaymentConfig,

    /// Workflow configuration
    pub workflow: WorkflowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "trade-workflow".to_string(),
            ledger: ledger_core::Config {
                data_dir: "./data/trade-ledger".into(),
                service_name: "trade-ledger".to_string(),
                ..Default::default()
            },
            access: AccessConfig::default(),
            payment: PaymentConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

/// Access control configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Skip identity lookup and authorization entirely.
    ///
    /// Never read from the environment; must be set in a config file.
    pub test_mode: bool,

    /// Which organization plays the exporting-entity role
    pub exporting_entity: ExportingEntityMode,

    /// Role credentials
    pub credentials: CredentialTable,
}

impl AccessConfig {
    /// Build the access gate
    pub fn gate(&self) -> AccessGate {
        if self.test_mode {
            AccessGate::Bypass
        } else {
            AccessGate::enforced(self.credentials.clone(), self.exporting_entity)
        }
    }
}

/// Payment settlement configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// What to do when the importer balance cannot cover a tranche
    pub insufficient_funds: InsufficientFundsPolicy,
}

/// Workflow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Reject `requestTrade` on an identifier that is already in use
    pub reject_duplicate_trades: bool,
}

impl Config {
    /// Configuration with an in-memory ledger
    pub fn in_memory() -> Self {
        let mut config = Config::default();
        config.ledger.backend = ledger_core::StorageBackend::Memory;
        config
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.ledger.apply_env()?;

        if let Ok(mode) = std::env::var("TRADE_EXPORTING_ENTITY_MODE") {
            config.access.exporting_entity = ExportingEntityMode::parse(&mode).ok_or_else(|| {
                crate::Error::Config(format!("Unknown exporting entity mode: {}", mode))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_enforces_access() {
        let config = Config::default();
        assert!(!config.access.test_mode);
        assert!(!config.access.gate().is_bypass());
        assert_eq!(config.payment.insufficient_funds, InsufficientFundsPolicy::Warn);
        assert!(!config.workflow.reject_duplicate_trades);
    }

    #[test]
    fn test_toml_sections() {
        let config: Config = toml::from_str(
            r#"
            [ledger]
            backend = "memory"

            [access]
            test_mode = true
            exporting_entity = "exporter"

            [payment]
            insufficient_funds = "reject"

            [workflow]
            reject_duplicate_trades = true
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.backend, ledger_core::StorageBackend::Memory);
        assert!(config.access.gate().is_bypass());
        assert_eq!(config.access.exporting_entity, ExportingEntityMode::Exporter);
        assert_eq!(config.payment.insufficient_funds, InsufficientFundsPolicy::Reject);
        assert!(config.workflow.reject_duplicate_trades);
        assert_eq!(config.access.credentials, CredentialTable::default());
    }
}
