//! Chain configuration

use crate::error::{LedgerError, LedgerResult};
use fugue_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chain parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain ID exposed to contracts
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Timestamp of the genesis block
    #[serde(default = "default_genesis_timestamp")]
    pub genesis_timestamp: u64,
    /// Seconds between consecutive blocks
    #[serde(default = "default_block_interval")]
    pub block_interval: u64,
    /// Block producer, credited with consumed gas (hex address)
    #[serde(default = "default_producer")]
    pub producer: String,
    /// Largest gas limit a single action may carry
    #[serde(default = "default_action_gas_limit")]
    pub action_gas_limit: u64,
    /// Largest total gas limit of the actions in one block
    #[serde(default = "default_block_gas_limit")]
    pub block_gas_limit: u64,
    /// Delegates producing blocks in one sub-epoch
    #[serde(default = "default_num_delegates")]
    pub num_delegates: u64,
    /// Sub-epochs per epoch
    #[serde(default = "default_num_sub_epochs")]
    pub num_sub_epochs: u64,
}

fn default_chain_id() -> u64 {
    1
}

fn default_genesis_timestamp() -> u64 {
    1_546_329_600
}

fn default_block_interval() -> u64 {
    10
}

fn default_producer() -> String {
    "0x000000000000000000000000000000000000beef".to_string()
}

fn default_action_gas_limit() -> u64 {
    5_000_000
}

fn default_block_gas_limit() -> u64 {
    20_000_000
}

fn default_num_delegates() -> u64 {
    24
}

fn default_num_sub_epochs() -> u64 {
    1
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            genesis_timestamp: default_genesis_timestamp(),
            block_interval: default_block_interval(),
            producer: default_producer(),
            action_gas_limit: default_action_gas_limit(),
            block_gas_limit: default_block_gas_limit(),
            num_delegates: default_num_delegates(),
            num_sub_epochs: default_num_sub_epochs(),
        }
    }
}

impl ChainConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| LedgerError::Config(format!("invalid chain config: {err}")))
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            LedgerError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Parsed producer address
    pub fn producer_address(&self) -> LedgerResult<Address> {
        Address::from_hex(&self.producer)
            .map_err(|err| LedgerError::Config(format!("invalid producer address: {err}")))
    }

    /// Reject parameters the ledger cannot run with
    pub fn validate(&self) -> LedgerResult<()> {
        self.producer_address()?;
        self.num_delegates
            .max(1)
            .checked_mul(self.num_sub_epochs.max(1))
            .ok_or_else(|| {
                LedgerError::Config(format!(
                    "epoch length overflows: {} delegates x {} sub-epochs",
                    self.num_delegates, self.num_sub_epochs
                ))
            })?;
        Ok(())
    }

    /// Timestamp of the block at `height` on the logical clock
    pub fn timestamp_at(&self, height: u64) -> LedgerResult<u64> {
        height
            .checked_mul(self.block_interval)
            .and_then(|offset| offset.checked_add(self.genesis_timestamp))
            .ok_or_else(|| {
                LedgerError::Config(format!("timestamp of block {height} overflows"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ChainConfig::default();
        assert_eq!(config.action_gas_limit, 5_000_000);
        assert_eq!(config.block_gas_limit, 20_000_000);
        assert!(config.producer_address().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ChainConfig::from_json_str(r#"{ "chain_id": 4689, "block_interval": 5 }"#)
            .unwrap();
        assert_eq!(config.chain_id, 4689);
        assert_eq!(config.block_interval, 5);
        assert_eq!(config.num_delegates, 24);
    }

    #[test]
    fn test_logical_clock() {
        let config = ChainConfig::default();
        assert_eq!(config.timestamp_at(0).unwrap(), config.genesis_timestamp);
        assert_eq!(config.timestamp_at(3).unwrap(), config.genesis_timestamp + 30);
    }

    #[test]
    fn test_logical_clock_overflow() {
        let config = ChainConfig {
            block_interval: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.timestamp_at(0).unwrap(), config.genesis_timestamp);
        assert!(matches!(config.timestamp_at(1), Err(LedgerError::Config(_))));
        assert!(matches!(config.timestamp_at(2), Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_validate_epoch_length() {
        assert!(ChainConfig::default().validate().is_ok());
        let config = ChainConfig {
            num_delegates: u64::MAX,
            num_sub_epochs: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
        let config = ChainConfig {
            num_delegates: u64::MAX,
            num_sub_epochs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_producer() {
        let config = ChainConfig {
            producer: "0x1234".to_string(),
            ..Default::default()
        };
        assert!(config.producer_address().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "action_gas_limit": 8000000 }"#).unwrap();
        let config = ChainConfig::load(file.path()).unwrap();
        assert_eq!(config.action_gas_limit, 8_000_000);
        assert_eq!(config.chain_id, 1);
    }
}
