//! Action receipts

use bytes::Bytes;
use fugue_primitives::{Address, H256};
use rlp::{Encodable, RlpStream};

/// Outcome sentinel of an executed action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReceiptStatus {
    /// Execution failed (reverted, halted, or ran out of gas)
    Failure = 0,
    /// Execution succeeded
    Success = 1,
}

impl From<bool> for ReceiptStatus {
    fn from(success: bool) -> Self {
        if success {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Failure
        }
    }
}

/// Log entry emitted during contract execution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// Contract that emitted the log
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<H256>,
    /// Opaque data
    pub data: Bytes,
}

impl Log {
    /// Create a new log entry
    pub fn new(address: Address, topics: Vec<H256>, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            topics,
            data: data.into(),
        }
    }
}

impl Encodable for Log {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.address);
        s.append_list::<H256, H256>(&self.topics);
        s.append(&self.data.to_vec());
    }
}

/// Record of an executed action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Hash of the sealed action
    pub action_hash: H256,
    /// Success or failure sentinel
    pub status: ReceiptStatus,
    /// Height of the block that included the action (0 for simulations)
    pub block_height: u64,
    /// Gas charged to the sender
    pub gas_consumed: u64,
    /// Created contract, for successful deployments
    pub contract_address: Option<Address>,
    /// Logs in emission order
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Create a receipt without logs or contract address
    pub fn new(action_hash: H256, status: ReceiptStatus, gas_consumed: u64) -> Self {
        Self {
            action_hash,
            status,
            block_height: 0,
            gas_consumed,
            contract_address: None,
            logs: Vec::new(),
        }
    }

    /// Set the created contract address
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }

    /// Attach logs
    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    /// Whether the action succeeded
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// Number of logs emitted
    pub fn log_count(&self) -> usize {
        self.logs.len()
    }
}

impl Encodable for Receipt {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.action_hash);
        s.append(&(self.status as u8));
        s.append(&self.block_height);
        s.append(&self.gas_consumed);
        match &self.contract_address {
            Some(address) => s.append(address),
            None => s.append_empty_data(),
        };
        s.append_list::<Log, Log>(&self.logs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_bool() {
        assert_eq!(ReceiptStatus::from(true), ReceiptStatus::Success);
        assert_eq!(ReceiptStatus::from(false), ReceiptStatus::Failure);
        assert_eq!(ReceiptStatus::Failure as u8, 0);
        assert_eq!(ReceiptStatus::Success as u8, 1);
    }

    #[test]
    fn test_receipt_builders() {
        let contract = Address::from_bytes([0x33; 20]);
        let receipt = Receipt::new(H256::ZERO, ReceiptStatus::Success, 53_000)
            .with_contract_address(contract)
            .with_logs(vec![Log::new(contract, vec![], vec![0x01])]);

        assert!(receipt.is_success());
        assert_eq!(receipt.contract_address, Some(contract));
        assert_eq!(receipt.log_count(), 1);
    }

    #[test]
    fn test_receipt_encoding_distinguishes_status() {
        let ok = Receipt::new(H256::ZERO, ReceiptStatus::Success, 21_000);
        let failed = Receipt::new(H256::ZERO, ReceiptStatus::Failure, 21_000);
        assert_ne!(rlp::encode(&ok), rlp::encode(&failed));
    }
}
