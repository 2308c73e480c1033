//! Contract execution action

use crate::codec::append_signed;
use bytes::Bytes;
use fugue_crypto::keccak256;
use fugue_primitives::{Address, AddressError, H256};
use num_bigint::BigInt;
use rlp::RlpStream;

/// Contract string of an execution that deploys a new contract
pub const EMPTY_ADDRESS: &str = "";

/// Deploys a contract (empty `contract`) or invokes the contract at
/// `contract` with `data` as call input.
///
/// `contract` stays a string until validation so that malformed targets are
/// rejected by the execution protocol rather than at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    contract: String,
    nonce: u64,
    amount: BigInt,
    gas_limit: u64,
    gas_price: BigInt,
    data: Bytes,
}

impl Execution {
    /// Create a new execution action
    pub fn new(
        contract: impl Into<String>,
        nonce: u64,
        amount: BigInt,
        gas_limit: u64,
        gas_price: BigInt,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            contract: contract.into(),
            nonce,
            amount,
            gas_limit,
            gas_price,
            data: data.into(),
        }
    }

    /// Target contract as given
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// True if this execution creates a contract
    pub fn is_deployment(&self) -> bool {
        self.contract.is_empty()
    }

    /// Parsed target address; `None` for a deployment
    pub fn contract_address(&self) -> Result<Option<Address>, AddressError> {
        if self.is_deployment() {
            return Ok(None);
        }
        Address::from_hex(&self.contract).map(Some)
    }

    /// Action nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Value transferred to the contract
    pub fn amount(&self) -> &BigInt {
        &self.amount
    }

    /// Maximum gas the action may consume
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Price paid per unit of gas
    pub fn gas_price(&self) -> &BigInt {
        &self.gas_price
    }

    /// Init code for deployments, call data for invocations
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Content hash of the action fields
    pub fn hash(&self) -> H256 {
        let mut stream = RlpStream::new();
        self.append_fields(&mut stream);
        keccak256(&stream.out())
    }

    pub(crate) fn append_fields(&self, stream: &mut RlpStream) {
        stream.begin_list(6);
        stream.append(&self.nonce);
        stream.append(&self.gas_limit);
        append_signed(stream, &self.gas_price);
        stream.append(&self.contract);
        append_signed(stream, &self.amount);
        stream.append(&self.data.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution(contract: &str, amount: i64) -> Execution {
        Execution::new(
            contract,
            1,
            BigInt::from(amount),
            100_000,
            BigInt::from(0),
            vec![0x60, 0x00],
        )
    }

    #[test]
    fn test_deployment_has_no_address() {
        let exec = execution(EMPTY_ADDRESS, 0);
        assert!(exec.is_deployment());
        assert_eq!(exec.contract_address().unwrap(), None);
    }

    #[test]
    fn test_invocation_parses_address() {
        let exec = execution("0x1111111111111111111111111111111111111111", 0);
        assert_eq!(
            exec.contract_address().unwrap(),
            Some(Address::from_bytes([0x11; 20]))
        );
    }

    #[test]
    fn test_invalid_address_kept_until_parsed() {
        let exec = execution("0x1111111111111111111111111111111111111111bbb", 0);
        assert!(!exec.is_deployment());
        assert!(exec.contract_address().is_err());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = execution(EMPTY_ADDRESS, 5);
        assert_eq!(base.hash(), execution(EMPTY_ADDRESS, 5).hash());
        assert_ne!(base.hash(), execution(EMPTY_ADDRESS, -5).hash());
        assert_ne!(
            base.hash(),
            execution("0x1111111111111111111111111111111111111111", 5).hash()
        );
        let other_data = Execution::new(
            EMPTY_ADDRESS,
            1,
            BigInt::from(5),
            100_000,
            BigInt::from(0),
            vec![0x60, 0x01],
        );
        assert_ne!(base.hash(), other_data.hash());
    }
}
