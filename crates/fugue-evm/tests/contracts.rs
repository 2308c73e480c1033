//! Compiled contracts driven through the frame executor

use bytes::Bytes;
use fugue_crypto::create_address;
use fugue_evm::{
    BlockContext, CallKind, CallRequest, CreateRequest, CreateScheme, Evm, ExitStatus, Host,
    TxContext,
};
use fugue_primitives::{Address, H256, U256};
use fugue_storage::{StateFactory, StateReader, WorkingSet};

// set(uint256) / get() storage contract
const STORAGE: &str = "608060405234801561001057600080fd5b5060df8061001f6000396000f3006080604052600436106049576000357c0100000000000000000000000000000000000000000000000000000000900463ffffffff16806360fe47b114604e5780636d4ce63c146078575b600080fd5b348015605957600080fd5b5060766004803603810190808035906020019092919050505060a0565b005b348015608357600080fd5b50608a60aa565b6040518082815260200191505060405180910390f35b8060008190555050565b600080549050905600a165627a7a7230582002faabbefbbda99b20217cf33cb8ab8100caf1542bf1f48117d72e2c59139aea0029";

// sum(uint256,uint256)
const SIMPLE_SUM: &str = "608060405234801561001057600080fd5b5060c58061001f6000396000f300608060405260043610603f576000357c0100000000000000000000000000000000000000000000000000000000900463ffffffff168063cad0899b146044575b600080fd5b348015604f57600080fd5b5060766004803603810190808035906020019092919080359060200190929190505050608c565b6040518082815260200191505060405180910390f35b60008183019050929150505600a165627a7a72305820b6506f4075e1d6b6a02a720b45c6cb465437e8ad240dc65eb6377a92889e6e020029";

fn owner() -> Address {
    Address::from_bytes([0x11; 20])
}

fn funded() -> WorkingSet {
    let mut ws = StateFactory::new().new_working_set();
    ws.load_or_create_account(&owner(), U256::from(10u64).pow(U256::from(18u64)))
        .unwrap();
    ws
}

fn deploy(evm: &mut Evm<'_>, code_hex: &str) -> Address {
    let outcome = evm.create(CreateRequest {
        scheme: CreateScheme::Create,
        caller: owner(),
        value: U256::zero(),
        init_code: Bytes::from(hex::decode(code_hex).unwrap()),
        gas: 2_000_000,
        depth: 0,
    });
    assert!(outcome.result.is_success(), "{:?}", outcome.result.status);
    outcome.address.unwrap()
}

fn call(evm: &mut Evm<'_>, to: Address, input_hex: &str, value: u64) -> fugue_evm::ExecutionResult {
    evm.call(CallRequest {
        kind: CallKind::Call,
        caller: owner(),
        address: to,
        code_address: to,
        value: U256::from(value),
        input: Bytes::from(hex::decode(input_hex).unwrap()),
        gas: 1_000_000,
        is_static: false,
        depth: 0,
    })
}

fn word(value: u64) -> String {
    format!("{value:064x}")
}

#[test]
fn test_storage_contract_set_and_get() {
    let mut ws = funded();
    let mut evm = Evm::new(&mut ws, BlockContext::default(), TxContext::default());
    let contract = deploy(&mut evm, STORAGE);
    assert_eq!(contract, create_address(&owner(), 0));

    let set = call(&mut evm, contract, &format!("60fe47b1{}", word(15)), 0);
    assert!(set.is_success());
    assert!(set.output.is_empty());

    let get = call(&mut evm, contract, "6d4ce63c", 0);
    assert!(get.is_success());
    assert_eq!(hex::encode(&get.output), word(15));

    let stored = ws.storage(&contract, &H256::ZERO);
    assert_eq!(stored.as_bytes()[31], 15);
    let code = hex::decode(STORAGE).unwrap();
    assert_eq!(ws.code(&contract).as_ref(), &code[31..]);
}

#[test]
fn test_storage_contract_rejects_value() {
    let mut ws = funded();
    let mut evm = Evm::new(&mut ws, BlockContext::default(), TxContext::default());
    let contract = deploy(&mut evm, STORAGE);

    // set() is not payable
    let result = call(&mut evm, contract, &format!("60fe47b1{}", word(15)), 5);
    assert_eq!(result.status, ExitStatus::Revert);
    assert!(result.gas_left > 0);
    assert_eq!(ws.balance(&contract), U256::zero());
    assert!(ws.storage(&contract, &H256::ZERO).is_zero());
}

#[test]
fn test_unknown_selector_reverts() {
    let mut ws = funded();
    let mut evm = Evm::new(&mut ws, BlockContext::default(), TxContext::default());
    let contract = deploy(&mut evm, STORAGE);
    let result = call(&mut evm, contract, "deadbeef", 0);
    assert!(result.is_revert());
}

#[test]
fn test_simple_sum() {
    let mut ws = funded();
    let mut evm = Evm::new(&mut ws, BlockContext::default(), TxContext::default());
    let contract = deploy(&mut evm, SIMPLE_SUM);
    let result = call(
        &mut evm,
        contract,
        &format!("cad0899b{}{}", word(0x3039), word(0xd431)),
        0,
    );
    assert!(result.is_success());
    assert_eq!(hex::encode(&result.output), word(0x1046a));
}

#[test]
fn test_second_deployment_uses_next_nonce() {
    let mut ws = funded();
    let mut evm = Evm::new(&mut ws, BlockContext::default(), TxContext::default());
    let first = deploy(&mut evm, STORAGE);
    let second = deploy(&mut evm, SIMPLE_SUM);
    assert_ne!(first, second);
    assert_eq!(second, create_address(&owner(), 1));
    assert_eq!(ws.nonce(&owner()), 2);
}
