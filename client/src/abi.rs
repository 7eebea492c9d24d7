//! Tezoro contract ABIs.
//!
//! Calls to the service contract and the backup contract are encoded and
//! decoded with `ethers::abi`. Values cross into the rest of the crate as
//! `alloy-primitives` types.

use crate::error::{Result, TezoroError};
use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use ethers::abi::{Abi, Event, Function, RawLog, Token};
use ethers::types::{H160, H256, U256 as AbiUint};
use std::sync::OnceLock;

/// Function selector
pub type Selector = FixedBytes<4>;

/// `TezoroService` ABI fragment used by the client
pub const TEZORO_SERVICE_ABI: &str = r#"[
    {
        "type": "function",
        "name": "deployBackupContract",
        "stateMutability": "payable",
        "inputs": [
            {"name": "_beneficiary1", "type": "address"},
            {"name": "_share1", "type": "uint256"},
            {"name": "_beneficiary2", "type": "address"},
            {"name": "_share2", "type": "uint256"},
            {"name": "_beneficiary3", "type": "address"},
            {"name": "_share3", "type": "uint256"},
            {"name": "_beneficiary4", "type": "address"},
            {"name": "_tokenAddress", "type": "address"},
            {"name": "_executor", "type": "address"},
            {"name": "_userHash", "type": "bytes32"},
            {"name": "_metaId", "type": "bytes32"}
        ],
        "outputs": []
    },
    {
        "type": "event",
        "name": "DeployedBackupContract",
        "anonymous": false,
        "inputs": [
            {"name": "backupContract", "type": "address", "indexed": true},
            {"name": "deployer", "type": "address", "indexed": true},
            {"name": "userHash", "type": "bytes32", "indexed": false},
            {"name": "metaId", "type": "bytes32", "indexed": false}
        ]
    }
]"#;

/// Backup contract ABI fragment used by the client
pub const BACKUP_CONTRACT_ABI: &str = r#"[
    {
        "type": "function",
        "name": "changeState",
        "stateMutability": "nonpayable",
        "inputs": [{"name": "_state", "type": "uint8"}],
        "outputs": []
    },
    {
        "type": "function",
        "name": "state",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{"name": "", "type": "uint8"}]
    },
    {
        "type": "function",
        "name": "timestamp",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{"name": "", "type": "uint256"}]
    },
    {
        "type": "function",
        "name": "delay",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{"name": "", "type": "uint256"}]
    },
    {
        "type": "function",
        "name": "initTimestamp",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{"name": "", "type": "uint256"}]
    },
    {
        "type": "function",
        "name": "owner",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{"name": "", "type": "address"}]
    },
    {
        "type": "function",
        "name": "tokenAddress",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{"name": "", "type": "address"}]
    }
]"#;

/// `TezoroService.deployBackupContract`
pub const DEPLOY_BACKUP_CONTRACT: &str = "deployBackupContract";

/// Backup contract state transition
pub const CHANGE_STATE: &str = "changeState";

/// Emitted by the service contract for every deployed backup
pub const DEPLOYED_BACKUP_CONTRACT: &str = "DeployedBackupContract";

/// Backup contract getters
pub mod getters {
    /// `state()`
    pub const STATE: &str = "state";
    /// `timestamp()`
    pub const TIMESTAMP: &str = "timestamp";
    /// `delay()`
    pub const DELAY: &str = "delay";
    /// `initTimestamp()`
    pub const INIT_TIMESTAMP: &str = "initTimestamp";
    /// `owner()`
    pub const OWNER: &str = "owner";
    /// `tokenAddress()`
    pub const TOKEN_ADDRESS: &str = "tokenAddress";
}

static SERVICE_ABI: OnceLock<Abi> = OnceLock::new();
static BACKUP_ABI: OnceLock<Abi> = OnceLock::new();

fn load(cell: &'static OnceLock<Abi>, abi_json: &str) -> Result<&'static Abi> {
    if let Some(abi) = cell.get() {
        return Ok(abi);
    }
    let abi: Abi = serde_json::from_str(abi_json)?;
    Ok(cell.get_or_init(|| abi))
}

/// Parsed [`TEZORO_SERVICE_ABI`]
pub fn service_abi() -> Result<&'static Abi> {
    load(&SERVICE_ABI, TEZORO_SERVICE_ABI)
}

/// Parsed [`BACKUP_CONTRACT_ABI`]
pub fn backup_abi() -> Result<&'static Abi> {
    load(&BACKUP_ABI, BACKUP_CONTRACT_ABI)
}

/// A service contract function by name
pub fn service_function(name: &str) -> Result<&'static Function> {
    Ok(service_abi()?.function(name)?)
}

/// A backup contract function by name
pub fn backup_function(name: &str) -> Result<&'static Function> {
    Ok(backup_abi()?.function(name)?)
}

/// The `DeployedBackupContract` event
pub fn deployed_backup_event() -> Result<&'static Event> {
    Ok(service_abi()?.event(DEPLOYED_BACKUP_CONTRACT)?)
}

/// Selector of `function`
pub fn selector(function: &Function) -> Selector {
    Selector::from(function.short_signature())
}

/// Encode a call to `function`
pub fn encode_call(function: &Function, args: &[Token]) -> Result<Bytes> {
    Ok(Bytes::from(function.encode_input(args)?))
}

/// Decode the arguments of a call to `function`, selector included
pub fn decode_call(function: &Function, input: &[u8]) -> Result<Vec<Token>> {
    let args = input.get(4..).unwrap_or_default();
    function.decode_input(args).map_err(|e| {
        TezoroError::InvalidResponse(format!("Cannot decode {} input: {}", function.name, e))
    })
}

/// Decode the return data of `function`
pub fn decode_output(function: &Function, output: &[u8]) -> Result<Vec<Token>> {
    function.decode_output(output).map_err(|e| {
        TezoroError::InvalidResponse(format!("Cannot decode {} output: {}", function.name, e))
    })
}

/// First value of decoded return data or call arguments
pub fn single_token(tokens: Vec<Token>) -> Result<Token> {
    tokens
        .into_iter()
        .next()
        .ok_or_else(|| TezoroError::InvalidResponse("Empty ABI value list".to_string()))
}

/// Decode a log of `event`, or `None` when topic0 does not match
pub fn parse_event_log(event: &Event, topics: &[B256], data: &[u8]) -> Option<Vec<(String, Token)>> {
    let topic0 = event.signature();
    let topics: Vec<H256> = topics.iter().map(|topic| H256::from(topic.0)).collect();
    if topics.first() != Some(&topic0) {
        return None;
    }

    let raw_log = RawLog {
        topics,
        data: data.to_vec(),
    };
    event
        .parse_log(raw_log)
        .ok()
        .map(|log| log.params.into_iter().map(|param| (param.name, param.value)).collect())
}

/// Topic0 of `event`
pub fn event_topic(event: &Event) -> B256 {
    B256::from(event.signature().0)
}

/// `address` token
pub fn address_token(address: Address) -> Token {
    Token::Address(H160::from_slice(address.as_slice()))
}

/// `uint<N>` token
pub fn uint_token(value: U256) -> Token {
    Token::Uint(AbiUint::from_big_endian(&value.to_be_bytes::<32>()))
}

/// `bytes32` token
pub fn bytes32_token(word: B256) -> Token {
    Token::FixedBytes(word.to_vec())
}

fn unexpected(expected: &str, token: &Token) -> TezoroError {
    TezoroError::InvalidResponse(format!("Expected {}, got {:?}", expected, token))
}

/// Address from an `address` token
pub fn token_to_address(token: &Token) -> Result<Address> {
    match token {
        Token::Address(address) => Ok(Address::from_slice(address.as_bytes())),
        other => Err(unexpected("address", other)),
    }
}

/// Integer from a `uint<N>` token
pub fn token_to_uint(token: &Token) -> Result<U256> {
    match token {
        Token::Uint(value) => {
            let mut bytes = [0u8; 32];
            value.to_big_endian(&mut bytes);
            Ok(U256::from_be_bytes(bytes))
        }
        other => Err(unexpected("uint", other)),
    }
}

/// `uint<N>` token that must fit in `u64`
pub fn token_to_u64(token: &Token) -> Result<u64> {
    let value = token_to_uint(token)?;
    u64::try_from(value)
        .map_err(|_| TezoroError::InvalidResponse(format!("Value {} does not fit in u64", value)))
}

/// Backup state code from a `uint8` token.
///
/// A value outside `u8` is an unknown state, saturated at `u64::MAX`.
pub fn token_to_state_code(token: &Token) -> Result<u8> {
    let value = token_to_uint(token)?;
    u8::try_from(value).map_err(|_| {
        TezoroError::UnknownBackupState(u64::try_from(value).unwrap_or(u64::MAX))
    })
}

/// Word from a `bytes32` token
pub fn token_to_bytes32(token: &Token) -> Result<B256> {
    match token {
        Token::FixedBytes(bytes) if bytes.len() == 32 => Ok(B256::from_slice(bytes)),
        other => Err(unexpected("bytes32", other)),
    }
}
