// src/types.rs
use ethers::types::{Address, BlockNumber, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Gas cost of a non-zero calldata byte since EIP-2028.
pub const DEFAULT_GTX_DATA_NON_ZERO: u64 = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasData {
    pub gas_limit: U256,
    pub gas_price: U256,
    pub pct_relay_fee: U256,
    pub base_relay_fee: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayData {
    pub sender_address: Address,
    pub sender_nonce: U256,
    pub relay_worker: Address,
    pub paymaster: Address,
    pub forwarder: Address,
}

/// A signed meta-transaction as produced by a relay client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub target: Address,
    pub encoded_function: Bytes,
    pub gas_data: GasData,
    pub relay_data: RelayData,
}

/// Limits a paymaster declares for the calls it sponsors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasLimits {
    pub acceptance_budget: U256,
    pub pre_relayed_call_gas_limit: U256,
    pub post_relayed_call_gas_limit: U256,
    pub calldata_size_limit: U256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeInfo {
    pub stake: U256,
    pub unstake_delay: U256,
    pub withdraw_block: U256,
    pub owner: Address,
}

/// Result of simulating a relay call against the hub's acceptance check.
///
/// Both a revert inside the simulation and any failure to run it at all
/// collapse into `Reverted`, so callers branch on one shape only. The
/// `reverted` flag mirrors a protocol transition: once all acceptance
/// decisions live in the paymaster and forwarder it is expected to go away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Completed { success: bool, return_value: String },
    Reverted { reason: String },
}

impl ValidationOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ValidationOutcome::Completed { success: true, .. })
    }

    pub fn reverted(&self) -> bool {
        matches!(self, ValidationOutcome::Reverted { .. })
    }

    pub fn return_value(&self) -> &str {
        match self {
            ValidationOutcome::Completed { return_value, .. } => return_value,
            ValidationOutcome::Reverted { reason } => reason,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeRepr<'a> {
    success: bool,
    return_value: &'a str,
    reverted: bool,
}

impl Serialize for ValidationOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutcomeRepr {
            success: self.success(),
            return_value: self.return_value(),
            reverted: self.reverted(),
        }
        .serialize(serializer)
    }
}

/// Inclusive block range for historical log scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
}

impl Default for BlockRange {
    fn default() -> Self {
        Self {
            from_block: BlockNumber::Earliest,
            to_block: BlockNumber::Latest,
        }
    }
}

impl BlockRange {
    pub fn new(from_block: Option<u64>, to_block: Option<u64>) -> Self {
        let mut range = Self::default();
        if let Some(from) = from_block {
            range.from_block = BlockNumber::Number(from.into());
        }
        if let Some(to) = to_block {
            range.to_block = BlockNumber::Number(to.into());
        }
        range
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractorConfig {
    pub relay_hub_address: Address,
    pub stake_manager_address: Address,
    #[serde(default = "default_gtx_data_non_zero")]
    pub gtx_data_non_zero: u64,
}

fn default_gtx_data_non_zero() -> u64 {
    DEFAULT_GTX_DATA_NON_ZERO
}
