// src/gas.rs
use ethers::types::U256;

use crate::error::{InteractorError, Result};
use crate::types::GasLimits;

/// Worst-case gas a relayed call can consume.
///
/// Must match the hub's on-chain charge exactly: `calldata_size` is the byte
/// length of the fully encoded `relayCall` (request, signature and approval
/// data), priced at `gas_per_non_zero_byte` for every byte.
pub fn max_possible_gas(
    limits: &GasLimits,
    hub_overhead: U256,
    relay_call_gas_limit: U256,
    calldata_size: U256,
    gas_per_non_zero_byte: U256,
) -> Result<U256> {
    let calldata_gas = calldata_size
        .checked_mul(gas_per_non_zero_byte)
        .ok_or(InteractorError::GasOverflow)?;

    hub_overhead
        .checked_add(relay_call_gas_limit)
        .and_then(|sum| sum.checked_add(limits.pre_relayed_call_gas_limit))
        .and_then(|sum| sum.checked_add(limits.post_relayed_call_gas_limit))
        .and_then(|sum| sum.checked_add(calldata_gas))
        .ok_or(InteractorError::GasOverflow)
}
