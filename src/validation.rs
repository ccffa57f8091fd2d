// src/validation.rs
use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::{decode_function_data, ContractCall, EthError};
use ethers::providers::{Middleware, MiddlewareError};
use ethers::types::{Address, Bytes, U256};
use tracing::{debug, warn};

use crate::contracts::{relay_hub, ContractRegistry};
use crate::error::{InteractorError, Result};
use crate::gas::max_possible_gas;
use crate::types::{GasLimits, RelayRequest, ValidationOutcome};

/// Off-chain pre-validation of relay calls.
///
/// Implementations never fail: every problem is reported as
/// [`ValidationOutcome::Reverted`].
#[async_trait]
pub trait RelayCallValidator: Send + Sync {
    async fn validate(
        &self,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> ValidationOutcome;
}

pub struct RelayValidator<M> {
    registry: ContractRegistry<M>,
    relay_hub_address: Address,
    gtx_data_non_zero: U256,
}

impl<M: Middleware> RelayValidator<M> {
    pub fn new(registry: ContractRegistry<M>, relay_hub_address: Address, gtx_data_non_zero: u64) -> Self {
        Self {
            registry,
            relay_hub_address,
            gtx_data_non_zero: U256::from(gtx_data_non_zero),
        }
    }

    /// Simulates `canRelay` on the hub with `relay_call_gas_limit` as the
    /// outer transaction's gas limit.
    pub async fn validate_with_gas_limit(
        &self,
        relay_call_gas_limit: U256,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> ValidationOutcome {
        match self
            .simulate(relay_call_gas_limit, request, signature, approval_data)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    "canRelay simulation for sender {:?} failed: {}",
                    request.relay_data.sender_address, e
                );
                let cause = match e {
                    InteractorError::SimulationFailure(cause) => cause,
                    other => other.to_string(),
                };
                ValidationOutcome::Reverted {
                    reason: format!("canRelay reverted (should not happen): {}", cause),
                }
            }
        }
    }

    async fn simulate(
        &self,
        relay_call_gas_limit: U256,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> Result<ValidationOutcome> {
        let paymaster = self.registry.paymaster(request.relay_data.paymaster);
        let hub = self.registry.relay_hub(self.relay_hub_address);
        let wire_request = relay_hub::RelayRequest::from(request);

        let calldata_size = hub
            .relay_call(
                wire_request.clone(),
                signature.clone(),
                approval_data.clone(),
                relay_call_gas_limit,
            )
            .calldata()
            .map(|data| data.len())
            .ok_or_else(|| InteractorError::SimulationFailure("relayCall could not be encoded".to_string()))?;

        let limits_call = paymaster.get_gas_limits();
        let overhead_call = hub.get_hub_overhead();
        let (limits, hub_overhead) =
            tokio::try_join!(self.eth_call(&limits_call), self.eth_call(&overhead_call))?;
        let limits = GasLimits::from(limits);

        let max_gas = max_possible_gas(
            &limits,
            hub_overhead,
            relay_call_gas_limit,
            U256::from(calldata_size),
            self.gtx_data_non_zero,
        )?;
        debug!(
            "Simulating canRelay: calldata {} bytes, hub overhead {}, max possible gas {}",
            calldata_size, hub_overhead, max_gas
        );

        let acceptance = acceptance_check(
            &hub,
            wire_request,
            max_gas,
            limits.acceptance_budget,
            signature,
            approval_data,
            request.relay_data.relay_worker,
        );
        let (success, return_value) = self.eth_call(&acceptance).await?;

        Ok(ValidationOutcome::Completed {
            success,
            return_value,
        })
    }

    /// Runs `call` as an `eth_call` and decodes its output. A failure carries
    /// the decoded `Error(string)` reason, or the node's message when the
    /// revert has none.
    async fn eth_call<D: Detokenize>(&self, call: &ContractCall<M, D>) -> Result<D> {
        let output = self
            .registry
            .client()
            .call(&call.tx, call.block)
            .await
            .map_err(|e| InteractorError::SimulationFailure(call_failure_cause(&e)))?;
        decode_function_data(&call.function, &output, false)
            .map_err(|e| InteractorError::Decode(e.to_string()))
    }
}

/// The hub's `canRelay` view as the relay worker would see it. No gas price
/// is set, so the node never checks the worker's balance.
fn acceptance_check<M: Middleware>(
    hub: &relay_hub::IRelayHub<M>,
    wire_request: relay_hub::RelayRequest,
    max_gas: U256,
    acceptance_budget: U256,
    signature: &Bytes,
    approval_data: &Bytes,
    relay_worker: Address,
) -> ContractCall<M, (bool, String)> {
    hub.can_relay(
        wire_request,
        max_gas,
        acceptance_budget,
        signature.clone(),
        approval_data.clone(),
    )
    .from(relay_worker)
    .gas(max_gas)
}

fn call_failure_cause<E: MiddlewareError>(err: &E) -> String {
    match err.as_error_response() {
        Some(response) => {
            String::from_rpc_response(response).unwrap_or_else(|| response.message.clone())
        }
        None => err.to_string(),
    }
}

#[async_trait]
impl<M: Middleware> RelayCallValidator for RelayValidator<M> {
    /// Uses the request's own gas limit as the relay call gas limit.
    async fn validate(
        &self,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> ValidationOutcome {
        self.validate_with_gas_limit(request.gas_data.gas_limit, request, signature, approval_data)
            .await
    }
}
