// src/interactor.rs
use std::sync::Arc;

use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use tracing::{debug, info};

use crate::chain::{ChainContext, ChainInfo, NetworkType, SigningOptions};
use crate::contracts::{ContractRegistry, ContractRole, IRelayHubEvents, IStakeManagerEvents};
use crate::error::{InteractorError, Result};
use crate::events::{build_topics, query_past_events, PastEvent};
use crate::gas::max_possible_gas;
use crate::types::{
    BlockRange, GasLimits, InteractorConfig, RelayRequest, StakeInfo, ValidationOutcome,
};
use crate::validation::{RelayCallValidator, RelayValidator};

/// Everything the relay needs from the chain, bound to one node client.
pub struct ContractInteractor<M> {
    client: Arc<M>,
    config: InteractorConfig,
    registry: ContractRegistry<M>,
    validator: RelayValidator<M>,
    chain: ChainContext,
}

impl<M: Middleware> ContractInteractor<M> {
    pub fn new(client: Arc<M>, config: InteractorConfig) -> Self {
        let registry = ContractRegistry::new(client.clone());
        let validator = RelayValidator::new(
            registry.clone(),
            config.relay_hub_address,
            config.gtx_data_non_zero,
        );
        Self {
            client,
            config,
            registry,
            validator,
            chain: ChainContext::new(),
        }
    }

    /// Resolves the chain context. Call once before any chain identity read.
    pub async fn init(&mut self) -> Result<()> {
        info!(
            "Initializing contract interactor for hub {:?}, stake manager {:?}",
            self.config.relay_hub_address, self.config.stake_manager_address
        );
        self.chain.initialize(self.client.as_ref()).await
    }

    pub fn config(&self) -> &InteractorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ContractRegistry<M> {
        &self.registry
    }

    pub fn chain_info(&self) -> Result<&ChainInfo> {
        self.chain.info()
    }

    pub fn chain_id(&self) -> Result<u64> {
        self.chain.chain_id()
    }

    pub fn network_id(&self) -> Result<u64> {
        self.chain.network_id()
    }

    pub fn network_type(&self) -> Result<NetworkType> {
        self.chain.network_type()
    }

    pub fn signing_options(&self) -> Result<SigningOptions> {
        self.chain.signing_options()
    }

    pub async fn validate_relay_call(
        &self,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> ValidationOutcome {
        self.validator.validate(request, signature, approval_data).await
    }

    pub async fn validate_relay_call_with_gas_limit(
        &self,
        relay_call_gas_limit: U256,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> ValidationOutcome {
        self.validator
            .validate_with_gas_limit(relay_call_gas_limit, request, signature, approval_data)
            .await
    }

    pub async fn paymaster_gas_limits(&self, paymaster: Address) -> Result<GasLimits> {
        debug!("Fetching gas limits of paymaster {:?}", paymaster);
        let limits = self.registry.paymaster(paymaster).get_gas_limits().call().await?;
        Ok(limits.into())
    }

    pub async fn hub_overhead(&self) -> Result<U256> {
        Ok(self.hub().get_hub_overhead().call().await?)
    }

    /// Worst-case gas for a relay call sponsored by `paymaster`, using the
    /// paymaster's current limits and the hub's current overhead.
    pub async fn max_possible_gas_for(
        &self,
        paymaster: Address,
        relay_call_gas_limit: U256,
        calldata_size: U256,
    ) -> Result<U256> {
        let (limits, overhead) =
            tokio::try_join!(self.paymaster_gas_limits(paymaster), self.hub_overhead())?;
        max_possible_gas(
            &limits,
            overhead,
            relay_call_gas_limit,
            calldata_size,
            U256::from(self.config.gtx_data_non_zero),
        )
    }

    pub async fn relay_hub_of_paymaster(&self, paymaster: Address) -> Result<Address> {
        Ok(self.registry.paymaster(paymaster).get_hub_addr().call().await?)
    }

    pub async fn paymaster_version(&self, paymaster: Address) -> Result<String> {
        Ok(self.registry.paymaster(paymaster).version_paymaster().call().await?)
    }

    pub async fn hub_version(&self) -> Result<String> {
        Ok(self.hub().version_hub().call().await?)
    }

    pub async fn hub_balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.hub().balance_of(account).call().await?)
    }

    pub async fn sender_nonce(&self, sender: Address, forwarder: Address) -> Result<U256> {
        Ok(self.registry.forwarder(forwarder).get_nonce(sender).call().await?)
    }

    pub async fn trusted_forwarder(&self, recipient: Address) -> Result<Address> {
        Ok(self.registry.recipient(recipient).get_trusted_forwarder().call().await?)
    }

    pub async fn stake_info(&self, relay_manager: Address) -> Result<StakeInfo> {
        let info = self
            .registry
            .stake_manager(self.config.stake_manager_address)
            .get_stake_info(relay_manager)
            .call()
            .await?;
        Ok(info.into())
    }

    /// Hub events named in `names`, optionally restricted to the given values
    /// of their first indexed parameter, in node order.
    pub async fn get_past_events_for_hub<A: AsRef<str>>(
        &self,
        names: &[&str],
        extra_address_topics: &[A],
        range: BlockRange,
    ) -> Result<Vec<PastEvent<IRelayHubEvents>>> {
        let hub = self.hub();
        let topics = build_topics(hub.abi(), ContractRole::RelayHub.name(), names, extra_address_topics)?;
        query_past_events(self.client.as_ref(), hub.address(), &topics, range).await
    }

    pub async fn get_past_events_for_stake_manager<A: AsRef<str>>(
        &self,
        names: &[&str],
        extra_address_topics: &[A],
        range: BlockRange,
    ) -> Result<Vec<PastEvent<IStakeManagerEvents>>> {
        let stake_manager = self.registry.stake_manager(self.config.stake_manager_address);
        let topics = build_topics(
            stake_manager.abi(),
            ContractRole::StakeManager.name(),
            names,
            extra_address_topics,
        )?;
        query_past_events(self.client.as_ref(), stake_manager.address(), &topics, range).await
    }

    pub async fn get_past_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.client.get_logs(filter).await.map_err(transport)
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        self.client.get_balance(address, None).await.map_err(transport)
    }

    pub async fn get_block_number(&self) -> Result<U64> {
        self.client.get_block_number().await.map_err(transport)
    }

    pub async fn get_gas_price(&self) -> Result<U256> {
        self.client.get_gas_price().await.map_err(transport)
    }

    pub async fn get_transaction_count(&self, address: Address) -> Result<U256> {
        self.client
            .get_transaction_count(address, None)
            .await
            .map_err(transport)
    }

    pub async fn is_contract_deployed(&self, address: Address) -> Result<bool> {
        let code = self.client.get_code(address, None).await.map_err(transport)?;
        Ok(!code.is_empty())
    }

    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        self.client.estimate_gas(tx, None).await.map_err(transport)
    }

    pub async fn send_signed_transaction(&self, raw: Bytes) -> Result<TxHash> {
        let pending = self
            .client
            .send_raw_transaction(raw)
            .await
            .map_err(transport)?;
        Ok(pending.tx_hash())
    }

    fn hub(&self) -> crate::contracts::IRelayHub<M> {
        self.registry.relay_hub(self.config.relay_hub_address)
    }
}

fn transport<E: std::fmt::Display>(err: E) -> InteractorError {
    InteractorError::Transport(err.to_string())
}
