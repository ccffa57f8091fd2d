// src/contracts.rs
//! Typed bindings for every contract the relay talks to, and the registry
//! that binds them to addresses.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ethers::abi::Abi;
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use tracing::debug;

use crate::error::{InteractorError, Result};
use crate::types::{self, GasLimits, StakeInfo};

pub mod paymaster {
    use ethers::contract::abigen;

    abigen!(
        IPaymaster,
        r#"[
            struct GasData { uint256 gasLimit; uint256 gasPrice; uint256 pctRelayFee; uint256 baseRelayFee; }
            function getGasLimits() external view returns (uint256 acceptanceBudget, uint256 preRelayedCallGasLimit, uint256 postRelayedCallGasLimit, uint256 calldataSizeLimit)
            function getHubAddr() external view returns (address)
            function trustedForwarder() external view returns (address)
            function versionPaymaster() external view returns (string)
            function preRelayedCall(bytes context) external returns (bytes32)
            function postRelayedCall(bytes context, bool success, bytes32 preRetVal, uint256 gasUseWithoutPost, GasData gasData) external
        ]"#
    );
}

pub mod relay_hub {
    use ethers::contract::abigen;

    abigen!(
        IRelayHub,
        r#"[
            struct GasData { uint256 gasLimit; uint256 gasPrice; uint256 pctRelayFee; uint256 baseRelayFee; }
            struct RelayData { address senderAddress; uint256 senderNonce; address relayWorker; address paymaster; address forwarder; }
            struct RelayRequest { address target; bytes encodedFunction; GasData gasData; RelayData relayData; }
            function getHubOverhead() external view returns (uint256)
            function canRelay(RelayRequest relayRequest, uint256 maxPossibleGas, uint256 acceptanceBudget, bytes signature, bytes approvalData) external view returns (bool success, string returnValue)
            function relayCall(RelayRequest relayRequest, bytes signature, bytes approvalData, uint256 externalGasLimit) external
            function balanceOf(address target) external view returns (uint256)
            function versionHub() external view returns (string)
            event RelayServerRegistered(address indexed relayManager, uint256 baseRelayFee, uint256 pctRelayFee, string relayUrl)
            event RelayWorkersAdded(address indexed relayManager, address[] newRelayWorkers, uint256 workersCount)
            event TransactionRelayed(address indexed relayManager, address indexed relayWorker, address indexed from, address to, address paymaster, bytes4 selector, uint8 status, uint256 charge)
            event TransactionRejectedByPaymaster(address indexed relayManager, address indexed paymaster, address indexed from, address to, address relayWorker, bytes4 selector, uint256 innerGasUsed, bytes reason)
            event Deposited(address indexed paymaster, address indexed from, uint256 amount)
            event Withdrawn(address indexed account, address indexed dest, uint256 amount)
            event Penalized(address indexed relayWorker, address sender, uint256 reward)
        ]"#
    );
}

pub mod forwarder {
    use ethers::contract::abigen;

    abigen!(
        IForwarder,
        r#"[
            function getNonce(address from) external view returns (uint256)
        ]"#
    );
}

pub mod stake_manager {
    use ethers::contract::abigen;

    abigen!(
        IStakeManager,
        r#"[
            function getStakeInfo(address relayManager) external view returns (uint256 stake, uint256 unstakeDelay, uint256 withdrawBlock, address owner)
            event StakeAdded(address indexed relayManager, address indexed owner, uint256 stake, uint256 unstakeDelay)
            event StakeUnlocked(address indexed relayManager, address indexed owner, uint256 withdrawBlock)
            event StakeWithdrawn(address indexed relayManager, address indexed owner, uint256 amount)
            event StakePenalized(address indexed relayManager, address indexed beneficiary, uint256 reward)
            event HubAuthorized(address indexed relayManager, address indexed relayHub)
            event HubUnauthorized(address indexed relayManager, address indexed relayHub, uint256 removalBlock)
        ]"#
    );
}

pub mod recipient {
    use ethers::contract::abigen;

    abigen!(
        IRelayRecipient,
        r#"[
            function getTrustedForwarder() external view returns (address)
            function versionRecipient() external view returns (string)
        ]"#
    );
}

pub use forwarder::IForwarder;
pub use paymaster::IPaymaster;
pub use recipient::IRelayRecipient;
pub use relay_hub::{IRelayHub, IRelayHubEvents};
pub use stake_manager::{IStakeManager, IStakeManagerEvents};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRole {
    Paymaster,
    RelayHub,
    Forwarder,
    StakeManager,
    Recipient,
}

impl ContractRole {
    pub fn name(&self) -> &'static str {
        match self {
            ContractRole::Paymaster => "IPaymaster",
            ContractRole::RelayHub => "IRelayHub",
            ContractRole::Forwarder => "IForwarder",
            ContractRole::StakeManager => "IStakeManager",
            ContractRole::Recipient => "IRelayRecipient",
        }
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A contract binding for one role, bound to one address.
#[derive(Debug, Clone)]
pub enum ContractHandle<M> {
    Paymaster(IPaymaster<M>),
    RelayHub(IRelayHub<M>),
    Forwarder(IForwarder<M>),
    StakeManager(IStakeManager<M>),
    Recipient(IRelayRecipient<M>),
}

impl<M: Middleware> ContractHandle<M> {
    pub fn role(&self) -> ContractRole {
        match self {
            ContractHandle::Paymaster(_) => ContractRole::Paymaster,
            ContractHandle::RelayHub(_) => ContractRole::RelayHub,
            ContractHandle::Forwarder(_) => ContractRole::Forwarder,
            ContractHandle::StakeManager(_) => ContractRole::StakeManager,
            ContractHandle::Recipient(_) => ContractRole::Recipient,
        }
    }

    pub fn address(&self) -> Address {
        match self {
            ContractHandle::Paymaster(c) => c.address(),
            ContractHandle::RelayHub(c) => c.address(),
            ContractHandle::Forwarder(c) => c.address(),
            ContractHandle::StakeManager(c) => c.address(),
            ContractHandle::Recipient(c) => c.address(),
        }
    }

    pub fn abi(&self) -> &Abi {
        match self {
            ContractHandle::Paymaster(c) => c.abi(),
            ContractHandle::RelayHub(c) => c.abi(),
            ContractHandle::Forwarder(c) => c.abi(),
            ContractHandle::StakeManager(c) => c.abi(),
            ContractHandle::Recipient(c) => c.abi(),
        }
    }
}

/// Binds contract roles to addresses on a shared node client.
///
/// Resolution never touches the network; handles are cheap and are created
/// per call.
pub struct ContractRegistry<M> {
    client: Arc<M>,
}

impl<M> Clone for ContractRegistry<M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<M: Middleware> ContractRegistry<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<M> {
        &self.client
    }

    pub fn resolve(&self, role: ContractRole, address: &str) -> Result<ContractHandle<M>> {
        let address = parse_address(address)?;
        debug!("Resolving {} at {:?}", role, address);

        Ok(match role {
            ContractRole::Paymaster => ContractHandle::Paymaster(self.paymaster(address)),
            ContractRole::RelayHub => ContractHandle::RelayHub(self.relay_hub(address)),
            ContractRole::Forwarder => ContractHandle::Forwarder(self.forwarder(address)),
            ContractRole::StakeManager => ContractHandle::StakeManager(self.stake_manager(address)),
            ContractRole::Recipient => ContractHandle::Recipient(self.recipient(address)),
        })
    }

    pub fn paymaster(&self, address: Address) -> IPaymaster<M> {
        IPaymaster::new(address, self.client.clone())
    }

    pub fn relay_hub(&self, address: Address) -> IRelayHub<M> {
        IRelayHub::new(address, self.client.clone())
    }

    pub fn forwarder(&self, address: Address) -> IForwarder<M> {
        IForwarder::new(address, self.client.clone())
    }

    pub fn stake_manager(&self, address: Address) -> IStakeManager<M> {
        IStakeManager::new(address, self.client.clone())
    }

    pub fn recipient(&self, address: Address) -> IRelayRecipient<M> {
        IRelayRecipient::new(address, self.client.clone())
    }
}

/// Parses a 20-byte account address, with or without the `0x` prefix.
pub fn parse_address(address: &str) -> Result<Address> {
    let trimmed = address.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_part.len() != 40 {
        return Err(InteractorError::InvalidAddress(address.to_string()));
    }
    Address::from_str(hex_part).map_err(|_| InteractorError::InvalidAddress(address.to_string()))
}

// Struct-returning views are declared with their flattened outputs, which
// encode identically, and land in these domain types.
impl From<(U256, U256, U256, U256)> for GasLimits {
    fn from(
        (acceptance_budget, pre_relayed_call_gas_limit, post_relayed_call_gas_limit, calldata_size_limit): (
            U256,
            U256,
            U256,
            U256,
        ),
    ) -> Self {
        Self {
            acceptance_budget,
            pre_relayed_call_gas_limit,
            post_relayed_call_gas_limit,
            calldata_size_limit,
        }
    }
}

impl From<(U256, U256, U256, Address)> for StakeInfo {
    fn from((stake, unstake_delay, withdraw_block, owner): (U256, U256, U256, Address)) -> Self {
        Self {
            stake,
            unstake_delay,
            withdraw_block,
            owner,
        }
    }
}

impl From<&types::RelayRequest> for relay_hub::RelayRequest {
    fn from(request: &types::RelayRequest) -> Self {
        Self {
            target: request.target,
            encoded_function: request.encoded_function.clone(),
            gas_data: relay_hub::GasData {
                gas_limit: request.gas_data.gas_limit,
                gas_price: request.gas_data.gas_price,
                pct_relay_fee: request.gas_data.pct_relay_fee,
                base_relay_fee: request.gas_data.base_relay_fee,
            },
            relay_data: relay_hub::RelayData {
                sender_address: request.relay_data.sender_address,
                sender_nonce: request.relay_data.sender_nonce,
                relay_worker: request.relay_data.relay_worker,
                paymaster: request.relay_data.paymaster,
                forwarder: request.relay_data.forwarder,
            },
        }
    }
}
