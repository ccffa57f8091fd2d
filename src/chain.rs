// src/chain.rs
use std::fmt;

use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{InteractorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Main,
    Ropsten,
    Rinkeby,
    Goerli,
    Kovan,
    Private,
}

const KNOWN_GENESIS_HASHES: &[(&str, NetworkType)] = &[
    ("d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3", NetworkType::Main),
    ("41941023680923e0fe4d74a34bdac8141f2540e3ae90623718e47d66d1ca4a2d", NetworkType::Ropsten),
    ("6341fd3daf94b748c72ced5a5b26028f2474f5f00d824504e4fa37a75767e177", NetworkType::Rinkeby),
    ("bf7e331f7f7c1dd2e05159666b3bf8bc7a8a3a9eb1d518969eab529dd9b88c1a", NetworkType::Goerli),
    ("a3c565fc15c7478862d50ccd6561e3c06b24cc509bf388941c25ea985ce32cb9", NetworkType::Kovan),
];

impl NetworkType {
    /// Any chain whose genesis block is not a known public network is `Private`.
    pub fn from_genesis_hash(hash: H256) -> Self {
        let hash = hex::encode(hash.as_bytes());
        KNOWN_GENESIS_HASHES
            .iter()
            .find(|(known, _)| *known == hash)
            .map(|(_, network_type)| *network_type)
            .unwrap_or(NetworkType::Private)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Main => "main",
            NetworkType::Ropsten => "ropsten",
            NetworkType::Rinkeby => "rinkeby",
            NetworkType::Goerli => "goerli",
            NetworkType::Kovan => "kovan",
            NetworkType::Private => "private",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain and hardfork rules a transaction is signed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainProfile {
    pub chain: &'static str,
    pub hardfork: &'static str,
}

const MAINNET_PROFILE: ChainProfile = ChainProfile {
    chain: "mainnet",
    hardfork: "istanbul",
};

/// Signing profile for each detected network type. Development nodes report
/// `Private`, which signs under the mainnet rules with the node's own ids.
const SIGNING_PROFILES: &[(NetworkType, ChainProfile)] = &[
    (NetworkType::Main, MAINNET_PROFILE),
    (NetworkType::Ropsten, ChainProfile { chain: "ropsten", hardfork: "istanbul" }),
    (NetworkType::Rinkeby, ChainProfile { chain: "rinkeby", hardfork: "istanbul" }),
    (NetworkType::Goerli, ChainProfile { chain: "goerli", hardfork: "istanbul" }),
    (NetworkType::Kovan, ChainProfile { chain: "kovan", hardfork: "istanbul" }),
    (NetworkType::Private, MAINNET_PROFILE),
];

pub fn signing_profile(network_type: NetworkType) -> ChainProfile {
    SIGNING_PROFILES
        .iter()
        .find(|(detected, _)| *detected == network_type)
        .map(|(_, profile)| *profile)
        .unwrap_or(MAINNET_PROFILE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningOptions {
    pub chain_id: u64,
    pub network_id: u64,
    pub profile: ChainProfile,
}

impl SigningOptions {
    pub fn derive(chain_id: u64, network_id: u64, network_type: NetworkType) -> Self {
        Self {
            chain_id,
            network_id,
            profile: signing_profile(network_type),
        }
    }

    /// Signs `tx` as a legacy EIP-155 transaction and returns the raw RLP
    /// bytes, ready for `eth_sendRawTransaction`.
    pub async fn sign_transaction(&self, wallet: &LocalWallet, tx: TransactionRequest) -> Result<Bytes> {
        let wallet = wallet.clone().with_chain_id(self.chain_id);
        let tx: TypedTransaction = tx.from(wallet.address()).chain_id(self.chain_id).into();

        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| InteractorError::Signing(e.to_string()))?;
        debug!("Signed transaction from {:?} for chain {}", wallet.address(), self.chain_id);

        Ok(tx.rlp_signed(&signature))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub chain_id: u64,
    pub network_id: u64,
    pub network_type: NetworkType,
    pub signing_options: SigningOptions,
}

#[derive(Debug, Clone, Default)]
enum ChainState {
    #[default]
    Uninitialized,
    Ready(ChainInfo),
}

/// Chain identity, fetched once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ChainContext {
    state: ChainState,
}

impl ChainContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches chain id, network id and genesis block. A second call
    /// re-fetches and replaces the cached values.
    pub async fn initialize<M: Middleware>(&mut self, client: &M) -> Result<()> {
        let chain_id = client
            .get_chainid()
            .await
            .map_err(|e| InteractorError::Transport(e.to_string()))?;
        let chain_id = u64::try_from(chain_id)
            .map_err(|_| InteractorError::Decode(format!("chain id {} exceeds u64", chain_id)))?;

        let network_id = client
            .get_net_version()
            .await
            .map_err(|e| InteractorError::Transport(e.to_string()))?;
        let network_id = network_id
            .parse::<u64>()
            .map_err(|e| InteractorError::Decode(format!("network id {:?}: {}", network_id, e)))?;

        let genesis = client
            .get_block(0u64)
            .await
            .map_err(|e| InteractorError::Transport(e.to_string()))?;
        let network_type = genesis
            .and_then(|block| block.hash)
            .map(NetworkType::from_genesis_hash)
            .unwrap_or(NetworkType::Private);

        let signing_options = SigningOptions::derive(chain_id, network_id, network_type);
        info!(
            "Chain context ready: chain id {}, network id {}, network type {}, signing as {}/{}",
            chain_id, network_id, network_type, signing_options.profile.chain, signing_options.profile.hardfork
        );

        self.state = ChainState::Ready(ChainInfo {
            chain_id,
            network_id,
            network_type,
            signing_options,
        });
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ChainState::Ready(_))
    }

    pub fn info(&self) -> Result<&ChainInfo> {
        match &self.state {
            ChainState::Ready(info) => Ok(info),
            ChainState::Uninitialized => Err(InteractorError::Uninitialized),
        }
    }

    pub fn chain_id(&self) -> Result<u64> {
        Ok(self.info()?.chain_id)
    }

    pub fn network_id(&self) -> Result<u64> {
        Ok(self.info()?.network_id)
    }

    pub fn network_type(&self) -> Result<NetworkType> {
        Ok(self.info()?.network_type)
    }

    pub fn signing_options(&self) -> Result<SigningOptions> {
        Ok(self.info()?.signing_options)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn accessors_fail_before_initialization() {
        let context = ChainContext::new();
        assert!(!context.is_ready());
        assert!(matches!(context.chain_id(), Err(InteractorError::Uninitialized)));
        assert!(matches!(context.network_id(), Err(InteractorError::Uninitialized)));
        assert!(matches!(context.network_type(), Err(InteractorError::Uninitialized)));
        assert!(matches!(context.signing_options(), Err(InteractorError::Uninitialized)));
    }

    #[test]
    fn detects_public_networks_by_genesis() {
        let goerli =
            H256::from_str("0xbf7e331f7f7c1dd2e05159666b3bf8bc7a8a3a9eb1d518969eab529dd9b88c1a").unwrap();
        assert_eq!(NetworkType::from_genesis_hash(goerli), NetworkType::Goerli);
        assert_eq!(NetworkType::from_genesis_hash(H256::repeat_byte(7)), NetworkType::Private);
    }

    #[test]
    fn private_networks_sign_like_mainnet() {
        let options = SigningOptions::derive(1337, 5777, NetworkType::Private);
        assert_eq!(options.profile, MAINNET_PROFILE);
        assert_eq!(options.chain_id, 1337);
        assert_eq!(options.network_id, 5777);

        assert_eq!(signing_profile(NetworkType::Kovan).chain, "kovan");
    }

    #[tokio::test]
    async fn signs_with_the_context_chain_id() {
        let wallet = LocalWallet::from_str(
            "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        )
        .unwrap();
        let options = SigningOptions::derive(1337, 1337, NetworkType::Private);
        let tx = TransactionRequest::new()
            .to(Address::repeat_byte(0x42))
            .value(1u64)
            .gas(21_000u64)
            .gas_price(1_000_000_000u64)
            .nonce(0u64);

        let raw = options.sign_transaction(&wallet, tx).await.unwrap();

        let rlp = ethers::utils::rlp::Rlp::new(raw.as_ref());
        let (decoded, signature) = TypedTransaction::decode_signed(&rlp).unwrap();
        assert_eq!(decoded.chain_id(), Some(U64::from(1337u64)));
        assert_eq!(signature.recover(decoded.sighash()).unwrap(), wallet.address());
    }
}
