// src/events.rs
//! Indexed-log filters for hub and stake-manager events.
//!
//! Records come back exactly as the node returns them. Their order is
//! whatever the node guarantees (usually block, then log index); nothing
//! here sorts or deduplicates.

use std::str::FromStr;

use ethers::abi::{Abi, RawLog};
use ethers::contract::EthLogDecode;
use ethers::providers::Middleware;
use ethers::types::{Address, Filter, Log, Topic, ValueOrArray, H256, U256, U64};
use serde::Serialize;
use tracing::debug;

use crate::error::{InteractorError, Result};
use crate::types::BlockRange;

const TOPIC_HEX_LEN: usize = 64;

/// Encodes an address the way the log index stores it in a 32-byte topic:
/// left-padded with zeros, lower-case, `0x` prefixed.
pub fn address_to_topic(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_part.is_empty()
        || hex_part.len() > TOPIC_HEX_LEN
        || !hex_part.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(InteractorError::InvalidAddress(address.to_string()));
    }
    Ok(format!(
        "0x{:0>width$}",
        hex_part.to_lowercase(),
        width = TOPIC_HEX_LEN
    ))
}

/// Topic slots of a log filter: slot 0 holds event signatures, the optional
/// slot 1 holds values of the first indexed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTopicSet {
    slots: Vec<Vec<H256>>,
}

impl EventTopicSet {
    pub fn slots(&self) -> &[Vec<H256>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn to_filter(&self, address: Address, range: BlockRange) -> Filter {
        let mut filter = Filter::new()
            .address(address)
            .from_block(range.from_block)
            .to_block(range.to_block);
        for (index, slot) in self.slots.iter().enumerate() {
            let topic: Topic = ValueOrArray::Array(slot.iter().copied().map(Some).collect());
            filter.topics[index] = Some(topic);
        }
        filter
    }
}

/// Builds the topic set for `event_names` as declared in `abi`.
///
/// `event_names` must not be empty: an empty signature slot matches every
/// event the contract emits. The address slot is only added when
/// `extra_address_topics` is non-empty; an empty slot would restrict matches
/// to logs with a null indexed value.
pub fn build_topics<A: AsRef<str>>(
    abi: &Abi,
    contract: &'static str,
    event_names: &[&str],
    extra_address_topics: &[A],
) -> Result<EventTopicSet> {
    if event_names.is_empty() {
        return Err(InteractorError::NoEventNames { contract });
    }

    let signatures = event_names
        .iter()
        .map(|name| {
            abi.event(name)
                .map(|event| event.signature())
                .map_err(|_| InteractorError::UnknownEvent {
                    contract,
                    event: name.to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut slots = vec![signatures];
    if !extra_address_topics.is_empty() {
        let addresses = extra_address_topics
            .iter()
            .map(|address| {
                let topic = address_to_topic(address.as_ref())?;
                H256::from_str(&topic)
                    .map_err(|_| InteractorError::InvalidAddress(address.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        slots.push(addresses);
    }

    Ok(EventTopicSet { slots })
}

/// Where a decoded event was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub address: Address,
    pub block_number: Option<U64>,
    pub transaction_hash: Option<H256>,
    pub log_index: Option<U256>,
}

impl From<&Log> for EventMeta {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PastEvent<E> {
    pub event: E,
    pub meta: EventMeta,
}

/// Scans `range` for logs of `address` matching `topics` and decodes them.
pub async fn query_past_events<M, E>(
    client: &M,
    address: Address,
    topics: &EventTopicSet,
    range: BlockRange,
) -> Result<Vec<PastEvent<E>>>
where
    M: Middleware,
    E: EthLogDecode,
{
    let filter = topics.to_filter(address, range);
    debug!(
        "Querying logs of {:?} from {:?} to {:?}",
        address, range.from_block, range.to_block
    );

    let logs = client
        .get_logs(&filter)
        .await
        .map_err(|e| InteractorError::Transport(e.to_string()))?;
    debug!("Node returned {} logs for {:?}", logs.len(), address);

    logs.iter()
        .map(|log| {
            let raw = RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            };
            let event = E::decode_log(&raw).map_err(|e| InteractorError::Decode(e.to_string()))?;
            Ok(PastEvent {
                event,
                meta: EventMeta::from(log),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ethers::providers::Provider;

    use super::*;
    use crate::contracts::{ContractRegistry, IStakeManagerEvents};

    fn stake_manager_abi() -> Abi {
        let (provider, _mock) = Provider::mocked();
        let registry = ContractRegistry::new(Arc::new(provider));
        registry.stake_manager(Address::zero()).abi().clone()
    }

    #[test]
    fn pads_and_lowercases_addresses() {
        let topic = address_to_topic("0xAbC0000000000000000000000000000000000DeF").unwrap();
        assert_eq!(
            topic,
            "0x000000000000000000000000abc0000000000000000000000000000000000def"
        );
        assert_eq!(topic.len(), 2 + 64);
    }

    #[test]
    fn normalization_is_idempotent() {
        for address in [
            "0xAbC0000000000000000000000000000000000DeF",
            "1234567890abcdef1234567890ABCDEF12345678",
            "0x0000000000000000000000000000000000000000",
        ] {
            let once = address_to_topic(address).unwrap();
            let twice = address_to_topic(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn rejects_non_hex_topics() {
        assert!(address_to_topic("0x").is_err());
        assert!(address_to_topic("0xnothex").is_err());
        assert!(address_to_topic(&format!("0x{}", "1".repeat(65))).is_err());
    }

    #[test]
    fn single_slot_without_extra_topics() {
        let abi = stake_manager_abi();
        let topics = build_topics::<&str>(&abi, "IStakeManager", &["StakeAdded", "StakeUnlocked"], &[])
            .unwrap();

        assert_eq!(topics.len(), 1);
        assert_eq!(
            topics.slots()[0],
            vec![
                abi.event("StakeAdded").unwrap().signature(),
                abi.event("StakeUnlocked").unwrap().signature(),
            ]
        );
    }

    #[test]
    fn address_slot_follows_signatures() {
        let abi = stake_manager_abi();
        let manager = "0x00000000000000000000000000000000000000Aa";
        let topics = build_topics(&abi, "IStakeManager", &["StakePenalized"], &[manager]).unwrap();

        assert_eq!(topics.len(), 2);
        assert_eq!(
            topics.slots()[1],
            vec![H256::from(Address::from_low_u64_be(0xaa))]
        );

        let filter = topics.to_filter(Address::repeat_byte(1), BlockRange::default());
        assert!(filter.topics[0].is_some());
        assert!(filter.topics[1].is_some());
        assert!(filter.topics[2].is_none());
    }

    #[test]
    fn unknown_event_is_a_configuration_fault() {
        let abi = stake_manager_abi();
        let err = build_topics::<&str>(&abi, "IStakeManager", &["TransactionRelayed"], &[]).unwrap_err();
        assert!(matches!(
            err,
            InteractorError::UnknownEvent { contract: "IStakeManager", .. }
        ));
    }

    #[test]
    fn empty_event_list_is_a_configuration_fault() {
        let abi = stake_manager_abi();
        let err = build_topics(&abi, "IStakeManager", &[], &["0x00000000000000000000000000000000000000aa"])
            .unwrap_err();
        assert!(matches!(
            err,
            InteractorError::NoEventNames { contract: "IStakeManager" }
        ));
    }

    #[tokio::test]
    async fn surfaces_logs_in_node_order() {
        let (provider, mock) = Provider::mocked();
        let abi = stake_manager_abi();
        let signature = abi.event("HubAuthorized").unwrap().signature();
        let hub = H256::from(Address::repeat_byte(0x99));

        let logs: Vec<Log> = [7u64, 3, 7]
            .iter()
            .enumerate()
            .map(|(index, block)| Log {
                address: Address::repeat_byte(0x55),
                topics: vec![
                    signature,
                    H256::from(Address::from_low_u64_be(index as u64 + 1)),
                    hub,
                ],
                block_number: Some(U64::from(*block)),
                log_index: Some(U256::from(index)),
                ..Default::default()
            })
            .collect();
        mock.push::<Vec<Log>, _>(logs).unwrap();

        let topics = build_topics::<&str>(&abi, "IStakeManager", &["HubAuthorized"], &[]).unwrap();
        let found = query_past_events::<_, IStakeManagerEvents>(
            &provider,
            Address::repeat_byte(0x55),
            &topics,
            BlockRange::default(),
        )
        .await
        .unwrap();

        let blocks: Vec<u64> = found
            .iter()
            .map(|e| e.meta.block_number.unwrap().as_u64())
            .collect();
        assert_eq!(blocks, vec![7, 3, 7]);
        assert!(matches!(
            found[0].event,
            IStakeManagerEvents::HubAuthorizedFilter(_)
        ));
    }
}
