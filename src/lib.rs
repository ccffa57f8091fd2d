// src/lib.rs
//! Contract interaction layer for a meta-transaction relay: typed contract
//! bindings, relay call pre-validation, gas accounting, historical event
//! queries and chain identity.

pub mod chain;
pub mod contracts;
pub mod error;
pub mod events;
pub mod gas;
pub mod interactor;
pub mod types;
pub mod validation;

pub use chain::{ChainContext, ChainInfo, NetworkType, SigningOptions};
pub use contracts::{ContractHandle, ContractRegistry, ContractRole};
pub use error::InteractorError;
pub use events::{address_to_topic, build_topics, EventTopicSet, PastEvent};
pub use gas::max_possible_gas;
pub use interactor::ContractInteractor;
pub use types::{BlockRange, GasLimits, InteractorConfig, RelayRequest, ValidationOutcome};
pub use validation::{RelayCallValidator, RelayValidator};
