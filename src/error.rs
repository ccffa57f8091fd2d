// src/error.rs
use ethers::contract::ContractError;
use ethers::providers::Middleware;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InteractorError {
    #[error("Chain context read before initialization")]
    Uninitialized,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Relay call simulation failed: {0}")]
    SimulationFailure(String),

    #[error("Node transport error: {0}")]
    Transport(String),

    #[error("Event {event} is not declared by {contract}")]
    UnknownEvent { contract: &'static str, event: String },

    #[error("No events named for a {contract} log query")]
    NoEventNames { contract: &'static str },

    #[error("Gas calculation overflow")]
    GasOverflow,

    #[error("Failed to decode node response: {0}")]
    Decode(String),

    #[error("Transaction signing failed: {0}")]
    Signing(String),
}

impl<M: Middleware> From<ContractError<M>> for InteractorError {
    fn from(err: ContractError<M>) -> Self {
        InteractorError::Transport(err.to_string())
    }
}

pub type Result<T, E = InteractorError> = std::result::Result<T, E>;
