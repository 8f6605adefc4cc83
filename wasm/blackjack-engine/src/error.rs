use thiserror::Error;

use crate::game::Phase;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BankrollError {
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: f64, requested: f64 },
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("a balance request is already in flight")]
    RequestPending,
    #[error("remote ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid bet: {0}")]
    InvalidBet(String),
    #[error("cannot {action} while {phase}")]
    InvalidState { action: &'static str, phase: Phase },
    #[error("deck is empty")]
    EmptyDeck,
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("a remote request for this round is still pending")]
    RequestPending,
    #[error("cannot start over with {0} tokens left")]
    BalanceRemaining(f64),
    #[error("invalid card: {0}")]
    InvalidCard(String),
    #[error(transparent)]
    Bankroll(BankrollError),
}

impl From<BankrollError> for EngineError {
    fn from(err: BankrollError) -> Self {
        match err {
            BankrollError::Unavailable(message) => EngineError::RemoteUnavailable(message),
            BankrollError::RequestPending => EngineError::RequestPending,
            other => EngineError::Bankroll(other),
        }
    }
}
