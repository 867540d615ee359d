use thiserror::Error;

use crate::player::PlayerId;
use crate::round::{Action, RoundState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Insufficient funds: {required} required, {available} available")]
    InsufficientFunds { required: u64, available: u64 },
    #[error("Invalid bet amount: {amount}")]
    InvalidBetAmount { amount: u64 },
    #[error("Action {action} not allowed: {reason}")]
    InvalidAction { action: Action, reason: String },
    #[error("Round is in state {actual}, expected {expected}")]
    WrongState {
        expected: RoundState,
        actual: RoundState,
    },
    #[error("No round in progress")]
    NoActiveRound,
    #[error("A round is already in progress")]
    RoundInProgress,
    #[error("Shoe exhausted, reshuffle required")]
    ShoeExhausted,
    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("No hand at index {0}")]
    InvalidHandIndex(usize),
    #[error("Insurance already decided for hand {0}")]
    InsuranceAlreadyDecided(usize),
    #[error("Session has ended")]
    SessionEnded,
}
