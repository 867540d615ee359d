use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::GameError;

/// Seat identifier handed out by [`crate::game::Game::add_player`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PlayerId(pub usize);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chip ledger for one player. Debited when a wager is placed, credited on
/// payout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    balance: u64,
}

impl Bank {
    pub fn new(balance: u64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn can_cover(&self, amount: u64) -> bool {
        amount <= self.balance
    }

    pub fn debit(&mut self, amount: u64) -> Result<(), GameError> {
        if amount > self.balance {
            return Err(GameError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }
}

/// A seated player and their bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    bank: Bank,
    starting_bankroll: u64,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, bankroll: u64) -> Self {
        Self {
            id,
            name: name.into(),
            bank: Bank::new(bankroll),
            starting_bankroll: bankroll,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut Bank {
        &mut self.bank
    }

    pub fn balance(&self) -> u64 {
        self.bank.balance()
    }

    pub fn starting_bankroll(&self) -> u64 {
        self.starting_bankroll
    }

    /// Balance change since the player sat down.
    pub fn net_profit(&self) -> i64 {
        self.bank.balance() as i64 - self.starting_bankroll as i64
    }
}

/// A wager placed by one player at the start of a round.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub player_id: PlayerId,
    pub amount: u64,
}

impl Bet {
    pub fn new(player_id: PlayerId, amount: u64) -> Self {
        Self { player_id, amount }
    }
}

pub(crate) fn find_player(players: &mut [Player], id: PlayerId) -> Result<&mut Player, GameError> {
    players
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(GameError::UnknownPlayer(id))
}
