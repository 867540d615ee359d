use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cards::{Card, Stack};
use crate::errors::GameError;
use crate::shuffle::{new_shoe_stack, shuffle_shoe};

/// Cards dealt at the start of a round: two per seat and two for the dealer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Deal {
    pub players: Vec<[Card; 2]>,
    pub dealer: [Card; 2],
}

/// Point-in-time counters of a [`Shoe`], safe to hand to collaborators.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShoeStats {
    pub remaining_cards: usize,
    pub discarded_cards: usize,
    pub total_cards: usize,
    pub dealt_count: usize,
    pub cut_card_position: usize,
    pub is_complete: bool,
    pub current_round: u32,
}

/// Multi-deck card source with a cut card.
///
/// Once the cut card comes out the shoe is marked complete but keeps dealing,
/// so the round in progress can finish. A round started after that point may
/// not draw at all.
///
/// # Examples
///
/// ```
/// use blackjack_engine::cards::parse_cards;
/// use blackjack_engine::shoe::Shoe;
///
/// let stack = parse_cards("AH KD QC JS 9S").unwrap();
/// let mut shoe = Shoe::from_stack(stack, 40.0);
/// shoe.start_next_round();
/// let deal = shoe.deal(1).unwrap();
/// assert_eq!(deal.players[0][0].to_string(), "A♥");
/// assert_eq!(shoe.remaining_cards(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Shoe {
    stack: Stack,
    /// Index of the next card to draw; everything before it is dealt
    position: usize,
    discard_pile: Stack,
    /// Percent of the shoe in front of the cut card (0-100)
    penetration: f64,
    cut_card_position: usize,
    dealt_count: usize,
    is_complete: bool,
    /// Set when a round starts on an already complete shoe
    locked: bool,
    current_round: u32,
}

impl Shoe {
    /// Builds and shuffles a shoe of `num_decks` decks.
    pub fn new<R: Rng + ?Sized>(num_decks: u8, penetration: f64, rng: &mut R) -> Self {
        let stack = new_shoe_stack(num_decks, penetration, None, rng);
        Self::with_stack(stack, penetration)
    }

    /// Uses `stack` as-is, front first. For reproducible tests.
    pub fn from_stack(stack: Stack, penetration: f64) -> Self {
        Self::with_stack(stack, penetration)
    }

    fn with_stack(stack: Stack, penetration: f64) -> Self {
        let penetration = penetration.clamp(0.0, 100.0);
        let total = stack.len();
        let cut_card_position = (total as f64 * (1.0 - penetration / 100.0)).floor() as usize;
        Self {
            stack,
            position: 0,
            discard_pile: Vec::new(),
            penetration,
            cut_card_position,
            dealt_count: 0,
            is_complete: false,
            locked: false,
            current_round: 0,
        }
    }

    pub fn draw_card(&mut self) -> Result<Card, GameError> {
        if self.locked {
            return Err(GameError::ShoeExhausted);
        }
        let card = *self
            .stack
            .get(self.position)
            .ok_or(GameError::ShoeExhausted)?;
        self.position += 1;
        self.dealt_count += 1;
        if !self.is_complete && self.dealt_count > self.cut_card_position {
            debug!(
                dealt = self.dealt_count,
                remaining = self.remaining_cards(),
                "cut card reached"
            );
            self.is_complete = true;
        }
        Ok(card)
    }

    /// Fails unless `n` more cards can be drawn right now.
    pub fn ensure_available(&self, n: usize) -> Result<(), GameError> {
        if self.locked || self.remaining_cards() < n {
            Err(GameError::ShoeExhausted)
        } else {
            Ok(())
        }
    }

    /// Deals two cards to each of `num_players` seats, then two to the dealer.
    /// Each seat receives its pair back to back, seats in order.
    pub fn deal(&mut self, num_players: usize) -> Result<Deal, GameError> {
        self.ensure_available(2 * (num_players + 1))?;
        let mut players = Vec::with_capacity(num_players);
        for _ in 0..num_players {
            let first = self.draw_card()?;
            let second = self.draw_card()?;
            players.push([first, second]);
        }
        let dealer = [self.draw_card()?, self.draw_card()?];
        Ok(Deal { players, dealer })
    }

    pub fn discard<I: IntoIterator<Item = Card>>(&mut self, cards: I) {
        self.discard_pile.extend(cards);
    }

    /// Shuffles the discard pile and places it under the undealt cards,
    /// returning how many cards came back. Cut-card state is unchanged.
    pub fn restock<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let discards = std::mem::take(&mut self.discard_pile);
        let count = discards.len();
        self.stack.drain(..self.position);
        self.position = 0;
        self.stack.extend(shuffle_shoe(&discards, Some(100.0), rng));
        debug!(count, remaining = self.remaining_cards(), "discards restocked");
        count
    }

    pub fn start_next_round(&mut self) {
        self.current_round += 1;
        if self.is_complete {
            self.locked = true;
        }
    }

    pub fn remaining_cards(&self) -> usize {
        self.stack.len() - self.position
    }

    pub fn discarded_cards(&self) -> usize {
        self.discard_pile.len()
    }

    /// Cards accounted for by the shoe: undealt plus discarded.
    pub fn total_cards(&self) -> usize {
        self.remaining_cards() + self.discarded_cards()
    }

    pub fn penetration(&self) -> f64 {
        self.penetration
    }

    pub fn cut_card_position(&self) -> usize {
        self.cut_card_position
    }

    pub fn dealt_count(&self) -> usize {
        self.dealt_count
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn stats(&self) -> ShoeStats {
        ShoeStats {
            remaining_cards: self.remaining_cards(),
            discarded_cards: self.discarded_cards(),
            total_cards: self.total_cards(),
            dealt_count: self.dealt_count,
            cut_card_position: self.cut_card_position,
            is_complete: self.is_complete,
            current_round: self.current_round,
        }
    }
}
