use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Stack};
use crate::player::PlayerId;

/// Evaluated total of a set of cards.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct HandValue {
    pub total: u8,
    /// At least one Ace still counts as 11
    pub soft: bool,
}

impl HandValue {
    pub fn is_bust(&self) -> bool {
        self.total > 21
    }
}

/// Counts Aces as 11, then downgrades them to 1 one at a time while the total
/// exceeds 21.
pub fn hand_value(cards: &[Card]) -> HandValue {
    let mut total: u32 = 0;
    let mut high_aces = 0u8;
    for c in cards {
        if c.is_ace() {
            high_aces += 1;
        }
        total += u32::from(c.value());
    }
    while total > 21 && high_aces > 0 {
        total -= 10;
        high_aces -= 1;
    }
    HandValue {
        total: total.min(u32::from(u8::MAX)) as u8,
        soft: high_aces > 0,
    }
}

/// Lifecycle of a player hand within a round.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandState {
    Playing,
    Stood,
    Busted,
    Doubled,
    Surrendered,
    Blackjack,
    Won,
    Lost,
    Pushed,
}

impl HandState {
    /// Hands still to be compared against the dealer's final total.
    pub fn needs_dealer(self) -> bool {
        matches!(self, HandState::Playing | HandState::Stood | HandState::Doubled)
    }
}

impl fmt::Display for HandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandState::Playing => "playing",
            HandState::Stood => "stood",
            HandState::Busted => "busted",
            HandState::Doubled => "doubled",
            HandState::Surrendered => "surrendered",
            HandState::Blackjack => "blackjack",
            HandState::Won => "won",
            HandState::Lost => "lost",
            HandState::Pushed => "pushed",
        };
        f.write_str(s)
    }
}

/// One player hand. Owned by exactly one round.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerHand {
    pub player_id: PlayerId,
    pub cards: Stack,
    pub bet: u64,
    pub state: HandState,
    pub is_split: bool,
    pub is_split_ace: bool,
    pub split_count: u8,
    pub insurance_bet: u64,
    pub insurance_decided: bool,
    /// Decisions taken on this hand so far
    pub actions_taken: u32,
}

impl PlayerHand {
    pub fn new(player_id: PlayerId, cards: Stack, bet: u64) -> Self {
        let mut hand = Self {
            player_id,
            cards,
            bet,
            state: HandState::Playing,
            is_split: false,
            is_split_ace: false,
            split_count: 0,
            insurance_bet: 0,
            insurance_decided: false,
            actions_taken: 0,
        };
        if hand.is_blackjack() {
            hand.state = HandState::Blackjack;
        }
        hand
    }

    /// A hand produced by splitting `parent`, holding `first` plus a fresh card.
    pub fn from_split(parent: &PlayerHand, first: Card, drawn: Card) -> Self {
        Self {
            player_id: parent.player_id,
            cards: vec![first, drawn],
            bet: parent.bet,
            state: HandState::Playing,
            is_split: true,
            is_split_ace: first.is_ace(),
            split_count: parent.split_count + 1,
            insurance_bet: 0,
            insurance_decided: true,
            actions_taken: 0,
        }
    }

    pub fn value(&self) -> HandValue {
        hand_value(&self.cards)
    }

    /// Natural: two cards totalling 21 on a hand that was never split.
    pub fn is_blackjack(&self) -> bool {
        !self.is_split && self.split_count == 0 && self.cards.len() == 2 && self.value().total == 21
    }

    /// Two cards of the same rank.
    pub fn can_split(&self) -> bool {
        self.cards.len() == 2 && self.cards[0].rank == self.cards[1].rank
    }

    pub fn has_insurance(&self) -> bool {
        self.insurance_bet > 0
    }

    pub fn is_first_decision(&self) -> bool {
        self.cards.len() == 2 && self.actions_taken == 0
    }
}

/// The dealer's hand. The first card is the up-card; the second stays hidden
/// until [`DealerHand::reveal`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DealerHand {
    pub cards: Stack,
    pub hole_revealed: bool,
}

impl DealerHand {
    pub fn new(cards: Stack) -> Self {
        Self {
            cards,
            hole_revealed: false,
        }
    }

    pub fn up_card(&self) -> Option<Card> {
        self.cards.first().copied()
    }

    pub fn reveal(&mut self) {
        self.hole_revealed = true;
    }

    /// Cards a player may see: everything once revealed, else the up-card.
    pub fn visible_cards(&self) -> &[Card] {
        if self.hole_revealed {
            &self.cards
        } else {
            &self.cards[..self.cards.len().min(1)]
        }
    }

    pub fn value(&self) -> HandValue {
        hand_value(&self.cards)
    }

    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.value().total == 21
    }

    pub fn shows_ace(&self) -> bool {
        self.up_card().is_some_and(|c| c.is_ace())
    }

    /// Ten-valued up card: the dealer peeks before anyone plays.
    pub fn shows_ten(&self) -> bool {
        self.up_card().is_some_and(|c| c.rank.is_ten_valued())
    }
}
