use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents one of the four suits in a standard 52-card deck.
/// Suits carry no value in blackjack; they only make cards distinct in a shoe.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    /// Hearts suit (♥)
    Hearts,
    /// Diamonds suit (♦)
    Diamonds,
    /// Clubs suit (♣)
    Clubs,
    /// Spades suit (♠)
    Spades,
}

impl Suit {
    pub fn symbol(self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }
}

/// Represents the rank of a playing card from Two through Ace.
/// Discriminants follow pip order; use [`Rank::value`] for blackjack counting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Rank {
    /// Rank 2
    Two = 2,
    /// Rank 3
    Three,
    /// Rank 4
    Four,
    /// Rank 5
    Five,
    /// Rank 6
    Six,
    /// Rank 7
    Seven,
    /// Rank 8
    Eight,
    /// Rank 9
    Nine,
    /// Rank 10
    Ten,
    /// Jack, counts 10
    Jack,
    /// Queen, counts 10
    Queen,
    /// King, counts 10
    King,
    /// Ace, counts 11 or 1
    Ace,
}

impl Rank {
    /// Blackjack value with Aces counted high (11).
    pub fn value(self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Jack | Rank::Queen | Rank::King => 10,
            r => r as u8,
        }
    }

    pub fn is_ten_valued(self) -> bool {
        self.value() == 10
    }

    fn label(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }
}

/// Represents a single playing card with a suit and rank.
/// Cards are immutable values moved between the shoe, hands and the discard pile.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Card {
    /// The rank of the card (Two through Ace)
    pub rank: Rank,
    /// The suit of the card
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn is_ace(&self) -> bool {
        self.rank == Rank::Ace
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

/// Cards in one standard deck.
pub const DECK_SIZE: usize = 52;

/// Ordered sequence of cards. Front (index 0) is the next card to draw.
pub type Stack = Vec<Card>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCardError {
    #[error("empty card notation")]
    Empty,
    #[error("unknown rank in {0:?}")]
    Rank(String),
    #[error("unknown suit in {0:?}")]
    Suit(String),
}

impl FromStr for Card {
    type Err = ParseCardError;

    /// Parses `"A♥"`, `"AH"`, `"10d"` or `"Ts"` style notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s.chars().last().ok_or(ParseCardError::Empty)?;
        let rank_part = &s[..s.len() - suit_char.len_utf8()];
        let suit = match suit_char.to_ascii_uppercase() {
            'H' | '♥' => Suit::Hearts,
            'D' | '♦' => Suit::Diamonds,
            'C' | '♣' => Suit::Clubs,
            'S' | '♠' => Suit::Spades,
            _ => return Err(ParseCardError::Suit(s.to_string())),
        };
        let rank = match rank_part.to_ascii_uppercase().as_str() {
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" | "T" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            "A" => Rank::Ace,
            _ => return Err(ParseCardError::Rank(s.to_string())),
        };
        Ok(Card { rank, suit })
    }
}

/// Parses a whitespace separated list of cards, e.g. `"AH KD QC JS"`.
pub fn parse_cards(s: &str) -> Result<Stack, ParseCardError> {
    s.split_whitespace().map(str::parse).collect()
}

pub fn all_suits() -> [Suit; 4] {
    [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades]
}

pub fn all_ranks() -> [Rank; 13] {
    [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ]
}

pub fn full_deck() -> Stack {
    let mut v = Vec::with_capacity(DECK_SIZE);
    for &s in &all_suits() {
        for &r in &all_ranks() {
            v.push(Card { rank: r, suit: s });
        }
    }
    v
}
