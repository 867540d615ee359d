use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether the dealer stands or hits on soft 17.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealerStand {
    /// Stand on all 17s
    #[default]
    S17,
    /// Hit soft 17
    H17,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surrender {
    #[default]
    None,
    /// Offered after the dealer has checked for blackjack
    Late,
    /// Offered before the dealer checks for blackjack
    Early,
}

/// Hand totals on which a double down is permitted.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum DoubleRestriction {
    #[default]
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "9-11")]
    NineToEleven,
    #[serde(rename = "10-11")]
    TenToEleven,
    #[serde(rename = "11")]
    ElevenOnly,
}

impl DoubleRestriction {
    pub fn allows(self, total: u8) -> bool {
        match self {
            DoubleRestriction::Any => true,
            DoubleRestriction::NineToEleven => (9..=11).contains(&total),
            DoubleRestriction::TenToEleven => (10..=11).contains(&total),
            DoubleRestriction::ElevenOnly => total == 11,
        }
    }
}

/// Blackjack payout ratio as numerator:denominator, e.g. 3:2 or 6:5.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Payout {
    pub numerator: u32,
    pub denominator: u32,
}

impl Payout {
    pub const THREE_TO_TWO: Payout = Payout::new(3, 2);
    pub const SIX_TO_FIVE: Payout = Payout::new(6, 5);
    pub const EVEN_MONEY: Payout = Payout::new(1, 1);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Winnings on `bet`, rounded down to whole chips.
    pub fn apply(self, bet: u64) -> u64 {
        if self.denominator == 0 {
            return 0;
        }
        bet * u64::from(self.numerator) / u64::from(self.denominator)
    }

    pub fn ratio(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator.max(1))
    }
}

impl Default for Payout {
    fn default() -> Self {
        Payout::THREE_TO_TWO
    }
}

impl fmt::Display for Payout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.numerator, self.denominator)
    }
}

/// Table rules consumed by a round. Immutable once built.
///
/// ```
/// use blackjack_engine::rules::{DealerStand, Payout, RuleSet};
///
/// let rules = RuleSet::builder()
///     .deck_count(6)
///     .dealer_stand(DealerStand::H17)
///     .blackjack_payout(Payout::SIX_TO_FIVE)
///     .build();
/// assert!(rules.house_edge() > RuleSet::default().house_edge());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub deck_count: u8,
    pub dealer_stand: DealerStand,
    pub blackjack_payout: Payout,
    pub surrender: Surrender,
    pub double_restriction: DoubleRestriction,
    pub double_after_split: bool,
    pub max_splits: u8,
    pub resplit_aces: bool,
    pub hit_split_aces: bool,
    pub max_playable_hands: u8,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            deck_count: 6,
            dealer_stand: DealerStand::S17,
            blackjack_payout: Payout::THREE_TO_TWO,
            surrender: Surrender::None,
            double_restriction: DoubleRestriction::Any,
            double_after_split: true,
            max_splits: 3,
            resplit_aces: false,
            hit_split_aces: false,
            max_playable_hands: 4,
        }
    }
}

// House edge in percent for six decks, S17, 3:2, DAS, no surrender, split to four.
const BASE_EDGE: f64 = 0.40;

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Rough house edge in percent, adjusted additively from a six-deck
    /// baseline for each rule that departs from it.
    pub fn house_edge(&self) -> f64 {
        let mut edge = BASE_EDGE;
        edge += match self.deck_count {
            0 | 1 => -0.48,
            2 => -0.19,
            3 => -0.10,
            4 => -0.06,
            5 => -0.03,
            6 => 0.0,
            7 => 0.01,
            _ => 0.02,
        };
        if self.dealer_stand == DealerStand::H17 {
            edge += 0.22;
        }
        // naturals come about 4.5% of hands
        edge += (1.5 - self.blackjack_payout.ratio()) * 4.53;
        edge += match self.surrender {
            Surrender::None => 0.0,
            Surrender::Late => -0.08,
            Surrender::Early => -0.39,
        };
        edge += match self.double_restriction {
            DoubleRestriction::Any => 0.0,
            DoubleRestriction::NineToEleven => 0.09,
            DoubleRestriction::TenToEleven => 0.18,
            DoubleRestriction::ElevenOnly => 0.78,
        };
        if !self.double_after_split {
            edge += 0.14;
        }
        edge += match self.max_splits {
            0 => 0.57,
            1 => 0.10,
            2 => 0.03,
            _ => 0.0,
        };
        if self.resplit_aces {
            edge -= 0.08;
        }
        if self.hit_split_aces {
            edge -= 0.19;
        }
        edge
    }
}

/// Accumulates rule settings starting from [`RuleSet::default`].
#[derive(Debug, Clone, Default)]
pub struct RuleSetBuilder {
    rules: RuleSet,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn deck_count(mut self, decks: u8) -> Self {
        self.rules.deck_count = decks;
        self
    }

    #[must_use]
    pub fn dealer_stand(mut self, stand: DealerStand) -> Self {
        self.rules.dealer_stand = stand;
        self
    }

    #[must_use]
    pub fn blackjack_payout(mut self, payout: Payout) -> Self {
        self.rules.blackjack_payout = payout;
        self
    }

    #[must_use]
    pub fn surrender(mut self, surrender: Surrender) -> Self {
        self.rules.surrender = surrender;
        self
    }

    #[must_use]
    pub fn double_restriction(mut self, restriction: DoubleRestriction) -> Self {
        self.rules.double_restriction = restriction;
        self
    }

    #[must_use]
    pub fn double_after_split(mut self, allowed: bool) -> Self {
        self.rules.double_after_split = allowed;
        self
    }

    #[must_use]
    pub fn max_splits(mut self, splits: u8) -> Self {
        self.rules.max_splits = splits;
        self
    }

    #[must_use]
    pub fn resplit_aces(mut self, allowed: bool) -> Self {
        self.rules.resplit_aces = allowed;
        self
    }

    #[must_use]
    pub fn hit_split_aces(mut self, allowed: bool) -> Self {
        self.rules.hit_split_aces = allowed;
        self
    }

    #[must_use]
    pub fn max_playable_hands(mut self, hands: u8) -> Self {
        self.rules.max_playable_hands = hands;
        self
    }

    pub fn build(self) -> RuleSet {
        self.rules
    }
}
