//! Round state machine: insurance, player turn, dealer turn, settlement.
//!
//! A [`Round`] owns its hands. Collaborators it needs for a step (the shoe
//! and the players' banks) are passed into each call, so every mutation is
//! visible at the call site. Calls validate first and mutate after; a
//! rejected call leaves the round, shoe and banks as they were.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cards::Card;
use crate::errors::GameError;
use crate::hand::{DealerHand, HandState, PlayerHand};
use crate::player::{find_player, Bet, Player, PlayerId};
use crate::rules::{DealerStand, RuleSet, Surrender};
use crate::shoe::Shoe;

/// Decisions a player can take on the current hand.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hit,
    Stand,
    Double,
    Split,
    Surrender,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Hit => "hit",
            Action::Stand => "stand",
            Action::Double => "double",
            Action::Split => "split",
            Action::Surrender => "surrender",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Dealer shows an Ace; waiting on insurance decisions
    Insurance,
    PlayerTurn,
    DealerTurn,
    /// Results computed, banks not yet credited
    Settling,
    Complete,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundState::Insurance => "insurance",
            RoundState::PlayerTurn => "player_turn",
            RoundState::DealerTurn => "dealer_turn",
            RoundState::Settling => "settling",
            RoundState::Complete => "complete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Blackjack,
    Win,
    Push,
    Lose,
    Surrender,
}

/// Result of one player hand against the dealer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub hand_index: usize,
    pub player_id: PlayerId,
    pub outcome: Outcome,
    /// Final wager on the hand, doubled if the hand was doubled
    pub bet: u64,
    /// Chips returned to the bank for this hand, stake included
    pub payout: u64,
    pub profit: i64,
}

/// Result of an insurance side bet once the dealer has peeked.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct InsuranceResult {
    pub hand_index: usize,
    pub player_id: PlayerId,
    pub stake: u64,
    pub payout: u64,
    pub profit: i64,
}

/// One deal from bets to settlement.
///
/// ```
/// use blackjack_engine::cards::parse_cards;
/// use blackjack_engine::player::{Bet, Player, PlayerId};
/// use blackjack_engine::round::{Action, Round, RoundState};
/// use blackjack_engine::rules::RuleSet;
/// use blackjack_engine::shoe::Shoe;
///
/// let mut shoe = Shoe::from_stack(parse_cards("10H 6D 9C 8S").unwrap(), 75.0);
/// let mut players = vec![Player::new(PlayerId(0), "alice", 500)];
/// shoe.start_next_round();
/// let mut round = Round::new(
///     1,
///     RuleSet::default(),
///     &[Bet::new(PlayerId(0), 100)],
///     &mut shoe,
///     &mut players,
/// )
/// .unwrap();
/// round.play_action(Action::Stand, &mut shoe, &mut players).unwrap();
/// round.play_dealer(&mut shoe).unwrap();
/// assert_eq!(round.state(), RoundState::Settling);
/// round.settle(&mut players).unwrap();
/// assert_eq!(players[0].balance(), 400);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    id: u32,
    state: RoundState,
    rules: RuleSet,
    player_hands: Vec<PlayerHand>,
    current_hand_index: usize,
    dealer_hand: DealerHand,
    settlement_results: Vec<SettlementResult>,
    insurance_results: Vec<InsuranceResult>,
}

impl Round {
    /// Takes the bets, deals from `shoe` and checks for naturals.
    pub fn new(
        id: u32,
        rules: RuleSet,
        bets: &[Bet],
        shoe: &mut Shoe,
        players: &mut [Player],
    ) -> Result<Self, GameError> {
        validate_bets(bets, players)?;
        shoe.ensure_available(2 * (bets.len() + 1))?;

        for bet in bets {
            find_player(players, bet.player_id)?
                .bank_mut()
                .debit(bet.amount)?;
        }
        let deal = shoe.deal(bets.len())?;
        let player_hands: Vec<PlayerHand> = bets
            .iter()
            .zip(deal.players)
            .map(|(bet, cards)| PlayerHand::new(bet.player_id, cards.to_vec(), bet.amount))
            .collect();

        let mut round = Self {
            id,
            state: RoundState::PlayerTurn,
            rules,
            player_hands,
            current_hand_index: 0,
            dealer_hand: DealerHand::new(deal.dealer.to_vec()),
            settlement_results: Vec::new(),
            insurance_results: Vec::new(),
        };
        info!(
            round = id,
            hands = round.player_hands.len(),
            up_card = %deal.dealer[0],
            "round dealt"
        );

        if round.dealer_hand.shows_ace() {
            round.state = RoundState::Insurance;
        } else if round.dealer_hand.shows_ten() && round.dealer_hand.is_blackjack() {
            round.dealer_hand.reveal();
            round.enter_settling();
        } else {
            round.begin_player_turn();
        }
        Ok(round)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn player_hands(&self) -> &[PlayerHand] {
        &self.player_hands
    }

    pub fn current_hand_index(&self) -> usize {
        self.current_hand_index
    }

    pub fn current_hand(&self) -> Option<&PlayerHand> {
        match self.state {
            RoundState::PlayerTurn => self.player_hands.get(self.current_hand_index),
            _ => None,
        }
    }

    pub fn dealer_hand(&self) -> &DealerHand {
        &self.dealer_hand
    }

    pub fn settlement_results(&self) -> &[SettlementResult] {
        &self.settlement_results
    }

    pub fn insurance_results(&self) -> &[InsuranceResult] {
        &self.insurance_results
    }

    pub fn is_complete(&self) -> bool {
        self.state == RoundState::Complete
    }

    /// Every card on the table, for the discard pile once the round is over.
    pub fn cards(&self) -> Vec<Card> {
        self.player_hands
            .iter()
            .flat_map(|h| h.cards.iter().copied())
            .chain(self.dealer_hand.cards.iter().copied())
            .collect()
    }

    /// Legal decisions for the current hand. Empty outside the player turn.
    pub fn available_actions(&self, players: &[Player]) -> Vec<Action> {
        let Some(hand) = self.current_hand() else {
            return Vec::new();
        };
        if hand.state != HandState::Playing {
            return Vec::new();
        }
        let balance = players
            .iter()
            .find(|p| p.id() == hand.player_id)
            .map_or(0, Player::balance);

        let ace_locked = hand.is_split_ace && !self.rules.hit_split_aces;
        let mut actions = Vec::with_capacity(5);
        if !ace_locked {
            actions.push(Action::Hit);
        }
        actions.push(Action::Stand);
        if !ace_locked && self.can_double(hand, balance) {
            actions.push(Action::Double);
        }
        if self.can_split(hand, balance) {
            actions.push(Action::Split);
        }
        if self.can_surrender(hand) {
            actions.push(Action::Surrender);
        }
        actions
    }

    fn can_double(&self, hand: &PlayerHand, balance: u64) -> bool {
        hand.is_first_decision()
            && balance >= hand.bet
            && self.rules.double_restriction.allows(hand.value().total)
            && (!hand.is_split || self.rules.double_after_split)
    }

    fn can_split(&self, hand: &PlayerHand, balance: u64) -> bool {
        if !hand.can_split() || balance < hand.bet {
            return false;
        }
        if hand.split_count >= self.rules.max_splits
            || self.player_hands.len() >= usize::from(self.rules.max_playable_hands)
        {
            return false;
        }
        !hand.cards[0].is_ace() || hand.split_count == 0 || self.rules.resplit_aces
    }

    fn can_surrender(&self, hand: &PlayerHand) -> bool {
        self.rules.surrender != Surrender::None && !hand.is_split && hand.is_first_decision()
    }

    /// Applies `action` to the current hand, then moves on to the next hand
    /// still in play.
    pub fn play_action(
        &mut self,
        action: Action,
        shoe: &mut Shoe,
        players: &mut [Player],
    ) -> Result<(), GameError> {
        self.expect_state(RoundState::PlayerTurn)?;
        if !self.available_actions(players).contains(&action) {
            return Err(GameError::InvalidAction {
                action,
                reason: format!("not available for hand {}", self.current_hand_index),
            });
        }
        let cards_needed = match action {
            Action::Hit | Action::Double => 1,
            Action::Split => 2,
            Action::Stand | Action::Surrender => 0,
        };
        shoe.ensure_available(cards_needed)?;

        let idx = self.current_hand_index;
        let player_id = self.player_hands[idx].player_id;
        match action {
            Action::Hit => {
                let card = shoe.draw_card()?;
                let hand = &mut self.player_hands[idx];
                hand.cards.push(card);
                hand.actions_taken += 1;
                if hand.value().is_bust() {
                    hand.state = HandState::Busted;
                }
            }
            Action::Stand => {
                let hand = &mut self.player_hands[idx];
                hand.actions_taken += 1;
                hand.state = HandState::Stood;
            }
            Action::Double => {
                let extra = self.player_hands[idx].bet;
                find_player(players, player_id)?.bank_mut().debit(extra)?;
                let card = shoe.draw_card()?;
                let hand = &mut self.player_hands[idx];
                hand.bet += extra;
                hand.cards.push(card);
                hand.actions_taken += 1;
                hand.state = if hand.value().is_bust() {
                    HandState::Busted
                } else {
                    HandState::Doubled
                };
            }
            Action::Split => {
                let extra = self.player_hands[idx].bet;
                find_player(players, player_id)?.bank_mut().debit(extra)?;
                let parent = self.player_hands[idx].clone();
                let first = PlayerHand::from_split(&parent, parent.cards[0], shoe.draw_card()?);
                let second = PlayerHand::from_split(&parent, parent.cards[1], shoe.draw_card()?);
                self.player_hands[idx] = first;
                self.player_hands.insert(idx + 1, second);
                self.stand_locked_split_aces(idx, players);
            }
            Action::Surrender => {
                let hand = &mut self.player_hands[idx];
                let refund = hand.bet / 2;
                hand.actions_taken += 1;
                hand.state = HandState::Surrendered;
                find_player(players, player_id)?.bank_mut().credit(refund);
            }
        }
        debug!(
            round = self.id,
            hand = idx,
            %action,
            state = %self.player_hands[idx].state,
            total = self.player_hands[idx].value().total,
            "action applied"
        );
        self.advance();
        Ok(())
    }

    // Split aces get one card each unless the table lets them hit; a new
    // pair of aces stays open only when it may be split again.
    fn stand_locked_split_aces(&mut self, idx: usize, players: &[Player]) {
        if self.rules.hit_split_aces {
            return;
        }
        for i in [idx, idx + 1] {
            let hand = &self.player_hands[i];
            if !hand.is_split_ace {
                continue;
            }
            let balance = players
                .iter()
                .find(|p| p.id() == hand.player_id)
                .map_or(0, Player::balance);
            if !self.can_split(hand, balance) {
                self.player_hands[i].state = HandState::Stood;
            }
        }
    }

    fn advance(&mut self) {
        if self.player_hands[self.current_hand_index].state == HandState::Playing {
            return;
        }
        match (self.current_hand_index..self.player_hands.len())
            .find(|&i| self.player_hands[i].state == HandState::Playing)
        {
            Some(next) => self.current_hand_index = next,
            None => self.finish_player_turn(),
        }
    }

    fn begin_player_turn(&mut self) {
        self.state = RoundState::PlayerTurn;
        match self
            .player_hands
            .iter()
            .position(|h| h.state == HandState::Playing)
        {
            Some(first) => self.current_hand_index = first,
            None => self.finish_player_turn(),
        }
    }

    // The dealer only draws when some hand still has to be compared with
    // the dealer's final total.
    fn finish_player_turn(&mut self) {
        if self.player_hands.iter().any(|h| h.state.needs_dealer()) {
            self.state = RoundState::DealerTurn;
        } else {
            debug!(round = self.id, "no live hands, dealer skips drawing");
            self.dealer_hand.reveal();
            self.enter_settling();
        }
    }

    fn hand_mut(&mut self, hand_index: usize) -> Result<&mut PlayerHand, GameError> {
        self.player_hands
            .get_mut(hand_index)
            .ok_or(GameError::InvalidHandIndex(hand_index))
    }

    fn expect_state(&self, expected: RoundState) -> Result<(), GameError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GameError::WrongState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Places an insurance bet of half the hand's wager.
    pub fn take_insurance(
        &mut self,
        hand_index: usize,
        players: &mut [Player],
    ) -> Result<(), GameError> {
        self.expect_state(RoundState::Insurance)?;
        let hand = self.hand_mut(hand_index)?;
        if hand.insurance_decided {
            return Err(GameError::InsuranceAlreadyDecided(hand_index));
        }
        let stake = hand.bet / 2;
        if stake == 0 {
            return Err(GameError::InvalidBetAmount { amount: stake });
        }
        let player_id = hand.player_id;
        find_player(players, player_id)?.bank_mut().debit(stake)?;
        let hand = self.hand_mut(hand_index)?;
        hand.insurance_bet = stake;
        hand.insurance_decided = true;
        debug!(round = self.id, hand = hand_index, stake, "insurance taken");
        Ok(())
    }

    pub fn decline_insurance(&mut self, hand_index: usize) -> Result<(), GameError> {
        self.expect_state(RoundState::Insurance)?;
        let hand = self.hand_mut(hand_index)?;
        if hand.insurance_decided {
            return Err(GameError::InsuranceAlreadyDecided(hand_index));
        }
        hand.insurance_decided = true;
        Ok(())
    }

    /// Dealer peeks at the hole card. A dealer blackjack pays insurance 2:1
    /// and ends the round straight into settling; otherwise insurance is lost
    /// and play begins.
    pub fn resolve_insurance(&mut self, players: &mut [Player]) -> Result<(), GameError> {
        self.expect_state(RoundState::Insurance)?;
        for hand in &self.player_hands {
            if hand.has_insurance() {
                find_player(players, hand.player_id)?;
            }
        }
        let dealer_blackjack = self.dealer_hand.is_blackjack();
        for (i, hand) in self.player_hands.iter_mut().enumerate() {
            hand.insurance_decided = true;
            if !hand.has_insurance() {
                continue;
            }
            let stake = hand.insurance_bet;
            let result = if dealer_blackjack {
                let payout = stake * 3;
                find_player(players, hand.player_id)?.bank_mut().credit(payout);
                InsuranceResult {
                    hand_index: i,
                    player_id: hand.player_id,
                    stake,
                    payout,
                    profit: (stake * 2) as i64,
                }
            } else {
                InsuranceResult {
                    hand_index: i,
                    player_id: hand.player_id,
                    stake,
                    payout: 0,
                    profit: -(stake as i64),
                }
            };
            self.insurance_results.push(result);
        }
        info!(round = self.id, dealer_blackjack, "insurance resolved");

        if dealer_blackjack {
            self.dealer_hand.reveal();
            self.enter_settling();
        } else {
            self.begin_player_turn();
        }
        Ok(())
    }

    /// Reveals the hole card and draws to the table's standing rule.
    pub fn play_dealer(&mut self, shoe: &mut Shoe) -> Result<(), GameError> {
        self.expect_state(RoundState::DealerTurn)?;
        self.dealer_hand.reveal();
        while self.dealer_must_hit() {
            let card = shoe.draw_card()?;
            self.dealer_hand.cards.push(card);
        }
        let value = self.dealer_hand.value();
        debug!(
            round = self.id,
            total = value.total,
            cards = self.dealer_hand.cards.len(),
            "dealer finished"
        );
        self.enter_settling();
        Ok(())
    }

    fn dealer_must_hit(&self) -> bool {
        let v = self.dealer_hand.value();
        match v.total {
            0..=16 => true,
            17 => v.soft && self.rules.dealer_stand == DealerStand::H17,
            _ => false,
        }
    }

    fn enter_settling(&mut self) {
        self.state = RoundState::Settling;
        let dealer_blackjack = self.dealer_hand.is_blackjack();
        let dealer = self.dealer_hand.value();
        let payout_ratio = self.rules.blackjack_payout;

        let mut results = Vec::with_capacity(self.player_hands.len());
        for (i, hand) in self.player_hands.iter().enumerate() {
            let bet = hand.bet;
            let (outcome, payout) = match hand.state {
                HandState::Surrendered => (Outcome::Surrender, bet / 2),
                HandState::Blackjack if dealer_blackjack => (Outcome::Push, bet),
                HandState::Blackjack => (Outcome::Blackjack, bet + payout_ratio.apply(bet)),
                HandState::Busted => (Outcome::Lose, 0),
                _ if dealer_blackjack => (Outcome::Lose, 0),
                _ => {
                    let total = hand.value().total;
                    if dealer.is_bust() || total > dealer.total {
                        (Outcome::Win, bet * 2)
                    } else if total == dealer.total {
                        (Outcome::Push, bet)
                    } else {
                        (Outcome::Lose, 0)
                    }
                }
            };
            results.push(SettlementResult {
                hand_index: i,
                player_id: hand.player_id,
                outcome,
                bet,
                payout,
                profit: payout as i64 - bet as i64,
            });
        }
        self.settlement_results = results;
    }

    /// Credits every payout not already returned, marks each hand won, lost
    /// or pushed and completes the round.
    pub fn settle(&mut self, players: &mut [Player]) -> Result<Vec<SettlementResult>, GameError> {
        self.expect_state(RoundState::Settling)?;
        for r in &self.settlement_results {
            find_player(players, r.player_id)?;
        }
        for r in &self.settlement_results {
            // surrender refunds were credited when the hand was given up
            if r.outcome != Outcome::Surrender && r.payout > 0 {
                find_player(players, r.player_id)?.bank_mut().credit(r.payout);
            }
            self.player_hands[r.hand_index].state = match r.outcome {
                Outcome::Blackjack | Outcome::Win => HandState::Won,
                Outcome::Push => HandState::Pushed,
                Outcome::Lose => HandState::Lost,
                Outcome::Surrender => HandState::Surrendered,
            };
        }
        self.state = RoundState::Complete;
        let net: i64 = self.settlement_results.iter().map(|r| r.profit).sum();
        info!(round = self.id, net, "round settled");
        Ok(self.settlement_results.clone())
    }
}

/// Rejects empty or zero bets, unknown players and wagers a bank cannot cover.
pub(crate) fn validate_bets(bets: &[Bet], players: &[Player]) -> Result<(), GameError> {
    if bets.is_empty() {
        return Err(GameError::InvalidBetAmount { amount: 0 });
    }
    if let Some(bad) = bets.iter().find(|b| b.amount == 0) {
        return Err(GameError::InvalidBetAmount { amount: bad.amount });
    }
    for bet in bets {
        let player = players
            .iter()
            .find(|p| p.id() == bet.player_id)
            .ok_or(GameError::UnknownPlayer(bet.player_id))?;
        // a player may hold more than one seat
        let total: u64 = bets
            .iter()
            .filter(|b| b.player_id == bet.player_id)
            .map(|b| b.amount)
            .sum();
        if !player.bank().can_cover(total) {
            return Err(GameError::InsufficientFunds {
                required: total,
                available: player.balance(),
            });
        }
    }
    Ok(())
}
