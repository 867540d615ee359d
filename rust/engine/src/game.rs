use chrono::{SecondsFormat, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cards::{Stack, DECK_SIZE};
use crate::config::TableConfig;
use crate::errors::GameError;
use crate::logger::{format_session_id, EventLog, EventRecord, EventSink, GameEvent};
use crate::player::{Bet, Player, PlayerId};
use crate::round::{validate_bets, Action, Round, RoundState, SettlementResult};
use crate::rules::RuleSet;
use crate::shoe::{Shoe, ShoeStats};

/// Seed used for games built around a fixed test stack.
pub const DEFAULT_SEED: u64 = 0xA1A2_A3A4;

/// Balance summary for one seated player.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub id: PlayerId,
    pub name: String,
    pub starting_bankroll: u64,
    pub balance: u64,
    pub net_profit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub session_id: String,
    /// Number of the most recently started round
    pub round_number: u32,
    pub rounds_played: u32,
    pub shoe: ShoeStats,
    pub house_balance: i64,
    pub house_edge: f64,
    pub players: Vec<PlayerStats>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub rounds_played: u32,
    pub house_balance: i64,
    pub house_net: i64,
    pub players: Vec<PlayerStats>,
}

/// Session-level orchestrator: one shoe shared by many rounds, the seated
/// players and their banks, the house bankroll and the audit trail.
///
/// Commands return an owned [`Round`] snapshot; the game's own state is never
/// handed out mutably.
///
/// # Examples
///
/// ```
/// use blackjack_engine::cards::parse_cards;
/// use blackjack_engine::game::Game;
/// use blackjack_engine::player::Bet;
/// use blackjack_engine::round::{Action, Outcome, RoundState};
/// use blackjack_engine::rules::RuleSet;
///
/// let stack = parse_cards("10H 9D 7C 10S 8H").unwrap();
/// let mut game = Game::with_test_stack(RuleSet::default(), 75.0, 10_000, stack);
/// let alice = game.add_player("alice", 1_000);
///
/// let round = game.start_round(&[Bet::new(alice, 100)]).unwrap();
/// assert_eq!(round.state(), RoundState::PlayerTurn);
/// game.play_action(Action::Stand).unwrap();
///
/// let results = game.complete_round().unwrap();
/// assert_eq!(results[0].outcome, Outcome::Win);
/// assert_eq!(game.player(alice).unwrap().balance(), 1_100);
/// ```
pub struct Game {
    session_id: String,
    rules: RuleSet,
    penetration: f64,
    rng: ChaCha20Rng,
    shoe: Shoe,
    players: Vec<Player>,
    house_balance: i64,
    starting_house_bankroll: i64,
    table_bankroll: u64,
    round: Option<Round>,
    round_number: u32,
    rounds_played: u32,
    log: EventLog,
    sinks: Vec<Box<dyn EventSink>>,
    ended: bool,
}

impl Game {
    /// Builds a game with a freshly shuffled shoe. Without a seed the RNG is
    /// seeded from the thread RNG.
    pub fn new(rules: RuleSet, penetration: f64, house_bankroll: i64, seed: Option<u64>) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed.unwrap_or_else(rand::random));
        let shoe = Shoe::new(rules.deck_count, penetration, &mut rng);
        Self::assemble(rules, penetration, house_bankroll, rng, shoe)
    }

    /// Deals the first shoe from `stack` exactly as given. Later shoes are
    /// shuffled from [`DEFAULT_SEED`].
    pub fn with_test_stack(
        rules: RuleSet,
        penetration: f64,
        house_bankroll: i64,
        stack: Stack,
    ) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(DEFAULT_SEED);
        let shoe = Shoe::from_stack(stack, penetration);
        Self::assemble(rules, penetration, house_bankroll, rng, shoe)
    }

    /// Players seated with [`Game::add_table_player`] start with the
    /// configured `starting_bankroll`.
    pub fn from_config(config: &TableConfig) -> Self {
        let mut game = Self::new(
            config.rules.clone(),
            config.penetration,
            config.house_bankroll,
            config.seed,
        );
        game.table_bankroll = config.starting_bankroll;
        game
    }

    fn assemble(
        rules: RuleSet,
        penetration: f64,
        house_bankroll: i64,
        mut rng: ChaCha20Rng,
        shoe: Shoe,
    ) -> Self {
        let date = Utc::now().format("%Y%m%d").to_string();
        let session_id = format_session_id(&date, rng.random_range(0..1_000_000));
        let mut game = Self {
            session_id,
            rules,
            penetration,
            rng,
            shoe,
            players: Vec::new(),
            house_balance: house_bankroll,
            starting_house_bankroll: house_bankroll,
            table_bankroll: TableConfig::default().starting_bankroll,
            round: None,
            round_number: 0,
            rounds_played: 0,
            log: EventLog::new(),
            sinks: Vec::new(),
            ended: false,
        };
        info!(session = %game.session_id, decks = game.rules.deck_count, "session started");
        game.emit(GameEvent::SessionStarted {
            deck_count: game.rules.deck_count,
            penetration: game.penetration.round() as u32,
            house_edge_bp: (game.rules.house_edge() * 100.0).round() as i32,
        });
        game
    }

    /// Adds a sink that receives every event recorded from now on.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    fn emit(&mut self, event: GameEvent) {
        let record = EventRecord {
            session_id: self.session_id.clone(),
            round: self.round_number,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            event,
        };
        for sink in &mut self.sinks {
            if let Err(e) = sink.record(&record) {
                warn!(error = %e, "event sink failed");
            }
        }
        // in-memory log cannot fail
        let _ = self.log.record(&record);
    }

    pub fn add_player(&mut self, name: impl Into<String>, bankroll: u64) -> PlayerId {
        let id = PlayerId(self.players.len());
        self.players.push(Player::new(id, name, bankroll));
        id
    }

    /// Seats a player with the table's starting bankroll.
    pub fn add_table_player(&mut self, name: impl Into<String>) -> PlayerId {
        self.add_player(name, self.table_bankroll)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn events(&self) -> &[EventRecord] {
        self.log.records()
    }

    pub fn shoe_stats(&self) -> ShoeStats {
        self.shoe.stats()
    }

    /// The round in progress, or the last completed one.
    pub fn current_round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    fn active_round(&mut self) -> Result<&mut Round, GameError> {
        match self.round.as_mut() {
            Some(round) if !round.is_complete() => Ok(round),
            _ => Err(GameError::NoActiveRound),
        }
    }

    fn snapshot(&self) -> Result<Round, GameError> {
        self.round.clone().ok_or(GameError::NoActiveRound)
    }

    /// Takes the bets and deals a new round. A shoe whose cut card came out
    /// during an earlier round, or that is too short for the deal, is replaced
    /// by a freshly shuffled one first.
    pub fn start_round(&mut self, bets: &[Bet]) -> Result<Round, GameError> {
        if self.ended {
            return Err(GameError::SessionEnded);
        }
        if self.round.as_ref().is_some_and(|r| !r.is_complete()) {
            return Err(GameError::RoundInProgress);
        }
        validate_bets(bets, &self.players)?;

        let needed = 2 * (bets.len() + 1);
        let reshuffle = self.shoe.is_complete() || self.shoe.remaining_cards() < needed;
        if reshuffle && usize::from(self.rules.deck_count) * DECK_SIZE < needed {
            return Err(GameError::ShoeExhausted);
        }
        if reshuffle {
            self.reshuffle();
        }
        self.shoe.start_next_round();
        let id = self.round_number + 1;
        let round = Round::new(
            id,
            self.rules.clone(),
            bets,
            &mut self.shoe,
            &mut self.players,
        )?;
        self.round_number = id;
        self.emit(GameEvent::RoundStarted {
            bets: bets.to_vec(),
            player_cards: round.player_hands().iter().map(|h| h.cards.clone()).collect(),
            dealer_up_card: round.dealer_hand().up_card(),
        });
        self.round = Some(round);
        self.snapshot()
    }

    fn reshuffle(&mut self) {
        self.shoe = Shoe::new(self.rules.deck_count, self.penetration, &mut self.rng);
        let stats = self.shoe.stats();
        info!(
            total = stats.total_cards,
            cut_card = stats.cut_card_position,
            "shoe reshuffled"
        );
        self.emit(GameEvent::ShoeShuffled {
            total_cards: stats.total_cards,
            cut_card_position: stats.cut_card_position,
        });
    }

    // Runs a round step; if the shoe runs dry part way, the discards are
    // shuffled back in and the step is retried. Steps either fail before
    // drawing or resume where they stopped.
    fn step<T, F>(&mut self, mut f: F) -> Result<T, GameError>
    where
        F: FnMut(&mut Round, &mut Shoe, &mut [Player]) -> Result<T, GameError>,
    {
        let round = self
            .round
            .as_mut()
            .filter(|r| !r.is_complete())
            .ok_or(GameError::NoActiveRound)?;
        match f(round, &mut self.shoe, &mut self.players[..]) {
            Err(GameError::ShoeExhausted) if self.shoe.discarded_cards() > 0 => {
                let cards = self.shoe.restock(&mut self.rng);
                info!(cards, "shoe ran dry, discards restocked");
                self.emit(GameEvent::ShoeRestocked { cards });
                let round = self
                    .round
                    .as_mut()
                    .filter(|r| !r.is_complete())
                    .ok_or(GameError::NoActiveRound)?;
                f(round, &mut self.shoe, &mut self.players[..])
            }
            other => other,
        }
    }

    pub fn available_actions(&self) -> Result<Vec<Action>, GameError> {
        match &self.round {
            Some(round) if !round.is_complete() => Ok(round.available_actions(&self.players)),
            _ => Err(GameError::NoActiveRound),
        }
    }

    pub fn play_action(&mut self, action: Action) -> Result<Round, GameError> {
        let hand_index = self.step(|round, shoe, players| {
            let hand_index = round.current_hand_index();
            round.play_action(action, shoe, players)?;
            Ok(hand_index)
        })?;
        let Some(round) = self.round.as_ref() else {
            return Err(GameError::NoActiveRound);
        };
        let hand = &round.player_hands()[hand_index];
        let event = GameEvent::ActionTaken {
            hand_index,
            action,
            cards: hand.cards.clone(),
            state: hand.state,
            total: hand.value().total,
        };
        self.emit(event);
        self.snapshot()
    }

    pub fn take_insurance(&mut self, hand_index: usize) -> Result<Round, GameError> {
        let round = self.round.as_mut().filter(|r| !r.is_complete());
        let Some(round) = round else {
            return Err(GameError::NoActiveRound);
        };
        round.take_insurance(hand_index, &mut self.players)?;
        let stake = round.player_hands()[hand_index].insurance_bet;
        self.emit(GameEvent::InsuranceTaken { hand_index, stake });
        self.snapshot()
    }

    pub fn decline_insurance(&mut self, hand_index: usize) -> Result<Round, GameError> {
        self.active_round()?.decline_insurance(hand_index)?;
        self.emit(GameEvent::InsuranceDeclined { hand_index });
        self.snapshot()
    }

    pub fn resolve_insurance(&mut self) -> Result<Round, GameError> {
        let round = self.round.as_mut().filter(|r| !r.is_complete());
        let Some(round) = round else {
            return Err(GameError::NoActiveRound);
        };
        round.resolve_insurance(&mut self.players)?;
        let results = round.insurance_results().to_vec();
        let dealer_blackjack = round.dealer_hand().is_blackjack();
        self.house_balance -= results.iter().map(|r| r.profit).sum::<i64>();
        self.emit(GameEvent::InsuranceResolved {
            dealer_blackjack,
            results,
        });
        self.snapshot()
    }

    /// Runs the dealer's turn. Fails unless the round is waiting on the dealer.
    pub fn play_dealer(&mut self) -> Result<Round, GameError> {
        self.step(|round, shoe, _| round.play_dealer(shoe))?;
        let Some(round) = self.round.as_ref() else {
            return Err(GameError::NoActiveRound);
        };
        let dealer = round.dealer_hand();
        let event = GameEvent::DealerPlayed {
            cards: dealer.cards.clone(),
            total: dealer.value().total,
        };
        self.emit(event);
        self.snapshot()
    }

    /// Plays the dealer if still pending, credits payouts, and discards the
    /// round's cards.
    pub fn complete_round(&mut self) -> Result<Vec<SettlementResult>, GameError> {
        let state = self.active_round()?.state();
        match state {
            RoundState::DealerTurn => {
                self.play_dealer()?;
            }
            RoundState::Settling => {}
            actual => {
                return Err(GameError::WrongState {
                    expected: RoundState::Settling,
                    actual,
                })
            }
        }
        let round = self
            .round
            .as_mut()
            .filter(|r| !r.is_complete())
            .ok_or(GameError::NoActiveRound)?;
        let results = round.settle(&mut self.players)?;
        let cards = round.cards();
        self.shoe.discard(cards);
        self.house_balance -= results.iter().map(|r| r.profit).sum::<i64>();
        self.rounds_played += 1;
        self.emit(GameEvent::SettlementComputed {
            results: results.clone(),
            shoe: self.shoe.stats(),
        });
        Ok(results)
    }

    fn player_stats(&self) -> Vec<PlayerStats> {
        self.players
            .iter()
            .map(|p| PlayerStats {
                id: p.id(),
                name: p.name().to_string(),
                starting_bankroll: p.starting_bankroll(),
                balance: p.balance(),
                net_profit: p.net_profit(),
            })
            .collect()
    }

    pub fn stats(&self) -> GameStats {
        GameStats {
            session_id: self.session_id.clone(),
            round_number: self.round_number,
            rounds_played: self.rounds_played,
            shoe: self.shoe.stats(),
            house_balance: self.house_balance,
            house_edge: self.rules.house_edge(),
            players: self.player_stats(),
        }
    }

    /// Closes the session. No round may be in progress.
    pub fn end_session(&mut self) -> Result<SessionSummary, GameError> {
        if self.ended {
            return Err(GameError::SessionEnded);
        }
        if self.round.as_ref().is_some_and(|r| !r.is_complete()) {
            return Err(GameError::RoundInProgress);
        }
        self.ended = true;
        let players = self.player_stats();
        info!(session = %self.session_id, rounds = self.rounds_played, "session ended");
        self.emit(GameEvent::SessionEnded {
            rounds_played: self.rounds_played,
            net_profit: players.iter().map(|p| (p.id, p.net_profit)).collect(),
        });
        Ok(SessionSummary {
            session_id: self.session_id.clone(),
            rounds_played: self.rounds_played,
            house_balance: self.house_balance,
            house_net: self.house_balance - self.starting_house_bankroll,
            players,
        })
    }
}
