//! # blackjack-engine: Blackjack Game Engine Core
//!
//! A deterministic single-player blackjack engine for practice, card-counting
//! drills and strategy analysis. Provides a casino-style shoe with cut-card
//! penetration, rule-driven legal actions, the round state machine and
//! settlement, with a reproducible RNG and a structured audit trail.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card representation (Suit, Rank, Card) and deck construction
//! - [`shuffle`] - Riffle, overhand and cut shuffles over a pluggable RNG
//! - [`shoe`] - Multi-deck shoe with draw, discard and cut-card tracking
//! - [`rules`] - Table rules and house-edge estimate
//! - [`hand`] - Hand values, player and dealer hands
//! - [`round`] - Round state machine, legal actions and settlement
//! - [`player`] - Players, banks and bets
//! - [`game`] - Session orchestration across rounds
//! - [`logger`] - Audit events and sinks
//! - [`config`] - Table configuration from TOML and environment
//! - [`errors`] - Error types for game operations
//!
//! ## Quick Start
//!
//! ```rust
//! use blackjack_engine::cards::parse_cards;
//! use blackjack_engine::hand::hand_value;
//!
//! let soft = hand_value(&parse_cards("AH 6D").unwrap());
//! assert_eq!((soft.total, soft.soft), (17, true));
//!
//! let hard = hand_value(&parse_cards("AH 6D 10C").unwrap());
//! assert_eq!((hard.total, hard.soft), (17, false));
//! ```
//!
//! ## Deterministic Gameplay
//!
//! Shuffles are reproducible from a seed:
//!
//! ```rust
//! use blackjack_engine::shoe::Shoe;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut a = Shoe::new(6, 75.0, &mut ChaCha20Rng::seed_from_u64(42));
//! let mut b = Shoe::new(6, 75.0, &mut ChaCha20Rng::seed_from_u64(42));
//! assert_eq!(a.draw_card(), b.draw_card());
//! ```
//!
//! ## Legal Actions
//!
//! ```rust
//! use blackjack_engine::cards::parse_cards;
//! use blackjack_engine::game::Game;
//! use blackjack_engine::player::Bet;
//! use blackjack_engine::round::Action;
//! use blackjack_engine::rules::RuleSet;
//!
//! let stack = parse_cards("8H 8D 10C 7S").unwrap();
//! let mut game = Game::with_test_stack(RuleSet::default(), 75.0, 10_000, stack);
//! let seat = game.add_player("alice", 1_000);
//! game.start_round(&[Bet::new(seat, 50)]).unwrap();
//! assert_eq!(
//!     game.available_actions().unwrap(),
//!     vec![Action::Hit, Action::Stand, Action::Double, Action::Split]
//! );
//! ```

pub mod cards;
pub mod config;
pub mod errors;
pub mod game;
pub mod hand;
pub mod logger;
pub mod player;
pub mod round;
pub mod rules;
pub mod shoe;
pub mod shuffle;
