use blackjack_engine::cards::parse_cards;
use blackjack_engine::errors::GameError;
use blackjack_engine::player::{Bet, Player, PlayerId};
use blackjack_engine::round::{Action, Outcome, Round, RoundState};
use blackjack_engine::rules::RuleSet;
use blackjack_engine::shoe::Shoe;

const SEAT: PlayerId = PlayerId(0);

fn deal(cards: &str, bankroll: u64, bet: u64) -> (Round, Shoe, Vec<Player>) {
    let mut shoe = Shoe::from_stack(parse_cards(cards).unwrap(), 75.0);
    let mut players = vec![Player::new(SEAT, "alice", bankroll)];
    shoe.start_next_round();
    let round = Round::new(1, RuleSet::default(), &[Bet::new(SEAT, bet)], &mut shoe, &mut players)
        .expect("round starts");
    (round, shoe, players)
}

#[test]
fn dealer_ace_opens_insurance() {
    let (round, _shoe, players) = deal("10H 9D AC 7S", 1_000, 100);
    assert_eq!(round.state(), RoundState::Insurance);
    assert!(round.available_actions(&players).is_empty());
    assert!(!round.dealer_hand().hole_revealed);
    assert_eq!(round.dealer_hand().visible_cards().len(), 1);
}

#[test]
fn declined_insurance_against_dealer_blackjack() {
    let (mut round, _shoe, mut players) = deal("10H 9D AC KS", 1_000, 100);
    round.decline_insurance(0).unwrap();
    round.resolve_insurance(&mut players).unwrap();
    assert_eq!(round.state(), RoundState::Settling);
    assert!(round.dealer_hand().hole_revealed);
    assert_eq!(round.dealer_hand().cards.len(), 2);
    assert!(round.insurance_results().is_empty());

    let results = round.settle(&mut players).unwrap();
    assert_eq!(results[0].outcome, Outcome::Lose);
    assert_eq!(players[0].balance(), 900);
}

#[test]
fn insurance_pays_two_to_one_on_dealer_blackjack() {
    let (mut round, _shoe, mut players) = deal("10H 9D AC KS", 1_000, 100);
    round.take_insurance(0, &mut players).unwrap();
    assert_eq!(round.player_hands()[0].insurance_bet, 50);
    assert_eq!(players[0].balance(), 850);

    round.resolve_insurance(&mut players).unwrap();
    let ins = &round.insurance_results()[0];
    assert_eq!((ins.stake, ins.payout, ins.profit), (50, 150, 100));
    assert_eq!(players[0].balance(), 1_000);

    round.settle(&mut players).unwrap();
    assert_eq!(players[0].balance(), 1_000, "insurance covers the lost bet");
}

#[test]
fn insurance_lost_when_dealer_has_no_blackjack() {
    let (mut round, mut shoe, mut players) = deal("10H 9D AC 7S", 1_000, 100);
    round.take_insurance(0, &mut players).unwrap();
    round.resolve_insurance(&mut players).unwrap();

    assert_eq!(round.state(), RoundState::PlayerTurn);
    assert!(!round.dealer_hand().hole_revealed, "peek does not expose the hole card");
    assert_eq!(round.insurance_results()[0].profit, -50);
    assert_eq!(players[0].balance(), 850);

    round.play_action(Action::Stand, &mut shoe, &mut players).unwrap();
    round.play_dealer(&mut shoe).unwrap();
    assert_eq!(round.dealer_hand().value().total, 18);
    let results = round.settle(&mut players).unwrap();
    assert_eq!(results[0].outcome, Outcome::Win);
    assert_eq!(players[0].balance(), 1_050);
}

#[test]
fn undecided_hands_count_as_declined() {
    let (mut round, _shoe, mut players) = deal("10H 9D AC 7S", 1_000, 100);
    round.resolve_insurance(&mut players).unwrap();
    assert!(round.player_hands()[0].insurance_decided);
    assert_eq!(players[0].balance(), 900);
}

#[test]
fn player_natural_against_ace_without_blackjack() {
    let (mut round, _shoe, mut players) = deal("AH KD AC 7S", 1_000, 100);
    round.decline_insurance(0).unwrap();
    round.resolve_insurance(&mut players).unwrap();
    assert_eq!(round.state(), RoundState::Settling);
    assert_eq!(round.dealer_hand().cards.len(), 2);
    let results = round.settle(&mut players).unwrap();
    assert_eq!(results[0].outcome, Outcome::Blackjack);
    assert_eq!(players[0].balance(), 1_150);
}

#[test]
fn player_natural_against_dealer_natural_pushes() {
    let (mut round, _shoe, mut players) = deal("AH KD AC QS", 1_000, 100);
    round.resolve_insurance(&mut players).unwrap();
    let results = round.settle(&mut players).unwrap();
    assert_eq!(results[0].outcome, Outcome::Push);
    assert_eq!(players[0].balance(), 1_000);
}

#[test]
fn insurance_decision_errors() {
    let (mut round, _shoe, mut players) = deal("10H 9D AC 7S", 1_000, 100);
    assert_eq!(
        round.take_insurance(3, &mut players),
        Err(GameError::InvalidHandIndex(3))
    );
    round.decline_insurance(0).unwrap();
    assert_eq!(
        round.take_insurance(0, &mut players),
        Err(GameError::InsuranceAlreadyDecided(0))
    );
    assert_eq!(players[0].balance(), 900);

    round.resolve_insurance(&mut players).unwrap();
    assert_eq!(
        round.decline_insurance(0),
        Err(GameError::WrongState {
            expected: RoundState::Insurance,
            actual: RoundState::PlayerTurn,
        })
    );
    assert!(round.resolve_insurance(&mut players).is_err());
}

#[test]
fn insurance_requires_funds() {
    let (mut round, _shoe, mut players) = deal("10H 9D AC 7S", 140, 100);
    assert_eq!(
        round.take_insurance(0, &mut players),
        Err(GameError::InsufficientFunds {
            required: 50,
            available: 40
        })
    );
    assert!(!round.player_hands()[0].insurance_decided);
    assert_eq!(players[0].balance(), 40);
}

#[test]
fn no_insurance_without_dealer_ace() {
    let (mut round, _shoe, mut players) = deal("10H 9D 10C 7S", 1_000, 100);
    assert!(matches!(
        round.take_insurance(0, &mut players),
        Err(GameError::WrongState { .. })
    ));
}
