use std::collections::HashMap;

use blackjack_engine::cards::{full_deck, parse_cards, Card};
use blackjack_engine::shuffle::{
    cut_stack_at_penetration, new_shoe_stack, overhand_shuffle_stack, riffle_shuffle_stack,
    shuffle_shoe,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn multiset(cards: &[Card]) -> HashMap<Card, usize> {
    let mut m = HashMap::new();
    for c in cards {
        *m.entry(*c).or_insert(0) += 1;
    }
    m
}

fn six_decks() -> Vec<Card> {
    (0..6).flat_map(|_| full_deck()).collect()
}

#[test]
fn full_deck_has_52_unique_cards() {
    let deck = full_deck();
    assert_eq!(deck.len(), 52);
    assert!(multiset(&deck).values().all(|&n| n == 1));
}

#[test]
fn every_shuffle_conserves_cards() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let deck = full_deck();

    let riffled = riffle_shuffle_stack(&deck, &mut rng);
    assert_eq!(multiset(&riffled), multiset(&deck));

    let overhand = overhand_shuffle_stack(&deck, &mut rng);
    assert_eq!(multiset(&overhand), multiset(&deck));

    let cut = cut_stack_at_penetration(&deck, None, &mut rng);
    assert_eq!(multiset(&cut), multiset(&deck));

    let shoe = six_decks();
    let shuffled = shuffle_shoe(&shoe, None, &mut rng);
    assert_eq!(shuffled.len(), shoe.len());
    assert_eq!(multiset(&shuffled), multiset(&shoe));
}

#[test]
fn shuffle_actually_reorders() {
    let mut rng = ChaCha20Rng::seed_from_u64(99);
    let shoe = six_decks();
    let shuffled = shuffle_shoe(&shoe, Some(75.0), &mut rng);
    assert_ne!(shuffled, shoe);
}

#[test]
fn shuffle_is_deterministic_with_same_seed() {
    let a = new_shoe_stack(2, 75.0, None, &mut ChaCha20Rng::seed_from_u64(12345));
    let b = new_shoe_stack(2, 75.0, None, &mut ChaCha20Rng::seed_from_u64(12345));
    assert_eq!(a, b, "same seed must yield identical order");
}

#[test]
fn shuffle_differs_with_different_seed() {
    let a = new_shoe_stack(2, 75.0, None, &mut ChaCha20Rng::seed_from_u64(1));
    let b = new_shoe_stack(2, 75.0, None, &mut ChaCha20Rng::seed_from_u64(2));
    assert_ne!(
        a, b,
        "different seeds should produce different orders (high probability)"
    );
}

#[test]
fn new_shoe_stack_builds_requested_decks() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let stack = new_shoe_stack(8, 80.0, None, &mut rng);
    assert_eq!(stack.len(), 8 * 52);
    assert!(multiset(&stack).values().all(|&n| n == 8));
}

#[test]
fn test_stack_bypasses_shuffling() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let fixed = parse_cards("AH KD QC JS").unwrap();
    let stack = new_shoe_stack(6, 75.0, Some(fixed.clone()), &mut rng);
    assert_eq!(stack, fixed);
}

#[test]
fn overhand_moves_first_packet_towards_bottom() {
    let mut rng = ChaCha20Rng::seed_from_u64(21);
    let deck = full_deck();
    let out = overhand_shuffle_stack(&deck, &mut rng);
    // the top card is peeled first, so it cannot stay on top unless one
    // packet held the whole deck
    assert_ne!(out[0], deck[0]);
    assert!(out.iter().rposition(|c| *c == deck[0]).unwrap() >= 42);
}
