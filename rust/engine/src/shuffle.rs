//! Casino-style shuffling of multi-deck stacks.
//!
//! The shuffles model a human dealer rather than a uniform permutation:
//! riffles split off-centre and drop runs of several cards, overhand passes
//! peel uneven packets. All functions take the RNG explicitly so a seeded
//! `ChaCha20Rng` reproduces a shoe exactly.

use rand::Rng;

use crate::cards::{full_deck, Card, Stack, DECK_SIZE};

/// Penetration used by [`shuffle_shoe`] when the caller has no preference.
pub const DEFAULT_PENETRATION: f64 = 75.0;

const RIFFLE_PASSES: usize = 3;

const SPLIT_FRACTIONS: [(f64, u32); 5] = [(0.40, 1), (0.45, 4), (0.475, 4), (0.50, 4), (0.60, 1)];
const RIFFLE_RUNS: [(usize, u32); 4] = [(1, 6), (2, 4), (3, 2), (4, 1)];
const OVERHAND_RUNS: [(usize, u32); 10] = [
    (1, 10),
    (2, 9),
    (3, 8),
    (4, 7),
    (5, 6),
    (6, 5),
    (7, 4),
    (8, 3),
    (9, 2),
    (10, 1),
];

fn weighted_pick<T: Copy, R: Rng + ?Sized>(rng: &mut R, table: &[(T, u32)]) -> T {
    let total: u32 = table.iter().map(|(_, w)| w).sum();
    let mut roll = rng.random_range(0..total);
    for &(value, weight) in table {
        if roll < weight {
            return value;
        }
        roll -= weight;
    }
    table[table.len() - 1].0
}

/// One imperfect riffle: split near the middle, then interleave runs of
/// 1–4 cards alternately from each half until both are exhausted.
pub fn riffle_shuffle_stack<R: Rng + ?Sized>(stack: &[Card], rng: &mut R) -> Stack {
    if stack.len() < 2 {
        return stack.to_vec();
    }
    let fraction = weighted_pick(rng, &SPLIT_FRACTIONS);
    let split = ((stack.len() as f64 * fraction).floor() as usize).clamp(1, stack.len() - 1);
    let (left, right) = stack.split_at(split);

    let mut out = Vec::with_capacity(stack.len());
    let (mut li, mut ri) = (0, 0);
    let mut from_left = rng.random_bool(0.5);
    while li < left.len() || ri < right.len() {
        let run = weighted_pick(rng, &RIFFLE_RUNS);
        if (from_left && li < left.len()) || ri >= right.len() {
            let end = (li + run).min(left.len());
            out.extend_from_slice(&left[li..end]);
            li = end;
        } else {
            let end = (ri + run).min(right.len());
            out.extend_from_slice(&right[ri..end]);
            ri = end;
        }
        from_left = !from_left;
    }
    out
}

/// One overhand pass: peel packets of 1–10 cards off the top, each landing on
/// top of the packets already peeled.
pub fn overhand_shuffle_stack<R: Rng + ?Sized>(stack: &[Card], rng: &mut R) -> Stack {
    let mut out: Stack = Vec::with_capacity(stack.len());
    let mut pos = 0;
    while pos < stack.len() {
        let run = weighted_pick(rng, &OVERHAND_RUNS);
        let end = (pos + run).min(stack.len());
        out.splice(0..0, stack[pos..end].iter().copied());
        pos = end;
    }
    out
}

/// Rotates the stack so that `penetration` percent of it moves from the front
/// to the back. With no penetration given a triangular value in `[0, 100]` is
/// drawn, as a dealer's cut lands near the middle more often than the edges.
pub fn cut_stack_at_penetration<R: Rng + ?Sized>(
    stack: &[Card],
    penetration: Option<f64>,
    rng: &mut R,
) -> Stack {
    let penetration = penetration
        .unwrap_or_else(|| (rng.random::<f64>() + rng.random::<f64>()) * 50.0)
        .clamp(0.0, 100.0);
    let position = ((penetration / 100.0) * stack.len() as f64).floor() as usize;
    let mut out = stack.to_vec();
    out.rotate_left(position.min(stack.len()));
    out
}

/// Shuffles a full shoe deck by deck (three riffles and an overhand each),
/// reassembles it in order and cuts it so the cut card sits
/// `desired_penetration` percent into the shoe.
pub fn shuffle_shoe<R: Rng + ?Sized>(
    stack: &[Card],
    desired_penetration: Option<f64>,
    rng: &mut R,
) -> Stack {
    let desired = desired_penetration
        .unwrap_or(DEFAULT_PENETRATION)
        .clamp(0.0, 100.0);
    let mut shuffled = Vec::with_capacity(stack.len());
    for chunk in stack.chunks(DECK_SIZE) {
        let mut deck = chunk.to_vec();
        for _ in 0..RIFFLE_PASSES {
            deck = riffle_shuffle_stack(&deck, rng);
        }
        deck = overhand_shuffle_stack(&deck, rng);
        shuffled.extend(deck);
    }
    cut_stack_at_penetration(&shuffled, Some(100.0 - desired), rng)
}

/// Builds and shuffles a shoe of `num_decks` decks. A `test_stack` is used
/// verbatim instead, without shuffling.
pub fn new_shoe_stack<R: Rng + ?Sized>(
    num_decks: u8,
    penetration: f64,
    test_stack: Option<Stack>,
    rng: &mut R,
) -> Stack {
    if let Some(stack) = test_stack {
        return stack;
    }
    let mut cards = Vec::with_capacity(num_decks as usize * DECK_SIZE);
    for _ in 0..num_decks {
        cards.extend(full_deck());
    }
    shuffle_shoe(&cards, Some(penetration), rng)
}
