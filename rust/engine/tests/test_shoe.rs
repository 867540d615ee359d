use blackjack_engine::cards::parse_cards;
use blackjack_engine::errors::GameError;
use blackjack_engine::shoe::Shoe;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[test]
fn cut_card_completes_shoe_on_fourth_draw() {
    let stack = parse_cards("2H 3H 4H 5H 6H").unwrap();
    let mut shoe = Shoe::from_stack(stack, 40.0);
    shoe.start_next_round();
    assert_eq!(shoe.cut_card_position(), 3);

    for _ in 0..3 {
        shoe.draw_card().expect("draw before cut card");
        assert!(!shoe.is_complete());
    }
    shoe.draw_card().expect("fourth draw");
    assert!(shoe.is_complete());

    // the round that reached the cut card may keep drawing
    assert!(shoe.draw_card().is_ok());
}

#[test]
fn new_round_on_completed_shoe_cannot_draw() {
    let stack = parse_cards("2H 3H 4H 5H 6H").unwrap();
    let mut shoe = Shoe::from_stack(stack, 40.0);
    shoe.start_next_round();
    for _ in 0..4 {
        shoe.draw_card().unwrap();
    }
    assert!(shoe.is_complete());

    shoe.start_next_round();
    assert_eq!(shoe.current_round(), 2);
    assert_eq!(shoe.draw_card(), Err(GameError::ShoeExhausted));
    assert_eq!(shoe.remaining_cards(), 1, "failed draw must not consume cards");
}

#[test]
fn empty_stack_reports_exhaustion() {
    let mut shoe = Shoe::from_stack(parse_cards("2H").unwrap(), 100.0);
    shoe.start_next_round();
    shoe.draw_card().unwrap();
    assert_eq!(shoe.draw_card(), Err(GameError::ShoeExhausted));
}

#[test]
fn single_seat_deal_order_is_player_then_dealer() {
    let stack = parse_cards("AH KD QC JS").unwrap();
    let mut shoe = Shoe::from_stack(stack.clone(), 75.0);
    shoe.start_next_round();
    let deal = shoe.deal(1).unwrap();
    assert_eq!(deal.players, vec![[stack[0], stack[1]]]);
    assert_eq!(deal.dealer, [stack[2], stack[3]]);
    assert_eq!(deal.players[0][0].to_string(), "A♥");
    assert_eq!(shoe.dealt_count(), 4);
}

#[test]
fn multi_seat_deal_gives_each_seat_consecutive_cards() {
    let stack = parse_cards("2H 3H 4H 5H 6H 7H 8H 9H").unwrap();
    let mut shoe = Shoe::from_stack(stack.clone(), 75.0);
    shoe.start_next_round();
    let deal = shoe.deal(3).unwrap();
    assert_eq!(deal.players[0], [stack[0], stack[1]]);
    assert_eq!(deal.players[1], [stack[2], stack[3]]);
    assert_eq!(deal.players[2], [stack[4], stack[5]]);
    assert_eq!(deal.dealer, [stack[6], stack[7]]);
    assert_eq!(shoe.dealt_count(), 4 + 2 * 2);
}

#[test]
fn short_stack_refuses_deal_without_drawing() {
    let mut shoe = Shoe::from_stack(parse_cards("2H 3H 4H").unwrap(), 75.0);
    shoe.start_next_round();
    assert_eq!(shoe.deal(1), Err(GameError::ShoeExhausted));
    assert_eq!(shoe.remaining_cards(), 3);
}

#[test]
fn remaining_plus_discarded_is_total() {
    let mut rng = ChaCha20Rng::seed_from_u64(8);
    let mut shoe = Shoe::new(2, 75.0, &mut rng);
    assert_eq!(shoe.total_cards(), 104);
    shoe.start_next_round();

    let mut in_flight = Vec::new();
    for _ in 0..10 {
        in_flight.push(shoe.draw_card().unwrap());
        let s = shoe.stats();
        assert_eq!(s.remaining_cards + s.discarded_cards, s.total_cards);
    }
    assert_eq!(shoe.remaining_cards(), 94);
    assert_eq!(shoe.discarded_cards(), 0);

    shoe.discard(in_flight);
    assert_eq!(shoe.remaining_cards(), 94);
    assert_eq!(shoe.discarded_cards(), 10);
    assert_eq!(shoe.total_cards(), 104);
}

#[test]
fn penetration_is_clamped() {
    let shoe = Shoe::from_stack(parse_cards("2H 3H 4H 5H").unwrap(), 140.0);
    assert_eq!(shoe.penetration(), 100.0);
    assert_eq!(shoe.cut_card_position(), 0);
}

#[test]
fn drawing_walks_the_stack_in_order() {
    let stack = parse_cards("2H 3H 4H 5H 6H 7H 8H").unwrap();
    let mut shoe = Shoe::from_stack(stack.clone(), 0.0);
    shoe.start_next_round();
    let drawn: Vec<_> = (0..stack.len()).map(|_| shoe.draw_card().unwrap()).collect();
    assert_eq!(drawn, stack);
    assert_eq!(shoe.remaining_cards(), 0);
    assert_eq!(shoe.dealt_count(), 7);
    assert_eq!(shoe.draw_card(), Err(GameError::ShoeExhausted));
}

#[test]
fn restock_returns_discards_under_undealt_cards() {
    let mut shoe = Shoe::from_stack(parse_cards("2H 3H 4H 5H 6H").unwrap(), 0.0);
    shoe.start_next_round();
    let first: Vec<_> = (0..4).map(|_| shoe.draw_card().unwrap()).collect();
    shoe.discard(first.clone());
    assert_eq!(shoe.total_cards(), 5);

    let mut rng = ChaCha20Rng::seed_from_u64(3);
    assert_eq!(shoe.restock(&mut rng), 4);
    assert_eq!(shoe.remaining_cards(), 5);
    assert_eq!(shoe.discarded_cards(), 0);
    assert_eq!(shoe.total_cards(), 5);

    assert_eq!(shoe.draw_card().unwrap().to_string(), "6♥");
    let mut back: Vec<_> = (0..4).map(|_| shoe.draw_card().unwrap()).collect();
    back.sort();
    let mut expected = first;
    expected.sort();
    assert_eq!(back, expected);
}
