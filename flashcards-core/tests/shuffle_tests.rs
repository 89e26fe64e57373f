use flashcards_core::store::{shuffle, shuffle_with};
use flashcards_core::{Card, QuizSession};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

fn deck(n: usize) -> Vec<Card> {
    (0..n)
        .map(|i| Card::new(i.to_string(), "c", format!("q{i}"), format!("a{i}")))
        .collect()
}

#[test]
fn shuffle_is_a_permutation_and_leaves_input_alone() {
    let input = deck(20);
    let snapshot = input.clone();
    let out = shuffle(&input);

    assert_eq!(input, snapshot);
    assert_eq!(out.len(), input.len());
    let mut a: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
    let mut b: Vec<&str> = input.iter().map(|c| c.id.as_str()).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn shuffle_handles_empty_and_single() {
    assert!(shuffle::<Card>(&[]).is_empty());
    assert_eq!(shuffle(&deck(1)), deck(1));
}

#[test]
fn every_permutation_of_three_is_reachable() {
    let input = [1, 2, 3];
    let mut rng = StdRng::seed_from_u64(7);
    let seen: HashSet<Vec<i32>> = (0..600).map(|_| shuffle_with(&input, &mut rng)).collect();
    assert_eq!(seen.len(), 6);
}

#[test]
fn positions_are_roughly_uniform() {
    let input = [0usize, 1, 2, 3];
    let trials = 40_000;
    let mut rng = StdRng::seed_from_u64(42);
    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    for _ in 0..trials {
        for (pos, v) in shuffle_with(&input, &mut rng).into_iter().enumerate() {
            *counts.entry((v, pos)).or_default() += 1;
        }
    }
    let expected = trials / input.len();
    for v in 0..input.len() {
        for pos in 0..input.len() {
            let got = counts.get(&(v, pos)).copied().unwrap_or(0);
            let diff = got.abs_diff(expected);
            assert!(diff < expected / 10, "value {v} at {pos}: {got} vs {expected}");
        }
    }
}

#[test]
fn seeded_quiz_sessions_repeat() {
    let cards = deck(10);
    let a = QuizSession::with_rng(&cards, &mut StdRng::seed_from_u64(3));
    let b = QuizSession::with_rng(&cards, &mut StdRng::seed_from_u64(3));
    assert_eq!(a.current(), b.current());
    assert_eq!(a.len(), 10);
}
