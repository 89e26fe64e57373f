use crate::store::shuffle_with;
use crate::Card;
use rand::Rng;

/// Position and reveal state of one pass over a shuffled deck.
#[derive(Clone, Debug)]
pub struct QuizSession {
    cards: Vec<Card>,
    position: usize,
    revealed: bool,
}

impl QuizSession {
    pub fn new(cards: &[Card]) -> Self {
        Self::with_rng(cards, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Self {
        Self::in_order(shuffle_with(cards, rng))
    }

    pub fn in_order(cards: Vec<Card>) -> Self {
        Self {
            cards,
            position: 0,
            revealed: false,
        }
    }

    pub fn current(&self) -> Option<&Card> {
        self.cards.get(self.position)
    }

    pub fn reveal(&mut self) -> Option<&str> {
        let card = self.cards.get(self.position)?;
        self.revealed = true;
        Some(card.answer.as_str())
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Move to the next card. Returns `false` once the deck is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.position < self.cards.len() {
            self.position += 1;
        }
        self.revealed = false;
        self.position < self.cards.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.cards.len()
    }
}
