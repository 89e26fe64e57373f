//! The persisted card collection.
//!
//! All cards live as one JSON array under [`CARDS_KEY`]. Every mutation reads
//! the whole array, rebuilds it, and writes it back. Reads never fail: absent
//! or corrupt data degrades to an empty collection and the reason is reported
//! through [`LoadStatus`].

use crate::ids::{IdGenerator, UuidIds};
use crate::kv::KeyValueStore;
use crate::sanitize::{sanitize, DEFAULT_MAX_LEN};
use crate::{resolve_category, Card, CardId, CoreError, StorageError, StoredCard};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

pub const CARDS_KEY: &str = "flashcards";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteTarget {
    Id(CardId),
    /// Position in the stored sequence, kept for pre-id data.
    Index(usize),
}

impl From<&str> for DeleteTarget {
    fn from(id: &str) -> Self {
        DeleteTarget::Id(id.to_string())
    }
}

impl From<String> for DeleteTarget {
    fn from(id: String) -> Self {
        DeleteTarget::Id(id)
    }
}

impl From<usize> for DeleteTarget {
    fn from(index: usize) -> Self {
        DeleteTarget::Index(index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Corruption {
    Unreadable(StorageError),
    MalformedJson,
    NotASequence,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing stored under the key yet.
    Empty,
    Clean,
    /// `count` records received a fresh id. `persisted` is the outcome of
    /// writing the migrated array back.
    Migrated {
        count: usize,
        persisted: Result<(), StorageError>,
    },
    Recovered(Corruption),
}

#[derive(Clone, Debug)]
pub struct Loaded {
    pub cards: Vec<Card>,
    pub status: LoadStatus,
    /// Array elements that were not card records and were dropped.
    pub skipped: usize,
}

impl Loaded {
    fn without_cards(status: LoadStatus) -> Self {
        Self {
            cards: Vec::new(),
            status,
            skipped: 0,
        }
    }
}

#[derive(Clone)]
pub struct CardStore {
    kv: Arc<dyn KeyValueStore>,
    ids: Arc<dyn IdGenerator>,
}

impl CardStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ids(kv, Arc::new(UuidIds))
    }

    pub fn with_ids(kv: Arc<dyn KeyValueStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { kv, ids }
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub fn load(&self) -> Vec<Card> {
        self.load_detailed().cards
    }

    pub fn load_detailed(&self) -> Loaded {
        let raw = match self.kv.get(CARDS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Loaded::without_cards(LoadStatus::Empty),
            Err(e) => {
                warn!(error = %e, "card storage unreadable, starting empty");
                return Loaded::without_cards(LoadStatus::Recovered(Corruption::Unreadable(e)));
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "stored cards are not valid JSON, starting empty");
                return Loaded::without_cards(LoadStatus::Recovered(Corruption::MalformedJson));
            }
        };
        let Value::Array(items) = value else {
            warn!("stored cards are not an array, starting empty");
            return Loaded::without_cards(LoadStatus::Recovered(Corruption::NotASequence));
        };

        let mut seen: HashSet<CardId> = HashSet::with_capacity(items.len());
        let mut cards = Vec::with_capacity(items.len());
        let mut migrated = 0usize;
        let mut skipped = 0usize;

        for (pos, item) in items.into_iter().enumerate() {
            let stored: StoredCard = match serde_json::from_value(item) {
                Ok(s) => s,
                Err(e) => {
                    warn!(position = pos, error = %e, "dropping malformed card record");
                    skipped += 1;
                    continue;
                }
            };
            let id = match stored.id {
                Some(id) if !id.is_empty() && !seen.contains(&id) => id,
                _ => {
                    migrated += 1;
                    self.fresh_id(&seen)
                }
            };
            seen.insert(id.clone());
            cards.push(Card {
                id,
                category: stored.category,
                question: stored.question,
                answer: stored.answer,
            });
        }

        if migrated == 0 {
            return Loaded {
                cards,
                status: LoadStatus::Clean,
                skipped,
            };
        }

        debug!(count = migrated, "assigned ids to legacy cards");
        let persisted = match self.save(&cards) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "could not persist migrated cards");
                Err(match e {
                    CoreError::Storage(s) => s,
                    other => StorageError::Other(other.to_string()),
                })
            }
        };
        Loaded {
            cards,
            status: LoadStatus::Migrated {
                count: migrated,
                persisted,
            },
            skipped,
        }
    }

    fn fresh_id(&self, taken: &HashSet<CardId>) -> CardId {
        loop {
            let id = self.ids.generate();
            if !id.is_empty() && !taken.contains(&id) {
                return id;
            }
        }
    }

    /// Replace the whole stored sequence with `cards`.
    pub fn save(&self, cards: &[Card]) -> Result<(), CoreError> {
        let json = serde_json::to_string(cards)?;
        self.kv.set(CARDS_KEY, &json)?;
        debug!(count = cards.len(), bytes = json.len(), "saved cards");
        Ok(())
    }

    pub fn create(&self, category: &str, question: &str, answer: &str) -> Result<Card, CoreError> {
        let question = sanitize(question, DEFAULT_MAX_LEN);
        let answer = sanitize(answer, DEFAULT_MAX_LEN);
        if question.is_empty() {
            return Err(CoreError::Invalid("question is empty"));
        }
        if answer.is_empty() {
            return Err(CoreError::Invalid("answer is empty"));
        }
        let category = resolve_category(sanitize(category, DEFAULT_MAX_LEN));

        let mut cards = self.load();
        let taken: HashSet<CardId> = cards.iter().map(|c| c.id.clone()).collect();
        let card = Card::new(self.fresh_id(&taken), category, question, answer);
        cards.push(card.clone());
        self.save(&cards)?;
        Ok(card)
    }

    /// Append already-built cards, e.g. from the import parser. Incomplete
    /// cards are dropped and colliding ids are replaced. Returns how many
    /// were added.
    pub fn append(&self, new_cards: Vec<Card>) -> Result<usize, CoreError> {
        let mut cards = self.load();
        let mut taken: HashSet<CardId> = cards.iter().map(|c| c.id.clone()).collect();
        let before = cards.len();
        for mut card in new_cards.into_iter().filter(Card::is_complete) {
            if card.id.is_empty() || taken.contains(&card.id) {
                card.id = self.fresh_id(&taken);
            }
            taken.insert(card.id.clone());
            cards.push(card);
        }
        let added = cards.len() - before;
        if added > 0 {
            self.save(&cards)?;
        }
        Ok(added)
    }

    /// Remove a card by id or by legacy position. Unknown ids and
    /// out-of-range positions leave the sequence unchanged.
    pub fn delete(&self, target: impl Into<DeleteTarget>) -> Result<(), CoreError> {
        let mut cards = self.load();
        match target.into() {
            DeleteTarget::Id(id) => {
                if let Some(pos) = cards.iter().position(|c| c.id == id) {
                    cards.remove(pos);
                }
            }
            DeleteTarget::Index(index) => {
                if index < cards.len() {
                    cards.remove(index);
                }
            }
        }
        self.save(&cards)
    }

    /// Distinct categories, sorted ascending.
    pub fn categories(&self) -> Vec<String> {
        self.load()
            .into_iter()
            .map(|c| c.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn cards_in(&self, category: &str) -> Vec<Card> {
        let mut cards = self.load();
        cards.retain(|c| c.category == category);
        cards
    }

    pub fn clear(&self) -> Result<(), CoreError> {
        self.kv.remove(CARDS_KEY)?;
        Ok(())
    }
}

/// Uniformly random permutation of `items`; the input is left untouched.
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with(items, &mut rand::rng())
}

pub fn shuffle_with<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}
