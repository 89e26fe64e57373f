use serde::{Deserialize, Serialize};

pub type CardId = String;

/// Category used when the caller supplies an empty one.
pub const DEFAULT_CATEGORY: &str = "未分類";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub category: String,
    pub question: String,
    pub answer: String,
}

impl Card {
    pub fn new(
        id: impl Into<CardId>,
        category: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.question.is_empty() && !self.answer.is_empty()
    }
}

/// On-disk shape of a card. Records written before ids existed have no `id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    #[serde(default)]
    pub category: String,
    pub question: String,
    pub answer: String,
}

impl StoredCard {
    pub fn legacy(
        category: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            category: category.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl From<Card> for StoredCard {
    fn from(c: Card) -> Self {
        Self {
            id: Some(c.id),
            category: c.category,
            question: c.question,
            answer: c.answer,
        }
    }
}

/// Falls back to [`DEFAULT_CATEGORY`] when `category` is empty.
pub fn resolve_category(category: String) -> String {
    if category.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        category
    }
}
