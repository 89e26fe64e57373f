//! Turns freeform text (typed lists, OCR output) into cards.
//!
//! Each non-empty line is offered to a fixed list of matchers in priority
//! order. A matcher looks at the line under the cursor (and may look ahead)
//! and reports the question/answer it found plus how many lines it consumed.
//! Lines no matcher accepts are skipped.

use crate::ids::{IdGenerator, UuidIds};
use crate::sanitize::{sanitize, sanitize_block, DEFAULT_MAX_LEN, MAX_IMPORT_LEN};
use crate::{resolve_category, Card};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub question: String,
    pub answer: String,
    pub consumed: usize,
}

pub type Matcher = fn(&[&str], usize) -> Option<Match>;

/// Applied in order; first match wins.
pub const MATCHERS: [Matcher; 3] = [separated, whitespace_delimited, paired_lines];

fn separator_classes() -> &'static [Regex; 3] {
    static CLASSES: OnceLock<[Regex; 3]> = OnceLock::new();
    CLASSES.get_or_init(|| {
        [
            Regex::new(r"→|⇒|➡|->").expect("valid regex"),
            Regex::new(r"[:：]").expect("valid regex"),
            Regex::new(r"[-－–—]").expect("valid regex"),
        ]
    })
}

fn split_answer<'a>(mut parts: impl Iterator<Item = &'a str>) -> Option<(String, String)> {
    let question = parts.next()?;
    let answer = parts.collect::<Vec<_>>().join(" ");
    if answer.is_empty() {
        return None;
    }
    Some((question.to_string(), answer))
}

/// `question → answer`, `question: answer`, `question - answer` and their
/// full-width forms. Classes are tried in priority order; the first one that
/// splits the line into a question and a non-empty answer is used.
pub fn separated(lines: &[&str], at: usize) -> Option<Match> {
    let line = lines.get(at)?;
    let (question, answer) = separator_classes().iter().find_map(|class| {
        split_answer(
            class
                .split(line)
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    })?;
    Some(Match {
        question,
        answer,
        consumed: 1,
    })
}

/// `question answer...` separated by spaces or tabs.
pub fn whitespace_delimited(lines: &[&str], at: usize) -> Option<Match> {
    let line = lines.get(at)?;
    let (question, answer) = split_answer(line.split_whitespace())?;
    Some(Match {
        question,
        answer,
        consumed: 1,
    })
}

/// A single-token line followed by another single-token line.
pub fn paired_lines(lines: &[&str], at: usize) -> Option<Match> {
    let question = single_token(lines.get(at)?)?;
    let answer = single_token(lines.get(at + 1)?)?;
    Some(Match {
        question: question.to_string(),
        answer: answer.to_string(),
        consumed: 2,
    })
}

fn single_token(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(t), None) => Some(t),
        _ => None,
    }
}

pub fn parse_cards(raw: &str, category: &str) -> Vec<Card> {
    parse_cards_with(raw, category, &UuidIds)
}

pub fn parse_cards_with(raw: &str, category: &str, ids: &dyn IdGenerator) -> Vec<Card> {
    let text = sanitize_block(raw, MAX_IMPORT_LEN);
    if text.is_empty() {
        return Vec::new();
    }
    let category = resolve_category(sanitize(category, DEFAULT_MAX_LEN));
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut cards = Vec::new();
    let mut at = 0;
    while at < lines.len() {
        match MATCHERS.iter().find_map(|m| m(lines.as_slice(), at)) {
            Some(found) => {
                cards.push(Card::new(
                    ids.generate(),
                    category.clone(),
                    found.question,
                    found.answer,
                ));
                at += found.consumed;
            }
            None => at += 1,
        }
    }
    cards
}
