pub mod credentials;
pub mod errors;
pub mod ids;
pub mod kv;
pub mod markup;
pub mod models;
pub mod parser;
pub mod quiz;
pub mod sanitize;
pub mod store;

pub use errors::*;
pub use ids::{generate_id, IdGenerator};
pub use kv::{KeyValueStore, MemoryStore};
pub use markup::render;
pub use models::*;
pub use parser::{parse_cards, parse_cards_with};
pub use quiz::QuizSession;
pub use sanitize::sanitize;
pub use store::*;
