//! Card identifier generation.
//!
//! [`UuidIds`] is the default source. [`FallbackIds`] builds ids from a
//! timestamp, two random words and a process-wide counter; the counter alone
//! keeps values distinct if the random source ever repeats.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn generate(&self) -> String {
        generate_id()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackIds;

impl IdGenerator for FallbackIds {
    fn generate(&self) -> String {
        fallback_id()
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn fallback_id() -> String {
    let ts = Utc::now().timestamp_millis().max(0) as u64;
    let a: u64 = rand::random();
    let b: u64 = rand::random();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}-{}-{}",
        base36(ts),
        base36(a),
        base36(b),
        base36(n)
    )
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
