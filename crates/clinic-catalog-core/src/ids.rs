//! Record identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence shared by every generator.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generates ids of the form `<millis>-<counter>-<random>` (base36, base36, hex).
///
/// The counter is shared by every generator in the process, so ids are unique
/// within the process; the random suffix keeps collisions unlikely across
/// processes sharing a blob.
#[derive(Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn next_id(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let random = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", to_base36(millis), to_base36(seq), &random[..8])
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
