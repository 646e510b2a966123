//! Time-ordered train ids.
//!
//! Train ids sort by creation time: the millisecond timestamp occupies the
//! high bits and a process-local sequence number breaks ties within the same
//! millisecond.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

const SEQUENCE_BITS: u32 = 16;

static SEQUENCE: AtomicI64 = AtomicI64::new(0);

/// Returns a fresh id, strictly greater than any id generated earlier in
/// this process.
pub fn next_train_id() -> i64 {
    let millis = Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & ((1 << SEQUENCE_BITS) - 1);
    (millis << SEQUENCE_BITS) | seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let a = next_train_id();
        let b = next_train_id();
        let c = next_train_id();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn ids_embed_the_timestamp() {
        let before = Utc::now().timestamp_millis();
        let id = next_train_id();
        let after = Utc::now().timestamp_millis();
        let embedded = id >> SEQUENCE_BITS;
        assert!(embedded >= before);
        assert!(embedded <= after);
    }
}
