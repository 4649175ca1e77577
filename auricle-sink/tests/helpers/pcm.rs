//! PCM generation and polling utilities

use std::thread;
use std::time::{Duration, Instant};

/// Deterministic little-endian 16-bit ramp, `sample_count` samples long.
///
/// Values climb in steps of 3 and wrap, so ordering mistakes anywhere in
/// the path show up as mismatched bytes.
pub fn pcm_ramp(sample_count: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(sample_count * 2);
    let mut value: i16 = 0;
    for _ in 0..sample_count {
        bytes.extend_from_slice(&value.to_le_bytes());
        value = value.wrapping_add(3);
    }
    bytes
}

/// Poll `predicate` until it holds or `timeout` elapses.
pub fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    predicate()
}
