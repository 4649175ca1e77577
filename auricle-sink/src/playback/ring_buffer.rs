//! Staging ring buffer between stream callbacks and the writer thread
//!
//! Byte-oriented FIFO sized as a multiple of the incoming burst size.
//! One producer (the stream callback) and one consumer (the writer
//! thread) share it:
//!
//! - `write` is all-or-nothing: it blocks up to the configured write
//!   timeout for enough free space, then gives up and reports zero
//!   rather than splitting a burst.
//! - `read_up_to` hands back at most the requested byte count. Data is
//!   stored in a circular byte array, so one logical read may need two
//!   copies when the occupied region wraps past the end of storage;
//!   both halves are concatenated in arrival order before returning.
//! - `drain` discards everything buffered without blocking.
//!
//! All waits are bounded. Occupancy is mirrored into an atomic so
//! `bytes_waiting` never takes the lock; the value is advisory and
//! may be stale by the time the caller acts on it.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Interior state guarded by one mutex.
///
/// A single lock covers both ends of the buffer: writes, reads, and
/// drains all serialize on it, so a condvar wait on either side can
/// never miss the condition change it is waiting for.
struct RingState {
    storage: Box<[u8]>,
    /// Offset of the oldest unread byte.
    read_pos: usize,
    /// Occupied bytes starting at `read_pos`, wrapping at the end.
    len: usize,
}

/// Snapshot of buffer counters for diagnostics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BufferStats {
    pub capacity: usize,
    pub occupied: usize,
    pub free: usize,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub bytes_dropped: u64,
    pub bytes_drained: u64,
}

/// Blocking byte FIFO for staged PCM audio.
pub struct AudioRingBuffer {
    state: Mutex<RingState>,
    /// Signaled after reads and drains free space.
    space_available: Condvar,
    /// Signaled after writes add data.
    data_available: Condvar,
    capacity: usize,
    write_timeout: Duration,
    /// Mirror of `RingState::len` (Relaxed: advisory only).
    fill_level: AtomicUsize,
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    bytes_dropped: AtomicU64,
    bytes_drained: AtomicU64,
}

impl AudioRingBuffer {
    /// Create a buffer holding `capacity` bytes.
    ///
    /// `write_timeout` bounds how long `write` waits for free space.
    pub fn new(capacity: usize, write_timeout: Duration) -> Self {
        debug_assert!(capacity > 0);
        Self {
            state: Mutex::new(RingState {
                storage: vec![0u8; capacity].into_boxed_slice(),
                read_pos: 0,
                len: 0,
            }),
            space_available: Condvar::new(),
            data_available: Condvar::new(),
            capacity,
            write_timeout,
            fill_level: AtomicUsize::new(0),
            bytes_written: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_dropped: AtomicU64::new(0),
            bytes_drained: AtomicU64::new(0),
        }
    }

    /// Stage a burst, waiting up to the write timeout for free space.
    ///
    /// Returns `data.len()` when the whole burst was accepted, or 0
    /// when it was not; a burst is never split. A zero return means
    /// the caller has lost that data and should account for it.
    pub fn write(&self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        if data.len() > self.capacity {
            warn!(
                "Rejecting {} byte write: buffer capacity is {}",
                data.len(),
                self.capacity
            );
            self.bytes_dropped
                .fetch_add(data.len() as u64, Ordering::Relaxed);
            return 0;
        }

        let deadline = Instant::now() + self.write_timeout;
        let mut state = self.state.lock().unwrap();
        while self.capacity - state.len < data.len() {
            let now = Instant::now();
            if now >= deadline {
                self.bytes_dropped
                    .fetch_add(data.len() as u64, Ordering::Relaxed);
                return 0;
            }
            let (guard, _) = self
                .space_available
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }

        let write_pos = (state.read_pos + state.len) % self.capacity;
        let first = data.len().min(self.capacity - write_pos);
        state.storage[write_pos..write_pos + first].copy_from_slice(&data[..first]);
        let rest = data.len() - first;
        if rest > 0 {
            state.storage[..rest].copy_from_slice(&data[first..]);
        }
        state.len += data.len();
        self.fill_level.store(state.len, Ordering::Relaxed);
        drop(state);

        self.bytes_written
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        self.data_available.notify_one();
        data.len()
    }

    /// Read up to `out.len()` bytes, waiting up to `timeout` for data.
    ///
    /// Two passes run back to back: the first takes the contiguous run
    /// at the read position, which comes back short when the occupied
    /// region wraps past the end of storage. A short first pass gets
    /// one more bounded read for the run at the start of storage, and
    /// the halves concatenate in arrival order. A result that is still
    /// short after both passes is a degraded cycle, not an error; the
    /// shortfall is logged and the caller plays out what arrived.
    pub fn read_up_to(&self, out: &mut [u8], timeout: Duration) -> usize {
        let want = out.len();
        if want == 0 {
            return 0;
        }

        let mut state = self.state.lock().unwrap();
        let mut total = 0;

        for pass in 0..2 {
            if pass == 1 && (total == 0 || total == want) {
                break;
            }
            let deadline = Instant::now() + timeout;
            while state.len == 0 {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _) = self
                    .data_available
                    .wait_timeout(state, deadline - now)
                    .unwrap();
                state = guard;
            }
            let run = (want - total)
                .min(state.len)
                .min(self.capacity - state.read_pos);
            if run == 0 {
                break;
            }
            out[total..total + run]
                .copy_from_slice(&state.storage[state.read_pos..state.read_pos + run]);
            state.read_pos = (state.read_pos + run) % self.capacity;
            state.len -= run;
            total += run;
        }

        self.fill_level.store(state.len, Ordering::Relaxed);
        drop(state);

        if total > 0 {
            self.bytes_read.fetch_add(total as u64, Ordering::Relaxed);
            self.space_available.notify_one();
            if total < want {
                warn!("Short read: wanted {} bytes, delivered {}", want, total);
            }
        }
        total
    }

    /// Block until at least `min_bytes` are buffered or `timeout`
    /// expires. Returns whether the occupancy was reached.
    pub fn wait_for_bytes(&self, min_bytes: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        while state.len < min_bytes {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .data_available
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
        true
    }

    /// Discard everything buffered. Never blocks; safe to call again
    /// on an already empty buffer. Returns the byte count discarded.
    pub fn drain(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let discarded = state.len;
        state.read_pos = (state.read_pos + discarded) % self.capacity;
        state.len = 0;
        self.fill_level.store(0, Ordering::Relaxed);
        drop(state);

        if discarded > 0 {
            self.bytes_drained
                .fetch_add(discarded as u64, Ordering::Relaxed);
            debug!("Drained {} buffered bytes", discarded);
            self.space_available.notify_one();
        }
        discarded
    }

    /// Occupied byte count. Advisory: the producer and consumer keep
    /// moving, so the value may be stale as soon as it is returned.
    pub fn bytes_waiting(&self) -> usize {
        self.fill_level.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_waiting() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current buffer fill percentage in [0.0, 100.0].
    pub fn fill_percent(&self) -> f32 {
        (self.bytes_waiting() as f32 / self.capacity as f32) * 100.0
    }

    /// Snapshot of counters for monitoring and debugging.
    pub fn stats(&self) -> BufferStats {
        let occupied = self.bytes_waiting();
        BufferStats {
            capacity: self.capacity,
            occupied,
            free: self.capacity.saturating_sub(occupied),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            bytes_drained: self.bytes_drained.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(10);
    const LONG: Duration = Duration::from_millis(500);

    #[test]
    fn test_write_then_read_fifo() {
        let buffer = AudioRingBuffer::new(64, SHORT);
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(buffer.write(&data), 8);
        assert_eq!(buffer.bytes_waiting(), 8);

        let mut out = [0u8; 8];
        assert_eq!(buffer.read_up_to(&mut out, SHORT), 8);
        assert_eq!(out, data);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_write_is_all_or_nothing_on_timeout() {
        let buffer = AudioRingBuffer::new(4096, SHORT);
        // Leave exactly 2000 bytes free
        assert_eq!(buffer.write(&[0xAAu8; 2096]), 2096);

        let started = Instant::now();
        let written = buffer.write(&[0xBBu8; 4096]);
        let elapsed = started.elapsed();

        assert_eq!(written, 0);
        assert!(elapsed >= SHORT, "returned after {:?}", elapsed);
        // Nothing was partially staged
        assert_eq!(buffer.bytes_waiting(), 2096);
        assert_eq!(buffer.stats().bytes_dropped, 4096);
    }

    #[test]
    fn test_write_larger_than_capacity_rejected_immediately() {
        let buffer = AudioRingBuffer::new(1024, LONG);
        let started = Instant::now();
        assert_eq!(buffer.write(&[0u8; 2048]), 0);
        // No point waiting out the timeout for a burst that can never fit
        assert!(started.elapsed() < LONG);
        assert_eq!(buffer.stats().bytes_dropped, 2048);
    }

    #[test]
    fn test_wraparound_read_preserves_order() {
        let buffer = AudioRingBuffer::new(16, SHORT);

        let first: Vec<u8> = (0..12).collect();
        assert_eq!(buffer.write(&first), 12);
        let mut scratch = [0u8; 8];
        assert_eq!(buffer.read_up_to(&mut scratch, SHORT), 8);

        // Occupied region now wraps past the end of storage
        let second: Vec<u8> = (100..110).collect();
        assert_eq!(buffer.write(&second), 10);
        assert_eq!(buffer.bytes_waiting(), 14);

        let mut out = [0u8; 14];
        assert_eq!(buffer.read_up_to(&mut out, SHORT), 14);

        let mut expected = Vec::new();
        expected.extend_from_slice(&first[8..]);
        expected.extend_from_slice(&second);
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn test_read_times_out_when_empty() {
        let buffer = AudioRingBuffer::new(64, SHORT);
        let mut out = [0u8; 4];

        let started = Instant::now();
        assert_eq!(buffer.read_up_to(&mut out, SHORT), 0);
        assert!(started.elapsed() >= SHORT);
    }

    #[test]
    fn test_read_wakes_on_late_arrival() {
        let buffer = Arc::new(AudioRingBuffer::new(64, SHORT));

        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                buffer.write(&[7u8; 4])
            })
        };

        let mut out = [0u8; 4];
        assert_eq!(buffer.read_up_to(&mut out, LONG), 4);
        assert_eq!(out, [7u8; 4]);
        assert_eq!(producer.join().unwrap(), 4);
    }

    #[test]
    fn test_drain_discards_and_is_idempotent() {
        let buffer = AudioRingBuffer::new(64, SHORT);
        buffer.write(&[1u8; 24]);

        assert_eq!(buffer.drain(), 24);
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain(), 0);
        assert_eq!(buffer.stats().bytes_drained, 24);
    }

    #[test]
    fn test_drain_unblocks_waiting_writer() {
        let buffer = Arc::new(AudioRingBuffer::new(32, LONG));
        assert_eq!(buffer.write(&[0u8; 32]), 32);

        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || buffer.write(&[1u8; 16]))
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(buffer.drain(), 32);

        // The blocked write completes once space opens up
        assert_eq!(producer.join().unwrap(), 16);
        assert_eq!(buffer.bytes_waiting(), 16);
    }

    #[test]
    fn test_wait_for_bytes() {
        let buffer = AudioRingBuffer::new(64, SHORT);
        assert!(!buffer.wait_for_bytes(4, SHORT));

        buffer.write(&[0u8; 8]);
        assert!(buffer.wait_for_bytes(4, SHORT));
        assert!(buffer.wait_for_bytes(8, SHORT));
        assert!(!buffer.wait_for_bytes(9, SHORT));
    }

    #[test]
    fn test_stats_counters() {
        let buffer = AudioRingBuffer::new(64, SHORT);
        buffer.write(&[0u8; 16]);

        let mut out = [0u8; 8];
        buffer.read_up_to(&mut out, SHORT);
        buffer.drain();

        let stats = buffer.stats();
        assert_eq!(stats.capacity, 64);
        assert_eq!(stats.occupied, 0);
        assert_eq!(stats.free, 64);
        assert_eq!(stats.bytes_written, 16);
        assert_eq!(stats.bytes_read, 8);
        assert_eq!(stats.bytes_drained, 8);
        assert_eq!(stats.bytes_dropped, 0);
    }

    #[test]
    fn test_concurrent_producer_consumer_round_trip() {
        let buffer = Arc::new(AudioRingBuffer::new(256, LONG));
        let chunks: usize = 50;

        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..chunks {
                    let chunk = [i as u8; 64];
                    // Capacity is far below the total volume, so the
                    // producer must block on the consumer for space.
                    while buffer.write(&chunk) == 0 {}
                }
            })
        };

        let mut received = Vec::with_capacity(chunks * 64);
        while received.len() < chunks * 64 {
            let mut out = [0u8; 64];
            let n = buffer.read_up_to(&mut out, LONG);
            received.extend_from_slice(&out[..n]);
        }
        producer.join().unwrap();

        for (i, chunk) in received.chunks(64).enumerate() {
            assert!(chunk.iter().all(|&b| b == i as u8), "chunk {} corrupted", i);
        }
    }
}
