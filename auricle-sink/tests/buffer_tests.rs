//! Staging buffer integration tests
//!
//! Load-shaped coverage of the ring buffer: producer/consumer byte
//! conservation under concurrency, ordering across many wraparounds,
//! and the all-or-nothing write guarantee at realistic sizes.

use auricle_sink::playback::AudioRingBuffer;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Deterministic byte stream so both sides can derive the same data.
struct PatternGen {
    state: u64,
}

impl PatternGen {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_byte(&mut self) -> u8 {
        (self.next_u64() >> 33) as u8
    }

    /// Frame-aligned batch size between one and `max_frames` frames.
    fn next_batch_size(&mut self, frame_bytes: usize, max_frames: usize) -> usize {
        let frames = (self.next_u64() % max_frames as u64) as usize + 1;
        frames * frame_bytes
    }
}

#[test]
fn test_spsc_byte_conservation_under_load() {
    let buffer = Arc::new(AudioRingBuffer::new(4096, Duration::from_millis(10)));

    // Precompute the whole stream so producer and checker agree
    let mut sizes = Vec::new();
    let mut gen = PatternGen::new(7);
    let mut expected = Vec::new();
    for _ in 0..300 {
        let size = gen.next_batch_size(4, 64);
        sizes.push(size);
        for _ in 0..size {
            expected.push(gen.next_byte());
        }
    }
    let total = expected.len();

    let producer = {
        let buffer = Arc::clone(&buffer);
        let expected = expected.clone();
        thread::spawn(move || {
            let mut offset = 0;
            for size in sizes {
                let batch = &expected[offset..offset + size];
                // All-or-nothing: retry the full batch until it fits
                while buffer.write(batch) == 0 {}
                offset += size;
            }
        })
    };

    let mut received = Vec::with_capacity(total);
    let mut chunk = [0u8; 97];
    while received.len() < total {
        let got = buffer.read_up_to(&mut chunk, Duration::from_millis(50));
        received.extend_from_slice(&chunk[..got]);
    }
    producer.join().unwrap();

    assert_eq!(received.len(), total);
    assert!(received == expected, "byte stream reordered or corrupted");
    let stats = buffer.stats();
    assert_eq!(stats.bytes_written, total as u64);
    assert_eq!(stats.bytes_read, total as u64);
    assert_eq!(stats.bytes_dropped, 0);
}

#[test]
fn test_fifo_order_across_many_wraparounds() {
    let buffer = AudioRingBuffer::new(64, Duration::from_millis(10));
    let mut feed = PatternGen::new(42);
    let mut check = PatternGen::new(42);

    // Mismatched write/read sizes walk the positions through every
    // offset of the 64 byte storage many times over
    let mut out = [0u8; 24];
    let mut pending = 0usize;
    for _ in 0..100 {
        let mut batch = [0u8; 40];
        for byte in batch.iter_mut() {
            *byte = feed.next_byte();
        }
        assert_eq!(buffer.write(&batch), 40);
        pending += 40;

        while pending > 24 {
            let got = buffer.read_up_to(&mut out, Duration::from_millis(10));
            assert_eq!(got, 24);
            for &byte in &out[..got] {
                assert_eq!(byte, check.next_byte());
            }
            pending -= got;
        }
    }

    // Tail flush
    while pending > 0 {
        let got = buffer.read_up_to(&mut out, Duration::from_millis(10));
        assert!(got > 0);
        for &byte in &out[..got] {
            assert_eq!(byte, check.next_byte());
        }
        pending -= got;
    }
    assert!(buffer.is_empty());
}

#[test]
fn test_write_timeout_preserves_occupancy() {
    let buffer = AudioRingBuffer::new(32768, Duration::from_millis(10));
    assert_eq!(buffer.write(&vec![0u8; 30000]), 30000);

    let start = Instant::now();
    assert_eq!(buffer.write(&vec![0u8; 4096]), 0);
    assert!(start.elapsed() >= Duration::from_millis(10));

    assert_eq!(buffer.bytes_waiting(), 30000);
    assert_eq!(buffer.stats().bytes_dropped, 4096);
}

#[test]
fn test_drain_on_empty_is_immediate() {
    let buffer = AudioRingBuffer::new(4096, Duration::from_millis(10));

    let start = Instant::now();
    for _ in 0..3 {
        assert_eq!(buffer.drain(), 0);
    }
    // Never waits on a timeout, even repeated
    assert!(start.elapsed() < Duration::from_millis(10));
}

#[test]
fn test_wait_for_bytes_sees_late_arrival() {
    let buffer = Arc::new(AudioRingBuffer::new(4096, Duration::from_millis(10)));

    let writer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            buffer.write(&[0u8; 8]);
        })
    };

    assert!(buffer.wait_for_bytes(8, Duration::from_millis(500)));
    writer.join().unwrap();

    // Only 8 bytes present, so a larger ask times out
    assert!(!buffer.wait_for_bytes(16, Duration::from_millis(50)));
}
