//! Dedicated writer thread feeding the output device
//!
//! The writer blocks on the transport slot while idle. A play command
//! moves it into a prefetch phase that polls buffer occupancy, then
//! into a writing phase that repeats: plan a frame-aligned chunk, read
//! it from the staging buffer, scale it by the current volume, and
//! push it to the device. Starvation keeps it in the writing phase
//! with short bounded waits; a pause command drains the buffer before
//! the writer settles into the paused phase.

use crate::audio::format::OutputController;
use crate::audio::scaler::apply_volume;
use crate::audio::volume::VolumeControl;
use crate::playback::notify::StateNotifier;
use crate::playback::ring_buffer::AudioRingBuffer;
use crate::playback::state::PhaseTracker;
use auricle_common::events::{EventBus, PlaybackPhase, SinkEvent, TransportState};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Sleep between occupancy polls while prefetching.
const PREFETCH_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Starved write cycles between starvation log lines.
const STARVATION_LOG_INTERVAL: u64 = 100;

/// Write cycles between buffer stats trace lines.
const STATS_LOG_INTERVAL: u64 = 100;

/// Consecutive device write failures before a stall event fires.
const STALL_EVENT_THRESHOLD: u32 = 10;

/// Everything the worker thread needs, bundled for the spawn.
struct WorkerContext {
    buffer: Arc<AudioRingBuffer>,
    notifier: Arc<StateNotifier>,
    phase: Arc<PhaseTracker>,
    volume: Arc<VolumeControl>,
    controller: Arc<Mutex<OutputController>>,
    events: Arc<EventBus>,
    /// Buffer occupancy that ends the prefetch phase, in bytes.
    prefetch_bytes: usize,
    /// Bound on each wait for more data while starved.
    read_timeout: Duration,
}

/// Handle owning the writer thread.
pub struct OutputWriter {
    thread: Option<JoinHandle<()>>,
    notifier: Arc<StateNotifier>,
}

impl OutputWriter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buffer: Arc<AudioRingBuffer>,
        notifier: Arc<StateNotifier>,
        phase: Arc<PhaseTracker>,
        volume: Arc<VolumeControl>,
        controller: Arc<Mutex<OutputController>>,
        events: Arc<EventBus>,
        prefetch_bytes: usize,
        read_timeout: Duration,
    ) -> Self {
        let ctx = WorkerContext {
            buffer,
            notifier: Arc::clone(&notifier),
            phase,
            volume,
            controller,
            events,
            prefetch_bytes,
            read_timeout,
        };
        let thread = thread::spawn(move || worker_loop(ctx));

        Self {
            thread: Some(thread),
            notifier,
        }
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(mut self) {
        debug!("Shutting down audio writer");
        self.notifier.request_stop();

        if let Some(handle) = self.thread.take() {
            match handle.join() {
                Ok(()) => debug!("Audio writer thread joined"),
                Err(e) => error!("Audio writer thread panicked: {:?}", e),
            }
        }
    }
}

fn worker_loop(ctx: WorkerContext) {
    info!("Audio writer started");

    // The only unbounded wait in the pipeline: idle until a transport
    // command or stop arrives.
    while let Some(command) = ctx.notifier.wait() {
        match command {
            TransportState::Active => {
                ctx.phase.set(PlaybackPhase::Prefetching);
                active_loop(&ctx);
            }
            // Already idle or paused; nothing to wind down
            TransportState::Suspended => {}
        }
    }

    info!("Audio writer stopped");
}

/// Run prefetch and writing until a pause command or stop arrives.
fn active_loop(ctx: &WorkerContext) {
    let mut scratch = vec![0u8; ctx.buffer.capacity()];
    let mut prefetching = true;
    let mut starved_cycles: u64 = 0;
    let mut write_cycles: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        if ctx.notifier.is_stopped() {
            return;
        }
        if let Some(command) = ctx.notifier.take() {
            match command {
                TransportState::Suspended => {
                    // Flush stale audio before settling: a later resume
                    // must start from silence, not leftovers
                    let drained = ctx.buffer.drain();
                    debug!("Pause: drained {} buffered bytes", drained);
                    ctx.phase.set(PlaybackPhase::Paused);
                    return;
                }
                TransportState::Active => {}
            }
        }

        if prefetching {
            if ctx.buffer.bytes_waiting() >= ctx.prefetch_bytes {
                prefetching = false;
                ctx.phase.set(PlaybackPhase::Writing);
            } else {
                thread::sleep(PREFETCH_POLL_INTERVAL);
            }
            continue;
        }

        // One write cycle. The chunk is the largest frame-aligned size
        // that fits the per-cycle ceiling and what is buffered now;
        // occupancy only grows between here and the read, so the read
        // cannot come up short (a concurrent drain empties it instead).
        let plan = { ctx.controller.lock().unwrap().plan() };
        let waiting = ctx.buffer.bytes_waiting();
        let take = waiting.min(plan.cycle_bytes) / plan.frame_bytes * plan.frame_bytes;

        if take == 0 {
            // Starvation is expected with a bursty source; stay in the
            // writing phase and wait out the gap in bounded steps
            starved_cycles += 1;
            if starved_cycles % STARVATION_LOG_INTERVAL == 1 {
                debug!(
                    "Writer starved ({} cycles, {} bytes buffered)",
                    starved_cycles, waiting
                );
            }
            ctx.buffer.wait_for_bytes(plan.frame_bytes, ctx.read_timeout);
            continue;
        }

        let chunk = &mut scratch[..take];
        let got = ctx.buffer.read_up_to(chunk, ctx.read_timeout);
        if got == 0 {
            continue;
        }

        apply_volume(&ctx.volume, &mut chunk[..got]);

        let result = { ctx.controller.lock().unwrap().write(&chunk[..got]) };
        match result {
            Ok(accepted) => {
                consecutive_failures = 0;
                if accepted < got {
                    warn!("Output accepted {} of {} bytes", accepted, got);
                }
                write_cycles += 1;
                if write_cycles % STATS_LOG_INTERVAL == 0 {
                    let stats = ctx.buffer.stats();
                    trace!(
                        "Buffer stats: {}/{} bytes ({:.1}%), written={}, read={}, dropped={}",
                        stats.occupied,
                        stats.capacity,
                        ctx.buffer.fill_percent(),
                        stats.bytes_written,
                        stats.bytes_read,
                        stats.bytes_dropped
                    );
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                error!(
                    "Output write failed ({} consecutive): {}",
                    consecutive_failures, e
                );
                if consecutive_failures == STALL_EVENT_THRESHOLD {
                    ctx.events.emit_lossy(SinkEvent::SinkStalled {
                        consecutive_failures,
                        timestamp: chrono::Utc::now(),
                    });
                }
                // Back off so a dead device cannot spin this loop
                thread::sleep(ctx.read_timeout);
            }
        }
    }
}
