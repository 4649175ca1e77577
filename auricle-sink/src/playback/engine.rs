//! Audio pipeline coordination
//!
//! [`AudioPipeline`] owns the output controller and volume state for the
//! life of the process, and one optional stream session (staging buffer,
//! transport notifier, phase tracker, writer thread) between arm and
//! teardown. The upstream profile layer drives it through four entry
//! points: `on_stream_configured`, `on_audio_data`, `on_playback_state`,
//! and `on_remote_volume_set`.

use crate::audio::format::OutputController;
use crate::audio::output::OutputSink;
use crate::audio::volume::VolumeControl;
use crate::playback::notify::StateNotifier;
use crate::playback::ring_buffer::{AudioRingBuffer, BufferStats};
use crate::playback::state::PhaseTracker;
use crate::playback::writer::OutputWriter;
use crate::{Error, Result};
use auricle_common::config::SinkConfig;
use auricle_common::events::{EventBus, PlaybackPhase, SinkEvent, TransportState};
use auricle_common::StreamFormat;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Accepted producer writes between occupancy debug lines.
const OCCUPANCY_LOG_INTERVAL: u64 = 100;

/// Rejected batches between unarmed-intake warn lines.
const UNARMED_LOG_INTERVAL: u64 = 100;

/// One armed stream: everything that exists between a device connecting
/// and disconnecting.
struct StreamSession {
    id: Uuid,
    buffer: Arc<AudioRingBuffer>,
    notifier: Arc<StateNotifier>,
    phase: Arc<PhaseTracker>,
    writer: OutputWriter,
}

/// Snapshot of pipeline counters and the current session, if any.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub armed: bool,
    pub session_id: Option<Uuid>,
    pub phase: PlaybackPhase,
    pub buffer: Option<BufferStats>,
    pub volume_raw: u8,
    pub volume_percent: u8,
    /// Producer batches accepted across the pipeline lifetime
    pub intake_writes: u64,
    /// Batches rejected because no session was armed
    pub unarmed_rejects: u64,
    /// Bytes in those rejected batches
    pub unarmed_bytes: u64,
}

pub struct AudioPipeline {
    config: SinkConfig,

    /// Output device behind its format controller; shared with the
    /// writer thread of whichever session is armed
    controller: Arc<Mutex<OutputController>>,

    /// Volume state shared between the remote-control path and the
    /// writer thread
    volume: Arc<VolumeControl>,

    events: Arc<EventBus>,

    /// The armed session, if any
    session: RwLock<Option<StreamSession>>,

    /// Producer gate. Cleared before the session is dismantled so no
    /// in-flight batch can land on a released buffer
    intake: AtomicBool,

    intake_writes: AtomicU64,
    unarmed_rejects: AtomicU64,
    unarmed_bytes: AtomicU64,
}

impl AudioPipeline {
    /// Create the pipeline and bring the output sink up at the default
    /// format, so playback can start even if the profile layer never
    /// issues an explicit configure.
    pub fn new(
        config: SinkConfig,
        sink: Box<dyn OutputSink>,
        events: Arc<EventBus>,
    ) -> Result<Self> {
        let volume = Arc::new(VolumeControl::new(
            config.volume.curve,
            config.volume.default_percent,
        ));
        let mut controller = OutputController::new(sink, config.buffer.burst_bytes);
        controller.configure(StreamFormat::default())?;

        info!(
            "Audio pipeline ready: {} (volume {}%, {} curve)",
            controller.format(),
            volume.percent(),
            volume.curve()
        );

        Ok(Self {
            config,
            controller: Arc::new(Mutex::new(controller)),
            volume,
            events,
            session: RwLock::new(None),
            intake: AtomicBool::new(false),
            intake_writes: AtomicU64::new(0),
            unarmed_rejects: AtomicU64::new(0),
            unarmed_bytes: AtomicU64::new(0),
        })
    }

    /// Arm a stream session: allocate the staging buffer and start the
    /// writer thread. Fails if a session is already armed.
    pub fn arm(&self) -> Result<Uuid> {
        let mut slot = self.session.write().unwrap();
        if slot.is_some() {
            return Err(Error::InvalidState("pipeline already armed".to_string()));
        }

        let capacity = self.config.buffer.capacity_bytes();
        let prefetch = self.config.buffer.prefetch_bytes();
        let id = Uuid::new_v4();

        let buffer = Arc::new(AudioRingBuffer::new(
            capacity,
            self.config.buffer.write_timeout(),
        ));
        let notifier = Arc::new(StateNotifier::new());
        let phase = Arc::new(PhaseTracker::new(Arc::clone(&self.events)));
        let writer = OutputWriter::new(
            Arc::clone(&buffer),
            Arc::clone(&notifier),
            Arc::clone(&phase),
            Arc::clone(&self.volume),
            Arc::clone(&self.controller),
            Arc::clone(&self.events),
            prefetch,
            self.config.buffer.read_timeout(),
        );

        *slot = Some(StreamSession {
            id,
            buffer,
            notifier,
            phase,
            writer,
        });
        // Open the gate only once the session is in place
        self.intake.store(true, Ordering::Release);
        drop(slot);

        info!(
            "Pipeline armed: session {} ({} byte buffer, {} byte prefetch)",
            id, capacity, prefetch
        );
        self.events.emit_lossy(SinkEvent::PipelineArmed {
            session_id: id,
            capacity,
            prefetch_threshold: prefetch,
            timestamp: chrono::Utc::now(),
        });

        Ok(id)
    }

    /// Tear down the armed session: stop intake, stop and join the
    /// writer, release the buffer. No-op when nothing is armed.
    pub fn teardown(&self) {
        // Close the gate first. A producer already past it finishes its
        // bounded write while holding the session read lock, which the
        // take below waits out.
        self.intake.store(false, Ordering::Release);

        let session = { self.session.write().unwrap().take() };
        let Some(session) = session else {
            debug!("Teardown requested with no armed session");
            return;
        };

        session.writer.shutdown();

        info!("Pipeline torn down: session {}", session.id);
        self.events.emit_lossy(SinkEvent::PipelineTornDown {
            session_id: session.id,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Reconfigure the output device for a newly negotiated stream.
    ///
    /// Must not race a writing cycle; the profile layer only issues this
    /// at stream (re)establishment.
    pub fn on_stream_configured(
        &self,
        sample_rate: u32,
        bits_per_sample: u16,
        channel_count: u16,
    ) -> Result<()> {
        let format = StreamFormat::new(sample_rate, bits_per_sample, channel_count)?;

        if self.phase() == PlaybackPhase::Writing {
            warn!("Output reconfigured while writing; upstream should have stopped the stream");
        }

        let plan = {
            let mut controller = self.controller.lock().unwrap();
            controller.configure(format)?;
            controller.plan()
        };

        self.events.emit_lossy(SinkEvent::FormatChanged {
            sample_rate,
            bits_per_sample,
            channel_count,
            frame_bytes: plan.frame_bytes,
            cycle_bytes: plan.cycle_bytes,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Stage one incoming audio batch. Returns the bytes accepted: the
    /// whole batch, or 0 when it was rejected or timed out.
    pub fn on_audio_data(&self, data: &[u8]) -> usize {
        if !self.intake.load(Ordering::Acquire) {
            return self.reject_unarmed(data.len());
        }

        let slot = self.session.read().unwrap();
        let Some(session) = slot.as_ref() else {
            // Lost the race with a teardown after the gate check
            return self.reject_unarmed(data.len());
        };

        let accepted = session.buffer.write(data);
        if accepted == 0 && !data.is_empty() {
            let stats = session.buffer.stats();
            error!(
                "Audio batch dropped: {} bytes (buffer full, {} dropped total)",
                data.len(),
                stats.bytes_dropped
            );
            self.events.emit_lossy(SinkEvent::DataDropped {
                bytes: data.len(),
                total_dropped: stats.bytes_dropped,
                timestamp: chrono::Utc::now(),
            });
            return 0;
        }

        let writes = self.intake_writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % OCCUPANCY_LOG_INTERVAL == 0 {
            debug!(
                "Staging buffer: {}/{} bytes ({:.1}%)",
                session.buffer.bytes_waiting(),
                session.buffer.capacity(),
                session.buffer.fill_percent()
            );
        }
        accepted
    }

    /// Forward a transport state change to the writer thread.
    pub fn on_playback_state(&self, state: TransportState) -> Result<()> {
        let slot = self.session.read().unwrap();
        let Some(session) = slot.as_ref() else {
            return Err(Error::InvalidState(format!(
                "transport change to {} with no armed session",
                state
            )));
        };

        debug!("Transport: {} (session {})", state, session.id);
        session.notifier.send(state);
        self.events.emit_lossy(SinkEvent::TransportChanged {
            state,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Apply a remote volume command (raw device units, clamped to
    /// 0-127). Returns the stored raw value and derived percentage.
    pub fn on_remote_volume_set(&self, raw: u8) -> (u8, u8) {
        let (raw, percent) = self.volume.set_raw(raw);
        info!("Volume set remotely: raw {} ({}%)", raw, percent);
        self.events.emit_lossy(SinkEvent::VolumeChanged {
            raw,
            percent,
            timestamp: chrono::Utc::now(),
        });
        (raw, percent)
    }

    /// Current consumer phase; `Idle` when no session is armed.
    pub fn phase(&self) -> PlaybackPhase {
        self.session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.phase.get())
            .unwrap_or(PlaybackPhase::Idle)
    }

    pub fn is_armed(&self) -> bool {
        self.session.read().unwrap().is_some()
    }

    pub fn volume(&self) -> &VolumeControl {
        &self.volume
    }

    pub fn stats(&self) -> PipelineStats {
        let slot = self.session.read().unwrap();
        PipelineStats {
            armed: slot.is_some(),
            session_id: slot.as_ref().map(|s| s.id),
            phase: slot
                .as_ref()
                .map(|s| s.phase.get())
                .unwrap_or(PlaybackPhase::Idle),
            buffer: slot.as_ref().map(|s| s.buffer.stats()),
            volume_raw: self.volume.raw(),
            volume_percent: self.volume.percent(),
            intake_writes: self.intake_writes.load(Ordering::Relaxed),
            unarmed_rejects: self.unarmed_rejects.load(Ordering::Relaxed),
            unarmed_bytes: self.unarmed_bytes.load(Ordering::Relaxed),
        }
    }

    /// Tear down any session and disable the output sink. For a file
    /// sink this finalizes the output.
    pub fn shutdown(&self) -> Result<()> {
        self.teardown();
        self.controller.lock().unwrap().shutdown()
    }

    fn reject_unarmed(&self, bytes: usize) -> usize {
        let rejects = self.unarmed_rejects.fetch_add(1, Ordering::Relaxed) + 1;
        self.unarmed_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        if rejects % UNARMED_LOG_INTERVAL == 1 {
            warn!(
                "Audio batch rejected: no armed session ({} rejected so far)",
                rejects
            );
        }
        0
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        self.teardown();
        if let Ok(mut controller) = self.controller.lock() {
            if let Err(e) = controller.shutdown() {
                warn!("Output shutdown during drop failed: {}", e);
            }
        }
    }
}
