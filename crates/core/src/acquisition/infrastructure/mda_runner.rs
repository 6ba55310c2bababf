use crate::acquisition::domain::frame_source::FrameSource;
use crate::acquisition::domain::sequence::{MdaSequence, SequenceError};
use crate::acquisition::infrastructure::event_hub::AcquisitionEvents;

/// Progress callback: `(frames_done, frames_in_run)`. For an open-ended
/// sequence `frames_in_run` is the frame cap.
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send>;

/// Drives one acquisition: snaps a frame per planned event and emits the
/// lifecycle events to every subscribed listener.
///
/// `sequence_finished` is emitted even when a listener fails to start or a
/// frame fails, so every listener closes its target; the first error is
/// still returned.
#[derive(Default)]
pub struct MdaRunner {
    max_frames: Option<usize>,
    on_progress: Option<ProgressFn>,
}

impl MdaRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of frames. Required for open-ended sequences.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Returns the number of frames emitted.
    pub fn run(
        &self,
        sequence: &MdaSequence,
        source: &mut dyn FrameSource,
        events: &AcquisitionEvents,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let planned = sequence.sizes()?.total_frames()?;
        let limit = match (planned, self.max_frames) {
            (None, None) => return Err(SequenceError::Unbounded.into()),
            (Some(n), None) => n,
            (None, Some(cap)) => cap,
            (Some(n), Some(cap)) => n.min(cap),
        };
        log::info!("Starting acquisition of {limit} frames");

        let result = events
            .emit_sequence_started(sequence)
            .and_then(|()| self.acquire(sequence, source, events, limit));

        if let Err(e) = events.emit_sequence_finished(sequence) {
            if result.is_ok() {
                return Err(e);
            }
            log::warn!("Listener failed while finishing an aborted acquisition: {e}");
        }
        result
    }

    fn acquire(
        &self,
        sequence: &MdaSequence,
        source: &mut dyn FrameSource,
        events: &AcquisitionEvents,
        limit: usize,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut done = 0;
        for event in sequence.events()?.take(limit) {
            let frame = source.snap(&event)?;
            events.emit_frame_ready(&frame, &event)?;
            done += 1;
            if let Some(ref progress) = self.on_progress {
                progress(done, limit);
            }
        }
        Ok(done)
    }
}
