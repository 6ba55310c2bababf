use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::acquisition::domain::mda_event::FrameIndex;
use crate::acquisition::domain::sequence::SequenceSizes;
use crate::storage::domain::writer_error::WriterError;

/// Bookkeeping for the run a writer currently has open.
#[derive(Debug)]
pub struct OpenRun {
    target: PathBuf,
    sizes: SequenceSizes,
    written: HashSet<FrameIndex>,
}

impl OpenRun {
    pub fn new(target: PathBuf, sizes: SequenceSizes) -> Self {
        Self {
            target,
            sizes,
            written: HashSet::new(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn sizes(&self) -> &SequenceSizes {
        &self.sizes
    }

    pub fn frames_written(&self) -> usize {
        self.written.len()
    }

    /// Rejects indices outside the declared bounds or already written.
    pub fn check(&self, index: FrameIndex) -> Result<(), WriterError> {
        if !self.sizes.contains(&index) {
            return Err(WriterError::IndexOutOfBounds { index });
        }
        if self.written.contains(&index) {
            return Err(WriterError::DuplicateFrame { index });
        }
        Ok(())
    }

    /// Call only after the frame is on disk, so a failed write can be retried.
    pub fn mark_written(&mut self, index: FrameIndex) {
        self.written.insert(index);
    }
}

/// `Unopened -> Open -> Closed`; a closed writer opens again on the next run.
#[derive(Debug, Default)]
pub enum WriterState {
    #[default]
    Unopened,
    Open(OpenRun),
    Closed { last_target: PathBuf },
}

impl WriterState {
    pub fn is_open(&self) -> bool {
        matches!(self, WriterState::Open(_))
    }

    /// Target of the open run, or of the last finished one.
    pub fn target(&self) -> Option<&Path> {
        match self {
            WriterState::Unopened => None,
            WriterState::Open(run) => Some(run.target()),
            WriterState::Closed { last_target } => Some(last_target),
        }
    }

    pub fn open_run(&mut self, index: FrameIndex) -> Result<&mut OpenRun, WriterError> {
        match self {
            WriterState::Open(run) => Ok(run),
            _ => Err(WriterError::NotOpen { index }),
        }
    }

    /// Closes the open run, returning it. No-op when nothing is open.
    pub fn close(&mut self) -> Option<OpenRun> {
        match std::mem::take(self) {
            WriterState::Open(run) => {
                *self = WriterState::Closed {
                    last_target: run.target.clone(),
                };
                Some(run)
            }
            other => {
                *self = other;
                None
            }
        }
    }
}
