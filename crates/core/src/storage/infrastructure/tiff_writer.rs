use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::error::{ParameterError, ParameterErrorKind};
use image::{ImageBuffer, ImageError, ImageFormat, Luma};

use crate::acquisition::domain::listener::MdaListener;
use crate::acquisition::domain::mda_event::{FrameIndex, MdaEvent};
use crate::acquisition::domain::sequence::MdaSequence;
use crate::acquisition::infrastructure::event_hub::{AcquisitionEvents, SubscriptionId};
use crate::shared::constants::{INDEX_WIDTH, TIFF_EXTENSION};
use crate::shared::frame::{Frame, PixelData};
use crate::storage::domain::target_resolver::resolve_target;
use crate::storage::domain::writer_error::WriterError;
use crate::storage::domain::writer_state::{OpenRun, WriterState};

/// `t000_p000_c000_z000.tiff`
pub fn frame_file_name(index: FrameIndex) -> String {
    let w = INDEX_WIDTH;
    format!(
        "t{:0w$}_p{:0w$}_c{:0w$}_z{:0w$}.{TIFF_EXTENSION}",
        index.t, index.p, index.c, index.z
    )
}

/// Writes every frame of a run as its own grayscale TIFF inside a fresh
/// `<base>_<n>` directory.
///
/// Open-ended time plans are accepted since nothing is pre-allocated; the
/// bounded axes are still checked.
pub struct TiffWriter {
    base_path: PathBuf,
    state: WriterState,
}

impl TiffWriter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            state: WriterState::Unopened,
        }
    }

    pub fn attach(
        events: &mut AcquisitionEvents,
        base_path: impl Into<PathBuf>,
    ) -> (Arc<Mutex<Self>>, SubscriptionId) {
        let writer = Arc::new(Mutex::new(Self::new(base_path)));
        let id = events.subscribe(writer.clone());
        (writer, id)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn state(&self) -> &WriterState {
        &self.state
    }

    pub fn target(&self) -> Option<&Path> {
        self.state.target()
    }

    pub fn start(&mut self, sequence: &MdaSequence) -> Result<(), WriterError> {
        if let WriterState::Open(run) = &self.state {
            log::warn!(
                "Sequence start received while {} is open; keeping the current directory",
                run.target().display()
            );
            return Ok(());
        }

        let sizes = sequence.sizes()?;
        let target = resolve_target(&self.base_path, None).ok_or_else(|| {
            WriterError::TargetsExhausted {
                base: self.base_path.clone(),
            }
        })?;
        fs::create_dir_all(&target).map_err(WriterError::io(&target))?;
        log::info!("Writing frames to {}", target.display());
        self.state = WriterState::Open(OpenRun::new(target, sizes));
        Ok(())
    }

    pub fn write_frame(&mut self, frame: &Frame, event: &MdaEvent) -> Result<(), WriterError> {
        let index = event.index;
        let run = self.state.open_run(index)?;
        run.check(index)?;

        let path = run.target().join(frame_file_name(index));
        save_tiff(&path, frame)?;
        run.mark_written(index);
        log::debug!("Wrote frame {index} to {}", path.display());
        Ok(())
    }

    pub fn finish(&mut self) -> Option<PathBuf> {
        let run = self.state.close()?;
        log::info!(
            "Finished {} ({} files)",
            run.target().display(),
            run.frames_written()
        );
        Some(run.target().to_path_buf())
    }
}

fn save_tiff(path: &Path, frame: &Frame) -> Result<(), WriterError> {
    let (width, height) = (frame.width(), frame.height());
    let result = match frame.pixels() {
        PixelData::U8(data) => {
            ImageBuffer::<Luma<u8>, &[u8]>::from_raw(width, height, data.as_slice())
                .ok_or_else(dimension_mismatch)
                .and_then(|img| img.save_with_format(path, ImageFormat::Tiff))
        }
        PixelData::U16(data) => {
            ImageBuffer::<Luma<u16>, &[u16]>::from_raw(width, height, data.as_slice())
                .ok_or_else(dimension_mismatch)
                .and_then(|img| img.save_with_format(path, ImageFormat::Tiff))
        }
    };
    result.map_err(|source| WriterError::Image {
        path: path.to_path_buf(),
        source,
    })
}

fn dimension_mismatch() -> ImageError {
    ImageError::Parameter(ParameterError::from_kind(
        ParameterErrorKind::DimensionMismatch,
    ))
}

impl MdaListener for TiffWriter {
    fn sequence_started(
        &mut self,
        sequence: &MdaSequence,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(self.start(sequence)?)
    }

    fn frame_ready(
        &mut self,
        frame: &Frame,
        event: &MdaEvent,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(self.write_frame(frame, event)?)
    }

    fn sequence_finished(
        &mut self,
        _sequence: &MdaSequence,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.finish();
        Ok(())
    }
}
