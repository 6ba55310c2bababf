use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use zarrs::array::{Array, ArrayBuilder};
use zarrs::filesystem::FilesystemStore;

use crate::acquisition::domain::listener::MdaListener;
use crate::acquisition::domain::mda_event::MdaEvent;
use crate::acquisition::domain::sequence::MdaSequence;
use crate::acquisition::infrastructure::event_hub::{AcquisitionEvents, SubscriptionId};
use crate::shared::constants::{ARRAY_DIMENSIONS, CHANNELS_ATTRIBUTE, ZARR_EXTENSION};
use crate::shared::dtype::DType;
use crate::shared::frame::{Frame, PixelData};
use crate::storage::domain::target_resolver::resolve_target;
use crate::storage::domain::writer_error::WriterError;
use crate::storage::domain::writer_state::{OpenRun, WriterState};

#[derive(Clone, Debug, PartialEq)]
pub struct ZarrWriterConfig {
    /// Each run writes to `<base_path>_<n>.zarr`.
    pub base_path: PathBuf,
    /// `(height, width)` of every frame.
    pub frame_shape: (u32, u32),
    pub dtype: DType,
}

/// Persists each acquisition run as one 6-D Zarr array `(t, p, c, z, y, x)`,
/// one uncompressed chunk per frame.
///
/// Each frame is stored as soon as it arrives, so an interrupted run leaves
/// every completed frame readable.
pub struct ZarrWriter {
    config: ZarrWriterConfig,
    array: Option<Array<FilesystemStore>>,
    state: WriterState,
}

impl ZarrWriter {
    pub fn new(config: ZarrWriterConfig) -> Result<Self, WriterError> {
        let (height, width) = config.frame_shape;
        if height == 0 || width == 0 {
            return Err(WriterError::InvalidShape { height, width });
        }
        Ok(Self {
            config,
            array: None,
            state: WriterState::Unopened,
        })
    }

    /// Builds a writer and subscribes it to `events`.
    pub fn attach(
        events: &mut AcquisitionEvents,
        config: ZarrWriterConfig,
    ) -> Result<(Arc<Mutex<Self>>, SubscriptionId), WriterError> {
        let writer = Arc::new(Mutex::new(Self::new(config)?));
        let id = events.subscribe(writer.clone());
        Ok((writer, id))
    }

    pub fn config(&self) -> &ZarrWriterConfig {
        &self.config
    }

    pub fn state(&self) -> &WriterState {
        &self.state
    }

    /// Store of the current run, or of the last finished one.
    pub fn target(&self) -> Option<&Path> {
        self.state.target()
    }

    /// Resolves a fresh store and allocates the array for `sequence`.
    ///
    /// A start received while a run is already open is ignored so frames
    /// written so far are kept.
    pub fn start(&mut self, sequence: &MdaSequence) -> Result<(), WriterError> {
        if let WriterState::Open(run) = &self.state {
            log::warn!(
                "Sequence start received while {} is open; keeping the current store",
                run.target().display()
            );
            return Ok(());
        }

        let sizes = sequence.sizes()?;
        let dims = sizes.bounded()?;
        let base = &self.config.base_path;
        let target =
            resolve_target(base, Some(ZARR_EXTENSION)).ok_or_else(|| WriterError::TargetsExhausted {
                base: base.clone(),
            })?;
        let array = create_array(&target, dims, &self.config, sequence.channel_names())?;

        log::info!(
            "Created Zarr store {} with shape {:?} ({})",
            target.display(),
            array.shape(),
            self.config.dtype
        );
        self.array = Some(array);
        self.state = WriterState::Open(OpenRun::new(target, sizes));
        Ok(())
    }

    /// Writes `frame` into the chunk addressed by the event indices.
    pub fn write_frame(&mut self, frame: &Frame, event: &MdaEvent) -> Result<(), WriterError> {
        let index = event.index;
        let expected = (
            self.config.frame_shape.0 as usize,
            self.config.frame_shape.1 as usize,
        );
        let dtype = self.config.dtype;
        let run = self.state.open_run(index)?;
        let array = self
            .array
            .as_ref()
            .ok_or(WriterError::NotOpen { index })?;

        if frame.dtype() != dtype {
            return Err(WriterError::DTypeMismatch {
                expected: dtype,
                actual: frame.dtype(),
            });
        }
        if frame.shape() != expected {
            return Err(WriterError::ShapeMismatch {
                expected,
                actual: frame.shape(),
            });
        }
        run.check(index)?;

        let chunk = frame_chunk_indices(index.as_array());
        let stored = match frame.pixels() {
            PixelData::U8(data) => array.store_chunk_elements::<u8>(&chunk, data),
            PixelData::U16(data) => array.store_chunk_elements::<u16>(&chunk, data),
        };
        stored.map_err(|source| WriterError::Chunk { index, source })?;
        run.mark_written(index);
        log::debug!("Wrote frame {index} to {}", run.target().display());
        Ok(())
    }

    /// Closes the current run and returns its store path.
    pub fn finish(&mut self) -> Option<PathBuf> {
        let run = self.state.close()?;
        self.array = None;
        log::info!(
            "Finished Zarr store {} ({} frames)",
            run.target().display(),
            run.frames_written()
        );
        Some(run.target().to_path_buf())
    }
}

/// Chunk grid coordinates of the frame at `(t, p, c, z)`.
pub fn frame_chunk_indices([t, p, c, z]: [usize; 4]) -> [u64; 6] {
    [t as u64, p as u64, c as u64, z as u64, 0, 0]
}

fn create_array(
    target: &Path,
    [t, p, c, z]: [usize; 4],
    config: &ZarrWriterConfig,
    channels: Vec<String>,
) -> Result<Array<FilesystemStore>, WriterError> {
    fs::create_dir_all(target).map_err(WriterError::io(target))?;
    let store = Arc::new(FilesystemStore::new(target).map_err(WriterError::zarr(target))?);

    let (height, width) = (config.frame_shape.0 as u64, config.frame_shape.1 as u64);
    let shape = vec![t as u64, p as u64, c as u64, z as u64, height, width];
    let frame_chunk = vec![1, 1, 1, 1, height, width];
    let mut attributes = serde_json::Map::new();
    attributes.insert(CHANNELS_ATTRIBUTE.to_string(), channels.into());

    let array = ArrayBuilder::new(
        shape,
        config.dtype.zarr_data_type(),
        frame_chunk.try_into().map_err(WriterError::zarr(target))?,
        config.dtype.zarr_fill_value(),
    )
    .dimension_names(ARRAY_DIMENSIONS.into())
    .attributes(attributes)
    .build(store, "/")
    .map_err(WriterError::zarr(target))?;
    array.store_metadata().map_err(WriterError::zarr(target))?;
    Ok(array)
}

impl MdaListener for ZarrWriter {
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
