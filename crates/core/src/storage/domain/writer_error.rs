use std::path::PathBuf;

use thiserror::Error;

use crate::acquisition::domain::mda_event::FrameIndex;
use crate::acquisition::domain::sequence::SequenceError;
use crate::shared::dtype::DType;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("invalid frame shape {height}x{width}: dimensions must be non-zero")]
    InvalidShape { height: u32, width: u32 },
    #[error("frame {index} arrived before the sequence was started")]
    NotOpen { index: FrameIndex },
    #[error("frame shape {actual:?} does not match configured shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("frame dtype {actual} does not match array dtype {expected}")]
    DTypeMismatch { expected: DType, actual: DType },
    #[error("frame {index} is outside the declared sequence bounds")]
    IndexOutOfBounds { index: FrameIndex },
    #[error("frame {index} was already written in this run")]
    DuplicateFrame { index: FrameIndex },
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("every numbered target next to {base} is taken")]
    TargetsExhausted { base: PathBuf },
    #[error("failed to create Zarr array at {path}: {source}")]
    Zarr {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to store frame {index}: {source}")]
    Chunk {
        index: FrameIndex,
        #[source]
        source: zarrs::array::ArrayError,
    },
    #[error("failed to write image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl WriterError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| WriterError::Io { path, source }
    }

    pub(crate) fn zarr<E>(path: impl Into<PathBuf>) -> impl FnOnce(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let path = path.into();
        move |source| WriterError::Zarr {
            path,
            source: Box::new(source),
        }
    }
}
