use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use zarrs::array::{Array, ArrayCreateError, ArrayError};
use zarrs::filesystem::{FilesystemStore, FilesystemStoreCreateError};
use zarrs::storage::StorageError;

use crate::acquisition::domain::mda_event::FrameIndex;
use crate::shared::constants::CHANNELS_ATTRIBUTE;
use crate::shared::dtype::DType;
use crate::shared::frame::{Frame, PixelData};
use crate::storage::infrastructure::zarr_writer::frame_chunk_indices;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },
    #[error("cannot open store {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: FilesystemStoreCreateError,
    },
    #[error("no readable Zarr array at {path}: {source}")]
    Array {
        path: PathBuf,
        #[source]
        source: ArrayCreateError,
    },
    #[error("unsupported data type {0}")]
    UnsupportedDType(String),
    #[error("unsupported array layout: {0}")]
    UnsupportedLayout(String),
    #[error("frame {index} is outside the array shape {shape:?}")]
    IndexOutOfBounds { index: FrameIndex, shape: [u64; 6] },
    #[error("failed to read frame {index}: {source}")]
    Read {
        index: FrameIndex,
        #[source]
        source: ArrayError,
    },
    #[error("failed to look up chunk {chunk:?}: {source}")]
    ChunkLookup {
        chunk: [u64; 6],
        #[source]
        source: StorageError,
    },
}

/// Read access to a frame-chunked Zarr array as written by
/// [`ZarrWriter`](super::zarr_writer::ZarrWriter).
///
/// Any codec chain `zarrs` can decode is accepted, but the array must be
/// 6-D with exactly one chunk per frame.
pub struct ZarrStore {
    root: PathBuf,
    array: Array<FilesystemStore>,
    shape: [u64; 6],
    dtype: DType,
}

impl ZarrStore {
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        if !root.is_dir() {
            return Err(StoreError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let store = FilesystemStore::new(root).map_err(|source| StoreError::Store {
            path: root.to_path_buf(),
            source,
        })?;
        let array = Array::open(Arc::new(store), "/").map_err(|source| StoreError::Array {
            path: root.to_path_buf(),
            source,
        })?;

        let dtype = DType::from_zarr_data_type(array.data_type())
            .ok_or_else(|| StoreError::UnsupportedDType(format!("{:?}", array.data_type())))?;
        let shape: [u64; 6] = array.shape().try_into().map_err(|_| {
            StoreError::UnsupportedLayout(format!("{}-D array", array.shape().len()))
        })?;
        let [t, p, c, z, _, _] = shape;
        let grid = array.chunk_grid_shape();
        if grid.as_deref() != Some(&[t, p, c, z, 1, 1][..]) {
            return Err(StoreError::UnsupportedLayout(format!(
                "chunk grid {grid:?} is not one chunk per frame"
            )));
        }

        Ok(Self {
            root: root.to_path_buf(),
            array,
            shape,
            dtype,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `(t, p, c, z, height, width)`
    pub fn shape(&self) -> [u64; 6] {
        self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Channel names recorded at creation, empty if none were.
    pub fn channels(&self) -> Vec<String> {
        self.array
            .attributes()
            .get(CHANNELS_ATTRIBUTE)
            .and_then(serde_json::Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Frames the array has room for, or `None` if that overflows `u64`.
    pub fn frame_capacity(&self) -> Option<u64> {
        self.shape[..4]
            .iter()
            .try_fold(1u64, |acc, &n| acc.checked_mul(n))
    }

    /// Number of chunks present in the store, i.e. frames written.
    pub fn chunk_count(&self) -> Result<usize, StoreError> {
        let [t, p, c, z, _, _] = self.shape;
        let chunks = (0..t).flat_map(|t| {
            (0..p).flat_map(move |p| {
                (0..c).flat_map(move |c| (0..z).map(move |z| [t, p, c, z, 0, 0]))
            })
        });
        let mut written = 0;
        for chunk in chunks {
            let encoded = self
                .array
                .retrieve_encoded_chunk(&chunk)
                .map_err(|source| StoreError::ChunkLookup { chunk, source })?;
            if encoded.is_some() {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Reads one frame. A chunk never written reads as the fill value.
    pub fn read_frame(&self, index: FrameIndex) -> Result<Frame, StoreError> {
        let chunk = frame_chunk_indices(index.as_array());
        if chunk[..4].iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return Err(StoreError::IndexOutOfBounds {
                index,
                shape: self.shape,
            });
        }

        let pixels = match self.dtype {
            DType::Uint8 => self
                .array
                .retrieve_chunk_elements::<u8>(&chunk)
                .map(PixelData::U8),
            DType::Uint16 => self
                .array
                .retrieve_chunk_elements::<u16>(&chunk)
                .map(PixelData::U16),
        }
        .map_err(|source| StoreError::Read { index, source })?;
        let (height, width) = (self.shape[4] as u32, self.shape[5] as u32);
        Ok(Frame::new(pixels, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zarrs::array::{ArrayBuilder, DataType, FillValue};

    fn build_array(
        root: &Path,
        shape: Vec<u64>,
        chunk: Vec<u64>,
        data_type: DataType,
        fill_value: FillValue,
    ) -> Array<FilesystemStore> {
        std::fs::create_dir_all(root).unwrap();
        let store = Arc::new(FilesystemStore::new(root).unwrap());
        let array = ArrayBuilder::new(shape, data_type, chunk.try_into().unwrap(), fill_value)
            .build(store, "/")
            .unwrap();
        array.store_metadata().unwrap();
        array
    }

    #[test]
    fn test_open_missing_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ZarrStore::open(&dir.path().join("nope.zarr")),
            Err(StoreError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_open_directory_without_array_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ZarrStore::open(dir.path()),
            Err(StoreError::Array { .. })
        ));
    }

    #[test]
    fn test_reads_chunk_stored_by_another_writer() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store.zarr");
        let array = build_array(
            &root,
            vec![1, 1, 2, 1, 1, 2],
            vec![1, 1, 1, 1, 1, 2],
            DataType::UInt16,
            FillValue::from(0u16),
        );
        array
            .store_chunk_elements::<u16>(&[0, 0, 1, 0, 0, 0], &[1, 256])
            .unwrap();

        let store = ZarrStore::open(&root).unwrap();
        assert_eq!(store.shape(), [1, 1, 2, 1, 1, 2]);
        assert_eq!(store.dtype(), DType::Uint16);
        let frame = store.read_frame(FrameIndex::new(0, 0, 1, 0)).unwrap();
        assert_eq!(frame.pixels(), &PixelData::U16(vec![1, 256]));
        assert_eq!(store.chunk_count().unwrap(), 1);
        assert_eq!(store.frame_capacity(), Some(2));
    }

    #[test]
    fn test_missing_chunk_reads_fill_value() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store.zarr");
        build_array(
            &root,
            vec![1, 1, 1, 1, 2, 2],
            vec![1, 1, 1, 1, 2, 2],
            DataType::UInt8,
            FillValue::from(9u8),
        );
        let store = ZarrStore::open(&root).unwrap();
        let frame = store.read_frame(FrameIndex::new(0, 0, 0, 0)).unwrap();
        assert_eq!(frame.pixels(), &PixelData::U8(vec![9; 4]));
        assert_eq!(store.chunk_count().unwrap(), 0);
        assert!(store.channels().is_empty());
    }

    #[test]
    fn test_out_of_bounds_read_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store.zarr");
        build_array(
            &root,
            vec![1, 1, 1, 4, 2, 2],
            vec![1, 1, 1, 1, 2, 2],
            DataType::UInt8,
            FillValue::from(0u8),
        );
        let store = ZarrStore::open(&root).unwrap();
        assert!(matches!(
            store.read_frame(FrameIndex::new(0, 0, 0, 4)),
            Err(StoreError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_sub_frame_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tiled.zarr");
        build_array(
            &root,
            vec![1, 1, 1, 1, 4, 4],
            vec![1, 1, 1, 1, 2, 2],
            DataType::UInt8,
            FillValue::from(0u8),
        );
        assert!(matches!(
            ZarrStore::open(&root),
            Err(StoreError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_rank() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("flat.zarr");
        build_array(
            &root,
            vec![4, 4],
            vec![4, 4],
            DataType::UInt8,
            FillValue::from(0u8),
        );
        assert!(matches!(
            ZarrStore::open(&root),
            Err(StoreError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_rejects_float_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("float.zarr");
        build_array(
            &root,
            vec![1, 1, 1, 1, 4, 4],
            vec![1, 1, 1, 1, 4, 4],
            DataType::Float32,
            FillValue::from(0.0f32),
        );
        assert!(matches!(
            ZarrStore::open(&root),
            Err(StoreError::UnsupportedDType(_))
        ));
    }
}
