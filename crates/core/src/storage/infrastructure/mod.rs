pub mod tiff_writer;
pub mod zarr_store;
pub mod zarr_writer;
