pub const ZARR_EXTENSION: &str = "zarr";
pub const TIFF_EXTENSION: &str = "tiff";

/// Dimension names of the stored array.
pub const ARRAY_DIMENSIONS: [&str; 6] = ["t", "p", "c", "z", "y", "x"];

/// Array attribute listing the channel names in acquisition order.
pub const CHANNELS_ATTRIBUTE: &str = "channels";

/// Zero-padding width of each index in per-frame file names.
pub const INDEX_WIDTH: usize = 3;

pub const DEFAULT_FRAME_WIDTH: u32 = 512;
pub const DEFAULT_FRAME_HEIGHT: u32 = 512;

/// Upper bound on focus planes derived from a z plan.
pub const MAX_Z_PLANES: usize = 100_000;
