//! Persist multi-dimensional microscope acquisitions to disk.
//!
//! Writers subscribe to an [`AcquisitionEvents`](acquisition::infrastructure::event_hub::AcquisitionEvents)
//! hub and place every frame at a location derived from its `(t, p, c, z)`
//! indices: a chunk of a Zarr array, or one TIFF file per frame.

pub mod acquisition {
    pub mod domain {
        pub mod frame_source;
        pub mod listener;
        pub mod mda_event;
        pub mod sequence;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod constants;
    pub mod dtype;
    pub mod frame;
}

pub mod storage {
    pub mod domain {
        pub mod target_resolver;
        pub mod writer_error;
        pub mod writer_state;
    }
    pub mod infrastructure;
}
