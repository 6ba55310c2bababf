use std::fmt;

/// Position of one frame within a multi-dimensional acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameIndex {
    pub t: usize,
    pub p: usize,
    pub c: usize,
    pub z: usize,
}

impl FrameIndex {
    pub fn new(t: usize, p: usize, c: usize, z: usize) -> Self {
        Self { t, p, c, z }
    }

    /// Indices in array axis order `(t, p, c, z)`.
    pub fn as_array(&self) -> [usize; 4] {
        [self.t, self.p, self.c, self.z]
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(t={}, p={}, c={}, z={})", self.t, self.p, self.c, self.z)
    }
}

/// One planned acquisition step, delivered alongside the frame it produced.
#[derive(Clone, Debug, PartialEq)]
pub struct MdaEvent {
    pub index: FrameIndex,
    pub channel: Option<String>,
    pub exposure_ms: Option<f64>,
    /// Focus offset relative to the position's reference z, in microns.
    pub z_offset: Option<f64>,
}

impl MdaEvent {
    pub fn new(index: FrameIndex) -> Self {
        Self {
            index,
            channel: None,
            exposure_ms: None,
            z_offset: None,
        }
    }
}
