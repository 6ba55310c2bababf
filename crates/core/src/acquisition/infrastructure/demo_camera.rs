use ndarray::Array2;

use crate::acquisition::domain::frame_source::FrameSource;
use crate::acquisition::domain::mda_event::MdaEvent;
use crate::shared::dtype::DType;
use crate::shared::frame::Frame;

/// Synthetic camera producing deterministic, never-zero gradient frames.
///
/// Each event gets a different offset so frames from distinct coordinates
/// differ, which lets tests detect misplaced writes.
pub struct DemoCamera {
    width: u32,
    height: u32,
    dtype: DType,
}

impl DemoCamera {
    pub fn new(width: u32, height: u32, dtype: DType) -> Self {
        Self {
            width,
            height,
            dtype,
        }
    }

    /// Pixel value at `(row, col)` for the given event.
    pub fn pixel_value(&self, event: &MdaEvent, row: usize, col: usize) -> u32 {
        let idx = event.index;
        let seed = idx.t * 1000 + idx.p * 100 + idx.c * 10 + idx.z;
        let modulus = match self.dtype {
            DType::Uint8 => 255,
            DType::Uint16 => 4095,
        };
        ((row + col + seed * 7) % modulus) as u32 + 1
    }

    pub fn frame_for(&self, event: &MdaEvent) -> Frame {
        let shape = (self.height as usize, self.width as usize);
        match self.dtype {
            DType::Uint8 => Frame::from_u8_array(&Array2::from_shape_fn(shape, |(r, c)| {
                self.pixel_value(event, r, c) as u8
            })),
            DType::Uint16 => Frame::from_u16_array(&Array2::from_shape_fn(shape, |(r, c)| {
                self.pixel_value(event, r, c) as u16
            })),
        }
    }
}

impl FrameSource for DemoCamera {
    fn snap(&mut self, event: &MdaEvent) -> Result<Frame, Box<dyn std::error::Error>> {
        Ok(self.frame_for(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::domain::mda_event::FrameIndex;

    #[test]
    fn test_frames_have_requested_shape_and_dtype() {
        let mut cam = DemoCamera::new(8, 4, DType::Uint16);
        let frame = cam.snap(&MdaEvent::new(FrameIndex::new(0, 0, 0, 0))).unwrap();
        assert_eq!(frame.shape(), (4, 8));
        assert_eq!(frame.dtype(), DType::Uint16);
    }

    #[test]
    fn test_frames_are_never_zero() {
        let cam = DemoCamera::new(300, 2, DType::Uint8);
        let frame = cam.frame_for(&MdaEvent::new(FrameIndex::new(3, 0, 1, 2)));
        let arr = frame.as_u8_ndarray().unwrap();
        assert!(arr.iter().all(|&p| p > 0));
    }

    #[test]
    fn test_distinct_events_give_distinct_frames() {
        let cam = DemoCamera::new(4, 4, DType::Uint16);
        let a = cam.frame_for(&MdaEvent::new(FrameIndex::new(0, 0, 0, 0)));
        let b = cam.frame_for(&MdaEvent::new(FrameIndex::new(0, 0, 0, 1)));
        assert_ne!(a, b);
    }
}
