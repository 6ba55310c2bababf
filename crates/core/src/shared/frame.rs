use ndarray::{Array2, ArrayView2};

use crate::shared::dtype::DType;

/// Grayscale pixel buffer in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl PixelData {
    pub fn dtype(&self) -> DType {
        match self {
            PixelData::U8(_) => DType::Uint8,
            PixelData::U16(_) => DType::Uint16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_all_zero(&self) -> bool {
        match self {
            PixelData::U8(v) => v.iter().all(|&p| p == 0),
            PixelData::U16(v) => v.iter().all(|&p| p == 0),
        }
    }
}

/// A single 2D camera frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pixels: PixelData,
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(pixels: PixelData, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width as usize) * (height as usize),
            "pixel count must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn from_u8_array(array: &Array2<u8>) -> Self {
        let (height, width) = array.dim();
        let data = array.iter().copied().collect();
        Self::new(PixelData::U8(data), width as u32, height as u32)
    }

    pub fn from_u16_array(array: &Array2<u16>) -> Self {
        let (height, width) = array.dim();
        let data = array.iter().copied().collect();
        Self::new(PixelData::U16(data), width as u32, height as u32)
    }

    pub fn pixels(&self) -> &PixelData {
        &self.pixels
    }

    pub fn dtype(&self) -> DType {
        self.pixels.dtype()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width)`, the row-major array shape.
    pub fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    pub fn as_u8_ndarray(&self) -> Option<ArrayView2<'_, u8>> {
        match &self.pixels {
            PixelData::U8(v) => ArrayView2::from_shape(self.shape(), v).ok(),
            PixelData::U16(_) => None,
        }
    }

    pub fn as_u16_ndarray(&self) -> Option<ArrayView2<'_, u16>> {
        match &self.pixels {
            PixelData::U16(v) => ArrayView2::from_shape(self.shape(), v).ok(),
            PixelData::U8(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let frame = Frame::new(PixelData::U16(vec![7; 6]), 3, 2);
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.shape(), (2, 3));
        assert_eq!(frame.dtype(), DType::Uint16);
    }

    #[test]
    #[should_panic(expected = "pixel count must equal width * height")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(PixelData::U8(vec![0; 5]), 2, 2);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2 rows x 3 cols; pixel (row=1, col=2) is the last element
        let frame = Frame::new(PixelData::U16(vec![0, 0, 0, 0, 0, 900]), 3, 2);
        let arr = frame.as_u16_ndarray().unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr[[1, 2]], 900);
        assert!(frame.as_u8_ndarray().is_none());
    }

    #[test]
    fn test_from_array_preserves_row_major_order() {
        let arr = Array2::from_shape_fn((2, 2), |(r, c)| (r * 10 + c) as u8);
        let frame = Frame::from_u8_array(&arr);
        assert_eq!(frame.pixels(), &PixelData::U8(vec![0, 1, 10, 11]));
        assert_eq!(frame.as_u8_ndarray().unwrap(), arr.view());
    }

    #[test]
    fn test_is_all_zero() {
        assert!(PixelData::U16(vec![0; 4]).is_all_zero());
        assert!(!PixelData::U8(vec![0, 1]).is_all_zero());
    }
}
