use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zarrs::array::{DataType, FillValue};

/// Pixel element type of a frame or a stored array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Uint8,
    Uint16,
}

impl DType {
    pub const ALL: &[DType] = &[DType::Uint8, DType::Uint16];

    pub fn zarr_data_type(self) -> DataType {
        match self {
            DType::Uint8 => DataType::UInt8,
            DType::Uint16 => DataType::UInt16,
        }
    }

    /// Zero of the matching element type; chunks never written read as this.
    pub fn zarr_fill_value(self) -> FillValue {
        match self {
            DType::Uint8 => FillValue::from(0u8),
            DType::Uint16 => FillValue::from(0u16),
        }
    }

    pub fn from_zarr_data_type(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::UInt8 => Some(DType::Uint8),
            DataType::UInt16 => Some(DType::Uint16),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Uint8 => write!(f, "uint8"),
            DType::Uint16 => write!(f, "uint16"),
        }
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uint8" | "u8" => Ok(DType::Uint8),
            "uint16" | "u16" => Ok(DType::Uint16),
            other => Err(format!("unsupported dtype '{other}' (expected uint8 or uint16)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DType::Uint8, DataType::UInt8)]
    #[case(DType::Uint16, DataType::UInt16)]
    fn test_zarr_data_type_mapping(#[case] dtype: DType, #[case] data_type: DataType) {
        assert_eq!(dtype.zarr_data_type(), data_type);
        assert_eq!(DType::from_zarr_data_type(&data_type), Some(dtype));
    }

    #[test]
    fn test_other_zarr_types_are_not_recognized() {
        assert_eq!(DType::from_zarr_data_type(&DataType::Float32), None);
        assert_eq!(DType::from_zarr_data_type(&DataType::UInt32), None);
    }

    #[test]
    fn test_parse_from_cli_strings() {
        assert_eq!("uint16".parse::<DType>().unwrap(), DType::Uint16);
        assert_eq!("U8".parse::<DType>().unwrap(), DType::Uint8);
        assert!("float32".parse::<DType>().is_err());
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for dtype in DType::ALL {
            assert_eq!(dtype.to_string().parse::<DType>().unwrap(), *dtype);
        }
    }
}
