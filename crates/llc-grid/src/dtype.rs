//! Sample encodings of LLC binary files.

use serde::{Deserialize, Serialize};

/// Byte order of the stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Width of one stored sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleWidth {
    F32,
    F64,
}

/// Element type of an LLC file: a float width plus a byte order.
///
/// MITgcm writes big-endian `f32` by default (numpy's `>f4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType {
    pub width: SampleWidth,
    pub order: ByteOrder,
}

impl Default for ElementType {
    fn default() -> Self {
        Self::BIG_F32
    }
}

impl ElementType {
    pub const BIG_F32: Self = Self {
        width: SampleWidth::F32,
        order: ByteOrder::Big,
    };
    pub const LITTLE_F32: Self = Self {
        width: SampleWidth::F32,
        order: ByteOrder::Little,
    };
    pub const BIG_F64: Self = Self {
        width: SampleWidth::F64,
        order: ByteOrder::Big,
    };
    pub const LITTLE_F64: Self = Self {
        width: SampleWidth::F64,
        order: ByteOrder::Little,
    };

    /// Parse a numpy-style type string (`>f4`, `<f4`, `>f8`, `<f8`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            ">f4" | "float32be" | "f32be" => Some(Self::BIG_F32),
            "<f4" | "float32le" | "f32le" => Some(Self::LITTLE_F32),
            ">f8" | "float64be" | "f64be" => Some(Self::BIG_F64),
            "<f8" | "float64le" | "f64le" => Some(Self::LITTLE_F64),
            _ => None,
        }
    }

    /// Size of one sample in bytes.
    pub fn size(&self) -> usize {
        match self.width {
            SampleWidth::F32 => 4,
            SampleWidth::F64 => 8,
        }
    }

    /// Decode the sample with element index `index` from `bytes`.
    ///
    /// Returns `None` when the sample does not fit in the buffer.
    pub fn decode(&self, bytes: &[u8], index: usize) -> Option<f64> {
        let size = self.size();
        let start = index.checked_mul(size)?;
        let raw = bytes.get(start..start + size)?;
        let value = match (self.width, self.order) {
            (SampleWidth::F32, ByteOrder::Big) => f32::from_be_bytes(raw.try_into().ok()?) as f64,
            (SampleWidth::F32, ByteOrder::Little) => {
                f32::from_le_bytes(raw.try_into().ok()?) as f64
            }
            (SampleWidth::F64, ByteOrder::Big) => f64::from_be_bytes(raw.try_into().ok()?),
            (SampleWidth::F64, ByteOrder::Little) => f64::from_le_bytes(raw.try_into().ok()?),
        };
        Some(value)
    }

    /// The numpy-style type string.
    pub fn as_str(&self) -> &'static str {
        match (self.width, self.order) {
            (SampleWidth::F32, ByteOrder::Big) => ">f4",
            (SampleWidth::F32, ByteOrder::Little) => "<f4",
            (SampleWidth::F64, ByteOrder::Big) => ">f8",
            (SampleWidth::F64, ByteOrder::Little) => "<f8",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
