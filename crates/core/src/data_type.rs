//! Primitive element types
//!
//! The set of element types an array can hold is closed: [`DataType`] is
//! the runtime tag, [`Element`] is the compile-time view of the same set.
//! [`dispatch_data_type!`](crate::dispatch_data_type) bridges the two by
//! expanding a generic body once per type.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;

use crate::error::StructuraError;

/// Runtime tag for an array's element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `i8`
    Int8,
    /// `u8`
    UInt8,
    /// `i16`
    Int16,
    /// `u16`
    UInt16,
    /// `i32`
    Int32,
    /// `u32`
    UInt32,
    /// `i64`
    Int64,
    /// `u64`
    UInt64,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// `bool`
    Boolean,
}

impl DataType {
    /// Every supported type, in declaration order
    pub const ALL: [DataType; 11] = [
        DataType::Int8,
        DataType::UInt8,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
        DataType::Float32,
        DataType::Float64,
        DataType::Boolean,
    ];

    /// Lowercase name, also the serialized form
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::UInt8 => "uint8",
            DataType::Int16 => "int16",
            DataType::UInt16 => "uint16",
            DataType::Int32 => "int32",
            DataType::UInt32 => "uint32",
            DataType::Int64 => "int64",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Boolean => "boolean",
        }
    }

    /// Bytes per element
    pub fn size_of(&self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 | DataType::Boolean => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }

    /// True for `Float32` and `Float64`
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// True for the signed and unsigned integer types
    pub fn is_integer(&self) -> bool {
        !self.is_float() && *self != DataType::Boolean
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = StructuraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                StructuraError::invalid_parameter("data_type", format!("unknown data type '{}'", s))
            })
    }
}

/// Compile-time counterpart of [`DataType`]
///
/// Numeric conversions go through `f64` with `as` semantics (saturating for
/// float → integer, truncating toward zero).
pub trait Element:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    /// Runtime tag of this type
    const DATA_TYPE: DataType;

    /// Widen to `f64`
    fn to_f64(self) -> f64;

    /// Narrow from `f64`
    fn from_f64(value: f64) -> Self;

    /// Write one element in little-endian order
    fn write_le<W: io::Write>(self, out: &mut W) -> io::Result<()>;

    /// Read one element in little-endian order
    fn read_le<R: io::Read>(input: &mut R) -> io::Result<Self>;
}

macro_rules! impl_element {
    ($t:ty, $tag:ident, $write:ident, $read:ident) => {
        impl Element for $t {
            const DATA_TYPE: DataType = DataType::$tag;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn write_le<W: io::Write>(self, out: &mut W) -> io::Result<()> {
                out.$write::<LittleEndian>(self)
            }

            fn read_le<R: io::Read>(input: &mut R) -> io::Result<Self> {
                input.$read::<LittleEndian>()
            }
        }
    };
}

impl_element!(i16, Int16, write_i16, read_i16);
impl_element!(u16, UInt16, write_u16, read_u16);
impl_element!(i32, Int32, write_i32, read_i32);
impl_element!(u32, UInt32, write_u32, read_u32);
impl_element!(i64, Int64, write_i64, read_i64);
impl_element!(u64, UInt64, write_u64, read_u64);
impl_element!(f32, Float32, write_f32, read_f32);
impl_element!(f64, Float64, write_f64, read_f64);

impl Element for i8 {
    const DATA_TYPE: DataType = DataType::Int8;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as i8
    }

    fn write_le<W: io::Write>(self, out: &mut W) -> io::Result<()> {
        out.write_i8(self)
    }

    fn read_le<R: io::Read>(input: &mut R) -> io::Result<Self> {
        input.read_i8()
    }
}

impl Element for u8 {
    const DATA_TYPE: DataType = DataType::UInt8;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as u8
    }

    fn write_le<W: io::Write>(self, out: &mut W) -> io::Result<()> {
        out.write_u8(self)
    }

    fn read_le<R: io::Read>(input: &mut R) -> io::Result<Self> {
        input.read_u8()
    }
}

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    #[inline]
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }

    fn write_le<W: io::Write>(self, out: &mut W) -> io::Result<()> {
        out.write_u8(u8::from(self))
    }

    fn read_le<R: io::Read>(input: &mut R) -> io::Result<Self> {
        Ok(input.read_u8()? != 0)
    }
}

/// Expand `$body` once per [`DataType`] with `$T` bound to the element type
///
/// ```
/// use structura_core::{dispatch_data_type, DataType, Element};
///
/// fn width<T: Element>() -> usize {
///     std::mem::size_of::<T>()
/// }
///
/// let bytes = dispatch_data_type!(DataType::Float64, T => width::<T>());
/// assert_eq!(bytes, 8);
/// ```
#[macro_export]
macro_rules! dispatch_data_type {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::DataType::Int8 => {
                type $T = i8;
                $body
            }
            $crate::DataType::UInt8 => {
                type $T = u8;
                $body
            }
            $crate::DataType::Int16 => {
                type $T = i16;
                $body
            }
            $crate::DataType::UInt16 => {
                type $T = u16;
                $body
            }
            $crate::DataType::Int32 => {
                type $T = i32;
                $body
            }
            $crate::DataType::UInt32 => {
                type $T = u32;
                $body
            }
            $crate::DataType::Int64 => {
                type $T = i64;
                $body
            }
            $crate::DataType::UInt64 => {
                type $T = u64;
                $body
            }
            $crate::DataType::Float32 => {
                type $T = f32;
                $body
            }
            $crate::DataType::Float64 => {
                type $T = f64;
                $body
            }
            $crate::DataType::Boolean => {
                type $T = bool;
                $body
            }
        }
    };
}
