//! Low-level byte order and safe reading/writing utilities for class file parsing.
//!
//! This module provides bounds-checked binary data reading and writing for the
//! class file format. Class files are big-endian throughout, so the big-endian
//! functions are the workhorses here; little-endian counterparts exist for the
//! odd auxiliary structure and for symmetry in tests.
//!
//! # Key Components
//!
//! ## Core Trait
//! - [`crate::file::io::ByteIO`] - Trait defining endian-aware conversions for primitive types
//!
//! ## Reading Functions
//! - [`crate::file::io::read_be`] - Read values from buffer start in big-endian format
//! - [`crate::file::io::read_be_at`] - Read values at a specific offset with auto-advance
//! - [`crate::file::io::read_le_at`] - Little-endian variant
//!
//! ## Writing Functions
//! - [`crate::file::io::write_be_at`] - Write values at a specific offset with auto-advance
//!
//! # Error Handling
//!
//! All functions return [`crate::Result<T>`] and report [`crate::Error::Truncated`]
//! if there are insufficient bytes in the buffer to complete the operation.

use crate::{Error::Truncated, Result};

/// Trait for implementing type-specific safe binary data conversions.
///
/// Provides a unified interface for reading and writing primitive types from
/// byte slices in an endian-aware manner. Implemented for the integer types
/// the class file format actually uses.
pub trait ByteIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_byte_io {
    ($($t:ty => $len:expr),+ $(,)?) => {
        $(
            impl ByteIO for $t {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$t>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$t>::to_be_bytes(self)
                }
            }
        )+
    };
}

impl_byte_io! {
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
}

/// Safely reads a value of type `T` in big-endian byte order from a data buffer.
///
/// Reads from the beginning of the buffer; supports all [`ByteIO`] types.
///
/// # Arguments
/// * `data` - The byte buffer to read from
///
/// # Errors
/// Returns [`crate::Error::Truncated`] if there are insufficient bytes.
pub fn read_be<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a value of type `T` in big-endian byte order at a specific offset.
///
/// Reads from the specified offset and automatically advances the offset by
/// the number of bytes read.
///
/// # Arguments
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (advanced after reading)
///
/// # Errors
/// Returns [`crate::Error::Truncated`] if there are insufficient bytes.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(Truncated);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(Truncated);
    };

    *offset += type_len;

    Ok(T::from_be_bytes(read))
}

/// Safely reads a value of type `T` in little-endian byte order at a specific offset.
///
/// The class file format itself is big-endian; this exists for auxiliary data
/// and symmetry.
///
/// # Errors
/// Returns [`crate::Error::Truncated`] if there are insufficient bytes.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(Truncated);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(Truncated);
    };

    *offset += type_len;

    Ok(T::from_le_bytes(read))
}

/// Safely writes a value of type `T` in big-endian byte order at a specific offset.
///
/// Writes at the specified offset and automatically advances the offset by the
/// number of bytes written.
///
/// # Arguments
/// * `data` - The mutable byte buffer to write to
/// * `offset` - Mutable reference to the offset position (advanced after writing)
/// * `value` - The value to write
///
/// # Errors
/// Returns [`crate::Error::Truncated`] if there are insufficient bytes.
pub fn write_be_at<T: ByteIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()>
where
    T::Bytes: AsRef<[u8]>,
{
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(Truncated);
    }

    data[*offset..*offset + type_len].copy_from_slice(value.to_be_bytes().as_ref());
    *offset += type_len;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_be_u8() {
        let result = read_be::<u8>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x1);
    }

    #[test]
    fn read_be_u16() {
        let result = read_be::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x102);
    }

    #[test]
    fn read_be_u32() {
        let result = read_be::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x1020304);
    }

    #[test]
    fn read_be_u64() {
        let result = read_be::<u64>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x102030405060708);
    }

    #[test]
    fn read_be_i32() {
        let result = read_be::<i32>(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(result, -1);
    }

    #[test]
    fn read_be_from() {
        let mut offset = 2_usize;
        let result = read_be_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(result, 0x304);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_le_from() {
        let mut offset = 2_usize;
        let result = read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(result, 0x403);
    }

    #[test]
    fn read_errors() {
        let buffer = [0xFF, 0xFF, 0xFF, 0xFF];

        let result = read_be::<u64>(&buffer);
        assert!(matches!(result, Err(Truncated)));

        let mut offset = 3_usize;
        let result = read_be_at::<u16>(&buffer, &mut offset);
        assert!(matches!(result, Err(Truncated)));
    }

    #[test]
    fn write_be_sequential() {
        let mut buffer = [0u8; 8];
        let mut offset = 0;

        write_be_at(&mut buffer, &mut offset, 0x1234u16).unwrap();
        assert_eq!(offset, 2);

        write_be_at(&mut buffer, &mut offset, 0x5678u16).unwrap();
        assert_eq!(offset, 4);

        write_be_at(&mut buffer, &mut offset, 0xABCDu32).unwrap();
        assert_eq!(offset, 8);

        assert_eq!(buffer, [0x12, 0x34, 0x56, 0x78, 0x00, 0x00, 0xAB, 0xCD]);
    }

    #[test]
    fn write_errors() {
        let mut buffer = [0u8; 2];
        let mut offset = 0;

        let result = write_be_at(&mut buffer, &mut offset, 0x12345678u32);
        assert!(matches!(result, Err(Truncated)));
    }

    #[test]
    fn round_trip_consistency() {
        const VALUE_U32: u32 = 0x12345678;
        const VALUE_I32: i32 = -12345;

        let mut buffer = [0u8; 4];
        let mut offset = 0;
        write_be_at(&mut buffer, &mut offset, VALUE_U32).unwrap();
        let read_value: u32 = read_be(&buffer).unwrap();
        assert_eq!(read_value, VALUE_U32);

        offset = 0;
        write_be_at(&mut buffer, &mut offset, VALUE_I32).unwrap();
        let read_value: i32 = read_be(&buffer).unwrap();
        assert_eq!(read_value, VALUE_I32);
    }
}
