//! Cursor-based byte stream parser for class file decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a
//! bounds-checked cursor over a byte slice. It offers typed big-endian reads
//! (the class file format is big-endian throughout), raw slice reads for
//! length-prefixed payloads, and position tracking for sequential parsing.
//!
//! # Usage Examples
//!
//! ```rust
//! use classpatch::Parser;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! let magic = parser.read_be::<u32>()?;
//! assert_eq!(magic, 0xCAFE_BABE);
//! assert_eq!(parser.pos(), 4);
//! # Ok::<(), classpatch::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ByteIO},
    Result,
};

/// A bounds-checked cursor for reading class file structures.
///
/// `Parser` maintains a position within a byte slice and validates data
/// availability before every read, so malformed or truncated input surfaces
/// as [`crate::Error::Truncated`] instead of a panic or overrun.
///
/// # Examples
///
/// ```rust
/// use classpatch::Parser;
///
/// let data = [0x00, 0x05, b'h', b'e', b'l', b'l', b'o'];
/// let mut parser = Parser::new(&data);
///
/// let len = parser.read_be::<u16>()? as usize;
/// let payload = parser.read_bytes(len)?;
/// assert_eq!(payload, b"hello");
/// # Ok::<(), classpatch::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the current position of the cursor.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to one-past-the-end is allowed so that a structure ending
    /// flush with the buffer can be consumed completely.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if the position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(crate::Error::Truncated);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if the advance would pass the end of the data.
    pub fn advance_by(&mut self, bytes: usize) -> Result<()> {
        let Some(target) = self.position.checked_add(bytes) else {
            return Err(crate::Error::Truncated);
        };
        self.seek(target)
    }

    /// Read a value of type `T` in big-endian byte order, advancing the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if there are insufficient bytes.
    pub fn read_be<T: ByteIO>(&mut self) -> Result<T> {
        read_be_at(self.data, &mut self.position)
    }

    /// Peek at the byte under the cursor without advancing.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        match self.data.get(self.position) {
            Some(byte) => Ok(*byte),
            None => Err(crate::Error::Truncated),
        }
    }

    /// Read `count` raw bytes, advancing the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let Some(end) = self.position.checked_add(count) else {
            return Err(crate::Error::Truncated);
        };
        if end > self.data.len() {
            return Err(crate::Error::Truncated);
        }

        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Access the remaining data from the current position onward.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        &self.data[self.position..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn sequential_reads() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_be::<u32>().unwrap(), 0xCAFE_BABE);
        assert_eq!(parser.read_be::<u16>().unwrap(), 0x34);
        assert!(!parser.has_more_data());
    }

    #[test]
    fn seek_and_peek() {
        let data = [0x01, 0x02, 0x03];
        let mut parser = Parser::new(&data);

        parser.seek(2).unwrap();
        assert_eq!(parser.peek_byte().unwrap(), 0x03);
        assert_eq!(parser.pos(), 2);

        // One-past-the-end is a valid resting position, reading from it is not.
        parser.seek(3).unwrap();
        assert!(matches!(parser.peek_byte(), Err(Error::Truncated)));
        assert!(matches!(parser.seek(4), Err(Error::Truncated)));
    }

    #[test]
    fn read_bytes_bounds() {
        let data = [0x01, 0x02, 0x03];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert!(matches!(parser.read_bytes(2), Err(Error::Truncated)));
        assert_eq!(parser.read_bytes(1).unwrap(), &[0x03]);
    }

    #[test]
    fn advance_by_overflow() {
        let data = [0x01];
        let mut parser = Parser::new(&data);
        assert!(matches!(parser.advance_by(usize::MAX), Err(Error::Truncated)));
    }
}
