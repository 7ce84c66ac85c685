//! Forward-only decoding cursor over an immutable byte buffer.
//!
//! [`Reader`] pairs a byte slice with a position and the buffer's declared [`ByteOrder`]. Each
//! decode consumes exactly the bytes of the requested value and moves the position forward;
//! there is no backwards seek. Every operation is bounds-checked: when the buffer cannot satisfy
//! a request the reader returns [`crate::Error::TruncatedInput`] and stays where it was.
//!
//! # Examples
//!
//! ```rust
//! use optcore::{ByteOrder, Reader};
//!
//! let data = [0x02, 0x00, 0x00, 0x00, 0x00, 0x10];
//! let mut reader = Reader::new(&data);
//!
//! let count: u32 = reader.read_next()?;
//! assert_eq!(count, 2);
//! assert_eq!(reader.read_be::<u16>()?, 0x10);
//! assert!(!reader.has_more_data());
//!
//! let mut big = Reader::with_order(&data[4..], ByteOrder::Big);
//! assert_eq!(big.read_next::<u16>()?, 0x0010);
//! # Ok::<(), optcore::Error>(())
//! ```

use crate::{
    file::io::{read_at, ByteIO, ByteOrder},
    Error, Result,
};

/// Longest 7-bit encoded `u32` in bytes.
const MAX_7BIT_U32_LEN: usize = 5;

/// Cursor-based binary reader.
///
/// The reader never owns its data; create one per decoding call and drop it afterwards.
#[derive(Debug)]
pub struct Reader<'a> {
    /// The binary data being decoded
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
    /// Declared byte order of multi-byte values
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    /// Creates a little-endian reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_order(data, ByteOrder::Little)
    }

    /// Creates a reader with an explicit byte order.
    #[must_use]
    pub fn with_order(data: &'a [u8], order: ByteOrder) -> Self {
        Reader {
            data,
            position: 0,
            order,
        }
    }

    /// Returns the declared byte order.
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns `true` while unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the entire underlying buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Checks that at least `needed` bytes remain.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] otherwise.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(Error::TruncatedInput { needed, available });
        }
        Ok(())
    }

    /// Moves forward by `step` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] if that would pass the end of the buffer.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.ensure_remaining(step)?;
        self.position += step;
        Ok(())
    }

    /// Moves forward to the next multiple of `alignment`.
    ///
    /// An alignment of `0` or `1` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] if the padding would pass the end of the buffer.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }

        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Returns the byte at the current position without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] at the end of the buffer.
    pub fn peek_byte(&self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.data[self.position])
    }

    /// Decodes a `T` in the reader's declared byte order and advances past it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] if fewer than `size_of::<T>()` bytes remain.
    /// The position is unchanged in that case.
    pub fn read_next<T: ByteIO>(&mut self) -> Result<T> {
        read_at(self.data, &mut self.position, self.order)
    }

    /// Decodes a little-endian `T` regardless of the declared order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] if there are insufficient bytes.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_at(self.data, &mut self.position, ByteOrder::Little)
    }

    /// Decodes a big-endian `T` regardless of the declared order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] if there are insufficient bytes.
    pub fn read_be<T: ByteIO>(&mut self) -> Result<T> {
        read_at(self.data, &mut self.position, ByteOrder::Big)
    }

    /// Returns the next `length` bytes and advances past them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedInput`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(length)?;
        let slice = &self.data[self.position..self.position + length];
        self.position += length;
        Ok(slice)
    }

    /// Reads an unsigned LEB128 ("7-bit encoded") integer of at most 32 bits.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::TruncatedInput`] if the buffer ends inside the encoding
    /// - [`crate::Error::Malformed`] if the encoding is longer than 5 bytes or overflows `u32`
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut cursor = self.position;

        for index in 0..MAX_7BIT_U32_LEN {
            let Some(&byte) = self.data.get(cursor) else {
                return Err(Error::TruncatedInput {
                    needed: cursor - self.position + 1,
                    available: self.remaining(),
                });
            };
            cursor += 1;

            let payload = u32::from(byte & 0x7F);
            let shift = 7 * index as u32;
            // The fifth byte may only contribute the top 4 bits
            if index == MAX_7BIT_U32_LEN - 1 && payload > 0x0F {
                return Err(malformed_error!(
                    "7-bit encoded integer at offset {} overflows u32",
                    self.position
                ));
            }
            value |= payload << shift;

            if (byte & 0x80) == 0 {
                self.position = cursor;
                return Ok(value);
            }
        }

        Err(malformed_error!(
            "7-bit encoded integer at offset {} is longer than {} bytes",
            self.position,
            MAX_7BIT_U32_LEN
        ))
    }

    /// Reads a NUL-terminated UTF-8 string and advances past the terminator.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::TruncatedInput`] if no terminator is found
    /// - [`crate::Error::Malformed`] for invalid UTF-8
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let Some(length) = self.data[start..].iter().position(|&b| b == 0) else {
            return Err(Error::TruncatedInput {
                needed: self.remaining() + 1,
                available: self.remaining(),
            });
        };

        let text = Self::decode_utf8(&self.data[start..start + length], start)?;
        self.position = start + length + 1;
        Ok(text)
    }

    /// Reads a UTF-8 string prefixed with its 7-bit encoded byte length.
    ///
    /// The position is only advanced when the whole string could be decoded.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::TruncatedInput`] if the prefix or the payload is cut short
    /// - [`crate::Error::Malformed`] for a bad prefix or invalid UTF-8
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        self.transactional(|reader| {
            let length = reader.read_7bit_encoded_int()? as usize;
            let start = reader.position;
            let bytes = reader.read_bytes(length)?;
            Self::decode_utf8(bytes, start)
        })
    }

    /// Runs a composite decode, restoring the position if it fails.
    ///
    /// Use this when a structure spans several reads and a failure halfway must not leave the
    /// cursor inside the structure.
    ///
    /// # Errors
    ///
    /// Returns whatever error `f` returns.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved;
        }
        result
    }

    fn decode_utf8(bytes: &[u8], offset: usize) -> Result<String> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| malformed_error!("Invalid UTF-8 string at offset {}: {}", offset, e))
    }
}
