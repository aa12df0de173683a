//! Header module for the plinkbed library
//!
//! A BED file opens with a fixed 3-byte header: a 2-byte magic number followed by
//! a single byte declaring which matrix axis is stored as the file's rows.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{HeaderError, Result};

/// Magic number of PLINK 1 BED files (stored little-endian as `0x6c 0x1b`)
#[allow(clippy::unreadable_literal)]
pub const MAGIC: u16 = 0x1b6c;

/// Size of the header in bytes
pub const SIZE_HEADER: usize = 3;

/// Which matrix axis varies slowest in the file body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageMode {
    /// Each file row holds one sample across all variants
    SampleMajor,
    /// Each file row holds one variant across all samples
    #[default]
    VariantMajor,
}
impl StorageMode {
    /// Parses the storage mode byte
    ///
    /// # Errors
    ///
    /// Returns an error for any value other than `0x00` or `0x01`. Other values are used
    /// by the PLINK 2 family and are not decodable here.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::SampleMajor),
            1 => Ok(Self::VariantMajor),
            x => Err(HeaderError::UnsupportedStorageMode(x).into()),
        }
    }

    /// Returns the byte written at offset 2 of the header
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::SampleMajor => 0,
            Self::VariantMajor => 1,
        }
    }
}

/// Header structure for BED files
///
/// Created once when a file is written and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BedHeader {
    /// Magic number to identify the file format
    ///
    /// 2 bytes
    pub magic: u16,

    /// Storage layout of the body
    ///
    /// 1 byte
    pub mode: StorageMode,
}
impl BedHeader {
    /// Creates a new header declaring the given storage mode
    ///
    /// # Arguments
    ///
    /// * `mode` - Which matrix axis the file body stores as rows
    #[must_use]
    pub fn new(mode: StorageMode) -> Self {
        Self { magic: MAGIC, mode }
    }

    /// Parses a header from a fixed-size byte array
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic number is incorrect
    /// * The storage mode byte is unsupported
    pub fn from_bytes(buffer: &[u8; SIZE_HEADER]) -> Result<Self> {
        let magic = LittleEndian::read_u16(&buffer[0..2]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagicNumber(magic).into());
        }
        let mode = StorageMode::from_byte(buffer[2])?;
        Ok(Self { magic, mode })
    }

    /// Parses a header from the start of an arbitrarily sized buffer
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is smaller than `SIZE_HEADER` or the header
    /// data is invalid (see `from_bytes`).
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < SIZE_HEADER {
            return Err(HeaderError::InvalidSize(buffer.len(), SIZE_HEADER).into());
        }
        let mut bytes = [0u8; SIZE_HEADER];
        bytes.copy_from_slice(&buffer[..SIZE_HEADER]);
        Self::from_bytes(&bytes)
    }

    /// Writes the header to a writer
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_HEADER];
        LittleEndian::write_u16(&mut buffer[0..2], self.magic);
        buffer[2] = self.mode.as_byte();
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Reads a header from a reader
    ///
    /// On success the reader is left positioned at the start of the body (byte 3).
    ///
    /// # Errors
    ///
    /// A reader that ends before 3 bytes is a format error, not an I/O error.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_HEADER];
        let mut filled = 0;
        while filled < SIZE_HEADER {
            match reader.read(&mut buffer[filled..]) {
                Ok(0) => return Err(HeaderError::InvalidSize(filled, SIZE_HEADER).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Self::from_bytes(&buffer)
    }

    /// Opens the file at `path` and reads its header
    ///
    /// # Arguments
    ///
    /// * `path` - Path of an existing BED file
    ///
    /// # Returns
    ///
    /// * `Ok(BedHeader)` - The validated header
    /// * `Err(Error)` - If the file cannot be opened or its header is invalid
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        Self::from_reader(&mut file)
    }
}
