//! Chunk reader module
//!
//! Decodes arbitrary rectangles of a BED file (in file space) into caller-owned
//! buffers. Only the bytes covering the requested columns of each requested row
//! are fetched: one positioned fetch per row, no shared cursor.
//!
//! Two constructors cover the common transports:
//! 1. Memory mapping ([`ChunkReader::open_mmap`]), which avoids a syscall per row
//! 2. Positioned file reads ([`ChunkReader::open_file`])
//!
//! Any other [`BedSource`] (for example an in-memory `Vec<u8>`) can be wrapped
//! with [`ChunkReader::new`].

use std::fs::File;
use std::ops::Range;
use std::path::Path;

use log::{debug, trace, warn};
use memmap2::Mmap;

use crate::codec::{unpack_byte, CODES_PER_BYTE};
use crate::dosage::{code_to_dosage, Allele};
use crate::error::{HeaderError, PreconditionError, ReadError, Result};
use crate::header::{BedHeader, StorageMode, SIZE_HEADER};
use crate::source::BedSource;
use crate::strides::Strides;
use crate::utils::{expected_file_size, row_size_bytes};

/// Reads and validates the header at the start of a source
pub(crate) fn read_source_header<S: BedSource>(source: &S) -> Result<BedHeader> {
    let size = source.size()?;
    if size < SIZE_HEADER as u64 {
        return Err(HeaderError::InvalidSize(size as usize, SIZE_HEADER).into());
    }
    let mut scratch = Vec::new();
    let bytes = source.fetch(0, SIZE_HEADER, &mut scratch)?;
    BedHeader::from_buffer(bytes)
}

/// Decoder for rectangles of a BED file addressed in file space
///
/// Rows are the file's major axis and columns its minor axis. The dimensions
/// come from the companion metadata files and are never derived from the BED
/// file itself.
///
/// The reader only needs `&self` to decode, so a single instance (or several
/// instances over clones of the same source) can serve concurrent requests.
pub struct ChunkReader<S: BedSource> {
    /// Byte source covering the whole file
    source: S,

    /// Header read when the reader was created
    header: BedHeader,

    /// Number of file rows (major axis)
    n_rows: usize,

    /// Number of cells per file row (minor axis)
    n_cols: usize,
}

impl<S: BedSource> ChunkReader<S> {
    /// Creates a reader over `source`, validating its header
    ///
    /// # Arguments
    ///
    /// * `source` - Byte source covering the whole file, header included
    /// * `n_rows` - Number of file rows (the major axis)
    /// * `n_cols` - Number of cells per file row (the minor axis)
    ///
    /// # Returns
    ///
    /// * `Ok(ChunkReader)` - A reader ready to decode rectangles
    /// * `Err(Error)` - If either dimension is zero or too large to address, the
    ///   source cannot be queried, or the header is invalid
    pub fn new(source: S, n_rows: usize, n_cols: usize) -> Result<Self> {
        let header = read_source_header(&source)?;
        Self::with_header(source, header, n_rows, n_cols)
    }

    /// Creates a reader from an already validated header
    pub(crate) fn with_header(
        source: S,
        header: BedHeader,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self> {
        if n_rows == 0 || n_cols == 0 {
            return Err(PreconditionError::EmptyDimension { n_rows, n_cols }.into());
        }

        // A size mismatch is only reported here; rows past the end still fail when read.
        let Some(expected) = expected_file_size(n_rows, n_cols) else {
            return Err(PreconditionError::ShapeOverflow { n_rows, n_cols }.into());
        };
        let expected = expected as u64;
        let size = source.size()?;
        if size != expected {
            warn!(
                "BED file holds {size} bytes but {n_rows} x {n_cols} cells require {expected}"
            );
        }

        Ok(Self {
            source,
            header,
            n_rows,
            n_cols,
        })
    }

    /// Header read when the reader was created
    #[must_use]
    pub fn header(&self) -> BedHeader {
        self.header
    }

    /// Storage mode declared by the header
    #[must_use]
    pub fn storage_mode(&self) -> StorageMode {
        self.header.mode
    }

    /// Number of file rows
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of cells per file row
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of packed bytes per file row
    #[must_use]
    pub fn row_size_bytes(&self) -> usize {
        row_size_bytes(self.n_cols)
    }

    /// Gets a reference to the underlying byte source
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consumes the reader and returns the underlying byte source
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Decodes the rectangle `rows` x `cols` into `out`
    ///
    /// Cell `(r, c)` of the file lands at
    /// `out[(r - rows.start) * strides.row + (c - cols.start) * strides.col]`.
    /// Entries of `out` not addressed by the rectangle are left untouched.
    ///
    /// # Arguments
    ///
    /// * `rows` - File rows to decode
    /// * `cols` - Cells within each row; `cols.start` must be a multiple of 4
    /// * `out` - Caller-owned destination buffer
    /// * `strides` - Element strides addressing `out`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every cell of the rectangle was written
    /// * `Err(Error)` - If the request is invalid or a row could not be fetched
    ///
    /// # Errors
    ///
    /// * Precondition errors when the ranges fall outside the matrix, when
    ///   `cols.start` is not a multiple of 4, or when `out` is too small for the
    ///   strides (or the strides overflow). Unaligned starts are never rounded down.
    /// * [`ReadError::FileTruncation`] or [`ReadError::Io`] when a row cannot be
    ///   fetched. The contents of `out` are unspecified after an error.
    pub fn read_chunk(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        out: &mut [u8],
        strides: Strides,
    ) -> Result<()> {
        let mut scratch = Vec::new();
        self.decode_into(rows, cols, out, strides, &mut scratch, |code| code)
    }

    /// Decodes the rectangle `rows` x `cols` as dosages
    ///
    /// Same addressing and failure modes as [`ChunkReader::read_chunk`]; missing
    /// calls are written as `NaN`.
    pub fn read_chunk_dosage(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        out: &mut [f32],
        strides: Strides,
        allele: Allele,
    ) -> Result<()> {
        let mut scratch = Vec::new();
        self.decode_into(rows, cols, out, strides, &mut scratch, |code| {
            code_to_dosage(code, allele)
        })
    }

    /// Checks a request against the matrix dimensions and alignment contract
    pub fn validate_request(&self, rows: &Range<usize>, cols: &Range<usize>) -> Result<()> {
        if rows.start > rows.end || rows.end > self.n_rows {
            return Err(PreconditionError::RowRange {
                start: rows.start,
                end: rows.end,
                n_rows: self.n_rows,
            }
            .into());
        }
        if cols.start > cols.end || cols.end > self.n_cols {
            return Err(PreconditionError::ColumnRange {
                start: cols.start,
                end: cols.end,
                n_cols: self.n_cols,
            }
            .into());
        }
        if cols.start % CODES_PER_BYTE != 0 {
            return Err(PreconditionError::MisalignedColumnStart(cols.start).into());
        }
        Ok(())
    }

    /// Shared decoding loop
    ///
    /// `scratch` is only used by sources that cannot hand out borrowed bytes and
    /// may be reused across calls.
    pub(crate) fn decode_into<T, F>(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        out: &mut [T],
        strides: Strides,
        scratch: &mut Vec<u8>,
        map: F,
    ) -> Result<()>
    where
        F: Fn(u8) -> T,
    {
        self.validate_request(&rows, &cols)?;
        let n_req_rows = rows.len();
        let n_req_cols = cols.len();
        strides.validate(n_req_rows, n_req_cols, out.len())?;
        if n_req_rows == 0 || n_req_cols == 0 {
            return Ok(());
        }
        trace!("decoding rows {rows:?} x cols {cols:?}");

        let size = self.source.size()?;
        let row_size = self.row_size_bytes() as u64;
        let chunk_bytes = n_req_cols.div_ceil(CODES_PER_BYTE);
        let col_offset = (cols.start / CODES_PER_BYTE) as u64;

        for (i, row) in rows.enumerate() {
            let offset = SIZE_HEADER as u64 + row as u64 * row_size + col_offset;
            if offset + chunk_bytes as u64 > size {
                return Err(ReadError::FileTruncation {
                    offset,
                    expected: chunk_bytes,
                    available: size.saturating_sub(offset),
                }
                .into());
            }
            let bytes = self
                .source
                .fetch(offset, chunk_bytes, scratch)
                .map_err(|source| ReadError::Io {
                    row,
                    offset,
                    source,
                })?;

            let base = i * strides.row;
            let mut col = 0;
            for &byte in bytes {
                let take = (n_req_cols - col).min(CODES_PER_BYTE);
                for (k, &code) in unpack_byte(byte)[..take].iter().enumerate() {
                    out[base + (col + k) * strides.col] = map(code);
                }
                col += take;
            }
        }
        Ok(())
    }
}

/// Opens a regular file read-only and maps it into memory
pub(crate) fn map_file(path: &Path) -> Result<Mmap> {
    // Verify input file is a file before attempting to map
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(ReadError::IncompatibleFile.into());
    }

    // Safety: the file is opened read-only and the mapping owns its own handle
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}

impl ChunkReader<Mmap> {
    /// Memory-maps the file at `path` and validates its header
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be opened
    /// * The file is not a regular file
    /// * The file header is invalid
    pub fn open_mmap<P: AsRef<Path>>(path: P, n_rows: usize, n_cols: usize) -> Result<Self> {
        let path = path.as_ref();
        let reader = Self::new(map_file(path)?, n_rows, n_cols)?;
        debug!(
            "Mapped {} ({:?}, {n_rows} x {n_cols})",
            path.display(),
            reader.storage_mode()
        );
        Ok(reader)
    }
}

impl ChunkReader<File> {
    /// Opens the file at `path` for positioned reads and validates its header
    ///
    /// Every row is read at an explicit offset, so the handle has no cursor that
    /// concurrent requests could disturb.
    pub fn open_file<P: AsRef<Path>>(path: P, n_rows: usize, n_cols: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if !file.metadata()?.is_file() {
            return Err(ReadError::IncompatibleFile.into());
        }
        let reader = Self::new(file, n_rows, n_cols)?;
        debug!(
            "Opened {} ({:?}, {n_rows} x {n_cols})",
            path.display(),
            reader.storage_mode()
        );
        Ok(reader)
    }
}
