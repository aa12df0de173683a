//! Chunk writer module
//!
//! Appends bit-packed rows to a BED file. Rows must arrive in their final
//! on-disk order; nothing is ever rewritten. Each call to
//! [`BedWriter::append_chunk`] is encoded entirely in memory before a single
//! write, so invalid input never reaches the sink.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, trace};

use crate::codec::{pack_byte, CODES_PER_BYTE, MISSING};
use crate::dosage::dosage_to_code;
use crate::error::{PreconditionError, ReadError, Result, WriteError};
use crate::header::{BedHeader, StorageMode, SIZE_HEADER};
use crate::strides::Strides;
use crate::utils::row_size_bytes;

/// Default capacity of the buffered file sink
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Builder for creating configured `BedWriter` instances
///
/// # Examples
///
/// ```
/// # use plinkbed::{BedWriterBuilder, Result, StorageMode, Strides};
/// # fn main() -> Result<()> {
/// let mut writer = BedWriterBuilder::default()
///     .storage_mode(StorageMode::VariantMajor)
///     .n_cols(3)
///     .build(Vec::new())?;
/// writer.append_chunk(3, 1, &[0, 1, 2], Strides::row_major(3))?;
/// assert_eq!(writer.into_inner(), vec![0x6c, 0x1b, 0x01, 0b0011_1000]);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct BedWriterBuilder {
    /// Required layout declared in the header
    storage_mode: Option<StorageMode>,
    /// Optional fixed row width; otherwise taken from the first chunk
    n_cols: Option<usize>,
    /// Optional headless mode for encoding rows into side buffers
    headless: Option<bool>,
    /// Optional buffer capacity for file sinks
    buffer_capacity: Option<usize>,
}
impl BedWriterBuilder {
    #[must_use]
    pub fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.storage_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn n_cols(mut self, n_cols: usize) -> Self {
        self.n_cols = Some(n_cols);
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    /// Builds a writer over `inner`, writing the header unless headless
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::MissingStorageMode`] if no storage mode was set.
    pub fn build<W: Write>(self, inner: W) -> Result<BedWriter<W>> {
        let Some(mode) = self.storage_mode else {
            return Err(WriteError::MissingStorageMode.into());
        };
        BedWriter::new(
            inner,
            BedHeader::new(mode),
            self.n_cols,
            self.headless.unwrap_or(false),
        )
    }

    /// Creates (or truncates) the file at `path` and writes the header
    pub fn create<P: AsRef<Path>>(self, path: P) -> Result<BedWriter<BufWriter<File>>> {
        let path = path.as_ref();
        let capacity = self.buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY);
        let file = File::create(path)?;
        let writer = self.build(BufWriter::with_capacity(capacity, file))?;
        debug!(
            "Created {} ({:?})",
            path.display(),
            writer.header().mode
        );
        Ok(writer)
    }
}

/// Append-only writer for BED files
///
/// The row width (`n_cols`, the file's minor axis) is fixed for the lifetime of
/// the writer. After a failed write the sink's length is undefined and the
/// writer refuses further appends.
///
/// # Type Parameters
///
/// * `W` - The underlying writer type that implements `Write`
pub struct BedWriter<W: Write> {
    /// The underlying writer for output
    inner: W,

    /// Header declared for this file
    header: BedHeader,

    /// Number of cells per row, fixed by the builder or the first chunk
    n_cols: Option<usize>,

    /// Number of rows appended so far
    rows_written: usize,

    /// Whether the header was skipped
    headless: bool,

    /// Set once a write has failed part-way
    poisoned: bool,

    /// Reusable buffer holding the encoded chunk
    ebuf: Vec<u8>,
}
impl<W: Write> BedWriter<W> {
    /// Creates a new `BedWriter`, writing the header unless `headless`
    ///
    /// For a more convenient way to create a `BedWriter`, use [`BedWriterBuilder`].
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying writer
    /// * `header` - The header declaring the storage mode
    /// * `n_cols` - Row width if known up front; otherwise fixed by the first chunk
    /// * `headless` - Skip the header, for side buffers later passed to [`BedWriter::ingest`]
    ///
    /// # Returns
    ///
    /// * `Ok(BedWriter)` - A writer ready to append rows
    /// * `Err(Error)` - If `n_cols` is zero or the header could not be written
    pub fn new(
        mut inner: W,
        header: BedHeader,
        n_cols: Option<usize>,
        headless: bool,
    ) -> Result<Self> {
        if n_cols == Some(0) {
            return Err(PreconditionError::EmptyDimension {
                n_rows: 0,
                n_cols: 0,
            }
            .into());
        }
        if !headless {
            header.write_bytes(&mut inner)?;
        }
        Ok(Self {
            inner,
            header,
            n_cols,
            rows_written: 0,
            headless,
            poisoned: false,
            ebuf: Vec::new(),
        })
    }

    /// Appends `n_rows` rows of logical genotype codes
    ///
    /// Cell `(r, c)` of the chunk is read from `data[r * strides.row + c * strides.col]`.
    /// A trailing partial byte is zero-padded.
    ///
    /// # Arguments
    ///
    /// * `n_cols` - Cells per row; must match every other chunk of the file
    /// * `n_rows` - Number of rows in this chunk
    /// * `data` - Codes in `0..=3`, addressed by `strides`
    /// * `strides` - Element strides addressing `data`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the whole chunk was written
    /// * `Err(Error)` - If the chunk was rejected (nothing written) or the sink failed
    ///
    /// # Errors
    ///
    /// * Precondition errors when `n_cols` differs from the file's row width, when
    ///   `data` is too small for the strides, or when a value is not in `0..=3`.
    ///   Nothing is written in these cases.
    /// * [`WriteError::Io`] when the sink fails. The file must then be treated as corrupt.
    pub fn append_chunk(
        &mut self,
        n_cols: usize,
        n_rows: usize,
        data: &[u8],
        strides: Strides,
    ) -> Result<()> {
        let first_row = self.rows_written;
        self.encode_with(n_cols, n_rows, data, strides, |code, r, c| {
            if code > MISSING {
                return Err(PreconditionError::InvalidCode {
                    row: first_row + r,
                    col: c,
                    code,
                }
                .into());
            }
            Ok(code)
        })?;
        self.commit(n_cols, n_rows)
    }

    /// Appends `n_rows` rows of dosages
    ///
    /// Accepts `0.0`, `1.0`, `2.0` (copies of the second allele) and `NaN` for missing.
    pub fn append_dosage_chunk(
        &mut self,
        n_cols: usize,
        n_rows: usize,
        data: &[f32],
        strides: Strides,
    ) -> Result<()> {
        let first_row = self.rows_written;
        self.encode_with(n_cols, n_rows, data, strides, |value, r, c| {
            dosage_to_code(value, first_row + r, c)
        })?;
        self.commit(n_cols, n_rows)
    }

    /// Encodes a chunk into `ebuf` without touching the sink
    fn encode_with<T, F>(
        &mut self,
        n_cols: usize,
        n_rows: usize,
        data: &[T],
        strides: Strides,
        to_code: F,
    ) -> Result<()>
    where
        T: Copy,
        F: Fn(T, usize, usize) -> Result<u8>,
    {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        if n_cols == 0 {
            return Err(PreconditionError::EmptyDimension { n_rows, n_cols }.into());
        }
        if let Some(expected) = self.n_cols {
            if expected != n_cols {
                return Err(PreconditionError::ColumnCountMismatch {
                    expected,
                    got: n_cols,
                }
                .into());
            }
        }
        strides.validate(n_rows, n_cols, data.len())?;

        let Some(chunk_bytes) = n_rows.checked_mul(row_size_bytes(n_cols)) else {
            return Err(PreconditionError::ShapeOverflow { n_rows, n_cols }.into());
        };
        self.ebuf.clear();
        self.ebuf.reserve(chunk_bytes);
        let mut group = [0u8; CODES_PER_BYTE];
        for r in 0..n_rows {
            for start in (0..n_cols).step_by(CODES_PER_BYTE) {
                let width = (n_cols - start).min(CODES_PER_BYTE);
                for (k, slot) in group[..width].iter_mut().enumerate() {
                    let c = start + k;
                    *slot = to_code(data[strides.index(r, c)], r, c)?;
                }
                self.ebuf.push(pack_byte(&group[..width]));
            }
        }
        Ok(())
    }

    /// Writes the encoded chunk in one call
    fn commit(&mut self, n_cols: usize, n_rows: usize) -> Result<()> {
        if n_rows == 0 {
            return Ok(());
        }
        if let Err(source) = self.inner.write_all(&self.ebuf) {
            self.poisoned = true;
            return Err(WriteError::Io {
                row: self.rows_written,
                source,
            }
            .into());
        }
        trace!(
            "appended rows {}..{} ({} bytes)",
            self.rows_written,
            self.rows_written + n_rows,
            self.ebuf.len()
        );
        self.n_cols = Some(n_cols);
        self.rows_written += n_rows;
        Ok(())
    }

    /// Header declared for this file
    #[must_use]
    pub fn header(&self) -> BedHeader {
        self.header
    }

    /// Row width, once known
    #[must_use]
    pub fn n_cols(&self) -> Option<usize> {
        self.n_cols
    }

    /// Number of rows appended by this writer
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Checks if this writer skipped the header
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Consumes the writer and returns the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Gets a mutable reference to the underlying writer
    pub fn by_ref(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Flushes any buffered data to the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        if let Err(source) = self.inner.flush() {
            self.poisoned = true;
            return Err(WriteError::Io {
                row: self.rows_written,
                source,
            }
            .into());
        }
        Ok(())
    }

    /// Appends the rows encoded by a headless side writer
    ///
    /// Used to encode disjoint row blocks independently (for example on other
    /// threads) and splice them into the file in order. The side buffer is
    /// cleared afterwards.
    pub fn ingest(&mut self, other: &mut BedWriter<Vec<u8>>) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        if let (Some(expected), Some(got)) = (self.n_cols, other.n_cols) {
            if expected != got {
                return Err(PreconditionError::ColumnCountMismatch { expected, got }.into());
            }
        }
        let rows = other.rows_written;
        let other_inner = other.by_ref();
        if let Err(source) = self.inner.write_all(other_inner) {
            self.poisoned = true;
            return Err(WriteError::Io {
                row: self.rows_written,
                source,
            }
            .into());
        }
        other_inner.clear();
        other.rows_written = 0;
        if self.n_cols.is_none() {
            self.n_cols = other.n_cols;
        }
        self.rows_written += rows;
        Ok(())
    }
}

impl BedWriter<BufWriter<File>> {
    /// Re-opens an existing BED file to append more rows
    ///
    /// The header is validated and the body must hold a whole number of rows of
    /// width `n_cols`; appending to a partially written row is refused.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of an existing BED file
    /// * `n_cols` - Row width the file was written with
    ///
    /// # Returns
    ///
    /// * `Ok(BedWriter)` - A headless writer positioned after the last complete row
    /// * `Err(Error)` - If the header is invalid or the body ends mid-row
    pub fn append_to<P: AsRef<Path>>(path: P, n_cols: usize) -> Result<Self> {
        let path = path.as_ref();
        let header = BedHeader::from_path(path)?;
        if n_cols == 0 {
            return Err(PreconditionError::EmptyDimension { n_rows: 0, n_cols }.into());
        }
        let file = OpenOptions::new().append(true).open(path)?;
        let len = file.metadata()?.len();
        let body = len.saturating_sub(SIZE_HEADER as u64);
        let row_size = row_size_bytes(n_cols) as u64;
        if body % row_size != 0 {
            return Err(ReadError::FileTruncation {
                offset: len - body % row_size,
                expected: row_size as usize,
                available: body % row_size,
            }
            .into());
        }
        debug!(
            "Appending to {} ({:?}, {} rows present)",
            path.display(),
            header.mode,
            body / row_size
        );
        let mut writer = Self::new(
            BufWriter::with_capacity(DEFAULT_BUFFER_CAPACITY, file),
            header,
            Some(n_cols),
            true,
        )?;
        writer.rows_written = (body / row_size) as usize;
        Ok(writer)
    }
}

#[cfg(test)]
mod testing {
    use std::io;

    use super::*;
    use crate::codec::unpack_byte;
    use crate::Error;

    fn variant_writer(n_cols: Option<usize>) -> Result<BedWriter<Vec<u8>>> {
        BedWriter::new(
            Vec::new(),
            BedHeader::new(StorageMode::VariantMajor),
            n_cols,
            false,
        )
    }

    #[test]
    fn test_two_by_five_bytes() -> Result<()> {
        let mut writer = variant_writer(None)?;
        let data = [0u8, 1, 2, 3, 0, 3, 2, 1, 0, 1];
        writer.append_chunk(5, 2, &data, Strides::row_major(5))?;
        let bytes = writer.into_inner();
        assert_eq!(
            bytes,
            vec![
                0x6c,
                0x1b,
                0x01,
                pack_byte(&[0, 1, 2, 3]),
                pack_byte(&[0, 0, 0, 0]),
                pack_byte(&[3, 2, 1, 0]),
                pack_byte(&[1, 0, 0, 0]),
            ]
        );
        assert_eq!(&bytes[3..], &[0x78, 0x00, 0x2d, 0x02]);
        Ok(())
    }

    #[test]
    fn test_padding_bits_are_zero() -> Result<()> {
        for n_cols in 1..=7usize {
            let mut writer = variant_writer(None)?;
            let data = vec![3u8; n_cols];
            writer.append_chunk(n_cols, 1, &data, Strides::row_major(n_cols))?;
            let bytes = writer.into_inner();
            let last = *bytes.last().unwrap();
            let used = n_cols % CODES_PER_BYTE;
            if used > 0 {
                assert_eq!(last >> (2 * used), 0, "n_cols = {n_cols}");
            }
            assert_eq!(bytes.len(), SIZE_HEADER + row_size_bytes(n_cols));
        }
        Ok(())
    }

    #[test]
    fn test_column_major_input() -> Result<()> {
        // 2 x 3 matrix stored column-major
        let data = [0u8, 2, 1, 3, 2, 0];
        let mut writer = variant_writer(Some(3))?;
        writer.append_chunk(3, 2, &data, Strides::col_major(2))?;
        let bytes = writer.into_inner();
        assert_eq!(&unpack_byte(bytes[3])[..3], &[0, 1, 2]);
        assert_eq!(&unpack_byte(bytes[4])[..3], &[2, 3, 0]);
        Ok(())
    }

    #[test]
    fn test_invalid_code_writes_nothing() -> Result<()> {
        let mut writer = variant_writer(None)?;
        writer.append_chunk(2, 1, &[1, 1], Strides::row_major(2))?;
        let err = writer
            .append_chunk(2, 2, &[0, 1, 2, 4], Strides::row_major(2))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PreconditionError(PreconditionError::InvalidCode {
                row: 2,
                col: 1,
                code: 4
            })
        ));
        assert_eq!(writer.rows_written(), 1);
        assert_eq!(writer.into_inner().len(), SIZE_HEADER + 1);
        Ok(())
    }

    #[test]
    fn test_column_count_is_fixed() -> Result<()> {
        let mut writer = variant_writer(None)?;
        writer.append_chunk(4, 1, &[0; 4], Strides::row_major(4))?;
        assert_eq!(writer.n_cols(), Some(4));
        let err = writer
            .append_chunk(5, 1, &[0; 5], Strides::row_major(5))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PreconditionError(PreconditionError::ColumnCountMismatch {
                expected: 4,
                got: 5
            })
        ));
        Ok(())
    }

    #[test]
    fn test_data_too_small() -> Result<()> {
        let mut writer = variant_writer(None)?;
        let err = writer
            .append_chunk(4, 2, &[0; 7], Strides::row_major(4))
            .unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(writer.into_inner().len(), SIZE_HEADER);
        Ok(())
    }

    #[test]
    fn test_overflowing_strides() -> Result<()> {
        let mut writer = variant_writer(None)?;
        let err = writer
            .append_chunk(4, 2, &[0; 8], Strides::new(usize::MAX, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PreconditionError(PreconditionError::StrideOverflow { .. })
        ));

        // zero strides pass validation, but the encoded size cannot be addressed
        let err = writer
            .append_chunk(4, usize::MAX, &[0], Strides::new(0, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PreconditionError(PreconditionError::ShapeOverflow { .. })
        ));
        assert_eq!(writer.into_inner().len(), SIZE_HEADER);
        Ok(())
    }

    #[test]
    fn test_dosage_chunk() -> Result<()> {
        let mut writer = variant_writer(None)?;
        writer.append_dosage_chunk(4, 1, &[2.0, f32::NAN, 0.0, 1.0], Strides::row_major(4))?;
        let bytes = writer.into_inner();
        assert_eq!(unpack_byte(bytes[3]), [2, 3, 0, 1]);

        let mut writer = variant_writer(None)?;
        let err = writer
            .append_dosage_chunk(2, 1, &[1.0, 1.5], Strides::row_major(2))
            .unwrap_err();
        assert!(err.is_precondition());
        Ok(())
    }

    #[test]
    fn test_headless_ingest() -> Result<()> {
        let mut main = variant_writer(Some(3))?;
        let mut side = BedWriterBuilder::default()
            .storage_mode(StorageMode::VariantMajor)
            .headless(true)
            .build(Vec::new())?;
        assert!(side.is_headless());
        assert!(side.by_ref().is_empty());

        side.append_chunk(3, 2, &[0, 1, 2, 2, 1, 0], Strides::row_major(3))?;
        main.ingest(&mut side)?;
        assert!(side.by_ref().is_empty());
        assert_eq!(main.rows_written(), 2);

        let mut wide = BedWriterBuilder::default()
            .storage_mode(StorageMode::VariantMajor)
            .headless(true)
            .n_cols(8)
            .build(Vec::new())?;
        assert!(main.ingest(&mut wide).unwrap_err().is_precondition());
        assert_eq!(main.into_inner().len(), SIZE_HEADER + 2);
        Ok(())
    }

    #[test]
    fn test_missing_storage_mode() {
        let err = BedWriterBuilder::default().build(Vec::new()).err().unwrap();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::MissingStorageMode)
        ));
    }

    struct FailingSink;
    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_poisons_writer() -> Result<()> {
        let mut writer = BedWriter::new(
            FailingSink,
            BedHeader::new(StorageMode::SampleMajor),
            None,
            true,
        )?;
        let err = writer
            .append_chunk(1, 1, &[0], Strides::row_major(1))
            .unwrap_err();
        assert!(matches!(err, Error::WriteError(WriteError::Io { row: 0, .. })));
        let err = writer
            .append_chunk(1, 1, &[0], Strides::row_major(1))
            .unwrap_err();
        assert!(matches!(err, Error::WriteError(WriteError::Poisoned)));
        Ok(())
    }

    #[test]
    fn test_create_and_append_to() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.bed");

        let mut writer = BedWriterBuilder::default()
            .storage_mode(StorageMode::SampleMajor)
            .buffer_capacity(16)
            .create(&path)?;
        writer.append_chunk(5, 1, &[0, 1, 2, 3, 0], Strides::row_major(5))?;
        writer.flush()?;
        drop(writer);

        let mut writer = BedWriter::append_to(&path, 5)?;
        assert_eq!(writer.rows_written(), 1);
        assert_eq!(writer.header().mode, StorageMode::SampleMajor);
        writer.append_chunk(5, 1, &[3, 3, 3, 3, 3], Strides::row_major(5))?;
        writer.flush()?;
        drop(writer);

        let bytes = std::fs::read(&path)?;
        assert_eq!(bytes.len(), SIZE_HEADER + 4);
        assert_eq!(&bytes[..3], &[0x6c, 0x1b, 0x00]);
        assert_eq!(bytes[5], pack_byte(&[3, 3, 3, 3]));

        // a body that does not split into whole rows is refused
        assert!(BedWriter::append_to(&path, 9).is_err());

        // re-creating truncates
        let writer = BedWriterBuilder::default()
            .storage_mode(StorageMode::VariantMajor)
            .create(&path)?;
        drop(writer.into_inner().into_inner().map_err(io::Error::from)?);
        assert_eq!(std::fs::read(&path)?, vec![0x6c, 0x1b, 0x01]);
        Ok(())
    }
}
