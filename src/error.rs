/// Custom Result type for plinkbed operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the plinkbed library, encompassing all possible error cases
/// that can occur while decoding or encoding a BED genotype matrix.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// The file is not a BED file, or not one this codec can decode
    HeaderError(#[from] HeaderError),
    /// Errors that occur while reading chunks from a file
    ReadError(#[from] ReadError),
    /// Errors that occur while appending chunks to a file
    WriteError(#[from] WriteError),
    /// Caller-side contract violations (bounds, alignment, buffer sizes)
    PreconditionError(#[from] PreconditionError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the error is a caller-side contract violation
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionError(_))
    }

    /// Returns true if the file itself was rejected as not decodable
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(self, Self::HeaderError(_))
    }
}

/// Errors specific to processing and validating the 3-byte BED header
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic number in the header does not match the expected value
    ///
    /// # Arguments
    /// * `u16` - The invalid magic number that was found
    #[error("Invalid magic number: {0:#06x}")]
    InvalidMagicNumber(u16),

    /// The storage mode byte is neither sample-major nor variant-major
    ///
    /// # Arguments
    /// * `u8` - The unsupported mode byte that was found
    #[error("Unsupported storage mode: {0:#04x} (PLINK 2 files are not supported)")]
    UnsupportedStorageMode(u8),

    /// Fewer bytes than a full header were available
    ///
    /// # Arguments
    /// * First `usize` - The actual number of bytes provided
    /// * Second `usize` - The expected number of bytes
    #[error("Invalid number of header bytes provided: {0}. Expected: {1}")]
    InvalidSize(usize, usize),
}

/// Errors that can occur while reading genotype rows
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file being read is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular")]
    IncompatibleFile,

    /// The file ends before the bytes required by a row
    #[error(
        "File truncated: needed {expected} bytes at offset {offset} but only {available} are available"
    )]
    FileTruncation {
        offset: u64,
        expected: usize,
        available: u64,
    },

    /// The underlying source failed while fetching a row
    #[error("Failed to read row {row} at byte offset {offset}: {source}")]
    Io {
        row: usize,
        offset: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while appending genotype rows
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Attempted to build a writer without declaring the storage mode
    #[error("Missing storage mode in writer builder")]
    MissingStorageMode,

    /// The underlying sink failed while appending a chunk
    ///
    /// The file length is undefined after this error and appending must not resume.
    #[error("Failed to append chunk starting at row {row}: {source}")]
    Io {
        row: usize,
        #[source]
        source: std::io::Error,
    },

    /// A previous append failed part-way; the writer no longer accepts rows
    #[error("Writer is unusable after a failed write")]
    Poisoned,
}

/// Contract violations by the caller. These are never recoverable at this layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    /// Column requests must start on a packed-byte boundary
    ///
    /// # Arguments
    /// * `usize` - The requested (unaligned) column start
    #[error("Column start {0} is not a multiple of 4")]
    MisalignedColumnStart(usize),

    /// Requested rows fall outside the matrix
    #[error("Row range {start}..{end} is invalid for {n_rows} rows")]
    RowRange {
        start: usize,
        end: usize,
        n_rows: usize,
    },

    /// Requested columns fall outside the matrix
    #[error("Column range {start}..{end} is invalid for {n_cols} columns")]
    ColumnRange {
        start: usize,
        end: usize,
        n_cols: usize,
    },

    /// Matrix dimensions must both be positive
    #[error("Matrix dimensions must be positive (got {n_rows} x {n_cols})")]
    EmptyDimension { n_rows: usize, n_cols: usize },

    /// The caller's buffer cannot hold the rectangle under the given strides
    #[error("Buffer of {got} elements is too small; strides require {needed}")]
    BufferTooSmall { needed: usize, got: usize },

    /// The strides address positions beyond `usize::MAX` for the rectangle
    #[error("Strides ({row}, {col}) overflow for a {n_rows} x {n_cols} rectangle")]
    StrideOverflow {
        row: usize,
        col: usize,
        n_rows: usize,
        n_cols: usize,
    },

    /// The declared dimensions describe a file larger than can be addressed
    #[error("Matrix of {n_rows} x {n_cols} cells is too large to address")]
    ShapeOverflow { n_rows: usize, n_cols: usize },

    /// The column count differs from the one fixed for this file
    #[error("Column count ({got}) does not match the file ({expected})")]
    ColumnCountMismatch { expected: usize, got: usize },

    /// A value outside the logical genotype codes was supplied for encoding
    #[error("Invalid genotype code {code} at ({row}, {col})")]
    InvalidCode { row: usize, col: usize, code: u8 },

    /// A dosage that is neither 0, 1, 2 nor NaN was supplied for encoding
    #[error("Invalid dosage {value} at ({row}, {col})")]
    InvalidDosage { row: usize, col: usize, value: f32 },
}
