//! Variant-by-sample access independent of the storage mode
//!
//! [`BedMatrix`] and [`MatrixWriter`] wrap the file-space reader and writer with a
//! [`Layout`], so callers always address `(variant, sample)` cells and lay their
//! buffers out as `variant x sample` matrices.
//!
//! Only the file's minor axis carries the packed-byte alignment rule: in a
//! variant-major file the sample range must start on a multiple of 4, in a
//! sample-major file the variant range must.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use log::debug;
use memmap2::Mmap;

use crate::dosage::Allele;
use crate::error::{PreconditionError, Result};
use crate::header::{BedHeader, StorageMode};
use crate::layout::Layout;
use crate::reader::{map_file, read_source_header, ChunkReader};
use crate::source::BedSource;
use crate::strides::Strides;
use crate::writer::{BedWriter, BedWriterBuilder};

/// Reader for the logical `variant x sample` genotype matrix
pub struct BedMatrix<S: BedSource> {
    reader: ChunkReader<S>,
    layout: Layout,
}

impl<S: BedSource> BedMatrix<S> {
    /// Wraps a source whose header decides the storage mode
    ///
    /// `n_samples` and `n_variants` come from the companion `.fam` and `.bim` files.
    pub fn new(source: S, n_samples: usize, n_variants: usize) -> Result<Self> {
        let header = read_source_header(&source)?;
        let layout = Layout::new(header.mode, n_samples, n_variants);
        let (n_major, n_minor) = layout.file_shape();
        let reader = ChunkReader::with_header(source, header, n_major, n_minor)?;
        Ok(Self { reader, layout })
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[must_use]
    pub fn storage_mode(&self) -> StorageMode {
        self.layout.mode()
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.layout.n_samples()
    }

    #[must_use]
    pub fn n_variants(&self) -> usize {
        self.layout.n_variants()
    }

    /// The underlying file-space reader
    #[must_use]
    pub fn reader(&self) -> &ChunkReader<S> {
        &self.reader
    }

    pub fn into_inner(self) -> ChunkReader<S> {
        self.reader
    }

    /// Decodes the cells `variants x samples` into `out`
    ///
    /// Cell `(v, s)` of the request is written to
    /// `out[v * strides.row + s * strides.col]`, where `v` and `s` are relative to
    /// the start of their ranges.
    pub fn read(
        &self,
        variants: Range<usize>,
        samples: Range<usize>,
        out: &mut [u8],
        strides: Strides,
    ) -> Result<()> {
        let (rows, cols) = self.layout.file_ranges(variants, samples);
        self.reader
            .read_chunk(rows, cols, out, self.layout.file_strides(strides))
    }

    /// Decodes the cells `variants x samples` as dosages
    pub fn read_dosage(
        &self,
        variants: Range<usize>,
        samples: Range<usize>,
        out: &mut [f32],
        strides: Strides,
        allele: Allele,
    ) -> Result<()> {
        let (rows, cols) = self.layout.file_ranges(variants, samples);
        self.reader.read_chunk_dosage(
            rows,
            cols,
            out,
            self.layout.file_strides(strides),
            allele,
        )
    }

    /// Decodes the whole matrix into a row-major `variant x sample` vector
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let (n_variants, n_samples) = self.layout.matrix_shape();
        let mut out = vec![0u8; n_variants * n_samples];
        self.read(
            0..n_variants,
            0..n_samples,
            &mut out,
            Strides::row_major(n_samples),
        )?;
        Ok(out)
    }
}

impl BedMatrix<Mmap> {
    /// Memory-maps the file at `path`
    pub fn open<P: AsRef<Path>>(path: P, n_samples: usize, n_variants: usize) -> Result<Self> {
        let path = path.as_ref();
        let matrix = Self::new(map_file(path)?, n_samples, n_variants)?;
        debug!(
            "Opened {} as {n_variants} variants x {n_samples} samples ({:?})",
            path.display(),
            matrix.storage_mode()
        );
        Ok(matrix)
    }
}

/// Writer for the logical `variant x sample` genotype matrix
///
/// Appends whole file rows: variants in a variant-major file, samples in a
/// sample-major one. Blocks are always laid out as `variant x sample`.
pub struct MatrixWriter<W: Write> {
    writer: BedWriter<W>,
    layout: Layout,
}

impl<W: Write> MatrixWriter<W> {
    /// Writes the header for `mode` and fixes the matrix dimensions
    ///
    /// Every appended block must span the whole minor axis, and appends that
    /// would go past the declared number of file rows are rejected.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying writer
    /// * `mode` - Storage mode declared in the header
    /// * `n_samples` - Number of samples (from the `.fam` file)
    /// * `n_variants` - Number of variants (from the `.bim` file)
    pub fn new(inner: W, mode: StorageMode, n_samples: usize, n_variants: usize) -> Result<Self> {
        let layout = Layout::new(mode, n_samples, n_variants);
        let (_, n_minor) = layout.file_shape();
        let writer = BedWriter::new(inner, BedHeader::new(mode), Some(n_minor), false)?;
        Ok(Self { writer, layout })
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of file rows appended so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.writer.rows_written()
    }

    /// Appends the next `n_major` file rows
    ///
    /// `data` holds a `variant x sample` block addressed by `strides`. In a
    /// variant-major file the block is `n_major x n_samples`; in a sample-major
    /// file it is `n_variants x n_major`.
    pub fn append(&mut self, data: &[u8], n_major: usize, strides: Strides) -> Result<()> {
        let n_minor = self.reserve_rows(n_major)?;
        self.writer
            .append_chunk(n_minor, n_major, data, self.layout.file_strides(strides))
    }

    /// Appends the next `n_major` file rows given as dosages
    pub fn append_dosage(&mut self, data: &[f32], n_major: usize, strides: Strides) -> Result<()> {
        let n_minor = self.reserve_rows(n_major)?;
        self.writer
            .append_dosage_chunk(n_minor, n_major, data, self.layout.file_strides(strides))
    }

    /// Checks that `n_major` more rows fit the declared shape and returns the row width
    fn reserve_rows(&self, n_major: usize) -> Result<usize> {
        let (n_total, n_minor) = self.layout.file_shape();
        let start = self.writer.rows_written();
        match start.checked_add(n_major) {
            Some(end) if end <= n_total => Ok(n_minor),
            _ => Err(PreconditionError::RowRange {
                start,
                end: start.saturating_add(n_major),
                n_rows: n_total,
            }
            .into()),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> BedWriter<W> {
        self.writer
    }
}

impl MatrixWriter<BufWriter<File>> {
    /// Creates (or truncates) a BED file at `path`
    pub fn create<P: AsRef<Path>>(
        path: P,
        mode: StorageMode,
        n_samples: usize,
        n_variants: usize,
    ) -> Result<Self> {
        let layout = Layout::new(mode, n_samples, n_variants);
        let (_, n_minor) = layout.file_shape();
        let writer = BedWriterBuilder::default()
            .storage_mode(mode)
            .n_cols(n_minor)
            .create(path)?;
        Ok(Self { writer, layout })
    }
}
