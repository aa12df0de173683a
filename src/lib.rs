//! # plinkbed
//!
//! Partial-read and append-write codec for PLINK 1 `.bed` genotype matrices.
//!
//! A BED file stores a `variant x sample` matrix of genotype calls, four calls per
//! byte. Sample and variant counts live in the companion `.fam` and `.bim` files
//! and are always supplied by the caller.
//!
//! ## File layout
//!
//! | Offset | Size | Content |
//! |--------|------|---------|
//! | 0 | 2 | magic `0x6c 0x1b` |
//! | 2 | 1 | storage mode: `0` sample-major, `1` variant-major |
//! | 3 | `n_major * ceil(n_minor / 4)` | packed rows |
//!
//! Cell `i` of a row occupies bits `2i..2i+2` of byte `i / 4`. The raw bit pairs
//! map to logical codes as `00 -> 0`, `10 -> 1`, `11 -> 2` and `01 -> 3` (missing),
//! where the logical code counts copies of the second allele.
//!
//! ## Reading
//!
//! [`ChunkReader`] decodes rectangles in file space and [`BedMatrix`] in
//! `variant x sample` space. Destination buffers are addressed through element
//! [`Strides`], so row-major, column-major and strided views are all supported.
//!
//! ```
//! # use plinkbed::{BedMatrix, MatrixWriter, Result, StorageMode, Strides};
//! # fn main() -> Result<()> {
//! let mut writer = MatrixWriter::new(Vec::new(), StorageMode::VariantMajor, 5, 2)?;
//! writer.append(&[0, 1, 2, 3, 0, 3, 2, 1, 0, 1], 2, Strides::row_major(5))?;
//! let bytes = writer.into_inner().into_inner();
//! assert_eq!(bytes, [0x6c, 0x1b, 0x01, 0x78, 0x00, 0x2d, 0x02]);
//!
//! let matrix = BedMatrix::new(bytes, 5, 2)?;
//! let mut out = [0u8; 2];
//! matrix.read(0..2, 4..5, &mut out, Strides::row_major(1))?;
//! assert_eq!(out, [0, 1]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing
//!
//! [`BedWriter`] appends whole rows in their final order. Each chunk is encoded
//! in memory before it is written, so rejected input leaves the file untouched.

mod codec;
mod dosage;
mod error;
mod header;
mod layout;
mod matrix;
mod reader;
mod source;
mod strides;
mod utils;
mod writer;

pub mod prelude;

pub use codec::{pack_byte, unpack_byte, Genotype};
pub use dosage::{code_to_dosage, dosage_to_code, Allele};
pub use error::{Error, HeaderError, PreconditionError, ReadError, Result, WriteError};
pub use header::{BedHeader, StorageMode, MAGIC, SIZE_HEADER};
pub use layout::Layout;
pub use matrix::{BedMatrix, MatrixWriter};
pub use reader::ChunkReader;
pub use source::BedSource;
pub use strides::Strides;
pub use utils::{expected_file_size, row_size_bytes};
pub use writer::{BedWriter, BedWriterBuilder};

#[cfg(test)]
mod testing {

    use super::*;
    use anyhow::Result;
    use std::io::Cursor;

    #[test]
    fn test_bed_two_by_five() -> Result<()> {
        let header = BedHeader::new(StorageMode::VariantMajor);
        let mut writer = BedWriter::new(Cursor::new(Vec::new()), header, None, false)?;

        writer.append_chunk(5, 2, &[0, 1, 2, 3, 0, 3, 2, 1, 0, 1], Strides::row_major(5))?;

        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes, vec![0x6c, 0x1b, 0x01, 0x78, 0x00, 0x2d, 0x02]);

        let reader = ChunkReader::new(bytes.as_slice(), 2, 5)?;
        let mut out = vec![0u8; 2];
        reader.read_chunk(0..2, 4..5, &mut out, Strides::row_major(1))?;
        assert_eq!(out, vec![0, 1]);

        Ok(())
    }

    #[test]
    fn test_bed_chunked_append_matches_single_write() -> Result<()> {
        let codes: Vec<u8> = (0..9 * 7).map(|i| (i * 7 % 4) as u8).collect();

        let mut single = BedWriter::new(
            Vec::new(),
            BedHeader::new(StorageMode::SampleMajor),
            None,
            false,
        )?;
        single.append_chunk(7, 9, &codes, Strides::row_major(7))?;

        let mut chunked = BedWriter::new(
            Vec::new(),
            BedHeader::new(StorageMode::SampleMajor),
            Some(7),
            false,
        )?;
        for rows in [0..2, 2..3, 3..9] {
            chunked.append_chunk(7, rows.len(), &codes[rows.start * 7..], Strides::row_major(7))?;
        }
        assert_eq!(chunked.rows_written(), 9);
        assert_eq!(single.into_inner(), chunked.into_inner());

        Ok(())
    }

    #[test]
    fn test_bed_aligned_tiles_cover_matrix() -> Result<()> {
        let (n_rows, n_cols) = (6, 13);
        let codes: Vec<u8> = (0..n_rows * n_cols).map(|i| (i % 4) as u8).collect();
        let mut writer = BedWriter::new(
            Vec::new(),
            BedHeader::new(StorageMode::VariantMajor),
            None,
            false,
        )?;
        writer.append_chunk(n_cols, n_rows, &codes, Strides::row_major(n_cols))?;
        let reader = ChunkReader::new(writer.into_inner(), n_rows, n_cols)?;

        // decode 4-wide column tiles straight into one column-major buffer
        let strides = Strides::col_major(n_rows);
        let mut out = vec![u8::MAX; n_rows * n_cols];
        for start in (0..n_cols).step_by(4) {
            let end = (start + 4).min(n_cols);
            reader.read_chunk(0..n_rows, start..end, &mut out[start * n_rows..], strides)?;
        }
        for r in 0..n_rows {
            for c in 0..n_cols {
                assert_eq!(out[strides.index(r, c)], codes[r * n_cols + c]);
            }
        }

        Ok(())
    }
}
