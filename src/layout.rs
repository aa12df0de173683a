//! Logical matrix view over either storage mode
//!
//! Callers think in a `variant x sample` matrix. A variant-major file stores that
//! matrix as is; a sample-major file stores its transpose. [`Layout`] translates
//! coordinates, ranges and strides between the two spaces.

use std::ops::Range;

use crate::header::StorageMode;
use crate::strides::Strides;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    mode: StorageMode,
    n_samples: usize,
    n_variants: usize,
}
impl Layout {
    #[must_use]
    pub fn new(mode: StorageMode, n_samples: usize, n_variants: usize) -> Self {
        Self {
            mode,
            n_samples,
            n_variants,
        }
    }

    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    #[must_use]
    pub fn n_variants(&self) -> usize {
        self.n_variants
    }

    /// Shape of the logical matrix: `(n_variants, n_samples)`
    #[must_use]
    pub fn matrix_shape(&self) -> (usize, usize) {
        (self.n_variants, self.n_samples)
    }

    /// Shape of the matrix as stored: `(n_major, n_minor)`
    #[must_use]
    pub fn file_shape(&self) -> (usize, usize) {
        match self.mode {
            StorageMode::VariantMajor => (self.n_variants, self.n_samples),
            StorageMode::SampleMajor => (self.n_samples, self.n_variants),
        }
    }

    fn swaps(&self) -> bool {
        self.mode == StorageMode::SampleMajor
    }

    /// Maps a `(variant, sample)` cell to its `(row, col)` in the file
    #[must_use]
    pub fn to_file_space(&self, variant: usize, sample: usize) -> (usize, usize) {
        if self.swaps() {
            (sample, variant)
        } else {
            (variant, sample)
        }
    }

    /// Maps a file `(row, col)` back to `(variant, sample)`
    #[must_use]
    pub fn to_matrix_space(&self, row: usize, col: usize) -> (usize, usize) {
        // the mapping is its own inverse
        self.to_file_space(row, col)
    }

    /// Translates variant and sample ranges into file `(rows, cols)` ranges
    #[must_use]
    pub fn file_ranges(
        &self,
        variants: Range<usize>,
        samples: Range<usize>,
    ) -> (Range<usize>, Range<usize>) {
        if self.swaps() {
            (samples, variants)
        } else {
            (variants, samples)
        }
    }

    /// Translates strides of a `variant x sample` buffer into file-space strides
    #[must_use]
    pub fn file_strides(&self, strides: Strides) -> Strides {
        if self.swaps() {
            strides.transposed()
        } else {
            strides
        }
    }
}
