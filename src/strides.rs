//! Element strides for addressing caller-owned matrix buffers
//!
//! Cell `(row, col)` of a rectangle lives at `row * row + col * col` in the buffer.
//! Strides are element counts, never bytes.

use crate::error::{PreconditionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strides {
    /// Distance between consecutive rows
    pub row: usize,
    /// Distance between consecutive columns
    pub col: usize,
}
impl Strides {
    /// Creates strides from explicit row and column distances
    ///
    /// # Arguments
    ///
    /// * `row` - Elements between `(r, c)` and `(r + 1, c)`
    /// * `col` - Elements between `(r, c)` and `(r, c + 1)`
    #[must_use]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Dense C-order layout for a buffer with `n_cols` columns
    #[must_use]
    pub fn row_major(n_cols: usize) -> Self {
        Self::new(n_cols, 1)
    }

    /// Dense Fortran-order layout for a buffer with `n_rows` rows
    #[must_use]
    pub fn col_major(n_rows: usize) -> Self {
        Self::new(1, n_rows)
    }

    /// Swaps the row and column strides
    #[must_use]
    pub fn transposed(self) -> Self {
        Self::new(self.col, self.row)
    }

    /// Buffer position of `(row, col)`
    ///
    /// Unchecked; only call it for cells of a rectangle that passed [`Strides::validate`].
    #[inline]
    #[must_use]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.row + col * self.col
    }

    /// Minimum buffer length addressed by a `n_rows` x `n_cols` rectangle
    ///
    /// Returns `None` when the last index does not fit in a `usize`.
    #[must_use]
    pub fn required_len(&self, n_rows: usize, n_cols: usize) -> Option<usize> {
        if n_rows == 0 || n_cols == 0 {
            return Some(0);
        }
        let last_row = (n_rows - 1).checked_mul(self.row)?;
        let last_col = (n_cols - 1).checked_mul(self.col)?;
        last_row.checked_add(last_col)?.checked_add(1)
    }

    /// Checks that a buffer of `len` elements covers the rectangle
    ///
    /// Once this passes, [`Strides::index`] cannot overflow for any cell of the rectangle.
    pub fn validate(&self, n_rows: usize, n_cols: usize, len: usize) -> Result<()> {
        let Some(needed) = self.required_len(n_rows, n_cols) else {
            return Err(PreconditionError::StrideOverflow {
                row: self.row,
                col: self.col,
                n_rows,
                n_cols,
            }
            .into());
        };
        if needed > len {
            return Err(PreconditionError::BufferTooSmall { needed, got: len }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;

    #[test]
    fn test_dense_layouts() {
        let c = Strides::row_major(5);
        let f = Strides::col_major(3);
        assert_eq!(c.index(1, 2), 7);
        assert_eq!(f.index(1, 2), 7);
        assert_eq!(c.required_len(3, 5), Some(15));
        assert_eq!(f.required_len(3, 5), Some(15));
        assert_eq!(c.transposed(), Strides::new(1, 5));
    }

    #[test]
    fn test_validate() {
        let strides = Strides::new(10, 1);
        assert!(strides.validate(2, 4, 14).is_ok());
        assert!(strides.validate(2, 4, 13).unwrap_err().is_precondition());
        assert!(strides.validate(0, 4, 0).is_ok());
    }

    #[test]
    fn test_huge_strides_are_rejected() {
        let strides = Strides::new(usize::MAX, 1);
        assert_eq!(strides.required_len(2, 4), None);
        // a single row never multiplies the row stride
        assert_eq!(strides.required_len(1, 4), Some(4));
        assert!(matches!(
            strides.validate(2, 4, 8).unwrap_err(),
            Error::PreconditionError(PreconditionError::StrideOverflow { n_rows: 2, .. })
        ));
        assert!(Strides::new(1, usize::MAX / 2 + 1)
            .validate(1, 3, usize::MAX)
            .unwrap_err()
            .is_precondition());
    }
}
