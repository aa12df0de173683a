//! Utility functions for BED file sizing
//!
//! These helpers compute row and file sizes from matrix dimensions in file space.

use crate::codec::CODES_PER_BYTE;
use crate::header::SIZE_HEADER;

/// Number of packed bytes in one file row holding `n_minor` cells
#[inline]
#[must_use]
pub fn row_size_bytes(n_minor: usize) -> usize {
    n_minor.div_ceil(CODES_PER_BYTE)
}

/// Calculates the expected size in bytes of a BED file
///
/// # Arguments
///
/// * `n_major` - Number of file rows (the slow axis)
/// * `n_minor` - Number of cells in each file row
///
/// # Returns
///
/// The size in bytes, or `None` if it does not fit in a `usize`
///
/// # Examples
///
/// ```
/// use plinkbed::expected_file_size;
///
/// // 3 rows of 5 cells: header + 3 * ceil(5 / 4)
/// assert_eq!(expected_file_size(3, 5), Some(9));
/// ```
#[must_use]
pub fn expected_file_size(n_major: usize, n_minor: usize) -> Option<usize> {
    n_major
        .checked_mul(row_size_bytes(n_minor))?
        .checked_add(SIZE_HEADER)
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_row_size() {
        assert_eq!(row_size_bytes(0), 0);
        assert_eq!(row_size_bytes(1), 1);
        assert_eq!(row_size_bytes(4), 1);
        assert_eq!(row_size_bytes(5), 2);
        assert_eq!(expected_file_size(0, 10), Some(SIZE_HEADER));
        assert_eq!(expected_file_size(usize::MAX, 5), None);
        assert_eq!(expected_file_size(usize::MAX / 2, 8), None);
    }
}
