//! Floating-point dosage view of genotype codes
//!
//! Downstream numeric code usually wants allele counts as `f32` with missing
//! calls as `NaN`. The count can be taken relative to either allele of the
//! variant.

use crate::codec::{HET, HOM_FIRST, HOM_SECOND, MISSING};
use crate::error::{PreconditionError, Result};

/// Which allele a dosage counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Allele {
    /// Count copies of the first allele (`a0`)
    A0,
    /// Count copies of the second allele (`a1`)
    #[default]
    A1,
}

/// Converts a logical genotype code into a dosage
///
/// Missing calls become `NaN`. Counting `A0` mirrors the scale: `|x - 2|`.
#[inline]
#[must_use]
pub fn code_to_dosage(code: u8, allele: Allele) -> f32 {
    let dosage = match code & 0b11 {
        HOM_FIRST => 0.0,
        HET => 1.0,
        HOM_SECOND => 2.0,
        _ => return f32::NAN,
    };
    match allele {
        Allele::A1 => dosage,
        Allele::A0 => 2.0 - dosage,
    }
}

/// Converts an `A1` dosage back into a logical genotype code
///
/// `row` and `col` only serve the error report.
///
/// # Errors
///
/// Only `0.0`, `1.0`, `2.0` and `NaN` are encodable.
#[allow(clippy::float_cmp)]
pub fn dosage_to_code(value: f32, row: usize, col: usize) -> Result<u8> {
    if value.is_nan() {
        Ok(MISSING)
    } else if value == 0.0 {
        Ok(HOM_FIRST)
    } else if value == 1.0 {
        Ok(HET)
    } else if value == 2.0 {
        Ok(HOM_SECOND)
    } else {
        Err(PreconditionError::InvalidDosage { row, col, value }.into())
    }
}
