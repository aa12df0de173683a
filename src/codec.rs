//! Bit-packing transform between packed BED bytes and logical genotype codes
//!
//! Each body byte holds four 2-bit cells along the file's minor axis, cell `i`
//! occupying bits `2i..2i+2` (cell 0 is least significant). The on-disk (raw)
//! ordering is PLINK's:
//!
//! | raw    | meaning                | logical |
//! | ------ | ---------------------- | ------- |
//! | `0b00` | homozygous first       | 0       |
//! | `0b01` | missing                | 3       |
//! | `0b10` | heterozygous           | 1       |
//! | `0b11` | homozygous second      | 2       |
//!
//! The logical codes are ordinal (`0, 1, 2` count second alleles) with `3`
//! reserved for missing.

/// Number of genotype cells packed in a single byte
pub const CODES_PER_BYTE: usize = 4;

/// Logical code of a homozygous call for the first allele
pub const HOM_FIRST: u8 = 0;
/// Logical code of a heterozygous call
pub const HET: u8 = 1;
/// Logical code of a homozygous call for the second allele
pub const HOM_SECOND: u8 = 2;
/// Logical code of a missing call
pub const MISSING: u8 = 3;

/// A single decoded genotype call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Genotype {
    HomFirst = HOM_FIRST,
    Het = HET,
    HomSecond = HOM_SECOND,
    Missing = MISSING,
}
impl Genotype {
    /// Interprets a logical code, returning `None` for values above 3
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            HOM_FIRST => Some(Self::HomFirst),
            HET => Some(Self::Het),
            HOM_SECOND => Some(Self::HomSecond),
            MISSING => Some(Self::Missing),
            _ => None,
        }
    }

    /// Interprets the low two bits of `raw` as an on-disk cell
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw_to_code(raw) {
            HOM_FIRST => Self::HomFirst,
            HET => Self::Het,
            HOM_SECOND => Self::HomSecond,
            _ => Self::Missing,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn raw(self) -> u8 {
        code_to_raw(self as u8)
    }

    #[must_use]
    pub fn is_missing(self) -> bool {
        self == Self::Missing
    }
}

/// Maps a 2-bit raw cell to its logical code
///
/// With `x` the high bit and `y` the low bit, the logical code is `(x ^ y) | (y << 1)`.
#[inline]
#[must_use]
pub const fn raw_to_code(raw: u8) -> u8 {
    let x = (raw >> 1) & 1;
    let y = raw & 1;
    (x ^ y) | (y << 1)
}

/// Maps a logical code to its 2-bit raw cell
///
/// Only the low two bits of `code` are considered.
#[inline]
#[must_use]
pub const fn code_to_raw(code: u8) -> u8 {
    let x = (code >> 1) & 1;
    let y = code & 1;
    ((x ^ y) << 1) | x
}

const fn build_decode_table() -> [[u8; CODES_PER_BYTE]; 256] {
    let mut table = [[0u8; CODES_PER_BYTE]; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut i = 0;
        while i < CODES_PER_BYTE {
            table[byte][i] = raw_to_code((byte >> (2 * i)) as u8 & 0b11);
            i += 1;
        }
        byte += 1;
    }
    table
}

/// Every possible packed byte, unpacked into its four logical codes
pub static DECODE_TABLE: [[u8; CODES_PER_BYTE]; 256] = build_decode_table();

/// Splits a packed byte into its four logical codes (cell 0 first)
#[inline]
#[must_use]
pub fn unpack_byte(byte: u8) -> [u8; CODES_PER_BYTE] {
    DECODE_TABLE[byte as usize]
}

/// Packs up to four logical codes into one byte
///
/// Cells beyond `codes.len()` are left as zero bits, which is how the trailing
/// byte of a row is padded. Callers are expected to have validated the codes;
/// only their low two bits are used.
#[inline]
#[must_use]
pub fn pack_byte(codes: &[u8]) -> u8 {
    debug_assert!(codes.len() <= CODES_PER_BYTE);
    codes
        .iter()
        .take(CODES_PER_BYTE)
        .enumerate()
        .fold(0u8, |byte, (i, &code)| byte | (code_to_raw(code) << (2 * i)))
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_raw_to_code_table() {
        let decoded: Vec<u8> = (0..4).map(raw_to_code).collect();
        assert_eq!(decoded, vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_code_to_raw_table() {
        let encoded: Vec<u8> = (0..4).map(code_to_raw).collect();
        assert_eq!(encoded, vec![0b00, 0b10, 0b11, 0b01]);
    }

    #[test]
    fn test_every_byte_roundtrips() {
        for byte in 0..=255u8 {
            assert_eq!(pack_byte(&unpack_byte(byte)), byte);
        }
    }

    #[test]
    fn test_known_bytes() {
        assert_eq!(pack_byte(&[0, 1, 2, 3]), 0x78);
        assert_eq!(pack_byte(&[3, 2, 1, 0]), 0x2d);
        assert_eq!(unpack_byte(0x78), [0, 1, 2, 3]);
        assert_eq!(unpack_byte(0xff), [2, 2, 2, 2]);
        assert_eq!(unpack_byte(0x55), [3, 3, 3, 3]);
    }

    #[test]
    fn test_partial_byte_is_zero_padded() {
        assert_eq!(pack_byte(&[1]), 0b0000_0010);
        assert_eq!(pack_byte(&[3, 3]), 0b0000_0101);
        assert_eq!(pack_byte(&[]), 0);
        // missing cells would be 0b01, so the padding must not read back as missing
        assert_eq!(&unpack_byte(pack_byte(&[3]))[1..], &[0, 0, 0]);
    }

    #[test]
    fn test_genotype_conversions() {
        assert_eq!(Genotype::from_raw(0b01), Genotype::Missing);
        assert_eq!(Genotype::from_raw(0b10), Genotype::Het);
        assert_eq!(Genotype::HomSecond.raw(), 0b11);
        assert_eq!(Genotype::from_code(2), Some(Genotype::HomSecond));
        assert_eq!(Genotype::from_code(4), None);
        assert!(Genotype::Missing.is_missing());
        assert_eq!(Genotype::Het.code(), HET);
    }
}
