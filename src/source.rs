//! Byte sources the chunk reader can fetch packed rows from
//!
//! Every fetch names its own absolute offset. Nothing here keeps a cursor, so a
//! single source can serve concurrent readers.

use std::fs::File;
use std::io::{self, ErrorKind};

use auto_impl::auto_impl;
use memmap2::Mmap;

/// Random-access, read-only view of a whole BED file (header included)
#[auto_impl(&, Box, Arc)]
pub trait BedSource {
    /// Total size of the source in bytes
    fn size(&self) -> io::Result<u64>;

    /// Returns exactly `len` bytes starting at `offset`
    ///
    /// In-memory sources return a slice of themselves; others fill `scratch`
    /// and return it.
    fn fetch<'a>(&'a self, offset: u64, len: usize, scratch: &'a mut Vec<u8>)
        -> io::Result<&'a [u8]>;
}

fn slice_at(bytes: &[u8], offset: u64, len: usize) -> io::Result<&[u8]> {
    let start = usize::try_from(offset).map_err(|_| io::Error::from(ErrorKind::UnexpectedEof))?;
    bytes
        .get(start..start.saturating_add(len))
        .ok_or_else(|| io::Error::from(ErrorKind::UnexpectedEof))
}

impl BedSource for [u8] {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn fetch<'a>(
        &'a self,
        offset: u64,
        len: usize,
        _scratch: &'a mut Vec<u8>,
    ) -> io::Result<&'a [u8]> {
        slice_at(self, offset, len)
    }
}

impl BedSource for Vec<u8> {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn fetch<'a>(
        &'a self,
        offset: u64,
        len: usize,
        _scratch: &'a mut Vec<u8>,
    ) -> io::Result<&'a [u8]> {
        slice_at(self, offset, len)
    }
}

impl BedSource for Mmap {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn fetch<'a>(
        &'a self,
        offset: u64,
        len: usize,
        _scratch: &'a mut Vec<u8>,
    ) -> io::Result<&'a [u8]> {
        slice_at(self, offset, len)
    }
}

impl BedSource for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn fetch<'a>(
        &'a self,
        offset: u64,
        len: usize,
        scratch: &'a mut Vec<u8>,
    ) -> io::Result<&'a [u8]> {
        scratch.clear();
        scratch.resize(len, 0);
        read_exact_at(self, scratch, offset)?;
        Ok(scratch)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::Error::from(ErrorKind::UnexpectedEof)),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod testing {
    use std::io::Write;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_slice_source() -> io::Result<()> {
        let bytes = vec![1u8, 2, 3, 4, 5];
        let mut scratch = Vec::new();
        assert_eq!(bytes.size()?, 5);
        assert_eq!(bytes.fetch(1, 3, &mut scratch)?, &[2, 3, 4]);
        assert!(scratch.is_empty());
        let err = bytes.fetch(4, 2, &mut scratch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        Ok(())
    }

    #[test]
    fn test_file_source_positioned() -> io::Result<()> {
        let mut tmp = tempfile::tempfile()?;
        tmp.write_all(&[9, 8, 7, 6, 5, 4])?;
        let source = Arc::new(tmp);
        let mut scratch = Vec::new();
        assert_eq!(source.size()?, 6);
        assert_eq!(source.fetch(4, 2, &mut scratch)?, &[5, 4]);
        // fetching earlier bytes afterwards does not depend on a cursor
        assert_eq!(source.fetch(0, 3, &mut scratch)?, &[9, 8, 7]);
        assert!(source.fetch(5, 4, &mut scratch).is_err());
        Ok(())
    }
}
