//! Chunked copying with bounded memory
//!
//! Every file body is moved through a single caller-owned buffer, so peak
//! memory is the chunk size no matter how large the file is.

use std::io::{self, Read, Write};

/// Default chunk size for streaming file bodies: 5 MiB
pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Which side of a copy failed
#[derive(Debug)]
pub(crate) enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Copy `reader` into `writer` one buffer at a time. Returns the byte count.
pub(crate) fn copy_chunked<R, W>(
    reader: &mut R,
    writer: &mut W,
    buf: &mut [u8],
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut total = 0u64;
    loop {
        let len = match reader.read(buf) {
            Ok(0) => return Ok(total),
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        writer.write_all(&buf[..len]).map_err(CopyError::Write)?;
        total += len as u64;
    }
}

/// Like [`copy_chunked`], but hands each chunk to a fallible sink closure.
///
/// Used by codecs whose write side is not an `io::Write`.
pub(crate) fn for_each_chunk<R, E, F>(
    reader: &mut R,
    buf: &mut [u8],
    mut sink: F,
) -> Result<u64, ChunkError<E>>
where
    R: Read + ?Sized,
    F: FnMut(&[u8]) -> Result<(), E>,
{
    let mut total = 0u64;
    loop {
        let len = match reader.read(buf) {
            Ok(0) => return Ok(total),
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ChunkError::Read(e)),
        };
        sink(&buf[..len]).map_err(ChunkError::Sink)?;
        total += len as u64;
    }
}

#[derive(Debug)]
pub(crate) enum ChunkError<E> {
    Read(io::Error),
    Sink(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that reports how large each requested read was
    struct Recording<'a> {
        data: &'a [u8],
        reads: Vec<usize>,
    }

    impl Read for Recording<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.push(buf.len());
            self.data.read(buf)
        }
    }

    #[test]
    fn copies_across_chunk_boundaries() {
        for size in [0usize, 7, 8, 9, 31, 32, 33] {
            let data: Vec<u8> = (0..size).map(|i| i as u8).collect();
            let mut out = Vec::new();
            let mut buf = [0u8; 8];
            let copied = copy_chunked(&mut &data[..], &mut out, &mut buf).unwrap();
            assert_eq!(copied, size as u64);
            assert_eq!(out, data);
        }
    }

    #[test]
    fn never_requests_more_than_one_chunk() {
        let data = vec![1u8; 100];
        let mut reader = Recording {
            data: &data,
            reads: Vec::new(),
        };
        let mut buf = [0u8; 16];
        copy_chunked(&mut reader, &mut io::sink(), &mut buf).unwrap();
        assert!(reader.reads.iter().all(|&n| n == 16));
        // 100 bytes in 16-byte chunks: 7 reads with data plus the final empty one
        assert_eq!(reader.reads.len(), 8);
    }

    #[test]
    fn attributes_failures_to_the_right_side() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("bad sector"))
            }
        }
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut buf = [0u8; 4];
        assert!(matches!(
            copy_chunked(&mut Broken, &mut Vec::new(), &mut buf),
            Err(CopyError::Read(_))
        ));
        assert!(matches!(
            copy_chunked(&mut &b"data"[..], &mut Broken, &mut buf),
            Err(CopyError::Write(_))
        ));
    }

    #[test]
    fn chunk_sink_errors_are_kept_apart() {
        let mut buf = [0u8; 2];
        let mut seen = Vec::new();
        let copied = for_each_chunk::<_, (), _>(&mut &b"abcde"[..], &mut buf, |chunk| {
            seen.push(chunk.to_vec());
            Ok(())
        })
        .unwrap();
        assert_eq!(copied, 5);
        assert_eq!(seen, vec![b"ab".to_vec(), b"cd".to_vec(), b"e".to_vec()]);

        let err = for_each_chunk(&mut &b"abc"[..], &mut buf, |_| Err("full")).unwrap_err();
        assert!(matches!(err, ChunkError::Sink("full")));
    }
}
