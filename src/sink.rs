use std::io::{self, Write};

use sha2::{Digest, Sha256, Sha512};

/// Buffer capacity for the line sink.
const SINK_BUFFER_CAPACITY: usize = 64 * 1024;

/// Remaining free capacity at or below which the buffer is flushed early.
const FLUSH_LOW_WATER: usize = 2048;

/// Buffered, incrementally-flushed line writer for matched locations.
///
/// Each location is appended as one newline-terminated unit, so only whole
/// lines ever cross the flush boundary. The buffer is flushed proactively
/// once its free space drops to the low-water mark, and unconditionally by
/// [`LineSink::finish`] at the end of the run.
pub struct LineSink<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
}

impl<W: Write> LineSink<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(SINK_BUFFER_CAPACITY, inner)
    }

    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        LineSink {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one location, newline-terminated.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.push(b'\n');

        if self.capacity.saturating_sub(self.buf.len()) <= FLUSH_LOW_WATER {
            self.flush_buf()?;
        }

        Ok(())
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Flush everything through to the underlying writer and hand it back.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_buf()?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Supported digest algorithms for checksum computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256 checksum
    Sha256,
    /// SHA-512 checksum
    Sha512,
}

impl DigestAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

enum DigestState {
    Sha256(Sha256),
    Sha512(Sha512),
}

/// Writer wrapper that hashes the emitted bytes as they stream past,
/// without buffering them.
pub struct DigestWriter<'a, W: Write> {
    inner: &'a mut W,
    state: DigestState,
}

impl<'a, W: Write> DigestWriter<'a, W> {
    pub fn new(inner: &'a mut W, algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Sha256 => DigestState::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => DigestState::Sha512(Sha512::new()),
        };
        DigestWriter { inner, state }
    }

    /// Finalize the digest and return the hex-encoded checksum.
    pub fn finalize(self) -> String {
        match self.state {
            DigestState::Sha256(hasher) => hex::encode(hasher.finalize()),
            DigestState::Sha512(hasher) => hex::encode(hasher.finalize()),
        }
    }
}

impl<'a, W: Write> Write for DigestWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Hash only what the underlying writer actually accepted.
        let written = self.inner.write(buf)?;
        match &mut self.state {
            DigestState::Sha256(hasher) => hasher.update(&buf[..written]),
            DigestState::Sha512(hasher) => hasher.update(&buf[..written]),
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that records how often it is written to.
    #[derive(Default)]
    struct CountingWriter {
        writes: usize,
        bytes: Vec<u8>,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lines_are_newline_terminated_in_order() {
        let mut sink = LineSink::new(Vec::new());
        sink.write_line("anthem/NY/a.json").unwrap();
        sink.write_line("anthem/NY/b.json").unwrap();
        let out = sink.finish().unwrap();
        assert_eq!(out, b"anthem/NY/a.json\nanthem/NY/b.json\n");
    }

    #[test]
    fn small_output_stays_buffered_until_finish() {
        let mut sink = LineSink::new(CountingWriter::default());
        sink.write_line("anthem/NY/a.json").unwrap();
        sink.write_line("anthem/NY/b.json").unwrap();

        let writer = sink.finish().unwrap();
        assert_eq!(writer.writes, 1);
        assert_eq!(writer.bytes, b"anthem/NY/a.json\nanthem/NY/b.json\n");
    }

    #[test]
    fn low_water_mark_triggers_early_flush() {
        // Capacity just above the low-water mark, so the first line that
        // pushes free space to the threshold forces a write.
        let mut sink = LineSink::with_capacity(FLUSH_LOW_WATER + 64, CountingWriter::default());

        let line = "x".repeat(9);
        for _ in 0..12 {
            sink.write_line(&line).unwrap();
        }
        assert!(sink.inner.writes >= 1, "buffer never flushed early");

        // Early flushes only ever emit whole lines.
        assert!(sink.inner.bytes.ends_with(b"\n"));
    }

    #[test]
    fn finish_flushes_the_tail() {
        let mut sink = LineSink::with_capacity(FLUSH_LOW_WATER + 4096, CountingWriter::default());
        sink.write_line("anthem/NY/a.json").unwrap();

        let writer = sink.finish().unwrap();
        assert_eq!(writer.bytes, b"anthem/NY/a.json\n");
    }

    #[test]
    fn digest_writer_hashes_what_it_writes() {
        let mut out = Vec::new();
        let mut writer = DigestWriter::new(&mut out, DigestAlgorithm::Sha256);
        writer.write_all(b"anthem/NY/a.json\n").unwrap();
        let checksum = writer.finalize();

        let expected = hex::encode(Sha256::digest(b"anthem/NY/a.json\n"));
        assert_eq!(checksum, expected);
        assert_eq!(out, b"anthem/NY/a.json\n");
    }

    #[test]
    fn digest_hex_lengths() {
        let mut out = Vec::new();
        let writer = DigestWriter::new(&mut out, DigestAlgorithm::Sha256);
        assert_eq!(writer.finalize().len(), 64);

        let writer = DigestWriter::new(&mut out, DigestAlgorithm::Sha512);
        assert_eq!(writer.finalize().len(), 128);
    }
}
