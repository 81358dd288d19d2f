//! Output sinks for remuxed files.
//!
//! Patching the keyframe index and the duration in place needs a sink that can
//! seek. Sequential sinks are accepted too; they only lose the patching.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};

pub trait MediaSink: Write {
    /// Current write position, counted from the start of the file.
    fn position(&mut self) -> io::Result<u64>;

    /// Whether [`MediaSink::seek_to`] is supported.
    fn is_random_access(&self) -> bool;

    fn seek_to(&mut self, pos: u64) -> io::Result<()>;
}

macro_rules! impl_random_access_sink {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MediaSink for $ty {
                fn position(&mut self) -> io::Result<u64> {
                    self.stream_position()
                }

                fn is_random_access(&self) -> bool {
                    true
                }

                fn seek_to(&mut self, pos: u64) -> io::Result<()> {
                    self.seek(SeekFrom::Start(pos)).map(|_| ())
                }
            }
        )*
    };
}

impl_random_access_sink!(File, Cursor<Vec<u8>>, Cursor<&mut Vec<u8>>);

impl<W: Write + Seek> MediaSink for BufWriter<W> {
    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn is_random_access(&self) -> bool {
        true
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(pos)).map(|_| ())
    }
}

impl<S: MediaSink + ?Sized> MediaSink for Box<S> {
    fn position(&mut self) -> io::Result<u64> {
        (**self).position()
    }

    fn is_random_access(&self) -> bool {
        (**self).is_random_access()
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        (**self).seek_to(pos)
    }
}

/// Append-only wrapper. Tracks the position itself and refuses to seek.
pub struct Sequential<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Sequential<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for Sequential<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> MediaSink for Sequential<W> {
    fn position(&mut self) -> io::Result<u64> {
        Ok(self.written)
    }

    fn is_random_access(&self) -> bool {
        false
    }

    fn seek_to(&mut self, _pos: u64) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "sequential sink cannot seek",
        ))
    }
}

/// In-memory file whose contents stay readable after the writer is dropped.
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Cursor<Vec<u8>>> {
        // poisoned only if a writer panicked mid-write; the bytes are still readable
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().get_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl MediaSink for MemorySink {
    fn position(&mut self) -> io::Result<u64> {
        Ok(self.lock().position())
    }

    fn is_random_access(&self) -> bool {
        true
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.lock().set_position(pos);
        Ok(())
    }
}
