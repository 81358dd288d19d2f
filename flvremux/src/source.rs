use bytes::{Bytes, BytesMut};

/// Forward-only input of the remuxer.
pub trait ByteSource {
    fn available(&self) -> usize;

    /// Removes and returns the next `len` bytes, or everything left when
    /// fewer are available.
    fn read_bytes(&mut self, len: usize) -> Bytes;
}

/// Growable buffer between a network or file reader and the remuxer.
/// Bytes the remuxer has not asked for yet stay queued.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    buf: BytesMut,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl ByteSource for StreamBuffer {
    fn available(&self) -> usize {
        self.buf.len()
    }

    fn read_bytes(&mut self, len: usize) -> Bytes {
        let len = len.min(self.buf.len());
        self.buf.split_to(len).freeze()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn read_bytes(&mut self, len: usize) -> Bytes {
        (**self).read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_buffer() {
        let mut buf = StreamBuffer::new();
        buf.push(b"hello ");
        buf.push(b"world");
        assert_eq!(buf.available(), 11);
        assert_eq!(&buf.read_bytes(6)[..], b"hello ");
        assert_eq!(buf.len(), 5);
        assert_eq!(&buf.read_bytes(10)[..], b"world");
        assert!(buf.is_empty());
    }
}
