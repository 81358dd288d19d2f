//! Big-endian primitives used by every FLV and AMF0 structure.
//!
//! Names follow the FLV file format document (UI8, UI24, SI16, DOUBLE, ...).

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

pub trait ReadFlvExt: Read {
    fn read_ui8(&mut self) -> io::Result<u8> {
        self.read_u8()
    }

    fn read_ui16(&mut self) -> io::Result<u16> {
        self.read_u16::<BigEndian>()
    }

    fn read_ui24(&mut self) -> io::Result<u32> {
        self.read_u24::<BigEndian>()
    }

    fn read_ui32(&mut self) -> io::Result<u32> {
        self.read_u32::<BigEndian>()
    }

    fn read_si16(&mut self) -> io::Result<i16> {
        self.read_i16::<BigEndian>()
    }

    fn read_double(&mut self) -> io::Result<f64> {
        self.read_f64::<BigEndian>()
    }

    /// Reads exactly `len` bytes. The buffer grows with the data actually
    /// present, so a bogus length cannot force a huge allocation up front.
    fn read_bytes(&mut self, len: usize) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        self.take(len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, got {}", len, buf.len()),
            ));
        }
        Ok(Bytes::from(buf))
    }
}

impl<R: Read + ?Sized> ReadFlvExt for R {}

pub trait WriteFlvExt: Write {
    fn write_ui8(&mut self, v: u8) -> io::Result<()> {
        self.write_u8(v)
    }

    fn write_ui16(&mut self, v: u16) -> io::Result<()> {
        self.write_u16::<BigEndian>(v)
    }

    /// Writes the low 24 bits of `v`.
    fn write_ui24(&mut self, v: u32) -> io::Result<()> {
        self.write_u24::<BigEndian>(v & 0x00FF_FFFF)
    }

    fn write_ui32(&mut self, v: u32) -> io::Result<()> {
        self.write_u32::<BigEndian>(v)
    }

    fn write_si16(&mut self, v: i16) -> io::Result<()> {
        self.write_i16::<BigEndian>(v)
    }

    fn write_double(&mut self, v: f64) -> io::Result<()> {
        self.write_f64::<BigEndian>(v)
    }
}

impl<W: Write + ?Sized> WriteFlvExt for W {}
