//! Placeholders written once and patched in place later.
//!
//! An anchor only remembers byte offsets. The sink it was written to is passed
//! again on every update, so the anchor never outlives or aliases the file.

use std::io;

use bytes::Bytes;

use crate::amf::{write_short_string, MARKER_NUMBER, MARKER_STRICT_ARRAY};
use crate::io::WriteFlvExt;
use crate::sink::MediaSink;

/// One AMF0 Number on the wire: marker + double.
const NUMBER_SIZE: usize = 9;

/// A StrictArray of Numbers with a fixed capacity, followed by a spacer array
/// that absorbs the unused capacity. Appending moves bytes from the spacer to
/// the real array, so the total length never changes.
///
/// ```text
/// name  0x0A  count  [Number; count] | nameSpacer  0x0A  capacity-count  [zero; capacity-count]
/// ```
#[derive(Clone, Debug)]
pub struct ReservedArray {
    name: Bytes,
    spacer_name: Bytes,
    capacity: u32,
    len: u32,
    /// Offset of the UI32 element count of the real array.
    count_pos: u64,
    /// Offset right after the last written element.
    append_pos: u64,
}

impl ReservedArray {
    pub fn new(name: &str, capacity: u32) -> Self {
        Self {
            name: Bytes::copy_from_slice(name.as_bytes()),
            spacer_name: Bytes::from(format!("{}Spacer", name)),
            capacity,
            len: 0,
            count_pos: 0,
            append_pos: 0,
        }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Bytes occupied by both arrays including their property names.
    pub fn encoded_len(&self) -> usize {
        (2 + self.name.len() + 1 + 4)
            + (2 + self.spacer_name.len() + 1 + 4)
            + self.capacity as usize * NUMBER_SIZE
    }

    /// Writes both arrays as object members (name, then value) and resets the
    /// element count.
    pub fn write_to<W: MediaSink + ?Sized>(&mut self, out: &mut W) -> io::Result<()> {
        self.len = 0;
        write_short_string(out, &self.name)?;
        out.write_ui8(MARKER_STRICT_ARRAY)?;
        self.count_pos = out.position()?;
        out.write_ui32(0)?;
        self.append_pos = out.position()?;
        self.write_spacer_header(out)?;
        // Number(0.0) is all zero bytes
        out.write_all(&vec![0u8; self.capacity as usize * NUMBER_SIZE])
    }

    /// Appends `value`. Does nothing once full or when `out` cannot seek.
    pub fn append_number<W: MediaSink + ?Sized>(&mut self, out: &mut W, value: f64) -> io::Result<()> {
        if self.is_full() || !out.is_random_access() {
            return Ok(());
        }

        let resume = out.position()?;
        self.len += 1;
        out.seek_to(self.count_pos)?;
        out.write_ui32(self.len)?;
        out.seek_to(self.append_pos)?;
        out.write_ui8(MARKER_NUMBER)?;
        out.write_double(value)?;
        self.append_pos += NUMBER_SIZE as u64;
        self.write_spacer_header(out)?;
        out.seek_to(resume)
    }

    fn write_spacer_header<W: MediaSink + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write_short_string(out, &self.spacer_name)?;
        out.write_ui8(MARKER_STRICT_ARRAY)?;
        out.write_ui32(self.capacity - self.len)
    }

    /// Relocates the anchor after its bytes were copied `delta` bytes further
    /// into the final file.
    pub fn shift(&mut self, delta: u64) {
        self.count_pos += delta;
        self.append_pos += delta;
    }
}

/// A single Number whose value is rewritten in place.
#[derive(Clone, Debug, Default)]
pub struct AnchoredNumber {
    /// Offset of the 8-byte double, right after the marker.
    pos: u64,
}

impl AnchoredNumber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_to<W: MediaSink + ?Sized>(&mut self, out: &mut W, value: f64) -> io::Result<()> {
        out.write_ui8(MARKER_NUMBER)?;
        self.pos = out.position()?;
        out.write_double(value)
    }

    pub fn update<W: MediaSink + ?Sized>(&self, out: &mut W, value: f64) -> io::Result<()> {
        if !out.is_random_access() {
            return Ok(());
        }
        let resume = out.position()?;
        out.seek_to(self.pos)?;
        out.write_double(value)?;
        out.seek_to(resume)
    }

    pub fn shift(&mut self, delta: u64) {
        self.pos += delta;
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use super::*;
    use crate::amf::{Properties, Value};
    use crate::io::ReadFlvExt;
    use crate::sink::Sequential;

    /// Wraps the anchor output in an object so the standard reader can parse it.
    fn parse_object(bytes: &[u8]) -> Properties {
        let mut data = vec![0x03];
        data.extend_from_slice(bytes);
        data.extend_from_slice(&[0, 0, 9]);
        match Value::read_from(&mut &data[..]).unwrap() {
            Value::Object(p) => p,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn numbers(props: &Properties, name: &str) -> Vec<f64> {
        props
            .get(name)
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|v| v.as_number().unwrap())
            .collect()
    }

    #[test]
    fn test_reserved_array_layout() {
        let mut arr = ReservedArray::new("times", 4);
        let mut out = Cursor::new(Vec::new());
        arr.write_to(&mut out).unwrap();
        assert_eq!(out.get_ref().len(), arr.encoded_len());

        let props = parse_object(out.get_ref());
        assert!(numbers(&props, "times").is_empty());
        assert_eq!(numbers(&props, "timesSpacer"), vec![0.0; 4]);
    }

    #[test]
    fn test_reserved_array_append_keeps_length() {
        let mut arr = ReservedArray::new("times", 3);
        let mut out = Cursor::new(Vec::new());
        out.write_all(b"prefix").unwrap();
        arr.write_to(&mut out).unwrap();
        out.write_all(b"tail").unwrap();
        let total = out.get_ref().len();

        arr.append_number(&mut out, 1.5).unwrap();
        arr.append_number(&mut out, 3.0).unwrap();
        assert_eq!(out.get_ref().len(), total);
        assert_eq!(MediaSink::position(&mut out).unwrap(), total as u64);
        assert_eq!(&out.get_ref()[total - 4..], b"tail");

        let body = &out.get_ref()[6..total - 4];
        let props = parse_object(body);
        assert_eq!(numbers(&props, "times"), vec![1.5, 3.0]);
        assert_eq!(numbers(&props, "timesSpacer"), vec![0.0]);
    }

    #[test]
    fn test_reserved_array_full_is_noop() {
        let mut arr = ReservedArray::new("filepositions", 2);
        let mut out = Cursor::new(Vec::new());
        arr.write_to(&mut out).unwrap();
        for v in [1.0, 2.0, 3.0] {
            arr.append_number(&mut out, v).unwrap();
        }
        assert!(arr.is_full());
        assert_eq!(arr.len(), 2);

        let props = parse_object(out.get_ref());
        assert_eq!(numbers(&props, "filepositions"), vec![1.0, 2.0]);
        assert!(numbers(&props, "filepositionsSpacer").is_empty());
    }

    #[test]
    fn test_reserved_array_sequential_sink() {
        let mut arr = ReservedArray::new("times", 2);
        let mut out = Sequential::new(Vec::new());
        arr.write_to(&mut out).unwrap();
        arr.append_number(&mut out, 7.0).unwrap();
        assert!(arr.is_empty());
        let props = parse_object(&out.into_inner());
        assert!(numbers(&props, "times").is_empty());
    }

    #[test]
    fn test_reserved_array_shift() {
        let mut arr = ReservedArray::new("times", 2);
        let mut scratch = Cursor::new(Vec::new());
        arr.write_to(&mut scratch).unwrap();

        let mut file = Cursor::new(Vec::new());
        file.write_all(&[0xEE; 10]).unwrap();
        file.write_all(scratch.get_ref()).unwrap();
        arr.shift(10);
        arr.append_number(&mut file, 4.0).unwrap();

        assert_eq!(&file.get_ref()[..10], &[0xEE; 10]);
        let props = parse_object(&file.get_ref()[10..]);
        assert_eq!(numbers(&props, "times"), vec![4.0]);
    }

    #[test]
    fn test_anchored_number_update() {
        let mut anchor = AnchoredNumber::new();
        let mut out = Cursor::new(Vec::new());
        anchor.write_to(&mut out, 0.0).unwrap();
        out.write_all(b"after").unwrap();
        anchor.update(&mut out, 12.0).unwrap();

        let data = out.get_ref();
        assert_eq!(data[0], MARKER_NUMBER);
        assert_eq!((&data[1..9]).read_double().unwrap(), 12.0);
        assert_eq!(&data[9..], b"after");
        assert_eq!(MediaSink::position(&mut out).unwrap(), 14);
    }

    #[test]
    fn test_anchored_number_sequential_is_noop() {
        let mut anchor = AnchoredNumber::new();
        let mut out = Sequential::new(Vec::new());
        anchor.write_to(&mut out, 0.0).unwrap();
        anchor.update(&mut out, 5.0).unwrap();
        assert_eq!(out.into_inner(), vec![0u8; 9]);
    }
}
