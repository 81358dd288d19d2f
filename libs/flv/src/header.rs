use std::io::{self, Read, Write};

use bytes::Bytes;

use crate::error::{FlvError, Result};
use crate::io::{ReadFlvExt, WriteFlvExt};

const SIGNATURE: &[u8; 3] = b"FLV";

pub const SOUND_FORMAT_AAC: u8 = 10;
pub const AAC_SEQUENCE_HEADER: u8 = 0;

pub const FRAME_TYPE_KEYFRAME: u8 = 1;
pub const CODEC_ID_AVC: u8 = 7;
pub const CODEC_ID_HEVC: u8 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvcPacketType {
    SequenceHeader,
    Nalu,
    EndOfSequence,
    Other(u8),
}

impl From<u8> for AvcPacketType {
    fn from(v: u8) -> Self {
        match v {
            0 => AvcPacketType::SequenceHeader,
            1 => AvcPacketType::Nalu,
            2 => AvcPacketType::EndOfSequence,
            v => AvcPacketType::Other(v),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagType {
    Audio,
    Video,
    Script,
    Other(u8),
}

impl TagType {
    pub fn id(self) -> u8 {
        match self {
            TagType::Audio => 8,
            TagType::Video => 9,
            TagType::Script => 18,
            TagType::Other(v) => v & 0x1F,
        }
    }
}

impl From<u8> for TagType {
    fn from(v: u8) -> Self {
        match v & 0x1F {
            8 => TagType::Audio,
            9 => TagType::Video,
            18 => TagType::Script,
            v => TagType::Other(v),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u8,
    pub type_flags: u8,
    pub data_offset: u32,
}

impl FileHeader {
    pub const SIZE: usize = 9;

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let mut signature = [0u8; 3];
        r.read_exact(&mut signature)?;
        if &signature != SIGNATURE {
            return Err(FlvError::InvalidSignature);
        }
        Ok(Self {
            version: r.read_ui8()?,
            type_flags: r.read_ui8()?,
            data_offset: r.read_ui32()?,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(SIGNATURE)?;
        w.write_ui8(self.version)?;
        w.write_ui8(self.type_flags)?;
        w.write_ui32(self.data_offset)
    }

    pub fn has_video(&self) -> bool {
        self.type_flags & 0x01 != 0
    }

    pub fn has_audio(&self) -> bool {
        self.type_flags & 0x04 != 0
    }
}

/// The 11 bytes in front of every tag body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagHeader {
    /// Raw flags byte: 5-bit tag type, filter bit, 2 reserved bits.
    pub flags: u8,
    pub data_size: u32,
    /// Milliseconds. Stored as 24 low bits plus an extension byte on the wire.
    pub timestamp: i32,
}

impl TagHeader {
    pub const SIZE: usize = 11;

    pub fn new(tag_type: TagType, data_size: u32, timestamp: i32) -> Self {
        Self {
            flags: tag_type.id(),
            data_size,
            timestamp,
        }
    }

    pub fn tag_type(&self) -> TagType {
        TagType::from(self.flags)
    }

    pub fn is_filtered(&self) -> bool {
        self.flags & 0x20 != 0
    }

    /// Size of the whole tag including this header, as repeated in the trailer.
    pub fn tag_size(&self) -> u32 {
        Self::SIZE as u32 + self.data_size
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let flags = r.read_ui8()?;
        if flags & 0x20 != 0 {
            return Err(FlvError::FilteredTag);
        }
        let data_size = r.read_ui24()?;
        let low = r.read_ui24()?;
        let ext = r.read_ui8()?;
        let _stream_id = r.read_ui24()?;
        Ok(Self {
            flags,
            data_size,
            timestamp: ((ext as u32) << 24 | low) as i32,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        let ts = self.timestamp as u32;
        w.write_ui8(self.flags)?;
        w.write_ui24(self.data_size)?;
        w.write_ui24(ts & 0x00FF_FFFF)?;
        w.write_ui8((ts >> 24) as u8)?;
        w.write_ui24(0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTagHeader {
    /// Header bytes exactly as read, passed through on write.
    pub raw: Bytes,
    pub sound_format: u8,
    pub is_aac_sequence_header: bool,
}

impl AudioTagHeader {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let flags = r.read_ui8()?;
        let sound_format = flags >> 4;
        if sound_format == SOUND_FORMAT_AAC {
            let packet_type = r.read_ui8()?;
            Ok(Self {
                raw: Bytes::copy_from_slice(&[flags, packet_type]),
                sound_format,
                is_aac_sequence_header: packet_type == AAC_SEQUENCE_HEADER,
            })
        } else {
            Ok(Self {
                raw: Bytes::copy_from_slice(&[flags]),
                sound_format,
                is_aac_sequence_header: false,
            })
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.raw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoTagHeader {
    pub raw: Bytes,
    pub frame_type: u8,
    pub codec_id: u8,
    /// Only present for AVC.
    pub packet_type: Option<AvcPacketType>,
}

impl VideoTagHeader {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let flags = r.read_ui8()?;
        let frame_type = flags >> 4;
        let codec_id = flags & 0x0F;
        match codec_id {
            CODEC_ID_HEVC => Err(FlvError::UnsupportedCodec(codec_id)),
            CODEC_ID_AVC => {
                let packet_type = r.read_ui8()?;
                let composition_time = r.read_ui24()?;
                let mut raw = Vec::with_capacity(5);
                raw.push(flags);
                raw.push(packet_type);
                raw.extend_from_slice(&composition_time.to_be_bytes()[1..]);
                Ok(Self {
                    raw: Bytes::from(raw),
                    frame_type,
                    codec_id,
                    packet_type: Some(packet_type.into()),
                })
            }
            _ => Ok(Self {
                raw: Bytes::copy_from_slice(&[flags]),
                frame_type,
                codec_id,
                packet_type: None,
            }),
        }
    }

    pub fn is_keyframe(&self) -> bool {
        self.frame_type == FRAME_TYPE_KEYFRAME
    }

    pub fn is_avc_sequence_header(&self) -> bool {
        self.codec_id == CODEC_ID_AVC && self.packet_type == Some(AvcPacketType::SequenceHeader)
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.raw)
    }
}

/// Writes a complete AVC end-of-sequence tag: 16-byte tag plus its trailer.
pub fn write_avc_end_of_sequence<W: Write + ?Sized>(w: &mut W, timestamp: i32) -> io::Result<()> {
    let header = TagHeader::new(TagType::Video, 5, timestamp);
    header.write_to(w)?;
    // keyframe + AVC, end of sequence, composition time 0
    w.write_all(&[0x17, 0x02, 0x00, 0x00, 0x00])?;
    w.write_ui32(header.tag_size())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_header() {
        let data = [b'F', b'L', b'V', 1, 5, 0, 0, 0, 9];
        let header = FileHeader::read_from(&mut &data[..]).unwrap();
        assert_eq!(header.version, 1);
        assert!(header.has_audio());
        assert!(header.has_video());
        assert_eq!(header.data_offset, 9);

        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_file_header_bad_signature() {
        let data = [b'F', b'L', b'X', 1, 5, 0, 0, 0, 9];
        assert!(matches!(
            FileHeader::read_from(&mut &data[..]),
            Err(FlvError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tag_header_extended_timestamp() {
        let header = TagHeader::new(TagType::Video, 0x123, 0x0102_0304);
        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();
        assert_eq!(out, vec![9, 0x00, 0x01, 0x23, 0x02, 0x03, 0x04, 0x01, 0, 0, 0]);

        let parsed = TagHeader::read_from(&mut &out[..]).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.tag_type(), TagType::Video);
        assert_eq!(parsed.tag_size(), 11 + 0x123);
    }

    #[test]
    fn test_tag_header_filtered() {
        let data = [0x20 | 8, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            TagHeader::read_from(&mut &data[..]),
            Err(FlvError::FilteredTag)
        ));
    }

    #[test]
    fn test_audio_header_aac() {
        let data = [0xAF, 0x00, 0x12, 0x10];
        let mut rd = &data[..];
        let header = AudioTagHeader::read_from(&mut rd).unwrap();
        assert!(header.is_aac_sequence_header);
        assert_eq!(header.raw.as_ref(), &[0xAF, 0x00]);
        assert_eq!(rd, &[0x12, 0x10]);

        let raw = [0xAF, 0x01, 0x21];
        let header = AudioTagHeader::read_from(&mut &raw[..]).unwrap();
        assert!(!header.is_aac_sequence_header);
    }

    #[test]
    fn test_audio_header_mp3() {
        let data = [0x2F, 0xFF];
        let header = AudioTagHeader::read_from(&mut &data[..]).unwrap();
        assert_eq!(header.sound_format, 2);
        assert_eq!(header.len(), 1);
        assert!(!header.is_aac_sequence_header);
    }

    #[test]
    fn test_video_header_avc() {
        let data = [0x17, 0x00, 0x00, 0x00, 0x00, 0x01];
        let mut rd = &data[..];
        let header = VideoTagHeader::read_from(&mut rd).unwrap();
        assert!(header.is_keyframe());
        assert!(header.is_avc_sequence_header());
        assert_eq!(header.len(), 5);
        assert_eq!(rd, &[0x01]);

        let inter = [0x27, 0x01, 0x00, 0x00, 0x21];
        let header = VideoTagHeader::read_from(&mut &inter[..]).unwrap();
        assert!(!header.is_keyframe());
        assert_eq!(header.packet_type, Some(AvcPacketType::Nalu));
        assert_eq!(header.raw.as_ref(), &inter);
    }

    #[test]
    fn test_video_header_hevc_rejected() {
        let data = [0x1C, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            VideoTagHeader::read_from(&mut &data[..]),
            Err(FlvError::UnsupportedCodec(12))
        ));
    }

    #[test]
    fn test_end_of_sequence_tag() {
        let mut out = Vec::new();
        write_avc_end_of_sequence(&mut out, 1500).unwrap();
        assert_eq!(out.len(), 20);
        let header = TagHeader::read_from(&mut &out[..]).unwrap();
        assert_eq!(header.timestamp, 1500);
        assert_eq!(header.data_size, 5);
        assert_eq!(&out[11..16], &[0x17, 0x02, 0, 0, 0]);
        assert_eq!(&out[16..], &16u32.to_be_bytes());
    }
}
