//! Structural reader for complete FLV files, used to inspect recordings.

use bytes::Bytes;

use crate::amf::{Properties, ScriptBody, Value};
use crate::error::{FlvError, Result};
use crate::header::{FileHeader, TagHeader, TagType, VideoTagHeader};
use crate::io::ReadFlvExt;

#[derive(Clone, Debug)]
pub struct ProbedTag {
    /// Offset of the tag header from the start of the file.
    pub offset: u64,
    pub header: TagHeader,
    pub body: Bytes,
}

impl ProbedTag {
    pub fn video_header(&self) -> Option<VideoTagHeader> {
        if self.header.tag_type() != TagType::Video {
            return None;
        }
        VideoTagHeader::read_from(&mut &self.body[..]).ok()
    }
}

#[derive(Clone, Debug)]
pub struct Probe {
    pub header: FileHeader,
    pub metadata: Option<ScriptBody>,
    pub tags: Vec<ProbedTag>,
}

impl Probe {
    pub fn metadata_properties(&self) -> Option<&Properties> {
        self.metadata.as_ref()?.value.as_properties()
    }

    pub fn duration(&self) -> Option<f64> {
        self.metadata_properties()?.get("duration")?.as_number()
    }

    pub fn keyframe_positions(&self) -> Option<Vec<f64>> {
        self.keyframe_array("filepositions")
    }

    pub fn keyframe_times(&self) -> Option<Vec<f64>> {
        self.keyframe_array("times")
    }

    fn keyframe_array(&self, name: &str) -> Option<Vec<f64>> {
        let keyframes = self.metadata_properties()?.get("keyframes")?.as_properties()?;
        keyframes
            .get(name)?
            .as_array()?
            .iter()
            .map(Value::as_number)
            .collect()
    }

    /// Audio and video tags, in file order.
    pub fn media_tags(&self) -> impl Iterator<Item = &ProbedTag> {
        self.tags
            .iter()
            .filter(|t| matches!(t.header.tag_type(), TagType::Audio | TagType::Video))
    }
}

/// Parses a whole file, checking every trailer against its tag size.
pub fn probe(data: &[u8]) -> Result<Probe> {
    let mut rd = data;
    let header = FileHeader::read_from(&mut rd)?;
    let skip = (header.data_offset as usize)
        .checked_sub(FileHeader::SIZE)
        .ok_or(FlvError::InvalidDataOffset(header.data_offset))?;
    rd.read_bytes(skip)?;
    let _previous_tag_size = rd.read_ui32()?;

    let mut metadata = None;
    let mut tags = Vec::new();
    while !rd.is_empty() {
        let offset = (data.len() - rd.len()) as u64;
        let tag = TagHeader::read_from(&mut rd)?;
        let body = rd.read_bytes(tag.data_size as usize)?;
        let trailer = rd.read_ui32()?;
        if trailer != tag.tag_size() {
            return Err(FlvError::TrailerMismatch {
                offset,
                expected: tag.tag_size(),
                found: trailer,
            });
        }
        if tag.tag_type() == TagType::Script && metadata.is_none() {
            let script = ScriptBody::read_from(&mut &body[..])?;
            if script.is_on_metadata() {
                metadata = Some(script);
            }
        }
        tags.push(ProbedTag {
            offset,
            header: tag,
            body,
        });
    }

    Ok(Probe {
        header,
        metadata,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::write_avc_end_of_sequence;
    use crate::io::WriteFlvExt;

    fn file_with(tags: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        FileHeader {
            version: 1,
            type_flags: 5,
            data_offset: 9,
        }
        .write_to(&mut out)
        .unwrap();
        out.write_ui32(0).unwrap();
        out.extend_from_slice(tags);
        out
    }

    #[test]
    fn test_probe_reads_tags() {
        let mut tags = Vec::new();
        write_avc_end_of_sequence(&mut tags, 40).unwrap();
        let probe = probe(&file_with(&tags)).unwrap();
        assert!(probe.metadata.is_none());
        assert_eq!(probe.tags.len(), 1);
        assert_eq!(probe.tags[0].offset, 13);
        assert_eq!(probe.tags[0].header.timestamp, 40);
        assert!(probe.tags[0].video_header().unwrap().is_keyframe());
    }

    #[test]
    fn test_probe_trailer_mismatch() {
        let mut tags = Vec::new();
        write_avc_end_of_sequence(&mut tags, 0).unwrap();
        let len = tags.len();
        tags[len - 1] = 99;
        assert!(matches!(
            probe(&file_with(&tags)),
            Err(FlvError::TrailerMismatch { offset: 13, .. })
        ));
    }

    #[test]
    fn test_probe_truncated() {
        let mut tags = Vec::new();
        write_avc_end_of_sequence(&mut tags, 0).unwrap();
        tags.truncate(tags.len() - 2);
        assert!(probe(&file_with(&tags)).unwrap_err().is_truncated());
    }
}
