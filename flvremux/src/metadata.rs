use std::io;

use flv::amf::{write_object_end, write_short_string, MARKER_ECMA_ARRAY, MARKER_OBJECT};
use flv::io::WriteFlvExt;
use flv::{AnchoredNumber, MediaSink, Properties, ReservedArray, Value};

use crate::config::RemuxConfig;
use crate::error::RemuxError;

const ON_METADATA: &str = "onMetaData";
const COMMENT: &str = "Comment";
const DURATION: &str = "duration";
const KEYFRAMES: &str = "keyframes";
const FILEPOSITIONS: &str = "filepositions";
const TIMES: &str = "times";

/// The source stream's `onMetaData` properties, decorated once and written at
/// the head of every output file.
#[derive(Debug, Clone)]
pub(crate) struct Metadata {
    properties: Properties,
    keyframe_capacity: u32,
}

impl Metadata {
    pub fn decorate(value: Value, config: &RemuxConfig) -> Result<Self, RemuxError> {
        let mut properties = match value.into_ecma_array() {
            Value::EcmaArray(p) => p,
            other => {
                return Err(RemuxError::parse(format!(
                    "onMetaData value has AMF0 marker {}, expected an object",
                    other.marker()
                )))
            }
        };
        properties.insert(COMMENT, Value::string(config.comment.clone()));
        // placeholders, both are written through anchors
        properties.insert(DURATION, Value::Number(0.0));
        properties.insert(KEYFRAMES, Value::Object(Properties::new()));

        Ok(Self {
            properties,
            keyframe_capacity: config.max_keyframes,
        })
    }

    #[cfg(test)]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Writes the script tag body and returns anchors relative to the start of
    /// `out`.
    pub fn write_body<W: MediaSink + ?Sized>(&self, out: &mut W) -> io::Result<FileAnchors> {
        let mut anchors = FileAnchors {
            duration: AnchoredNumber::new(),
            filepositions: ReservedArray::new(FILEPOSITIONS, self.keyframe_capacity),
            times: ReservedArray::new(TIMES, self.keyframe_capacity),
        };

        Value::string(ON_METADATA).write_to(out)?;
        out.write_ui8(MARKER_ECMA_ARRAY)?;
        out.write_ui32(self.properties.len() as u32)?;
        for property in &self.properties {
            write_short_string(out, &property.name)?;
            if property.name_is(DURATION) {
                anchors.duration.write_to(out, 0.0)?;
            } else if property.name_is(KEYFRAMES) {
                out.write_ui8(MARKER_OBJECT)?;
                anchors.filepositions.write_to(out)?;
                anchors.times.write_to(out)?;
                write_object_end(out)?;
            } else {
                property.value.write_to(out)?;
            }
        }
        write_object_end(out)?;
        Ok(anchors)
    }
}

/// Patch points inside the metadata of the file being written.
#[derive(Debug)]
pub(crate) struct FileAnchors {
    duration: AnchoredNumber,
    filepositions: ReservedArray,
    times: ReservedArray,
}

impl FileAnchors {
    pub fn shift(&mut self, delta: u64) {
        self.duration.shift(delta);
        self.filepositions.shift(delta);
        self.times.shift(delta);
    }

    pub fn is_full(&self) -> bool {
        self.times.is_full()
    }

    pub fn record_keyframe<W: MediaSink + ?Sized>(
        &mut self,
        out: &mut W,
        position: u64,
        time_ms: i32,
    ) -> io::Result<()> {
        self.filepositions.append_number(out, position as f64)?;
        self.times.append_number(out, time_ms as f64 / 1000.0)
    }

    pub fn update_duration<W: MediaSink + ?Sized>(
        &self,
        out: &mut W,
        duration_ms: i32,
    ) -> io::Result<()> {
        self.duration.update(out, duration_ms as f64 / 1000.0)
    }
}
