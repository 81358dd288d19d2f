use std::io::{self, Cursor, Write};

use bytes::Bytes;
use flv::header::write_avc_end_of_sequence;
use flv::io::WriteFlvExt;
use flv::{
    AudioTagHeader, FileHeader, FlvError, MediaSink, ScriptBody, TagHeader, TagType,
    VideoTagHeader,
};

use crate::config::RemuxConfig;
use crate::error::{ErrorKind, RemuxError};
use crate::metadata::{FileAnchors, Metadata};
use crate::source::ByteSource;

/// Opens the next output file. Called once per file, lazily.
pub trait SinkFactory {
    type Sink: MediaSink;

    fn create(&mut self) -> io::Result<Self::Sink>;
}

impl<F, S> SinkFactory for F
where
    F: FnMut() -> io::Result<S>,
    S: MediaSink,
{
    type Sink = S;

    fn create(&mut self) -> io::Result<S> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Begin,
    ReadingTagHeader,
    ReadingTagBody,
    /// Skipping the extra bytes of a file header longer than 9 bytes.
    ReadingDummy,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
enum Track {
    Audio,
    Video,
}

impl Track {
    fn name(self) -> &'static str {
        match self {
            Track::Audio => "AAC",
            Track::Video => "AVC",
        }
    }
}

/// Timestamps of the file being written, already rebased.
#[derive(Debug)]
struct Timeline {
    /// Raw timestamp that maps to 0 in the current file.
    base: Option<i32>,
    audio_ms: i32,
    video_ms: i32,
    last_keyframe_ms: i32,
}

impl Timeline {
    fn new(min_keyframe_interval_ms: i32) -> Self {
        Self {
            base: None,
            audio_ms: 0,
            video_ms: 0,
            // the first keyframe is always indexed
            last_keyframe_ms: -min_keyframe_interval_ms,
        }
    }

    fn rebase(&mut self, raw: i32) -> Result<i32, RemuxError> {
        let base = *self.base.get_or_insert(raw);
        i32::try_from(raw as i64 - base as i64)
            .map_err(|_| RemuxError::parse(format!("timestamp {} out of range", raw)))
    }

    /// Makes `raw` the new zero and forgets the running durations.
    fn restart_at(&mut self, raw: i32, min_keyframe_interval_ms: i32) {
        *self = Self::new(min_keyframe_interval_ms);
        self.base = Some(raw);
    }

    fn duration_ms(&self) -> i32 {
        self.audio_ms.max(self.video_ms)
    }
}

struct Output<S> {
    sink: S,
    anchors: FileAnchors,
}

/// Push-driven FLV remuxer.
///
/// Feed it with [`Remuxer::on_data`] whenever new input arrives. It consumes
/// whole units only, so a tag split across reads waits in the source until the
/// rest shows up. Output files are opened through the [`SinkFactory`] when the
/// first media tag needs to be written, and again whenever the keyframe index
/// of the current file runs full.
pub struct Remuxer<F: SinkFactory> {
    config: RemuxConfig,
    factory: F,
    state: State,
    bytes_required: usize,
    read_bytes: u64,
    error: Option<ErrorKind>,

    tag_header: TagHeader,
    /// File header plus the zero previous tag size, as written to every file.
    file_header: Bytes,
    metadata: Option<Metadata>,
    aac_sequence_header: Option<Bytes>,
    avc_sequence_header: Option<Bytes>,

    timeline: Timeline,
    closed_duration_ms: i64,
    files_opened: u32,
    output: Option<Output<F::Sink>>,
}

impl<F: SinkFactory> Remuxer<F> {
    pub fn new(config: RemuxConfig, factory: F) -> Self {
        let timeline = Timeline::new(config.min_keyframe_interval_ms);
        Self {
            config,
            factory,
            state: State::Begin,
            bytes_required: FileHeader::SIZE + 4,
            read_bytes: 0,
            error: None,
            tag_header: TagHeader::new(TagType::Script, 0, 0),
            file_header: Bytes::new(),
            metadata: None,
            aac_sequence_header: None,
            avc_sequence_header: None,
            timeline,
            closed_duration_ms: 0,
            files_opened: 0,
            output: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Total input bytes consumed so far.
    pub fn read_bytes(&self) -> u64 {
        self.read_bytes
    }

    /// Duration of all closed files plus the current one, in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.closed_duration_ms + self.timeline.duration_ms() as i64
    }

    pub fn files_opened(&self) -> u32 {
        self.files_opened
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error
    }

    pub fn error_string(&self) -> &'static str {
        self.error.map(ErrorKind::as_str).unwrap_or("")
    }

    /// Consumes every complete unit `input` holds. On error the current file
    /// is closed and the remuxer stops; later calls return `Ok` and do nothing.
    pub fn on_data<S: ByteSource + ?Sized>(&mut self, input: &mut S) -> Result<(), RemuxError> {
        while self.state != State::Stopped && input.available() >= self.bytes_required {
            let chunk = input.read_bytes(self.bytes_required);
            self.read_bytes += chunk.len() as u64;
            if let Err(e) = self.handle_chunk(chunk) {
                self.fail(&e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Closes the current file, leaving it playable. Idempotent.
    pub fn stop(&mut self) -> Result<(), RemuxError> {
        if self.state == State::Stopped {
            return Ok(());
        }
        self.state = State::Stopped;
        let result = self.close_file();
        if let Err(e) = &result {
            tracing::error!("[remux] {}", e);
            self.error.get_or_insert(e.kind());
        }
        result
    }

    fn fail(&mut self, e: &RemuxError) {
        tracing::error!("[remux] {}", e);
        self.error = Some(e.kind());
        self.state = State::Stopped;
        if let Err(close_err) = self.close_file() {
            tracing::warn!("[remux] closing after error failed: {}", close_err);
        }
    }

    fn expect_tag_header(&mut self) {
        self.state = State::ReadingTagHeader;
        self.bytes_required = TagHeader::SIZE;
    }

    fn handle_chunk(&mut self, chunk: Bytes) -> Result<(), RemuxError> {
        match self.state {
            State::Begin => self.handle_file_header(&chunk),
            State::ReadingDummy => {
                tracing::debug!("[remux] skipped {} extra file header bytes", chunk.len());
                self.expect_tag_header();
                Ok(())
            }
            State::ReadingTagHeader => self.handle_tag_header(&chunk),
            State::ReadingTagBody => {
                self.handle_tag_body(chunk)?;
                self.expect_tag_header();
                Ok(())
            }
            State::Stopped => Ok(()),
        }
    }

    fn handle_file_header(&mut self, chunk: &[u8]) -> Result<(), RemuxError> {
        let mut header = FileHeader::read_from(&mut &chunk[..])?;
        let data_offset = header.data_offset;
        if data_offset < FileHeader::SIZE as u32 {
            return Err(FlvError::InvalidDataOffset(data_offset).into());
        }
        if data_offset > FileHeader::SIZE as u32 {
            self.state = State::ReadingDummy;
            self.bytes_required = (data_offset - FileHeader::SIZE as u32) as usize;
            header.data_offset = FileHeader::SIZE as u32;
        } else {
            self.expect_tag_header();
        }

        let mut buf = Vec::with_capacity(FileHeader::SIZE + 4);
        header.write_to(&mut buf)?;
        buf.write_ui32(0)?;
        self.file_header = Bytes::from(buf);
        tracing::debug!(
            "[remux] FLV v{} header, audio: {}, video: {}",
            header.version,
            header.has_audio(),
            header.has_video()
        );
        Ok(())
    }

    fn handle_tag_header(&mut self, chunk: &[u8]) -> Result<(), RemuxError> {
        let header = TagHeader::read_from(&mut &chunk[..])?;
        if self.metadata.is_none() && header.tag_type() != TagType::Script {
            return Err(RemuxError::parse(format!(
                "{:?} tag before onMetaData",
                header.tag_type()
            )));
        }
        self.tag_header = header;
        self.state = State::ReadingTagBody;
        self.bytes_required = header.data_size as usize + 4;
        Ok(())
    }

    /// `chunk` is the tag data followed by the 4-byte trailer. The trailer is
    /// recomputed on write.
    fn handle_tag_body(&mut self, chunk: Bytes) -> Result<(), RemuxError> {
        let body = chunk.slice(..chunk.len() - 4);
        match self.tag_header.tag_type() {
            TagType::Script => self.handle_script(&body),
            TagType::Audio => self.handle_audio(body),
            TagType::Video => self.handle_video(body),
            TagType::Other(id) => Err(RemuxError::parse(format!("unknown tag type {}", id))),
        }
    }

    fn handle_script(&mut self, body: &[u8]) -> Result<(), RemuxError> {
        let script = ScriptBody::read_from(&mut &body[..])?;
        if !script.is_on_metadata() {
            return Err(RemuxError::parse("script tag other than onMetaData"));
        }
        if self.metadata.is_some() {
            tracing::debug!("[remux] ignoring repeated onMetaData");
            return Ok(());
        }
        self.metadata = Some(Metadata::decorate(script.value, &self.config)?);
        tracing::debug!("[remux] onMetaData received");
        Ok(())
    }

    fn handle_audio(&mut self, body: Bytes) -> Result<(), RemuxError> {
        let header = AudioTagHeader::read_from(&mut &body[..])?;
        let payload = body.slice(header.len()..);

        if header.is_aac_sequence_header {
            self.tag_header.timestamp = 0;
            return self.cache_sequence_header(Track::Audio, &header.raw, &payload);
        }

        let timestamp = self.timeline.rebase(self.tag_header.timestamp)?;
        if timestamp < self.timeline.audio_ms {
            return Err(RemuxError::parse(format!(
                "audio timestamp went backwards from {} to {}",
                self.timeline.audio_ms, timestamp
            )));
        }
        self.timeline.audio_ms = timestamp;
        self.tag_header.timestamp = timestamp;
        self.write_media_tag(&header.raw, &payload)
    }

    fn handle_video(&mut self, body: Bytes) -> Result<(), RemuxError> {
        let header = VideoTagHeader::read_from(&mut &body[..])?;
        let payload = body.slice(header.len()..);

        if header.is_avc_sequence_header() {
            self.tag_header.timestamp = 0;
            return self.cache_sequence_header(Track::Video, &header.raw, &payload);
        }

        let raw_timestamp = self.tag_header.timestamp;
        let mut timestamp = self.timeline.rebase(raw_timestamp)?;
        if timestamp < self.timeline.video_ms {
            return Err(RemuxError::parse(format!(
                "video timestamp went backwards from {} to {}",
                self.timeline.video_ms, timestamp
            )));
        }
        self.timeline.video_ms = timestamp;
        self.ensure_output()?;

        let since_last = timestamp as i64 - self.timeline.last_keyframe_ms as i64;
        if header.is_keyframe() && since_last >= self.config.min_keyframe_interval_ms as i64 {
            if self.index_is_full() {
                self.split_file(raw_timestamp)?;
                timestamp = 0;
            }
            self.record_keyframe(timestamp)?;
        }

        self.tag_header.timestamp = timestamp;
        self.write_media_tag(&header.raw, &payload)
    }

    fn cache_sequence_header(
        &mut self,
        track: Track,
        media_header: &[u8],
        payload: &[u8],
    ) -> Result<(), RemuxError> {
        let mut buf = Vec::with_capacity(TagHeader::SIZE + self.tag_header.data_size as usize + 4);
        write_tag(&mut buf, &self.tag_header, media_header, payload)?;
        let tag = Bytes::from(buf);

        let slot = match track {
            Track::Audio => &mut self.aac_sequence_header,
            Track::Video => &mut self.avc_sequence_header,
        };
        match slot {
            Some(cached) if *cached != tag => {
                return Err(RemuxError::parse(format!(
                    "{} sequence header changed",
                    track.name()
                )))
            }
            Some(_) => tracing::debug!("[remux] repeated {} sequence header", track.name()),
            None => tracing::debug!("[remux] {} sequence header cached", track.name()),
        }
        *slot = Some(tag.clone());

        if let Some(output) = self.output.as_mut() {
            output.sink.write_all(&tag)?;
        }
        Ok(())
    }

    fn index_is_full(&self) -> bool {
        self.output
            .as_ref()
            .map(|output| output.anchors.is_full())
            .unwrap_or(false)
    }

    fn record_keyframe(&mut self, timestamp: i32) -> Result<(), RemuxError> {
        let Some(output) = self.output.as_mut() else {
            return Ok(());
        };
        let position = output.sink.position()?;
        output
            .anchors
            .record_keyframe(&mut output.sink, position, timestamp)?;
        output
            .anchors
            .update_duration(&mut output.sink, self.timeline.duration_ms())?;
        self.timeline.last_keyframe_ms = timestamp;
        Ok(())
    }

    /// Closes the current file and continues in a new one starting at the
    /// tag with timestamp `raw_timestamp`.
    fn split_file(&mut self, raw_timestamp: i32) -> Result<(), RemuxError> {
        tracing::info!(
            "[remux] keyframe index of file #{} is full, starting a new file",
            self.files_opened
        );
        self.open_new_file()?;
        self.closed_duration_ms += self.timeline.duration_ms() as i64;
        self.timeline
            .restart_at(raw_timestamp, self.config.min_keyframe_interval_ms);
        Ok(())
    }

    fn ensure_output(&mut self) -> Result<(), RemuxError> {
        if self.output.is_none() {
            self.open_new_file()?;
        }
        Ok(())
    }

    fn write_media_tag(&mut self, media_header: &[u8], payload: &[u8]) -> Result<(), RemuxError> {
        self.ensure_output()?;
        if let Some(output) = self.output.as_mut() {
            write_tag(&mut output.sink, &self.tag_header, media_header, payload)?;
        }
        Ok(())
    }

    /// Closes the current file, if any, and starts the next one with the file
    /// header, the metadata and the cached sequence headers.
    fn open_new_file(&mut self) -> Result<(), RemuxError> {
        self.close_file()?;
        let Some(metadata) = self.metadata.as_ref() else {
            return Err(RemuxError::parse("media tag before onMetaData"));
        };

        let mut sink = self.factory.create().map_err(RemuxError::OutputOpen)?;
        sink.write_all(&self.file_header)?;

        let mut body = Cursor::new(Vec::new());
        let mut anchors = metadata.write_body(&mut body)?;
        let body = body.into_inner();
        let header = TagHeader::new(TagType::Script, body.len() as u32, 0);
        let body_position = sink.position()? + TagHeader::SIZE as u64;
        header.write_to(&mut sink)?;
        sink.write_all(&body)?;
        sink.write_ui32(header.tag_size())?;
        anchors.shift(body_position);

        for tag in [&self.aac_sequence_header, &self.avc_sequence_header]
            .into_iter()
            .flatten()
        {
            sink.write_all(tag)?;
        }

        self.files_opened += 1;
        tracing::info!("[remux] opened output file #{}", self.files_opened);
        self.output = Some(Output { sink, anchors });
        Ok(())
    }

    /// Finalizes the current file: last index entry, end-of-sequence tag and
    /// the real duration.
    fn close_file(&mut self) -> Result<(), RemuxError> {
        let Some(mut output) = self.output.take() else {
            return Ok(());
        };
        let video_ms = self.timeline.video_ms;
        if self.avc_sequence_header.is_some() {
            let position = output.sink.position()?;
            output
                .anchors
                .record_keyframe(&mut output.sink, position, video_ms)?;
            write_avc_end_of_sequence(&mut output.sink, video_ms)?;
        }
        output
            .anchors
            .update_duration(&mut output.sink, self.timeline.duration_ms())?;
        output.sink.flush()?;
        tracing::info!(
            "[remux] closed output file #{}, duration {} ms",
            self.files_opened,
            self.timeline.duration_ms()
        );
        Ok(())
    }
}

impl<F: SinkFactory> Drop for Remuxer<F> {
    fn drop(&mut self) {
        if let Err(e) = self.close_file() {
            tracing::warn!("[remux] closing output file on drop failed: {}", e);
        }
    }
}

fn write_tag<W: Write + ?Sized>(
    out: &mut W,
    header: &TagHeader,
    media_header: &[u8],
    payload: &[u8],
) -> io::Result<()> {
    header.write_to(out)?;
    out.write_all(media_header)?;
    out.write_all(payload)?;
    out.write_ui32(header.tag_size())
}
