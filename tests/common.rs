use flv::io::WriteFlvExt;
use flv::{FileHeader, Properties, Property, ScriptBody, TagHeader, TagType, Value};

/// Stops a recording that should only end with its input.
pub async fn never() {
    std::future::pending::<()>().await
}

/// A live stream shaped like what streaming servers send: metadata, both
/// sequence headers, then 25 fps video with a keyframe every `gop` frames and
/// AAC audio every 23 ms, starting at `start_ms`.
pub fn live_stream(start_ms: i32, seconds: i32, gop: i32) -> Vec<u8> {
    let mut out = Vec::new();
    FileHeader {
        version: 1,
        type_flags: 0x05,
        data_offset: 9,
    }
    .write_to(&mut out)
    .unwrap();
    out.write_ui32(0).unwrap();

    let metadata: Properties = [
        Property::new("width", Value::Number(1280.0)),
        Property::new("height", Value::Number(720.0)),
        Property::new("framerate", Value::Number(25.0)),
    ]
    .into_iter()
    .collect();
    let mut script = Vec::new();
    ScriptBody {
        name: Value::string("onMetaData"),
        value: Value::Object(metadata),
    }
    .write_to(&mut script)
    .unwrap();
    push_tag(&mut out, TagType::Script, 0, &script);
    push_tag(&mut out, TagType::Audio, 0, &[0xAF, 0x00, 0x12, 0x10]);
    push_tag(
        &mut out,
        TagType::Video,
        0,
        &[0x17, 0x00, 0, 0, 0, 0x01, 0x64, 0x00, 0x1F],
    );

    let end = seconds * 1000;
    let (mut frame, mut audio_ms) = (0, 0);
    while frame * 40 < end {
        let video_ms = frame * 40;
        while audio_ms <= video_ms {
            push_tag(&mut out, TagType::Audio, start_ms + audio_ms, &[0xAF, 0x01, 0x21]);
            audio_ms += 23;
        }
        let flags = if frame % gop == 0 { 0x17 } else { 0x27 };
        push_tag(
            &mut out,
            TagType::Video,
            start_ms + video_ms,
            &[flags, 0x01, 0, 0, 0, 0x65, 0x88, 0x84],
        );
        frame += 1;
    }
    out
}

fn push_tag(out: &mut Vec<u8>, tag_type: TagType, timestamp: i32, body: &[u8]) {
    let header = TagHeader::new(tag_type, body.len() as u32, timestamp);
    header.write_to(out).unwrap();
    out.extend_from_slice(body);
    out.write_ui32(header.tag_size()).unwrap();
}
