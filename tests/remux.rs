use std::fs;
use std::path::Path;

use flv::probe::{probe, Probe};
use flv::{TagType, Value};
use flvrec::config::Config;
use flvremux::ErrorKind;
use tempfile::TempDir;

mod common;
use common::{live_stream, never};

fn config(dir: &Path, max_keyframes: u32) -> Config {
    let mut cfg = Config::default();
    cfg.output.dir = dir.to_path_buf();
    cfg.output.name = "room".to_string();
    cfg.remux.max_keyframes = max_keyframes;
    cfg
}

fn probe_path(path: &Path) -> Probe {
    probe(&fs::read(path).unwrap()).unwrap()
}

/// Checks what every recorded file must satisfy on its own.
fn assert_playable(probe: &Probe) {
    assert_eq!(probe.tags[0].header.tag_type(), TagType::Script);
    assert!(matches!(
        probe.metadata.as_ref().map(|m| &m.value),
        Some(Value::EcmaArray(_))
    ));

    let positions = probe.keyframe_positions().unwrap();
    let times = probe.keyframe_times().unwrap();
    assert_eq!(positions.len(), times.len());
    assert!(!times.is_empty());
    assert_eq!(times[0], 0.0);
    assert!(times.windows(2).all(|w| w[0] <= w[1]));

    // every indexed position but the closing one starts a keyframe
    for position in &positions[..positions.len() - 1] {
        let tag = probe
            .tags
            .iter()
            .find(|t| t.offset as f64 == *position)
            .unwrap();
        assert!(tag.video_header().unwrap().is_keyframe());
    }

    let first_media = probe
        .media_tags()
        .find(|t| {
            t.video_header()
                .map(|h| !h.is_avc_sequence_header())
                .unwrap_or(false)
        })
        .unwrap();
    assert_eq!(first_media.header.timestamp, 0);

    let last = probe.tags.last().unwrap();
    assert_eq!(&last.body[..], &[0x17, 0x02, 0, 0, 0]);
}

#[tokio::test]
async fn test_record_file() -> anyhow::Result<()> {
    let input_dir = TempDir::new()?;
    let input_path = input_dir.path().join("input.flv");
    let data = live_stream(73_000, 20, 75);
    fs::write(&input_path, &data)?;

    let out = TempDir::new()?;
    let input = tokio::fs::File::open(&input_path).await?;
    let summary = flvrec::record(config(out.path(), 6000), input, never()).await?;

    assert_eq!(summary.error, None);
    assert_eq!(summary.read_bytes, data.len() as u64);
    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.duration_ms, 19_960);

    let name = summary.files[0].file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("room ["));
    assert!(name.ends_with(".flv"));

    let probe = probe_path(&summary.files[0]);
    assert_playable(&probe);
    assert_eq!(probe.duration(), Some(19.96));
    // one keyframe every 3 s, plus the closing entry
    assert_eq!(
        probe.keyframe_times().unwrap(),
        vec![0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 19.96]
    );
    let props = probe.metadata_properties().unwrap();
    assert_eq!(props.get("width"), Some(&Value::Number(1280.0)));
    Ok(())
}

#[tokio::test]
async fn test_record_splits_files() -> anyhow::Result<()> {
    let data = live_stream(0, 30, 75);
    let out = TempDir::new()?;
    let summary = flvrec::record(config(out.path(), 4), &data[..], never()).await?;

    assert_eq!(summary.error, None);
    assert_eq!(summary.files.len(), 3);
    assert_eq!(summary.duration_ms, 29_960);

    let mut total = 0.0;
    for path in &summary.files {
        let probe = probe_path(path);
        assert_playable(&probe);
        assert!(probe.keyframe_times().unwrap().len() <= 4);
        total += probe.duration().unwrap();
    }
    assert!((total - 29.96).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_record_stops_on_signal() -> anyhow::Result<()> {
    let (mut writer, reader) = tokio::io::duplex(1 << 20);
    let data = live_stream(0, 4, 25);
    tokio::io::AsyncWriteExt::write_all(&mut writer, &data).await?;

    let out = TempDir::new()?;
    // the writer stays open, only the signal ends the recording
    let signal = async {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    };
    let summary = flvrec::record(config(out.path(), 6000), reader, signal).await?;

    assert_eq!(summary.error, None);
    assert_eq!(summary.read_bytes, data.len() as u64);
    assert_playable(&probe_path(&summary.files[0]));
    drop(writer);
    Ok(())
}

#[tokio::test]
async fn test_record_rejects_garbage() -> anyhow::Result<()> {
    let out = TempDir::new()?;
    let summary = flvrec::record(config(out.path(), 6000), &b"not an flv stream"[..], never()).await?;

    assert_eq!(summary.error, Some(ErrorKind::Parse));
    assert!(summary.files.is_empty());
    assert_eq!(fs::read_dir(out.path())?.count(), 0);
    Ok(())
}
