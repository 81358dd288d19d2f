use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use flvremux::{ErrorKind, Remuxer, StreamBuffer};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub mod config;
pub mod output;
pub mod helper;

use config::Config;
use output::SegmentFiles;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of a recording.
#[derive(Debug)]
pub struct Summary {
    pub read_bytes: u64,
    pub duration_ms: i64,
    pub files: Vec<PathBuf>,
    pub error: Option<ErrorKind>,
}

/// Records `input` until it ends, the remuxer fails or `signal` resolves.
/// Remux failures are reported in [`Summary::error`], files written so far
/// are always closed.
pub async fn record<R, S>(cfg: Config, mut input: R, signal: S) -> anyhow::Result<Summary>
where
    R: AsyncRead + Unpin,
    S: Future<Output = ()>,
{
    fs::create_dir_all(&cfg.output.dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create output dir {}: {}",
            cfg.output.dir.display(),
            e
        )
    })?;

    let files = SegmentFiles::new(cfg.output.dir.clone(), cfg.output.name.clone());
    let mut remuxer = Remuxer::new(cfg.remux.clone(), files);
    let mut buffer = StreamBuffer::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    // a zero interval would panic, keep the ticker but never log
    let progress_enabled = cfg.output.progress_interval > 0;
    let period = Duration::from_secs(cfg.output.progress_interval.max(1));
    let mut progress = interval_at(Instant::now() + period, period);
    progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(signal);
    loop {
        tokio::select! {
            _ = &mut signal => {
                info!("[flvrec] stop requested");
                break;
            }
            _ = progress.tick() => {
                if progress_enabled {
                    info!(
                        "[flvrec] read {} bytes, recorded {:.1}s in {} file(s)",
                        remuxer.read_bytes(),
                        remuxer.duration_ms() as f64 / 1000.0,
                        remuxer.files_opened()
                    );
                }
            }
            n = input.read(&mut chunk) => match n {
                Ok(0) => {
                    info!("[flvrec] end of input");
                    break;
                }
                Ok(n) => {
                    buffer.push(&chunk[..n]);
                    if remuxer.on_data(&mut buffer).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("[flvrec] input read error: {}", e);
                    break;
                }
            }
        }
    }

    // failures are already logged and kept in the error kind
    let _ = remuxer.stop();
    if !buffer.is_empty() {
        debug!("[flvrec] {} trailing bytes discarded", buffer.len());
    }

    Ok(Summary {
        read_bytes: remuxer.read_bytes(),
        duration_ms: remuxer.duration_ms(),
        files: remuxer.factory().created().to_vec(),
        error: remuxer.error_kind(),
    })
}
