use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::PathBuf;

use chrono::{DateTime, Local};
use flvremux::SinkFactory;

/// Creates the recording files: `<dir>/<name> [yyyy.MM.dd] hh.mm.ss.flv`,
/// with ` (n)` appended when that name is taken.
#[derive(Debug)]
pub struct SegmentFiles {
    dir: PathBuf,
    name: String,
    created: Vec<PathBuf>,
}

impl SegmentFiles {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            created: Vec::new(),
        }
    }

    /// Every file created so far, oldest first.
    pub fn created(&self) -> &[PathBuf] {
        &self.created
    }

    pub fn path_for(&self, time: &DateTime<Local>) -> PathBuf {
        let stem = format!("{} {}", self.name, time.format("[%Y.%m.%d] %H.%M.%S"));
        let mut path = self.dir.join(format!("{stem}.flv"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem} ({n}).flv"));
            n += 1;
        }
        path
    }
}

impl SinkFactory for SegmentFiles {
    type Sink = BufWriter<File>;

    fn create(&mut self) -> io::Result<BufWriter<File>> {
        let path = self.path_for(&Local::now());
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
        tracing::info!("[flvrec] recording to {}", path.display());
        self.created.push(path);
        Ok(BufWriter::new(file))
    }
}
