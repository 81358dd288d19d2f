use std::{fmt, io};

use flv::FlvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("FLV parse error: {0}")]
    Parse(String),
    #[error("unsupported video codec {0}, HEVC is not supported")]
    UnsupportedCodec(u8),
    #[error("failed to open output file: {0}")]
    OutputOpen(#[source] io::Error),
    #[error("failed to write output file: {0}")]
    OutputWrite(#[from] io::Error),
}

impl RemuxError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::UnsupportedCodec(_) => ErrorKind::UnsupportedCodec,
            Self::OutputOpen(_) => ErrorKind::OutputOpen,
            Self::OutputWrite(_) => ErrorKind::OutputWrite,
        }
    }
}

/// Decoding errors are all parse errors, except for the codec rejection.
impl From<FlvError> for RemuxError {
    fn from(e: FlvError) -> Self {
        match e {
            FlvError::UnsupportedCodec(id) => Self::UnsupportedCodec(id),
            other => Self::Parse(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    UnsupportedCodec,
    OutputOpen,
    OutputWrite,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "FLV parse error",
            Self::UnsupportedCodec => "HEVC is not supported",
            Self::OutputOpen => "failed to open output file",
            Self::OutputWrite => "failed to write output file",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
