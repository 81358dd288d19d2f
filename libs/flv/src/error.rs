use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlvError {
    #[error("invalid FLV signature")]
    InvalidSignature,
    #[error("invalid data offset {0} in file header")]
    InvalidDataOffset(u32),
    #[error("filtered (encrypted) tags are not supported")]
    FilteredTag,
    #[error("unsupported video codec id {0}")]
    UnsupportedCodec(u8),
    #[error("AMF value nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("tag at offset {offset} has size {expected}, trailer says {found}")]
    TrailerMismatch { offset: u64, expected: u32, found: u32 },
    #[error("truncated structure: {0}")]
    Io(#[from] io::Error),
}

impl FlvError {
    /// True when the error means "not enough bytes for this structure".
    pub fn is_truncated(&self) -> bool {
        matches!(self, FlvError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T> = std::result::Result<T, FlvError>;
