//! Live FLV remuxer.
//!
//! Consumes an FLV byte stream as it arrives and writes it back out as one or
//! more standalone files. Every file starts at timestamp 0, carries the stream
//! metadata with a keyframe index, and has its duration patched on close.

mod config;
mod error;
mod metadata;
mod remuxer;
mod source;


pub use config::RemuxConfig;
pub use error::{ErrorKind, RemuxError};
pub use remuxer::{Remuxer, SinkFactory, State};
pub use source::{ByteSource, StreamBuffer};
