//! Building blocks for reading and rewriting FLV streams.

pub mod amf;
pub mod anchor;
pub mod error;
pub mod header;
pub mod io;
pub mod probe;
pub mod sink;

pub use amf::{Properties, Property, ScriptBody, Value};
pub use anchor::{AnchoredNumber, ReservedArray};
pub use error::{FlvError, Result};
pub use header::{AudioTagHeader, FileHeader, TagHeader, TagType, VideoTagHeader};
pub use sink::{MediaSink, MemorySink, Sequential};
