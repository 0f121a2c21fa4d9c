//! Pack/unpack codec
//!
//! Every value that crosses a process or service boundary is packed into
//! a JSON text blob. Streams carry packed values back to back with no
//! framing beyond the JSON syntax itself, so a reader that hits EOF in
//! the middle of a value reports [`PackError::Truncated`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors raised by the codec
#[derive(Debug, Error)]
pub enum PackError {
    #[error("failed to pack value: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to unpack value: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("stream ended before a complete value was read")]
    Truncated,

    #[error("stream i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    fn from_read(error: serde_json::Error) -> Self {
        match error.classify() {
            Category::Eof => PackError::Truncated,
            Category::Io => PackError::Io(error.into()),
            _ => PackError::Decode(error),
        }
    }
}

/// Packs a value into a blob
pub fn pack<T: Serialize>(value: &T) -> Result<String, PackError> {
    serde_json::to_string(value).map_err(PackError::Encode)
}

/// Unpacks a blob produced by [`pack`]
pub fn unpack<T: DeserializeOwned>(blob: &str) -> Result<T, PackError> {
    serde_json::from_str(blob).map_err(PackError::from_read)
}

/// Writes one packed value onto a stream
///
/// The caller is responsible for flushing.
pub fn write_value<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), PackError> {
    serde_json::to_writer(&mut *writer, value).map_err(|e| match e.classify() {
        Category::Io => PackError::Io(e.into()),
        _ => PackError::Encode(e),
    })?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Reads consecutive packed values from one stream
pub struct ValueReader<R: Read> {
    de: serde_json::Deserializer<serde_json::de::IoRead<R>>,
}

impl<R: Read> ValueReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            de: serde_json::Deserializer::from_reader(reader),
        }
    }

    /// Reads the next value; EOF before it completes is `Truncated`
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, PackError> {
        T::deserialize(&mut self.de).map_err(PackError::from_read)
    }
}
