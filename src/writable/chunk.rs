//! Chunk payloads and their encoding tags.

use bytes::Bytes;

/// Encoding tag carried alongside a chunk.
///
/// The stream never transcodes data; the tag is handed to the write handler
/// unchanged so it can interpret the bytes.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Raw bytes.
    Buffer,
    /// UTF-8 text.
    #[default]
    Utf8,
    /// ISO-8859-1 text.
    Latin1,
    /// 7-bit ASCII text.
    Ascii,
    /// Base64 text.
    Base64,
    /// Hexadecimal text.
    Hex,
    /// Little-endian UTF-16 text.
    Utf16le,
}

impl Encoding {
    /// Canonical lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Buffer => "buffer",
            Encoding::Utf8 => "utf8",
            Encoding::Latin1 => "latin1",
            Encoding::Ascii => "ascii",
            Encoding::Base64 => "base64",
            Encoding::Hex => "hex",
            Encoding::Utf16le => "utf16le",
        }
    }
}

/// A chunk handed to a `writev` handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Payload bytes.
    pub data: Bytes,
    /// Encoding tag supplied with the write.
    pub encoding: Encoding,
}

impl Chunk {
    /// Length of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.data.len() }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
}
