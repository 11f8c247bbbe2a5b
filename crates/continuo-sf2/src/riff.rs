//! Minimal RIFF chunk walker.
//!
//! Collects the flat chunk sequence of a RIFF stream without loading any
//! payload: each chunk records where its data begins so callers can seek
//! back and read exactly what they need. Container chunks (`RIFF`, `LIST`)
//! carry a form/list type and their children follow inline.

use std::fmt;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::Result;

/// A four-character chunk identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({})", self)
    }
}

pub const RIFF: FourCc = FourCc::new(b"RIFF");
pub const LIST: FourCc = FourCc::new(b"LIST");

/// One chunk header. Payload stays in the stream; `data_offset` points at it.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: FourCc,
    /// Payload size in bytes, excluding any pad byte.
    pub size: u32,
    /// Form type for `RIFF` chunks, list type for `LIST` chunks.
    pub kind: Option<FourCc>,
    /// Absolute stream offset of the first payload byte.
    pub data_offset: u64,
}

impl Chunk {
    /// Payload size rounded up to 16-bit alignment.
    pub fn padded_size(&self) -> u64 {
        u64::from(self.size) + u64::from(self.size % 2)
    }

    pub fn is_container(&self) -> bool {
        self.id == RIFF || self.id == LIST
    }
}

/// The flat chunk sequence of a parsed RIFF stream.
///
/// Chunk order matters in RIFF: sub-chunks of a container follow it in the
/// sequence, so lookups take a start index to scope the search.
#[derive(Debug, Default)]
pub struct Riff {
    chunks: Vec<Chunk>,
}

impl Riff {
    /// Walk the stream and collect every chunk header.
    ///
    /// Parsing stops cleanly at end of stream; a header cut short mid-file
    /// terminates the walk the same way.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Riff> {
        let mut chunks = Vec::new();
        loop {
            let mut header = [0u8; 8];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let id = FourCc([header[0], header[1], header[2], header[3]]);
            let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            let mut chunk = Chunk {
                id,
                size,
                kind: None,
                data_offset: 0,
            };
            if chunk.is_container() {
                let mut kind = [0u8; 4];
                match reader.read_exact(&mut kind) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(e.into()),
                }
                chunk.kind = Some(FourCc(kind));
                chunk.data_offset = reader.stream_position()?;
                // Containers hold only sub-chunks; keep walking into them.
            } else {
                chunk.data_offset = reader.stream_position()?;
                reader.seek(SeekFrom::Current(chunk.padded_size() as i64))?;
            }
            chunks.push(chunk);
        }
        Ok(Riff { chunks })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk_by_id(&self, id: FourCc, start: usize) -> Option<&Chunk> {
        self.chunks[start.min(self.chunks.len())..]
            .iter()
            .find(|c| c.id == id)
    }

    pub fn index_by_id_kind(&self, id: FourCc, kind: FourCc, start: usize) -> Option<usize> {
        self.chunks
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, c)| c.id == id && c.kind == Some(kind))
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk_bytes(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(id);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn test_parse_leaf_chunks() {
        let mut bytes = chunk_bytes(b"aaaa", &[1, 2, 3, 4]);
        bytes.extend(chunk_bytes(b"bbbb", &[5, 6]));

        let riff = Riff::parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(riff.chunks().len(), 2);
        assert_eq!(riff.chunks()[0].id, FourCc::new(b"aaaa"));
        assert_eq!(riff.chunks()[0].size, 4);
        assert_eq!(riff.chunks()[0].data_offset, 8);
        assert_eq!(riff.chunks()[1].id, FourCc::new(b"bbbb"));
        assert_eq!(riff.chunks()[1].data_offset, 20);
    }

    #[test]
    fn test_odd_payload_is_padded() {
        let mut bytes = chunk_bytes(b"aaaa", &[1, 2, 3]);
        bytes.extend(chunk_bytes(b"bbbb", &[4]));

        let riff = Riff::parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(riff.chunks().len(), 2);
        // 8-byte header + 3 payload + 1 pad
        assert_eq!(riff.chunks()[1].data_offset, 20);
    }

    #[test]
    fn test_containers_are_descended() {
        let mut inner = chunk_bytes(b"data", &[0; 4]);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&((inner.len() + 4) as u32).to_le_bytes());
        bytes.extend_from_slice(b"sfbk");
        bytes.append(&mut inner);

        let riff = Riff::parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(riff.chunks().len(), 2);
        assert_eq!(riff.chunks()[0].id, RIFF);
        assert_eq!(riff.chunks()[0].kind, Some(FourCc::new(b"sfbk")));
        assert_eq!(riff.chunks()[1].id, FourCc::new(b"data"));
    }

    #[test]
    fn test_truncated_header_ends_parse() {
        let mut bytes = chunk_bytes(b"aaaa", &[1, 2]);
        bytes.extend_from_slice(b"bb"); // torn header

        let riff = Riff::parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(riff.chunks().len(), 1);
    }

    #[test]
    fn test_lookup_by_id_and_kind() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"INFO");
        bytes.extend(chunk_bytes(b"ifil", &[2, 0, 4, 0]));

        let riff = Riff::parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(riff.index_by_id_kind(LIST, FourCc::new(b"INFO"), 0), Some(0));
        assert_eq!(riff.index_by_id_kind(LIST, FourCc::new(b"pdta"), 0), None);
        assert!(riff.chunk_by_id(FourCc::new(b"ifil"), 0).is_some());
        assert!(riff.chunk_by_id(FourCc::new(b"ifil"), 2).is_none());
    }
}
