//! Bank metadata from the INFO list.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::font::InfoChunks;
use crate::riff::Chunk;

/// `ifil`/`iver` version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

/// Supplemental bank information. Only `version` is structurally required;
/// everything else is empty when the file omits it.
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub version: Version,
    pub sound_engine: String,
    pub name: String,
    pub rom_name: String,
    pub rom_version: Option<Version>,
    pub date: String,
    pub author: String,
    pub product: String,
    pub copyright: String,
    pub comment: String,
    pub tools: String,
}

impl Info {
    pub(crate) fn read<R: Read + Seek>(reader: &mut R, chunks: &InfoChunks<'_>) -> Result<Info> {
        let version = read_version(reader, chunks.ifil)?;
        if version.major != 2 {
            return Err(Error::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
            });
        }

        Ok(Info {
            version,
            sound_engine: read_string(reader, chunks.isng, 256)?,
            name: read_string(reader, chunks.inam, 256)?,
            rom_name: read_string(reader, chunks.irom, 256)?,
            rom_version: match chunks.iver {
                Some(chunk) => Some(read_version(reader, chunk)?),
                None => None,
            },
            date: read_string(reader, chunks.icrd, 256)?,
            author: read_string(reader, chunks.ieng, 256)?,
            product: read_string(reader, chunks.iprd, 256)?,
            copyright: read_string(reader, chunks.icop, 256)?,
            comment: read_string(reader, chunks.icmt, 65536)?,
            tools: read_string(reader, chunks.isft, 256)?,
        })
    }
}

fn read_version<R: Read + Seek>(reader: &mut R, chunk: &Chunk) -> Result<Version> {
    reader.seek(SeekFrom::Start(chunk.data_offset))?;
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(Version {
        major: u16::from_le_bytes([buf[0], buf[1]]),
        minor: u16::from_le_bytes([buf[2], buf[3]]),
    })
}

/// NUL-terminated string chunk, capped at `max_len` bytes.
fn read_string<R: Read + Seek>(
    reader: &mut R,
    chunk: Option<&Chunk>,
    max_len: usize,
) -> Result<String> {
    let Some(chunk) = chunk else {
        return Ok(String::new());
    };
    reader.seek(SeekFrom::Start(chunk.data_offset))?;
    let len = (chunk.size as usize).min(max_len);
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}
