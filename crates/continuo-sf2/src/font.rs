//! Structural validation of the sfbk chunk layout.
//!
//! Locates the three LIST children (`INFO`, `sdta`, `pdta`) and checks that
//! every required sub-chunk is present with a record-aligned size before any
//! record parsing begins.

use crate::error::{Error, Result};
use crate::riff::{Chunk, FourCc, Riff, LIST, RIFF};

pub(crate) struct InfoChunks<'a> {
    pub ifil: &'a Chunk,
    pub isng: Option<&'a Chunk>,
    pub inam: Option<&'a Chunk>,
    pub irom: Option<&'a Chunk>,
    pub iver: Option<&'a Chunk>,
    pub icrd: Option<&'a Chunk>,
    pub ieng: Option<&'a Chunk>,
    pub iprd: Option<&'a Chunk>,
    pub icop: Option<&'a Chunk>,
    pub icmt: Option<&'a Chunk>,
    pub isft: Option<&'a Chunk>,
}

pub(crate) struct PdtaChunks<'a> {
    pub phdr: &'a Chunk,
    pub pbag: &'a Chunk,
    pub pmod: &'a Chunk,
    pub pgen: &'a Chunk,
    pub inst: &'a Chunk,
    pub ibag: &'a Chunk,
    pub imod: &'a Chunk,
    pub igen: &'a Chunk,
    pub shdr: &'a Chunk,
}

pub(crate) struct FontChunks<'a> {
    pub info: InfoChunks<'a>,
    pub smpl: &'a Chunk,
    pub sm24: Option<&'a Chunk>,
    pub pdta: PdtaChunks<'a>,
}

impl<'a> FontChunks<'a> {
    pub(crate) fn locate(riff: &'a Riff) -> Result<FontChunks<'a>> {
        let chunks = riff.chunks();
        let first = chunks.first().ok_or(Error::NotSoundFont)?;
        if first.id != RIFF || first.kind != Some(FourCc::new(b"sfbk")) {
            return Err(Error::NotSoundFont);
        }

        let info_index = riff
            .index_by_id_kind(LIST, FourCc::new(b"INFO"), 0)
            .ok_or(Error::MissingChunk("INFO"))?;
        let info = InfoChunks {
            ifil: require(riff, "ifil", info_index)?,
            isng: riff.chunk_by_id(FourCc::new(b"isng"), info_index),
            inam: riff.chunk_by_id(FourCc::new(b"INAM"), info_index),
            irom: riff.chunk_by_id(FourCc::new(b"irom"), info_index),
            iver: riff.chunk_by_id(FourCc::new(b"iver"), info_index),
            icrd: riff.chunk_by_id(FourCc::new(b"ICRD"), info_index),
            ieng: riff.chunk_by_id(FourCc::new(b"IENG"), info_index),
            iprd: riff.chunk_by_id(FourCc::new(b"IPRD"), info_index),
            icop: riff.chunk_by_id(FourCc::new(b"ICOP"), info_index),
            icmt: riff.chunk_by_id(FourCc::new(b"ICMT"), info_index),
            isft: riff.chunk_by_id(FourCc::new(b"ISFT"), info_index),
        };

        let sdta_index = riff
            .index_by_id_kind(LIST, FourCc::new(b"sdta"), 0)
            .ok_or(Error::MissingChunk("sdta"))?;
        let smpl = require(riff, "smpl", sdta_index)?;
        let sm24 = riff.chunk_by_id(FourCc::new(b"sm24"), sdta_index);

        let pdta_index = riff
            .index_by_id_kind(LIST, FourCc::new(b"pdta"), 0)
            .ok_or(Error::MissingChunk("pdta"))?;
        let pdta = PdtaChunks {
            phdr: require_aligned(riff, "phdr", pdta_index, 38)?,
            pbag: require_aligned(riff, "pbag", pdta_index, 4)?,
            pmod: require_aligned(riff, "pmod", pdta_index, 10)?,
            pgen: require_aligned(riff, "pgen", pdta_index, 4)?,
            inst: require_aligned(riff, "inst", pdta_index, 22)?,
            ibag: require_aligned(riff, "ibag", pdta_index, 4)?,
            imod: require_aligned(riff, "imod", pdta_index, 10)?,
            igen: require_aligned(riff, "igen", pdta_index, 4)?,
            shdr: require_aligned(riff, "shdr", pdta_index, 46)?,
        };

        Ok(FontChunks {
            info,
            smpl,
            sm24,
            pdta,
        })
    }
}

fn require<'a>(riff: &'a Riff, name: &'static str, start: usize) -> Result<&'a Chunk> {
    let mut id = [0u8; 4];
    id.copy_from_slice(name.as_bytes());
    riff.chunk_by_id(FourCc(id), start)
        .ok_or(Error::MissingChunk(name))
}

fn require_aligned<'a>(
    riff: &'a Riff,
    name: &'static str,
    start: usize,
    record_size: u32,
) -> Result<&'a Chunk> {
    let chunk = require(riff, name, start)?;
    if chunk.size % record_size != 0 {
        return Err(Error::MisalignedChunk {
            chunk: name,
            size: chunk.size,
            record_size,
        });
    }
    Ok(chunk)
}
