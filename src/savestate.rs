//! Chunked save-state codec.
//!
//! Binary format (little-endian), nestable:
//!   [0..4]  Chunk id: three ASCII characters plus a version byte
//!   [4..8]  Payload length: u32
//!   [8..]   Payload: fixed-width fields in declared order, or inner chunks
//!
//! A board writes one family chunk holding its inner chunks. Loaders walk
//! chunk ids with `begin()`, read what they recognize and call `end()`,
//! which skips whatever was left unread.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::debug_flags;

const HEADER_SIZE: usize = 8;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state truncated: needed {needed} bytes at offset {offset}, chunk ends at {end}")]
    Truncated { offset: usize, needed: usize, end: usize },
    #[error("chunk {id} claims {len} bytes, only {available} remain in its parent")]
    Overrun { id: ChunkId, len: usize, available: usize },
    #[error("invalid state data: {0}")]
    Invalid(&'static str),
    #[error("block encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Four-byte chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId([u8; 4]);

impl ChunkId {
    pub const fn new(name: [u8; 3], version: u8) -> Self {
        ChunkId([name[0], name[1], name[2], version])
    }

    pub const fn bytes(self) -> [u8; 4] {
        self.0
    }

    pub const fn version(self) -> u8 {
        self.0[3]
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0[..3] {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        write!(f, "/{}", self.0[3])
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({self})")
    }
}

// ─── Saver ───────────────────────────────────────────────────

#[derive(Default)]
pub struct StateSaver {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl StateSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: ChunkId) -> &mut Self {
        self.buf.extend_from_slice(&id.0);
        self.open.push(self.buf.len());
        self.buf.extend_from_slice(&[0; 4]);
        if debug_flags::state() {
            log::trace!("save: begin {} depth {}", id, self.open.len());
        }
        self
    }

    pub fn write8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Append a register block as its fixed-width bincode encoding.
    pub fn write_block<T: Serialize>(&mut self, block: &T) -> Result<&mut Self, StateError> {
        let bytes = bincode::serialize(block)?;
        self.buf.extend_from_slice(&bytes);
        Ok(self)
    }

    /// Close the innermost chunk and patch its length.
    pub fn end(&mut self) -> &mut Self {
        let Some(len_pos) = self.open.pop() else {
            debug_assert!(false, "end() without begin()");
            return self;
        };
        let len = (self.buf.len() - len_pos - 4) as u32;
        self.buf[len_pos..len_pos + 4].copy_from_slice(&len.to_le_bytes());
        self
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        debug_assert!(self.open.is_empty(), "unclosed chunks at into_bytes()");
        while !self.open.is_empty() {
            self.end();
        }
        self.buf
    }
}

// ─── Loader ──────────────────────────────────────────────────

pub struct StateLoader<'a> {
    data: &'a [u8],
    pos: usize,
    ends: Vec<usize>,
}

impl<'a> StateLoader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            ends: Vec::new(),
        }
    }

    fn limit(&self) -> usize {
        self.ends.last().copied().unwrap_or(self.data.len())
    }

    /// Open the next chunk in the current scope; `None` when the scope is exhausted.
    pub fn begin(&mut self) -> Result<Option<ChunkId>, StateError> {
        let limit = self.limit();
        if self.pos >= limit {
            return Ok(None);
        }
        if self.pos + HEADER_SIZE > limit {
            return Err(StateError::Truncated {
                offset: self.pos,
                needed: HEADER_SIZE,
                end: limit,
            });
        }
        let mut id = [0; 4];
        id.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        let id = ChunkId(id);
        let mut len = [0; 4];
        len.copy_from_slice(&self.data[self.pos + 4..self.pos + 8]);
        let len = u32::from_le_bytes(len) as usize;

        let start = self.pos + HEADER_SIZE;
        let available = limit - start;
        if len > available {
            return Err(StateError::Overrun { id, len, available });
        }
        self.pos = start;
        self.ends.push(start + len);
        if debug_flags::state() {
            log::trace!("load: begin {} ({} bytes) depth {}", id, len, self.ends.len());
        }
        Ok(Some(id))
    }

    /// Leave the innermost chunk, skipping any unread payload.
    pub fn end(&mut self) {
        if let Some(end) = self.ends.pop() {
            self.pos = end;
        }
    }

    pub fn depth(&self) -> usize {
        self.ends.len()
    }

    /// Close chunks until only `depth` remain open.
    pub fn unwind(&mut self, depth: usize) {
        while self.ends.len() > depth {
            self.end();
        }
    }

    /// Bytes left in the innermost chunk.
    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.pos)
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], StateError> {
        let end = self.limit();
        if self.pos + needed > end {
            return Err(StateError::Truncated {
                offset: self.pos,
                needed,
                end,
            });
        }
        let slice = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    pub fn read8(&mut self) -> Result<u8, StateError> {
        Ok(self.take(1)?[0])
    }

    pub fn read16(&mut self) -> Result<u16, StateError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read32(&mut self) -> Result<u32, StateError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read<const N: usize>(&mut self) -> Result<[u8; N], StateError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Everything left in the innermost chunk.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let end = self.limit().max(self.pos);
        let slice = &self.data[self.pos..end];
        self.pos = end;
        slice
    }

    /// Decode a register block written by `StateSaver::write_block`.
    pub fn read_block<T: DeserializeOwned>(&mut self) -> Result<T, StateError> {
        let rest = &self.data[self.pos..self.limit().max(self.pos)];
        let mut reader = rest;
        let block: T = bincode::deserialize_from(&mut reader)?;
        self.pos += rest.len() - reader.len();
        Ok(block)
    }
}
