//! Per-board CPU address dispatch.
//!
//! Every board owns one `IoMap` keyed by its own port enum. The table is
//! cleared and refilled at the top of every reset, so nothing from a previous
//! configuration survives. Lookups are a direct index into a 64K table.

use std::ops::RangeInclusive;

/// Inclusive CPU address range, or a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrRange {
    pub start: u16,
    pub end: u16,
}

impl From<u16> for AddrRange {
    fn from(addr: u16) -> Self {
        AddrRange {
            start: addr,
            end: addr,
        }
    }
}

impl From<RangeInclusive<u16>> for AddrRange {
    fn from(range: RangeInclusive<u16>) -> Self {
        AddrRange {
            start: *range.start(),
            end: *range.end(),
        }
    }
}

pub struct IoMap<P> {
    reads: Box<[Option<P>]>,
    writes: Box<[Option<P>]>,
    bindings: usize,
}

impl<P: Copy> IoMap<P> {
    pub fn new() -> Self {
        IoMap {
            reads: vec![None; 0x10000].into_boxed_slice(),
            writes: vec![None; 0x10000].into_boxed_slice(),
            bindings: 0,
        }
    }

    /// Drop every binding. Boards call this first thing in reset.
    pub fn clear(&mut self) {
        self.reads.fill(None);
        self.writes.fill(None);
        self.bindings = 0;
    }

    pub fn map_read(&mut self, range: impl Into<AddrRange>, port: P) {
        let range = range.into();
        Self::fill(&mut self.reads, range, port);
        self.bindings += 1;
    }

    pub fn map_write(&mut self, range: impl Into<AddrRange>, port: P) {
        let range = range.into();
        Self::fill(&mut self.writes, range, port);
        self.bindings += 1;
    }

    /// Claim both directions with separate ports.
    pub fn map(&mut self, range: impl Into<AddrRange>, read: P, write: P) {
        let range = range.into();
        self.map_read(range, read);
        self.map_write(range, write);
    }

    #[inline]
    pub fn read_port(&self, addr: u16) -> Option<P> {
        self.reads[addr as usize]
    }

    #[inline]
    pub fn write_port(&self, addr: u16) -> Option<P> {
        self.writes[addr as usize]
    }

    /// Number of `map_*` calls since the last clear.
    pub fn bindings(&self) -> usize {
        self.bindings
    }

    fn fill(table: &mut [Option<P>], range: AddrRange, port: P) {
        assert!(
            range.start <= range.end,
            "inverted address range {:04X}-{:04X}",
            range.start,
            range.end
        );
        table[range.start as usize..=range.end as usize].fill(Some(port));
    }
}

impl<P: Copy> Default for IoMap<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy> Clone for IoMap<P> {
    fn clone(&self) -> Self {
        IoMap {
            reads: self.reads.clone(),
            writes: self.writes.clone(),
            bindings: self.bindings,
        }
    }
}
