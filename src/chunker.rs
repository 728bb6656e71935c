// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// gelf-tracing is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with gelf-tracing.  If
// not, see <http://www.gnu.org/licenses/>.

//! Chunked GELF.
//!
//! A payload too large for one datagram is cut into `size`-byte pieces (the last may be shorter),
//! and each piece is sent behind a header:
//!
//! ```text
//! +-----------+------------+----------+-------------+---------...
//! | 0x1e 0x0f | message id | sequence | piece count | payload slice
//! +-----------+------------+----------+-------------+---------...
//! ```
//!
//! All pieces of one payload share the message id, which is how a receiver groups them. The width
//! of the last three fields depends on the [`Framing`]:
//!
//! | framing             | id                                | sequence   | count      |
//! |---------------------|-----------------------------------|------------|------------|
//! | [`Framing::Wide`]    | 32 bytes (8 random bytes, 4 times) | 2 bytes BE | 2 bytes BE |
//! | [`Framing::Compact`] | 8 bytes                           | 1 byte     | 1 byte     |
//!
//! Graylog (& most other GELF receivers) speak only the compact framing.

use crate::error::{Error, Result};

use backtrace::Backtrace;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

/// Marks a datagram as a GELF chunk
pub const MAGIC: [u8; 2] = [0x1e, 0x0f];

/// Chunk header layout
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Framing {
    /// 32-byte message id, 16-bit sequence number & piece count
    #[default]
    Wide,
    /// 8-byte message id, 8-bit sequence number & piece count; at most 128 pieces
    Compact,
}

impl Framing {
    /// The number of bytes each chunk's header adds
    pub fn header_len(&self) -> usize {
        match self {
            Framing::Wide => 2 + 32 + 2 + 2,
            Framing::Compact => 2 + 8 + 1 + 1,
        }
    }
    /// The largest number of pieces a single payload may be split into
    pub fn max_pieces(&self) -> usize {
        match self {
            Framing::Wide => u16::MAX as usize,
            Framing::Compact => 128,
        }
    }
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framing::Wide => write!(f, "wide"),
            Framing::Compact => write!(f, "compact"),
        }
    }
}

impl std::str::FromStr for Framing {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wide" => Ok(Framing::Wide),
            "compact" => Ok(Framing::Compact),
            _ => Err(Error::configuration(format!("unknown chunk framing '{}'", s))),
        }
    }
}

/// Identifies all the chunks of one payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(id: u64) -> MessageId {
        MessageId(id)
    }
    pub fn random() -> MessageId {
        MessageId(rand::random())
    }
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Splits a payload into encoded chunks.
///
/// The message id is fixed when the [`Chunker`] is created, so iterating it again (or building a
/// new one over the same payload with [`Chunker::with_id`]) produces byte-for-byte the same
/// chunks.
#[derive(Clone, Debug)]
pub struct Chunker<'a> {
    message: &'a [u8],
    size: usize,
    id: MessageId,
    framing: Framing,
    pieces: usize,
}

impl<'a> Chunker<'a> {
    /// Chunk `message` into `size`-byte pieces under a freshly generated message id.
    pub fn new(message: &'a [u8], size: usize, framing: Framing) -> Result<Chunker<'a>> {
        Chunker::with_id(message, size, framing, MessageId::random())
    }
    /// Chunk `message` into `size`-byte pieces under message id `id`.
    pub fn with_id(
        message: &'a [u8],
        size: usize,
        framing: Framing,
        id: MessageId,
    ) -> Result<Chunker<'a>> {
        if size == 0 {
            return Err(Error::configuration("the chunk size must be positive"));
        }
        let pieces = message.len() / size + usize::from(message.len() % size != 0);
        if pieces > framing.max_pieces() {
            return Err(Error::TooManyChunks {
                pieces,
                max: framing.max_pieces(),
                back: Backtrace::new(),
            });
        }
        trace!(
            message_id = id.get(),
            pieces = pieces,
            chunk_size = size,
            framing = %framing,
            "Generating chunks for GELF."
        );
        Ok(Chunker {
            message,
            size,
            id,
            framing,
            pieces,
        })
    }
    pub fn id(&self) -> MessageId {
        self.id
    }
    /// The number of chunks this payload will be sent in
    pub fn pieces(&self) -> usize {
        self.pieces
    }
    /// Frame `chunk` as piece number `sequence` of this payload.
    ///
    /// `sequence` must be less than [`Chunker::pieces`]; the header has no room for anything
    /// larger (debug builds will panic on an out-of-range `sequence`).
    pub fn encode(&self, sequence: usize, chunk: &[u8]) -> Bytes {
        debug_assert!(
            sequence < self.pieces,
            "chunk sequence {} out of range (0..{})",
            sequence,
            self.pieces
        );
        encode(self.id, self.framing, sequence, self.pieces, chunk)
    }
    /// Iterate over the encoded chunks, in sequence order.
    pub fn iter(&self) -> Chunks<'a> {
        Chunks {
            id: self.id,
            framing: self.framing,
            pieces: self.pieces,
            inner: self.message.chunks(self.size).enumerate(),
        }
    }
}

impl<'a, 'c> IntoIterator for &'c Chunker<'a> {
    type Item = Bytes;
    type IntoIter = Chunks<'a>;
    fn into_iter(self) -> Chunks<'a> {
        self.iter()
    }
}

fn encode(id: MessageId, framing: Framing, sequence: usize, pieces: usize, chunk: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(framing.header_len() + chunk.len());
    buf.put_slice(&MAGIC);
    match framing {
        Framing::Wide => {
            for _ in 0..4 {
                buf.put_u64(id.get());
            }
            buf.put_u16(sequence as u16);
            buf.put_u16(pieces as u16);
        }
        Framing::Compact => {
            buf.put_u64(id.get());
            buf.put_u8(sequence as u8);
            buf.put_u8(pieces as u8);
        }
    }
    buf.put_slice(chunk);
    buf.freeze()
}

/// Iterator over a [`Chunker`]'s encoded chunks
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
    id: MessageId,
    framing: Framing,
    pieces: usize,
    inner: std::iter::Enumerate<std::slice::Chunks<'a, u8>>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Bytes;
    fn next(&mut self) -> Option<Bytes> {
        self.inner
            .next()
            .map(|(sequence, chunk)| encode(self.id, self.framing, sequence, self.pieces, chunk))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for Chunks<'a> {}
