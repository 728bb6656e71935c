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

//! GELF payload encoding: UTF-8 JSON, zlib-compressed.

use crate::error::{Error, Result};

use backtrace::Backtrace;
use flate2::{write::ZlibEncoder, Compression};
use serde::Serialize;

use std::io::Write;

/// Serialize `message` to JSON.
///
/// Fails with [`Error::Serialization`] rather than dropping or nulling a field that can't be
/// represented.
pub fn serialize<M: Serialize + ?Sized>(message: &M) -> Result<Vec<u8>> {
    serde_json::to_vec(message).map_err(|err| Error::Serialization {
        source: err,
        back: Backtrace::new(),
    })
}

/// zlib-compress `bytes` at the default level.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .map_err(|err| Error::Compression {
            source: err,
            back: Backtrace::new(),
        })
}

/// Produce the wire payload for `message`: JSON, then zlib.
pub fn encode<M: Serialize + ?Sized>(message: &M) -> Result<Vec<u8>> {
    compress(&serialize(message)?)
}
