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

//! The record-to-datagram pipeline.
//!
//! A [`GelfHandler`] owns everything needed to ship a [`LogRecord`]: the [`MessageBuilder`] and a
//! [`GelfTransport`] (and through it, the socket). [`GelfHandler::emit`] runs one record through
//! the whole pipeline synchronously; [`GelfHandler::close`] gives the socket back.

use crate::{
    codec,
    config::{ChunkSize, Config},
    error::Result,
    message::MessageBuilder,
    record::LogRecord,
    transport::{GelfTransport, Transport, UdpTransport},
};

/// Build, encode & send [`LogRecord`]s.
#[derive(Debug)]
pub struct GelfHandler<T: Transport> {
    builder: MessageBuilder,
    transport: GelfTransport<T>,
}

impl GelfHandler<UdpTransport> {
    /// Send to `host:port` over UDP, chunking payloads of `chunk_size` bytes or more.
    pub fn new(host: &str, port: u16, chunk_size: ChunkSize) -> Result<Self> {
        GelfHandler::from_config(
            &Config::builder()
                .host(host)
                .port(port)
                .chunk_size(chunk_size)
                .build()?,
        )
    }
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(GelfHandler {
            builder: MessageBuilder::default(),
            transport: GelfTransport::from_config(config)?,
        })
    }
}

impl<T: Transport> GelfHandler<T> {
    pub fn with_transport(builder: MessageBuilder, transport: GelfTransport<T>) -> Self {
        GelfHandler { builder, transport }
    }
    pub fn builder(&self) -> &MessageBuilder {
        &self.builder
    }
    pub fn transport(&self) -> &GelfTransport<T> {
        &self.transport
    }
    /// The compressed payload for `record`
    pub fn make_payload(&self, record: &LogRecord) -> Result<Vec<u8>> {
        codec::encode(&self.builder.build(record))
    }
    /// Send `record`.
    pub fn emit(&self, record: &LogRecord) -> Result<()> {
        self.transport.send(&self.make_payload(record)?)
    }
    pub fn close(self) -> Result<()> {
        self.transport.close()
    }
}
