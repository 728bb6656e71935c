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

//! The GELF transport layer.
//!
//! This module defines the [`Transport`] trait that datagram transports must support, the UDP
//! implementation thereof, and [`GelfTransport`], which decides whether a payload goes out as a
//! single datagram or as a sequence of chunks.
//!
//! # Examples
//!
//! To send GELF messages over UDP to a receiver listening on port 12201 (the default) on localhost:
//!
//! ```rust
//! use gelf_tracing::transport::UdpTransport;
//! let transpo = UdpTransport::local().unwrap();
//! ```
//!
//! On a non-standard port on another host:
//!
//! ```rust
//! use gelf_tracing::transport::UdpTransport;
//! let transpo = UdpTransport::new("some-host.domain.invalid:5514");
//! assert!(transpo.is_err()); // no such host, after all
//! ```

use crate::{
    chunker::{Chunker, Framing},
    config::{ChunkSize, Config, DEFAULT_PORT},
    error::{Error, Result},
};

use tracing::debug;

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all datagram transports must support.
///
/// Implementations must be safe to call from several threads at once: each call to
/// [`Transport::send`] is one self-contained datagram.
pub trait Transport {
    /// Send `buf` as a single datagram.
    fn send(&self, buf: &[u8]) -> Result<usize>;
    /// Release whatever resources this transport holds.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Sending GELF messages via UDP datagrams.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    ///
    /// `addr` is resolved once, here; an address that can't be resolved is a configuration error.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<UdpTransport> {
        let peer = addr
            .to_socket_addrs()
            .map_err(|err| Error::configuration(format!("couldn't resolve address: {}", err)))?
            .next()
            .ok_or_else(|| Error::configuration("the address resolved to nothing"))?;
        // Bind to any available port, in the peer's address family
        let local = match peer {
            SocketAddr::V4(_) => "0.0.0.0:0",
            SocketAddr::V6(_) => "[::]:0",
        };
        let socket = UdpSocket::bind(local).map_err(Error::transport)?;
        debug!(peer = %peer, "Bound GELF UDP socket.");
        Ok(UdpTransport { socket, peer })
    }
    /// Construct a [`Transport`] implementation via UDP at localhost:12201
    pub fn local() -> Result<UdpTransport> {
        UdpTransport::new(("localhost", DEFAULT_PORT))
    }
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        self.socket.send_to(buf, self.peer).map_err(Error::transport)
    }
    fn close(self) -> Result<()> {
        debug!(peer = %self.peer, "Closing GELF UDP socket.");
        drop(self.socket);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       struct GelfTransport                                     //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Sends compressed GELF payloads, chunking those that are too large for one datagram.
///
/// Payloads shorter than the chunk size go out as-is. Anything else is handed to a [`Chunker`]
/// and the resulting chunks are sent back-to-back, in sequence order. Nothing is retried: if a
/// chunk can't be sent the error is returned at once & the receiver will never see the whole
/// message.
#[derive(Debug)]
pub struct GelfTransport<T: Transport> {
    transport: T,
    chunk_size: ChunkSize,
    framing: Framing,
}

impl GelfTransport<UdpTransport> {
    /// Open a UDP socket towards the destination in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(GelfTransport::new(
            UdpTransport::new(config.address())?,
            config.chunk_size,
            config.framing,
        ))
    }
}

impl<T: Transport> GelfTransport<T> {
    pub fn new(transport: T, chunk_size: ChunkSize, framing: Framing) -> Self {
        GelfTransport {
            transport,
            chunk_size,
            framing,
        }
    }
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }
    pub fn framing(&self) -> Framing {
        self.framing
    }
    pub fn get_ref(&self) -> &T {
        &self.transport
    }
    /// Send `payload`, in as many datagrams as it takes.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        if payload.len() < self.chunk_size.get() {
            self.transport.send(payload)?;
            return Ok(());
        }
        let chunker = Chunker::new(payload, self.chunk_size.get(), self.framing)?;
        for chunk in &chunker {
            self.transport.send(&chunk)?;
        }
        Ok(())
    }
    pub fn close(self) -> Result<()> {
        self.transport.close()
    }
}
