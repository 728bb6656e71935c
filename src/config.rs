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

//! Where & how to send GELF messages.
//!
//! # Examples
//!
//! ```rust
//! use gelf_tracing::config::{ChunkSize, Config};
//! let config = Config::builder()
//!     .host("graylog.local")
//!     .port(12201)
//!     .chunk_size(ChunkSize::LAN)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.address(), "graylog.local:12201");
//! ```
//!
//! A zero chunk size is refused up front:
//!
//! ```rust
//! use gelf_tracing::config::ChunkSize;
//! assert!(ChunkSize::new(0).is_err());
//! ```

use crate::{
    chunker::Framing,
    error::{Error, Result},
};

use std::{env, str::FromStr};

/// The port GELF receivers listen on by convention
pub const DEFAULT_PORT: u16 = 12201;

/// The largest payload sent in one datagram; anything this size or bigger is chunked.
///
/// Pick [`ChunkSize::WAN`] when messages may cross the Internet, [`ChunkSize::LAN`] when they
/// stay on a local network with a larger path MTU.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkSize(usize);

impl ChunkSize {
    pub const WAN: ChunkSize = ChunkSize(1420);
    pub const LAN: ChunkSize = ChunkSize(8154);

    pub fn new(size: usize) -> Result<ChunkSize> {
        if size == 0 {
            Err(Error::configuration("the chunk size must be positive"))
        } else {
            Ok(ChunkSize(size))
        }
    }
    pub fn get(&self) -> usize {
        self.0
    }
}

impl std::default::Default for ChunkSize {
    fn default() -> Self {
        ChunkSize::WAN
    }
}

impl FromStr for ChunkSize {
    type Err = Error;
    /// Either one of the preset names ("wan", "lan") or a positive number of bytes
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wan" => Ok(ChunkSize::WAN),
            "lan" => Ok(ChunkSize::LAN),
            n => n
                .parse::<usize>()
                .map_err(|_| Error::configuration(format!("bad chunk size '{}'", s)))
                .and_then(ChunkSize::new),
        }
    }
}

/// GELF destination & chunking parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub chunk_size: ChunkSize,
    pub framing: Framing,
}

impl std::default::Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            chunk_size: ChunkSize::default(),
            framing: Framing::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            imp: Config::default(),
        }
    }
    /// `host:port`, suitable for [`std::net::ToSocketAddrs`]
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            // bare IPv6 literal
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::configuration("no GELF host given"));
        }
        if self.port == 0 {
            return Err(Error::configuration("the GELF port must be non-zero"));
        }
        if self.chunk_size.get() == 0 {
            return Err(Error::configuration("the chunk size must be positive"));
        }
        Ok(())
    }
    /// Start from the defaults & apply whatever of `GELF_HOST`, `GELF_PORT`, `GELF_CHUNK_SIZE` &
    /// `GELF_FRAMING` are set (and non-empty).
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        read_environment(&mut config.host, "GELF_HOST")?;
        read_environment(&mut config.port, "GELF_PORT")?;
        read_environment(&mut config.chunk_size, "GELF_CHUNK_SIZE")?;
        read_environment(&mut config.framing, "GELF_FRAMING")?;
        config.validate()?;
        Ok(config)
    }
}

fn read_environment<T>(into: &mut T, name: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        // The environment variable exists, but is empty
        Ok(ref v) if v.is_empty() => Ok(()),
        // The environment variable does not exist
        Err(env::VarError::NotPresent) => Ok(()),
        // The environment variable is invalid
        Err(err) => Err(Error::configuration(format!("{}: {}", name, err))),
        // The environment variable has a value
        Ok(v) => {
            *into = T::from_str(&v)
                .map_err(|err| Error::configuration(format!("{}: {}", name, err)))?;
            Ok(())
        }
    }
}

pub struct ConfigBuilder {
    imp: Config,
}

impl ConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.imp.host = host.into();
        self
    }
    pub fn port(mut self, port: u16) -> Self {
        self.imp.port = port;
        self
    }
    pub fn chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.imp.chunk_size = chunk_size;
        self
    }
    pub fn chunk_size_as_usize(mut self, chunk_size: usize) -> Result<Self> {
        self.imp.chunk_size = ChunkSize::new(chunk_size)?;
        Ok(self)
    }
    pub fn framing(mut self, framing: Framing) -> Self {
        self.imp.framing = framing;
        self
    }
    pub fn build(self) -> Result<Config> {
        self.imp.validate()?;
        Ok(self.imp)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn presets() {
        assert_eq!(ChunkSize::WAN.get(), 1420);
        assert_eq!(ChunkSize::LAN.get(), 8154);
        assert_eq!(ChunkSize::default(), ChunkSize::WAN);
        assert_eq!("lan".parse::<ChunkSize>().unwrap(), ChunkSize::LAN);
        assert_eq!("WAN".parse::<ChunkSize>().unwrap(), ChunkSize::WAN);
        assert_eq!("512".parse::<ChunkSize>().unwrap().get(), 512);
        assert!("0".parse::<ChunkSize>().is_err());
        assert!("-3".parse::<ChunkSize>().is_err());
        assert!("big".parse::<ChunkSize>().is_err());
    }

    #[test]
    fn builder() {
        let c = Config::builder().build().unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(c.address(), "localhost:12201");

        let c = Config::builder()
            .host("::1")
            .port(5514)
            .chunk_size_as_usize(100)
            .unwrap()
            .framing(Framing::Compact)
            .build()
            .unwrap();
        assert_eq!(c.address(), "[::1]:5514");
        assert_eq!(c.chunk_size.get(), 100);

        assert!(Config::builder().host("").build().is_err());
        assert!(Config::builder().port(0).build().is_err());
        assert!(Config::builder().chunk_size_as_usize(0).is_err());
    }

    // All environment manipulation lives in this one test so parallel tests can't race on it.
    #[test]
    fn from_env() {
        env::set_var("GELF_HOST", "graylog.internal");
        env::set_var("GELF_PORT", "");
        env::set_var("GELF_CHUNK_SIZE", "lan");
        env::set_var("GELF_FRAMING", "compact");
        let c = Config::from_env().unwrap();
        assert_eq!(c.host, "graylog.internal");
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.chunk_size, ChunkSize::LAN);
        assert_eq!(c.framing, Framing::Compact);

        env::set_var("GELF_PORT", "not-a-port");
        assert!(Config::from_env().is_err());
        env::set_var("GELF_PORT", "12202");
        env::set_var("GELF_CHUNK_SIZE", "0");
        assert!(Config::from_env().is_err());

        for var in ["GELF_HOST", "GELF_PORT", "GELF_CHUNK_SIZE", "GELF_FRAMING"] {
            env::remove_var(var);
        }
        assert_eq!(Config::from_env().unwrap(), Config::default());
    }
}
