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
//! [gelf-tracing](crate) errors

use backtrace::Backtrace;

/// [gelf-tracing](crate) error type
///
/// [gelf-tracing](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis what the caller will
/// need to respond.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// A GELF message contained a value that can't be represented as JSON
    Serialization {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// The zlib encoder failed
    Compression {
        source: std::io::Error,
        back: Backtrace,
    },
    /// Bad host, port or chunk size, detected at construction time
    Configuration { what: String, back: Backtrace },
    /// The payload would need more chunks than the header can count
    TooManyChunks {
        pieces: usize,
        max: usize,
        back: Backtrace,
    },
    /// Failed to fetch hostname (via libc)
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl Error {
    pub(crate) fn configuration(what: impl Into<String>) -> Error {
        Error::Configuration {
            what: what.into(),
            back: Backtrace::new(),
        }
    }
    pub(crate) fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Serialization { source, .. } => {
                write!(f, "The GELF message could not be serialized: {}", source)
            }
            Error::Compression { source, .. } => {
                write!(f, "The GELF payload could not be compressed: {}", source)
            }
            Error::Configuration { what, .. } => write!(f, "Bad configuration: {}", what),
            Error::TooManyChunks { pieces, max, .. } => write!(
                f,
                "The payload would require {} chunks, but at most {} may be sent",
                pieces, max
            ),
            Error::NoHostname { source, .. } => {
                write!(f, "Couldn't determine the local hostname: {}", source)
            }
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            _ => write!(f, "Other gelf-tracing error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Serialization { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Compression { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Configuration { what: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::TooManyChunks { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::NoHostname { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Transport { source: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "gelf-tracing error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialization { source, .. } => Some(source),
            Error::Compression { source, .. } => Some(source),
            Error::NoHostname { source, .. } => Some(source.as_ref()),
            Error::Transport { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
