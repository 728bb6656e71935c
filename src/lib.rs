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

//! A [`tracing-subscriber`] [`Layer`] implementation for sending [`tracing`] [`Event`]s to a
//! [GELF] receiver such as [Graylog]
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/0.1.35/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//! [Graylog]: https://graylog.org/
//!
//! # Introduction
//!
//! The Graylog Extended Log Format (GELF) is a JSON document with a handful of well-known fields
//! (`host`, `short_message`, `timestamp`, `level` and so on) plus any number of "additional"
//! fields whose names begin with an underscore. Over UDP, the document is zlib-compressed and sent
//! as a single datagram when it fits; when it doesn't, it's split into "chunks", each prefixed
//! with a small header (magic bytes, a message id, a sequence number and a count) so that the
//! receiver can put the message back together.
//!
//! This crate is organized as a pipeline, each stage of which can be used on its own:
//!
//! 1. a [`LogRecord`](record::LogRecord) is what a logging framework hands us
//!
//! 2. a [`MessageBuilder`](message::MessageBuilder) turns that into a
//!    [`GelfMessage`](message::GelfMessage), deciding which record attributes become additional
//!    fields
//!
//! 3. the [`codec`] module serializes & compresses the message
//!
//! 4. a [`GelfTransport`](transport::GelfTransport) sends the payload, via a
//!    [`Chunker`](chunker::Chunker) if need be
//!
//! The [`GelfHandler`](handler::GelfHandler) ties the stages together, and the
//! [`Layer`](layer::Layer) feeds it from [`tracing`].
//!
//! # Usage
//!
//! [`gelf-tracing`](crate)'s [`Layer`] comes with sane defaults:
//!
//! ```rust
//! use tracing::info;
//! use gelf_tracing::layer::Layer;
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! // The default configuration is to send GELF messages via UDP to port 12201 on the localhost,
//! // chunking anything of 1420 bytes or more.
//! let subscriber = Registry::default().with(Layer::try_default().unwrap());
//!
//! info!(user = "bob", "Hello, world!");
//! ```
//!
//! Will produce a GELF message that looks something like this:
//!
//! ```text
//! {"version":"1.0","host":"hostname","short_message":"Hello, world!","full_message":"",
//!  "timestamp":1700000000.25,"level":6,"facility":"my_app","file":"src/main.rs","line":10,
//!  "_function":"my_app","_pid":1234,"_process_name":"my-app","_thread_name":"main",
//!  "_user":"bob"}
//! ```
//!
//! The destination & chunking parameters are configurable, either in code or through the
//! environment (see [`Config::from_env`](config::Config::from_env)):
//!
//! ```no_run
//! use tracing::info;
//! use gelf_tracing::{config::{ChunkSize, Config}, layer::Layer};
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! let config = Config::builder()
//!     .host("graylog.example.com")
//!     .port(5514)
//!     .chunk_size(ChunkSize::LAN)
//!     .build()
//!     .unwrap();
//! let subscriber = Registry::default().with(Layer::from_config(&config).unwrap());
//!
//! info!("Hello, world!");
//! ```
//!
//! Will send the GELF messages to a receiver on port 5514 on graylog.example.com.
//!
//! Applications that have their own notion of a log record can skip [`tracing`] altogether:
//!
//! ```no_run
//! use gelf_tracing::{config::ChunkSize, handler::GelfHandler, level, record::LogRecord};
//!
//! let handler = GelfHandler::new("graylog.example.com", 12201, ChunkSize::WAN).unwrap();
//! let record = LogRecord::new("svc.storage", level::ERROR, "disk full")
//!     .with_attribute("volume", "/data");
//! handler.emit(&record).unwrap();
//! handler.close().unwrap();
//! ```

pub mod chunker;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod layer;
pub mod level;
pub mod message;
pub mod record;
pub mod transport;
pub mod value;
