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

//! [gelf-tracing](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! [`Layer`] is the bridge from [`tracing`] into this crate: each [`Event`] it sees becomes a
//! [`LogRecord`] which is handed to a [`GelfHandler`].
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//!
//! # Failures
//!
//! A [`Layer`] has no-one to return an error to. When an event can't be delivered, the first
//! failure is reported via [`tracing::error!`] and every failure is counted (see
//! [`Layer::failures`]); after that, failures are silent. Events produced on a thread while that
//! thread is already inside this layer are ignored, so a transport that logs can't send the layer
//! into a loop.

use crate::{
    config::Config,
    error::Result,
    handler::GelfHandler,
    level,
    record::{current_process_name, ExceptionInfo, LogRecord},
    transport::{Transport, UdpTransport},
    value::Value,
};

use tracing::Event;
use tracing_subscriber::layer::Context;

// When the tracing-log feature is enabled, use NormalizeEvent to extract file/line metadata
// from events that originated from the `log` crate.
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

use std::{
    cell::Cell,
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

thread_local! {
    static IN_LAYER: Cell<bool> = Cell::new(false);
}

/// Marks this thread as inside the layer for as long as it lives.
struct Reentrancy;

impl Reentrancy {
    /// `None` if this thread is already inside the layer
    fn enter() -> Option<Reentrancy> {
        if IN_LAYER.with(|flag| flag.replace(true)) {
            None
        } else {
            Some(Reentrancy)
        }
    }
}

impl Drop for Reentrancy {
    fn drop(&mut self) {
        IN_LAYER.with(|flag| flag.set(false));
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will send [`Event`]s to a
/// GELF receiver.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
#[derive(Debug)]
pub struct Layer<T: Transport> {
    handler: GelfHandler<T>,
    process_name: Option<String>,
    failures: AtomicUsize,
    reported: AtomicBool,
}

impl Layer<UdpTransport> {
    /// Attempt to construct a [`Layer`] that will send GELF messages via UDP to port 12201 on
    /// localhost
    pub fn try_default() -> Result<Self> {
        Layer::from_config(&Config::default())
    }
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Layer::new(GelfHandler::from_config(config)?))
    }
}

impl<T: Transport> Layer<T> {
    pub fn new(handler: GelfHandler<T>) -> Self {
        Layer {
            handler,
            process_name: current_process_name(),
            failures: AtomicUsize::new(0),
            reported: AtomicBool::new(false),
        }
    }
    pub fn handler(&self) -> &GelfHandler<T> {
        &self.handler
    }
    /// The number of events that could not be delivered
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
    pub fn close(self) -> Result<()> {
        self.handler.close()
    }
    fn make_record(&self, event: &Event<'_>) -> LogRecord {
        // For native tracing events, normalized_metadata() returns None and we use the event's
        // own metadata.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        #[cfg(feature = "tracing-log")]
        let from_log = event.is_log();
        #[cfg(not(feature = "tracing-log"))]
        let from_log = false;

        let mut visitor = RecordVisitor {
            message: None,
            attributes: BTreeMap::new(),
            exception: None,
            from_log,
        };
        event.record(&mut visitor);

        let mut record = LogRecord::for_process(
            meta.target(),
            level::from_tracing(meta.level()),
            visitor
                .message
                .unwrap_or_else(|| event.metadata().name().to_string()),
            self.process_name.clone(),
        )
        .with_location(
            meta.file().unwrap_or_default(),
            meta.line().unwrap_or_default(),
            meta.module_path().unwrap_or_else(|| meta.target()),
        );
        record.exception = visitor.exception;
        record.attributes = visitor.attributes;
        record
    }
}

/// This is where [`Event`]s enter the pipeline.
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
impl<S, T> tracing_subscriber::layer::Layer<S> for Layer<T>
where
    S: tracing::Subscriber,
    T: Transport + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let _guard = match Reentrancy::enter() {
            Some(guard) => guard,
            None => return,
        };
        if let Err(err) = self.handler.emit(&self.make_record(event)) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            if !self.reported.swap(true, Ordering::Relaxed) {
                ::tracing::error!("gelf-tracing failed to deliver an event: {}", err);
            }
        }
    }
}

/// Collects an [`Event`]'s fields into a message, attributes & (maybe) an error.
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
struct RecordVisitor {
    message: Option<String>,
    attributes: BTreeMap<String, Value>,
    exception: Option<ExceptionInfo>,
    from_log: bool,
}

impl RecordVisitor {
    fn insert(&mut self, field: &tracing::field::Field, value: Value) {
        // tracing-log carries the log record's metadata in "log.*" fields; we've already
        // picked that up through the normalized metadata.
        if self.from_log && field.name().starts_with("log.") {
            return;
        }
        self.attributes.insert(field.name().to_string(), value);
    }
}

impl tracing::field::Visit for RecordVisitor {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field, Value::Float(value));
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, Value::Int(value));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, Value::UInt(value));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::from(value));
        }
    }
    fn record_error(
        &mut self,
        _field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.exception = Some(ExceptionInfo::from_dyn_error(value));
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            // The tracing macros "pre-format" the `message` field so that `value` actually refers
            // to a `std::fmt::Arguments` instance, which will print to a debug format without
            // enclosing double-quotes.
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::Str(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod smoke {

    use super::*;

    use crate::{
        chunker::Framing,
        config::ChunkSize,
        message::MessageBuilder,
        transport::{test::Recorder, GelfTransport},
    };

    use flate2::read::ZlibDecoder;
    use tracing::{debug, error, info, trace, warn};
    use tracing_subscriber::{
        layer::SubscriberExt, // Needed to get `with()`
        registry::Registry,
    };

    use std::io::Read;

    fn layer(recorder: Recorder) -> Layer<Recorder> {
        Layer::new(GelfHandler::with_transport(
            MessageBuilder::default().with_host("bree.local"),
            GelfTransport::new(recorder, ChunkSize::LAN, Framing::Wide),
        ))
    }

    fn decode(payload: &[u8]) -> serde_json::Value {
        let mut json = Vec::new();
        ZlibDecoder::new(payload).read_to_end(&mut json).unwrap();
        serde_json::from_slice(&json).unwrap()
    }

    /// Run `f` with a [`Layer`] sending to `recorder` installed; return the layer's failure count.
    fn with_layer(recorder: &Recorder, f: impl FnOnce()) -> usize {
        let dispatch = tracing::Dispatch::new(Registry::default().with(layer(recorder.clone())));
        tracing::dispatcher::with_default(&dispatch, f);
        dispatch
            .downcast_ref::<Layer<Recorder>>()
            .expect("layer not found")
            .failures()
    }

    #[test]
    fn events_become_gelf() {
        let recorder = Recorder::default();
        with_layer(&recorder, || {
            info!(user = "bob", attempts = 3, big = 5u64, ratio = 0.5, ok = true, "logged in");
        });

        let sent = recorder.datagrams();
        assert_eq!(sent.len(), 1);
        let json = decode(&sent[0]);
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["host"], "bree.local");
        assert_eq!(json["short_message"], "logged in");
        assert_eq!(json["full_message"], "");
        assert_eq!(json["level"], 6);
        assert_eq!(json["facility"], module_path!());
        assert_eq!(json["file"], file!());
        assert!(json["line"].as_u64().unwrap() > 0);
        assert_eq!(json["_function"], module_path!());
        assert_eq!(json["_pid"], std::process::id());
        assert!(json["_thread_name"].is_string());
        assert_eq!(json["_user"], "bob");
        assert_eq!(json["_attempts"], 3);
        assert_eq!(json["_big"], 5);
        assert_eq!(json["_ratio"], 0.5);
        assert_eq!(json["_ok"], true);
        assert!(json.get("_message").is_none());
    }

    #[test]
    fn levels() {
        let recorder = Recorder::default();
        with_layer(&recorder, || {
            trace!("Hello, 世界!");
            debug!("Hello, 世界!");
            info!("Hello, 世界!");
            warn!("Hello, 世界!");
            error!("Hello, 世界!");
        });
        let levels: Vec<i64> = recorder
            .datagrams()
            .iter()
            .map(|d| decode(d)["level"].as_i64().unwrap())
            .collect();
        assert_eq!(levels, vec![7, 7, 6, 4, 3]);
        assert_eq!(decode(&recorder.datagrams()[0])["short_message"], "Hello, 世界!");
    }

    #[test]
    fn skipped_fields() {
        let recorder = Recorder::default();
        with_layer(&recorder, || {
            info!(id = 17, args = "(1, 2)", foo = "bar", "with extras");
        });
        let json = decode(&recorder.datagrams()[0]);
        assert_eq!(json["_foo"], "bar");
        assert!(json.get("_id").is_none());
        assert!(json.get("_args").is_none());
    }

    #[test]
    fn errors_become_full_messages() {
        let recorder = Recorder::default();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        with_layer(&recorder, || {
            error!(error = &err as &(dyn std::error::Error + 'static), "write failed");
        });
        let json = decode(&recorder.datagrams()[0]);
        assert_eq!(json["short_message"], "write failed");
        let full = json["full_message"].as_str().unwrap();
        // A `dyn Error` is named by the head of its Debug output; for an io::Error that's the
        // representation ("Custom"), not the type.
        assert!(full.starts_with("Custom: disk on fire\n"));
        assert!(json.get("_error").is_none());

        let recorder = Recorder::default();
        let err = QuotaExceeded { used: 11 };
        with_layer(&recorder, || {
            error!(error = &err as &(dyn std::error::Error + 'static), "upload refused");
        });
        let json = decode(&recorder.datagrams()[0]);
        let full = json["full_message"].as_str().unwrap();
        assert!(full.starts_with("QuotaExceeded: 11 bytes over quota\n"));
    }

    #[derive(Debug)]
    struct QuotaExceeded {
        used: u64,
    }

    impl std::fmt::Display for QuotaExceeded {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "{} bytes over quota", self.used)
        }
    }

    impl std::error::Error for QuotaExceeded {}

    #[test]
    fn process_name_is_cached() {
        let recorder = Recorder::default();
        let mut gelf = layer(recorder.clone());
        assert_eq!(gelf.process_name, current_process_name());
        gelf.process_name = Some("storaged".to_string());
        let subscriber = Registry::default().with(gelf);
        tracing::subscriber::with_default(subscriber, || {
            info!("one");
            info!("two");
        });
        for datagram in recorder.datagrams() {
            assert_eq!(decode(&datagram)["_process_name"], "storaged");
        }
        assert_eq!(recorder.datagrams().len(), 2);

        let recorder = Recorder::default();
        let mut gelf = layer(recorder.clone());
        gelf.process_name = None;
        tracing::subscriber::with_default(Registry::default().with(gelf), || info!("three"));
        assert!(decode(&recorder.datagrams()[0]).get("_process_name").is_none());
    }

    #[test]
    fn events_without_messages() {
        let recorder = Recorder::default();
        with_layer(&recorder, || {
            info!(user = "bob");
        });
        let json = decode(&recorder.datagrams()[0]);
        assert!(!json["short_message"].as_str().unwrap().is_empty());
    }

    #[test]
    fn failures_are_counted() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let failures = with_layer(&recorder, || {
            info!("one");
            info!("two");
            info!(bad = f64::NAN, "three");
        });
        assert_eq!(failures, 3);
        assert!(recorder.datagrams().is_empty());
    }

    /// A transport that logs every time it sends
    #[derive(Clone, Default)]
    struct Chatty(Recorder);

    impl Transport for Chatty {
        fn send(&self, buf: &[u8]) -> Result<usize> {
            warn!("sending {} bytes", buf.len());
            self.0.send(buf)
        }
    }

    #[test]
    fn no_reentrancy() {
        let recorder = Recorder::default();
        let layer = Layer::new(GelfHandler::with_transport(
            MessageBuilder::default(),
            GelfTransport::new(Chatty(recorder.clone()), ChunkSize::WAN, Framing::Wide),
        ));
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            info!("one");
            info!("two");
        });
        assert_eq!(recorder.datagrams().len(), 2);
    }

    #[test]
    #[cfg(feature = "graylog")]
    fn test_tracing_via_udp() {
        // Exercise `try_default()`, just to be sure it compiles.
        let _subscriber = Registry::default().with(Layer::try_default().unwrap());

        let subscriber = Registry::default().with(
            Layer::from_config(&Config::builder().host("127.0.0.1").build().unwrap()).unwrap(),
        );
        let _guard = tracing::subscriber::set_default(subscriber);

        trace!("Hello, 世界!");
        debug!("Hello, 世界!");
        info!("Hello, 世界!");
        warn!(big = "x".repeat(20_000).as_str(), "Hello, 世界!");
        error!("Hello, 世界!");
    }
}
