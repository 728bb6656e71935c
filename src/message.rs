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

//! Mapping [`LogRecord`]s to GELF messages.
//!
//! [`MessageBuilder`] is a pure function from a [`LogRecord`] to a [`GelfMessage`]; the only thing
//! it looks at besides the record is the local hostname, which it resolves once, up front.
//!
//! # Additional fields
//!
//! GELF treats every field whose name begins with an underscore as an "additional" field. Besides
//! the four the builder always adds (`_function`, `_pid`, `_thread_name` & `_process_name`),
//! every record attribute is promoted to `_<name>`, unless
//!
//! - its name is on the [`SkipList`] (these are framework-internal names, or, in the case of `id`,
//!   a name GELF reserves), or
//! - its name already begins with `_` (a private attribute).
//!
//! A promoted attribute that lands on one of the four framework fields replaces it.
//!
//! [`LogRecord`]: crate::record::LogRecord

use crate::{
    error::{Error, Result},
    level::convert_level,
    record::{ExceptionInfo, LogRecord},
    value::Value,
};

use backtrace::Backtrace;
use serde::Serialize;

use std::collections::{BTreeMap, BTreeSet};

/// The GELF version we speak
pub const GELF_VERSION: &str = "1.0";

/// Record attribute names that are never promoted to additional fields.
///
/// Most are the names a record uses for data that's already sent in a fixed field; `exc_text`
/// & `asctime` are formatter by-products; `id` is forbidden by GELF.
pub const DEFAULT_SKIP_LIST: [&str; 22] = [
    "args",
    "asctime",
    "created",
    "exc_info",
    "exc_text",
    "filename",
    "funcName",
    "id",
    "levelname",
    "levelno",
    "lineno",
    "module",
    "msecs",
    "message",
    "msg",
    "name",
    "pathname",
    "process",
    "processName",
    "relativeCreated",
    "thread",
    "threadName",
];

/// The set of attribute names the [`MessageBuilder`] won't promote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkipList(BTreeSet<String>);

impl SkipList {
    pub fn new<I, S>(names: I) -> SkipList
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SkipList(names.into_iter().map(Into::into).collect())
    }
    /// Skip nothing (but private, `_`-prefixed attributes are still never promoted)
    pub fn empty() -> SkipList {
        SkipList(BTreeSet::new())
    }
    /// Add `name` to the list
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into());
        self
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

impl std::default::Default for SkipList {
    fn default() -> Self {
        SkipList::new(DEFAULT_SKIP_LIST)
    }
}

/// A GELF message, ready for serialization.
///
/// Fixed fields serialize first, in declaration order, followed by the additional fields in name
/// order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GelfMessage {
    pub version: String,
    pub host: String,
    pub short_message: String,
    pub full_message: String,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    /// Syslog severity (unless the record carried an unmapped level)
    pub level: i64,
    /// The logger name
    pub facility: String,
    pub file: String,
    pub line: u32,
    /// Every `_`-prefixed field
    #[serde(flatten)]
    pub additional: BTreeMap<String, Value>,
}

impl GelfMessage {
    /// Look up any field, fixed or additional, by its GELF name.
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            "version" => Some(Value::from(self.version.as_str())),
            "host" => Some(Value::from(self.host.as_str())),
            "short_message" => Some(Value::from(self.short_message.as_str())),
            "full_message" => Some(Value::from(self.full_message.as_str())),
            "timestamp" => Some(Value::Float(self.timestamp)),
            "level" => Some(Value::Int(self.level)),
            "facility" => Some(Value::from(self.facility.as_str())),
            "file" => Some(Value::from(self.file.as_str())),
            "line" => Some(Value::from(self.line)),
            _ => self.additional.get(name).cloned(),
        }
    }
}

/// The formatted error attached to a record, or the empty string if there is none.
pub fn full_message(exception: Option<&ExceptionInfo>) -> String {
    exception.map(ExceptionInfo::format).unwrap_or_default()
}

/// The record's message text; the host framework has already merged in any arguments.
pub fn short_message(record: &LogRecord) -> String {
    record.message.clone()
}

/// Ask the OS for our hostname.
pub fn lookup_hostname() -> Result<String> {
    hostname::get()
        .map_err(|err| Error::NoHostname {
            source: Box::new(err),
            back: Backtrace::new(),
        })
        .map(|hn| hn.to_string_lossy().into_owned())
}

/// Attempt to figure-out a name for this host.
///
/// We'll first try [gethostname()]; if that fails, fall back to our local IP address, and if
/// *that* fails, "-". This cannot fail.
///
/// [gethostname()]: https://man7.org/linux/man-pages/man2/gethostname.2.html
pub fn default_hostname() -> String {
    lookup_hostname()
        .ok()
        .filter(|hn| !hn.is_empty())
        .or_else(|| local_ip_address::local_ip().ok().map(|ip| ip.to_string()))
        .unwrap_or_else(|| "-".to_string())
}

/// Builds [`GelfMessage`]s from [`LogRecord`]s.
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    host: String,
    skip_list: SkipList,
}

impl std::default::Default for MessageBuilder {
    fn default() -> Self {
        MessageBuilder::new(SkipList::default())
    }
}

impl MessageBuilder {
    pub fn new(skip_list: SkipList) -> MessageBuilder {
        MessageBuilder {
            host: default_hostname(),
            skip_list,
        }
    }
    /// Report `host` rather than the discovered hostname
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn skip_list(&self) -> &SkipList {
        &self.skip_list
    }
    pub fn build(&self, record: &LogRecord) -> GelfMessage {
        let mut additional = BTreeMap::new();
        additional.insert("_function".to_string(), Value::from(record.func_name.as_str()));
        additional.insert("_pid".to_string(), Value::from(record.process));
        additional.insert(
            "_thread_name".to_string(),
            Value::from(record.thread_name.as_str()),
        );
        if let Some(process_name) = &record.process_name {
            additional.insert(
                "_process_name".to_string(),
                Value::from(process_name.as_str()),
            );
        }

        record
            .attributes
            .iter()
            .filter(|(name, _)| self.promotes(name))
            .for_each(|(name, value)| {
                additional.insert(format!("_{}", name), value.clone());
            });

        GelfMessage {
            version: GELF_VERSION.to_string(),
            host: self.host.clone(),
            short_message: short_message(record),
            full_message: full_message(record.exception.as_ref()),
            timestamp: record.created_secs(),
            level: convert_level(record.level),
            facility: record.logger.clone(),
            file: record.pathname.clone(),
            line: record.lineno,
            additional,
        }
    }
    /// Would an attribute named `name` become an additional field?
    fn promotes(&self, name: &str) -> bool {
        !name.is_empty() && !name.starts_with('_') && !self.skip_list.contains(name)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::level;

    use chrono::prelude::*;

    fn record() -> LogRecord {
        let mut r = LogRecord::new("svc.storage", level::ERROR, "disk full")
            .with_location("/app/storage.py", 42, "flush");
        r.process = 100;
        r.thread_name = "main".to_string();
        r.process_name = Some("storaged".to_string());
        r.created = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        r
    }

    #[test]
    fn end_to_end_example() {
        let m = MessageBuilder::default().with_host("bree.local").build(&record());

        let mut additional = BTreeMap::new();
        additional.insert("_function".to_string(), Value::from("flush"));
        additional.insert("_pid".to_string(), Value::from(100u32));
        additional.insert("_thread_name".to_string(), Value::from("main"));
        additional.insert("_process_name".to_string(), Value::from("storaged"));

        assert_eq!(
            m,
            GelfMessage {
                version: "1.0".to_string(),
                host: "bree.local".to_string(),
                short_message: "disk full".to_string(),
                full_message: "".to_string(),
                timestamp: 1_700_000_000.25,
                level: 3,
                facility: "svc.storage".to_string(),
                file: "/app/storage.py".to_string(),
                line: 42,
                additional,
            }
        );
    }

    #[test]
    fn attribute_promotion() {
        let r = record()
            .with_attribute("foo", "bar")
            .with_attribute("args", vec![1i64, 2])
            .with_attribute("_internal", 5i64)
            .with_attribute("id", 7i64)
            .with_attribute("request_id", 7i64);
        let m = MessageBuilder::default().build(&r);

        assert_eq!(m.get("_foo"), Some(Value::from("bar")));
        assert_eq!(m.get("_request_id"), Some(Value::Int(7)));
        assert_eq!(m.get("_args"), None);
        assert_eq!(m.get("_id"), None);
        assert!(!m.additional.keys().any(|k| k.contains("internal")));
        for name in DEFAULT_SKIP_LIST {
            assert!(m.get(&format!("_{}", name)).is_none());
        }
    }

    #[test]
    fn skip_list_is_injected() {
        let r = record().with_attribute("foo", "bar").with_attribute("args", 1i64);

        let m = MessageBuilder::new(SkipList::default().with("foo")).build(&r);
        assert_eq!(m.get("_foo"), None);

        let m = MessageBuilder::new(SkipList::empty()).build(&r);
        assert_eq!(m.get("_foo"), Some(Value::from("bar")));
        assert_eq!(m.get("_args"), Some(Value::Int(1)));
    }

    #[test]
    fn process_name_is_optional() {
        let mut r = record();
        r.process_name = None;
        let m = MessageBuilder::default().build(&r);
        assert!(m.get("_process_name").is_none());
        assert_eq!(m.get("_pid"), Some(Value::UInt(100)));
    }

    #[test]
    fn attributes_win_collisions() {
        let r = record().with_attribute("function", "overridden");
        let m = MessageBuilder::default().build(&r);
        assert_eq!(m.get("_function"), Some(Value::from("overridden")));
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json.matches("\"_function\"").count(), 1);
    }

    #[test]
    fn full_messages() {
        assert_eq!(full_message(None), "");
        let x = ExceptionInfo::new("std::io::Error", "broken pipe");
        let text = full_message(Some(&x));
        assert!(!text.is_empty());
        assert!(text.contains("std::io::Error"));

        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let x = ExceptionInfo::from_error(&err);
        let m = MessageBuilder::default().build(&record().with_exception(x.clone()));
        assert!(m.full_message.contains(x.type_name()));
        assert!(m.full_message.contains("boom"));
    }

    #[test]
    fn unmapped_levels() {
        let mut r = record();
        r.level = 25;
        assert_eq!(MessageBuilder::default().build(&r).level, 25);
    }

    #[test]
    fn field_order() {
        let m = MessageBuilder::default().with_host("h").build(&record());
        let json = serde_json::to_string(&m).unwrap();
        let keys = [
            "\"version\"",
            "\"host\"",
            "\"short_message\"",
            "\"full_message\"",
            "\"timestamp\"",
            "\"level\"",
            "\"facility\"",
            "\"file\"",
            "\"line\"",
            "\"_function\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn hostname() {
        // Just exercise the lookup; the fallback can't fail.
        let _ = lookup_hostname();
        assert!(!default_hostname().is_empty());
    }
}
