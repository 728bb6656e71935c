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

//! Log records.
//!
//! A [`LogRecord`] is the host-framework-neutral description of one log event: everything the
//! [`MessageBuilder`] needs, and nothing more. Whatever bridges a logging framework into this
//! crate (see [`layer`]) is responsible for filling one in; attributes the framework attaches to
//! the event go in the explicit [`LogRecord::attributes`] map.
//!
//! [`MessageBuilder`]: crate::message::MessageBuilder
//! [`layer`]: crate::layer

use crate::value::Value;

use backtrace::Backtrace;
use chrono::prelude::*;

use std::collections::BTreeMap;

/// Details of an error attached to a log record.
#[derive(Clone, Debug)]
pub struct ExceptionInfo {
    type_name: String,
    message: String,
    causes: Vec<String>,
    backtrace: Option<Backtrace>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> ExceptionInfo {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
            causes: Vec::new(),
            backtrace: None,
        }
    }
    /// Capture `err`, its chain of sources & the current stack.
    pub fn from_error<E: std::error::Error + 'static>(err: &E) -> ExceptionInfo {
        ExceptionInfo {
            type_name: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            causes: causes(err.source()),
            backtrace: Some(Backtrace::new()),
        }
    }
    /// Capture a type-erased error, its chain of sources & the current stack.
    ///
    /// The concrete type is gone by the time we see a `dyn Error`, so the type name is taken from
    /// the head of its `Debug` representation. For derived `Debug` implementations that's the
    /// struct or variant name; failing that we just say "Error".
    pub fn from_dyn_error(err: &(dyn std::error::Error + 'static)) -> ExceptionInfo {
        ExceptionInfo {
            type_name: debug_head(&format!("{:?}", err)),
            message: err.to_string(),
            causes: causes(err.source()),
            backtrace: Some(Backtrace::new()),
        }
    }
    pub fn with_backtrace(mut self, backtrace: Option<Backtrace>) -> Self {
        self.backtrace = backtrace;
        self
    }
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
    pub fn message(&self) -> &str {
        &self.message
    }
    /// Render the error as multi-line text: type & message, then causes, then the stack.
    pub fn format(&self) -> String {
        let mut text = format!("{}: {}\n", self.type_name, self.message);
        if !self.causes.is_empty() {
            text.push_str("\nCaused by:\n");
            for (i, cause) in self.causes.iter().enumerate() {
                text.push_str(&format!("    {}: {}\n", i, cause));
            }
        }
        if let Some(back) = &self.backtrace {
            text.push_str("\nStack backtrace:\n");
            text.push_str(&format!("{:?}", back));
        }
        text
    }
}

fn causes(mut source: Option<&(dyn std::error::Error + 'static)>) -> Vec<String> {
    let mut causes = Vec::new();
    while let Some(err) = source {
        causes.push(err.to_string());
        source = err.source();
    }
    causes
}

fn debug_head(debug: &str) -> String {
    let head: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if head.is_empty() || head.starts_with(|c: char| c.is_numeric()) {
        "Error".to_string()
    } else {
        head
    }
}

/// One log event, as handed to us by the host logging framework.
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// The fully formatted message text
    pub message: String,
    /// Numeric record level; see [`crate::level`]
    pub level: i64,
    pub created: DateTime<Utc>,
    pub exception: Option<ExceptionInfo>,
    /// The name of the logger that produced this record
    pub logger: String,
    /// Source file path
    pub pathname: String,
    pub lineno: u32,
    /// Calling function
    pub func_name: String,
    pub process: u32,
    /// Not every host can say; `None` means "unknown", and no `_process_name` field is sent
    pub process_name: Option<String>,
    pub thread_name: String,
    /// Everything else the framework attached to the record
    pub attributes: BTreeMap<String, Value>,
}

impl LogRecord {
    /// A record created now, on this thread, in this process, with no location & no attributes.
    pub fn new(logger: impl Into<String>, level: i64, message: impl Into<String>) -> LogRecord {
        LogRecord::for_process(logger, level, message, current_process_name())
    }
    /// As [`LogRecord::new`], but with a process name the caller already knows (so the
    /// executable isn't looked up again for every record).
    pub fn for_process(
        logger: impl Into<String>,
        level: i64,
        message: impl Into<String>,
        process_name: Option<String>,
    ) -> LogRecord {
        LogRecord {
            message: message.into(),
            level,
            created: Utc::now(),
            exception: None,
            logger: logger.into(),
            pathname: String::new(),
            lineno: 0,
            func_name: String::new(),
            process: std::process::id(),
            process_name,
            thread_name: current_thread_name(),
            attributes: BTreeMap::new(),
        }
    }
    pub fn with_location(
        mut self,
        pathname: impl Into<String>,
        lineno: u32,
        func_name: impl Into<String>,
    ) -> Self {
        self.pathname = pathname.into();
        self.lineno = lineno;
        self.func_name = func_name.into();
        self
    }
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
    /// Seconds since the Unix epoch, with microsecond precision.
    pub fn created_secs(&self) -> f64 {
        self.created.timestamp() as f64 + self.created.timestamp_subsec_micros() as f64 / 1e6
    }
}

/// The name of the current executable; `None` if it can't be determined.
pub(crate) fn current_process_name() -> Option<String> {
    std::env::current_exe()
        .ok()
        .and_then(|pbuf| pbuf.file_name().map(|s| s.to_string_lossy().into_owned()))
}

/// The name of the current thread, or its id if it has none.
pub(crate) fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[derive(Debug)]
    struct DiskFull {
        source: std::io::Error,
    }
    impl std::fmt::Display for DiskFull {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "no space left on /data")
        }
    }
    impl std::error::Error for DiskFull {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.source)
        }
    }

    #[test]
    fn exception_from_error() {
        let err = DiskFull {
            source: std::io::Error::new(std::io::ErrorKind::Other, "ENOSPC"),
        };
        let x = ExceptionInfo::from_error(&err);
        assert!(x.type_name().ends_with("DiskFull"));
        assert_eq!(x.message(), "no space left on /data");
        let text = x.format();
        assert!(text.contains("DiskFull: no space left on /data"));
        assert!(text.contains("    0: ENOSPC"));
        assert!(text.contains("Stack backtrace:"));

        let x = ExceptionInfo::from_dyn_error(&err);
        assert_eq!(x.type_name(), "DiskFull");
    }

    #[test]
    fn exception_without_backtrace() {
        let x = ExceptionInfo::new("Timeout", "took too long");
        assert_eq!(x.format(), "Timeout: took too long\n");
    }

    #[test]
    fn debug_heads() {
        assert_eq!(debug_head("Io(Os { code: 2 })"), "Io");
        assert_eq!(debug_head("\"just a string\""), "Error");
        assert_eq!(debug_head("42"), "Error");
    }

    #[test]
    fn record_defaults() {
        let r = LogRecord::new("svc", crate::level::INFO, "hi")
            .with_location("src/main.rs", 7, "main")
            .with_attribute("user", "bob");
        assert_eq!(r.process, std::process::id());
        assert_eq!(r.lineno, 7);
        assert_eq!(r.attributes.get("user"), Some(&Value::from("bob")));
        assert!(r.created_secs() > 1.0e9);
        assert_eq!(r.process_name, current_process_name());
    }

    #[test]
    fn record_for_known_process() {
        let r = LogRecord::for_process("svc", crate::level::INFO, "hi", Some("storaged".into()));
        assert_eq!(r.process_name.as_deref(), Some("storaged"));
        assert_eq!(r.process, std::process::id());
        assert_eq!(r.message, "hi");

        let r = LogRecord::for_process("svc", crate::level::INFO, "hi", None);
        assert!(r.process_name.is_none());
    }
}
