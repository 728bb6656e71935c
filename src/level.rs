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
//! Record levels & syslog severities.
//!
//! A [`LogRecord`] carries a numeric level on the familiar 10-through-50 scale (`DEBUG` through
//! `CRITICAL`). GELF, on the other hand, wants the syslog severity in its `level` field, 0 (most
//! severe) through 7. [`convert_level`] maps between the two.
//!
//! [`LogRecord`]: crate::record::LogRecord

type StdResult<T, E> = std::result::Result<T, E>;

/// Record level: the system is about to fall over
pub const CRITICAL: i64 = 50;
/// Record level: something failed
pub const ERROR: i64 = 40;
/// Record level: something looks wrong
pub const WARNING: i64 = 30;
/// Record level: informational
pub const INFO: i64 = 20;
/// Record level: debug output
pub const DEBUG: i64 = 10;

/// The eight severity levels defined by RFCs [5424] & [3164]. The enumeration values duplicate
/// the constants documented as per the `syslog()` manual [page] & defined in `<syslog.h>`, and
/// they are exactly the values GELF expects in its `level` field.
///
/// [5424]: https://datatracker.ietf.org/doc/html/rfc5424
/// [3164]: https://datatracker.ietf.org/doc/html/rfc3164
/// [page]: https://man7.org/linux/man-pages/man3/syslog.3.html
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// system is unusable
    LOG_EMERG,
    /// action must be take immediately
    LOG_ALERT,
    /// critical conditions
    LOG_CRIT,
    /// error conditions
    LOG_ERR,
    /// warning conditions
    LOG_WARNING,
    /// normal, but significant condition
    LOG_NOTICE,
    /// informational message
    LOG_INFO,
    /// debug-level message
    LOG_DEBUG,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Severity::LOG_EMERG => "LOG_EMERG",
                Severity::LOG_ALERT => "LOG_ALERT",
                Severity::LOG_CRIT => "LOG_CRIT",
                Severity::LOG_ERR => "LOG_ERR",
                Severity::LOG_WARNING => "LOG_WARNING",
                Severity::LOG_NOTICE => "LOG_NOTICE",
                Severity::LOG_INFO => "LOG_INFO",
                Severity::LOG_DEBUG => "LOG_DEBUG",
            }
        )
    }
}

const LEVEL_TO_SEVERITY: [(i64, Severity); 5] = [
    (CRITICAL, Severity::LOG_CRIT),
    (ERROR, Severity::LOG_ERR),
    (WARNING, Severity::LOG_WARNING),
    (INFO, Severity::LOG_INFO),
    (DEBUG, Severity::LOG_DEBUG),
];

/// Map a record level to the GELF `level` field.
///
/// The five named levels are looked up exactly. Anything else (a custom level such as 25, say) is
/// passed through untouched; receivers will see whatever number the caller chose.
pub fn convert_level(level: i64) -> i64 {
    LEVEL_TO_SEVERITY
        .iter()
        .find(|(lvl, _)| *lvl == level)
        .map(|(_, sev)| *sev as i64)
        .unwrap_or(level)
}

/// Map a [`tracing`] level onto the record level scale. There is no TRACE record level, so TRACE
/// is folded into DEBUG.
///
/// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
pub fn from_tracing(level: &tracing::Level) -> i64 {
    match *level {
        tracing::Level::TRACE | tracing::Level::DEBUG => DEBUG,
        tracing::Level::INFO => INFO,
        tracing::Level::WARN => WARNING,
        tracing::Level::ERROR => ERROR,
    }
}
