//! Time expression resolution.
//!
//! Accepted forms, tried in order (first match wins):
//! 1. `""` or `"now"`
//! 2. RFC 3339 with offset, e.g. `2024-01-01T12:00:00Z`
//! 3. `now` followed by a signed duration, e.g. `now-15m`, `now-1h30m`, `now+30s`
//! 4. Date and time without zone, e.g. `2024-01-01T12:00:00` (read as UTC)
//! 5. Date only, e.g. `2024-01-01` (midnight UTC)

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::QueryError;
use crate::models::stats::TimeRange;

/// Default lookback for metric and stats queries.
pub fn default_lookback() -> Duration {
    Duration::hours(1)
}

/// Default lookback for span search.
pub fn span_lookback() -> Duration {
    Duration::minutes(15)
}

/// Outcome of a single parse attempt.
#[derive(Debug, Clone, PartialEq)]
enum Attempt {
    Matched(DateTime<Utc>),
    /// The input is not in this form; try the next one.
    Unmatched,
    /// The input claims this form but is broken; stop here.
    Malformed(String),
}

type Parser = fn(&str, DateTime<Utc>) -> Attempt;

const ATTEMPTS: &[Parser] = &[
    parse_now,
    parse_rfc3339,
    parse_relative,
    parse_naive_datetime,
    parse_date,
];

/// Resolve `expr` to a concrete instant relative to `now`.
pub fn resolve(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, QueryError> {
    for attempt in ATTEMPTS {
        match attempt(expr, now) {
            Attempt::Matched(t) => return Ok(t),
            Attempt::Unmatched => continue,
            Attempt::Malformed(reason) => return Err(QueryError::invalid_time(expr, reason)),
        }
    }
    Err(QueryError::invalid_time(expr, "unrecognized time format"))
}

/// Resolve an optional expression, falling back to `default` when absent or empty.
pub fn resolve_or(
    expr: Option<&str>,
    default: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, QueryError> {
    match expr {
        Some(e) if !e.is_empty() => resolve(e, now),
        _ => Ok(default),
    }
}

/// Resolve a `from`/`to` pair into a validated range.
///
/// `from` defaults to `now - lookback`, `to` defaults to `now`.
pub fn resolve_range(
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
    lookback: Duration,
) -> Result<TimeRange, QueryError> {
    let from = resolve_or(from, now - lookback, now)?;
    let to = resolve_or(to, now, now)?;
    TimeRange::new(from, to)
}

// ── Attempts ─────────────────────────────────────────────────

fn parse_now(s: &str, now: DateTime<Utc>) -> Attempt {
    if s.is_empty() || s == "now" {
        Attempt::Matched(now)
    } else {
        Attempt::Unmatched
    }
}

fn parse_rfc3339(s: &str, _now: DateTime<Utc>) -> Attempt {
    match DateTime::parse_from_rfc3339(s) {
        Ok(t) => Attempt::Matched(t.with_timezone(&Utc)),
        Err(_) => Attempt::Unmatched,
    }
}

fn parse_relative(s: &str, now: DateTime<Utc>) -> Attempt {
    let Some(offset) = s.strip_prefix("now") else {
        return Attempt::Unmatched;
    };
    let nanos = match parse_signed_duration(offset) {
        Ok(n) => n,
        Err(reason) => return Attempt::Malformed(format!("invalid relative time: {}", reason)),
    };
    match now.checked_add_signed(Duration::nanoseconds(nanos)) {
        Some(t) => Attempt::Matched(t),
        None => Attempt::Malformed("relative time is out of range".into()),
    }
}

fn parse_naive_datetime(s: &str, _now: DateTime<Utc>) -> Attempt {
    match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(t) => Attempt::Matched(t.and_utc()),
        Err(_) => Attempt::Unmatched,
    }
}

fn parse_date(s: &str, _now: DateTime<Utc>) -> Attempt {
    let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") else {
        return Attempt::Unmatched;
    };
    match date.and_hms_opt(0, 0, 0) {
        Some(t) => Attempt::Matched(t.and_utc()),
        None => Attempt::Unmatched,
    }
}

// ── Durations ────────────────────────────────────────────────

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:ns|us|µs|μs|ms|s|m|h))+$").unwrap()
});

static COMPONENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]*)(?:\.([0-9]*))?(ns|us|µs|μs|ms|s|m|h)").unwrap()
});

/// Fraction digits beyond this are ignored; keeps `10^len` inside i128.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a signed duration like `-1h30m`, `+30s`, `1.5h` or `0` into nanoseconds.
fn parse_signed_duration(s: &str) -> Result<i64, String> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        Some(_) => (false, s),
        None => return Err("missing duration".into()),
    };

    if body == "0" {
        return Ok(0);
    }
    if body.is_empty() {
        return Err(format!("missing duration after sign in '{}'", s));
    }
    if !DURATION_RE.is_match(body) {
        return Err(format!("'{}' is not a valid duration", s));
    }

    let mut total: i128 = 0;
    for caps in COMPONENT_RE.captures_iter(body) {
        let whole = caps.get(1).map_or("", |m| m.as_str());
        let frac = caps.get(2).map_or("", |m| m.as_str());
        let unit = unit_nanos(caps.get(3).map_or("", |m| m.as_str()));

        let whole: i128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| format!("duration '{}' is out of range", s))?
        };
        let mut value = whole
            .checked_mul(unit)
            .ok_or_else(|| format!("duration '{}' is out of range", s))?;

        let frac = &frac[..frac.len().min(MAX_FRACTION_DIGITS)];
        if !frac.is_empty() {
            let digits: i128 = frac
                .parse()
                .map_err(|_| format!("duration '{}' is out of range", s))?;
            let scale = 10_i128.pow(frac.len() as u32);
            value += digits * unit / scale;
        }

        total = total
            .checked_add(value)
            .ok_or_else(|| format!("duration '{}' is out of range", s))?;
    }

    if negative {
        total = -total;
    }
    i64::try_from(total).map_err(|_| format!("duration '{}' is out of range", s))
}

fn unit_nanos(unit: &str) -> i128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => unreachable!("unit already validated by DURATION_RE"),
    }
}
