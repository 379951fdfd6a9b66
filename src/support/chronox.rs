//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Propbag.
//
// Propbag is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Propbag is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Propbag. If not, see <http://www.gnu.org/licenses/>.

//! Helpers for the date and time representations used on the wire, plus
//! panicking shorthands (with 'x' appended to disambiguate) for constructing
//! values that are obviously valid.

use std::convert::TryFrom;

use chrono::prelude::*;

pub trait FixedOffsetX {
    fn zero() -> Self;
    fn eastx(secs: i32) -> Self;
}

pub trait NaiveDateX {
    fn from_ymdx(y: i32, m: u32, d: u32) -> Self;
    fn and_hmsx(&self, h: u32, m: u32, s: u32) -> NaiveDateTime;
}

impl FixedOffsetX for FixedOffset {
    fn zero() -> Self {
        Self::eastx(0)
    }

    fn eastx(secs: i32) -> Self {
        Self::east_opt(secs).unwrap()
    }
}

impl NaiveDateX for NaiveDate {
    fn from_ymdx(y: i32, m: u32, d: u32) -> Self {
        Self::from_ymd_opt(y, m, d).unwrap()
    }

    fn and_hmsx(&self, h: u32, m: u32, s: u32) -> NaiveDateTime {
        self.and_hms_opt(h, m, s).unwrap()
    }
}

/// A date-time as it appeared on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireDateTime {
    /// The value carried a bias (`Z` or `±hh:mm`) and so identifies an
    /// absolute instant.
    Absolute(DateTime<FixedOffset>),
    /// The value carried no bias; the reader must decide which zone it is
    /// local to.
    Unspecified(NaiveDateTime),
}

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn parse_wire_date_time(s: &str) -> Option<WireDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(WireDateTime::Absolute(dt));
    }

    NaiveDateTime::parse_from_str(s, NAIVE_FORMAT)
        .ok()
        .map(WireDateTime::Unspecified)
}

/// Format `dt`, which is a wall-clock time in `zone`, as an absolute UTC
/// instant.
pub fn format_scoped(dt: NaiveDateTime, zone: FixedOffset) -> Option<String> {
    let absolute = zone.from_local_datetime(&dt).single()?;
    Some(
        absolute
            .naive_utc()
            .format(&format!("{}Z", NAIVE_FORMAT))
            .to_string(),
    )
}

/// Format `dt` with no bias at all.
pub fn format_unscoped(dt: NaiveDateTime) -> String {
    dt.format(NAIVE_FORMAT).to_string()
}

/// Convert a wire value to a wall-clock time in `zone`.
///
/// Values without a bias are taken to already be local to `zone`.
pub fn localise(wire: WireDateTime, zone: FixedOffset) -> NaiveDateTime {
    match wire {
        WireDateTime::Absolute(dt) => dt.with_timezone(&zone).naive_local(),
        WireDateTime::Unspecified(dt) => dt,
    }
}

/// Parse a session time zone as written in configuration: `UTC`, `Z`, or
/// `±hh:mm`.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || "Z" == s {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };

    let (h, m) = match rest.find(':') {
        Some(colon) => (&rest[..colon], &rest[colon + 1..]),
        None => match (rest.get(..2), rest.get(2..)) {
            (Some(h), Some(m)) if 4 == rest.len() => (h, m),
            _ => (rest, "0"),
        },
    };

    let h = parse_digits(h)?;
    let m = parse_digits(m)?;
    if h > 14 || m >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (h * 3600 + m * 60))
}

/// Parse a non-empty run of ASCII digits, without any sign.
fn parse_digits(s: &str) -> Option<i32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    s.parse().ok()
}

/// Parse an `xs:duration` bias, as used by the `BaseOffset` of time zone
/// definitions, into the UTC offset it implies.
///
/// Biases run the opposite direction from offsets: a zone at UTC-8 has a
/// bias of `PT8H`.
pub fn parse_bias(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut s = s.strip_prefix('P')?;

    let mut secs: i64 = 0;
    let mut in_time = false;
    let mut any = false;
    while !s.is_empty() {
        if let Some(rest) = s.strip_prefix('T') {
            if in_time {
                return None;
            }
            in_time = true;
            s = rest;
            continue;
        }

        let digits = s
            .find(|c: char| !c.is_ascii_digit() && '.' != c)
            .unwrap_or(s.len());
        if 0 == digits || digits == s.len() {
            return None;
        }

        let n: f64 = s[..digits].parse().ok()?;
        let unit = match (in_time, s.as_bytes()[digits]) {
            (false, b'D') => 86400.0,
            (true, b'H') => 3600.0,
            (true, b'M') => 60.0,
            (true, b'S') => 1.0,
            _ => return None,
        };
        let part = n * unit;
        if !part.is_finite() || part > f64::from(i32::MAX) {
            return None;
        }
        secs = secs.checked_add(part as i64)?;
        any = true;
        s = &s[digits + 1..];
    }

    if !any {
        return None;
    }

    let bias = if negative { -secs } else { secs };
    FixedOffset::east_opt(i32::try_from(-bias).ok()?)
}

/// The inverse of `parse_bias`.
pub fn format_bias(offset: FixedOffset) -> String {
    let bias = -offset.local_minus_utc();
    let abs = bias.abs();
    let (h, m, s) = (abs / 3600, abs / 60 % 60, abs % 60);

    let mut out = String::new();
    if bias < 0 {
        out.push('-');
    }
    out.push_str("PT");
    if h > 0 || (0 == m && 0 == s) {
        out.push_str(&format!("{}H", h));
    }
    if m > 0 {
        out.push_str(&format!("{}M", m));
    }
    if s > 0 {
        out.push_str(&format!("{}S", s));
    }
    out
}
