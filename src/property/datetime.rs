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

//! Time zone scoping of date-time properties.
//!
//! Date-times are held in memory as wall-clock times. When read, they are
//! converted to the session's time zone (unless the wire value has no bias,
//! in which case it is assumed to already be in the session's zone).
//!
//! When written, which zone the wall-clock time is interpreted in depends on
//! what is being done:
//!
//! - Creating an object: always the session zone.
//!
//! - Updating an object on a legacy server: always the session zone.
//!
//! - Updating an object on a newer server, where the object has a time zone
//!   property linked to the date-time which has itself been changed: the
//!   linked zone. (This is what lets a caller move a meeting to another time
//!   zone by changing the zone and the local start time together.)
//!
//! - Otherwise, updating an object on a newer server: nothing. The value is
//!   written without a bias and the server resolves it against the time
//!   zones it already knows for the object.

use chrono::prelude::*;
use lazy_static::lazy_static;

use super::complex::{ComplexSchema, ComplexValue};
use super::primitive::Primitive;
use super::value::Value;
use super::version::ExchangeVersion;
use crate::support::chronox;
use crate::support::error::Error;

lazy_static! {
    /// A time zone definition, as carried by `StartTimeZone` and friends.
    ///
    /// `BaseOffset` is a bias in `xs:duration` form.
    pub static ref TIME_ZONE: ComplexSchema = ComplexSchema::new("TimeZone")
        .attribute("Id", Primitive::Text)
        .attribute("Name", Primitive::Text)
        .element("BaseOffset", Primitive::Bias);
}

/// Build a time zone definition.
pub fn time_zone(
    id: &str,
    offset: FixedOffset,
) -> Result<ComplexValue, Error> {
    ComplexValue::new(&TIME_ZONE)
        .with("Id", id)?
        .with("BaseOffset", offset)
}

/// The UTC offset of a time zone definition, if it has one.
pub fn time_zone_offset(tz: &ComplexValue) -> Option<FixedOffset> {
    tz.get("BaseOffset").ok().and_then(Value::as_offset)
}

/// Decide the zone a date-time property is scoped to when written.
///
/// `linked_zone` is the zone of the property's linked time zone property, if
/// it has one and it has been modified locally. `None` means the value is
/// written without a bias.
pub fn scoping_zone(
    is_update: bool,
    version: ExchangeVersion,
    session_zone: FixedOffset,
    linked_zone: Option<FixedOffset>,
) -> Option<FixedOffset> {
    if !is_update || version.is_legacy() {
        Some(session_zone)
    } else {
        linked_zone
    }
}

/// Decode element text into a wall-clock time in `session_zone`.
///
/// Empty text decodes to `Null`.
pub fn decode(
    property: &str,
    text: &str,
    session_zone: FixedOffset,
) -> Result<Value, Error> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    chronox::parse_wire_date_time(trimmed)
        .map(|wire| Value::DateTime(chronox::localise(wire, session_zone)))
        .ok_or_else(|| Error::decode(property, text, "not a date-time"))
}

/// Encode a wall-clock time, scoped to `zone` if there is one.
pub fn encode(
    property: &'static str,
    value: &Value,
    zone: Option<FixedOffset>,
) -> Result<Option<String>, Error> {
    let dt = match *value {
        Value::Null => return Ok(None),
        Value::DateTime(dt) => dt,
        _ => return Err(Error::TypeMismatch(property)),
    };

    match zone {
        Some(zone) => chronox::format_scoped(dt, zone)
            .map(Some)
            .ok_or(Error::TypeMismatch(property)),
        None => Ok(Some(chronox::format_unscoped(dt))),
    }
}
