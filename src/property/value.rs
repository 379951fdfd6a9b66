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

use chrono::prelude::*;

use super::collection::ComplexCollection;
use super::complex::ComplexValue;

/// The in-memory value of one property.
///
/// `Null` is the "unset" sentinel: it is never written to the wire. Note that
/// it is distinct from `Text("")`, which is written as an empty element and
/// explicitly sets the field to the empty string.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    /// One of the names of an enumeration codec.
    Enum(&'static str),
    Binary(Vec<u8>),
    /// A wall-clock time. Which zone it is local to depends on the property;
    /// see `property::datetime`.
    DateTime(NaiveDateTime),
    /// A UTC offset.
    Offset(FixedOffset),
    Complex(ComplexValue),
    Collection(ComplexCollection),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(*self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::Text(ref s) => Some(s),
            Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(d) => Some(d),
            Value::Integer(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Value::Binary(ref b) => Some(b),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match *self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_offset(&self) -> Option<FixedOffset> {
        match *self {
            Value::Offset(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ComplexValue> {
        match *self {
            Value::Complex(ref c) => Some(c),
            _ => None,
        }
    }

    pub fn as_complex_mut(&mut self) -> Option<&mut ComplexValue> {
        match *self {
            Value::Complex(ref mut c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&ComplexCollection> {
        match *self {
            Value::Collection(ref c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut ComplexCollection> {
        match *self {
            Value::Collection(ref mut c) => Some(c),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<FixedOffset> for Value {
    fn from(o: FixedOffset) -> Self {
        Value::Offset(o)
    }
}

impl From<ComplexValue> for Value {
    fn from(c: ComplexValue) -> Self {
        Value::Complex(c)
    }
}

impl From<ComplexCollection> for Value {
    fn from(c: ComplexCollection) -> Self {
        Value::Collection(c)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
