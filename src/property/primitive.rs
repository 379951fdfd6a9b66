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

//! Codecs converting scalar property values to and from element text.

use std::fmt;

use log::warn;

use super::value::Value;
use crate::support::chronox;
use crate::support::error::Error;

/// A user-supplied scalar codec.
pub struct CustomCodec {
    /// Name of the wire type, for diagnostics.
    pub name: &'static str,
    pub parse: fn(&str) -> Option<Value>,
    pub format: fn(&Value) -> Option<String>,
}

impl fmt::Debug for CustomCodec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CustomCodec({})", self.name)
    }
}

/// How a scalar value is represented as text.
#[derive(Clone, Copy, Debug)]
pub enum Primitive {
    Text,
    /// `true`/`false`. `1`/`0` are also accepted on input.
    Boolean,
    Integer,
    Double,
    /// One of a fixed set of names.
    Enumeration(&'static [&'static str]),
    /// Binary data, base64-encoded.
    Base64,
    /// An `xs:duration` time zone bias, held as the UTC offset it implies.
    Bias,
    Custom(&'static CustomCodec),
}

impl Primitive {
    /// Decode `text` into a value.
    ///
    /// Empty text is a valid encoding: it decodes to the empty string or
    /// empty binary for the codecs that have such a thing, and to `Null`
    /// otherwise.
    pub fn parse(
        self,
        property: &str,
        text: &str,
        strict: bool,
    ) -> Result<Value, Error> {
        let trimmed = text.trim();
        let bad = |reason: &str| Error::decode(property, text, reason);

        match self {
            Primitive::Text => Ok(Value::Text(text.to_owned())),
            Primitive::Base64 => base64::decode(trimmed)
                .map(Value::Binary)
                .map_err(|e| bad(&e.to_string())),
            Primitive::Custom(codec) => (codec.parse)(text)
                .ok_or_else(|| bad(&format!("not a valid {}", codec.name))),
            _ if trimmed.is_empty() => Ok(Value::Null),
            Primitive::Boolean => match trimmed {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(bad("not a boolean")),
            },
            Primitive::Integer => trimmed
                .parse()
                .map(Value::Integer)
                .map_err(|_| bad("not an integer")),
            Primitive::Double => trimmed
                .parse()
                .map(Value::Double)
                .map_err(|_| bad("not a number")),
            Primitive::Enumeration(names) => {
                match names.iter().find(|&&n| n == trimmed) {
                    Some(&name) => Ok(Value::Enum(name)),
                    None if strict => Err(bad("unknown enumeration member")),
                    None => {
                        warn!(
                            "Ignoring unknown value {:?} for {}",
                            trimmed, property
                        );
                        Ok(Value::Null)
                    },
                }
            },
            Primitive::Bias => chronox::parse_bias(trimmed)
                .map(Value::Offset)
                .ok_or_else(|| bad("not a time zone bias")),
        }
    }

    /// Encode `value` as text.
    ///
    /// `Null` has no encoding and yields `None`.
    pub fn format(
        self,
        property: &'static str,
        value: &Value,
    ) -> Result<Option<String>, Error> {
        if value.is_null() {
            return Ok(None);
        }

        let text = match (self, value) {
            (Primitive::Text, &Value::Text(ref s)) => Some(s.clone()),
            (Primitive::Boolean, &Value::Boolean(b)) => Some(b.to_string()),
            (Primitive::Integer, &Value::Integer(i)) => Some(i.to_string()),
            (Primitive::Double, &Value::Double(d)) => Some(d.to_string()),
            (Primitive::Double, &Value::Integer(i)) => Some(i.to_string()),
            (Primitive::Enumeration(names), value) => value
                .as_str()
                .filter(|s| names.contains(s))
                .map(str::to_owned),
            (Primitive::Base64, &Value::Binary(ref b)) => {
                Some(base64::encode(b))
            },
            (Primitive::Bias, &Value::Offset(o)) => {
                Some(chronox::format_bias(o))
            },
            (Primitive::Custom(codec), value) => (codec.format)(value),
            _ => None,
        };

        text.map(Some).ok_or(Error::TypeMismatch(property))
    }

    /// Check that `value` can be encoded by this codec, converting
    /// enumeration names given as text into their canonical form.
    pub fn normalise(
        self,
        property: &'static str,
        value: Value,
    ) -> Result<Value, Error> {
        if let Primitive::Enumeration(names) = self {
            return value
                .as_str()
                .and_then(|s| names.iter().find(|&&n| n == s))
                .map(|&name| Value::Enum(name))
                .ok_or(Error::TypeMismatch(property));
        }

        self.format(property, &value)?;
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use chrono::FixedOffset;
    use proptest::prelude::*;

    use super::*;
    use crate::support::chronox::FixedOffsetX;

    static SENSITIVITY: &[&str] =
        &["Normal", "Personal", "Private", "Confidential"];

    fn flip(codec: Primitive, value: Value) {
        let text = codec.format("Test", &value).unwrap().unwrap();
        assert_eq!(value, codec.parse("Test", &text, true).unwrap());
    }

    #[test]
    fn round_trips() {
        flip(Primitive::Text, Value::from("hello <world>"));
        flip(Primitive::Text, Value::from(""));
        flip(Primitive::Boolean, Value::from(true));
        flip(Primitive::Integer, Value::from(-42));
        flip(Primitive::Double, Value::from(1.5));
        flip(Primitive::Enumeration(SENSITIVITY), Value::Enum("Private"));
        flip(Primitive::Base64, Value::from(vec![0u8, 1, 2, 255]));
        flip(Primitive::Base64, Value::from(Vec::<u8>::new()));
        flip(Primitive::Bias, Value::from(FixedOffset::eastx(-5 * 3600)));
    }

    #[test]
    fn null_has_no_encoding() {
        assert_eq!(None, Primitive::Text.format("Test", &Value::Null).unwrap());
        assert_eq!(
            None,
            Primitive::Integer.format("Test", &Value::Null).unwrap()
        );
    }

    #[test]
    fn empty_text() {
        assert_eq!(
            Value::from(""),
            Primitive::Text.parse("Test", "", true).unwrap()
        );
        assert_eq!(
            Value::Binary(vec![]),
            Primitive::Base64.parse("Test", "", true).unwrap()
        );
        assert_eq!(
            Value::Null,
            Primitive::Integer.parse("Test", "", true).unwrap()
        );
        assert_eq!(
            Value::Null,
            Primitive::Boolean.parse("Test", " ", true).unwrap()
        );
    }

    #[test]
    fn malformed_values() {
        assert_matches!(
            Err(Error::Decode { .. }),
            Primitive::Integer.parse("Count", "twelve", true)
        );
        assert_matches!(
            Err(Error::Decode { .. }),
            Primitive::Boolean.parse("Flag", "yes", true)
        );
        assert_matches!(
            Err(Error::Decode { .. }),
            Primitive::Base64.parse("Blob", "!!!", true)
        );
        assert_matches!(
            Err(Error::Decode { .. }),
            Primitive::Enumeration(SENSITIVITY).parse("S", "Secret", true)
        );
        assert_matches!(
            Err(Error::Decode { .. }),
            Primitive::Bias.parse(
                "BaseOffset",
                "P99999999999999999999DT99999999999999999999H",
                true
            )
        );
        assert_eq!(
            Value::Null,
            Primitive::Enumeration(SENSITIVITY)
                .parse("S", "Secret", false)
                .unwrap()
        );
    }

    #[test]
    fn type_checks() {
        assert_matches!(
            Err(Error::TypeMismatch("Count")),
            Primitive::Integer.format("Count", &Value::from("3"))
        );
        assert_eq!(
            Value::Enum("Personal"),
            Primitive::Enumeration(SENSITIVITY)
                .normalise("S", Value::from("Personal"))
                .unwrap()
        );
        assert_matches!(
            Err(Error::TypeMismatch("S")),
            Primitive::Enumeration(SENSITIVITY)
                .normalise("S", Value::from("Secret"))
        );
    }

    proptest! {
        #[test]
        fn text_round_trip(s in ".*") {
            let text = Primitive::Text
                .format("Test", &Value::Text(s.clone()))
                .unwrap()
                .unwrap();
            prop_assert_eq!(
                Value::Text(s),
                Primitive::Text.parse("Test", &text, true).unwrap()
            );
        }

        #[test]
        fn integer_round_trip(i in any::<i64>()) {
            let text = Primitive::Integer
                .format("Test", &Value::Integer(i))
                .unwrap()
                .unwrap();
            prop_assert_eq!(
                Value::Integer(i),
                Primitive::Integer.parse("Test", &text, true).unwrap()
            );
        }

        #[test]
        fn binary_round_trip(
            bytes in prop::collection::vec(prop::num::u8::ANY, 0..64)
        ) {
            let text = Primitive::Base64
                .format("Test", &Value::Binary(bytes.clone()))
                .unwrap()
                .unwrap();
            prop_assert_eq!(
                Value::Binary(bytes),
                Primitive::Base64.parse("Test", &text, true).unwrap()
            );
        }

        #[test]
        fn bias_round_trip(minutes in -14 * 60i32..=14 * 60) {
            let offset = FixedOffset::eastx(minutes * 60);
            let text = Primitive::Bias
                .format("Test", &Value::Offset(offset))
                .unwrap()
                .unwrap();
            prop_assert_eq!(
                Value::Offset(offset),
                Primitive::Bias.parse("Test", &text, true).unwrap()
            );
        }
    }
}
