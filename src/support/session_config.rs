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

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use super::chronox::parse_utc_offset;
use super::error::Error;
use crate::property::version::ExchangeVersion;

/// Configuration for a connection to one server.
///
/// This is typically a `[session]` table in the embedding application's TOML
/// configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The protocol version to request.
    ///
    /// Properties introduced after this version are neither read nor written.
    pub version: ExchangeVersion,

    /// The time zone in which date-times without an explicit bias are
    /// interpreted, and to which date-times are scoped when written.
    ///
    /// Either `UTC` or an offset of the form `+05:30`.
    pub time_zone: String,

    /// If false, enumeration values the client does not know about decode to
    /// null instead of failing the whole response.
    ///
    /// Newer servers occasionally add enumeration members without bumping
    /// the protocol version.
    pub strict_decode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            version: ExchangeVersion::default(),
            time_zone: "UTC".to_owned(),
            strict_decode: true,
        }
    }
}

impl SessionConfig {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }
}

/// The validated form of `SessionConfig`, shared by every property bag of
/// the session.
#[derive(Clone, Debug)]
pub struct Session {
    pub version: ExchangeVersion,
    pub time_zone: FixedOffset,
    pub strict_decode: bool,
}

impl Session {
    pub fn new(version: ExchangeVersion, time_zone: FixedOffset) -> Self {
        Session {
            version,
            time_zone,
            strict_decode: true,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, Error> {
        let time_zone =
            parse_utc_offset(&config.time_zone).ok_or_else(|| {
                Error::BadConfig(format!(
                    "unrecognised time zone {:?}",
                    config.time_zone
                ))
            })?;

        Ok(Session {
            version: config.version,
            time_zone,
            strict_decode: config.strict_decode,
        })
    }
}
