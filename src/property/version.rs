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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A version of the Exchange Web Services protocol.
///
/// The version is negotiated per session; properties introduced in a later
/// version than the negotiated one do not exist as far as that session is
/// concerned.
#[derive(
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub enum ExchangeVersion {
    #[serde(rename = "Exchange2007_SP1")]
    Exchange2007Sp1,
    #[serde(rename = "Exchange2010")]
    Exchange2010,
    #[serde(rename = "Exchange2010_SP1")]
    Exchange2010Sp1,
    #[serde(rename = "Exchange2010_SP2")]
    Exchange2010Sp2,
    #[serde(rename = "Exchange2013")]
    Exchange2013,
    #[serde(rename = "Exchange2013_SP1")]
    Exchange2013Sp1,
}

impl ExchangeVersion {
    pub const OLDEST: Self = ExchangeVersion::Exchange2007Sp1;
    pub const NEWEST: Self = ExchangeVersion::Exchange2013Sp1;

    /// Versions which predate server-side resolution of unscoped date-times
    /// against the time zones sent alongside them.
    pub fn is_legacy(self) -> bool {
        self < ExchangeVersion::Exchange2010
    }

    /// The `RequestServerVersion` name of this version.
    pub fn wire_name(self) -> &'static str {
        match self {
            ExchangeVersion::Exchange2007Sp1 => "Exchange2007_SP1",
            ExchangeVersion::Exchange2010 => "Exchange2010",
            ExchangeVersion::Exchange2010Sp1 => "Exchange2010_SP1",
            ExchangeVersion::Exchange2010Sp2 => "Exchange2010_SP2",
            ExchangeVersion::Exchange2013 => "Exchange2013",
            ExchangeVersion::Exchange2013Sp1 => "Exchange2013_SP1",
        }
    }
}

impl Default for ExchangeVersion {
    fn default() -> Self {
        ExchangeVersion::NEWEST
    }
}

impl fmt::Display for ExchangeVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ExchangeVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        use self::ExchangeVersion::*;

        [
            Exchange2007Sp1,
            Exchange2010,
            Exchange2010Sp1,
            Exchange2010Sp2,
            Exchange2013,
            Exchange2013Sp1,
        ]
        .iter()
        .copied()
        .find(|v| v.wire_name() == s)
        .ok_or(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ordering_and_names() {
        assert!(ExchangeVersion::Exchange2007Sp1 < ExchangeVersion::Exchange2010);
        assert!(ExchangeVersion::Exchange2013 < ExchangeVersion::NEWEST);
        assert!(ExchangeVersion::Exchange2007Sp1.is_legacy());
        assert!(!ExchangeVersion::Exchange2010.is_legacy());

        assert_eq!(
            Ok(ExchangeVersion::Exchange2010Sp2),
            "Exchange2010_SP2".parse()
        );
        assert_eq!(Err(()), "Exchange2016".parse::<ExchangeVersion>());
        assert_eq!("Exchange2013_SP1", ExchangeVersion::NEWEST.to_string());
    }
}
