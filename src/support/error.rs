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

use std::io;

use thiserror::Error;

use crate::property::version::ExchangeVersion;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Property {0} must be loaded or assigned before it can be read")]
    NotLoaded(&'static str),
    #[error("Property {0} has been deleted")]
    PropertyDeleted(&'static str),
    #[error("Property {0} does not hold a value of the requested type")]
    TypeMismatch(&'static str),
    #[error("Property {0} is read-only")]
    ReadOnly(&'static str),
    #[error("Property {0} cannot be updated")]
    NotUpdatable(&'static str),
    #[error("Property {0} cannot be deleted")]
    NotDeletable(&'static str),
    #[error("Property {0} cannot be set to null")]
    NotNullable(&'static str),
    #[error("Property {0} is not part of the {1} schema")]
    UnknownProperty(&'static str, &'static str),
    #[error("Field {0} is not part of the {1} structure")]
    UnknownField(String, &'static str),
    #[error(
        "Property {property} requires {required} but the session \
         negotiated {negotiated}"
    )]
    VersionIncompatible {
        property: &'static str,
        required: ExchangeVersion,
        negotiated: ExchangeVersion,
    },
    #[error("Malformed value {value:?} for {property}: {reason}")]
    Decode {
        property: String,
        value: String,
        reason: String,
    },
    #[error("Unexpected XML: {0}")]
    UnexpectedXml(String),
    #[error("Invalid session configuration: {0}")]
    BadConfig(String),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the caller can recover from this error by fetching the
    /// property from the server (or assigning it) and trying again.
    pub fn is_access_fault(&self) -> bool {
        matches!(
            *self,
            Error::NotLoaded(..)
                | Error::PropertyDeleted(..)
                | Error::TypeMismatch(..)
        )
    }

    pub(crate) fn decode(
        property: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Decode {
            property: property.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
