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

//! The XML surface the property engine reads from and writes to.
//!
//! The engine only depends on the `XmlRead` and `XmlWrite` traits; the
//! transport layer may supply its own implementations. The ones provided
//! here sit on top of `quick-xml` and work on fully buffered documents.

pub mod reader;
pub mod writer;

pub use self::reader::{XmlRead, XmlReader};
pub use self::writer::{XmlWrite, XmlWriter};

/// The XML namespaces used by the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XmlNamespace {
    /// Data types: items, folders and all their properties.
    Types,
    /// Request and response messages.
    Messages,
    /// The SOAP envelope.
    Soap,
}

impl XmlNamespace {
    pub const ALL: [XmlNamespace; 3] = [
        XmlNamespace::Types,
        XmlNamespace::Messages,
        XmlNamespace::Soap,
    ];

    pub fn uri(self) -> &'static str {
        match self {
            XmlNamespace::Types => {
                "http://schemas.microsoft.com/exchange/services/2006/types"
            },
            XmlNamespace::Messages => {
                "http://schemas.microsoft.com/exchange/services/2006/messages"
            },
            XmlNamespace::Soap => "http://schemas.xmlsoap.org/soap/envelope/",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            XmlNamespace::Types => "t",
            XmlNamespace::Messages => "m",
            XmlNamespace::Soap => "soap",
        }
    }

    pub fn from_uri(uri: &[u8]) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ns| ns.uri().as_bytes() == uri)
    }
}
