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

//! Versioned property bags for Exchange Web Services objects.
//!
//! Every addressable object on the server (folders, messages, contacts, ...)
//! is modelled as a `PropertyBag` over a per-type `Schema`. The schema lists
//! the `PropertyDescriptor`s of the type: their wire names, the protocol
//! version that introduced them, what may be done with them, and how their
//! values are projected to and from XML.
//!
//! The bag tracks which properties have been loaded from the server, which
//! have been changed locally and which have been deleted, so that a save
//! only sends the fields that actually changed (and, for collections that
//! support it, only the items that changed).

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod property;
pub mod schemas;
pub mod support;
pub mod xml;

pub use crate::property::bag::{PropertyBag, PropertyOwner};
pub use crate::property::collection::ComplexCollection;
pub use crate::property::complex::{ComplexSchema, ComplexValue};
pub use crate::property::descriptor::{PropertyDescriptor, PropertyFlags};
pub use crate::property::schema::{BasePropertySet, PropertySet, Schema};
pub use crate::property::update::{UpdateKind, UpdateOp};
pub use crate::property::value::Value;
pub use crate::property::version::ExchangeVersion;
pub use crate::support::error::Error;
pub use crate::support::session_config::{Session, SessionConfig};

#[cfg(test)]
static INIT_TEST_LOG: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
fn init_test_log() {
    INIT_TEST_LOG.call_once(|| {
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}][{}] {}",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message,
                ))
            })
            .level(log::LevelFilter::Trace)
            .chain(std::io::stderr())
            .apply()
            .unwrap();
    })
}
