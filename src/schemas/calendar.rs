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

//! The calendar item schema.

use lazy_static::lazy_static;

use super::item;
use crate::property::complex::ComplexSchema;
use crate::property::datetime::TIME_ZONE;
use crate::property::descriptor::{PropertyDescriptor, PropertyFlags};
use crate::property::primitive::Primitive;
use crate::property::schema::{Schema, UpdateTarget};
use crate::property::version::ExchangeVersion;

pub static RESPONSE_TYPE_NAMES: &[&str] = &[
    "Unknown",
    "Organizer",
    "Tentative",
    "Accept",
    "Decline",
    "NoResponseReceived",
];

lazy_static! {
    pub static ref ATTENDEE: ComplexSchema = ComplexSchema::new("Attendee")
        .nested("Mailbox", &item::MAILBOX)
        .element("ResponseType", Primitive::Enumeration(RESPONSE_TYPE_NAMES));

    pub static ref START: PropertyDescriptor =
        PropertyDescriptor::linked_date_time(
            "Start",
            "calendar:Start",
            "calendar:StartTimeZone",
        )
        .with_flags(PropertyFlags::MUTABLE);

    pub static ref END: PropertyDescriptor =
        PropertyDescriptor::linked_date_time(
            "End",
            "calendar:End",
            "calendar:EndTimeZone",
        )
        .with_flags(PropertyFlags::MUTABLE);

    pub static ref IS_ALL_DAY_EVENT: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "IsAllDayEvent",
            "calendar:IsAllDayEvent",
            Primitive::Boolean,
        )
        .with_flags(PropertyFlags::MUTABLE)
        .with_default(false);

    pub static ref LOCATION: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "Location",
            "calendar:Location",
            Primitive::Text,
        )
        .with_flags(PropertyFlags::MUTABLE);

    /// Set by the server from the mailbox the item was created in.
    pub static ref ORGANIZER: PropertyDescriptor =
        PropertyDescriptor::complex(
            "Organizer",
            "calendar:Organizer",
            &item::MAILBOX,
        )
        .contained("Mailbox")
        .with_flags(PropertyFlags::REUSE_INSTANCE);

    pub static ref REQUIRED_ATTENDEES: PropertyDescriptor =
        PropertyDescriptor::collection(
            "RequiredAttendees",
            "calendar:RequiredAttendees",
            &ATTENDEE,
            "Attendee",
        )
        .with_flags(PropertyFlags::MUTABLE | PropertyFlags::APPENDABLE)
        .flag_since(
            PropertyFlags::ITEM_LEVEL_UPDATES,
            ExchangeVersion::Exchange2013,
        )
        .auto_create();

    pub static ref START_TIME_ZONE: PropertyDescriptor =
        PropertyDescriptor::complex(
            "StartTimeZone",
            "calendar:StartTimeZone",
            &TIME_ZONE,
        )
        .with_flags(PropertyFlags::MUTABLE)
        .since(ExchangeVersion::Exchange2010);

    pub static ref END_TIME_ZONE: PropertyDescriptor =
        PropertyDescriptor::complex(
            "EndTimeZone",
            "calendar:EndTimeZone",
            &TIME_ZONE,
        )
        .with_flags(PropertyFlags::MUTABLE)
        .since(ExchangeVersion::Exchange2010);

    pub static ref SCHEMA: Schema =
        Schema::builder("CalendarItem", UpdateTarget::Item)
            .id(&item::ITEM_ID)
            .summary(&item::SUBJECT)
            .summary(&item::SENSITIVITY)
            .first_class(&item::BODY)
            .summary(&item::CATEGORIES)
            .summary(&START)
            .summary(&END)
            .summary(&IS_ALL_DAY_EVENT)
            .summary(&LOCATION)
            .summary(&ORGANIZER)
            .first_class(&REQUIRED_ATTENDEES)
            .first_class(&START_TIME_ZONE)
            .first_class(&END_TIME_ZONE)
            .build();
}
