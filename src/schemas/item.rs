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

//! Properties and structures shared by every kind of item.

use lazy_static::lazy_static;

use crate::property::complex::ComplexSchema;
use crate::property::descriptor::{PropertyDescriptor, PropertyFlags};
use crate::property::primitive::Primitive;

pub static SENSITIVITY_NAMES: &[&str] =
    &["Normal", "Personal", "Private", "Confidential"];
pub static BODY_TYPE_NAMES: &[&str] = &["HTML", "Text"];
pub static ROUTING_TYPE_NAMES: &[&str] = &["SMTP", "EX"];

lazy_static! {
    pub static ref ITEM_ID_SCHEMA: ComplexSchema = ComplexSchema::new("ItemId")
        .attribute("Id", Primitive::Text)
        .attribute("ChangeKey", Primitive::Text);

    pub static ref BODY_SCHEMA: ComplexSchema = ComplexSchema::new("Body")
        .attribute("BodyType", Primitive::Enumeration(BODY_TYPE_NAMES))
        .text("Value", Primitive::Text);

    pub static ref MAILBOX: ComplexSchema = ComplexSchema::new("Mailbox")
        .element("Name", Primitive::Text)
        .element("EmailAddress", Primitive::Text)
        .element("RoutingType", Primitive::Enumeration(ROUTING_TYPE_NAMES));

    pub static ref ITEM_ID: PropertyDescriptor =
        PropertyDescriptor::complex("ItemId", "item:ItemId", &ITEM_ID_SCHEMA);

    pub static ref SUBJECT: PropertyDescriptor =
        PropertyDescriptor::primitive("Subject", "item:Subject", Primitive::Text)
            .with_flags(PropertyFlags::MUTABLE);

    pub static ref SENSITIVITY: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "Sensitivity",
            "item:Sensitivity",
            Primitive::Enumeration(SENSITIVITY_NAMES),
        )
        .with_flags(PropertyFlags::SETTABLE | PropertyFlags::UPDATABLE)
        .non_nullable();

    pub static ref BODY: PropertyDescriptor =
        PropertyDescriptor::complex("Body", "item:Body", &BODY_SCHEMA)
            .with_flags(PropertyFlags::MUTABLE | PropertyFlags::APPENDABLE);

    pub static ref CATEGORIES_SCHEMA: ComplexSchema =
        ComplexSchema::new("String").text("Value", Primitive::Text);

    pub static ref CATEGORIES: PropertyDescriptor =
        PropertyDescriptor::collection(
            "Categories",
            "item:Categories",
            &CATEGORIES_SCHEMA,
            "String",
        )
        .with_flags(PropertyFlags::MUTABLE | PropertyFlags::APPENDABLE)
        .auto_create();
}
