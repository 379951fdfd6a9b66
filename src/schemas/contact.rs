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

//! The contact schema.
//!
//! E-mail addresses and phone numbers are dictionaries: each key is a
//! property of its own, but all keys of one dictionary share an element.

use lazy_static::lazy_static;

use super::item;
use crate::property::descriptor::{PropertyDescriptor, PropertyFlags};
use crate::property::primitive::Primitive;
use crate::property::schema::{Schema, UpdateTarget};
use crate::property::version::ExchangeVersion;

fn email_address(key: &'static str) -> PropertyDescriptor {
    PropertyDescriptor::primitive(
        "EmailAddresses",
        "contacts:EmailAddress",
        Primitive::Text,
    )
    .indexed(key)
    .with_flags(PropertyFlags::MUTABLE)
}

fn phone_number(key: &'static str) -> PropertyDescriptor {
    PropertyDescriptor::primitive(
        "PhoneNumbers",
        "contacts:PhoneNumber",
        Primitive::Text,
    )
    .indexed(key)
    .with_flags(PropertyFlags::MUTABLE)
}

fn text(element: &'static str, uri: &'static str) -> PropertyDescriptor {
    PropertyDescriptor::primitive(element, uri, Primitive::Text)
        .with_flags(PropertyFlags::MUTABLE)
}

lazy_static! {
    pub static ref FILE_AS: PropertyDescriptor =
        text("FileAs", "contacts:FileAs");
    pub static ref DISPLAY_NAME: PropertyDescriptor =
        text("DisplayName", "contacts:DisplayName");
    pub static ref GIVEN_NAME: PropertyDescriptor =
        text("GivenName", "contacts:GivenName");
    pub static ref SURNAME: PropertyDescriptor =
        text("Surname", "contacts:Surname");
    pub static ref COMPANY_NAME: PropertyDescriptor =
        text("CompanyName", "contacts:CompanyName");

    pub static ref EMAIL_ADDRESS_1: PropertyDescriptor =
        email_address("EmailAddress1");
    pub static ref EMAIL_ADDRESS_2: PropertyDescriptor =
        email_address("EmailAddress2");
    pub static ref EMAIL_ADDRESS_3: PropertyDescriptor =
        email_address("EmailAddress3");

    pub static ref HOME_PHONE: PropertyDescriptor = phone_number("HomePhone");
    pub static ref BUSINESS_PHONE: PropertyDescriptor =
        phone_number("BusinessPhone");
    pub static ref MOBILE_PHONE: PropertyDescriptor =
        phone_number("MobilePhone");

    pub static ref BIRTHDAY: PropertyDescriptor =
        PropertyDescriptor::date_time("Birthday", "contacts:Birthday")
            .with_flags(PropertyFlags::MUTABLE);

    /// The contact's picture. Large, so only fetched on request.
    pub static ref PHOTO: PropertyDescriptor =
        PropertyDescriptor::primitive("Photo", "contacts:Photo", Primitive::Base64)
            .with_flags(PropertyFlags::REQUIRES_EXPLICIT_LOAD)
            .since(ExchangeVersion::Exchange2013);

    pub static ref SCHEMA: Schema =
        Schema::builder("Contact", UpdateTarget::Item)
            .id(&item::ITEM_ID)
            .summary(&item::SUBJECT)
            .summary(&item::SENSITIVITY)
            .first_class(&item::BODY)
            .summary(&item::CATEGORIES)
            .summary(&FILE_AS)
            .summary(&DISPLAY_NAME)
            .summary(&GIVEN_NAME)
            .summary(&SURNAME)
            .summary(&COMPANY_NAME)
            .first_class(&EMAIL_ADDRESS_1)
            .first_class(&EMAIL_ADDRESS_2)
            .first_class(&EMAIL_ADDRESS_3)
            .first_class(&HOME_PHONE)
            .first_class(&BUSINESS_PHONE)
            .first_class(&MOBILE_PHONE)
            .first_class(&BIRTHDAY)
            .field(&PHOTO)
            .build();
}
