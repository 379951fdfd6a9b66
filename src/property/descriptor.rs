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

//! Property descriptors: the immutable metadata and codec of one field of an
//! object type.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

use bitflags::bitflags;
use chrono::FixedOffset;

use super::collection::ComplexCollection;
use super::complex::{ComplexSchema, ComplexValue};
use super::datetime;
use super::primitive::Primitive;
use super::value::Value;
use super::version::ExchangeVersion;
use crate::support::error::Error;
use crate::support::session_config::Session;
use crate::xml::{XmlNamespace, XmlRead, XmlWrite};

bitflags! {
    pub struct PropertyFlags: u32 {
        /// The property may be given a value on a new object.
        const SETTABLE = 1 << 0;
        /// The property may be deleted from an existing object.
        const DELETABLE = 1 << 1;
        /// The property may be changed on an existing object.
        const UPDATABLE = 1 << 2;
        /// Values may be appended to the property on an existing object.
        const APPENDABLE = 1 << 3;
        /// The property is never part of the default view and must be
        /// requested by name.
        const REQUIRES_EXPLICIT_LOAD = 1 << 4;
        /// When loading, merge into the existing nested value rather than
        /// replacing it.
        const REUSE_INSTANCE = 1 << 5;
        /// Changes to a collection are written as per-item operations.
        const ITEM_LEVEL_UPDATES = 1 << 6;
        /// Reading the unset property yields an empty nested value, which
        /// mutable access instantiates in place.
        const AUTO_CREATE_ON_READ = 1 << 7;

        const MUTABLE = Self::SETTABLE.bits
            | Self::DELETABLE.bits
            | Self::UPDATABLE.bits;
    }
}

/// How a property's value maps onto its XML element.
#[derive(Debug)]
pub enum PropertyKind {
    /// The element's text, through a scalar codec.
    Primitive(Primitive),
    /// The element's text as a date-time, converted between the wall-clock
    /// time held in memory and the time zone chosen by
    /// `datetime::scoping_zone()`.
    ///
    /// `linked_zone` is the URI of the time zone property of the same object
    /// which takes precedence over the session zone when it has been
    /// changed.
    DateTimeScoped { linked_zone: Option<&'static str> },
    /// The element is a nested structure.
    Complex(&'static ComplexSchema),
    /// The element contains a sequence of `item_element` elements.
    Collection {
        item_schema: &'static ComplexSchema,
        item_element: &'static str,
    },
    /// One slot of a dictionary. The property's element is the dictionary,
    /// which contains `<t:Entry Key="key">` elements whose content is
    /// described by `inner`.
    Indexed {
        key: &'static str,
        inner: Box<PropertyKind>,
    },
    /// The property's element contains exactly one `wrapper` element whose
    /// content is described by `inner`.
    Contained {
        wrapper: &'static str,
        inner: Box<PropertyKind>,
    },
}

/// What an encoder needs to know beyond the value itself.
#[derive(Clone, Copy, Debug)]
pub struct EncodeContext<'a> {
    pub session: &'a Session,
    /// Whether the value is being written as part of an update (rather than
    /// creation) of an object.
    pub is_update: bool,
    /// The zone of the linked time zone property, if it has been changed.
    pub linked_zone: Option<FixedOffset>,
}

impl<'a> EncodeContext<'a> {
    pub fn new(session: &'a Session, is_update: bool) -> Self {
        EncodeContext {
            session,
            is_update,
            linked_zone: None,
        }
    }

    fn scoping_zone(&self) -> Option<FixedOffset> {
        datetime::scoping_zone(
            self.is_update,
            self.session.version,
            self.session.time_zone,
            self.linked_zone,
        )
    }
}

impl PropertyKind {
    fn innermost(&self) -> &PropertyKind {
        match *self {
            PropertyKind::Indexed { ref inner, .. }
            | PropertyKind::Contained { ref inner, .. } => inner.innermost(),
            ref kind => kind,
        }
    }

    fn empty_value(&self) -> Value {
        match *self.innermost() {
            PropertyKind::Complex(schema) => {
                Value::Complex(ComplexValue::new(schema))
            },
            PropertyKind::Collection {
                item_schema,
                item_element,
            } => Value::Collection(ComplexCollection::new(
                item_schema,
                item_element,
            )),
            _ => Value::Null,
        }
    }

    fn normalise(
        &self,
        property: &'static str,
        value: Value,
    ) -> Result<Value, Error> {
        match (self.innermost(), value) {
            (&PropertyKind::Primitive(codec), value) => {
                codec.normalise(property, value)
            },
            (&PropertyKind::DateTimeScoped { .. }, v @ Value::DateTime(_)) => {
                Ok(v)
            },
            (&PropertyKind::Complex(schema), Value::Complex(v))
                if ptr::eq(schema, v.schema()) =>
            {
                Ok(Value::Complex(v))
            },
            (
                &PropertyKind::Collection {
                    item_schema,
                    item_element,
                },
                Value::Collection(v),
            ) if ptr::eq(item_schema, v.item_schema())
                && item_element == v.item_element() =>
            {
                Ok(Value::Collection(v))
            },
            _ => Err(Error::TypeMismatch(property)),
        }
    }

    /// Decode the content of the element the reader is on, leaving the
    /// reader on its end element.
    ///
    /// `existing` is reused for nested values of the same shape.
    fn decode_content(
        &self,
        property: &'static str,
        reader: &mut dyn XmlRead,
        session: &Session,
        existing: Option<Value>,
    ) -> Result<Value, Error> {
        match *self {
            PropertyKind::Primitive(codec) => {
                let text = reader.read_element_value()?;
                codec.parse(property, &text, session.strict_decode)
            },

            PropertyKind::DateTimeScoped { .. } => {
                let text = reader.read_element_value()?;
                datetime::decode(property, &text, session.time_zone)
            },

            PropertyKind::Complex(schema) => {
                let mut value = match existing {
                    Some(Value::Complex(v)) if ptr::eq(schema, v.schema()) => v,
                    _ => ComplexValue::new(schema),
                };
                value.load_from_xml(reader, session)?;
                Ok(Value::Complex(value))
            },

            PropertyKind::Collection {
                item_schema,
                item_element,
            } => {
                let mut value = match existing {
                    Some(Value::Collection(v))
                        if ptr::eq(item_schema, v.item_schema()) =>
                    {
                        v
                    },
                    _ => ComplexCollection::new(item_schema, item_element),
                };
                value.load_from_xml(reader, session)?;
                Ok(Value::Collection(value))
            },

            PropertyKind::Indexed { ref inner, .. } => {
                inner.decode_content(property, reader, session, existing)
            },

            PropertyKind::Contained { wrapper, ref inner } => {
                let mut existing = existing;
                let mut value = Value::Null;
                loop {
                    reader.advance()?;
                    if reader.is_end_element(None, None) {
                        return Ok(value);
                    }

                    if reader
                        .is_start_element(Some(XmlNamespace::Types), Some(wrapper))
                    {
                        value = inner.decode_content(
                            property,
                            reader,
                            session,
                            existing.take(),
                        )?;
                    } else {
                        reader.skip_current_element()?;
                    }
                }
            },
        }
    }

    /// Write `value` into an element which has already been started.
    fn encode_content(
        &self,
        property: &'static str,
        writer: &mut dyn XmlWrite,
        value: &Value,
        ctx: &EncodeContext,
    ) -> Result<(), Error> {
        match *self {
            PropertyKind::Primitive(codec) => {
                if let Some(text) = codec.format(property, value)? {
                    writer.write_value(&text)?;
                }
                Ok(())
            },

            PropertyKind::DateTimeScoped { .. } => {
                if let Some(text) =
                    datetime::encode(property, value, ctx.scoping_zone())?
                {
                    writer.write_value(&text)?;
                }
                Ok(())
            },

            PropertyKind::Complex(_) => match *value {
                Value::Null => Ok(()),
                Value::Complex(ref v) => v.write_contents(writer),
                _ => Err(Error::TypeMismatch(property)),
            },

            PropertyKind::Collection { .. } => match *value {
                Value::Null => Ok(()),
                Value::Collection(ref v) => v.write_contents(writer),
                _ => Err(Error::TypeMismatch(property)),
            },

            PropertyKind::Indexed { ref inner, .. } => {
                inner.encode_content(property, writer, value, ctx)
            },

            PropertyKind::Contained { wrapper, ref inner } => {
                if value.is_null() {
                    return Ok(());
                }

                writer.write_start_element(XmlNamespace::Types, wrapper)?;
                inner.encode_content(property, writer, value, ctx)?;
                writer.write_end_element()
            },
        }
    }

    /// Write only `items` into an already-started element of a collection
    /// property.
    fn encode_items(
        &self,
        property: &'static str,
        writer: &mut dyn XmlWrite,
        items: &[&ComplexValue],
    ) -> Result<(), Error> {
        match *self {
            PropertyKind::Collection { item_element, .. } => {
                for item in items {
                    item.write_to_xml(writer, item_element)?;
                }
                Ok(())
            },
            PropertyKind::Contained { wrapper, ref inner } => {
                writer.write_start_element(XmlNamespace::Types, wrapper)?;
                inner.encode_items(property, writer, items)?;
                writer.write_end_element()
            },
            PropertyKind::Indexed { ref inner, .. } => {
                inner.encode_items(property, writer, items)
            },
            _ => Err(Error::TypeMismatch(property)),
        }
    }
}

/// The metadata and codec of one field of an object type.
///
/// Descriptors are built once, inside `lazy_static!`, and referred to by
/// `&'static` reference thereafter. Two descriptors are equal if they address
/// the same field (URI and, for indexed properties, key).
pub struct PropertyDescriptor {
    name: &'static str,
    xml_element: &'static str,
    uri: &'static str,
    min_version: ExchangeVersion,
    flags: PropertyFlags,
    flag_gates: Vec<(PropertyFlags, ExchangeVersion)>,
    nullable: bool,
    default: Option<Value>,
    kind: PropertyKind,
}

impl PropertyDescriptor {
    fn new(
        xml_element: &'static str,
        uri: &'static str,
        kind: PropertyKind,
    ) -> Self {
        PropertyDescriptor {
            name: xml_element,
            xml_element,
            uri,
            min_version: ExchangeVersion::OLDEST,
            flags: PropertyFlags::empty(),
            flag_gates: Vec::new(),
            nullable: true,
            default: None,
            kind,
        }
    }

    pub fn primitive(
        xml_element: &'static str,
        uri: &'static str,
        codec: Primitive,
    ) -> Self {
        Self::new(xml_element, uri, PropertyKind::Primitive(codec))
    }

    /// A date-time scoped to the session time zone.
    pub fn date_time(xml_element: &'static str, uri: &'static str) -> Self {
        Self::new(
            xml_element,
            uri,
            PropertyKind::DateTimeScoped { linked_zone: None },
        )
    }

    /// A date-time which follows the time zone property with URI
    /// `zone_uri` whenever that property has been changed.
    pub fn linked_date_time(
        xml_element: &'static str,
        uri: &'static str,
        zone_uri: &'static str,
    ) -> Self {
        Self::new(
            xml_element,
            uri,
            PropertyKind::DateTimeScoped {
                linked_zone: Some(zone_uri),
            },
        )
    }

    pub fn complex(
        xml_element: &'static str,
        uri: &'static str,
        schema: &'static ComplexSchema,
    ) -> Self {
        Self::new(xml_element, uri, PropertyKind::Complex(schema))
    }

    pub fn collection(
        xml_element: &'static str,
        uri: &'static str,
        item_schema: &'static ComplexSchema,
        item_element: &'static str,
    ) -> Self {
        Self::new(
            xml_element,
            uri,
            PropertyKind::Collection {
                item_schema,
                item_element,
            },
        )
    }

    /// Turn this into the `key` slot of a dictionary. The element name
    /// becomes that of the dictionary and the display name becomes `key`.
    pub fn indexed(mut self, key: &'static str) -> Self {
        let inner = Box::new(self.kind);
        self.kind = PropertyKind::Indexed { key, inner };
        self.name = key;
        self
    }

    /// Wrap the content of this property's element in a `wrapper` element.
    pub fn contained(mut self, wrapper: &'static str) -> Self {
        let inner = Box::new(self.kind);
        self.kind = PropertyKind::Contained { wrapper, inner };
        self
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Only consider `flags` set from `version` onwards.
    pub fn flag_since(
        mut self,
        flags: PropertyFlags,
        version: ExchangeVersion,
    ) -> Self {
        self.flags |= flags;
        self.flag_gates.push((flags, version));
        self
    }

    pub fn since(mut self, version: ExchangeVersion) -> Self {
        self.min_version = version;
        self
    }

    pub fn non_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Make the unset property read as an empty nested value.
    pub fn auto_create(mut self) -> Self {
        self.flags |= PropertyFlags::AUTO_CREATE_ON_READ;
        self.default = Some(self.kind.empty_value());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn xml_element(&self) -> &'static str {
        self.xml_element
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    pub fn min_version(&self) -> ExchangeVersion {
        self.min_version
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// The dictionary key, for indexed properties.
    pub fn index_key(&self) -> Option<&'static str> {
        match self.kind {
            PropertyKind::Indexed { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The URI of the linked time zone property, for date-times which have
    /// one.
    pub fn linked_zone(&self) -> Option<&'static str> {
        match *self.kind.innermost() {
            PropertyKind::DateTimeScoped { linked_zone } => linked_zone,
            _ => None,
        }
    }

    pub fn is_applicable(&self, version: ExchangeVersion) -> bool {
        version >= self.min_version
    }

    /// Whether all of `flags` are set at `version`.
    pub fn has_flag(
        &self,
        flags: PropertyFlags,
        version: ExchangeVersion,
    ) -> bool {
        self.flags.contains(flags)
            && self
                .flag_gates
                .iter()
                .filter(|&&(gated, _)| gated.intersects(flags))
                .all(|&(_, since)| version >= since)
    }

    /// Check that `value` can be held by this property, canonicalising it
    /// if needed. `Null` is always accepted.
    pub fn normalise(&self, value: Value) -> Result<Value, Error> {
        if value.is_null() {
            Ok(value)
        } else {
            self.kind.normalise(self.name, value)
        }
    }

    /// Decode the element the reader is positioned on, leaving the reader on
    /// its end element. For indexed properties, this is the `Entry` element
    /// within the dictionary.
    ///
    /// `existing` is the value already held, which is merged into instead of
    /// replaced if it is nested and of the same shape.
    pub fn decode(
        &self,
        reader: &mut dyn XmlRead,
        session: &Session,
        existing: Option<Value>,
    ) -> Result<Value, Error> {
        self.kind
            .decode_content(self.name, reader, session, existing)
    }

    /// Write `value` as this property's complete element.
    ///
    /// Indexed properties are written as a dictionary containing just this
    /// property's entry. Nothing at all is written for `Null`.
    pub fn encode(
        &self,
        writer: &mut dyn XmlWrite,
        value: &Value,
        ctx: &EncodeContext,
    ) -> Result<(), Error> {
        if value.is_null() {
            return Ok(());
        }

        writer.write_start_element(XmlNamespace::Types, self.xml_element)?;
        if self.index_key().is_some() {
            self.encode_entry(writer, value, ctx)?;
        } else {
            self.kind.encode_content(self.name, writer, value, ctx)?;
        }
        writer.write_end_element()
    }

    /// Write the `Entry` element of an indexed property into an
    /// already-started dictionary element.
    pub fn encode_entry(
        &self,
        writer: &mut dyn XmlWrite,
        value: &Value,
        ctx: &EncodeContext,
    ) -> Result<(), Error> {
        let key = self.index_key().ok_or(Error::TypeMismatch(self.name))?;
        if value.is_null() {
            return Ok(());
        }

        writer.write_start_element(XmlNamespace::Types, "Entry")?;
        writer.write_attribute_value("Key", key)?;
        self.kind.encode_content(self.name, writer, value, ctx)?;
        writer.write_end_element()
    }

    /// Write this property's element containing only `items`, which must
    /// belong to a collection of this property's item type.
    pub fn encode_items(
        &self,
        writer: &mut dyn XmlWrite,
        items: &[&ComplexValue],
    ) -> Result<(), Error> {
        writer.write_start_element(XmlNamespace::Types, self.xml_element)?;
        self.kind.encode_items(self.name, writer, items)?;
        writer.write_end_element()
    }
}

impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.index_key() == other.index_key()
    }
}

impl Eq for PropertyDescriptor {}

impl Hash for PropertyDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.index_key().hash(state);
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.index_key() {
            Some(key) => write!(f, "PropertyDescriptor({}[{}])", self.uri, key),
            None => write!(f, "PropertyDescriptor({})", self.uri),
        }
    }
}
