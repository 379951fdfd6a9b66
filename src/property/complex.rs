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

//! Nested structured values and the change notification plumbing that lets
//! an edit deep inside one mark the owning property dirty.

use std::fmt;
use std::ptr;
use std::sync::{Mutex, Weak};

use log::warn;

use super::bag::PropertyOwner;
use super::primitive::Primitive;
use super::schema::Schema;
use super::value::Value;
use crate::support::error::Error;
use crate::support::field_set::FieldSet;
use crate::support::session_config::Session;
use crate::xml::{XmlNamespace, XmlRead, XmlWrite};

/// Where a field of a complex value lives in its XML form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// An attribute of the value's own element.
    Attribute,
    /// A child element.
    Element,
    /// The text content of the value's own element. A schema with a `Text`
    /// field cannot have `Element` fields.
    Text,
}

#[derive(Clone, Copy, Debug)]
pub enum FieldCodec {
    Primitive(Primitive),
    Nested(&'static ComplexSchema),
}

#[derive(Debug)]
pub struct ComplexField {
    /// The field name, which is also its attribute or element name.
    pub name: &'static str,
    pub placement: Placement,
    pub codec: FieldCodec,
}

/// The static layout of a kind of complex value.
#[derive(Debug)]
pub struct ComplexSchema {
    name: &'static str,
    fields: Vec<ComplexField>,
}

impl ComplexSchema {
    pub fn new(name: &'static str) -> Self {
        ComplexSchema {
            name,
            fields: Vec::new(),
        }
    }

    pub fn attribute(self, name: &'static str, codec: Primitive) -> Self {
        self.field(name, Placement::Attribute, FieldCodec::Primitive(codec))
    }

    pub fn element(self, name: &'static str, codec: Primitive) -> Self {
        self.field(name, Placement::Element, FieldCodec::Primitive(codec))
    }

    pub fn text(self, name: &'static str, codec: Primitive) -> Self {
        self.field(name, Placement::Text, FieldCodec::Primitive(codec))
    }

    pub fn nested(
        self,
        name: &'static str,
        schema: &'static ComplexSchema,
    ) -> Self {
        self.field(name, Placement::Element, FieldCodec::Nested(schema))
    }

    fn field(
        mut self,
        name: &'static str,
        placement: Placement,
        codec: FieldCodec,
    ) -> Self {
        self.fields.push(ComplexField {
            name,
            placement,
            codec,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[ComplexField] {
        &self.fields
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| name == f.name)
    }

    fn element_position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| Placement::Element == f.placement && name == f.name)
    }

    fn text_position(&self) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| Placement::Text == f.placement)
    }
}

/// Per-bag record of properties whose nested values changed in place.
pub(crate) struct ChangeLog {
    pub(crate) schema: &'static Schema,
    pub(crate) changed: FieldSet,
    pub(crate) owner: Option<Weak<dyn PropertyOwner>>,
}

impl ChangeLog {
    pub(crate) fn new(schema: &'static Schema) -> Self {
        ChangeLog {
            schema,
            changed: FieldSet::new(),
            owner: None,
        }
    }
}

/// A non-owning handle from a nested value back to the property bag slot
/// that owns it.
///
/// It is only ever used to report that the value changed; the bag owns the
/// value outright.
#[derive(Clone)]
pub struct ChangeNotifier {
    log: Weak<Mutex<ChangeLog>>,
    slot: usize,
}

impl ChangeNotifier {
    pub(crate) fn new(log: Weak<Mutex<ChangeLog>>, slot: usize) -> Self {
        ChangeNotifier { log, slot }
    }

    pub fn notify_changed(&self) {
        let log = match self.log.upgrade() {
            Some(log) => log,
            None => {
                warn!(
                    "Change to a nested value in slot {} whose property bag \
                     no longer exists",
                    self.slot
                );
                return;
            },
        };

        let (descriptor, owner) = {
            let mut log = log.lock().unwrap();
            log.changed.insert(self.slot);
            (log.schema.descriptor(self.slot), log.owner.clone())
        };

        if let (Some(descriptor), Some(owner)) =
            (descriptor, owner.and_then(|o| o.upgrade()))
        {
            owner.property_changed(descriptor);
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChangeNotifier(slot {})", self.slot)
    }
}

/// A nested structure, e.g. a mailbox or a time zone definition.
///
/// Clones are detached: changes to a clone are not reported to the bag the
/// original belongs to.
pub struct ComplexValue {
    schema: &'static ComplexSchema,
    values: Vec<Value>,
    notifier: Option<ChangeNotifier>,
}

impl Clone for ComplexValue {
    fn clone(&self) -> Self {
        ComplexValue {
            schema: self.schema,
            values: self.values.clone(),
            notifier: None,
        }
    }
}

impl PartialEq for ComplexValue {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.schema, other.schema) && self.values == other.values
    }
}

impl fmt::Debug for ComplexValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct(self.schema.name);
        for (field, value) in self.schema.fields.iter().zip(&self.values) {
            if !value.is_null() {
                s.field(field.name, value);
            }
        }
        s.finish()
    }
}

impl ComplexValue {
    pub fn new(schema: &'static ComplexSchema) -> Self {
        ComplexValue {
            schema,
            values: vec![Value::Null; schema.fields.len()],
            notifier: None,
        }
    }

    pub fn schema(&self) -> &'static ComplexSchema {
        self.schema
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }

    /// Builder-style `set()` for values not yet owned by a bag.
    pub fn with(
        mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<Self, Error> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&Value, Error> {
        let ix = self.position(name)?;
        Ok(&self.values[ix])
    }

    pub fn get_str(&self, name: &str) -> Result<Option<&str>, Error> {
        Ok(self.get(name)?.as_str())
    }

    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let ix = self.position(name)?;
        let schema = self.schema;
        let field = &schema.fields[ix];
        let mut value = value.into();

        if !value.is_null() {
            value = match (field.codec, value) {
                (FieldCodec::Primitive(codec), value) => {
                    codec.normalise(field.name, value)?
                },
                (FieldCodec::Nested(schema), Value::Complex(mut nested))
                    if ptr::eq(schema, nested.schema) =>
                {
                    nested.attach(self.notifier.clone());
                    Value::Complex(nested)
                },
                _ => return Err(Error::TypeMismatch(field.name)),
            };
        }

        self.values[ix] = value;
        self.notify_changed();
        Ok(())
    }

    /// Mutable access to a nested field, creating it empty if unset.
    pub fn nested_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut ComplexValue, Error> {
        let ix = self.position(name)?;
        let field = &self.schema.fields()[ix];
        let schema = match field.codec {
            FieldCodec::Nested(schema) => schema,
            FieldCodec::Primitive(_) => {
                return Err(Error::TypeMismatch(field.name))
            },
        };

        if self.values[ix].is_null() {
            let mut nested = ComplexValue::new(schema);
            nested.attach(self.notifier.clone());
            self.values[ix] = Value::Complex(nested);
        }

        self.values[ix]
            .as_complex_mut()
            .ok_or(Error::TypeMismatch(field.name))
    }

    /// Report that this value changed to whoever owns it, if anyone.
    pub fn notify_changed(&self) {
        if let Some(ref notifier) = self.notifier {
            notifier.notify_changed();
        }
    }

    /// Set (or with `None`, clear) the owner to notify of changes, here and
    /// in every nested value.
    pub(crate) fn attach(&mut self, notifier: Option<ChangeNotifier>) {
        for value in &mut self.values {
            if let Value::Complex(ref mut nested) = *value {
                nested.attach(notifier.clone());
            }
        }
        self.notifier = notifier;
    }

    fn position(&self, name: &str) -> Result<usize, Error> {
        self.schema
            .position(name)
            .ok_or_else(|| Error::UnknownField(name.to_owned(), self.schema.name))
    }

    /// Populate this value from the element the reader is positioned on,
    /// leaving the reader on its end element.
    ///
    /// Fields absent from the XML are left as they are.
    pub fn load_from_xml(
        &mut self,
        reader: &mut dyn XmlRead,
        session: &Session,
    ) -> Result<(), Error> {
        let schema = self.schema;
        for (ix, field) in schema.fields.iter().enumerate() {
            if Placement::Attribute != field.placement {
                continue;
            }

            if let (Some(text), FieldCodec::Primitive(codec)) =
                (reader.read_attribute_value(field.name), field.codec)
            {
                self.values[ix] =
                    codec.parse(field.name, &text, session.strict_decode)?;
            }
        }

        if let Some(ix) = schema.text_position() {
            let field = &schema.fields[ix];
            let text = reader.read_element_value()?;
            if let FieldCodec::Primitive(codec) = field.codec {
                self.values[ix] =
                    codec.parse(field.name, &text, session.strict_decode)?;
            }
            return Ok(());
        }

        loop {
            reader.advance()?;
            if reader.is_end_element(None, None) {
                return Ok(());
            }

            if !reader.is_start_element(None, None) {
                continue;
            }

            let ix = match schema.element_position(reader.local_name()) {
                Some(ix) => ix,
                None => {
                    reader.skip_current_element()?;
                    continue;
                },
            };

            let field = &schema.fields[ix];
            self.values[ix] = match field.codec {
                FieldCodec::Primitive(codec) => {
                    let text = reader.read_element_value()?;
                    codec.parse(field.name, &text, session.strict_decode)?
                },
                FieldCodec::Nested(schema) => {
                    let mut nested = ComplexValue::new(schema);
                    nested.load_from_xml(reader, session)?;
                    Value::Complex(nested)
                },
            };
        }
    }

    /// Write this value as an element called `element`.
    pub fn write_to_xml(
        &self,
        writer: &mut dyn XmlWrite,
        element: &str,
    ) -> Result<(), Error> {
        writer.write_start_element(XmlNamespace::Types, element)?;
        self.write_contents(writer)?;
        writer.write_end_element()
    }

    /// Write the attributes and content of this value into an element which
    /// has already been started.
    pub fn write_contents(
        &self,
        writer: &mut dyn XmlWrite,
    ) -> Result<(), Error> {
        let fields = self.schema.fields.iter().zip(&self.values);

        for (field, value) in fields.clone() {
            if let (Placement::Attribute, FieldCodec::Primitive(codec)) =
                (field.placement, field.codec)
            {
                if let Some(text) = codec.format(field.name, value)? {
                    writer.write_attribute_value(field.name, &text)?;
                }
            }
        }

        for (field, value) in fields {
            match (field.placement, field.codec) {
                (Placement::Attribute, _) => (),
                (Placement::Text, FieldCodec::Primitive(codec)) => {
                    if let Some(text) = codec.format(field.name, value)? {
                        writer.write_value(&text)?;
                    }
                },
                (Placement::Element, FieldCodec::Primitive(codec)) => {
                    if let Some(text) = codec.format(field.name, value)? {
                        writer.write_element_value(
                            XmlNamespace::Types,
                            field.name,
                            &text,
                        )?;
                    }
                },
                (_, FieldCodec::Nested(_)) => {
                    if let Value::Complex(ref nested) = *value {
                        nested.write_to_xml(writer, field.name)?;
                    }
                },
            }
        }

        Ok(())
    }
}
