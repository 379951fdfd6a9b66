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

//! The per-object store of property values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use chrono::prelude::*;
use log::debug;

use super::collection::ComplexCollection;
use super::complex::{ChangeLog, ChangeNotifier, ComplexValue};
use super::datetime;
use super::descriptor::{EncodeContext, PropertyDescriptor, PropertyFlags};
use super::schema::{PropertySet, Schema};
use super::update::UpdateOp;
use super::value::Value;
use super::version::ExchangeVersion;
use crate::support::error::Error;
use crate::support::field_set::FieldSet;
use crate::support::session_config::Session;
use crate::xml::{XmlNamespace, XmlRead, XmlWrite};

/// The object a property bag belongs to, which wants to know when it becomes
/// dirty.
pub trait PropertyOwner: Send + Sync {
    fn property_changed(&self, descriptor: &'static PropertyDescriptor);
}

static NULL: Value = Value::Null;

/// The values of one object's properties, along with what has been loaded
/// from the server and what has been changed since.
///
/// Properties are addressed by descriptor; each value is stored against the
/// descriptor's slot in the object type's `Schema`. `Value::Null` is never
/// stored: a property with no value is simply absent from `values`, and
/// whether that means "unknown" or "known to be empty" is decided by the
/// `loaded` set.
///
/// `modified` holds properties which were assigned as a whole, `deleted`
/// those which were deleted; the two are always disjoint. Properties whose
/// nested values were changed in place are tracked separately in the change
/// log shared with those values.
pub struct PropertyBag {
    schema: &'static Schema,
    session: Arc<Session>,
    values: BTreeMap<usize, Value>,
    loaded: FieldSet,
    modified: FieldSet,
    deleted: FieldSet,
    changes: Arc<Mutex<ChangeLog>>,
    is_new: bool,
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct(self.schema.element());
        for (&slot, value) in &self.values {
            if let Some(descriptor) = self.schema.descriptor(slot) {
                s.field(descriptor.name(), value);
            }
        }
        s.finish()
    }
}

impl PropertyBag {
    pub fn new(schema: &'static Schema, session: Arc<Session>) -> Self {
        PropertyBag {
            schema,
            session,
            values: BTreeMap::new(),
            loaded: FieldSet::new(),
            modified: FieldSet::new(),
            deleted: FieldSet::new(),
            changes: Arc::new(Mutex::new(ChangeLog::new(schema))),
            is_new: true,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Whether the object has never been loaded from or saved to the server.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Register the object to notify whenever a property becomes dirty.
    pub fn set_owner<O: PropertyOwner + 'static>(&self, owner: &Arc<O>) {
        let weak: Weak<O> = Arc::downgrade(owner);
        self.changes.lock().unwrap().owner =
            Some(weak as Weak<dyn PropertyOwner>);
    }

    /// Read a property.
    ///
    /// Fails with `NotLoaded` if the property was neither loaded nor
    /// assigned and has no default. A property which was requested but which
    /// the server did not return reads as `Null`.
    pub fn get(&self, descriptor: &PropertyDescriptor) -> Result<&Value, Error> {
        let (slot, descriptor) = self.resolve(descriptor)?;

        if let Some(value) = self.values.get(&slot) {
            Ok(value)
        } else if self.deleted.contains(slot) {
            Err(Error::PropertyDeleted(descriptor.name()))
        } else if let Some(default) = descriptor.default() {
            Ok(default)
        } else if self.loaded.contains(slot) {
            Ok(&NULL)
        } else {
            Err(Error::NotLoaded(descriptor.name()))
        }
    }

    fn typed<'a, T>(
        &'a self,
        descriptor: &PropertyDescriptor,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, Error> {
        let value = self.get(descriptor)?;
        if value.is_null() {
            return Ok(None);
        }

        extract(value)
            .map(Some)
            .ok_or(Error::TypeMismatch(descriptor.name()))
    }

    pub fn get_str(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<&str>, Error> {
        self.typed(descriptor, Value::as_str)
    }

    pub fn get_bool(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<bool>, Error> {
        self.typed(descriptor, Value::as_bool)
    }

    pub fn get_i64(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<i64>, Error> {
        self.typed(descriptor, Value::as_i64)
    }

    pub fn get_f64(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<f64>, Error> {
        self.typed(descriptor, Value::as_f64)
    }

    pub fn get_bytes(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<&[u8]>, Error> {
        self.typed(descriptor, Value::as_bytes)
    }

    pub fn get_date_time(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<NaiveDateTime>, Error> {
        self.typed(descriptor, Value::as_date_time)
    }

    pub fn get_complex(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<&ComplexValue>, Error> {
        self.typed(descriptor, Value::as_complex)
    }

    pub fn get_collection(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<&ComplexCollection>, Error> {
        self.typed(descriptor, Value::as_collection)
    }

    /// Assign a property. Assigning `Null` deletes it.
    pub fn set(
        &mut self,
        descriptor: &PropertyDescriptor,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let value = value.into();
        if value.is_null() {
            return self.delete(descriptor);
        }

        let (slot, descriptor) = self.resolve(descriptor)?;
        self.check_mutable(descriptor)?;
        let mut value = descriptor.normalise(value)?;

        self.attach(slot, &mut value);
        self.values.insert(slot, value);
        self.deleted.remove(slot);
        self.modified.insert(slot);
        self.notify_owner(descriptor);
        Ok(())
    }

    /// Delete a property, so that an update removes it from the object.
    pub fn delete(
        &mut self,
        descriptor: &PropertyDescriptor,
    ) -> Result<(), Error> {
        let (slot, descriptor) = self.resolve(descriptor)?;
        if !descriptor.is_nullable() {
            return Err(Error::NotNullable(descriptor.name()));
        }
        if !descriptor.has_flag(PropertyFlags::DELETABLE, self.session.version)
        {
            return Err(Error::NotDeletable(descriptor.name()));
        }

        self.values.remove(&slot);
        self.modified.remove(slot);
        self.changes.lock().unwrap().changed.remove(slot);
        self.deleted.insert(slot);
        self.notify_owner(descriptor);
        Ok(())
    }

    /// Whether the property currently has a value.
    pub fn contains(&self, descriptor: &PropertyDescriptor) -> bool {
        self.schema
            .slot_of(descriptor)
            .map_or(false, |slot| self.values.contains_key(&slot))
    }

    /// Whether the property was loaded from the server (or saved to it).
    pub fn is_loaded(&self, descriptor: &PropertyDescriptor) -> bool {
        self.schema
            .slot_of(descriptor)
            .map_or(false, |slot| self.loaded.contains(slot))
    }

    /// Whether the property was assigned, deleted, or changed in place since
    /// the last load or save.
    pub fn is_modified(&self, descriptor: &PropertyDescriptor) -> bool {
        self.schema
            .slot_of(descriptor)
            .map_or(false, |slot| self.is_slot_dirty(slot))
    }

    pub fn is_deleted(&self, descriptor: &PropertyDescriptor) -> bool {
        self.schema
            .slot_of(descriptor)
            .map_or(false, |slot| self.deleted.contains(slot))
    }

    /// Every property assigned or changed in place since the last load or
    /// save, in schema order.
    pub fn modified_properties(&self) -> Vec<&'static PropertyDescriptor> {
        let mut dirty = self.modified.clone();
        dirty.union_with(&self.changes.lock().unwrap().changed);
        dirty
            .iter()
            .filter_map(|slot| self.schema.descriptor(slot))
            .collect()
    }

    fn is_slot_dirty(&self, slot: usize) -> bool {
        self.modified.contains(slot)
            || self.deleted.contains(slot)
            || self.changes.lock().unwrap().changed.contains(slot)
    }

    /// Whether saving the object requires an update call.
    pub fn needs_update_call(&self) -> bool {
        !self.modified.is_empty()
            || !self.deleted.is_empty()
            || !self.changes.lock().unwrap().changed.is_empty()
    }

    /// Mutable access to a nested value, for changing it in place.
    ///
    /// Properties marked `AUTO_CREATE_ON_READ` are instantiated empty if
    /// unset.
    pub fn complex_mut(
        &mut self,
        descriptor: &PropertyDescriptor,
    ) -> Result<&mut ComplexValue, Error> {
        let (slot, descriptor) = self.instantiate(descriptor)?;
        self.values
            .get_mut(&slot)
            .and_then(Value::as_complex_mut)
            .ok_or(Error::TypeMismatch(descriptor.name()))
    }

    /// Mutable access to a collection, for changing it item by item.
    ///
    /// Properties marked `AUTO_CREATE_ON_READ` are instantiated empty if
    /// unset.
    pub fn collection_mut(
        &mut self,
        descriptor: &PropertyDescriptor,
    ) -> Result<&mut ComplexCollection, Error> {
        let (slot, descriptor) = self.instantiate(descriptor)?;
        self.values
            .get_mut(&slot)
            .and_then(Value::as_collection_mut)
            .ok_or(Error::TypeMismatch(descriptor.name()))
    }

    fn instantiate(
        &mut self,
        descriptor: &PropertyDescriptor,
    ) -> Result<(usize, &'static PropertyDescriptor), Error> {
        let (slot, descriptor) = self.resolve(descriptor)?;
        self.check_mutable(descriptor)?;

        if !self.values.contains_key(&slot) {
            let auto_create = descriptor
                .has_flag(PropertyFlags::AUTO_CREATE_ON_READ, self.session.version);
            let default = descriptor.default().filter(|_| auto_create);
            match default {
                Some(default) if !self.deleted.contains(slot) => {
                    let mut value = default.clone();
                    self.attach(slot, &mut value);
                    self.values.insert(slot, value);
                },
                _ => {
                    // Surface the access fault if there is one
                    self.get(descriptor)?;
                    return Err(Error::TypeMismatch(descriptor.name()));
                },
            }
        }

        Ok((slot, descriptor))
    }

    /// Reset to the empty state of a new object.
    pub fn clear(&mut self) {
        self.values.clear();
        self.loaded.clear();
        self.modified.clear();
        self.deleted.clear();
        self.changes.lock().unwrap().changed.clear();
        self.is_new = true;
    }

    /// Record that the object was successfully saved with its current
    /// values.
    pub fn mark_saved(&mut self) {
        self.loaded.union_with(&self.modified);
        self.loaded.union_with(&self.deleted);
        self.modified.clear();
        self.deleted.clear();
        self.changes.lock().unwrap().changed.clear();
        for value in self.values.values_mut() {
            if let Value::Collection(ref mut collection) = *value {
                collection.mark_saved();
            }
        }
        self.is_new = false;
    }

    /// Load properties from the object element the reader is positioned on,
    /// leaving the reader on its end element.
    ///
    /// Every property in `requested` counts as loaded afterwards, whether or
    /// not the server returned it. Unknown elements and elements of
    /// properties the session's version does not support are skipped. If the
    /// XML cannot be decoded, the bag is left empty.
    pub fn load_from_xml(
        &mut self,
        reader: &mut dyn XmlRead,
        clear_first: bool,
        requested: &PropertySet,
        summary_only: bool,
    ) -> Result<(), Error> {
        if clear_first {
            self.clear();
        }

        if let Err(e) = self.load_elements(reader) {
            self.clear();
            return Err(e);
        }

        let requested = self.schema.requested(
            requested,
            summary_only,
            self.session.version,
        );
        self.loaded.union_with(&requested);
        self.modified.clear();
        self.deleted.clear();
        self.changes.lock().unwrap().changed.clear();
        self.is_new = false;
        Ok(())
    }

    fn load_elements(&mut self, reader: &mut dyn XmlRead) -> Result<(), Error> {
        let schema = self.schema;
        let version = self.session.version;

        loop {
            reader.advance()?;
            if reader.is_end_element(None, None) {
                return Ok(());
            }

            if !reader.is_start_element(None, None) {
                continue;
            }

            let tag = reader.local_name().to_owned();
            let slots = schema.dispatch(&tag).unwrap_or(&[]);
            let first = match slots.first().and_then(|&s| schema.descriptor(s))
            {
                Some(first) => first,
                None => {
                    debug!(
                        "Skipping unknown element {} in {}",
                        tag,
                        schema.element()
                    );
                    reader.skip_current_element()?;
                    continue;
                },
            };

            if first.index_key().is_some() {
                self.load_dictionary(reader, slots)?;
            } else if first.is_applicable(version) {
                self.load_slot(reader, slots[0], first)?;
            } else {
                debug!(
                    "Skipping {} which requires {}, but session is {}",
                    tag,
                    first.min_version(),
                    version
                );
                reader.skip_current_element()?;
            }
        }
    }

    fn load_dictionary(
        &mut self,
        reader: &mut dyn XmlRead,
        slots: &[usize],
    ) -> Result<(), Error> {
        let schema = self.schema;
        let version = self.session.version;

        loop {
            reader.advance()?;
            if reader.is_end_element(None, None) {
                return Ok(());
            }

            if !reader.is_start_element(Some(XmlNamespace::Types), Some("Entry"))
            {
                reader.skip_current_element()?;
                continue;
            }

            let key = reader.read_attribute_value("Key");
            let entry = slots.iter().copied().find_map(|slot| {
                schema
                    .descriptor(slot)
                    .filter(|d| d.index_key() == key.as_deref())
                    .map(|d| (slot, d))
            });

            match entry {
                Some((slot, descriptor)) if descriptor.is_applicable(version) => {
                    self.load_slot(reader, slot, descriptor)?;
                },
                _ => {
                    debug!(
                        "Skipping dictionary entry {:?} in {}",
                        key,
                        schema.element()
                    );
                    reader.skip_current_element()?;
                },
            }
        }
    }

    fn load_slot(
        &mut self,
        reader: &mut dyn XmlRead,
        slot: usize,
        descriptor: &'static PropertyDescriptor,
    ) -> Result<(), Error> {
        let existing = if descriptor
            .has_flag(PropertyFlags::REUSE_INSTANCE, self.session.version)
        {
            self.values.remove(&slot)
        } else {
            None
        };

        let mut value = descriptor.decode(reader, &self.session, existing)?;
        if value.is_null() {
            self.values.remove(&slot);
        } else {
            self.attach(slot, &mut value);
            self.values.insert(slot, value);
        }
        self.loaded.insert(slot);
        Ok(())
    }

    /// Write the object.
    ///
    /// For a create, this is the object's own element containing every
    /// settable property with a value. For an update, this is a
    /// `t:Updates` element containing the operations of
    /// `build_update_payload()`.
    pub fn write_to_xml(
        &self,
        writer: &mut dyn XmlWrite,
        is_update: bool,
    ) -> Result<(), Error> {
        if is_update {
            self.write_updates(writer)
        } else {
            self.write_create(writer)
        }
    }

    fn write_create(&self, writer: &mut dyn XmlWrite) -> Result<(), Error> {
        let ctx = EncodeContext::new(&self.session, false);
        let mut dictionaries_written = Vec::<&'static str>::new();

        writer.write_start_element(XmlNamespace::Types, self.schema.element())?;
        for (slot, descriptor) in self.schema.iter() {
            let value = match self.create_value(slot, descriptor) {
                Some(value) => value,
                None => continue,
            };

            if descriptor.index_key().is_none() {
                descriptor.encode(writer, value, &ctx)?;
                continue;
            }

            let dictionary = descriptor.xml_element();
            if dictionaries_written.contains(&dictionary) {
                continue;
            }
            dictionaries_written.push(dictionary);

            writer.write_start_element(XmlNamespace::Types, dictionary)?;
            for &entry_slot in self.schema.dispatch(dictionary).unwrap_or(&[]) {
                let entry = self
                    .schema
                    .descriptor(entry_slot)
                    .and_then(|d| self.create_value(entry_slot, d).map(|v| (d, v)));
                if let Some((entry, value)) = entry {
                    entry.encode_entry(writer, value, &ctx)?;
                }
            }
            writer.write_end_element()?;
        }
        writer.write_end_element()
    }

    fn create_value(
        &self,
        slot: usize,
        descriptor: &PropertyDescriptor,
    ) -> Option<&Value> {
        let version = self.session.version;
        if descriptor.is_applicable(version)
            && descriptor.has_flag(PropertyFlags::SETTABLE, version)
        {
            self.values.get(&slot)
        } else {
            None
        }
    }

    fn write_updates(&self, writer: &mut dyn XmlWrite) -> Result<(), Error> {
        writer.write_start_element(XmlNamespace::Types, "Updates")?;
        for op in self.build_update_payload() {
            let mut ctx = EncodeContext::new(&self.session, true);
            ctx.linked_zone = self.linked_zone(op.descriptor());
            op.write_to_xml(writer, self.schema, &ctx)?;
        }
        writer.write_end_element()
    }

    /// The zone of `descriptor`'s linked time zone property, if it has one
    /// and that property has been changed.
    fn linked_zone(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Option<FixedOffset> {
        let zone_slot = self.schema.slot_of_uri(descriptor.linked_zone()?)?;
        if !self.is_slot_dirty(zone_slot) {
            return None;
        }

        self.values
            .get(&zone_slot)
            .and_then(Value::as_complex)
            .and_then(datetime::time_zone_offset)
    }

    /// The operations needed to bring the server's copy of the object up to
    /// date with this one, in schema order.
    ///
    /// Properties assigned as a whole are written with a `Set`, or a `Delete`
    /// if the new value is an empty collection. Collections changed item by
    /// item are written as `Append`, `DeleteItem` and `SetItem` operations
    /// (in that order) if the property supports item-level updates at this
    /// version, and as a whole otherwise.
    pub fn build_update_payload(&self) -> Vec<UpdateOp<'_>> {
        let version = self.session.version;
        let changed = self.changes.lock().unwrap().changed.clone();
        let mut ops = Vec::new();

        for (slot, descriptor) in self.schema.iter() {
            if !descriptor.is_applicable(version) {
                continue;
            }

            if self.deleted.contains(slot) {
                ops.push(UpdateOp::Delete { descriptor });
                continue;
            }

            let assigned = self.modified.contains(slot);
            if !assigned && !changed.contains(slot) {
                continue;
            }

            let value = match self.values.get(&slot) {
                Some(value) => value,
                None => continue,
            };

            match *value {
                Value::Collection(ref collection)
                    if !assigned
                        && Self::item_level(descriptor, collection, version) =>
                {
                    for item in collection.added() {
                        ops.push(UpdateOp::Append { descriptor, item });
                    }
                    for position in collection.removed() {
                        ops.push(UpdateOp::DeleteItem {
                            descriptor,
                            position,
                        });
                    }
                    for (position, item) in collection.modified() {
                        ops.push(UpdateOp::SetItem {
                            descriptor,
                            position,
                            item,
                        });
                    }
                },
                Value::Collection(ref collection) if collection.is_empty() => {
                    ops.push(UpdateOp::Delete { descriptor });
                },
                ref value => ops.push(UpdateOp::Set { descriptor, value }),
            }
        }

        ops
    }

    fn item_level(
        descriptor: &PropertyDescriptor,
        collection: &ComplexCollection,
        version: ExchangeVersion,
    ) -> bool {
        descriptor.has_flag(PropertyFlags::ITEM_LEVEL_UPDATES, version)
            && (0 == collection.added().count()
                || descriptor.has_flag(PropertyFlags::APPENDABLE, version))
    }

    fn resolve(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<(usize, &'static PropertyDescriptor), Error> {
        let (slot, descriptor) = self
            .schema
            .slot_of(descriptor)
            .and_then(|slot| self.schema.descriptor(slot).map(|d| (slot, d)))
            .ok_or_else(|| {
                Error::UnknownProperty(
                    descriptor.name(),
                    self.schema.element(),
                )
            })?;

        if descriptor.is_applicable(self.session.version) {
            Ok((slot, descriptor))
        } else {
            Err(Error::VersionIncompatible {
                property: descriptor.name(),
                required: descriptor.min_version(),
                negotiated: self.session.version,
            })
        }
    }

    fn check_mutable(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<(), Error> {
        let version = self.session.version;
        if !descriptor.has_flag(PropertyFlags::SETTABLE, version) {
            Err(Error::ReadOnly(descriptor.name()))
        } else if !self.is_new
            && !descriptor.has_flag(PropertyFlags::UPDATABLE, version)
        {
            Err(Error::NotUpdatable(descriptor.name()))
        } else {
            Ok(())
        }
    }

    fn attach(&self, slot: usize, value: &mut Value) {
        let notifier =
            Some(ChangeNotifier::new(Arc::downgrade(&self.changes), slot));
        match *value {
            Value::Complex(ref mut v) => v.attach(notifier),
            Value::Collection(ref mut v) => v.attach(notifier),
            _ => (),
        }
    }

    fn notify_owner(&self, descriptor: &'static PropertyDescriptor) {
        let owner = self
            .changes
            .lock()
            .unwrap()
            .owner
            .clone()
            .and_then(|o| o.upgrade());
        if let Some(owner) = owner {
            owner.property_changed(descriptor);
        }
    }
}

#[cfg(test)]
mod test {
    use lazy_static::lazy_static;

    use super::*;
    use crate::property::complex::ComplexSchema;
    use crate::property::datetime::TIME_ZONE;
    use crate::property::primitive::Primitive;
    use crate::property::schema::UpdateTarget;
    use crate::property::update::UpdateKind;
    use crate::property::version::ExchangeVersion::*;
    use crate::support::chronox::{FixedOffsetX, NaiveDateX};
    use crate::xml::{XmlReader, XmlWriter};

    static IMPORTANCE_NAMES: &[&str] = &["Low", "Normal", "High"];

    lazy_static! {
        static ref ID_SCHEMA: ComplexSchema = ComplexSchema::new("ItemId")
            .attribute("Id", Primitive::Text)
            .attribute("ChangeKey", Primitive::Text);
        static ref MAILBOX: ComplexSchema = ComplexSchema::new("Mailbox")
            .element("Name", Primitive::Text)
            .element("EmailAddress", Primitive::Text);
        static ref ITEM_ID: PropertyDescriptor =
            PropertyDescriptor::complex("ItemId", "item:ItemId", &ID_SCHEMA);
        static ref SUBJECT: PropertyDescriptor = PropertyDescriptor::primitive(
            "Subject",
            "item:Subject",
            Primitive::Text
        )
        .with_flags(PropertyFlags::MUTABLE);
        static ref SIZE: PropertyDescriptor = PropertyDescriptor::primitive(
            "Size",
            "item:Size",
            Primitive::Integer
        )
        .non_nullable();
        static ref CLASS: PropertyDescriptor = PropertyDescriptor::primitive(
            "ItemClass",
            "item:ItemClass",
            Primitive::Text
        )
        .with_flags(PropertyFlags::SETTABLE);
        static ref IMPORTANCE: PropertyDescriptor =
            PropertyDescriptor::primitive(
                "Importance",
                "item:Importance",
                Primitive::Enumeration(IMPORTANCE_NAMES)
            )
            .with_flags(PropertyFlags::MUTABLE)
            .non_nullable()
            .with_default(Value::Enum("Normal"));
        static ref TO: PropertyDescriptor = PropertyDescriptor::collection(
            "ToRecipients",
            "message:ToRecipients",
            &MAILBOX,
            "Mailbox"
        )
        .with_flags(PropertyFlags::MUTABLE | PropertyFlags::APPENDABLE)
        .flag_since(PropertyFlags::ITEM_LEVEL_UPDATES, Exchange2013)
        .auto_create();
        static ref START_TIME_ZONE: PropertyDescriptor =
            PropertyDescriptor::complex(
                "StartTimeZone",
                "calendar:StartTimeZone",
                &TIME_ZONE
            )
            .with_flags(PropertyFlags::MUTABLE);
        static ref START: PropertyDescriptor =
            PropertyDescriptor::linked_date_time(
                "Start",
                "calendar:Start",
                "calendar:StartTimeZone"
            )
            .with_flags(PropertyFlags::MUTABLE);
        static ref EMAIL1: PropertyDescriptor = PropertyDescriptor::primitive(
            "EmailAddresses",
            "contacts:EmailAddress",
            Primitive::Text
        )
        .indexed("EmailAddress1")
        .with_flags(PropertyFlags::MUTABLE);
        static ref EMAIL2: PropertyDescriptor = PropertyDescriptor::primitive(
            "EmailAddresses",
            "contacts:EmailAddress",
            Primitive::Text
        )
        .indexed("EmailAddress2")
        .with_flags(PropertyFlags::MUTABLE);
        static ref TAG: PropertyDescriptor =
            PropertyDescriptor::primitive("Tag", "item:Tag", Primitive::Text)
                .with_flags(PropertyFlags::MUTABLE)
                .since(Exchange2013);
        static ref ORGANIZER: PropertyDescriptor = PropertyDescriptor::complex(
            "Organizer",
            "calendar:Organizer",
            &MAILBOX
        )
        .contained("Mailbox")
        .with_flags(PropertyFlags::MUTABLE | PropertyFlags::REUSE_INSTANCE);
        static ref STRANGER: PropertyDescriptor = PropertyDescriptor::primitive(
            "Stranger",
            "x:Stranger",
            Primitive::Text
        );
        static ref MESSAGE: Schema =
            Schema::builder("Message", UpdateTarget::Item)
                .id(&ITEM_ID)
                .summary(&SUBJECT)
                .first_class(&SIZE)
                .field(&CLASS)
                .first_class(&IMPORTANCE)
                .first_class(&TO)
                .first_class(&START_TIME_ZONE)
                .first_class(&START)
                .field(&EMAIL1)
                .field(&EMAIL2)
                .first_class(&TAG)
                .first_class(&ORGANIZER)
                .build();
    }

    const TYPES: &str =
        "http://schemas.microsoft.com/exchange/services/2006/types";

    fn message_xml() -> String {
        format!(
            r#"<t:Message xmlns:t="{}">
  <t:ItemId Id="AAMk" ChangeKey="CQAA"/>
  <t:Subject>Hello</t:Subject>
  <t:Size>1024</t:Size>
  <t:Unknown><t:Deeper>x</t:Deeper></t:Unknown>
  <t:ToRecipients>
    <t:Mailbox><t:Name>a</t:Name></t:Mailbox>
    <t:Mailbox><t:Name>b</t:Name></t:Mailbox>
    <t:Mailbox><t:Name>c</t:Name></t:Mailbox>
    <t:Mailbox><t:Name>d</t:Name></t:Mailbox>
    <t:Mailbox><t:Name>e</t:Name></t:Mailbox>
  </t:ToRecipients>
  <t:StartTimeZone Id="Tokyo Standard Time">
    <t:BaseOffset>-PT9H</t:BaseOffset>
  </t:StartTimeZone>
  <t:Start>2021-06-01T00:00:00Z</t:Start>
  <t:EmailAddresses>
    <t:Entry Key="EmailAddress1">a@example.com</t:Entry>
    <t:Entry Key="EmailAddress9">z@example.com</t:Entry>
  </t:EmailAddresses>
  <t:Tag>secret</t:Tag>
</t:Message>"#,
            TYPES
        )
    }

    #[derive(Default)]
    struct Recorder {
        changed: Mutex<Vec<&'static str>>,
    }

    impl PropertyOwner for Recorder {
        fn property_changed(&self, descriptor: &'static PropertyDescriptor) {
            self.changed.lock().unwrap().push(descriptor.name());
        }
    }

    fn session(version: ExchangeVersion) -> Arc<Session> {
        Arc::new(Session::new(version, FixedOffset::eastx(3600)))
    }

    fn load(
        bag: &mut PropertyBag,
        xml: &str,
        requested: &PropertySet,
    ) -> Result<(), Error> {
        let mut reader = XmlReader::new(xml).unwrap();
        reader.advance().unwrap();
        bag.load_from_xml(&mut reader, true, requested, false)
    }

    fn loaded(version: ExchangeVersion) -> PropertyBag {
        crate::init_test_log();
        let mut bag = PropertyBag::new(&MESSAGE, session(version));
        load(&mut bag, &message_xml(), &PropertySet::first_class()).unwrap();
        bag
    }

    fn mailbox(name: &str) -> ComplexValue {
        ComplexValue::new(&MAILBOX).with("Name", name).unwrap()
    }

    fn kinds(ops: &[UpdateOp]) -> Vec<(UpdateKind, &'static str)> {
        ops.iter()
            .map(|op| (op.kind(), op.descriptor().name()))
            .collect()
    }

    fn names(descriptors: Vec<&'static PropertyDescriptor>) -> Vec<&'static str> {
        descriptors.into_iter().map(|d| d.name()).collect()
    }

    fn write(bag: &PropertyBag, is_update: bool) -> String {
        let mut writer = XmlWriter::new(Vec::new());
        bag.write_to_xml(&mut writer, is_update).unwrap();
        writer.into_string().unwrap()
    }

    fn ten_o_clock() -> NaiveDateTime {
        NaiveDate::from_ymdx(2021, 6, 1).and_hmsx(10, 0, 0)
    }

    #[test]
    fn load_and_read() {
        let bag = loaded(Exchange2013);
        assert!(!bag.is_new());
        assert!(!bag.needs_update_call());

        assert_eq!(Some("Hello"), bag.get_str(&SUBJECT).unwrap());
        assert_eq!(Some(1024), bag.get_i64(&SIZE).unwrap());
        assert_eq!(
            Some("AAMk"),
            bag.get_complex(&ITEM_ID)
                .unwrap()
                .unwrap()
                .get_str("Id")
                .unwrap()
        );
        assert_eq!(5, bag.get_collection(&TO).unwrap().unwrap().len());
        assert_eq!(
            Some(NaiveDate::from_ymdx(2021, 6, 1).and_hmsx(1, 0, 0)),
            bag.get_date_time(&START).unwrap()
        );
        assert_eq!(
            Some(FixedOffset::eastx(9 * 3600)),
            datetime::time_zone_offset(
                bag.get_complex(&START_TIME_ZONE).unwrap().unwrap()
            )
        );
        assert_eq!(Some("secret"), bag.get_str(&TAG).unwrap());

        // Requested, but not returned
        assert!(bag.is_loaded(&ORGANIZER));
        assert!(!bag.contains(&ORGANIZER));
        assert_eq!(None, bag.get_complex(&ORGANIZER).unwrap());
        // Default
        assert_eq!(Some("Normal"), bag.get_str(&IMPORTANCE).unwrap());
        // Returned without being requested
        assert_eq!(Some("a@example.com"), bag.get_str(&EMAIL1).unwrap());
        // Neither requested nor returned
        assert_matches!(Err(Error::NotLoaded("EmailAddress2")), bag.get(&EMAIL2));
        assert_matches!(Err(Error::NotLoaded("ItemClass")), bag.get(&CLASS));

        assert_matches!(Err(Error::TypeMismatch("Subject")), bag.get_i64(&SUBJECT));
        assert_matches!(
            Err(Error::UnknownProperty("Stranger", "Message")),
            bag.get(&STRANGER)
        );
    }

    #[test]
    fn version_gating() {
        let mut bag = loaded(Exchange2010);
        assert!(!bag.is_loaded(&TAG));
        assert!(!bag.contains(&TAG));
        assert_matches!(
            Err(Error::VersionIncompatible {
                property: "Tag",
                required: Exchange2013,
                negotiated: Exchange2010,
            }),
            bag.get(&TAG)
        );
        assert_matches!(
            Err(Error::VersionIncompatible { .. }),
            bag.set(&TAG, "x")
        );

        bag.set(&SUBJECT, "x").unwrap();
        assert_eq!(
            vec![(UpdateKind::Set, "Subject")],
            kinds(&bag.build_update_payload())
        );
        assert!(!write(&bag, true).contains("Tag"));
    }

    #[test]
    fn dirty_tracking() {
        let owner = Arc::new(Recorder::default());
        let mut bag = loaded(Exchange2013);
        bag.set_owner(&owner);

        bag.set(&SUBJECT, "Foo").unwrap();
        bag.set(&SUBJECT, "Foo").unwrap();
        assert_eq!(vec!["Subject"], names(bag.modified_properties()));
        assert_eq!(vec!["Subject", "Subject"], *owner.changed.lock().unwrap());
        assert!(bag.is_modified(&SUBJECT));
        assert!(!bag.is_modified(&SIZE));
        assert!(bag.needs_update_call());

        bag.clear();
        assert!(bag.is_new());
        assert!(bag.modified_properties().is_empty());
        assert!(!bag.needs_update_call());
        assert!(!bag.is_loaded(&SUBJECT));
        assert_matches!(Err(Error::NotLoaded("Subject")), bag.get(&SUBJECT));
    }

    #[test]
    fn mutation_faults() {
        let mut bag = loaded(Exchange2013);
        assert_matches!(Err(Error::ReadOnly("Size")), bag.set(&SIZE, 3));
        assert_matches!(Err(Error::NotNullable("Size")), bag.delete(&SIZE));
        assert_matches!(
            Err(Error::NotNullable("Importance")),
            bag.delete(&IMPORTANCE)
        );
        assert_matches!(
            Err(Error::NotUpdatable("ItemClass")),
            bag.set(&CLASS, "IPM.Note")
        );
        assert_matches!(Err(Error::TypeMismatch("Subject")), bag.set(&SUBJECT, 3));
        assert_matches!(
            Err(Error::TypeMismatch("Importance")),
            bag.set(&IMPORTANCE, "Urgent")
        );
        assert_matches!(
            Err(Error::UnknownProperty("Stranger", "Message")),
            bag.set(&STRANGER, "x")
        );
        assert!(!bag.needs_update_call());

        // Settable-only properties can still be given on creation
        let mut fresh = PropertyBag::new(&MESSAGE, session(Exchange2013));
        fresh.set(&CLASS, "IPM.Note").unwrap();
        fresh.set(&IMPORTANCE, "High").unwrap();
        assert_eq!(Some(&Value::Enum("High")), fresh.get(&IMPORTANCE).ok());
    }

    #[test]
    fn delete_is_exclusive_with_set() {
        let mut bag = loaded(Exchange2013);
        bag.set(&SUBJECT, "Foo").unwrap();
        bag.delete(&SUBJECT).unwrap();

        assert_matches!(Err(Error::PropertyDeleted("Subject")), bag.get(&SUBJECT));
        assert!(bag.is_deleted(&SUBJECT));
        assert!(!bag.contains(&SUBJECT));
        assert_eq!(
            vec![(UpdateKind::Delete, "Subject")],
            kinds(&bag.build_update_payload())
        );
        assert!(write(&bag, true).contains(
            "<t:DeleteItemField><t:FieldURI FieldURI=\"item:Subject\"/>\
             </t:DeleteItemField>"
        ));

        bag.set(&SUBJECT, "Bar").unwrap();
        assert!(!bag.is_deleted(&SUBJECT));
        assert_eq!(
            vec![(UpdateKind::Set, "Subject")],
            kinds(&bag.build_update_payload())
        );

        // Assigning null is deleting
        bag.set(&SUBJECT, Value::Null).unwrap();
        assert!(bag.is_deleted(&SUBJECT));
        assert_matches!(Err(Error::NotNullable("Size")), bag.set(&SIZE, Value::Null));
    }

    #[test]
    fn collection_delta() {
        for &(version, item_level) in
            &[(Exchange2013, true), (Exchange2010Sp2, false)]
        {
            let mut bag = loaded(version);
            {
                let to = bag.collection_mut(&TO).unwrap();
                to.push(mailbox("f")).unwrap();
                to.push(mailbox("g")).unwrap();
                to.remove(1).unwrap();
            }

            assert!(bag.needs_update_call());
            assert!(bag.is_modified(&TO));

            let ops = bag.build_update_payload();
            if item_level {
                assert_eq!(
                    vec![
                        (UpdateKind::Append, "ToRecipients"),
                        (UpdateKind::Append, "ToRecipients"),
                        (UpdateKind::Delete, "ToRecipients"),
                    ],
                    kinds(&ops)
                );
                assert_matches!(
                    &UpdateOp::DeleteItem { position: 1, .. },
                    &ops[2]
                );
            } else {
                assert_eq!(
                    vec![(UpdateKind::Set, "ToRecipients")],
                    kinds(&ops)
                );
                match ops[0] {
                    UpdateOp::Set { value, .. } => assert_eq!(
                        6,
                        value.as_collection().map_or(0, |c| c.len())
                    ),
                    ref op => panic!("Unexpected op {:?}", op),
                }
            }
        }
    }

    #[test]
    fn emptied_collection_is_deleted() {
        let mut bag = loaded(Exchange2010Sp2);
        bag.collection_mut(&TO).unwrap().clear();
        assert_eq!(
            vec![(UpdateKind::Delete, "ToRecipients")],
            kinds(&bag.build_update_payload())
        );

        let mut bag = loaded(Exchange2013);
        bag.collection_mut(&TO).unwrap().clear();
        assert_eq!(
            vec![(UpdateKind::Delete, "ToRecipients"); 5],
            kinds(&bag.build_update_payload())
        );

        let mut bag = loaded(Exchange2013);
        bag.set(&TO, ComplexCollection::new(&MAILBOX, "Mailbox"))
            .unwrap();
        assert_eq!(
            vec![(UpdateKind::Delete, "ToRecipients")],
            kinds(&bag.build_update_payload())
        );
    }

    #[test]
    fn nested_changes_mark_owner_dirty() {
        let owner = Arc::new(Recorder::default());
        let mut bag = loaded(Exchange2013);
        bag.set_owner(&owner);

        bag.complex_mut(&START_TIME_ZONE)
            .unwrap()
            .set("BaseOffset", FixedOffset::eastx(-5 * 3600))
            .unwrap();
        assert_eq!(vec!["StartTimeZone"], *owner.changed.lock().unwrap());
        assert!(bag.needs_update_call());
        assert!(bag.is_modified(&START_TIME_ZONE));
        assert_eq!(
            vec![(UpdateKind::Set, "StartTimeZone")],
            kinds(&bag.build_update_payload())
        );

        bag.collection_mut(&TO)
            .unwrap()
            .get_mut(0)
            .unwrap()
            .set("Name", "A")
            .unwrap();
        assert_eq!(
            Some(&"ToRecipients"),
            owner.changed.lock().unwrap().last()
        );
        let ops = bag.build_update_payload();
        assert_eq!(
            vec![
                (UpdateKind::Set, "ToRecipients"),
                (UpdateKind::Set, "StartTimeZone"),
            ],
            kinds(&ops)
        );
        assert_matches!(&UpdateOp::SetItem { position: 0, .. }, &ops[0]);
    }

    #[test]
    fn date_times_follow_changed_zone() {
        let mut bag = loaded(Exchange2013);
        bag.set(&START, ten_o_clock()).unwrap();
        let xml = write(&bag, true);
        assert!(xml.contains("<t:Start>2021-06-01T10:00:00</t:Start>"), "{}", xml);

        bag.set(
            &START_TIME_ZONE,
            datetime::time_zone("Tokyo", FixedOffset::eastx(9 * 3600))
                .unwrap(),
        )
        .unwrap();
        let xml = write(&bag, true);
        assert!(xml.contains("<t:Start>2021-06-01T01:00:00Z</t:Start>"), "{}", xml);

        let mut legacy = loaded(Exchange2007Sp1);
        legacy.set(&START, ten_o_clock()).unwrap();
        legacy
            .set(
                &START_TIME_ZONE,
                datetime::time_zone("Tokyo", FixedOffset::eastx(9 * 3600))
                    .unwrap(),
            )
            .unwrap();
        let xml = write(&legacy, true);
        assert!(xml.contains("<t:Start>2021-06-01T09:00:00Z</t:Start>"), "{}", xml);
    }

    #[test]
    fn saving_settles_everything() {
        let mut bag = loaded(Exchange2013);
        bag.set(&SUBJECT, "Foo").unwrap();
        bag.delete(&ORGANIZER).unwrap();
        bag.collection_mut(&TO).unwrap().push(mailbox("f")).unwrap();
        assert!(bag.needs_update_call());

        bag.mark_saved();
        assert!(!bag.needs_update_call());
        assert!(bag.build_update_payload().is_empty());
        assert!(!bag.get_collection(&TO).unwrap().unwrap().has_changes());
        assert_eq!(Some("Foo"), bag.get_str(&SUBJECT).unwrap());
        assert_eq!(None, bag.get_complex(&ORGANIZER).unwrap());

        let mut fresh = PropertyBag::new(&MESSAGE, session(Exchange2013));
        fresh.set(&CLASS, "IPM.Note").unwrap();
        assert!(!fresh.is_loaded(&CLASS));
        fresh.mark_saved();
        assert!(!fresh.is_new());
        assert!(fresh.is_loaded(&CLASS));
        assert!(!fresh.needs_update_call());
        // Now an existing object
        assert_matches!(
            Err(Error::NotUpdatable("ItemClass")),
            fresh.set(&CLASS, "IPM.Other")
        );
    }

    #[test]
    fn create_round_trip() {
        let mut bag = PropertyBag::new(&MESSAGE, session(Exchange2013));
        bag.set(&SUBJECT, "").unwrap();
        bag.set(&EMAIL2, "b@example.com").unwrap();
        bag.set(&EMAIL1, "a@example.com").unwrap();
        bag.collection_mut(&TO).unwrap().push(mailbox("a")).unwrap();
        bag.set(&START, ten_o_clock()).unwrap();

        let xml = write(&bag, false);
        assert!(xml.starts_with("<t:Message "), "{}", xml);
        assert!(xml.contains("<t:Subject></t:Subject>"), "{}", xml);
        assert!(
            xml.contains(
                "<t:EmailAddresses>\
                 <t:Entry Key=\"EmailAddress1\">a@example.com</t:Entry>\
                 <t:Entry Key=\"EmailAddress2\">b@example.com</t:Entry>\
                 </t:EmailAddresses>"
            ),
            "{}",
            xml
        );
        assert_eq!(1, xml.matches("<t:EmailAddresses>").count());
        assert!(xml.contains(
            "<t:ToRecipients><t:Mailbox><t:Name>a</t:Name></t:Mailbox>\
             </t:ToRecipients>"
        ));
        assert!(xml.contains("<t:Start>2021-06-01T09:00:00Z</t:Start>"));
        assert!(!xml.contains("Importance"));

        let mut copy = PropertyBag::new(&MESSAGE, session(Exchange2013));
        load(
            &mut copy,
            &xml,
            &PropertySet::first_class().with(&EMAIL1).with(&EMAIL2),
        )
        .unwrap();
        assert_eq!(Some(""), copy.get_str(&SUBJECT).unwrap());
        assert_eq!(Some("a@example.com"), copy.get_str(&EMAIL1).unwrap());
        assert_eq!(Some("b@example.com"), copy.get_str(&EMAIL2).unwrap());
        assert_eq!(Some(ten_o_clock()), copy.get_date_time(&START).unwrap());
        assert_eq!(
            bag.get_collection(&TO).unwrap(),
            copy.get_collection(&TO).unwrap()
        );
        // Requested but absent
        assert_eq!(None, copy.get_i64(&SIZE).unwrap());
    }

    #[test]
    fn decode_fault_discards_object() {
        let mut bag = PropertyBag::new(&MESSAGE, session(Exchange2013));
        let xml = format!(
            "<t:Message xmlns:t=\"{}\"><t:Subject>Hi</t:Subject>\
             <t:Size>big</t:Size></t:Message>",
            TYPES
        );
        assert_matches!(
            Err(Error::Decode { .. }),
            load(&mut bag, &xml, &PropertySet::first_class())
        );
        assert!(bag.is_new());
        assert_matches!(Err(Error::NotLoaded("Subject")), bag.get(&SUBJECT));
    }

    #[test]
    fn reload_merges_into_reused_instance() {
        let mut bag = PropertyBag::new(&MESSAGE, session(Exchange2013));
        bag.set(
            &ORGANIZER,
            ComplexValue::new(&MAILBOX)
                .with("EmailAddress", "olga@example.com")
                .unwrap(),
        )
        .unwrap();

        let xml = format!(
            "<t:Message xmlns:t=\"{}\"><t:Organizer><t:Mailbox>\
             <t:Name>Olga</t:Name></t:Mailbox></t:Organizer></t:Message>",
            TYPES
        );
        let mut reader = XmlReader::new(&xml).unwrap();
        reader.advance().unwrap();
        bag.load_from_xml(
            &mut reader,
            false,
            &PropertySet::id_only().with(&ORGANIZER),
            false,
        )
        .unwrap();

        let organizer = bag.get_complex(&ORGANIZER).unwrap().unwrap();
        assert_eq!(Some("Olga"), organizer.get_str("Name").unwrap());
        assert_eq!(
            Some("olga@example.com"),
            organizer.get_str("EmailAddress").unwrap()
        );
        assert!(!bag.needs_update_call());
    }

    #[test]
    fn auto_created_values() {
        let mut bag = PropertyBag::new(&MESSAGE, session(Exchange2013));
        assert_eq!(
            Some(0),
            bag.get_collection(&TO).unwrap().map(ComplexCollection::len)
        );
        assert!(!bag.contains(&TO));

        bag.collection_mut(&TO).unwrap();
        assert!(bag.contains(&TO));

        assert_matches!(
            Err(Error::NotLoaded("Organizer")),
            bag.complex_mut(&ORGANIZER)
        );
        assert_matches!(Err(Error::ReadOnly("Size")), bag.complex_mut(&SIZE));
    }
}
