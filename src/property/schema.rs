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

//! Per-type tables of property descriptors.

use std::collections::HashMap;

use super::descriptor::{PropertyDescriptor, PropertyFlags};
use super::version::ExchangeVersion;
use crate::support::field_set::FieldSet;

/// The kind of object a schema describes, as far as update operations are
/// concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateTarget {
    Item,
    Folder,
}

impl UpdateTarget {
    pub fn set_field(self) -> &'static str {
        match self {
            UpdateTarget::Item => "SetItemField",
            UpdateTarget::Folder => "SetFolderField",
        }
    }

    pub fn append_field(self) -> &'static str {
        match self {
            UpdateTarget::Item => "AppendToItemField",
            UpdateTarget::Folder => "AppendToFolderField",
        }
    }

    pub fn delete_field(self) -> &'static str {
        match self {
            UpdateTarget::Item => "DeleteItemField",
            UpdateTarget::Folder => "DeleteFolderField",
        }
    }
}

/// The ordered table of descriptors of one object type.
///
/// Schemas are built once, inside `lazy_static!`, before any object of the
/// type exists, and are read-only thereafter. Properties are identified
/// within a schema by their *slot*, their position in the table.
#[derive(Debug)]
pub struct Schema {
    element: &'static str,
    target: UpdateTarget,
    descriptors: Vec<&'static PropertyDescriptor>,
    id: Option<usize>,
    first_class: FieldSet,
    summary: FieldSet,
    by_element: HashMap<&'static str, Vec<usize>>,
    by_key: HashMap<(&'static str, Option<&'static str>), usize>,
}

pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Add a property which is only loaded when requested by name.
    pub fn field(mut self, descriptor: &'static PropertyDescriptor) -> Self {
        self.add(descriptor);
        self
    }

    /// Add a property which is part of the default view in full responses.
    pub fn first_class(
        mut self,
        descriptor: &'static PropertyDescriptor,
    ) -> Self {
        let slot = self.add(descriptor);
        if !descriptor.flags().contains(PropertyFlags::REQUIRES_EXPLICIT_LOAD)
        {
            self.schema.first_class.insert(slot);
        }
        self
    }

    /// Add a property which is part of the default view in both full and
    /// summary responses.
    pub fn summary(mut self, descriptor: &'static PropertyDescriptor) -> Self {
        let slot = self.add(descriptor);
        if !descriptor.flags().contains(PropertyFlags::REQUIRES_EXPLICIT_LOAD)
        {
            self.schema.first_class.insert(slot);
            self.schema.summary.insert(slot);
        }
        self
    }

    /// Add the property holding the object's identity, which is returned
    /// even in `IdOnly` responses.
    pub fn id(mut self, descriptor: &'static PropertyDescriptor) -> Self {
        let slot = self.add(descriptor);
        self.schema.id = Some(slot);
        self.schema.first_class.insert(slot);
        self.schema.summary.insert(slot);
        self
    }

    fn add(&mut self, descriptor: &'static PropertyDescriptor) -> usize {
        let slot = self.schema.descriptors.len();
        self.schema.descriptors.push(descriptor);
        self.schema
            .by_element
            .entry(descriptor.xml_element())
            .or_insert_with(Vec::new)
            .push(slot);
        self.schema
            .by_key
            .insert((descriptor.uri(), descriptor.index_key()), slot);
        slot
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Schema {
    /// Start building the schema of objects represented by `element`
    /// (e.g. `Folder`).
    pub fn builder(
        element: &'static str,
        target: UpdateTarget,
    ) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                element,
                target,
                descriptors: Vec::new(),
                id: None,
                first_class: FieldSet::new(),
                summary: FieldSet::new(),
                by_element: HashMap::new(),
                by_key: HashMap::new(),
            },
        }
    }

    pub fn element(&self) -> &'static str {
        self.element
    }

    pub fn target(&self) -> UpdateTarget {
        self.target
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterate `(slot, descriptor)` in schema order.
    pub fn iter<'a>(
        &'a self,
    ) -> impl Iterator<Item = (usize, &'static PropertyDescriptor)> + 'a {
        self.descriptors.iter().copied().enumerate()
    }

    pub fn descriptor(
        &self,
        slot: usize,
    ) -> Option<&'static PropertyDescriptor> {
        self.descriptors.get(slot).copied()
    }

    pub fn slot_of(&self, descriptor: &PropertyDescriptor) -> Option<usize> {
        self.by_key
            .get(&(descriptor.uri(), descriptor.index_key()))
            .copied()
    }

    /// Look a non-indexed property up by its URI.
    pub fn slot_of_uri(&self, uri: &'static str) -> Option<usize> {
        self.by_key.get(&(uri, None)).copied()
    }

    pub fn contains(&self, descriptor: &PropertyDescriptor) -> bool {
        self.slot_of(descriptor).is_some()
    }

    /// The slots of every property carried by an element called `tag`,
    /// regardless of version. Only the slots of an indexed dictionary ever
    /// share an element.
    pub fn dispatch(&self, tag: &str) -> Option<&[usize]> {
        self.by_element.get(tag).map(Vec::as_slice)
    }

    pub fn is_first_class(&self, slot: usize, summary_only: bool) -> bool {
        if summary_only {
            self.summary.contains(slot)
        } else {
            self.first_class.contains(slot)
        }
    }

    /// The slots a load of `property_set` requests.
    pub fn requested(
        &self,
        property_set: &PropertySet,
        summary_only: bool,
        version: ExchangeVersion,
    ) -> FieldSet {
        let mut slots = match property_set.base {
            BasePropertySet::IdOnly => FieldSet::new(),
            BasePropertySet::FirstClassProperties if summary_only => {
                self.summary.clone()
            },
            BasePropertySet::FirstClassProperties => self.first_class.clone(),
        };

        if let Some(id) = self.id {
            slots.insert(id);
        }

        for &additional in &property_set.additional {
            if let Some(slot) = self.slot_of(additional) {
                slots.insert(slot);
            }
        }

        let inapplicable = slots
            .iter()
            .filter(|&slot| !self.descriptors[slot].is_applicable(version))
            .collect::<Vec<_>>();
        for slot in inapplicable {
            slots.remove(slot);
        }

        slots
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BasePropertySet {
    IdOnly,
    FirstClassProperties,
}

/// The properties requested from the server when an object was loaded.
#[derive(Clone, Debug)]
pub struct PropertySet {
    pub base: BasePropertySet,
    pub additional: Vec<&'static PropertyDescriptor>,
}

impl PropertySet {
    pub fn id_only() -> Self {
        PropertySet {
            base: BasePropertySet::IdOnly,
            additional: Vec::new(),
        }
    }

    pub fn first_class() -> Self {
        PropertySet {
            base: BasePropertySet::FirstClassProperties,
            additional: Vec::new(),
        }
    }

    pub fn with(mut self, descriptor: &'static PropertyDescriptor) -> Self {
        self.additional.push(descriptor);
        self
    }
}

impl Default for PropertySet {
    fn default() -> Self {
        Self::first_class()
    }
}
