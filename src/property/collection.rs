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

use std::fmt;
use std::ptr;

use super::complex::{ChangeNotifier, ComplexSchema, ComplexValue};
use crate::support::error::Error;
use crate::support::session_config::Session;
use crate::xml::{XmlRead, XmlWrite};

#[derive(Clone)]
struct Entry {
    /// The position of this item as of the last load or save, or `None` if
    /// it was added since.
    origin: Option<usize>,
    modified: bool,
    value: ComplexValue,
}

/// An ordered collection of complex values which tracks, item by item, how
/// it changed since it was last loaded or saved.
///
/// Positions reported by `removed()` and `modified()` always refer to the
/// collection as it was at the last load or save.
#[derive(Clone)]
pub struct ComplexCollection {
    item_schema: &'static ComplexSchema,
    item_element: &'static str,
    entries: Vec<Entry>,
    removed: Vec<usize>,
    notifier: Option<ChangeNotifier>,
}

impl PartialEq for ComplexCollection {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.item_schema, other.item_schema)
            && self.item_element == other.item_element
            && self.entries.len() == other.entries.len()
            && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for ComplexCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl ComplexCollection {
    pub fn new(
        item_schema: &'static ComplexSchema,
        item_element: &'static str,
    ) -> Self {
        ComplexCollection {
            item_schema,
            item_element,
            entries: Vec::new(),
            removed: Vec::new(),
            notifier: None,
        }
    }

    pub fn item_schema(&self) -> &'static ComplexSchema {
        self.item_schema
    }

    pub fn item_element(&self) -> &'static str {
        self.item_element
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a ComplexValue> + 'a {
        self.entries.iter().map(|e| &e.value)
    }

    pub fn get(&self, ix: usize) -> Option<&ComplexValue> {
        self.entries.get(ix).map(|e| &e.value)
    }

    /// Mutable access to the item at `ix`, which is considered modified from
    /// then on.
    pub fn get_mut(&mut self, ix: usize) -> Option<&mut ComplexValue> {
        let notifier = self.notifier.as_ref();
        self.entries.get_mut(ix).map(|e| {
            e.modified = true;
            if let Some(notifier) = notifier {
                notifier.notify_changed();
            }
            &mut e.value
        })
    }

    pub fn push(&mut self, mut item: ComplexValue) -> Result<(), Error> {
        self.check_schema(&item)?;
        item.attach(self.notifier.clone());
        self.entries.push(Entry {
            origin: None,
            modified: false,
            value: item,
        });
        self.notify_changed();
        Ok(())
    }

    /// Insert `item` before the item at `ix`, or at the end if there is no
    /// such item.
    pub fn insert(
        &mut self,
        ix: usize,
        mut item: ComplexValue,
    ) -> Result<(), Error> {
        self.check_schema(&item)?;
        item.attach(self.notifier.clone());
        let ix = ix.min(self.entries.len());
        self.entries.insert(
            ix,
            Entry {
                origin: None,
                modified: false,
                value: item,
            },
        );
        self.notify_changed();
        Ok(())
    }

    /// Builder-style `push()` for collections not yet owned by a bag.
    pub fn with(mut self, item: ComplexValue) -> Result<Self, Error> {
        self.push(item)?;
        Ok(self)
    }

    pub fn remove(&mut self, ix: usize) -> Option<ComplexValue> {
        if ix >= self.entries.len() {
            return None;
        }

        let entry = self.entries.remove(ix);
        if let Some(origin) = entry.origin {
            self.removed.push(origin);
        }
        self.notify_changed();

        let mut value = entry.value;
        value.attach(None);
        Some(value)
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        while !self.entries.is_empty() {
            self.remove(self.entries.len() - 1);
        }
    }

    /// Items added since the last load or save, in order.
    pub fn added<'a>(&'a self) -> impl Iterator<Item = &'a ComplexValue> + 'a {
        self.entries
            .iter()
            .filter(|e| e.origin.is_none())
            .map(|e| &e.value)
    }

    /// Original positions of the items removed since the last load or save,
    /// in ascending order.
    pub fn removed(&self) -> Vec<usize> {
        let mut removed = self.removed.clone();
        removed.sort_unstable();
        removed
    }

    /// Items changed in place since the last load or save, with their
    /// original positions.
    pub fn modified<'a>(
        &'a self,
    ) -> impl Iterator<Item = (usize, &'a ComplexValue)> + 'a {
        self.entries
            .iter()
            .filter(|e| e.modified)
            .filter_map(|e| e.origin.map(|origin| (origin, &e.value)))
    }

    pub fn has_changes(&self) -> bool {
        !self.removed.is_empty()
            || self.entries.iter().any(|e| e.origin.is_none() || e.modified)
    }

    /// Forget all tracked changes, making the current contents the new
    /// baseline.
    pub fn mark_saved(&mut self) {
        for (ix, entry) in self.entries.iter_mut().enumerate() {
            entry.origin = Some(ix);
            entry.modified = false;
        }
        self.removed.clear();
    }

    pub(crate) fn attach(&mut self, notifier: Option<ChangeNotifier>) {
        for entry in &mut self.entries {
            entry.value.attach(notifier.clone());
        }
        self.notifier = notifier;
    }

    fn notify_changed(&self) {
        if let Some(ref notifier) = self.notifier {
            notifier.notify_changed();
        }
    }

    fn check_schema(&self, item: &ComplexValue) -> Result<(), Error> {
        if ptr::eq(self.item_schema, item.schema()) {
            Ok(())
        } else {
            Err(Error::TypeMismatch(self.item_schema.name()))
        }
    }

    /// Replace the contents of this collection with the items in the
    /// element the reader is positioned on, leaving the reader on its end
    /// element.
    ///
    /// The loaded items become the baseline for change tracking.
    pub fn load_from_xml(
        &mut self,
        reader: &mut dyn XmlRead,
        session: &Session,
    ) -> Result<(), Error> {
        self.entries.clear();
        self.removed.clear();

        loop {
            reader.advance()?;
            if reader.is_end_element(None, None) {
                break;
            }

            if !reader.is_start_element(None, None) {
                continue;
            }

            if self.item_element != reader.local_name() {
                reader.skip_current_element()?;
                continue;
            }

            let mut item = ComplexValue::new(self.item_schema);
            item.load_from_xml(reader, session)?;
            item.attach(self.notifier.clone());
            self.entries.push(Entry {
                origin: Some(self.entries.len()),
                modified: false,
                value: item,
            });
        }

        Ok(())
    }

    /// Write every item into an element which has already been started.
    pub fn write_contents(
        &self,
        writer: &mut dyn XmlWrite,
    ) -> Result<(), Error> {
        for item in self.iter() {
            item.write_to_xml(writer, self.item_element)?;
        }
        Ok(())
    }
}
