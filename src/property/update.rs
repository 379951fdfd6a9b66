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

//! The operations an update of an existing object is made of.

use log::trace;

use super::complex::ComplexValue;
use super::descriptor::{EncodeContext, PropertyDescriptor};
use super::schema::Schema;
use super::value::Value;
use crate::support::error::Error;
use crate::xml::{XmlNamespace, XmlWrite};

/// The wire-level kind of an update operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateKind {
    Set,
    Append,
    Delete,
}

/// One operation of an update, borrowing from the property bag it was built
/// from.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOp<'a> {
    /// Replace the whole value of the property.
    Set {
        descriptor: &'static PropertyDescriptor,
        value: &'a Value,
    },
    /// Remove the property.
    Delete {
        descriptor: &'static PropertyDescriptor,
    },
    /// Add one item to the end of a collection.
    Append {
        descriptor: &'static PropertyDescriptor,
        item: &'a ComplexValue,
    },
    /// Remove the item of a collection at `position`, which refers to the
    /// collection as last loaded.
    DeleteItem {
        descriptor: &'static PropertyDescriptor,
        position: usize,
    },
    /// Replace the item of a collection at `position`, which refers to the
    /// collection as last loaded.
    SetItem {
        descriptor: &'static PropertyDescriptor,
        position: usize,
        item: &'a ComplexValue,
    },
}

impl<'a> UpdateOp<'a> {
    pub fn kind(&self) -> UpdateKind {
        match *self {
            UpdateOp::Set { .. } | UpdateOp::SetItem { .. } => UpdateKind::Set,
            UpdateOp::Append { .. } => UpdateKind::Append,
            UpdateOp::Delete { .. } | UpdateOp::DeleteItem { .. } => {
                UpdateKind::Delete
            },
        }
    }

    pub fn descriptor(&self) -> &'static PropertyDescriptor {
        match *self {
            UpdateOp::Set { descriptor, .. }
            | UpdateOp::Delete { descriptor }
            | UpdateOp::Append { descriptor, .. }
            | UpdateOp::DeleteItem { descriptor, .. }
            | UpdateOp::SetItem { descriptor, .. } => descriptor,
        }
    }

    fn position(&self) -> Option<usize> {
        match *self {
            UpdateOp::DeleteItem { position, .. }
            | UpdateOp::SetItem { position, .. } => Some(position),
            _ => None,
        }
    }

    /// Write this operation as a child of `t:Updates` for an object of
    /// `schema`.
    pub fn write_to_xml(
        &self,
        writer: &mut dyn XmlWrite,
        schema: &Schema,
        ctx: &EncodeContext,
    ) -> Result<(), Error> {
        let target = schema.target();
        let descriptor = self.descriptor();
        trace!(
            "{:?} {} {:?}",
            self.kind(),
            descriptor.uri(),
            self.position().map(|p| p.to_string()).or_else(|| descriptor
                .index_key()
                .map(str::to_owned))
        );

        let op_element = match self.kind() {
            UpdateKind::Set => target.set_field(),
            UpdateKind::Append => target.append_field(),
            UpdateKind::Delete => target.delete_field(),
        };

        writer.write_start_element(XmlNamespace::Types, op_element)?;
        self.write_field_uri(writer)?;

        match *self {
            UpdateOp::Set { value, .. } => {
                writer
                    .write_start_element(XmlNamespace::Types, schema.element())?;
                descriptor.encode(writer, value, ctx)?;
                writer.write_end_element()?;
            },
            UpdateOp::Append { item, .. } | UpdateOp::SetItem { item, .. } => {
                writer
                    .write_start_element(XmlNamespace::Types, schema.element())?;
                descriptor.encode_items(writer, &[item])?;
                writer.write_end_element()?;
            },
            UpdateOp::Delete { .. } | UpdateOp::DeleteItem { .. } => (),
        }

        writer.write_end_element()
    }

    fn write_field_uri(&self, writer: &mut dyn XmlWrite) -> Result<(), Error> {
        let descriptor = self.descriptor();
        let index = self
            .position()
            .map(|p| p.to_string())
            .or_else(|| descriptor.index_key().map(str::to_owned));

        match index {
            Some(index) => {
                writer.write_start_element(
                    XmlNamespace::Types,
                    "IndexedFieldURI",
                )?;
                writer.write_attribute_value("FieldURI", descriptor.uri())?;
                writer.write_attribute_value("FieldIndex", &index)?;
            },
            None => {
                writer.write_start_element(XmlNamespace::Types, "FieldURI")?;
                writer.write_attribute_value("FieldURI", descriptor.uri())?;
            },
        }

        writer.write_end_element()
    }
}
