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

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::XmlNamespace;
use crate::support::error::Error;

/// Sequential XML output.
///
/// Attributes may only be written immediately after the start element they
/// belong to.
pub trait XmlWrite {
    fn write_start_element(
        &mut self,
        ns: XmlNamespace,
        name: &str,
    ) -> Result<(), Error>;

    fn write_end_element(&mut self) -> Result<(), Error>;

    fn write_attribute_value(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<(), Error>;

    /// Write text content into the current element.
    fn write_value(&mut self, value: &str) -> Result<(), Error>;

    /// Write a complete element containing only `value`.
    ///
    /// An empty `value` still produces an (empty) element.
    fn write_element_value(
        &mut self,
        ns: XmlNamespace,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        self.write_start_element(ns, name)?;
        self.write_value(value)?;
        self.write_end_element()
    }
}

/// An `XmlWrite` producing prefixed XML on top of `quick-xml`.
///
/// The first element written declares every protocol namespace, so the
/// output of a single `XmlWriter` is always a self-contained fragment.
pub struct XmlWriter<W: Write> {
    inner: quick_xml::Writer<W>,
    open: Vec<String>,
    pending: Option<BytesStart<'static>>,
    declared: bool,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W) -> Self {
        XmlWriter {
            inner: quick_xml::Writer::new(inner),
            open: Vec::new(),
            pending: None,
            declared: false,
        }
    }

    /// Finish writing and return the underlying writer.
    ///
    /// Fails if any element is still open.
    pub fn into_inner(self) -> Result<W, Error> {
        if let Some(name) = self.open.last() {
            return Err(Error::UnexpectedXml(format!(
                "element {} still open at end of output",
                name
            )));
        }

        Ok(self.inner.into_inner())
    }

    fn flush_pending(&mut self) -> Result<(), Error> {
        if let Some(start) = self.pending.take() {
            self.inner.write_event(Event::Start(start))?;
        }
        Ok(())
    }
}

impl XmlWriter<Vec<u8>> {
    /// Finish writing and return the output as a string.
    pub fn into_string(self) -> Result<String, Error> {
        let bytes = self.into_inner()?;
        String::from_utf8(bytes).map_err(|e| {
            Error::UnexpectedXml(format!("non-UTF-8 output: {}", e))
        })
    }
}

impl<W: Write> XmlWrite for XmlWriter<W> {
    fn write_start_element(
        &mut self,
        ns: XmlNamespace,
        name: &str,
    ) -> Result<(), Error> {
        self.flush_pending()?;

        let qname = format!("{}:{}", ns.prefix(), name);
        let mut start = BytesStart::new(qname.clone());
        if !self.declared {
            for ns in &XmlNamespace::ALL {
                start.push_attribute((
                    format!("xmlns:{}", ns.prefix()).as_str(),
                    ns.uri(),
                ));
            }
            self.declared = true;
        }

        self.pending = Some(start);
        self.open.push(qname);
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<(), Error> {
        let qname = self.open.pop().ok_or_else(|| {
            Error::UnexpectedXml("end element with nothing open".to_owned())
        })?;

        match self.pending.take() {
            Some(start) => self.inner.write_event(Event::Empty(start))?,
            None => self.inner.write_event(Event::End(BytesEnd::new(qname)))?,
        }

        Ok(())
    }

    fn write_attribute_value(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        match self.pending {
            Some(ref mut start) => {
                start.push_attribute((name, value));
                Ok(())
            },
            None => Err(Error::UnexpectedXml(format!(
                "attribute {} written outside of a start element",
                name
            ))),
        }
    }

    fn write_value(&mut self, value: &str) -> Result<(), Error> {
        if self.open.is_empty() {
            return Err(Error::UnexpectedXml(
                "text written outside of any element".to_owned(),
            ));
        }

        self.flush_pending()?;
        if !value.is_empty() {
            self.inner.write_event(Event::Text(BytesText::new(value)))?;
        }
        Ok(())
    }
}
