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

use std::str::FromStr;

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::XmlNamespace;
use crate::support::error::Error;

/// Cursor-style access to an XML document, one node at a time.
///
/// The cursor starts *before* the first node; `advance()` must be called to
/// reach it. Empty elements (`<t:Foo/>`) are presented as a start element
/// immediately followed by its end element.
pub trait XmlRead {
    /// Move to the next node.
    ///
    /// Fails if the document has no more nodes.
    fn advance(&mut self) -> Result<(), Error>;

    /// The local name of the current element, or `""` if the cursor is not
    /// on an element.
    fn local_name(&self) -> &str;

    /// Whether the cursor is on a start element matching the given namespace
    /// and local name. `None` matches anything.
    fn is_start_element(
        &self,
        ns: Option<XmlNamespace>,
        name: Option<&str>,
    ) -> bool;

    /// Whether the cursor is on an end element matching the given namespace
    /// and local name. `None` matches anything.
    fn is_end_element(
        &self,
        ns: Option<XmlNamespace>,
        name: Option<&str>,
    ) -> bool;

    /// Whether the cursor is on a start element which has no content at all.
    fn is_empty_element(&self) -> bool;

    /// Read the text content of the current start element, leaving the
    /// cursor on the matching end element.
    ///
    /// An element with no content yields the empty string.
    fn read_element_value(&mut self) -> Result<String, Error>;

    /// The value of the named attribute of the current start element.
    fn read_attribute_value(&self, name: &str) -> Option<String>;

    /// If the cursor is on a start element, move it to the matching end
    /// element. Otherwise, do nothing.
    fn skip_current_element(&mut self) -> Result<(), Error>;

    /// Read the text content of the current element and parse it.
    fn read_element_value_as<T: FromStr>(&mut self) -> Result<T, Error>
    where
        Self: Sized,
    {
        let name = self.local_name().to_owned();
        let text = self.read_element_value()?;
        text.trim()
            .parse()
            .map_err(|_| Error::decode(name, text, "unparsable value"))
    }

    /// Advance to the next node and require it to be the given start
    /// element.
    fn read_start_element(
        &mut self,
        ns: XmlNamespace,
        name: &str,
    ) -> Result<(), Error> {
        self.advance()?;
        if self.is_start_element(Some(ns), Some(name)) {
            Ok(())
        } else {
            Err(Error::UnexpectedXml(format!(
                "expected start of {}:{}, found {:?}",
                ns.prefix(),
                name,
                self.local_name()
            )))
        }
    }

    /// Advance to the next node and require it to be the given end element.
    fn read_end_element(
        &mut self,
        ns: XmlNamespace,
        name: &str,
    ) -> Result<(), Error> {
        self.advance()?;
        if self.is_end_element(Some(ns), Some(name)) {
            Ok(())
        } else {
            Err(Error::UnexpectedXml(format!(
                "expected end of {}:{}, found {:?}",
                ns.prefix(),
                name,
                self.local_name()
            )))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeKind {
    Start,
    End,
    Text,
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    namespace: Option<XmlNamespace>,
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
}

impl Node {
    fn matches(
        &self,
        kind: NodeKind,
        ns: Option<XmlNamespace>,
        name: Option<&str>,
    ) -> bool {
        self.kind == kind
            && ns.map_or(true, |ns| Some(ns) == self.namespace)
            && name.map_or(true, |name| name == self.name)
    }
}

/// Append text to the document, joining it to the text node before it if
/// there is one.
fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if let Some(last) = nodes.last_mut() {
        if NodeKind::Text == last.kind {
            last.text.push_str(text);
            return;
        }
    }

    nodes.push(Node {
        kind: NodeKind::Text,
        namespace: None,
        name: String::new(),
        attributes: Vec::new(),
        text: text.to_owned(),
    });
}

/// An `XmlRead` over an already-buffered document.
///
/// The whole document is tokenised up front, so all well-formedness errors
/// surface from `XmlReader::new()` rather than halfway through decoding an
/// object.
#[derive(Clone, Debug)]
pub struct XmlReader {
    nodes: Vec<Node>,
    pos: Option<usize>,
}

impl XmlReader {
    pub fn new(xml: &str) -> Result<Self, Error> {
        let mut reader = NsReader::from_str(xml);
        {
            let config = reader.config_mut();
            config.expand_empty_elements = true;
        }

        let mut nodes = Vec::new();
        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let namespace = match resolved {
                ResolveResult::Bound(ns) => XmlNamespace::from_uri(ns.as_ref()),
                _ => None,
            };

            match event {
                Event::Start(start) => {
                    let mut attributes = Vec::new();
                    for attr in start.attributes() {
                        let attr = attr.map_err(quick_xml::Error::from)?;
                        if attr.key.as_namespace_binding().is_some() {
                            continue;
                        }

                        attributes.push((
                            String::from_utf8_lossy(
                                attr.key.local_name().as_ref(),
                            )
                            .into_owned(),
                            attr.unescape_value()?.into_owned(),
                        ));
                    }

                    nodes.push(Node {
                        kind: NodeKind::Start,
                        namespace,
                        name: String::from_utf8_lossy(
                            start.local_name().as_ref(),
                        )
                        .into_owned(),
                        attributes,
                        text: String::new(),
                    });
                },

                Event::End(end) => nodes.push(Node {
                    kind: NodeKind::End,
                    namespace,
                    name: String::from_utf8_lossy(end.local_name().as_ref())
                        .into_owned(),
                    attributes: Vec::new(),
                    text: String::new(),
                }),

                Event::Text(text) => push_text(&mut nodes, &text.unescape()?),

                Event::CData(data) => push_text(
                    &mut nodes,
                    &String::from_utf8_lossy(&data.into_inner()),
                ),

                Event::Eof => break,

                // Declarations, comments, processing instructions
                _ => (),
            }
        }

        // Whitespace between elements is layout, but the whole content of
        // an element without children is its value, verbatim.
        let layout: Vec<bool> = (0..nodes.len())
            .map(|ix| {
                NodeKind::Text == nodes[ix].kind
                    && nodes[ix].text.trim().is_empty()
                    && !(ix > 0
                        && NodeKind::Start == nodes[ix - 1].kind
                        && nodes
                            .get(ix + 1)
                            .map_or(false, |next| NodeKind::End == next.kind))
            })
            .collect();
        let nodes = nodes
            .into_iter()
            .zip(layout)
            .filter(|&(_, layout)| !layout)
            .map(|(node, _)| node)
            .collect();

        Ok(XmlReader { nodes, pos: None })
    }

    fn current(&self) -> Option<&Node> {
        self.pos.and_then(|pos| self.nodes.get(pos))
    }

    /// Index of the end node matching the start node at `start`.
    fn matching_end(&self, start: usize) -> Result<usize, Error> {
        let mut depth = 0usize;
        for (ix, node) in self.nodes.iter().enumerate().skip(start) {
            match node.kind {
                NodeKind::Start => depth += 1,
                NodeKind::End => {
                    depth -= 1;
                    if 0 == depth {
                        return Ok(ix);
                    }
                },
                NodeKind::Text => (),
            }
        }

        Err(Error::UnexpectedXml("unterminated element".to_owned()))
    }
}

impl XmlRead for XmlReader {
    fn advance(&mut self) -> Result<(), Error> {
        let next = self.pos.map_or(0, |pos| pos + 1);
        if next >= self.nodes.len() {
            return Err(Error::UnexpectedXml(
                "unexpected end of document".to_owned(),
            ));
        }

        self.pos = Some(next);
        Ok(())
    }

    fn local_name(&self) -> &str {
        self.current().map_or("", |node| &node.name)
    }

    fn is_start_element(
        &self,
        ns: Option<XmlNamespace>,
        name: Option<&str>,
    ) -> bool {
        self.current()
            .map_or(false, |node| node.matches(NodeKind::Start, ns, name))
    }

    fn is_end_element(
        &self,
        ns: Option<XmlNamespace>,
        name: Option<&str>,
    ) -> bool {
        self.current()
            .map_or(false, |node| node.matches(NodeKind::End, ns, name))
    }

    fn is_empty_element(&self) -> bool {
        match self.pos {
            Some(pos) => {
                NodeKind::Start == self.nodes[pos].kind
                    && self
                        .nodes
                        .get(pos + 1)
                        .map_or(false, |next| NodeKind::End == next.kind)
            },
            None => false,
        }
    }

    fn read_element_value(&mut self) -> Result<String, Error> {
        let start = match self.pos {
            Some(pos) if NodeKind::Start == self.nodes[pos].kind => pos,
            _ => {
                return Err(Error::UnexpectedXml(
                    "element value read outside an element".to_owned(),
                ))
            },
        };

        let end = self.matching_end(start)?;
        let mut value = String::new();
        for node in &self.nodes[start + 1..end] {
            match node.kind {
                NodeKind::Text => value.push_str(&node.text),
                _ => {
                    return Err(Error::UnexpectedXml(format!(
                        "element {} has child element {} where a value \
                         was expected",
                        self.nodes[start].name, node.name
                    )))
                },
            }
        }

        self.pos = Some(end);
        Ok(value)
    }

    fn read_attribute_value(&self, name: &str) -> Option<String> {
        self.current()
            .filter(|node| NodeKind::Start == node.kind)
            .and_then(|node| {
                node.attributes
                    .iter()
                    .find(|&&(ref k, _)| k == name)
                    .map(|&(_, ref v)| v.clone())
            })
    }

    fn skip_current_element(&mut self) -> Result<(), Error> {
        if let Some(pos) = self.pos {
            if NodeKind::Start == self.nodes[pos].kind {
                self.pos = Some(self.matching_end(pos)?);
            }
        }

        Ok(())
    }
}
