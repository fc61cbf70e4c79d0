// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{Fubar, Result};
use quick_xml::{events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
                Reader,
                Writer};
use std::io;


/// A small owned XML element tree, just enough for the metadata document.
/// Namespace prefixes are dropped when reading, text is trimmed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
  pub name:       String,
  pub attributes: Vec<(String, String)>,
  pub children:   Vec<Element>,
  pub text:       String,
}

impl Element {
  pub fn new(name: &str) -> Self {
    Self { name: name.to_string(),
           ..Self::default() }
  }

  pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
    self.attributes.push((key.to_string(), value.to_string()));
    self
  }

  pub fn with_text(mut self, text: &str) -> Self {
    self.text = text.to_string();
    self
  }

  pub fn push(&mut self, child: Element) {
    self.children.push(child);
  }

  /// Appends `<name>text</name>` if there is any text.
  pub fn push_text(&mut self, name: &str, text: Option<&str>) {
    if let Some(text) = text {
      self.children.push(Element::new(name).with_text(text));
    }
  }

  pub fn attribute(&self, key: &str) -> Option<&str> {
    self.attributes
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
  }

  pub fn child(&self, name: &str) -> Option<&Element> {
    self.children.iter().find(|c| c.name == name)
  }

  pub fn children_named<'a>(&'a self,
                            name: &'a str)
                            -> impl Iterator<Item = &'a Element> + 'a {
    self.children.iter().filter(move |c| c.name == name)
  }

  /// Text of the first child called `name`, `None` if it is missing or empty.
  pub fn child_text(&self, name: &str) -> Option<&str> {
    self.child(name)
        .map(|c| c.text.as_str())
        .filter(|text| !text.is_empty())
  }

  // READING / WRITING ----------------------------------------------------- //

  pub fn parse(bytes: &[u8]) -> Result<Self> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
      match reader.read_event_into(&mut buf)? {
        Event::Start(start) => stack.push(Self::open(&start)?),
        Event::Empty(start) => {
          let element = Self::open(&start)?;
          Self::close(&mut stack, &mut root, element)?;
        }
        Event::End(_) => {
          let element = stack.pop()
                             .ok_or_else(|| codec("unbalanced end tag"))?;
          Self::close(&mut stack, &mut root, element)?;
        }
        Event::Text(text) => {
          if let Some(element) = stack.last_mut() {
            element.text.push_str(&text.unescape()?);
          }
        }
        Event::CData(data) => {
          if let Some(element) = stack.last_mut() {
            element.text.push_str(std::str::from_utf8(&data)?);
          }
        }
        Event::Eof => break,
        _ => {}
      }
      buf.clear();
    }

    ensure!(stack.is_empty(), codec("unexpected end of document"));
    root.ok_or_else(|| codec("document has no root element"))
  }

  fn open(start: &BytesStart) -> Result<Self> {
    let mut element = Self::new(std::str::from_utf8(start.local_name()
                                                         .as_ref())?);
    for attribute in start.attributes() {
      let attribute = attribute?;
      let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
      let value = attribute.unescape_value()?.into_owned();
      element.attributes.push((key, value));
    }
    Ok(element)
  }

  fn close(stack: &mut Vec<Element>,
           root: &mut Option<Element>,
           element: Element)
           -> Result<()> {
    match stack.last_mut() {
      Some(parent) => parent.children.push(element),
      None => {
        ensure!(root.is_none(), codec("more than one root element"));
        *root = Some(element);
      }
    }
    Ok(())
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    self.write(&mut writer)?;
    Ok(writer.into_inner())
  }

  fn write<W: io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
    let mut start = BytesStart::new(self.name.as_str());
    for (key, value) in &self.attributes {
      start.push_attribute((key.as_str(), value.as_str()));
    }

    if self.children.is_empty() && self.text.is_empty() {
      writer.write_event(Event::Empty(start))?;
      return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !self.text.is_empty() {
      writer.write_event(Event::Text(BytesText::new(&self.text)))?;
    }
    for child in &self.children {
      child.write(writer)?;
    }
    writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
    Ok(())
  }
}

fn codec(message: &str) -> Fubar {
  Fubar::Codec(message.to_string())
}
