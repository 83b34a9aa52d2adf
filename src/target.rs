use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader as XmlReader, Writer as XmlWriter};

use crate::{OuiError, Result};

pub(crate) const RECORD_TAG: &str = "record";
pub(crate) const OUI_FIELD: &str = "oui";
pub(crate) const COMPANY_NAME_FIELD: &str = "companyName";
pub(crate) const COMPANY_ADDRESS_FIELD: &str = "companyAddress";

type XmlResult<T> = std::result::Result<T, quick_xml::Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmlElement {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<XmlNode>,
}

impl XmlElement {
    fn from_start(e: &BytesStart<'_>) -> XmlResult<Self> {
        Ok(Self {
            name: element_name(e),
            attributes: element_attributes(e)?,
            children: Vec::new(),
        })
    }

    /// Text content of a leaf element; `None` when it holds nested markup.
    pub(crate) fn text(&self) -> Option<&str> {
        match self.children.as_slice() {
            [] => Some(""),
            [XmlNode::Text(text)] | [XmlNode::CData(text)] => Some(text.as_str()),
            _ => None,
        }
    }

    fn set_text(&mut self, value: String) {
        self.children.clear();
        if !value.is_empty() {
            self.children.push(XmlNode::Text(value));
        }
    }

    /// Indentation between child tags is layout, not content; the writer
    /// re-indents anyway.
    fn drop_layout_whitespace(&mut self) {
        let structured = self
            .children
            .iter()
            .any(|child| matches!(child, XmlNode::Element(_) | XmlNode::Comment(_)));
        if structured {
            self.children
                .retain(|child| !matches!(child, XmlNode::Text(text) if text.trim().is_empty()));
        }
    }
}

/// One `<record>` of the vendor database, child elements kept in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TargetRecord {
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) fields: Vec<XmlElement>,
}

impl TargetRecord {
    fn from_element(element: XmlElement) -> Self {
        let fields = element
            .children
            .into_iter()
            .filter_map(|child| match child {
                XmlNode::Element(field) => Some(field),
                _ => None,
            })
            .collect();
        Self {
            attributes: element.attributes,
            fields,
        }
    }

    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .and_then(XmlElement::text)
    }

    /// Replace the text of the first field with this name, or append one.
    /// Attributes of an existing field are kept.
    pub(crate) fn set_field(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.set_text(value),
            None => {
                let mut field = XmlElement {
                    name: name.to_string(),
                    ..XmlElement::default()
                };
                field.set_text(value);
                self.fields.push(field);
            }
        }
    }

    pub(crate) fn oui(&self) -> Option<&str> {
        self.field(OUI_FIELD)
    }

    pub(crate) fn company_name(&self) -> Option<&str> {
        self.field(COMPANY_NAME_FIELD)
    }

    pub(crate) fn company_address(&self) -> Option<&str> {
        self.field(COMPANY_ADDRESS_FIELD)
    }
}

/// The macaddress.io XML export: a root element holding `<record>` children.
///
/// Root children that are not records (metadata elements, comments) sit in
/// `extras`, keyed by the number of records that precede them, so they are
/// written back where they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TargetDatabase {
    pub(crate) root: String,
    pub(crate) root_attributes: Vec<(String, String)>,
    pub(crate) records: Vec<TargetRecord>,
    pub(crate) extras: Vec<(usize, XmlNode)>,
}

impl TargetDatabase {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let xml = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(OuiError::MissingSource {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(OuiError::io(err, path)),
        };
        let xml = String::from_utf8(xml)
            .map_err(|err| OuiError::parse(path, format!("not UTF-8: {err}")))?;
        let db = Self::parse_str(&xml, path)?;
        tracing::info!(path = %path.display(), records = db.records.len(), "target database loaded");
        Ok(db)
    }

    pub(crate) fn parse_str(xml: &str, source: &Path) -> Result<Self> {
        let root = parse_tree(xml, source)?;
        let mut records = Vec::new();
        let mut extras = Vec::new();
        for child in root.children {
            match child {
                XmlNode::Element(element) if element.name == RECORD_TAG => {
                    records.push(TargetRecord::from_element(element));
                }
                XmlNode::Text(text) if text.trim().is_empty() => {}
                other => extras.push((records.len(), other)),
            }
        }
        Ok(Self {
            root: root.name,
            root_attributes: root.attributes,
            records,
            extras,
        })
    }

    pub(crate) fn to_xml(&self) -> XmlResult<Vec<u8>> {
        let mut writer = XmlWriter::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(start_tag(&self.root, &self.root_attributes)))?;

        let mut extras = self.extras.iter().peekable();
        for (position, record) in self.records.iter().enumerate() {
            while let Some((_, node)) = extras.next_if(|(at, _)| *at <= position) {
                write_node(&mut writer, node)?;
            }
            let start = start_tag(RECORD_TAG, &record.attributes);
            if record.fields.is_empty() {
                writer.write_event(Event::Empty(start))?;
                continue;
            }
            writer.write_event(Event::Start(start))?;
            for field in &record.fields {
                write_element(&mut writer, field)?;
            }
            writer.write_event(Event::End(BytesEnd::new(RECORD_TAG)))?;
        }
        for (_, node) in extras {
            write_node(&mut writer, node)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.root.as_str())))?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Write through a sibling temp file so a failed run never leaves a
    /// truncated database behind.
    pub(crate) fn write(&self, path: &Path) -> Result<()> {
        let bytes = self
            .to_xml()
            .map_err(|err| OuiError::io(io::Error::other(err.to_string()), path))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| OuiError::io(err, parent))?;
        }
        let tmp = temp_path(path);
        fs::write(&tmp, &bytes).map_err(|err| OuiError::io(err, &tmp))?;
        fs::rename(&tmp, path).map_err(|err| OuiError::io(err, path))?;
        tracing::info!(path = %path.display(), records = self.records.len(), "target database written");
        Ok(())
    }
}

/// Read the whole document into an element tree rooted at its single root.
fn parse_tree(xml: &str, source: &Path) -> Result<XmlElement> {
    let mut reader = XmlReader::from_str(xml);
    let at = |reader: &XmlReader<&[u8]>, err: &dyn std::fmt::Display| {
        OuiError::parse(source, format!("at byte {}: {err}", reader.buffer_position()))
    };

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    loop {
        let node = match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = XmlElement::from_start(&e).map_err(|err| at(&reader, &err))?;
                stack.push(element);
                continue;
            }
            Ok(Event::End(_)) => match stack.pop() {
                Some(mut element) => {
                    element.drop_layout_whitespace();
                    XmlNode::Element(element)
                }
                None => return Err(at(&reader, &"unexpected closing tag")),
            },
            Ok(Event::Empty(e)) => {
                XmlNode::Element(XmlElement::from_start(&e).map_err(|err| at(&reader, &err))?)
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|err| at(&reader, &err))?;
                if text.is_empty() {
                    continue;
                }
                XmlNode::Text(text.into_owned())
            }
            Ok(Event::CData(c)) => {
                XmlNode::CData(String::from_utf8_lossy(&c.into_inner()).into_owned())
            }
            Ok(Event::Comment(c)) => XmlNode::Comment(String::from_utf8_lossy(&c).into_owned()),
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(err) => return Err(at(&reader, &err)),
        };

        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => match node {
                XmlNode::Element(element) if root.is_none() => root = Some(element),
                XmlNode::Element(_) => return Err(at(&reader, &"more than one root element")),
                _ => {}
            },
        }
    }

    if !stack.is_empty() {
        return Err(OuiError::parse(source, "unexpected end of document"));
    }
    root.ok_or_else(|| OuiError::parse(source, "no root element"))
}

fn start_tag<'a>(name: &'a str, attributes: &'a [(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

fn write_element<W: Write>(writer: &mut XmlWriter<W>, element: &XmlElement) -> XmlResult<()> {
    let start = start_tag(&element.name, &element.attributes);
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

fn write_node<W: Write>(writer: &mut XmlWriter<W>, node: &XmlNode) -> XmlResult<()> {
    match node {
        XmlNode::Element(element) => write_element(writer, element),
        XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text))),
        XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str()))),
        XmlNode::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
        }
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn element_attributes(e: &BytesStart<'_>) -> XmlResult<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
