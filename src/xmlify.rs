use crate::error::ParseError;
use std::fmt::Display;
use std::io::Read;
use std::str::FromStr;
use xml::reader::{EventReader, ParserConfig, XmlEvent};
use xmltree::{Element, XMLNode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ElementBuilder(Element);

impl ElementBuilder {
    pub(crate) fn new(tag: &str) -> Self {
        Self(Element::new(tag))
    }
    pub(crate) fn build(self) -> Element {
        self.0
    }
    pub(crate) fn attr(mut self, key: &str, value: String) -> Self {
        self.0.attributes.insert(key.to_owned(), value);
        self
    }
    pub(crate) fn attr_opt(mut self, key: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.0.attributes.insert(key.to_owned(), value);
        }
        self
    }
    pub(crate) fn attr_opts<T: Display>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.0.attributes.insert(key.to_owned(), value.to_string());
        }
        self
    }
    pub(crate) fn attr_if(self, key: &str, flag: bool) -> Self {
        if flag {
            self.attr(key, "yes".to_owned())
        } else {
            self
        }
    }
    pub(crate) fn child<T: AsElement>(mut self, child: T) -> Self {
        self.0.children.push(child.into_node());
        self
    }
    pub(crate) fn child_opt<T: AsElement>(mut self, child: Option<T>) -> Self {
        if let Some(child) = child {
            self.0.children.push(child.into_node());
        }
        self
    }
    pub(crate) fn extend<T: AsElement, I: IntoIterator<Item = T>>(mut self, iter: I) -> Self {
        self.0
            .children
            .extend(iter.into_iter().map(AsElement::into_node));
        self
    }
    pub(crate) fn text(mut self, s: &str) -> Self {
        self.0.children.extend(encode_text(s));
        self
    }
    /// Appends `<tag>text</tag>`.
    pub(crate) fn text_child(mut self, tag: &str, s: &str) -> Self {
        let el = ElementBuilder::new(tag).text(s).build();
        self.0.children.push(XMLNode::Element(el));
        self
    }
    pub(crate) fn text_child_opt(self, tag: &str, s: Option<&str>) -> Self {
        match s {
            Some(s) => self.text_child(tag, s),
            None => self,
        }
    }
}

/// Reads the root element of a document.
///
/// Unlike `Element::parse`, whitespace-only character data is kept as text,
/// and CDATA sections stay `XMLNode::CData`.
pub(crate) fn read_element<R: Read>(reader: R) -> Result<Element, xmltree::ParseError> {
    let config = ParserConfig::new()
        .ignore_comments(false)
        .whitespace_to_characters(true);
    let mut events = EventReader::new_with_config(reader, config);
    let mut open: Vec<Element> = Vec::new();
    let mut root = None;
    loop {
        let event = events.next().map_err(xmltree::ParseError::MalformedXml)?;
        let node = match event {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let mut el = Element::new(&name.local_name);
                el.prefix = name.prefix;
                el.namespace = name.namespace;
                for attr in attributes {
                    el.attributes.insert(attr.name.local_name, attr.value);
                }
                open.push(el);
                continue;
            }
            XmlEvent::EndElement { .. } => match open.pop() {
                Some(el) if open.is_empty() => {
                    root = Some(el);
                    continue;
                }
                Some(el) => XMLNode::Element(el),
                None => return Err(xmltree::ParseError::CannotParse),
            },
            XmlEvent::Characters(s) | XmlEvent::Whitespace(s) => XMLNode::Text(s),
            XmlEvent::CData(s) => XMLNode::CData(s),
            XmlEvent::Comment(s) => XMLNode::Comment(s),
            XmlEvent::ProcessingInstruction { name, data } => {
                XMLNode::ProcessingInstruction(name, data)
            }
            XmlEvent::StartDocument { .. } => continue,
            XmlEvent::EndDocument => return root.ok_or(xmltree::ParseError::CannotParse),
        };
        // Nodes outside the root element are dropped.
        if let Some(parent) = open.last_mut() {
            parent.children.push(node);
        }
    }
}

/// Conversion between a typed TS node and its `xmltree` element.
pub trait AsElement: Sized {
    const TAG: &'static str;

    fn into_element(self) -> Element;
    fn into_node(self) -> XMLNode {
        XMLNode::Element(self.into_element())
    }
    fn parse_content(el: Element) -> Result<Self, ParseError>;

    fn unexpected(found: String) -> ParseError {
        ParseError::UnexpectedElement {
            parent: Self::TAG,
            found,
        }
    }
    fn missing(child: &'static str) -> ParseError {
        ParseError::MissingElement {
            parent: Self::TAG,
            missing: child,
        }
    }
}

/// Removes and parses an attribute, reporting the offending value on failure.
pub(crate) fn take_attr<T: FromStr>(
    el: &mut Element,
    tag: &'static str,
    attribute: &'static str,
) -> Result<Option<T>, ParseError> {
    match el.attributes.remove(attribute) {
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ParseError::InvalidAttribute {
                tag,
                attribute,
                value,
            }),
        },
        None => Ok(None),
    }
}

/// Reads `numerus`/`variants` style flags. Absent means no.
pub(crate) fn take_flag(
    el: &mut Element,
    tag: &'static str,
    attribute: &'static str,
) -> Result<bool, ParseError> {
    Ok(take_attr::<YesNo>(el, tag, attribute)? == Some(YesNo::Yes))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum YesNo {
    No,
    Yes,
}
impl FromStr for YesNo {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            _ => Err(()),
        }
    }
}

/// Stores a child that may appear at most once.
pub(crate) fn set_once<T>(
    slot: &mut Option<T>,
    parent: &'static str,
    element: &str,
    value: T,
) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::RepeatedElement {
            parent,
            element: element.to_owned(),
        });
    }
    *slot = Some(value);
    Ok(())
}

/// Indentation between child elements is fine; anything else is not.
pub(crate) fn check_blank(parent: &'static str, node: &XMLNode) -> Result<(), ParseError> {
    match node {
        XMLNode::Text(s) | XMLNode::CData(s) if !s.trim().is_empty() => {
            Err(ParseError::UnexpectedText {
                parent,
                text: s.clone(),
            })
        }
        _ => Ok(()),
    }
}

/// Flattens the mixed content of a text-only element: character data, CDATA
/// sections and `<byte>` escapes.
pub(crate) fn collect_text(parent: &'static str, children: Vec<XMLNode>) -> Result<String, ParseError> {
    let mut text = String::new();
    for node in children {
        match node {
            XMLNode::Text(s) | XMLNode::CData(s) => text.push_str(&s),
            XMLNode::Element(el) if el.name == BYTE => push_byte(&mut text, el)?,
            XMLNode::Element(el) => {
                return Err(ParseError::UnexpectedElement {
                    parent,
                    found: el.name,
                })
            }
            _ => (),
        }
    }
    Ok(text)
}

// Element used to escape characters not allowed in an xml document:
// only #x9, #xA and #xD are allowed below #x20. value holds the decimal
// (e.g. 27) or hex (e.g. x1b) code point.
const BYTE: &str = "byte";

fn push_byte(text: &mut String, mut el: Element) -> Result<(), ParseError> {
    let value = el
        .attributes
        .remove("value")
        .ok_or(ParseError::MissingElement {
            parent: BYTE,
            missing: "value",
        })?;
    let (radix, digits) = if let Some(hex) = value.strip_prefix("0x") {
        (16, hex)
    } else if let Some(hex) = value.strip_prefix('x') {
        (16, hex)
    } else {
        (10, &value[..])
    };
    let n = u32::from_str_radix(digits, radix).map_err(|_| ParseError::InvalidByte(value.clone()))?;
    if n != 0 {
        text.push(char::from_u32(n).ok_or_else(|| ParseError::InvalidByte(value.clone()))?);
    }
    Ok(())
}

fn needs_byte(c: char) -> bool {
    c < '\u{20}' && c != '\t' && c != '\n'
}

/// Splits text into character data and `<byte>` elements.
fn encode_text(s: &str) -> Vec<XMLNode> {
    if !s.contains(needs_byte) {
        return if s.is_empty() {
            Vec::new()
        } else {
            vec![XMLNode::Text(s.to_owned())]
        };
    }
    let mut nodes = Vec::new();
    let mut run = String::new();
    for c in s.chars() {
        if needs_byte(c) {
            if !run.is_empty() {
                nodes.push(XMLNode::Text(std::mem::take(&mut run)));
            }
            let byte = ElementBuilder::new(BYTE)
                .attr("value", format!("x{:x}", c as u32))
                .build();
            nodes.push(XMLNode::Element(byte));
        } else {
            run.push(c);
        }
    }
    if !run.is_empty() {
        nodes.push(XMLNode::Text(run));
    }
    nodes
}
