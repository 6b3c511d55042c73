//! Typed model of the TS 2.1 document format written by Qt Linguist tools.
//!
//! Every element and attribute of the format is kept, so a parsed document
//! can be written back without losing translator-facing metadata.

use crate::error::ParseError;
use crate::xmlify::{
    check_blank, collect_text, read_element, set_once, take_attr, take_flag, AsElement,
    ElementBuilder,
};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use xmltree::{Element, XMLNode};

/// Reads an element that holds nothing but text.
fn text_of(tag: &'static str, el: Element) -> Result<String, ParseError> {
    collect_text(tag, el.children)
}

// This element wildcard is no valid DTD. No better solution available.
// extra elements may appear in TS and message elements. Each element may appear
// only once within each scope. The contents are preserved verbatim; any
// attributes are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extra {
    pub name: String,
    pub content: String,
}
impl Extra {
    fn is_extra(name: &str) -> bool {
        name.starts_with("extra-")
    }

    fn parse(el: Element) -> Result<Self, ParseError> {
        Ok(Self {
            content: collect_text("extra-*", el.children)?,
            name: el.name,
        })
    }

    fn into_node(self) -> XMLNode {
        XMLNode::Element(ElementBuilder::new(&self.name).text(&self.content).build())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ts {
    // attributes
    pub version: Option<String>,
    pub source_language: Option<String>,
    pub language: Option<String>,
    // children
    /// The encoding to use in the QM file by default.
    pub default_codec: Option<String>,
    pub dependencies: Vec<String>,
    pub contexts: Vec<Context>,
    pub extra: Vec<Extra>,
}
impl AsElement for Ts {
    const TAG: &'static str = "TS";

    fn into_element(self) -> Element {
        let mut builder = ElementBuilder::new(Self::TAG)
            .attr_opt("version", self.version)
            .attr_opt("sourcelanguage", self.source_language)
            .attr_opt("language", self.language)
            .text_child_opt("defaultcodec", self.default_codec.as_deref());
        if !self.dependencies.is_empty() {
            builder = builder.child(Dependencies(self.dependencies));
        }
        let mut el = builder.extend(self.contexts).build();
        el.children
            .extend(self.extra.into_iter().map(Extra::into_node));
        el
    }

    fn parse_content(mut el: Element) -> Result<Self, ParseError> {
        let mut this = Self {
            version: el.attributes.remove("version"),
            source_language: el.attributes.remove("sourcelanguage"),
            language: el.attributes.remove("language"),
            ..Default::default()
        };
        // A context may be split over several blocks; later blocks merge into the first.
        let mut positions: HashMap<String, usize> = HashMap::new();
        for child in el.children {
            let child = match child {
                XMLNode::Element(child) => child,
                _ => continue,
            };
            match child.name.as_str() {
                "defaultcodec" => set_once(
                    &mut this.default_codec,
                    Self::TAG,
                    "defaultcodec",
                    text_of("defaultcodec", child)?,
                )?,
                Dependencies::TAG => this.dependencies = Dependencies::parse_content(child)?.0,
                Context::TAG => {
                    let context = Context::parse_content(child)?;
                    match positions.get(&context.name) {
                        Some(&i) => this.contexts[i].messages.extend(context.messages),
                        None => {
                            positions.insert(context.name.clone(), this.contexts.len());
                            this.contexts.push(context);
                        }
                    }
                }
                name if Extra::is_extra(name) => this.extra.push(Extra::parse(child)?),
                _ => return Err(Self::unexpected(child.name)),
            }
        }
        Ok(this)
    }
}
impl Ts {
    pub fn new(source_language: Option<String>, language: Option<String>) -> Self {
        Self {
            version: Some("2.1".into()),
            source_language,
            language,
            ..Default::default()
        }
    }

    /// Parses a whole document. The root element must be `<TS>`.
    ///
    /// Whitespace-only text is kept, so a translation of `" "` survives.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ParseError> {
        let root = read_element(reader)?;
        if root.name != Self::TAG {
            return Err(ParseError::UnexpectedRoot(root.name));
        }
        Self::parse_content(root)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ParseError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Drops vanished and obsolete messages, then contexts left empty.
    pub fn purge_obsolete(&mut self) {
        for ctx in &mut self.contexts {
            ctx.messages.retain(|msg| !msg.status().is_retired());
        }
        self.contexts.retain(|ctx| !ctx.messages.is_empty());
    }

    pub fn messages(&self) -> impl Iterator<Item = (&Context, &Message)> {
        self.contexts
            .iter()
            .flat_map(|ctx| ctx.messages.iter().map(move |msg| (ctx, msg)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Dependencies(Vec<String>);
impl AsElement for Dependencies {
    const TAG: &'static str = "dependencies";

    fn into_element(self) -> Element {
        let deps = self
            .0
            .into_iter()
            .map(|catalog| ElementBuilder::new("dependency").attr("catalog", catalog).build());
        let mut el = Element::new(Self::TAG);
        el.children.extend(deps.map(XMLNode::Element));
        el
    }

    fn parse_content(el: Element) -> Result<Self, ParseError> {
        let mut catalogs = Vec::new();
        for child in el.children {
            if let XMLNode::Element(mut child) = child {
                if child.name != "dependency" {
                    return Err(Self::unexpected(child.name));
                }
                let catalog = child
                    .attributes
                    .remove("catalog")
                    .ok_or_else(|| Self::missing("catalog"))?;
                catalogs.push(catalog);
            }
        }
        Ok(Self(catalogs))
    }
}

/// A named group of messages, usually one dialog or widget class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    // attributes
    pub encoding: Option<String>,
    // children
    pub name: String,
    pub comment: Option<String>,
    pub messages: Vec<Message>,
}
impl AsElement for Context {
    const TAG: &'static str = "context";

    fn into_element(self) -> Element {
        ElementBuilder::new(Self::TAG)
            .attr_opt("encoding", self.encoding)
            .text_child("name", &self.name)
            .text_child_opt("comment", self.comment.as_deref())
            .extend(self.messages)
            .build()
    }

    fn parse_content(mut el: Element) -> Result<Self, ParseError> {
        let mut name = None;
        let mut this = Self {
            encoding: el.attributes.remove("encoding"),
            ..Default::default()
        };
        for child in el.children {
            let child = match child {
                XMLNode::Element(child) => child,
                _ => continue,
            };
            match child.name.as_str() {
                "name" => set_once(&mut name, Self::TAG, "name", text_of("name", child)?)?,
                "comment" => set_once(
                    &mut this.comment,
                    Self::TAG,
                    "comment",
                    text_of("comment", child)?,
                )?,
                Message::TAG => this.messages.push(Message::parse_content(child)?),
                _ => return Err(Self::unexpected(child.name)),
            }
        }
        this.name = name.ok_or_else(|| Self::missing("name"))?;
        Ok(this)
    }
}
impl Context {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// If utf8 is "true", the defaultcodec is overridden and the message is encoded
// in UTF-8 in the QM file. If it is "both", both source encodings are stored
// in the QM file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Utf8 {
    True,
    False,
    Both,
}
impl Display for Utf8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::True => "true",
            Self::False => "false",
            Self::Both => "both",
        })
    }
}
impl FromStr for Utf8 {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

/// One translatable unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    // attributes
    pub id: Option<String>,
    pub utf8: Option<Utf8>,
    pub numerus: bool,
    // children
    pub locations: Vec<Location>,
    pub source: String,
    /// Previous content of source (result of merge)
    pub old_source: Option<String>,
    /// This is "disambiguation" in the (new) API, or "msgctxt" in gettext speak
    pub comment: Option<String>,
    /// Previous content of comment (result of merge)
    pub old_comment: Option<String>,
    /// The real comment (added by developer/designer)
    pub extra_comment: Option<String>,
    /// Comment added by translator
    pub translator_comment: Option<String>,
    pub translation: Option<Translation>,
    pub user_data: Option<String>,
    pub extra: Vec<Extra>,
}
impl AsElement for Message {
    const TAG: &'static str = "message";

    fn into_element(self) -> Element {
        let mut el = ElementBuilder::new(Self::TAG)
            .attr_opt("id", self.id)
            .attr_opts("utf8", self.utf8)
            .attr_if("numerus", self.numerus)
            .extend(self.locations)
            .text_child("source", &self.source)
            .text_child_opt("oldsource", self.old_source.as_deref())
            .text_child_opt("comment", self.comment.as_deref())
            .text_child_opt("oldcomment", self.old_comment.as_deref())
            .text_child_opt("extracomment", self.extra_comment.as_deref())
            .text_child_opt("translatorcomment", self.translator_comment.as_deref())
            .child_opt(self.translation)
            .text_child_opt("userdata", self.user_data.as_deref())
            .build();
        el.children
            .extend(self.extra.into_iter().map(Extra::into_node));
        el
    }

    fn parse_content(mut el: Element) -> Result<Self, ParseError> {
        let mut source = None;
        let mut this = Self {
            id: el.attributes.remove("id"),
            utf8: take_attr(&mut el, Self::TAG, "utf8")?,
            numerus: take_flag(&mut el, Self::TAG, "numerus")?,
            ..Default::default()
        };
        for child in el.children {
            let child = match child {
                XMLNode::Element(child) => child,
                _ => continue,
            };
            match child.name.as_str() {
                Location::TAG => this.locations.push(Location::parse_content(child)?),
                Translation::TAG => set_once(
                    &mut this.translation,
                    Self::TAG,
                    Translation::TAG,
                    Translation::parse_content(child)?,
                )?,
                "source" | "oldsource" | "comment" | "oldcomment" | "extracomment"
                | "translatorcomment" | "userdata" => {
                    let (slot, tag) = match child.name.as_str() {
                        "source" => (&mut source, "source"),
                        "oldsource" => (&mut this.old_source, "oldsource"),
                        "comment" => (&mut this.comment, "comment"),
                        "oldcomment" => (&mut this.old_comment, "oldcomment"),
                        "extracomment" => (&mut this.extra_comment, "extracomment"),
                        "translatorcomment" => (&mut this.translator_comment, "translatorcomment"),
                        _ => (&mut this.user_data, "userdata"),
                    };
                    set_once(slot, Self::TAG, tag, text_of(tag, child)?)?
                }
                name if Extra::is_extra(name) => this.extra.push(Extra::parse(child)?),
                _ => return Err(Self::unexpected(child.name)),
            }
        }
        this.source = source.ok_or_else(|| Self::missing("source"))?;
        Ok(this)
    }
}
impl Message {
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self {
            source: source.into(),
            translation: Some(Translation::default()),
            ..Default::default()
        }
    }

    /// The disambiguating comment, with an empty comment treated as none.
    pub fn disambiguation(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }

    /// A message without a `<translation>` counts as unfinished.
    pub fn status(&self) -> TranslationType {
        self.translation
            .as_ref()
            .map_or(TranslationType::Unfinished, |t| t.type_)
    }
}

// If the line is omitted, the location specifies only a file.
//
// location supports relative specifications as well. Line numbers are
// relative (explicitly positive or negative) to the last reference to a
// given filename; each file starts with current line 0. If the filename
// is omitted, the "current" one is used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    // attributes
    pub filename: Option<String>,
    /// Kept verbatim so relative offsets such as `+3` survive.
    pub line: Option<String>,
}
impl AsElement for Location {
    const TAG: &'static str = "location";

    fn into_element(self) -> Element {
        ElementBuilder::new(Self::TAG)
            .attr_opt("filename", self.filename)
            .attr_opt("line", self.line)
            .build()
    }

    fn parse_content(mut el: Element) -> Result<Self, ParseError> {
        let line = el.attributes.remove("line");
        if let Some(line) = &line {
            if line.parse::<i64>().is_err() {
                return Err(ParseError::InvalidAttribute {
                    tag: Self::TAG,
                    attribute: "line",
                    value: line.clone(),
                });
            }
        }
        Ok(Self {
            filename: el.attributes.remove("filename"),
            line,
        })
    }
}

/// Lifecycle of a translation. "finished" is the absence of a `type` attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TranslationType {
    Finished,
    Unfinished,
    Vanished,
    Obsolete,
}
impl Default for TranslationType {
    fn default() -> Self {
        Self::Unfinished
    }
}
impl Display for TranslationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Finished => "finished",
            Self::Unfinished => "unfinished",
            Self::Vanished => "vanished",
            Self::Obsolete => "obsolete",
        })
    }
}
impl FromStr for TranslationType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finished" => Ok(Self::Finished),
            "unfinished" => Ok(Self::Unfinished),
            "vanished" => Ok(Self::Vanished),
            "obsolete" => Ok(Self::Obsolete),
            _ => Err(()),
        }
    }
}
impl TranslationType {
    /// Vanished and obsolete messages are kept only for reuse.
    pub fn is_retired(self) -> bool {
        matches!(self, Self::Vanished | Self::Obsolete)
    }
}

/// Text of a translation or of one plural form. Length variants must be
/// ordered by falling display length.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TranslationText {
    Plain(String),
    LengthVariants(Vec<String>),
}
impl Default for TranslationText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}
impl TranslationText {
    /// The plain text, or the longest length variant.
    pub fn primary(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::LengthVariants(xs) => xs.first().map_or("", String::as_str),
        }
    }

    fn parse(tag: &'static str, children: Vec<XMLNode>) -> Result<Self, ParseError> {
        let has_variants = children
            .iter()
            .any(|node| matches!(node, XMLNode::Element(el) if el.name == "lengthvariant"));
        if !has_variants {
            return collect_text(tag, children).map(Self::Plain);
        }
        let mut variants = Vec::new();
        for node in children {
            match node {
                XMLNode::Element(el) if el.name == "lengthvariant" => {
                    variants.push(text_of("lengthvariant", el)?)
                }
                XMLNode::Element(el) => {
                    return Err(ParseError::UnexpectedElement {
                        parent: tag,
                        found: el.name,
                    })
                }
                other => check_blank(tag, &other)?,
            }
        }
        Ok(Self::LengthVariants(variants))
    }

    fn write_into(self, builder: ElementBuilder) -> ElementBuilder {
        match self {
            Self::Plain(s) => builder.text(&s),
            Self::LengthVariants(xs) => xs
                .iter()
                .fold(builder, |b, x| b.text_child("lengthvariant", x)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TranslationBody {
    Text(TranslationText),
    NumerusForms(Vec<NumerusForm>),
}
impl Default for TranslationBody {
    fn default() -> Self {
        Self::Text(TranslationText::default())
    }
}

// variants may not be yes if the message has numerus yes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Translation {
    // attributes
    pub type_: TranslationType,
    pub variants: bool,
    // children
    pub body: TranslationBody,
}
impl AsElement for Translation {
    const TAG: &'static str = "translation";

    fn into_element(self) -> Element {
        let type_ = match self.type_ {
            TranslationType::Finished => None,
            other => Some(other),
        };
        let builder = ElementBuilder::new(Self::TAG)
            .attr_opts("type", type_)
            .attr_if("variants", self.variants);
        let builder = match self.body {
            TranslationBody::Text(text) => text.write_into(builder),
            TranslationBody::NumerusForms(forms) => builder.extend(forms),
        };
        builder.build()
    }

    fn parse_content(mut el: Element) -> Result<Self, ParseError> {
        let type_ = take_attr(&mut el, Self::TAG, "type")?.unwrap_or(TranslationType::Finished);
        let variants = take_flag(&mut el, Self::TAG, "variants")?;
        let numerus = el
            .children
            .iter()
            .any(|node| matches!(node, XMLNode::Element(el) if el.name == NumerusForm::TAG));
        let body = if numerus {
            let mut forms = Vec::new();
            for node in el.children {
                match node {
                    XMLNode::Element(form) if form.name == NumerusForm::TAG => {
                        forms.push(NumerusForm::parse_content(form)?)
                    }
                    XMLNode::Element(other) => return Err(Self::unexpected(other.name)),
                    other => check_blank(Self::TAG, &other)?,
                }
            }
            TranslationBody::NumerusForms(forms)
        } else {
            TranslationBody::Text(TranslationText::parse(Self::TAG, el.children)?)
        };
        Ok(Self {
            type_,
            variants,
            body,
        })
    }
}
impl Translation {
    pub fn finished<S: Into<String>>(text: S) -> Self {
        Self {
            type_: TranslationType::Finished,
            variants: false,
            body: TranslationBody::Text(TranslationText::Plain(text.into())),
        }
    }

    pub fn plural<I, S>(type_: TranslationType, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let forms = forms
            .into_iter()
            .map(|form| NumerusForm {
                variants: false,
                text: TranslationText::Plain(form.into()),
            })
            .collect();
        Self {
            type_,
            variants: false,
            body: TranslationBody::NumerusForms(forms),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NumerusForm {
    // attributes
    pub variants: bool,
    // children
    pub text: TranslationText,
}
impl AsElement for NumerusForm {
    const TAG: &'static str = "numerusform";

    fn into_element(self) -> Element {
        let builder = ElementBuilder::new(Self::TAG).attr_if("variants", self.variants);
        self.text.write_into(builder).build()
    }

    fn parse_content(mut el: Element) -> Result<Self, ParseError> {
        Ok(Self {
            variants: take_flag(&mut el, Self::TAG, "variants")?,
            text: TranslationText::parse(Self::TAG, el.children)?,
        })
    }
}
