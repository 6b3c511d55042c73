use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a TS file into a catalog.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed XML: {0}")]
    Xml(#[from] xmltree::ParseError),
    #[error("root element is <{0}>, expected <TS>")]
    UnexpectedRoot(String),
    #[error("unexpected <{found}> inside <{parent}>")]
    UnexpectedElement { parent: &'static str, found: String },
    #[error("<{parent}> is missing required <{missing}>")]
    MissingElement {
        parent: &'static str,
        missing: &'static str,
    },
    #[error("<{parent}> may contain only one <{element}>")]
    RepeatedElement {
        parent: &'static str,
        element: String,
    },
    #[error("stray text {text:?} inside <{parent}>")]
    UnexpectedText { parent: &'static str, text: String },
    #[error("invalid value {value:?} for attribute {attribute:?} on <{tag}>")]
    InvalidAttribute {
        tag: &'static str,
        attribute: &'static str,
        value: String,
    },
    #[error("invalid <byte> value {0:?}")]
    InvalidByte(String),
    #[error("duplicate message in context {context:?}: source {source_text:?}, comment {comment:?}")]
    DuplicateMessage {
        context: String,
        source_text: String,
        comment: String,
    },
}

/// A lookup key that has no entry in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("no translation for {source_text:?} (comment {comment:?}) in context {context:?}")]
pub struct NotFoundError {
    pub context: String,
    pub source_text: String,
    pub comment: Option<String>,
}

/// Errors raised while saving a catalog.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("unable to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to serialize catalog: {0}")]
    Xml(#[from] xmltree::Error),
}
