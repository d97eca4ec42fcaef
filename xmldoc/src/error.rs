//! Error types for xmldoc.

use thiserror::Error;

/// Result type alias for xmldoc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or building documents.
///
/// Well-formedness problems found while parsing are not reported through this
/// type; the reader accumulates them instead (see
/// [`XmlReader::error_count`](crate::XmlReader::error_count)).
#[derive(Error, Debug)]
pub enum Error {
    /// Input that cannot be turned into a document at all.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// The document has neither a URL nor a file to read from.
    #[error("cannot resolve input: {0}")]
    InputResolution(String),

    /// A URL whose scheme the reader or writer cannot open.
    #[error("unsupported URL scheme `{scheme}` in {url}")]
    UnsupportedScheme {
        /// The offending scheme.
        scheme: String,
        /// The full URL.
        url: String,
    },

    /// Adding the child would make an element its own ancestor.
    #[error("cannot add <{child}> under <{parent}>: it is an ancestor of the parent")]
    Cycle {
        /// Tag of the would-be parent.
        parent: String,
        /// Tag of the rejected child.
        child: String,
    },

    /// No builder (and no delegate) knows how to handle this type.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A declaration names a builder with no registered factory.
    #[error("no factory registered for builder {0}")]
    UnknownBuilder(String),

    /// The builder does not support the requested direction.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed document URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
