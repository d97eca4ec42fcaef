//! xmldoc - XML element trees, documents and builders
//!
//! This library reads XML files into a simple in-memory element tree, writes
//! them back out (DTD included), and converts elements to and from
//! application objects through a registry of builders.
//!
//! # Overview
//!
//! - [`XmlElement`]: a tag, attributes in name order, accumulated text and
//!   child elements. Elements are shared as [`ElementRef`] handles with a
//!   weak back reference to their parent.
//! - [`XmlDocument`]: a root element plus its location and DTD metadata.
//! - [`XmlReader`]: a non-validating reader. Well-formedness errors are
//!   counted rather than returned, and the document keeps the partial tree.
//!   External entities resolve through the document's own DTD, a
//!   [`ResourceBundle`] keyed by public ID, or their system ID.
//! - [`XmlWriter`]: writes a document, rebuilding its DTD from the
//!   declarations the reader collected when no external DTD is named.
//! - [`XmlBuilder`] and [`CompositeBuilder`]: element to object conversion,
//!   dispatched by tag or type name from declarations that can themselves be
//!   read from a `<builderDecls>` document.
//!
//! # Example
//!
//! ```
//! use xmldoc::{XmlDocument, XmlReader, XmlWriter};
//!
//! let mut doc = XmlDocument::new();
//! let mut reader = XmlReader::new();
//! reader.parse_str(&mut doc, r#"<root a="1"><child/></root>"#).unwrap();
//! assert_eq!(reader.error_count(), 0);
//!
//! let mut out = Vec::new();
//! XmlWriter::new().write(&doc, &mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().ends_with("<root a=\"1\">\n    <child/>\n</root>\n"));
//! ```

pub mod builder;
pub mod constants;
pub mod document;
pub mod dtd;
pub mod error;
pub mod node;
pub mod xml;

// Re-export commonly used types
pub use builder::{BuilderDecl, CompositeBuilder, DelegateSlot, XmlBuilder, XmlObject};
pub use constants::*;
pub use document::XmlDocument;
pub use dtd::DtdDecls;
pub use error::{Error, Result};
pub use node::{new_element_ref, ElementRef, XmlElement};
pub use xml::{
    EntitySource, Handler, MapResourceBundle, ParseMessage, ParseState, ResourceBundle,
    Tokenizer, XmlReader, XmlReaderOptions, XmlWriter, XmlWriterOptions,
};
