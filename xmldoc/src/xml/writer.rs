//! Document serialization.
//!
//! Output is an XML declaration, an optional DOCTYPE and the root element's
//! subtree as written by
//! [`XmlElement::write_xml_indented`](crate::XmlElement::write_xml_indented). When a document
//! has no external DTD identifiers its DTD is written inline, either from the
//! explicit DTD text or rebuilt from the declarations collected by the reader.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::constants::{INDENT_WIDTH, XML_DECLARATION};
use crate::document::XmlDocument;
use crate::dtd::{AttributeDefault, DtdDecls, EntityKind};
use crate::error::Result;

/// Options for writing.
#[derive(Debug, Clone)]
pub struct XmlWriterOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Whether to start with an XML declaration.
    pub declaration: bool,
}

impl Default for XmlWriterOptions {
    fn default() -> Self {
        XmlWriterOptions {
            indent: INDENT_WIDTH,
            declaration: true,
        }
    }
}

/// Writes [`XmlDocument`]s.
#[derive(Debug, Clone, Default)]
pub struct XmlWriter {
    options: XmlWriterOptions,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: XmlWriterOptions) -> Self {
        XmlWriter { options }
    }

    /// Writes the document to `out`.
    pub fn write<W: Write + ?Sized>(&self, document: &XmlDocument, out: &mut W) -> io::Result<()> {
        if self.options.declaration {
            writeln!(out, "{}", XML_DECLARATION)?;
        }
        self.write_doctype(document, out)?;
        if let Some(root) = document.root() {
            let indent = " ".repeat(self.options.indent);
            root.borrow().write_xml_indented(out, "", &indent)?;
        }
        Ok(())
    }

    /// Writes the document to its own URL or file, replacing what is there.
    pub fn write_to_location(&self, document: &XmlDocument) -> Result<()> {
        let path = super::local_path(document)?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "document has neither a URL nor a file",
            )
        })?;
        let mut out = BufWriter::new(File::create(&path)?);
        self.write(document, &mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Writes the document's DTD declarations: the explicit DTD text if there
    /// is one, else one line per declaration collected by the reader.
    pub fn write_dtd<W: Write + ?Sized>(
        &self,
        document: &XmlDocument,
        out: &mut W,
    ) -> io::Result<()> {
        if let Some(dtd) = document.dtd() {
            out.write_all(dtd.as_bytes())?;
            if !dtd.ends_with('\n') {
                writeln!(out)?;
            }
            return Ok(());
        }
        match document.dtd_decls() {
            Some(decls) => write_decls(decls, out),
            None => Ok(()),
        }
    }

    fn write_doctype<W: Write + ?Sized>(&self, document: &XmlDocument, out: &mut W) -> io::Result<()> {
        let root_tag = document.root().map(|root| root.borrow().tag().to_string());
        let Some(name) = document.doc_type().map(String::from).or(root_tag) else {
            return Ok(());
        };

        if let Some(public_id) = document.dtd_public_id() {
            write!(out, "<!DOCTYPE {} PUBLIC {}", name, literal(public_id))?;
            if let Some(system_id) = document.dtd_system_id() {
                write!(out, " {}", literal(system_id))?;
            }
            return writeln!(out, ">");
        }
        if let Some(system_id) = document.dtd_system_id() {
            return writeln!(out, "<!DOCTYPE {} SYSTEM {}>", name, literal(system_id));
        }

        let has_decls = document.dtd_decls().is_some_and(|decls| !decls.is_empty());
        if document.dtd().is_some() || has_decls {
            writeln!(out, "<!DOCTYPE {} [", name)?;
            self.write_dtd(document, out)?;
            writeln!(out, "]>")?;
        }
        Ok(())
    }
}

fn write_decls<W: Write + ?Sized>(decls: &DtdDecls, out: &mut W) -> io::Result<()> {
    for notation in decls.notations() {
        write!(out, "<!NOTATION {}", notation.name)?;
        match (&notation.public_id, &notation.system_id) {
            (Some(public_id), Some(system_id)) => {
                write!(out, " PUBLIC {} {}", literal(public_id), literal(system_id))?
            }
            (Some(public_id), None) => write!(out, " PUBLIC {}", literal(public_id))?,
            (None, Some(system_id)) => write!(out, " SYSTEM {}", literal(system_id))?,
            (None, None) => {}
        }
        writeln!(out, ">")?;
    }

    for entity in decls.entities() {
        write!(out, "<!ENTITY ")?;
        if entity.parameter {
            write!(out, "% ")?;
        }
        write!(out, "{}", entity.name)?;
        match &entity.kind {
            EntityKind::Internal(value) => write!(out, " {}", literal(value))?,
            EntityKind::External {
                public_id,
                system_id,
                notation,
            } => {
                match public_id {
                    Some(public_id) => {
                        write!(out, " PUBLIC {} {}", literal(public_id), literal(system_id))?
                    }
                    None => write!(out, " SYSTEM {}", literal(system_id))?,
                }
                if let Some(notation) = notation {
                    write!(out, " NDATA {}", notation)?;
                }
            }
        }
        writeln!(out, ">")?;
    }

    for element in decls.elements() {
        if let Some(spec) = element.content_spec() {
            writeln!(out, "<!ELEMENT {} {}>", element.name, spec)?;
        }
        if element.attributes.is_empty() {
            continue;
        }
        write!(out, "<!ATTLIST {}", element.name)?;
        for attribute in &element.attributes {
            write!(
                out,
                " {} {}",
                attribute.name,
                attribute.attribute_type.keyword()
            )?;
            match &attribute.default {
                AttributeDefault::Fixed(value) => write!(out, " #FIXED {}", literal(value))?,
                AttributeDefault::Default(value) => write!(out, " {}", literal(value))?,
                other => {
                    if let Some(keyword) = other.keyword() {
                        write!(out, " {}", keyword)?;
                    }
                }
            }
        }
        writeln!(out, ">")?;
    }
    Ok(())
}

/// Quotes a DTD literal. Double quotes and non-ASCII characters become
/// numeric character references.
fn literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("&#34;"),
            c if c.is_ascii() => quoted.push(c),
            c => quoted.push_str(&format!("&#{};", c as u32)),
        }
    }
    quoted.push('"');
    quoted
}

/// Serializes a document to a string with default options.
pub fn write_to_string(document: &XmlDocument) -> String {
    let mut output = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = XmlWriter::new().write(document, &mut output);
    String::from_utf8_lossy(&output).into_owned()
}
