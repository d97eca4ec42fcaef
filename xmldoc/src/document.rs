//! XML documents: a root element plus document-level metadata.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use url::Url;

use crate::dtd::DtdDecls;
use crate::node::ElementRef;

/// One parsed, or to-be-written, XML file.
///
/// The reader fills in the root, the doc type, the DTD identifiers and the
/// collected DTD declarations; the writer consumes them. When both a URL and
/// a file are set, the URL is used.
#[derive(Debug, Default)]
pub struct XmlDocument {
    root: Option<ElementRef>,
    url: Option<Url>,
    file: Option<PathBuf>,
    doc_type: Option<String>,
    dtd: Option<String>,
    dtd_public_id: Option<String>,
    dtd_system_id: Option<String>,
    dtd_decls: Option<Rc<DtdDecls>>,
}

impl XmlDocument {
    /// Creates an empty document with no location.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty document located at `url`.
    pub fn from_url(url: Url) -> Self {
        XmlDocument {
            url: Some(url),
            ..Self::default()
        }
    }

    /// Creates an empty document located at `path`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        XmlDocument {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn root(&self) -> Option<&ElementRef> {
        self.root.as_ref()
    }

    pub fn set_root(&mut self, root: Option<ElementRef>) {
        self.root = root;
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn set_url(&mut self, url: Option<Url>) {
        self.url = url;
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn set_file(&mut self, file: Option<PathBuf>) {
        self.file = file;
    }

    /// Returns a printable identifier for the document's location: the URL
    /// if set, else the file path.
    pub fn system_id(&self) -> Option<String> {
        match (&self.url, &self.file) {
            (Some(url), _) => Some(url.to_string()),
            (None, Some(file)) => Some(file.display().to_string()),
            (None, None) => None,
        }
    }

    /// Returns the root element name declared by the DOCTYPE.
    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }

    pub fn set_doc_type(&mut self, doc_type: Option<String>) {
        self.doc_type = doc_type;
    }

    /// Returns the explicit DTD text, if one was supplied.
    pub fn dtd(&self) -> Option<&str> {
        self.dtd.as_deref()
    }

    pub fn set_dtd(&mut self, dtd: Option<String>) {
        self.dtd = dtd;
    }

    pub fn dtd_public_id(&self) -> Option<&str> {
        self.dtd_public_id.as_deref()
    }

    pub fn set_dtd_public_id(&mut self, public_id: Option<String>) {
        self.dtd_public_id = public_id;
    }

    pub fn dtd_system_id(&self) -> Option<&str> {
        self.dtd_system_id.as_deref()
    }

    pub fn set_dtd_system_id(&mut self, system_id: Option<String>) {
        self.dtd_system_id = system_id;
    }

    /// Returns the declarations collected by the reader that last parsed this
    /// document. The writer uses them to reconstruct the DTD.
    pub fn dtd_decls(&self) -> Option<&Rc<DtdDecls>> {
        self.dtd_decls.as_ref()
    }

    pub fn set_dtd_decls(&mut self, decls: Option<Rc<DtdDecls>>) {
        self.dtd_decls = decls;
    }
}
