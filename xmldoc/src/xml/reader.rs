//! Reader that builds an element tree from tokenizer events.
//!
//! [`XmlReader`] implements [`Handler`]: it keeps the attributes of the next
//! element pending, links each new element under the current one and ascends
//! on end tags. Well-formedness problems do not abort a parse. They are
//! counted, kept as [`ParseMessage`]s and logged, and the document receives
//! whatever tree was built up to that point.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::mem;
use std::rc::Rc;

use log::{debug, trace, warn};

use super::handler::{EntitySource, Handler, ResourceBundle};
use super::tokenizer::{Base, Tokenizer};
use crate::constants::MAX_ENTITY_DEPTH;
use crate::document::XmlDocument;
use crate::dtd::DtdDecls;
use crate::error::{Error, Result};
use crate::node::{ElementRef, XmlElement};

/// Options for reading.
#[derive(Debug, Clone)]
pub struct XmlReaderOptions {
    /// Drop whitespace-only text of elements that have child elements.
    pub strip_indentation: bool,
    /// Fill in attribute values declared with a default in the DTD.
    pub default_attributes: bool,
    /// Maximum nesting of entity expansions.
    pub max_entity_depth: usize,
}

impl Default for XmlReaderOptions {
    fn default() -> Self {
        XmlReaderOptions {
            strip_indentation: true,
            default_attributes: true,
            max_entity_depth: MAX_ENTITY_DEPTH,
        }
    }
}

/// Where a reader is in its parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    Parsing,
    Succeeded,
    /// The input could not be read at all.
    Failed,
}

/// An error or warning reported while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMessage {
    pub message: String,
    pub system_id: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(system_id) = &self.system_id {
            write!(f, "{}:", system_id)?;
        }
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Non-validating reader that fills an [`XmlDocument`].
pub struct XmlReader {
    options: XmlReaderOptions,
    resources: Option<Box<dyn ResourceBundle>>,
    state: ParseState,
    /// Attributes reported for the element about to start.
    pending: BTreeMap<String, String>,
    current: Option<ElementRef>,
    root: Option<ElementRef>,
    doc_type: Option<String>,
    public_id: Option<String>,
    system_id: Option<String>,
    /// Public ID and DTD text the document carried before the parse.
    own_public_id: Option<String>,
    own_dtd: Option<String>,
    entity_stack: Vec<String>,
    errors: Vec<ParseMessage>,
    warnings: Vec<ParseMessage>,
}

impl Default for XmlReader {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlReader {
    pub fn new() -> Self {
        Self::with_options(XmlReaderOptions::default())
    }

    pub fn with_options(options: XmlReaderOptions) -> Self {
        XmlReader {
            options,
            resources: None,
            state: ParseState::Idle,
            pending: BTreeMap::new(),
            current: None,
            root: None,
            doc_type: None,
            public_id: None,
            system_id: None,
            own_public_id: None,
            own_dtd: None,
            entity_stack: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn options(&self) -> &XmlReaderOptions {
        &self.options
    }

    /// Supplies local copies of external entities, looked up by public ID.
    pub fn set_resource_bundle(&mut self, resources: Box<dyn ResourceBundle>) {
        self.resources = Some(resources);
    }

    /// Parses the document from its own URL or file. When the location
    /// cannot be opened the reader is left `Failed` with no messages.
    pub fn parse(&mut self, document: &mut XmlDocument) -> Result<()> {
        self.begin(document);
        let opened = super::local_path(document).and_then(|path| {
            let path = path.ok_or_else(|| {
                Error::InputResolution("document has neither a URL nor a file".to_string())
            })?;
            Ok(File::open(path)?)
        });
        match opened {
            Ok(input) => self.parse_reader(document, input),
            Err(err) => {
                self.state = ParseState::Failed;
                Err(err)
            }
        }
    }

    /// Parses `input` into the document. The document's location is still
    /// used to resolve relative system IDs.
    pub fn parse_reader<R: Read>(&mut self, document: &mut XmlDocument, mut input: R) -> Result<()> {
        self.begin(document);

        let mut tokenizer = Tokenizer::new(base_of(document), document.system_id());
        tokenizer.set_default_attributes(self.options.default_attributes);
        tokenizer.set_max_entity_depth(self.options.max_entity_depth);

        let outcome = match read_utf8(&mut input) {
            Ok(text) => tokenizer.parse(&text, self),
            Err(err) => Err(err),
        };

        self.finish(document, tokenizer.into_decls(), outcome.is_ok());
        outcome
    }

    pub fn parse_str(&mut self, document: &mut XmlDocument, text: &str) -> Result<()> {
        self.parse_reader(document, text.as_bytes())
    }

    /// Number of errors reported by the last parse.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn errors(&self) -> &[ParseMessage] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ParseMessage] {
        &self.warnings
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// URIs of the external entities currently being read, innermost last.
    pub fn entity_stack(&self) -> &[String] {
        &self.entity_stack
    }

    fn begin(&mut self, document: &XmlDocument) {
        self.state = ParseState::Parsing;
        self.pending.clear();
        self.current = None;
        self.root = None;
        self.doc_type = None;
        self.public_id = None;
        self.system_id = None;
        self.own_public_id = document.dtd_public_id().map(String::from);
        self.own_dtd = document.dtd().map(String::from);
        self.entity_stack.clear();
        self.errors.clear();
        self.warnings.clear();
    }

    /// Hands what was accumulated to the document, whether or not the parse
    /// got to the end.
    fn finish(&mut self, document: &mut XmlDocument, decls: DtdDecls, ok: bool) {
        document.set_root(self.root.take());
        if let Some(doc_type) = self.doc_type.take() {
            document.set_doc_type(Some(doc_type));
            document.set_dtd_public_id(self.public_id.take());
            document.set_dtd_system_id(self.system_id.take());
        }
        document.set_dtd_decls(Some(Rc::new(decls)));
        self.current = None;
        self.pending.clear();

        self.state = if ok {
            ParseState::Succeeded
        } else {
            ParseState::Failed
        };
        debug!(
            "parsed {}: {} error(s), {} warning(s)",
            document.system_id().as_deref().unwrap_or("<input>"),
            self.errors.len(),
            self.warnings.len()
        );
    }

    fn message(message: &str, system_id: Option<&str>, line: usize, column: usize) -> ParseMessage {
        ParseMessage {
            message: message.to_string(),
            system_id: system_id.map(String::from),
            line,
            column,
        }
    }
}

impl Handler for XmlReader {
    fn start_document(&mut self) {
        trace!("start of document");
    }

    fn end_document(&mut self) {
        trace!("end of document");
    }

    fn doctype_decl(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) {
        debug!(
            "DOCTYPE {} public={:?} system={:?}",
            name, public_id, system_id
        );
        self.doc_type = Some(name.to_string());
        self.public_id = public_id.map(String::from);
        self.system_id = system_id.map(String::from);
    }

    fn attribute(&mut self, name: &str, value: &str, _specified: bool) {
        self.pending.insert(name.to_string(), value.to_string());
    }

    fn start_element(&mut self, tag: &str) {
        let attributes = mem::take(&mut self.pending);
        let element = XmlElement::with_attributes(tag, &attributes);

        match &self.current {
            Some(parent) => {
                if let Err(err) = XmlElement::add_element(parent, element.clone()) {
                    warn!("{}", err);
                }
            }
            None if self.root.is_none() => self.root = Some(element.clone()),
            // A second root was already reported by the tokenizer; its
            // subtree is built but stays detached.
            None => {}
        }
        self.current = Some(element);
    }

    fn end_element(&mut self, _tag: &str) {
        let Some(current) = self.current.take() else {
            return;
        };
        if self.options.strip_indentation {
            let mut element = current.borrow_mut();
            if element.child_count() > 0
                && !element.text().is_empty()
                && element.text().trim().is_empty()
            {
                element.set_text(String::new());
            }
        }
        self.current = current.borrow().parent();
    }

    fn char_data(&mut self, text: &str) {
        if let Some(current) = &self.current {
            current.borrow_mut().append_text(text);
        }
    }

    fn resolve_entity(
        &mut self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Option<EntitySource> {
        if let Some(public_id) = public_id.filter(|id| !id.is_empty()) {
            if self.own_public_id.as_deref() == Some(public_id) {
                if let Some(dtd) = &self.own_dtd {
                    debug!("using the document's own DTD for {}", public_id);
                    return Some(EntitySource::Text(dtd.clone()));
                }
            }
            if let Some(stream) = self
                .resources
                .as_ref()
                .and_then(|resources| resources.get_resource_as_stream(public_id))
            {
                debug!("using bundled resource for {}", public_id);
                return Some(EntitySource::Stream(stream));
            }
        }
        system_id.map(|id| EntitySource::SystemId(id.to_string()))
    }

    fn start_external_entity(&mut self, uri: &str) {
        trace!("entering external entity {}", uri);
        self.entity_stack.push(uri.to_string());
    }

    fn end_external_entity(&mut self, uri: &str) {
        trace!("leaving external entity {}", uri);
        match self.entity_stack.pop() {
            Some(top) if top == uri => {}
            top => debug!(
                "external entity stack mismatch: leaving {} but top was {:?}",
                uri, top
            ),
        }
    }

    fn error(&mut self, message: &str, system_id: Option<&str>, line: usize, column: usize) {
        let message = Self::message(message, system_id, line, column);
        warn!("{}", message);
        self.errors.push(message);
    }

    fn warning(&mut self, message: &str, system_id: Option<&str>, line: usize, column: usize) {
        let message = Self::message(message, system_id, line, column);
        debug!("{}", message);
        self.warnings.push(message);
    }
}

fn read_utf8<R: Read>(input: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| Error::Parse(format!("input is not valid UTF-8: {}", e)))
}

fn base_of(document: &XmlDocument) -> Base {
    match (document.url(), document.file()) {
        (Some(url), _) => Base::Url(url.clone()),
        (None, Some(file)) => Base::File(file.to_path_buf()),
        (None, None) => Base::None,
    }
}
