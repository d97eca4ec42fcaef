//! Event source that drives a [`Handler`] from XML text.
//!
//! This tokenizer uses quick-xml's pull API and turns its events into
//! handler callbacks. On top of quick-xml it reads DOCTYPE declarations into
//! [`DtdDecls`], expands entity references and reports declared default
//! attribute values.

use std::borrow::Cow;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use super::handler::{EntitySource, Handler};
use crate::constants::MAX_ENTITY_DEPTH;
use crate::dtd::{self, DtdDecls, EntityDecl, EntityKind};
use crate::error::{Error, Result};

/// Location that relative system IDs are resolved against.
#[derive(Debug, Clone, Default)]
pub enum Base {
    /// Relative IDs are taken relative to the working directory.
    #[default]
    None,
    Url(Url),
    File(PathBuf),
}

/// Drives a handler from XML text, collecting DTD declarations on the way.
#[derive(Debug)]
pub struct Tokenizer {
    base: Base,
    system_id: Option<String>,
    decls: DtdDecls,
    default_attributes: bool,
    max_entity_depth: usize,
    /// System IDs of the document and of the external entities being read.
    locations: Vec<Option<String>>,
    /// Where relative system IDs resolve while each external entity is read.
    bases: Vec<Base>,
}

/// Text of an external entity and where it came from.
struct External {
    uri: String,
    content: String,
    /// Set when the text was read from a file.
    base: Option<Base>,
}

impl Tokenizer {
    /// Creates a tokenizer for a document at `base`, named `system_id` in
    /// error reports.
    pub fn new(base: Base, system_id: Option<String>) -> Self {
        Tokenizer {
            base,
            system_id,
            decls: DtdDecls::new(),
            default_attributes: true,
            max_entity_depth: MAX_ENTITY_DEPTH,
            locations: Vec::new(),
            bases: Vec::new(),
        }
    }

    /// Whether declared default attribute values are reported.
    pub fn set_default_attributes(&mut self, enabled: bool) {
        self.default_attributes = enabled;
    }

    /// Bounds nested entity expansion.
    pub fn set_max_entity_depth(&mut self, depth: usize) {
        self.max_entity_depth = depth;
    }

    /// Returns the declarations read so far.
    pub fn decls(&self) -> &DtdDecls {
        &self.decls
    }

    /// Consumes the tokenizer, returning the declarations it read.
    pub fn into_decls(self) -> DtdDecls {
        self.decls
    }

    /// Tokenizes a whole document.
    ///
    /// Well-formedness errors go to [`Handler::error`]; tokenizing stops at
    /// the first one quick-xml cannot recover from. Only I/O failures are
    /// returned as `Err`.
    pub fn parse<H: Handler + ?Sized>(&mut self, text: &str, handler: &mut H) -> Result<()> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        self.locations = vec![self.system_id.clone()];
        handler.start_document();
        let outcome = self.run(text, handler, 0, true);
        handler.end_document();
        self.locations.clear();
        self.bases.clear();
        outcome
    }

    fn run<H: Handler + ?Sized>(
        &mut self,
        text: &str,
        handler: &mut H,
        depth: usize,
        top_level: bool,
    ) -> Result<()> {
        let mut reader = Reader::from_str(text);
        // Character data is reported exactly as written
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        let mut open = 0usize;
        let mut seen_root = false;
        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err @ quick_xml::Error::Io(_)) => return Err(Error::Xml(err)),
                Err(err) => {
                    let offset = reader.error_position() as usize;
                    self.report_error(handler, &err.to_string(), text, offset);
                    return Ok(());
                }
            };
            let offset = reader.buffer_position() as usize;
            let outside_root = top_level && open == 0;

            match event {
                Event::Start(_) | Event::Empty(_) if outside_root => {
                    if seen_root {
                        self.report_error(handler, "multiple root elements", text, offset);
                    }
                    seen_root = true;
                }
                Event::Text(ref e) if outside_root => {
                    if !utf8(e.as_ref())?.trim().is_empty() {
                        self.report_error(
                            handler,
                            "character data outside the root element",
                            text,
                            offset,
                        );
                    }
                    continue;
                }
                Event::CData(_) | Event::GeneralRef(_) if outside_root => {
                    self.report_error(
                        handler,
                        "character data outside the root element",
                        text,
                        offset,
                    );
                    continue;
                }
                _ => {}
            }

            match event {
                Event::Start(ref e) => {
                    self.start_element(e, handler, text, offset)?;
                    open += 1;
                }
                Event::Empty(ref e) => {
                    let tag = self.start_element(e, handler, text, offset)?;
                    handler.end_element(&tag);
                }
                Event::End(ref e) => {
                    let tag = utf8(e.name().as_ref())?.to_string();
                    open = open.saturating_sub(1);
                    handler.end_element(&tag);
                }
                Event::Text(ref e) => {
                    let raw = utf8(e.as_ref())?;
                    match self.expand_text(raw) {
                        Ok(value) if !value.is_empty() => handler.char_data(&value),
                        Ok(_) => {}
                        Err(message) => self.report_error(handler, &message, text, offset),
                    }
                }
                Event::CData(ref e) => {
                    let raw = utf8(e.as_ref())?;
                    if !raw.is_empty() {
                        handler.char_data(raw);
                    }
                }
                Event::GeneralRef(ref e) => {
                    let name = utf8(e.as_ref())?;
                    self.reference(name, handler, depth, text, offset)?;
                }
                Event::DocType(ref e) => {
                    let content = utf8(e.as_ref())?;
                    if top_level {
                        self.doctype(content, handler, text, offset)?;
                    } else {
                        self.report_error(handler, "DOCTYPE inside an entity", text, offset);
                    }
                }
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {
                    // Nothing in the element tree represents these
                }
                Event::Eof => break,
            }
        }

        if open > 0 {
            let message = format!("{} element(s) not closed at end of input", open);
            self.report_error(handler, &message, text, text.len());
        }
        Ok(())
    }

    /// Reports the attributes of `e` followed by `start_element`, returning
    /// the tag.
    fn start_element<H: Handler + ?Sized>(
        &mut self,
        e: &BytesStart,
        handler: &mut H,
        text: &str,
        offset: usize,
    ) -> Result<String> {
        let tag = utf8(e.name().as_ref())?.to_string();

        let mut specified = Vec::new();
        for attr in e.attributes() {
            let attr = match attr {
                Ok(attr) => attr,
                Err(err) => {
                    let message = format!("bad attribute in <{}>: {}", tag, err);
                    self.report_error(handler, &message, text, offset);
                    break;
                }
            };
            let name = utf8(attr.key.as_ref())?.to_string();
            let raw = utf8(&attr.value)?;
            let value = match self.expand_text(raw) {
                Ok(value) => value,
                Err(message) => {
                    self.report_error(handler, &message, text, offset);
                    Cow::Borrowed(raw)
                }
            };
            handler.attribute(&name, &value, true);
            specified.push(name);
        }

        if self.default_attributes {
            let defaults: Vec<(String, String)> = self
                .decls
                .element(&tag)
                .map(|decl| {
                    decl.attributes
                        .iter()
                        .filter(|a| !specified.contains(&a.name))
                        .filter_map(|a| a.default.value().map(|v| (a.name.clone(), v.to_string())))
                        .collect()
                })
                .unwrap_or_default();
            for (name, raw) in defaults {
                let value = match self.expand_text(&raw) {
                    Ok(value) => value.into_owned(),
                    Err(message) => {
                        self.report_error(handler, &message, text, offset);
                        raw.clone()
                    }
                };
                handler.attribute(&name, &value, false);
            }
        }

        handler.start_element(&tag);
        Ok(tag)
    }

    /// Replaces character and entity references in a literal.
    fn expand_text<'t>(&self, raw: &'t str) -> std::result::Result<Cow<'t, str>, String> {
        let decls = &self.decls;
        unescape_with(raw, |name| lookup_entity(decls, name)).map_err(|e| e.to_string())
    }

    fn reference<H: Handler + ?Sized>(
        &mut self,
        name: &str,
        handler: &mut H,
        depth: usize,
        text: &str,
        offset: usize,
    ) -> Result<()> {
        if let Some(number) = name.strip_prefix('#') {
            match parse_char_ref(number) {
                Some(c) => handler.char_data(c.encode_utf8(&mut [0; 4])),
                None => {
                    let message = format!("invalid character reference &{};", name);
                    self.report_error(handler, &message, text, offset);
                }
            }
            return Ok(());
        }
        if let Some(value) = resolve_predefined_entity(name) {
            handler.char_data(value);
            return Ok(());
        }

        let kind = match self.decls.entity(name) {
            Some(decl) => decl.kind.clone(),
            None => {
                let message = format!("reference to undeclared entity &{};", name);
                self.report_error(handler, &message, text, offset);
                return Ok(());
            }
        };
        if depth >= self.max_entity_depth {
            let message = format!("entity &{}; nests deeper than {}", name, self.max_entity_depth);
            self.report_error(handler, &message, text, offset);
            return Ok(());
        }

        match kind {
            EntityKind::Internal(value) => {
                if value.contains(['<', '&']) {
                    self.run(&value, handler, depth + 1, false)
                } else {
                    if !value.is_empty() {
                        handler.char_data(&value);
                    }
                    Ok(())
                }
            }
            EntityKind::External {
                notation: Some(_), ..
            } => {
                let message = format!("reference to unparsed entity &{};", name);
                self.report_error(handler, &message, text, offset);
                Ok(())
            }
            EntityKind::External {
                public_id,
                system_id,
                notation: None,
            } => {
                let loaded = self.load_external(
                    handler,
                    public_id.as_deref(),
                    Some(system_id.as_str()),
                    text,
                    offset,
                );
                match loaded {
                    Some(external) => {
                        handler.start_external_entity(&external.uri);
                        self.enter(&external);
                        let outcome = self.run(&external.content, handler, depth + 1, false);
                        self.leave();
                        handler.end_external_entity(&external.uri);
                        outcome
                    }
                    None => Ok(()),
                }
            }
        }
    }

    fn doctype<H: Handler + ?Sized>(
        &mut self,
        content: &str,
        handler: &mut H,
        text: &str,
        offset: usize,
    ) -> Result<()> {
        let doctype = match dtd::parse_doctype(content) {
            Ok(doctype) => doctype,
            Err(err) => {
                let message = format!("malformed DOCTYPE: {}", err.message);
                self.report_error(handler, &message, text, offset);
                return Ok(());
            }
        };
        let public_id = doctype.public_id.as_deref();
        let system_id = doctype.system_id.as_deref();
        handler.doctype_decl(&doctype.name, public_id, system_id);

        // The internal subset is read first so its declarations bind.
        if let Some(subset) = &doctype.internal_subset {
            if let Err(err) = dtd::parse_declarations(subset, &mut self.decls) {
                let message = format!("in internal DTD subset: {}", err.message);
                self.report_error(handler, &message, text, offset);
            }
        }

        if public_id.is_none() && system_id.is_none() {
            return Ok(());
        }
        if let Some(external) = self.load_external(handler, public_id, system_id, text, offset) {
            handler.start_external_entity(&external.uri);
            self.enter(&external);
            if let Err(err) = dtd::parse_declarations(&external.content, &mut self.decls) {
                self.report_error(handler, &err.message, &external.content, err.offset);
            }
            self.leave();
            handler.end_external_entity(&external.uri);
        }
        Ok(())
    }

    /// Fetches an external entity through the handler's resolution. Anything
    /// that cannot be read is a warning and yields `None`.
    fn load_external<H: Handler + ?Sized>(
        &self,
        handler: &mut H,
        public_id: Option<&str>,
        system_id: Option<&str>,
        text: &str,
        offset: usize,
    ) -> Option<External> {
        let name = system_id.or(public_id).unwrap_or_default().to_string();
        let in_memory = |content| External {
            uri: name.clone(),
            content,
            base: None,
        };
        let loaded = match handler.resolve_entity(public_id, system_id) {
            None => Err(format!("no source for external entity {}", name)),
            Some(EntitySource::Text(content)) => Ok(in_memory(content)),
            Some(EntitySource::Stream(mut stream)) => {
                let mut content = String::new();
                stream
                    .read_to_string(&mut content)
                    .map(|_| in_memory(content))
                    .map_err(|e| format!("cannot read external entity {}: {}", name, e))
            }
            Some(EntitySource::SystemId(id)) => self.resolve_system_id(&id).and_then(|path| {
                fs::read_to_string(&path)
                    .map(|content| External {
                        uri: path.display().to_string(),
                        content,
                        base: Some(Base::File(path.clone())),
                    })
                    .map_err(|e| format!("cannot read {}: {}", path.display(), e))
            }),
        };

        match loaded {
            Ok(loaded) => Some(loaded),
            Err(message) => {
                let (line, column) = line_col(text, offset);
                let location = self.current_location();
                handler.warning(&message, location.as_deref(), line, column);
                None
            }
        }
    }

    /// Resolves `id` against the innermost external entity read from a file,
    /// or against the document when there is none.
    fn resolve_system_id(&self, id: &str) -> std::result::Result<PathBuf, String> {
        if let Ok(url) = Url::parse(id) {
            return file_path(&url);
        }
        match self.bases.last().unwrap_or(&self.base) {
            Base::Url(base) => {
                let url = base
                    .join(id)
                    .map_err(|e| format!("cannot resolve {} against {}: {}", id, base, e))?;
                file_path(&url)
            }
            Base::File(path) => Ok(path
                .parent()
                .map(|dir| dir.join(id))
                .unwrap_or_else(|| PathBuf::from(id))),
            Base::None => Ok(PathBuf::from(id)),
        }
    }

    fn enter(&mut self, external: &External) {
        self.locations.push(Some(external.uri.clone()));
        let base = match &external.base {
            Some(base) => base.clone(),
            None => self.bases.last().unwrap_or(&self.base).clone(),
        };
        self.bases.push(base);
    }

    fn leave(&mut self) {
        self.locations.pop();
        self.bases.pop();
    }

    fn current_location(&self) -> Option<String> {
        self.locations.last().cloned().flatten()
    }

    fn report_error<H: Handler + ?Sized>(
        &self,
        handler: &mut H,
        message: &str,
        text: &str,
        offset: usize,
    ) {
        let (line, column) = line_col(text, offset);
        let location = self.current_location();
        handler.error(message, location.as_deref(), line, column);
    }
}

fn lookup_entity<'d>(decls: &'d DtdDecls, name: &str) -> Option<&'d str> {
    if let Some(value) = resolve_predefined_entity(name) {
        return Some(value);
    }
    match decls.entity(name) {
        Some(EntityDecl {
            kind: EntityKind::Internal(value),
            ..
        }) => Some(value),
        _ => None,
    }
}

fn parse_char_ref(number: &str) -> Option<char> {
    let code = match number.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

fn file_path(url: &Url) -> std::result::Result<PathBuf, String> {
    if url.scheme() != "file" {
        return Err(format!("cannot fetch {}: only file: URLs are supported", url));
    }
    url.to_file_path()
        .map_err(|()| format!("{} does not name a local file", url))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Parse(e.to_string()))
}

/// Converts a byte offset to a 1-based line and column.
pub(crate) fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text.as_bytes()[..offset.min(text.len())];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    (line, before.len() - line_start + 1)
}
