//! The callback contract between the tokenizer and whoever builds from it.

use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};

/// Receives parse events from a [`Tokenizer`](super::Tokenizer).
///
/// Per element the tokenizer calls `attribute` zero or more times, then
/// `start_element` once, then any mix of `char_data` and nested elements,
/// then `end_element` once. `doctype_decl` comes before the root element.
/// Every method has a no-op default.
#[allow(unused_variables)]
pub trait Handler {
    fn start_document(&mut self) {}

    fn end_document(&mut self) {}

    fn doctype_decl(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) {}

    /// One attribute of the next element. `specified` is false for values
    /// defaulted from an `<!ATTLIST>` declaration.
    fn attribute(&mut self, name: &str, value: &str, specified: bool) {}

    fn start_element(&mut self, tag: &str) {}

    fn end_element(&mut self, tag: &str) {}

    fn char_data(&mut self, text: &str) {}

    /// Chooses where an external entity (or the external DTD subset) is read
    /// from. The default uses the system ID as given.
    fn resolve_entity(
        &mut self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Option<EntitySource> {
        system_id.map(|s| EntitySource::SystemId(s.to_string()))
    }

    fn start_external_entity(&mut self, uri: &str) {}

    fn end_external_entity(&mut self, uri: &str) {}

    /// A recoverable well-formedness error. Parsing continues when the
    /// tokenizer can.
    fn error(&mut self, message: &str, system_id: Option<&str>, line: usize, column: usize) {}

    /// Something was skipped, such as an external DTD that could not be read.
    fn warning(&mut self, message: &str, system_id: Option<&str>, line: usize, column: usize) {}
}

/// Where the content of an external entity comes from.
pub enum EntitySource {
    /// The replacement text itself.
    Text(String),
    /// A stream to read the replacement text from.
    Stream(Box<dyn Read>),
    /// A system ID for the tokenizer to open, relative to the document.
    SystemId(String),
}

impl fmt::Debug for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitySource::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            EntitySource::Stream(_) => f.write_str("Stream(..)"),
            EntitySource::SystemId(id) => f.debug_tuple("SystemId").field(id).finish(),
        }
    }
}

/// Looks up local copies of external resources by public ID.
pub trait ResourceBundle {
    fn get_resource_as_stream(&self, public_id: &str) -> Option<Box<dyn Read>>;
}

/// A [`ResourceBundle`] backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MapResourceBundle {
    resources: HashMap<String, Vec<u8>>,
}

impl MapResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the content served for `public_id`.
    pub fn insert(&mut self, public_id: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.resources.insert(public_id.into(), content.into());
    }

    pub fn with(mut self, public_id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(public_id, content);
        self
    }
}

impl ResourceBundle for MapResourceBundle {
    fn get_resource_as_stream(&self, public_id: &str) -> Option<Box<dyn Read>> {
        self.resources
            .get(public_id)
            .map(|content| Box::new(Cursor::new(content.clone())) as Box<dyn Read>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_bundle_lookup() {
        let bundle = MapResourceBundle::new().with("-//Acme//DTD x//EN", "<!ELEMENT x ANY>");
        let mut text = String::new();
        bundle
            .get_resource_as_stream("-//Acme//DTD x//EN")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "<!ELEMENT x ANY>");
        assert!(bundle.get_resource_as_stream("-//Acme//DTD y//EN").is_none());
    }

    #[test]
    fn test_default_resolution_uses_system_id() {
        struct Nothing;
        impl Handler for Nothing {}

        let source = Nothing.resolve_entity(Some("pid"), Some("x.dtd"));
        assert!(matches!(source, Some(EntitySource::SystemId(ref s)) if s == "x.dtd"));
        assert!(Nothing.resolve_entity(Some("pid"), None).is_none());
    }
}
