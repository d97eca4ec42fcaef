//! Registry-driven builder that dispatches by tag or type name.

use std::cell::RefCell;
use std::fmt;
use std::io::Read;
use std::rc::{Rc, Weak};

use log::debug;
use rustc_hash::FxHashMap;

use super::{DelegateSlot, XmlBuilder, XmlObject};
use crate::constants::{BUILDER_DECLS_DTD, BUILDER_DECLS_PUBLIC_ID, BUILDER_DECLS_TAG, BUILDER_TAG};
use crate::document::XmlDocument;
use crate::error::{Error, Result};
use crate::node::ElementRef;
use crate::xml::XmlReader;

/// Creates a fresh builder instance.
pub type BuilderFactory = Rc<dyn Fn() -> Box<dyn XmlBuilder>>;

/// One registry entry: elements tagged `tag`, and objects of type
/// `class_name`, are handled by the builder registered as `builder_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderDecl {
    pub tag: String,
    pub class_name: String,
    pub builder_name: String,
}

impl BuilderDecl {
    pub fn new(
        tag: impl Into<String>,
        class_name: impl Into<String>,
        builder_name: impl Into<String>,
    ) -> Self {
        BuilderDecl {
            tag: tag.into(),
            class_name: class_name.into(),
            builder_name: builder_name.into(),
        }
    }
}

/// A builder that owns no conversions itself. `build` looks up the requested
/// type as a tag, then as a class name; `generate` looks up the object's
/// class name. It then creates the declared builder from its factory and
/// installs itself as that builder's delegate, so nested elements come back
/// through the registry.
///
/// Always handled through an `Rc`, see [`CompositeBuilder::new`].
pub struct CompositeBuilder {
    this: Weak<CompositeBuilder>,
    factories: RefCell<FxHashMap<String, BuilderFactory>>,
    by_tag: RefCell<FxHashMap<String, BuilderDecl>>,
    by_class: RefCell<FxHashMap<String, BuilderDecl>>,
    delegate: DelegateSlot,
}

impl CompositeBuilder {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| CompositeBuilder {
            this: this.clone(),
            factories: RefCell::new(FxHashMap::default()),
            by_tag: RefCell::new(FxHashMap::default()),
            by_class: RefCell::new(FxHashMap::default()),
            delegate: DelegateSlot::new(),
        })
    }

    /// Makes `builder_name` instantiable. Replaces any factory registered
    /// under the same name.
    pub fn register_factory<F>(&self, builder_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn XmlBuilder> + 'static,
    {
        self.factories
            .borrow_mut()
            .insert(builder_name.into(), Rc::new(factory));
    }

    /// Registers a declaration under its tag and its class name. A later
    /// declaration for the same tag or class replaces the earlier one.
    pub fn add_builder_decl(&self, decl: BuilderDecl) {
        debug!(
            "builder for <{}> / {}: {}",
            decl.tag, decl.class_name, decl.builder_name
        );
        self.by_class
            .borrow_mut()
            .insert(decl.class_name.clone(), decl.clone());
        self.by_tag.borrow_mut().insert(decl.tag.clone(), decl);
    }

    /// Reads a `<builderDecls>` document and registers every `<builder>` in
    /// it. Returns the number registered.
    ///
    /// The builder declarations DTD is supplied by the reader itself, so the
    /// document's DOCTYPE does not need to be resolvable. Nothing is
    /// registered if the document has parse errors.
    pub fn add_builder_decls<R: Read>(&self, input: R) -> Result<usize> {
        let mut document = decls_document(XmlDocument::new());
        let mut reader = XmlReader::new();
        reader.parse_reader(&mut document, input)?;
        self.register_decls(&reader, &document)
    }

    /// Like [`add_builder_decls`](Self::add_builder_decls), reading from the
    /// document's own location.
    pub fn add_builder_decls_from(&self, document: XmlDocument) -> Result<usize> {
        let mut document = decls_document(document);
        let mut reader = XmlReader::new();
        reader.parse(&mut document)?;
        self.register_decls(&reader, &document)
    }

    /// Returns the declaration registered for a tag.
    pub fn decl_for_tag(&self, tag: &str) -> Option<BuilderDecl> {
        self.by_tag.borrow().get(tag).cloned()
    }

    /// Returns the declaration registered for a class name.
    pub fn decl_for_class(&self, class_name: &str) -> Option<BuilderDecl> {
        self.by_class.borrow().get(class_name).cloned()
    }

    fn register_decls(&self, reader: &XmlReader, document: &XmlDocument) -> Result<usize> {
        if let Some(first) = reader.errors().first() {
            return Err(Error::Parse(format!(
                "{} error(s) in builder declarations, first: {}",
                reader.error_count(),
                first
            )));
        }
        let root = document
            .root()
            .ok_or_else(|| Error::Parse("builder declarations have no root element".to_string()))?;
        let root = root.borrow();
        if root.tag() != BUILDER_DECLS_TAG {
            return Err(Error::Parse(format!(
                "expected <{}>, found <{}>",
                BUILDER_DECLS_TAG,
                root.tag()
            )));
        }

        let mut decls = Vec::new();
        for element in root.elements(BUILDER_TAG) {
            let element = element.borrow();
            let required = |name: &str| {
                element.attribute(name).map(String::from).ok_or_else(|| {
                    Error::Parse(format!("<{}> lacks the {} attribute", BUILDER_TAG, name))
                })
            };
            decls.push(BuilderDecl::new(
                required("name")?,
                required("class")?,
                required("builder")?,
            ));
        }

        let count = decls.len();
        for decl in decls {
            self.add_builder_decl(decl);
        }
        debug!("registered {} builder declaration(s)", count);
        Ok(count)
    }

    /// Creates the builder a declaration names and points it back at this
    /// composite.
    fn instantiate(&self, decl: &BuilderDecl) -> Result<Box<dyn XmlBuilder>> {
        let factory = self
            .factories
            .borrow()
            .get(&decl.builder_name)
            .cloned()
            .ok_or_else(|| Error::UnknownBuilder(decl.builder_name.clone()))?;
        let builder = factory();
        builder.set_delegate(self.this.upgrade().map(|this| this as Rc<dyn XmlBuilder>));
        Ok(builder)
    }
}

impl XmlBuilder for CompositeBuilder {
    fn build(&self, element: &ElementRef, type_name: &str) -> Result<Box<dyn XmlObject>> {
        // The requested type names the builder; the element's own tag does not.
        let decl = self
            .decl_for_tag(type_name)
            .or_else(|| self.decl_for_class(type_name));
        match decl {
            Some(decl) => self.instantiate(&decl)?.build(element, &decl.class_name),
            None => self.build_delegated(element, type_name),
        }
    }

    fn generate(&self, object: &dyn XmlObject) -> Result<ElementRef> {
        match self.decl_for_class(object.class_name()) {
            Some(decl) => self.instantiate(&decl)?.generate(object),
            None => self.generate_delegated(object),
        }
    }

    fn delegate_slot(&self) -> &DelegateSlot {
        &self.delegate
    }
}

impl fmt::Debug for CompositeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeBuilder")
            .field("factories", &self.factories.borrow().len())
            .field("by_tag", &self.by_tag.borrow().len())
            .field("by_class", &self.by_class.borrow().len())
            .field("delegate", &self.delegate)
            .finish()
    }
}

/// Points a document's DTD at the embedded builder declarations DTD.
fn decls_document(mut document: XmlDocument) -> XmlDocument {
    document.set_dtd_public_id(Some(BUILDER_DECLS_PUBLIC_ID.to_string()));
    document.set_dtd(Some(BUILDER_DECLS_DTD.to_string()));
    document
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::node::XmlElement;

    struct Node {
        id: String,
    }

    impl XmlObject for Node {
        fn class_name(&self) -> &str {
            "my.Node"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct NodeBuilder {
        delegate: DelegateSlot,
    }

    impl XmlBuilder for NodeBuilder {
        fn build(&self, element: &ElementRef, _type_name: &str) -> Result<Box<dyn XmlObject>> {
            let id = element.borrow().attribute("id").unwrap_or_default().to_string();
            Ok(Box::new(Node { id }))
        }

        fn generate(&self, object: &dyn XmlObject) -> Result<ElementRef> {
            let node = object
                .downcast_ref::<Node>()
                .ok_or_else(|| Error::UnknownType(object.class_name().to_string()))?;
            let element = XmlElement::new("node");
            element.borrow_mut().set_attribute("id", node.id.as_str());
            Ok(element)
        }

        fn delegate_slot(&self) -> &DelegateSlot {
            &self.delegate
        }
    }

    fn registry() -> Rc<CompositeBuilder> {
        let composite = CompositeBuilder::new();
        composite.register_factory("my.NodeBuilder", || Box::new(NodeBuilder::default()));
        composite.add_builder_decl(BuilderDecl::new("node", "my.Node", "my.NodeBuilder"));
        composite
    }

    #[test]
    fn test_build_by_tag() {
        let element = XmlElement::new("vertex");
        element.borrow_mut().set_attribute("id", "n1");

        let object = registry().build(&element, "node").unwrap();
        assert_eq!(object.downcast_ref::<Node>().unwrap().id, "n1");
    }

    #[test]
    fn test_element_tag_does_not_pick_the_builder() {
        let composite = registry();
        let element = XmlElement::new("node");
        let err = composite.build(&element, "unregistered").unwrap_err();
        assert!(matches!(err, Error::UnknownType(ref t) if t == "unregistered"));
    }

    #[test]
    fn test_build_falls_back_to_class_name() {
        let element = XmlElement::new("vertex");
        let object = registry().build(&element, "my.Node").unwrap();
        assert!(object.is::<Node>());
    }

    #[test]
    fn test_generate_by_class_name() {
        let element = registry()
            .generate(&Node {
                id: "n2".to_string(),
            })
            .unwrap();
        assert_eq!(element.borrow().to_xml_string(), "<node id=\"n2\"/>\n");
    }

    #[test]
    fn test_declared_builder_without_factory() {
        let composite = registry();
        composite.add_builder_decl(BuilderDecl::new("edge", "my.Edge", "my.EdgeBuilder"));
        let err = composite.build(&XmlElement::new("edge"), "my.Edge").unwrap_err();
        assert!(matches!(err, Error::UnknownBuilder(ref b) if b == "my.EdgeBuilder"));
    }

    #[test]
    fn test_later_declaration_replaces_earlier() {
        let composite = registry();
        composite.add_builder_decl(BuilderDecl::new("node", "my.Vertex", "my.NodeBuilder"));
        assert_eq!(composite.decl_for_tag("node").unwrap().class_name, "my.Vertex");
        // The old class mapping stays until replaced.
        assert_eq!(composite.decl_for_class("my.Node").unwrap().tag, "node");
    }

    #[test]
    fn test_builder_decls_document() {
        let composite = CompositeBuilder::new();
        let count = composite
            .add_builder_decls(
                r#"<?xml version="1.0"?>
<!DOCTYPE builderDecls PUBLIC "-//UC Berkeley//DTD builder 1//EN" "builder.dtd">
<builderDecls>
    <builder name="graph" class="my.Graph" builder="my.GraphBuilder"/>
    <builder name="node" class="my.Node" builder="my.NodeBuilder"/>
</builderDecls>
"#
                .as_bytes(),
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            composite.decl_for_tag("graph"),
            Some(BuilderDecl::new("graph", "my.Graph", "my.GraphBuilder"))
        );
        assert_eq!(composite.decl_for_class("my.Node").unwrap().tag, "node");
    }

    #[test]
    fn test_builder_decls_with_errors_register_nothing() {
        let composite = CompositeBuilder::new();
        let err = composite
            .add_builder_decls(
                r#"<builderDecls><builder name="a" class="b" builder="c"/></oops>"#.as_bytes(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(composite.decl_for_tag("a").is_none());
    }

    #[test]
    fn test_builder_decls_require_attributes() {
        let err = CompositeBuilder::new()
            .add_builder_decls(r#"<builderDecls><builder name="a"/></builderDecls>"#.as_bytes())
            .unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.contains("class")));
    }
}
